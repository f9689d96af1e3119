//! Spawn and registration errors.

use skyfall_core::CoordinateKey;
use thiserror::Error;

/// Why a spawn request was refused before any state was created.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum SpawnError {
    /// No meteorite type with this id.
    #[error("unknown meteorite type '{0}'")]
    UnknownType(String),
    /// The type generated an empty structure.
    #[error("meteorite type '{0}' produces no blocks")]
    EmptyStructure(String),
    /// Target world is not loaded.
    #[error("world '{0}' is not loaded")]
    WorldNotLoaded(String),
}

/// Why a placement could not be registered.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegisterError {
    /// Another registration holds the coordinate.
    #[error("a registration at {0} is already in flight")]
    Duplicate(CoordinateKey),
}
