//! Meteorite instance identifiers.
//!
//! An [`InstanceId`] names one spawned meteorite for its whole lifecycle: it
//! tags the falling blocks, comes back in landing notifications, keys the
//! per-instance block set and is the id of the durable placement record.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Error returned when an instance id string is malformed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid instance id '{0}'")]
pub struct InstanceIdError(String);

/// Globally unique 128-bit instance id, rendered as hyphenated hex (8-4-4-4-12).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct InstanceId(u128);

impl InstanceId {
    /// Draw a fresh random id (version 4 layout).
    pub fn random(rng: &mut impl Rng) -> Self {
        let raw: u128 = rng.gen();
        // Version nibble = 4, variant bits = 10.
        let raw = (raw & !(0xFu128 << 76)) | (0x4u128 << 76);
        let raw = (raw & !(0x3u128 << 62)) | (0x2u128 << 62);
        Self(raw)
    }

    /// Build an id from its raw value.
    pub const fn from_u128(raw: u128) -> Self {
        Self(raw)
    }

    /// Leading eight hex digits, used in log lines.
    pub fn short(&self) -> String {
        format!("{:08x}", (self.0 >> 96) as u32)
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let v = self.0;
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:04x}-{:012x}",
            (v >> 96) as u32,
            (v >> 80) as u16,
            (v >> 64) as u16,
            (v >> 48) as u16,
            v & 0xFFFF_FFFF_FFFF
        )
    }
}

impl FromStr for InstanceId {
    type Err = InstanceIdError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        let groups: Vec<&str> = trimmed.split('-').collect();
        let lengths = [8, 4, 4, 4, 12];
        if groups.len() != lengths.len()
            || groups
                .iter()
                .zip(lengths)
                .any(|(group, len)| group.len() != len)
        {
            return Err(InstanceIdError(s.to_string()));
        }
        let hex: String = groups.concat();
        u128::from_str_radix(&hex, 16)
            .map(Self)
            .map_err(|_| InstanceIdError(s.to_string()))
    }
}

impl TryFrom<String> for InstanceId {
    type Error = InstanceIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<InstanceId> for String {
    fn from(id: InstanceId) -> Self {
        id.to_string()
    }
}
