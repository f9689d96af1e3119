//! Fixtures: temp directories and flat worlds.

use anyhow::{Context, Result};
use skyfall_world::{Materials, World, WorldSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Temporary directory removed on drop.
#[derive(Debug)]
pub struct TempDir {
    inner: tempfile::TempDir,
}

impl TempDir {
    /// Create a fresh directory whose name starts with `prefix`.
    pub fn new(prefix: &str) -> Result<Self> {
        let inner = tempfile::Builder::new()
            .prefix(&format!("skyfall_{prefix}_"))
            .tempdir()
            .with_context(|| format!("Failed to create temp dir for {prefix}"))?;
        Ok(Self { inner })
    }

    /// Directory path.
    pub fn path(&self) -> &Path {
        self.inner.path()
    }

    /// Path of a file inside the directory.
    pub fn file(&self, name: &str) -> PathBuf {
        self.inner.path().join(name)
    }
}

/// Builtin material catalog behind an `Arc`.
pub fn builtin_materials() -> Arc<Materials> {
    Arc::new(Materials::builtin())
}

/// One flat world per name, sharing the builtin catalog.
pub fn flat_worlds(names: &[&str]) -> WorldSet {
    let materials = builtin_materials();
    let mut worlds = WorldSet::new();
    for name in names {
        worlds.insert(World::flat(*name, Arc::clone(&materials)));
    }
    worlds
}
