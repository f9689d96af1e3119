//! Placement records and the flat JSON file that mirrors them.

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use skyfall_core::{BlockPos, InstanceId, RegistryKey, WorldPoint};
use tracing::warn;

/// Current on-disk format version.
pub const REGISTRY_VERSION: u32 = 1;

/// Durable record of one landed meteorite awaiting cleanup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRecord {
    id: InstanceId,
    world: String,
    x: i32,
    y: i32,
    z: i32,
    created_at_ms: i64,
    cleanup_delay_ms: u64,
    materials: BTreeSet<RegistryKey>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    radius: Option<i32>,
}

impl PlacementRecord {
    /// Record for an instance created at `created_at_ms`.
    pub fn new(
        id: InstanceId,
        point: &WorldPoint,
        created_at_ms: i64,
        cleanup_delay_ms: u64,
        materials: BTreeSet<RegistryKey>,
        radius: Option<i32>,
    ) -> Self {
        Self {
            id,
            world: point.world.clone(),
            x: point.pos.x,
            y: point.pos.y,
            z: point.pos.z,
            created_at_ms,
            cleanup_delay_ms,
            materials,
            radius,
        }
    }

    /// Instance id.
    pub fn id(&self) -> InstanceId {
        self.id
    }

    /// World name.
    pub fn world(&self) -> &str {
        &self.world
    }

    /// Impact position.
    pub fn pos(&self) -> BlockPos {
        BlockPos::new(self.x, self.y, self.z)
    }

    /// World and position together.
    pub fn point(&self) -> WorldPoint {
        WorldPoint::new(self.world.clone(), self.pos())
    }

    /// Creation time in epoch milliseconds.
    pub fn created_at_ms(&self) -> i64 {
        self.created_at_ms
    }

    /// Delay between creation and cleanup.
    pub fn cleanup_delay_ms(&self) -> u64 {
        self.cleanup_delay_ms
    }

    /// Material whitelist for the fallback sweep.
    pub fn materials(&self) -> &BTreeSet<RegistryKey> {
        &self.materials
    }

    /// Fallback sweep radius, if recorded.
    pub fn radius(&self) -> Option<i32> {
        self.radius
    }

    /// Milliseconds left before cleanup is due, never negative.
    ///
    /// A creation time in the future counts as zero elapsed time.
    pub fn remaining_ms(&self, now_ms: i64) -> u64 {
        let elapsed = now_ms.saturating_sub(self.created_at_ms).max(0) as u64;
        self.cleanup_delay_ms.saturating_sub(elapsed)
    }

    /// Whether the cleanup deadline has passed at `now_ms`.
    pub fn is_expired(&self, now_ms: i64) -> bool {
        self.remaining_ms(now_ms) == 0
    }
}

#[derive(Serialize)]
struct RegistryFileOut<'a> {
    version: u32,
    meteorites: Vec<&'a PlacementRecord>,
}

#[derive(Deserialize)]
struct RegistryFileIn {
    #[serde(default)]
    version: Option<u32>,
    #[serde(default)]
    meteorites: Vec<serde_json::Value>,
}

/// Records parsed from the registry file.
#[derive(Debug, Default)]
pub struct LoadedRecords {
    /// Records that parsed.
    pub records: Vec<PlacementRecord>,
    /// Entries that could not be parsed and were skipped.
    pub malformed: usize,
}

/// Reads and writes the registry file.
#[derive(Debug, Clone)]
pub struct RegistryStore {
    path: PathBuf,
}

impl RegistryStore {
    /// Store backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Registry file path.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load every well-formed record.
    ///
    /// A missing file yields `Ok(None)`. Unreadable or unparseable files are errors.
    /// Individual malformed entries are skipped with a warning.
    pub fn load(&self) -> Result<Option<LoadedRecords>> {
        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("Failed to read {}", self.path.display()))
            }
        };
        let file: RegistryFileIn = serde_json::from_str(&contents)
            .with_context(|| format!("Failed to parse {}", self.path.display()))?;
        if let Some(version) = file.version {
            if version > REGISTRY_VERSION {
                bail!(
                    "{} has unsupported version {version} (expected <= {REGISTRY_VERSION})",
                    self.path.display()
                );
            }
        }

        let mut loaded = LoadedRecords::default();
        for (index, entry) in file.meteorites.into_iter().enumerate() {
            match serde_json::from_value::<PlacementRecord>(entry) {
                Ok(record) => loaded.records.push(record),
                Err(err) => {
                    warn!(%err, index, path = %self.path.display(), "Skipping malformed registry entry");
                    loaded.malformed += 1;
                }
            }
        }
        Ok(Some(loaded))
    }

    /// Overwrite the file with `records`, via a temporary file and rename.
    pub fn save<'a>(&self, records: impl IntoIterator<Item = &'a PlacementRecord>) -> Result<()> {
        let file = RegistryFileOut {
            version: REGISTRY_VERSION,
            meteorites: records.into_iter().collect(),
        };
        let json = serde_json::to_string_pretty(&file).context("Failed to serialize registry")?;
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).with_context(|| {
                    format!("Failed to create registry directory {}", parent.display())
                })?;
            }
        }
        let tmp = self.path.with_extension("json.tmp");
        fs::write(&tmp, json).with_context(|| format!("Failed to write {}", tmp.display()))?;
        fs::rename(&tmp, &self.path).with_context(|| {
            format!(
                "Failed to move {} over {}",
                tmp.display(),
                self.path.display()
            )
        })?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    fn temp_path(name: &str) -> PathBuf {
        use std::time::{SystemTime, UNIX_EPOCH};
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_nanos();
        env::temp_dir()
            .join(format!("skyfall_record_{name}_{timestamp}"))
            .join("meteorites.json")
    }

    fn record(id: u128, created: i64, delay: u64) -> PlacementRecord {
        let materials = ["obsidian", "magma_block"]
            .into_iter()
            .map(|name| RegistryKey::parse(name).unwrap())
            .collect();
        PlacementRecord::new(
            InstanceId::from_u128(id),
            &WorldPoint::new("W", BlockPos::new(1, 64, -3)),
            created,
            delay,
            materials,
            Some(8),
        )
    }

    #[test]
    fn remaining_time_shrinks_and_floors_at_zero() {
        let record = record(1, 1_000, 5_000);
        assert_eq!(record.remaining_ms(1_000), 5_000);
        assert_eq!(record.remaining_ms(4_000), 2_000);
        assert_eq!(record.remaining_ms(6_000), 0);
        assert_eq!(record.remaining_ms(60_000), 0);
        assert!(record.is_expired(6_000));
        assert!(!record.is_expired(5_999));
    }

    #[test]
    fn future_creation_time_does_not_extend_delay() {
        let record = record(1, 10_000, 5_000);
        assert_eq!(record.remaining_ms(0), 5_000);
    }

    #[test]
    fn missing_file_loads_as_none() {
        let store = RegistryStore::new(temp_path("missing"));
        assert!(store.load().unwrap().is_none());
    }

    #[test]
    fn save_then_load_is_lossless() {
        let path = temp_path("roundtrip");
        let store = RegistryStore::new(&path);
        let records = vec![record(1, 100, 5_000), record(2, 200, 9_000)];
        store.save(&records).expect("save");
        let loaded = store.load().expect("load").expect("file exists");
        assert_eq!(loaded.records, records);
        assert_eq!(loaded.malformed, 0);
        assert!(!path.with_extension("json.tmp").exists());
        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn malformed_entries_are_skipped() {
        let path = temp_path("malformed");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        let good = serde_json::to_value(record(3, 0, 1_000)).unwrap();
        let contents = serde_json::json!({
            "version": 1,
            "meteorites": [good, {"id": "nope"}, 42]
        });
        fs::write(&path, contents.to_string()).unwrap();
        let loaded = RegistryStore::new(&path).load().unwrap().unwrap();
        assert_eq!(loaded.records.len(), 1);
        assert_eq!(loaded.malformed, 2);
        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn unparseable_file_is_an_error() {
        let path = temp_path("garbage");
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(&path, "{not json").unwrap();
        assert!(RegistryStore::new(&path).load().is_err());
        fs::remove_dir_all(path.parent().unwrap()).ok();
    }

    #[test]
    fn record_serializes_expected_fields() {
        let value = serde_json::to_value(record(4, 5, 6)).unwrap();
        for field in [
            "id",
            "world",
            "x",
            "y",
            "z",
            "created_at_ms",
            "cleanup_delay_ms",
            "materials",
            "radius",
        ] {
            assert!(value.get(field).is_some(), "missing {field}");
        }
        assert_eq!(value["materials"][0], "minecraft:magma_block");
    }
}
