//! Durable lifecycle registry.
//!
//! Owns the in-memory id -> record map and mirrors it to the registry file
//! after every mutation. All access goes through `&self` methods that take the
//! single state lock, so a deferred cleanup and a fresh registration can race
//! without corrupting the map or the file.

use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, Mutex, MutexGuard};

use skyfall_core::{InstanceId, RegistryKey, WorldPoint};
use tracing::{error, info, warn};

use crate::clock::Clock;
use crate::error::RegisterError;
use crate::guard::{Claim, DedupGuard};
use crate::record::{PlacementRecord, RegistryStore};

/// Everything needed to register a landed instance.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegisterRequest {
    /// Instance to register.
    pub id: InstanceId,
    /// Impact point, also the dedup key.
    pub point: WorldPoint,
    /// Delay until cleanup.
    pub cleanup_delay_ms: u64,
    /// Cleanup whitelist.
    pub materials: BTreeSet<RegistryKey>,
    /// Sweep radius override.
    pub radius: Option<i32>,
}

#[derive(Default)]
struct RegistryState {
    records: BTreeMap<InstanceId, PlacementRecord>,
}

/// Durable set of landed instances awaiting cleanup.
pub struct LifecycleRegistry {
    store: RegistryStore,
    guard: DedupGuard,
    clock: Arc<dyn Clock>,
    state: Mutex<RegistryState>,
}

impl LifecycleRegistry {
    /// Registry persisting through `store`, timed by `clock`.
    pub fn new(store: RegistryStore, clock: Arc<dyn Clock>) -> Self {
        Self {
            store,
            guard: DedupGuard::new(),
            clock,
            state: Mutex::new(RegistryState::default()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, RegistryState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Guard used to mark registrations in flight.
    pub fn guard(&self) -> &DedupGuard {
        &self.guard
    }

    /// Backing store.
    pub fn store(&self) -> &RegistryStore {
        &self.store
    }

    /// Current wall-clock time in epoch milliseconds.
    pub fn now_millis(&self) -> i64 {
        self.clock.now_millis()
    }

    /// Claim the request's coordinate, record it and persist.
    pub fn register(&self, request: RegisterRequest) -> Result<PlacementRecord, RegisterError> {
        let claim = self.guard.try_claim(request.point.key()).map_err(|err| {
            warn!(key = %request.point.key(), instance = %request.id, "Duplicate meteorite registration rejected");
            err
        })?;
        Ok(self.register_claimed(&claim, request))
    }

    /// Complete a registration whose coordinate the caller already claimed.
    pub fn register_claimed(&self, claim: &Claim, request: RegisterRequest) -> PlacementRecord {
        debug_assert_eq!(claim.key(), &request.point.key());
        let record = PlacementRecord::new(
            request.id,
            &request.point,
            self.clock.now_millis(),
            request.cleanup_delay_ms,
            request.materials,
            request.radius,
        );
        let mut state = self.lock();
        state.records.insert(record.id(), record.clone());
        self.persist(&state);
        drop(state);
        info!(
            instance = %record.id().short(),
            key = %claim.key(),
            minutes = record.cleanup_delay_ms() / 60_000,
            "Meteorite registered for cleanup"
        );
        record
    }

    /// Restore records from the registry file, dropping expired ones.
    ///
    /// Returns the surviving records so the caller can schedule their cleanup.
    pub fn load_on_startup(&self) -> Vec<PlacementRecord> {
        let loaded = match self.store.load() {
            Ok(Some(loaded)) => loaded,
            Ok(None) => {
                info!(path = %self.store.path().display(), "No meteorite registry found, starting empty");
                return Vec::new();
            }
            Err(err) => {
                error!(
                    error = %format!("{err:#}"),
                    path = %self.store.path().display(),
                    "Meteorite registry unreadable, starting empty"
                );
                return Vec::new();
            }
        };

        let now = self.clock.now_millis();
        let mut survivors = Vec::new();
        let mut state = self.lock();
        for record in loaded.records {
            if record.is_expired(now) {
                info!(instance = %record.id().short(), "Skipping expired meteorite from registry");
                continue;
            }
            info!(
                instance = %record.id().short(),
                location = %record.point(),
                minutes = record.remaining_ms(now) / 60_000,
                "Restored meteorite from registry"
            );
            state.records.insert(record.id(), record.clone());
            survivors.push(record);
        }
        survivors
    }

    /// Persist every non-expired record. Returns false if the write failed.
    pub fn save(&self) -> bool {
        let state = self.lock();
        self.persist(&state)
    }

    /// Remove a record and persist, atomically with respect to other callers.
    pub fn remove(&self, id: InstanceId) -> Option<PlacementRecord> {
        let mut state = self.lock();
        let removed = state.records.remove(&id)?;
        self.persist(&state);
        Some(removed)
    }

    /// Record for `id`, if registered.
    pub fn get(&self, id: InstanceId) -> Option<PlacementRecord> {
        self.lock().records.get(&id).cloned()
    }

    /// Whether `id` is registered.
    pub fn contains(&self, id: InstanceId) -> bool {
        self.lock().records.contains_key(&id)
    }

    /// Number of registered instances.
    pub fn len(&self) -> usize {
        self.lock().records.len()
    }

    /// True when nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().records.is_empty()
    }

    /// Ids of records whose cleanup is due at `now_ms`.
    pub fn expired(&self, now_ms: i64) -> Vec<InstanceId> {
        self.lock()
            .records
            .values()
            .filter(|record| record.is_expired(now_ms))
            .map(PlacementRecord::id)
            .collect()
    }

    /// Snapshot of every record in id order.
    pub fn records(&self) -> Vec<PlacementRecord> {
        self.lock().records.values().cloned().collect()
    }

    fn persist(&self, state: &RegistryState) -> bool {
        let now = self.clock.now_millis();
        let mut live: Vec<&PlacementRecord> = state
            .records
            .values()
            .filter(|record| !record.is_expired(now))
            .collect();
        live.sort_by_key(|record| (record.created_at_ms(), record.id()));
        match self.store.save(live) {
            Ok(()) => true,
            Err(err) => {
                error!(
                    error = %format!("{err:#}"),
                    path = %self.store.path().display(),
                    "Failed to save meteorite registry, keeping in-memory state"
                );
                false
            }
        }
    }
}
