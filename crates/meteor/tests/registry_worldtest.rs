//! Lifecycle registry worldtest: durability, expiry on reload and dedup.

use std::collections::BTreeSet;
use std::fs;
use std::sync::{Arc, Barrier};
use std::thread;

use proptest::prelude::*;
use skyfall_core::{BlockPos, InstanceId, RegistryKey, WorldPoint};
use skyfall_meteor::{
    Clock, LifecycleRegistry, ManualClock, PlacementRecord, RegisterError, RegisterRequest, RegistryStore,
};
use skyfall_testkit::TempDir;

const MINUTE_MS: i64 = 60_000;

fn materials() -> BTreeSet<RegistryKey> {
    ["obsidian", "magma_block"]
        .into_iter()
        .map(|name| RegistryKey::parse(name).unwrap())
        .collect()
}

fn request(id: u128, world: &str, pos: BlockPos, delay_ms: u64) -> RegisterRequest {
    RegisterRequest {
        id: InstanceId::from_u128(id),
        point: WorldPoint::new(world, pos),
        cleanup_delay_ms: delay_ms,
        materials: materials(),
        radius: Some(8),
    }
}

fn open_registry(dir: &TempDir, clock: &Arc<ManualClock>) -> LifecycleRegistry {
    let clock: Arc<ManualClock> = Arc::clone(clock);
    LifecycleRegistry::new(RegistryStore::new(dir.file("meteorites.json")), clock)
}

#[test]
fn concurrent_registration_on_one_key_admits_exactly_one() {
    let dir = TempDir::new("registry_race").unwrap();
    let clock = Arc::new(ManualClock::new(1_000));
    let registry = Arc::new(open_registry(&dir, &clock));
    let pos = BlockPos::new(10, 64, 10);

    // The first registration is held in flight while the second one runs.
    let claim = registry
        .guard()
        .try_claim(WorldPoint::new("W", pos).key())
        .unwrap();
    let barrier = Arc::new(Barrier::new(2));
    let contender = {
        let registry = Arc::clone(&registry);
        let barrier = Arc::clone(&barrier);
        thread::spawn(move || {
            barrier.wait();
            registry.register(request(2, "W", pos, 300_000))
        })
    };
    barrier.wait();
    let rejected = contender.join().unwrap();
    let accepted = registry.register_claimed(&claim, request(1, "W", pos, 300_000));
    drop(claim);

    assert_eq!(
        rejected,
        Err(RegisterError::Duplicate(WorldPoint::new("W", pos).key()))
    );
    assert_eq!(accepted.id(), InstanceId::from_u128(1));
    assert_eq!(registry.len(), 1);
    assert!(!registry.guard().is_held(&WorldPoint::new("W", pos).key()));
}

#[test]
fn many_threads_racing_one_key_register_at_most_once_each_round() {
    let dir = TempDir::new("registry_many").unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let registry = Arc::new(open_registry(&dir, &clock));
    let pos = BlockPos::new(-5, 70, 12);
    let threads = 8;
    let barrier = Arc::new(Barrier::new(threads));
    let handles: Vec<_> = (0..threads)
        .map(|i| {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                barrier.wait();
                registry.register(request(100 + i as u128, "W", pos, 60_000))
            })
        })
        .collect();
    let results: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let accepted = results.iter().filter(|r| r.is_ok()).count();
    assert!(accepted >= 1);
    assert_eq!(registry.len(), accepted);
    assert_eq!(registry.guard().held_count(), 0);
}

#[test]
fn first_registration_succeeds_then_in_flight_duplicate_is_rejected() {
    let dir = TempDir::new("registry_dup").unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let registry = open_registry(&dir, &clock);
    let pos = BlockPos::new(10, 64, 10);
    let key = WorldPoint::new("W", pos).key();

    let claim = registry.guard().try_claim(key.clone()).unwrap();
    let first = registry.register_claimed(&claim, request(1, "W", pos, 300_000));
    let second = registry.register(request(2, "W", pos, 300_000));
    drop(claim);

    assert_eq!(first.pos(), pos);
    assert_eq!(second, Err(RegisterError::Duplicate(key)));
    assert!(registry.contains(InstanceId::from_u128(1)));
    assert!(!registry.contains(InstanceId::from_u128(2)));
}

#[test]
fn record_older_than_its_delay_is_dropped_on_load() {
    let dir = TempDir::new("registry_stale").unwrap();
    let clock = Arc::new(ManualClock::new(0));
    let now = 1_700_000_000_000;
    let stale = PlacementRecord::new(
        InstanceId::from_u128(1),
        &WorldPoint::new("W", BlockPos::new(0, 64, 0)),
        now - 10 * MINUTE_MS,
        (5 * MINUTE_MS) as u64,
        materials(),
        None,
    );
    let fresh = PlacementRecord::new(
        InstanceId::from_u128(2),
        &WorldPoint::new("W", BlockPos::new(50, 64, 0)),
        now - 2 * MINUTE_MS,
        (5 * MINUTE_MS) as u64,
        materials(),
        None,
    );
    RegistryStore::new(dir.file("meteorites.json"))
        .save([&stale, &fresh])
        .unwrap();

    clock.set(now);
    let registry = open_registry(&dir, &clock);
    let survivors = registry.load_on_startup();

    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].id(), InstanceId::from_u128(2));
    assert_eq!(survivors[0].remaining_ms(now), (3 * MINUTE_MS) as u64);
    assert!(!registry.contains(InstanceId::from_u128(1)));
}

#[test]
fn malformed_entries_are_skipped_on_load() {
    let dir = TempDir::new("registry_malformed").unwrap();
    let path = dir.file("meteorites.json");
    let good = InstanceId::from_u128(7);
    fs::write(
        &path,
        format!(
            r#"{{
  "version": 1,
  "meteorites": [
    {{"id": "{good}", "world": "W", "x": 1, "y": 64, "z": 2,
      "created_at_ms": 0, "cleanup_delay_ms": 600000, "materials": ["minecraft:obsidian"]}},
    {{"id": "not-an-id", "world": "W", "x": 1, "y": 64, "z": 2,
      "created_at_ms": 0, "cleanup_delay_ms": 600000, "materials": []}},
    {{"world": "W"}}
  ]
}}"#
        ),
    )
    .unwrap();

    let clock = Arc::new(ManualClock::new(1_000));
    let registry = open_registry(&dir, &clock);
    let survivors = registry.load_on_startup();
    assert_eq!(survivors.len(), 1);
    assert_eq!(survivors[0].id(), good);
    assert_eq!(survivors[0].radius(), None);
}

#[test]
fn remaining_time_shrinks_across_restart() {
    let dir = TempDir::new("registry_restart").unwrap();
    let clock = Arc::new(ManualClock::new(0));
    {
        let registry = open_registry(&dir, &clock);
        registry
            .register(request(1, "W", BlockPos::new(3, 64, 3), 600_000))
            .unwrap();
    }
    clock.advance(4 * MINUTE_MS);
    let registry = open_registry(&dir, &clock);
    let survivors = registry.load_on_startup();
    assert_eq!(survivors.len(), 1);
    assert_eq!(
        survivors[0].remaining_ms(clock.now_millis()),
        (6 * MINUTE_MS) as u64
    );
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn save_load_round_trip_drops_only_expired(
        entries in prop::collection::vec(
            (-10_000i32..10_000, 1i32..255, -10_000i32..10_000, 0i64..3_600_000, 1u64..3_600_000),
            1..12,
        ),
        elapsed in 0i64..3_600_000,
    ) {
        let dir = TempDir::new("registry_prop").unwrap();
        let start = 1_000_000_000;
        let clock = Arc::new(ManualClock::new(start));
        let writer = open_registry(&dir, &clock);
        let mut expected = Vec::new();
        for (i, (x, y, z, age, delay)) in entries.iter().copied().enumerate() {
            clock.set(start - age);
            let record = writer
                .register(request(i as u128 + 1, "W", BlockPos::new(x, y, z), delay))
                .unwrap();
            expected.push(record);
        }
        let now = start + elapsed;
        clock.set(now);
        writer.save();

        let reader = open_registry(&dir, &clock);
        let mut survivors = reader.load_on_startup();
        survivors.sort_by_key(|r| r.id());
        let mut live: Vec<PlacementRecord> = expected
            .into_iter()
            .filter(|r| !r.is_expired(now))
            .collect();
        live.sort_by_key(|r| r.id());
        prop_assert_eq!(survivors, live);
    }
}
