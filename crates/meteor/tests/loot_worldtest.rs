//! Treasure loot worldtest: chance boundaries over many fills.

use rand::rngs::StdRng;
use rand::SeedableRng;
use skyfall_core::RegistryKey;
use skyfall_meteor::loot::{fill_container, roll_loot, LootAmount, LootEntry};
use skyfall_world::{ContainerKind, ContainerState, Materials};

const FILLS: usize = 1000;

fn entry(item: &str, chance: f64) -> LootEntry {
    LootEntry {
        item: item.to_string(),
        chance,
        amount: LootAmount::Text("1-3".to_string()),
        ..LootEntry::default()
    }
}

#[test]
fn zero_chance_never_and_full_chance_always() {
    let materials = Materials::builtin();
    let entries = vec![entry("diamond", 100.0), entry("nether_star", 0.0)];
    let diamond = RegistryKey::parse("diamond").unwrap();
    let star = RegistryKey::parse("nether_star").unwrap();
    let mut rng = StdRng::seed_from_u64(1000);

    for _ in 0..FILLS {
        let mut chest = ContainerState::new(ContainerKind::Chest);
        let items = roll_loot(&entries, &materials, &mut rng);
        assert_eq!(fill_container(&mut chest, &materials, items), 1);
        let stacks: Vec<_> = chest.items().collect();
        assert_eq!(stacks.len(), 1);
        assert_eq!(stacks[0].item, diamond);
        assert!((1..=3).contains(&stacks[0].count));
        assert!(chest.items().all(|s| s.item != star));
    }
}

#[test]
fn half_chance_lands_near_half() {
    let materials = Materials::builtin();
    let entries = vec![entry("emerald", 50.0)];
    let mut rng = StdRng::seed_from_u64(50);
    let hits = (0..FILLS)
        .filter(|_| !roll_loot(&entries, &materials, &mut rng).is_empty())
        .count();
    assert!((400..600).contains(&hits), "hits = {hits}");
}
