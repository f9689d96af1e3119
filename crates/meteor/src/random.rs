//! Random meteor selection.

use std::collections::BTreeMap;

use rand::Rng;

use crate::settings::{MeteoriteDefinition, RandomMeteorSettings};

/// Pick a meteorite type weighted by `chance`; types with zero chance never win.
pub fn pick_type<'a>(
    meteorites: &'a BTreeMap<String, MeteoriteDefinition>,
    rng: &mut impl Rng,
) -> Option<&'a str> {
    let total: u64 = meteorites.values().map(|d| u64::from(d.chance)).sum();
    if total == 0 {
        return None;
    }
    let mut ticket = rng.gen_range(0..total);
    for (id, definition) in meteorites {
        let weight = u64::from(definition.chance);
        if ticket < weight {
            return Some(id.as_str());
        }
        ticket -= weight;
    }
    None
}

/// Random column inside the configured spawn area (bounds inclusive).
pub fn pick_column(settings: &RandomMeteorSettings, rng: &mut impl Rng) -> (i32, i32) {
    let (min_x, max_x) = ordered(settings.min_x, settings.max_x);
    let (min_z, max_z) = ordered(settings.min_z, settings.max_z);
    (rng.gen_range(min_x..=max_x), rng.gen_range(min_z..=max_z))
}

fn ordered(a: i32, b: i32) -> (i32, i32) {
    if a <= b {
        (a, b)
    } else {
        (b, a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn definition(chance: u32) -> MeteoriteDefinition {
        MeteoriteDefinition {
            chance,
            ..MeteoriteDefinition::default()
        }
    }

    #[test]
    fn zero_chance_types_are_never_picked() {
        let meteorites: BTreeMap<String, MeteoriteDefinition> = [
            ("common".to_string(), definition(3)),
            ("disabled".to_string(), definition(0)),
        ]
        .into_iter()
        .collect();
        let mut rng = StdRng::seed_from_u64(1);
        for _ in 0..500 {
            assert_eq!(pick_type(&meteorites, &mut rng), Some("common"));
        }
    }

    #[test]
    fn nothing_eligible() {
        let meteorites: BTreeMap<String, MeteoriteDefinition> =
            [("off".to_string(), definition(0))].into_iter().collect();
        let mut rng = StdRng::seed_from_u64(2);
        assert_eq!(pick_type(&meteorites, &mut rng), None);
        assert_eq!(pick_type(&BTreeMap::new(), &mut rng), None);
    }

    #[test]
    fn columns_stay_inside_area() {
        let settings = RandomMeteorSettings {
            min_x: 10,
            max_x: -10,
            min_z: 5,
            max_z: 5,
            ..RandomMeteorSettings::default()
        };
        let mut rng = StdRng::seed_from_u64(3);
        for _ in 0..200 {
            let (x, z) = pick_column(&settings, &mut rng);
            assert!((-10..=10).contains(&x));
            assert_eq!(z, 5);
        }
    }
}
