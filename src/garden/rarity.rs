use rand::{seq::SliceRandom, Rng};
use serde::{Deserialize, Serialize};

/// Draw thresholds: below the first is Common, below the second is Rare.
const COMMON_BELOW: f64 = 0.79;
const RARE_BELOW: f64 = 0.99;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "rarity", rename_all = "lowercase")]
pub enum Rarity {
    Common,
    Rare,
    Legendary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(type_name = "plant_type", rename_all = "lowercase")]
pub enum PlantType {
    Fungi,
    Rose,
    Berry,
}

impl Rarity {
    /// Maps a uniform draw in [0, 1) onto the 79/20/1 split.
    pub fn from_draw(draw: f64) -> Self {
        if draw < COMMON_BELOW {
            Rarity::Common
        } else if draw < RARE_BELOW {
            Rarity::Rare
        } else {
            Rarity::Legendary
        }
    }
}

pub fn draw_rarity<R: Rng + ?Sized>(rng: &mut R) -> Rarity {
    Rarity::from_draw(rng.gen::<f64>())
}

fn species_pool(plant_type: PlantType, rarity: Rarity) -> &'static [&'static str] {
    match (plant_type, rarity) {
        (PlantType::Fungi, Rarity::Common) => &["Button Mushroom"],
        (PlantType::Fungi, Rarity::Rare) => &["Fly Agaric"],
        (PlantType::Fungi, Rarity::Legendary) => &["Ghost Fungus"],
        (PlantType::Rose, Rarity::Common) => &["Garden Rose"],
        (PlantType::Rose, Rarity::Rare) => &["Black Baccara", "Blue Moon"],
        (PlantType::Rose, Rarity::Legendary) => &["Juliet Rose"],
        (PlantType::Berry, Rarity::Common) => &["Strawberry"],
        (PlantType::Berry, Rarity::Rare) => &["Blueberry"],
        (PlantType::Berry, Rarity::Legendary) => &["Golden Raspberry"],
    }
}

/// Species for a type/rarity pair. Tiers with several species pick one uniformly.
pub fn species_for<R: Rng + ?Sized>(plant_type: PlantType, rarity: Rarity, rng: &mut R) -> &'static str {
    let pool = species_pool(plant_type, rarity);
    pool.choose(rng).copied().unwrap_or(pool[0])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::{rngs::StdRng, SeedableRng};

    #[test]
    fn thresholds_split_the_unit_interval() {
        assert_eq!(Rarity::from_draw(0.0), Rarity::Common);
        assert_eq!(Rarity::from_draw(0.7899), Rarity::Common);
        assert_eq!(Rarity::from_draw(0.79), Rarity::Rare);
        assert_eq!(Rarity::from_draw(0.9899), Rarity::Rare);
        assert_eq!(Rarity::from_draw(0.99), Rarity::Legendary);
        assert_eq!(Rarity::from_draw(0.999_999), Rarity::Legendary);
    }

    #[test]
    fn distribution_over_many_draws() {
        let mut rng = StdRng::seed_from_u64(7);
        let trials = 100_000;
        let (mut common, mut rare, mut legendary) = (0u32, 0u32, 0u32);
        for _ in 0..trials {
            match draw_rarity(&mut rng) {
                Rarity::Common => common += 1,
                Rarity::Rare => rare += 1,
                Rarity::Legendary => legendary += 1,
            }
        }
        assert_eq!(common + rare + legendary, trials);
        assert!((77_500..=80_500).contains(&common), "common = {common}");
        assert!((18_800..=21_200).contains(&rare), "rare = {rare}");
        assert!((700..=1_300).contains(&legendary), "legendary = {legendary}");
    }

    #[test]
    fn every_pair_has_a_species() {
        let mut rng = StdRng::seed_from_u64(1);
        for plant_type in [PlantType::Fungi, PlantType::Rose, PlantType::Berry] {
            for rarity in [Rarity::Common, Rarity::Rare, Rarity::Legendary] {
                assert!(!species_for(plant_type, rarity, &mut rng).is_empty());
            }
        }
    }

    #[test]
    fn rare_rose_picks_both_species() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..200 {
            seen.insert(species_for(PlantType::Rose, Rarity::Rare, &mut rng));
        }
        assert_eq!(seen.len(), 2);
        assert!(seen.contains("Black Baccara"));
        assert!(seen.contains("Blue Moon"));
    }

    #[test]
    fn single_species_tiers_are_fixed() {
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(species_for(PlantType::Berry, Rarity::Legendary, &mut rng), "Golden Raspberry");
        assert_eq!(species_for(PlantType::Fungi, Rarity::Common, &mut rng), "Button Mushroom");
    }
}
