use std::ops::RangeInclusive;

use rand::Rng;

use super::rarity::Rarity;

/// Minutes a seed waits before it may sprout.
pub const STAGE0_MINUTES: i32 = 30;

pub fn initial_stage0_duration() -> i32 {
    STAGE0_MINUTES
}

pub fn stage1_range(rarity: Rarity) -> RangeInclusive<i32> {
    match rarity {
        Rarity::Common => 60..=120,
        Rarity::Rare => 120..=240,
        Rarity::Legendary => 240..=360,
    }
}

/// Sprout duration, uniform over the rarity's inclusive range.
pub fn stage1_duration<R: Rng + ?Sized>(rarity: Rarity, rng: &mut R) -> i32 {
    rng.gen_range(stage1_range(rarity))
}

pub fn tick(remaining: i32, elapsed_minutes: i32) -> i32 {
    remaining.saturating_sub(elapsed_minutes).max(0)
}
