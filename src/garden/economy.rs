//! Prices and payouts. Amounts are whole coins.

use super::{plant::Stage, rarity::Rarity};

pub const PLANT_COST: i64 = 100;
pub const WATER_COST: i64 = 25;
pub const FERTILIZER_COST: i64 = 25;

pub const STARTING_MONEY: i64 = 250;
pub const STARTING_PLANT_LIMIT: i32 = 3;

/// Charges added to a sprout by one fertilizer application.
pub const FERTILIZER_CHARGES: i32 = 1;

const BASE_LIMIT_PRICE: f64 = 1000.0;
const LIMIT_PRICE_GROWTH: f64 = 1.1;

/// Payout for selling a plant; seeds have none.
pub fn sell_value(rarity: Rarity, stage: Stage) -> Option<i64> {
    let value = match (rarity, stage) {
        (_, Stage::Seed) => return None,
        (Rarity::Common, Stage::Sprout) => 50,
        (Rarity::Common, Stage::Grown) => 100,
        (Rarity::Rare, Stage::Sprout) => 100,
        (Rarity::Rare, Stage::Grown) => 200,
        (Rarity::Legendary, Stage::Sprout) => 250,
        (Rarity::Legendary, Stage::Grown) => 500,
    };
    Some(value)
}

/// Price of the next plant-limit upgrade after `upgrades_bought` earlier ones:
/// `round(1000 * 1.1^n)`, halves rounded away from zero.
pub fn plant_limit_price(upgrades_bought: u32) -> i64 {
    let exp = i32::try_from(upgrades_bought).unwrap_or(i32::MAX);
    (BASE_LIMIT_PRICE * LIMIT_PRICE_GROWTH.powi(exp)).round() as i64
}
