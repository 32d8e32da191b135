use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use time::OffsetDateTime;

use super::economy::{self, STARTING_PLANT_LIMIT};
use crate::error::{GardenError, GardenResult};

/// Number of weather states a garden cycles through.
pub const WEATHER_STATES: i16 = 4;

/// Player account row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct User {
    pub email: String,
    pub username: String,
    #[serde(skip_serializing)]
    pub password_hash: String, // argon2 PHC string
    pub money: i64,
    pub plant_limit: i32,
    pub plant_count: i32,
    pub weather: i16,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

/// Input for opening an account; balance and limit come from the ledger.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
}

pub fn validate_username(username: &str) -> GardenResult<()> {
    lazy_static! {
        static ref USERNAME_RE: Regex = Regex::new(r"^[A-Za-z0-9_]{3,32}$").unwrap();
    }
    if USERNAME_RE.is_match(username) {
        Ok(())
    } else {
        Err(GardenError::Validation(
            "username must be 3-32 letters, digits or underscores".into(),
        ))
    }
}

impl User {
    pub fn debit(&mut self, amount: i64) -> GardenResult<()> {
        if amount < 0 {
            return Err(GardenError::Validation(format!("negative debit {amount}")));
        }
        if self.money < amount {
            return Err(GardenError::InsufficientFunds {
                needed: amount,
                available: self.money,
            });
        }
        self.money -= amount;
        Ok(())
    }

    pub fn credit(&mut self, amount: i64) -> GardenResult<()> {
        if amount < 0 {
            return Err(GardenError::Validation(format!("negative credit {amount}")));
        }
        self.money = self.money.saturating_add(amount);
        Ok(())
    }

    pub fn check_and_increment_plant_count(&mut self) -> GardenResult<()> {
        if self.plant_count >= self.plant_limit {
            return Err(GardenError::PlantLimitReached {
                limit: self.plant_limit,
            });
        }
        self.plant_count += 1;
        Ok(())
    }

    pub fn decrement_plant_count(&mut self) {
        self.plant_count = (self.plant_count - 1).max(0);
    }

    pub fn limit_upgrades(&self) -> u32 {
        u32::try_from(self.plant_limit - STARTING_PLANT_LIMIT).unwrap_or(0)
    }

    pub fn next_limit_price(&self) -> i64 {
        economy::plant_limit_price(self.limit_upgrades())
    }

    /// Buys one more plant slot at the current upgrade price.
    pub fn upgrade_plant_limit(&mut self) -> GardenResult<i64> {
        let price = self.next_limit_price();
        self.debit(price)?;
        self.plant_limit += 1;
        Ok(price)
    }

    /// Uniqueness is checked by the store; this only validates the shape.
    pub fn rename(&mut self, new_username: &str) -> GardenResult<()> {
        validate_username(new_username)?;
        self.username = new_username.to_string();
        Ok(())
    }

    pub fn set_weather(&mut self) -> i16 {
        self.weather = (self.weather + 1).rem_euclid(WEATHER_STATES);
        self.weather
    }
}
