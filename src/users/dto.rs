use serde::{Deserialize, Serialize};

use crate::garden::User;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    #[serde(flatten)]
    pub user: User,
    pub next_limit_price: i64,
}

impl From<User> for MeResponse {
    fn from(user: User) -> Self {
        let next_limit_price = user.next_limit_price();
        Self {
            user,
            next_limit_price,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct RenameRequest {
    pub username: String,
}

#[derive(Debug, Serialize)]
pub struct PlantLimitQuote {
    pub plant_limit: i32,
    pub plant_count: i32,
    pub upgrades_bought: u32,
    pub next_price: i64,
}

/// Leaderboard rows expose usernames only, never emails.
#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    pub rank: usize,
    pub username: String,
    pub money: i64,
    pub plant_count: i32,
}

#[derive(Debug, Deserialize)]
pub struct LeaderboardQuery {
    #[serde(default = "default_limit")]
    pub limit: i64,
}
fn default_limit() -> i64 { 10 }
