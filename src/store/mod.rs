//! Persistence seam for the garden engine.
//!
//! Reads that need no consistency guarantees go straight through
//! [`GardenStore`]. Every mutation runs inside a [`UnitOfWork`], which holds an
//! exclusive lock on one user's account from `begin` until it is committed or
//! dropped. Writes staged on a unit of work become visible only on `commit`;
//! dropping it discards them.

mod memory;
mod postgres;

use async_trait::async_trait;
use uuid::Uuid;

pub use memory::MemoryGardenStore;
pub use postgres::PgGardenStore;

use crate::{
    error::GardenResult,
    garden::{NewAccount, Plant, User},
};

#[async_trait]
pub trait GardenStore: Send + Sync {
    /// Fails with `EmailTaken` / `UsernameTaken` on collisions.
    async fn create_user(&self, account: NewAccount) -> GardenResult<User>;
    async fn find_user(&self, email: &str) -> GardenResult<Option<User>>;
    async fn list_plants(&self, email: &str) -> GardenResult<Vec<Plant>>;
    async fn find_plant(&self, email: &str, plant_id: Uuid) -> GardenResult<Option<Plant>>;
    /// Users ordered by money, richest first.
    async fn leaderboard(&self, limit: i64) -> GardenResult<Vec<User>>;
    /// Locks the user's account. `NotFound` if there is no such user.
    async fn begin(&self, email: &str) -> GardenResult<Box<dyn UnitOfWork>>;
}

#[async_trait]
pub trait UnitOfWork: Send {
    /// The locked account as it was read at `begin`, plus any staged save.
    fn user(&self) -> &User;
    /// A plant owned by the locked user.
    async fn plant(&mut self, plant_id: Uuid) -> GardenResult<Option<Plant>>;
    async fn plants(&mut self) -> GardenResult<Vec<Plant>>;
    /// True if another account already uses `username`.
    async fn username_taken(&mut self, username: &str) -> GardenResult<bool>;
    async fn save_user(&mut self, user: &User) -> GardenResult<()>;
    async fn insert_plant(&mut self, plant: &Plant) -> GardenResult<()>;
    async fn save_plant(&mut self, plant: &Plant) -> GardenResult<()>;
    async fn delete_plant(&mut self, plant_id: Uuid) -> GardenResult<()>;
    /// Removes the account and every plant it owns.
    async fn delete_user(&mut self) -> GardenResult<()>;
    async fn commit(self: Box<Self>) -> GardenResult<()>;
}
