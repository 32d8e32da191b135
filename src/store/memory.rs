use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use parking_lot::Mutex;
use time::OffsetDateTime;
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use uuid::Uuid;

use super::{GardenStore, UnitOfWork};
use crate::{
    error::{GardenError, GardenResult},
    garden::{economy, NewAccount, Plant, User},
};

#[derive(Default)]
struct Tables {
    users: HashMap<String, User>,
    plants: HashMap<Uuid, Plant>,
}

impl Tables {
    fn plants_of(&self, email: &str) -> Vec<Plant> {
        let mut plants: Vec<Plant> = self
            .plants
            .values()
            .filter(|p| p.owner_email == email)
            .cloned()
            .collect();
        plants.sort_by_key(|p| (p.created_at, p.plant_id));
        plants
    }

    fn username_in_use(&self, username: &str, except_email: &str) -> bool {
        self.users
            .values()
            .any(|u| u.username == username && u.email != except_email)
    }
}

/// Process-local store for development runs and tests.
///
/// Each account has its own async mutex; a unit of work holds it from `begin`
/// to commit/drop, so operations on one account run one at a time while
/// different accounts proceed in parallel. Table access itself is guarded by a
/// short synchronous lock that is never held across an await.
#[derive(Clone, Default)]
pub struct MemoryGardenStore {
    tables: Arc<Mutex<Tables>>,
    locks: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

impl MemoryGardenStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn account_lock(&self, email: &str) -> Arc<AsyncMutex<()>> {
        self.locks
            .lock()
            .entry(email.to_string())
            .or_default()
            .clone()
    }

    /// Writes a plant row directly, bypassing the engine.
    #[cfg(test)]
    pub(crate) fn put_plant(&self, plant: Plant) {
        self.tables.lock().plants.insert(plant.plant_id, plant);
    }
}

#[async_trait]
impl GardenStore for MemoryGardenStore {
    async fn create_user(&self, account: NewAccount) -> GardenResult<User> {
        let mut tables = self.tables.lock();
        if tables.users.contains_key(&account.email) {
            return Err(GardenError::EmailTaken);
        }
        if tables.username_in_use(&account.username, &account.email) {
            return Err(GardenError::UsernameTaken);
        }
        let user = User {
            email: account.email,
            username: account.username,
            password_hash: account.password_hash,
            money: economy::STARTING_MONEY,
            plant_limit: economy::STARTING_PLANT_LIMIT,
            plant_count: 0,
            weather: 0,
            created_at: OffsetDateTime::now_utc(),
        };
        tables.users.insert(user.email.clone(), user.clone());
        Ok(user)
    }

    async fn find_user(&self, email: &str) -> GardenResult<Option<User>> {
        Ok(self.tables.lock().users.get(email).cloned())
    }

    async fn list_plants(&self, email: &str) -> GardenResult<Vec<Plant>> {
        Ok(self.tables.lock().plants_of(email))
    }

    async fn find_plant(&self, email: &str, plant_id: Uuid) -> GardenResult<Option<Plant>> {
        Ok(self
            .tables
            .lock()
            .plants
            .get(&plant_id)
            .filter(|p| p.owner_email == email)
            .cloned())
    }

    async fn leaderboard(&self, limit: i64) -> GardenResult<Vec<User>> {
        let mut users: Vec<User> = self.tables.lock().users.values().cloned().collect();
        users.sort_by(|a, b| b.money.cmp(&a.money).then_with(|| a.username.cmp(&b.username)));
        users.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(users)
    }

    async fn begin(&self, email: &str) -> GardenResult<Box<dyn UnitOfWork>> {
        let guard = self.account_lock(email).lock_owned().await;
        let (user, plants) = {
            let tables = self.tables.lock();
            let user = tables
                .users
                .get(email)
                .cloned()
                .ok_or(GardenError::NotFound("user"))?;
            (user, tables.plants_of(email))
        };
        Ok(Box::new(MemoryUnitOfWork {
            _guard: guard,
            tables: Arc::clone(&self.tables),
            user,
            plants: plants.into_iter().map(|p| (p.plant_id, p)).collect(),
            deleted: false,
        }))
    }
}

/// Working copy of one account. Nothing reaches the shared tables before `commit`.
struct MemoryUnitOfWork {
    _guard: OwnedMutexGuard<()>,
    tables: Arc<Mutex<Tables>>,
    user: User,
    plants: HashMap<Uuid, Plant>,
    deleted: bool,
}

#[async_trait]
impl UnitOfWork for MemoryUnitOfWork {
    fn user(&self) -> &User {
        &self.user
    }

    async fn plant(&mut self, plant_id: Uuid) -> GardenResult<Option<Plant>> {
        Ok(self.plants.get(&plant_id).cloned())
    }

    async fn plants(&mut self) -> GardenResult<Vec<Plant>> {
        let mut plants: Vec<Plant> = self.plants.values().cloned().collect();
        plants.sort_by_key(|p| (p.created_at, p.plant_id));
        Ok(plants)
    }

    async fn username_taken(&mut self, username: &str) -> GardenResult<bool> {
        Ok(self.tables.lock().username_in_use(username, &self.user.email))
    }

    async fn save_user(&mut self, user: &User) -> GardenResult<()> {
        self.user = user.clone();
        Ok(())
    }

    async fn insert_plant(&mut self, plant: &Plant) -> GardenResult<()> {
        self.plants.insert(plant.plant_id, plant.clone());
        Ok(())
    }

    async fn save_plant(&mut self, plant: &Plant) -> GardenResult<()> {
        match self.plants.get_mut(&plant.plant_id) {
            Some(slot) => {
                *slot = plant.clone();
                Ok(())
            }
            None => Err(GardenError::NotFound("plant")),
        }
    }

    async fn delete_plant(&mut self, plant_id: Uuid) -> GardenResult<()> {
        self.plants.remove(&plant_id);
        Ok(())
    }

    async fn delete_user(&mut self) -> GardenResult<()> {
        self.deleted = true;
        self.plants.clear();
        Ok(())
    }

    async fn commit(self: Box<Self>) -> GardenResult<()> {
        let MemoryUnitOfWork {
            _guard,
            tables,
            user,
            plants,
            deleted,
        } = *self;
        let mut tables = tables.lock();
        // Same guarantee the UNIQUE constraint gives in postgres.
        if !deleted && tables.username_in_use(&user.username, &user.email) {
            return Err(GardenError::UsernameTaken);
        }
        tables.plants.retain(|_, p| p.owner_email != user.email);
        if deleted {
            tables.users.remove(&user.email);
        } else {
            tables.plants.extend(plants);
            tables.users.insert(user.email.clone(), user);
        }
        Ok(())
    }
}
