use std::sync::Arc;

use parking_lot::Mutex;
use rand::{rngs::StdRng, SeedableRng};
use serde::Serialize;
use time::OffsetDateTime;
use tracing::{debug, info, instrument};
use uuid::Uuid;

use super::{
    account::{self, NewAccount, User},
    economy::{FERTILIZER_COST, PLANT_COST, WATER_COST},
    plant::{Growth, Plant, Position},
    rarity::PlantType,
};
use crate::{
    error::{GardenError, GardenResult},
    store::GardenStore,
};

pub const LEADERBOARD_MAX: i64 = 100;

/// A plant together with its owner's account after an operation.
#[derive(Debug, Clone, Serialize)]
pub struct PlantReceipt {
    pub user: User,
    pub plant: Plant,
}

#[derive(Debug, Clone, Serialize)]
pub struct SaleReceipt {
    pub user: User,
    pub plant_id: Uuid,
    pub credited: i64,
}

/// Runs every garden operation as a single unit of work on the owner's account.
///
/// Checks run against the locked account, writes are staged, and nothing is
/// visible until the final commit. An early `?` drops the unit of work, which
/// discards everything staged so far.
pub struct GardenEngine {
    store: Arc<dyn GardenStore>,
    rng: Mutex<StdRng>,
}

impl GardenEngine {
    pub fn new(store: Arc<dyn GardenStore>, rng: StdRng) -> Self {
        Self {
            store,
            rng: Mutex::new(rng),
        }
    }

    pub fn from_entropy(store: Arc<dyn GardenStore>) -> Self {
        Self::new(store, StdRng::from_entropy())
    }

    // The guard is released before returning, so it never crosses an await.
    fn with_rng<T>(&self, f: impl FnOnce(&mut StdRng) -> T) -> T {
        let mut rng = self.rng.lock();
        f(&mut rng)
    }

    #[instrument(skip(self, account), fields(email = %account.email))]
    pub async fn open_account(&self, account: NewAccount) -> GardenResult<User> {
        account::validate_username(&account.username)?;
        let user = self.store.create_user(account).await?;
        info!(email = %user.email, username = %user.username, "account opened");
        Ok(user)
    }

    pub async fn account(&self, email: &str) -> GardenResult<User> {
        self.store
            .find_user(email)
            .await?
            .ok_or(GardenError::NotFound("user"))
    }

    pub async fn find_account(&self, email: &str) -> GardenResult<Option<User>> {
        self.store.find_user(email).await
    }

    pub async fn plants(&self, email: &str) -> GardenResult<Vec<Plant>> {
        self.store.list_plants(email).await
    }

    pub async fn plant(&self, email: &str, plant_id: Uuid) -> GardenResult<Plant> {
        self.store
            .find_plant(email, plant_id)
            .await?
            .ok_or(GardenError::NotFound("plant"))
    }

    pub async fn leaderboard(&self, limit: i64) -> GardenResult<Vec<User>> {
        self.store.leaderboard(limit.clamp(1, LEADERBOARD_MAX)).await
    }

    #[instrument(skip(self))]
    pub async fn purchase(
        &self,
        email: &str,
        plant_type: PlantType,
        x: i32,
        y: i32,
    ) -> GardenResult<PlantReceipt> {
        let position = Position::new(x, y)?;
        let mut uow = self.store.begin(email).await?;
        let mut user = uow.user().clone();
        user.check_and_increment_plant_count()?;
        user.debit(PLANT_COST)?;

        let now = OffsetDateTime::now_utc();
        let plant = self.with_rng(|rng| Plant::seed(email, plant_type, position, now, rng));

        uow.insert_plant(&plant).await?;
        uow.save_user(&user).await?;
        uow.commit().await?;

        info!(
            %email,
            plant_id = %plant.plant_id,
            rarity = ?plant.rarity,
            species = %plant.plant_species,
            money = user.money,
            "plant purchased"
        );
        Ok(PlantReceipt { user, plant })
    }

    #[instrument(skip(self))]
    pub async fn water(&self, email: &str, plant_id: Uuid) -> GardenResult<PlantReceipt> {
        let mut uow = self.store.begin(email).await?;
        let mut plant = uow
            .plant(plant_id)
            .await?
            .ok_or(GardenError::NotFound("plant"))?;
        let mut user = uow.user().clone();
        plant.apply_water()?;
        user.debit(WATER_COST)?;

        uow.save_plant(&plant).await?;
        uow.save_user(&user).await?;
        uow.commit().await?;

        info!(%email, %plant_id, money = user.money, "plant watered");
        Ok(PlantReceipt { user, plant })
    }

    #[instrument(skip(self))]
    pub async fn fertilize(&self, email: &str, plant_id: Uuid) -> GardenResult<PlantReceipt> {
        let mut uow = self.store.begin(email).await?;
        let mut plant = uow
            .plant(plant_id)
            .await?
            .ok_or(GardenError::NotFound("plant"))?;
        let mut user = uow.user().clone();
        plant.apply_fertilizer()?;
        user.debit(FERTILIZER_COST)?;

        uow.save_plant(&plant).await?;
        uow.save_user(&user).await?;
        uow.commit().await?;

        info!(
            %email,
            %plant_id,
            charges = plant.fertilizer_remaining,
            money = user.money,
            "plant fertilized"
        );
        Ok(PlantReceipt { user, plant })
    }

    #[instrument(skip(self))]
    pub async fn grow(&self, email: &str, plant_id: Uuid, elapsed_minutes: i32) -> GardenResult<Plant> {
        let mut uow = self.store.begin(email).await?;
        let mut plant = uow
            .plant(plant_id)
            .await?
            .ok_or(GardenError::NotFound("plant"))?;
        let growth = self.with_rng(|rng| plant.grow(elapsed_minutes, rng))?;
        uow.save_plant(&plant).await?;
        uow.commit().await?;

        log_growth(email, &plant, growth);
        Ok(plant)
    }

    /// Ticks every plant the user owns by the same number of minutes.
    #[instrument(skip(self))]
    pub async fn grow_all(&self, email: &str, elapsed_minutes: i32) -> GardenResult<Vec<Plant>> {
        let mut uow = self.store.begin(email).await?;
        let mut plants = uow.plants().await?;
        let mut outcomes = Vec::with_capacity(plants.len());
        for plant in plants.iter_mut() {
            let growth = self.with_rng(|rng| plant.grow(elapsed_minutes, rng))?;
            uow.save_plant(plant).await?;
            outcomes.push(growth);
        }
        uow.commit().await?;

        for (plant, growth) in plants.iter().zip(outcomes) {
            log_growth(email, plant, growth);
        }
        Ok(plants)
    }

    #[instrument(skip(self))]
    pub async fn move_plant(&self, email: &str, plant_id: Uuid, x: i32, y: i32) -> GardenResult<Plant> {
        let position = Position::new(x, y)?;
        let mut uow = self.store.begin(email).await?;
        let mut plant = uow
            .plant(plant_id)
            .await?
            .ok_or(GardenError::NotFound("plant"))?;
        plant.move_to(position);
        uow.save_plant(&plant).await?;
        uow.commit().await?;

        debug!(%email, %plant_id, x, y, "plant moved");
        Ok(plant)
    }

    #[instrument(skip(self))]
    pub async fn sell(&self, email: &str, plant_id: Uuid) -> GardenResult<SaleReceipt> {
        let mut uow = self.store.begin(email).await?;
        let plant = uow
            .plant(plant_id)
            .await?
            .ok_or(GardenError::NotFound("plant"))?;
        let value = plant.sell_value()?;
        let mut user = uow.user().clone();
        user.credit(value)?;
        user.decrement_plant_count();

        uow.delete_plant(plant_id).await?;
        uow.save_user(&user).await?;
        uow.commit().await?;

        info!(
            %email,
            %plant_id,
            rarity = ?plant.rarity,
            stage = %plant.stage,
            credited = value,
            money = user.money,
            "plant sold"
        );
        Ok(SaleReceipt {
            user,
            plant_id,
            credited: value,
        })
    }

    #[instrument(skip(self))]
    pub async fn upgrade_plant_limit(&self, email: &str) -> GardenResult<User> {
        let mut uow = self.store.begin(email).await?;
        let mut user = uow.user().clone();
        let price = user.upgrade_plant_limit()?;
        uow.save_user(&user).await?;
        uow.commit().await?;

        info!(%email, price, plant_limit = user.plant_limit, money = user.money, "plant limit upgraded");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn rename(&self, email: &str, new_username: &str) -> GardenResult<User> {
        let mut uow = self.store.begin(email).await?;
        let mut user = uow.user().clone();
        if user.username == new_username {
            return Ok(user);
        }
        user.rename(new_username)?;
        if uow.username_taken(new_username).await? {
            return Err(GardenError::UsernameTaken);
        }
        uow.save_user(&user).await?;
        uow.commit().await?;

        info!(%email, username = %user.username, "username changed");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn cycle_weather(&self, email: &str) -> GardenResult<User> {
        let mut uow = self.store.begin(email).await?;
        let mut user = uow.user().clone();
        user.set_weather();
        uow.save_user(&user).await?;
        uow.commit().await?;

        debug!(%email, weather = user.weather, "weather changed");
        Ok(user)
    }

    #[instrument(skip(self))]
    pub async fn delete_account(&self, email: &str) -> GardenResult<()> {
        let mut uow = self.store.begin(email).await?;
        let plants = uow.user().plant_count;
        uow.delete_user().await?;
        uow.commit().await?;

        info!(%email, plants, "account deleted");
        Ok(())
    }
}

fn log_growth(email: &str, plant: &Plant, growth: Growth) {
    match growth {
        Growth::Advanced(stage) => {
            info!(%email, plant_id = %plant.plant_id, %stage, "plant advanced")
        }
        Growth::Stalled => {
            debug!(%email, plant_id = %plant.plant_id, stage = %plant.stage, "plant waiting on gate")
        }
        Growth::Waiting | Growth::Mature => {}
    }
}
