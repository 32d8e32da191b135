use anyhow::Context;
use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};
use tracing::debug;
use uuid::Uuid;

use super::{GardenStore, UnitOfWork};
use crate::{
    error::{GardenError, GardenResult},
    garden::{economy, NewAccount, Plant, User},
};

#[derive(Clone)]
pub struct PgGardenStore {
    db: PgPool,
}

impl PgGardenStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }

    pub async fn migrate(&self) -> anyhow::Result<()> {
        sqlx::migrate!("./migrations")
            .run(&self.db)
            .await
            .context("run migrations")
    }
}

/// Name of the violated unique constraint, if that is what `e` is.
fn unique_violation(e: &sqlx::Error) -> Option<String> {
    match e {
        sqlx::Error::Database(db) if db.is_unique_violation() => {
            Some(db.constraint().unwrap_or_default().to_string())
        }
        _ => None,
    }
}

#[async_trait]
impl GardenStore for PgGardenStore {
    async fn create_user(&self, account: NewAccount) -> GardenResult<User> {
        let res = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, username, password_hash, money, plant_limit)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING email, username, password_hash, money, plant_limit, plant_count, weather, created_at
            "#,
        )
        .bind(&account.email)
        .bind(&account.username)
        .bind(&account.password_hash)
        .bind(economy::STARTING_MONEY)
        .bind(economy::STARTING_PLANT_LIMIT)
        .fetch_one(&self.db)
        .await;

        match res {
            Ok(user) => Ok(user),
            Err(e) => match unique_violation(&e).as_deref() {
                Some("users_username_key") => Err(GardenError::UsernameTaken),
                Some(_) => Err(GardenError::EmailTaken),
                None => Err(anyhow::Error::new(e).context("insert user").into()),
            },
        }
    }

    async fn find_user(&self, email: &str) -> GardenResult<Option<User>> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT email, username, password_hash, money, plant_limit, plant_count, weather, created_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find user")?;
        Ok(user)
    }

    async fn list_plants(&self, email: &str) -> GardenResult<Vec<Plant>> {
        let plants = sqlx::query_as::<_, Plant>(
            r#"
            SELECT plant_id, owner_email, plant_type, plant_species, rarity, size, x, y,
                   stage, watered, growth_time_remaining, fertilizer_remaining, created_at
            FROM plants
            WHERE owner_email = $1
            ORDER BY created_at ASC
            "#,
        )
        .bind(email)
        .fetch_all(&self.db)
        .await
        .context("list plants")?;
        Ok(plants)
    }

    async fn find_plant(&self, email: &str, plant_id: Uuid) -> GardenResult<Option<Plant>> {
        let plant = sqlx::query_as::<_, Plant>(
            r#"
            SELECT plant_id, owner_email, plant_type, plant_species, rarity, size, x, y,
                   stage, watered, growth_time_remaining, fertilizer_remaining, created_at
            FROM plants
            WHERE plant_id = $1 AND owner_email = $2
            "#,
        )
        .bind(plant_id)
        .bind(email)
        .fetch_optional(&self.db)
        .await
        .context("find plant")?;
        Ok(plant)
    }

    async fn leaderboard(&self, limit: i64) -> GardenResult<Vec<User>> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT email, username, password_hash, money, plant_limit, plant_count, weather, created_at
            FROM users
            ORDER BY money DESC, username ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(&self.db)
        .await
        .context("leaderboard")?;
        Ok(users)
    }

    async fn begin(&self, email: &str) -> GardenResult<Box<dyn UnitOfWork>> {
        let mut tx = self.db.begin().await.context("begin tx")?;
        // Row lock serializes every operation on this account until commit/rollback.
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT email, username, password_hash, money, plant_limit, plant_count, weather, created_at
            FROM users
            WHERE email = $1
            FOR UPDATE
            "#,
        )
        .bind(email)
        .fetch_optional(&mut *tx)
        .await
        .context("lock user")?
        .ok_or(GardenError::NotFound("user"))?;
        debug!(%email, "account locked");
        Ok(Box::new(PgUnitOfWork { tx, user }))
    }
}

struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
    user: User,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    fn user(&self) -> &User {
        &self.user
    }

    async fn plant(&mut self, plant_id: Uuid) -> GardenResult<Option<Plant>> {
        let plant = sqlx::query_as::<_, Plant>(
            r#"
            SELECT plant_id, owner_email, plant_type, plant_species, rarity, size, x, y,
                   stage, watered, growth_time_remaining, fertilizer_remaining, created_at
            FROM plants
            WHERE plant_id = $1 AND owner_email = $2
            FOR UPDATE
            "#,
        )
        .bind(plant_id)
        .bind(&self.user.email)
        .fetch_optional(&mut *self.tx)
        .await
        .context("lock plant")?;
        Ok(plant)
    }

    async fn plants(&mut self) -> GardenResult<Vec<Plant>> {
        let plants = sqlx::query_as::<_, Plant>(
            r#"
            SELECT plant_id, owner_email, plant_type, plant_species, rarity, size, x, y,
                   stage, watered, growth_time_remaining, fertilizer_remaining, created_at
            FROM plants
            WHERE owner_email = $1
            ORDER BY created_at ASC
            FOR UPDATE
            "#,
        )
        .bind(&self.user.email)
        .fetch_all(&mut *self.tx)
        .await
        .context("lock plants")?;
        Ok(plants)
    }

    async fn username_taken(&mut self, username: &str) -> GardenResult<bool> {
        let taken: bool = sqlx::query_scalar(
            r#"SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND email <> $2)"#,
        )
        .bind(username)
        .bind(&self.user.email)
        .fetch_one(&mut *self.tx)
        .await
        .context("check username")?;
        Ok(taken)
    }

    async fn save_user(&mut self, user: &User) -> GardenResult<()> {
        let res = sqlx::query(
            r#"
            UPDATE users
               SET username = $2, money = $3, plant_limit = $4, plant_count = $5, weather = $6
             WHERE email = $1
            "#,
        )
        .bind(&user.email)
        .bind(&user.username)
        .bind(user.money)
        .bind(user.plant_limit)
        .bind(user.plant_count)
        .bind(user.weather)
        .execute(&mut *self.tx)
        .await;

        match res {
            Ok(_) => {
                self.user = user.clone();
                Ok(())
            }
            Err(e) if unique_violation(&e).is_some() => Err(GardenError::UsernameTaken),
            Err(e) => Err(anyhow::Error::new(e).context("update user").into()),
        }
    }

    async fn insert_plant(&mut self, plant: &Plant) -> GardenResult<()> {
        sqlx::query(
            r#"
            INSERT INTO plants (plant_id, owner_email, plant_type, plant_species, rarity, size, x, y,
                                stage, watered, growth_time_remaining, fertilizer_remaining, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            "#,
        )
        .bind(plant.plant_id)
        .bind(&plant.owner_email)
        .bind(plant.plant_type)
        .bind(&plant.plant_species)
        .bind(plant.rarity)
        .bind(plant.size)
        .bind(plant.x)
        .bind(plant.y)
        .bind(plant.stage)
        .bind(plant.watered)
        .bind(plant.growth_time_remaining)
        .bind(plant.fertilizer_remaining)
        .bind(plant.created_at)
        .execute(&mut *self.tx)
        .await
        .context("insert plant")?;
        Ok(())
    }

    async fn save_plant(&mut self, plant: &Plant) -> GardenResult<()> {
        sqlx::query(
            r#"
            UPDATE plants
               SET size = $3, x = $4, y = $5, stage = $6, watered = $7,
                   growth_time_remaining = $8, fertilizer_remaining = $9
             WHERE plant_id = $1 AND owner_email = $2
            "#,
        )
        .bind(plant.plant_id)
        .bind(&self.user.email)
        .bind(plant.size)
        .bind(plant.x)
        .bind(plant.y)
        .bind(plant.stage)
        .bind(plant.watered)
        .bind(plant.growth_time_remaining)
        .bind(plant.fertilizer_remaining)
        .execute(&mut *self.tx)
        .await
        .context("update plant")?;
        Ok(())
    }

    async fn delete_plant(&mut self, plant_id: Uuid) -> GardenResult<()> {
        sqlx::query(r#"DELETE FROM plants WHERE plant_id = $1 AND owner_email = $2"#)
            .bind(plant_id)
            .bind(&self.user.email)
            .execute(&mut *self.tx)
            .await
            .context("delete plant")?;
        Ok(())
    }

    async fn delete_user(&mut self) -> GardenResult<()> {
        // plants go with it via ON DELETE CASCADE
        sqlx::query(r#"DELETE FROM users WHERE email = $1"#)
            .bind(&self.user.email)
            .execute(&mut *self.tx)
            .await
            .context("delete user")?;
        Ok(())
    }

    async fn commit(self: Box<Self>) -> GardenResult<()> {
        let PgUnitOfWork { tx, user } = *self;
        tx.commit().await.context("commit tx")?;
        debug!(email = %user.email, "account released");
        Ok(())
    }
}
