use anyhow::Context;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    pub issuer: String,
    pub audience: String,
    pub ttl_minutes: i64,
    pub refresh_ttl_minutes: i64,
}

/// Which backend holds users and plants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreKind {
    Postgres,
    Memory,
}

impl std::str::FromStr for StoreKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "postgres" | "pg" => Ok(StoreKind::Postgres),
            "memory" | "mem" => Ok(StoreKind::Memory),
            other => anyhow::bail!("unknown GARDEN_STORE {other:?} (expected postgres or memory)"),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub store: StoreKind,
    pub database_url: Option<String>,
    pub db_max_connections: u32,
    pub jwt: JwtConfig,
    /// Fixed seed for rarity and duration draws; random when unset.
    pub rng_seed: Option<u64>,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    std::env::var(key).ok().and_then(|v| v.parse::<T>().ok())
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let store = match std::env::var("GARDEN_STORE") {
            Ok(v) => v.parse::<StoreKind>()?,
            Err(_) => StoreKind::Postgres,
        };
        let database_url = match store {
            StoreKind::Postgres => {
                Some(std::env::var("DATABASE_URL").context("DATABASE_URL is required for the postgres store")?)
            }
            StoreKind::Memory => std::env::var("DATABASE_URL").ok(),
        };
        let jwt = JwtConfig {
            secret: std::env::var("JWT_SECRET").context("JWT_SECRET is required")?,
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "gardenkeeper".into()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "gardenkeeper-players".into()),
            ttl_minutes: env_parse("JWT_TTL_MINUTES").unwrap_or(60),
            refresh_ttl_minutes: env_parse("JWT_REFRESH_TTL_MINUTES").unwrap_or(60 * 24 * 14),
        };
        Ok(Self {
            store,
            database_url,
            db_max_connections: env_parse("DATABASE_MAX_CONNECTIONS").unwrap_or(10),
            jwt,
            rng_seed: env_parse("GARDEN_RNG_SEED"),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_kind_parses_aliases() {
        assert_eq!("postgres".parse::<StoreKind>().unwrap(), StoreKind::Postgres);
        assert_eq!(" Memory ".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        assert_eq!("mem".parse::<StoreKind>().unwrap(), StoreKind::Memory);
        let err = "sqlite".parse::<StoreKind>().unwrap_err();
        assert!(err.to_string().contains("sqlite"));
    }
}
