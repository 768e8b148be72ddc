use deadpool_postgres::{
    Config, CreatePoolError, ManagerConfig, Pool, PoolConfig, RecyclingMethod, Runtime,
};
use std::str::FromStr;
use thiserror::Error;
use tokio_postgres::NoTls;

pub type PgPool = Pool;

#[derive(Debug, Error)]
pub enum DbPoolError {
    #[error("database url did not parse: {0}")]
    InvalidConfig(String),
    #[error("pool construction failed: {0}")]
    PoolCreation(#[from] CreatePoolError),
}

/// Builds the deadpool pool without opening a connection, so startup and
/// tests can construct state before Postgres is reachable. `TM_DB_POOL_MAX`
/// overrides the pool size when set.
pub fn create_pool_from_url(db_url: &str) -> Result<PgPool, DbPoolError> {
    let _ = tokio_postgres::Config::from_str(db_url)
        .map_err(|err| DbPoolError::InvalidConfig(err.to_string()))?;

    let mut cfg = Config::new();
    cfg.url = Some(db_url.to_string());
    cfg.manager = Some(ManagerConfig {
        recycling_method: RecyclingMethod::Fast,
    });

    if let Some(max_size) = pool_max_from_env() {
        cfg.pool = Some(PoolConfig::new(max_size));
    }

    cfg.create_pool(Some(Runtime::Tokio1), NoTls)
        .map_err(DbPoolError::PoolCreation)
}

fn pool_max_from_env() -> Option<usize> {
    std::env::var("TM_DB_POOL_MAX")
        .ok()
        .and_then(|raw| raw.parse::<usize>().ok())
        .filter(|size| *size > 0)
}
