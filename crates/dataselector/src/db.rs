//! Database connection pool management.

use anyhow::{Context, Result};
use sqlx::mysql::{MySqlPool, MySqlPoolOptions};

use crate::config::Config;

/// Create a MySQL connection pool for the metadata store.
pub async fn create_pool(config: &Config) -> Result<MySqlPool> {
    let url = config.require_database_url()?;

    let pool = MySqlPoolOptions::new()
        .max_connections(config.database_max_connections)
        .acquire_timeout(config.metadata_timeout)
        .connect(url)
        .await
        .context("failed to connect to MySQL")?;

    Ok(pool)
}

/// Check if the database connection is healthy.
pub async fn check_health(pool: &MySqlPool) -> bool {
    sqlx::query("SELECT 1").execute(pool).await.is_ok()
}
