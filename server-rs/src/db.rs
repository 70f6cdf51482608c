use sqlx::postgres::{PgPool, PgPoolOptions};

use crate::config::DbConfig;

pub async fn create_pool(config: &DbConfig) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .min_connections(config.pool_min)
        .max_connections(config.pool_max)
        .acquire_timeout(std::time::Duration::from_secs(10))
        .connect(&config.url)
        .await
}
