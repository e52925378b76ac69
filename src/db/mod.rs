use std::time::Duration;

use anyhow::Context;
use sqlx::{postgres::PgPoolOptions, PgPool};
use tracing::{info, warn};

use crate::{
    config::AppConfig, recipes::repo::RecipeRepo, taxonomy::repo::AttributeRepo,
    users::repo::UserRepo,
};

#[cfg(test)]
pub mod memory;

/// Persistence store: every repository the handlers talk to.
pub trait Store: UserRepo + AttributeRepo + RecipeRepo {}

impl<T: UserRepo + AttributeRepo + RecipeRepo> Store for T {}

/// PostgreSQL-backed store.
#[derive(Clone)]
pub struct PgStore {
    pub pool: PgPool,
}

impl PgStore {
    /// Connect, waiting for the database to come up, then run migrations.
    pub async fn connect(config: &AppConfig) -> anyhow::Result<Self> {
        let pool = wait_for_db(config).await?;
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("run migrations")?;
        Ok(Self { pool })
    }
}

async fn wait_for_db(config: &AppConfig) -> anyhow::Result<PgPool> {
    let attempts = config.db_connect_retries.max(1);
    let mut attempt = 1;
    loop {
        let res = PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .connect(&config.database_url)
            .await;
        match res {
            Ok(pool) => {
                info!(attempt, "database available");
                return Ok(pool);
            }
            Err(e) if attempt < attempts => {
                warn!(error = %e, attempt, "database unavailable, waiting 1 second");
                tokio::time::sleep(Duration::from_secs(1)).await;
                attempt += 1;
            }
            Err(e) => return Err(e).context("connect to database"),
        }
    }
}
