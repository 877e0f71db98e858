//! CLI command implementations.

pub mod run;
pub mod workflow;

use anyhow::{Context, Result};

use crate::adapters::sqlite::{connection, migrations, SqliteDefinitionRepository};
use crate::infrastructure::Config;

/// Open the definition store, applying pending migrations.
pub(crate) async fn open_repository(config: &Config) -> Result<SqliteDefinitionRepository> {
    let pool = connection::create_pool(&config.database.url)
        .await
        .context("failed to open definition store")?;
    migrations::run(&pool)
        .await
        .context("failed to run migrations")?;
    Ok(SqliteDefinitionRepository::new(pool))
}
