//! Embedded schema migrations for the definition store.

use sqlx::SqlitePool;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigrationError {
    #[error("Failed to execute migration {version}: {source}")]
    ExecutionError {
        version: i64,
        #[source]
        source: sqlx::Error,
    },
    #[error("Failed to get schema version: {0}")]
    VersionCheckError(#[source] sqlx::Error),
}

struct Migration {
    version: i64,
    description: &'static str,
    statements: &'static [&'static str],
}

fn migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "workflow definitions",
        statements: &[
            "CREATE TABLE IF NOT EXISTS workflow_definitions (
                id TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                code TEXT,
                company TEXT NOT NULL,
                active INTEGER NOT NULL DEFAULT 1,
                definition_json TEXT NOT NULL,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
            "CREATE INDEX IF NOT EXISTS idx_workflow_definitions_name
                ON workflow_definitions(name)",
            "CREATE INDEX IF NOT EXISTS idx_workflow_definitions_company
                ON workflow_definitions(company)",
        ],
    }]
}

/// Apply any pending migrations. Returns the number applied.
pub async fn run(pool: &SqlitePool) -> Result<usize, MigrationError> {
    ensure_migrations_table(pool).await?;
    let current = current_version(pool).await?;

    let pending: Vec<Migration> = migrations()
        .into_iter()
        .filter(|m| m.version > current)
        .collect();

    for migration in &pending {
        for statement in migration.statements {
            sqlx::query(statement).execute(pool).await.map_err(|e| {
                MigrationError::ExecutionError {
                    version: migration.version,
                    source: e,
                }
            })?;
        }
        sqlx::query("INSERT INTO schema_migrations (version, description) VALUES (?, ?)")
            .bind(migration.version)
            .bind(migration.description)
            .execute(pool)
            .await
            .map_err(|e| MigrationError::ExecutionError {
                version: migration.version,
                source: e,
            })?;
    }

    Ok(pending.len())
}

async fn ensure_migrations_table(pool: &SqlitePool) -> Result<(), MigrationError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS schema_migrations (
            version INTEGER PRIMARY KEY,
            applied_at TEXT NOT NULL DEFAULT (datetime('now')),
            description TEXT
        )",
    )
    .execute(pool)
    .await
    .map_err(|e| MigrationError::ExecutionError {
        version: 0,
        source: e,
    })?;
    Ok(())
}

async fn current_version(pool: &SqlitePool) -> Result<i64, MigrationError> {
    let row: (Option<i64>,) = sqlx::query_as("SELECT MAX(version) FROM schema_migrations")
        .fetch_one(pool)
        .await
        .map_err(MigrationError::VersionCheckError)?;
    Ok(row.0.unwrap_or(0))
}
