//! SQLite implementation of the DefinitionRepository.
//!
//! Definitions serialize as a JSON blob beside indexed scalar columns used
//! for lookups; steps travel inside the blob, so deleting a definition
//! deletes its steps with it.

use async_trait::async_trait;
use sqlx::SqlitePool;
use uuid::Uuid;

use crate::domain::errors::{DomainError, DomainResult};
use crate::domain::models::WorkflowDefinition;
use crate::domain::ports::DefinitionRepository;

#[derive(Clone)]
pub struct SqliteDefinitionRepository {
    pool: SqlitePool,
}

impl SqliteDefinitionRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl DefinitionRepository for SqliteDefinitionRepository {
    async fn save(&self, definition: &WorkflowDefinition) -> DomainResult<()> {
        let issues = definition.data_issues();
        if !issues.is_empty() {
            return Err(DomainError::Validation(issues));
        }

        let definition_json = serde_json::to_string(definition)?;
        let now = chrono::Utc::now().to_rfc3339();

        sqlx::query(
            "INSERT INTO workflow_definitions
                (id, name, code, company, active, definition_json, created_at, updated_at)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?)
             ON CONFLICT(id) DO UPDATE SET
                name = excluded.name,
                code = excluded.code,
                company = excluded.company,
                active = excluded.active,
                definition_json = excluded.definition_json,
                updated_at = excluded.updated_at",
        )
        .bind(definition.id.to_string())
        .bind(&definition.name)
        .bind(&definition.code)
        .bind(&definition.company)
        .bind(i32::from(definition.active))
        .bind(&definition_json)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn get(&self, id: Uuid) -> DomainResult<Option<WorkflowDefinition>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT definition_json FROM workflow_definitions WHERE id = ?")
                .bind(id.to_string())
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn get_active(&self, id: Uuid, company: &str) -> DomainResult<WorkflowDefinition> {
        let row: Option<(String,)> = sqlx::query_as(
            "SELECT definition_json FROM workflow_definitions
             WHERE id = ? AND company = ? AND active = 1",
        )
        .bind(id.to_string())
        .bind(company)
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some((json,)) => Ok(serde_json::from_str(&json)?),
            None => Err(DomainError::DefinitionNotFound(format!(
                "{id} (company {company})"
            ))),
        }
    }

    async fn find_by_name(&self, name: &str) -> DomainResult<Option<WorkflowDefinition>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT definition_json FROM workflow_definitions WHERE name = ?")
                .bind(name)
                .fetch_optional(&self.pool)
                .await?;

        match row {
            Some((json,)) => Ok(Some(serde_json::from_str(&json)?)),
            None => Ok(None),
        }
    }

    async fn list(&self, company: Option<&str>) -> DomainResult<Vec<WorkflowDefinition>> {
        let rows: Vec<(String,)> = match company {
            Some(company) => {
                sqlx::query_as(
                    "SELECT definition_json FROM workflow_definitions
                     WHERE company = ? ORDER BY name",
                )
                .bind(company)
                .fetch_all(&self.pool)
                .await?
            }
            None => {
                sqlx::query_as("SELECT definition_json FROM workflow_definitions ORDER BY name")
                    .fetch_all(&self.pool)
                    .await?
            }
        };

        rows.into_iter()
            .map(|(json,)| serde_json::from_str(&json).map_err(DomainError::from))
            .collect()
    }

    async fn delete(&self, id: Uuid) -> DomainResult<()> {
        sqlx::query("DELETE FROM workflow_definitions WHERE id = ?")
            .bind(id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
