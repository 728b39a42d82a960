use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;

use super::AuditStore;
use crate::models::audit::AuditEntry;
use crate::utils::errors::{AppError, AppResult};

pub struct PgAuditRepository {
    pool: PgPool,
}

impl PgAuditRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditStore for PgAuditRepository {
    async fn record(&self, entry: &AuditEntry) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO audit_logs (id, action, entity, entity_id, actor_id, tenant_id, metadata, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(entry.id)
        .bind(&entry.action)
        .bind(&entry.entity)
        .bind(&entry.entity_id)
        .bind(entry.actor_id)
        .bind(entry.tenant_id)
        .bind(Json(&entry.metadata))
        .bind(entry.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Transport(format!("Error writing audit log: {}", e)))?;

        Ok(())
    }
}
