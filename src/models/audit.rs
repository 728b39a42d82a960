use serde::Serialize;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::auth::Caller;

/// Entrada del audit log
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AuditEntry {
    pub id: Uuid,
    pub action: String,
    pub entity: String,
    pub entity_id: Option<String>,
    pub actor_id: Uuid,
    pub tenant_id: Option<Uuid>,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditEntry {
    pub fn new(
        caller: &Caller,
        action: &str,
        entity: &str,
        entity_id: Option<String>,
        metadata: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            action: action.to_string(),
            entity: entity.to_string(),
            entity_id,
            actor_id: caller.uid,
            tenant_id: caller.tenant_id,
            metadata,
            created_at: Utc::now(),
        }
    }
}
