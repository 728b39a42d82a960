use std::sync::Arc;

use serde_json::Value;
use tracing::{debug, warn};

use crate::models::audit::AuditEntry;
use crate::models::auth::Caller;
use crate::repositories::AuditStore;

/// Registro de auditoría; un fallo al escribir nunca hace fallar la acción
#[derive(Clone)]
pub struct AuditTrail {
    store: Arc<dyn AuditStore>,
}

impl AuditTrail {
    pub fn new(store: Arc<dyn AuditStore>) -> Self {
        Self { store }
    }

    pub async fn record(
        &self,
        caller: &Caller,
        action: &str,
        entity: &str,
        entity_id: Option<String>,
        metadata: Value,
    ) {
        let entry = AuditEntry::new(caller, action, entity, entity_id, metadata);
        match self.store.record(&entry).await {
            Ok(()) => debug!("📝 Audit {} {} {:?}", entry.action, entry.entity, entry.entity_id),
            Err(e) => warn!("⚠️ No se pudo escribir el audit log ({} {}): {}", action, entity, e),
        }
    }
}
