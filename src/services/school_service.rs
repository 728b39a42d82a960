//! Servicio de colegios (tenants) y sus bloqueos por módulo

use std::sync::Arc;

use chrono::Utc;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Caller;
use crate::models::school::{CreateSchoolRequest, School, TenantLocks};
use crate::repositories::DirectoryStore;
use crate::services::audit_service::AuditTrail;
use crate::services::capabilities::{require, Action};
use crate::utils::errors::{forbidden_error, not_found_error, AppResult};

/// Módulo de un colegio que puede quedar bloqueado
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LockedModule {
    Users,
    Transport,
}

impl LockedModule {
    fn is_locked(&self, locks: &TenantLocks) -> bool {
        match self {
            LockedModule::Users => locks.users,
            LockedModule::Transport => locks.transport,
        }
    }

    fn as_str(&self) -> &'static str {
        match self {
            LockedModule::Users => "users",
            LockedModule::Transport => "transport",
        }
    }
}

/// Falla con `Forbidden` si el módulo está bloqueado para el colegio.
/// Los super admins no se ven afectados y un colegio inexistente cuenta
/// como desbloqueado.
pub async fn ensure_unlocked(
    directory: &dyn DirectoryStore,
    caller: &Caller,
    tenant_id: Uuid,
    module: LockedModule,
) -> AppResult<()> {
    if caller.is_super_admin() {
        return Ok(());
    }

    let locked = directory
        .find_school(tenant_id)
        .await?
        .map(|school| module.is_locked(&school.locks))
        .unwrap_or(false);

    if locked {
        return Err(forbidden_error(
            "modify school data",
            &format!("the {} module is locked for this school", module.as_str()),
        ));
    }
    Ok(())
}

#[derive(Clone)]
pub struct SchoolService {
    directory: Arc<dyn DirectoryStore>,
    audit: AuditTrail,
}

impl SchoolService {
    pub fn new(directory: Arc<dyn DirectoryStore>, audit: AuditTrail) -> Self {
        Self { directory, audit }
    }

    pub async fn create_school(&self, caller: &Caller, request: CreateSchoolRequest) -> AppResult<School> {
        require(caller, Action::ManageSchools)?;
        request.validate()?;

        let school = School {
            id: Uuid::new_v4(),
            name: request.name.trim().to_string(),
            locks: TenantLocks::default(),
            created_at: Utc::now(),
        };
        self.directory.insert_school(&school).await?;

        info!("🏫 Colegio creado: {} ({})", school.name, school.id);
        self.audit
            .record(caller, "create", "school", Some(school.id.to_string()), json!({ "name": school.name }))
            .await;

        Ok(school)
    }

    pub async fn set_locks(&self, caller: &Caller, school_id: Uuid, locks: TenantLocks) -> AppResult<School> {
        require(caller, Action::ManageSchools)?;

        let school = self
            .directory
            .update_school_locks(school_id, locks)
            .await?
            .ok_or_else(|| not_found_error("School", school_id))?;

        info!("🔒 Bloqueos actualizados para {}: {:?}", school.id, school.locks);
        self.audit
            .record(
                caller,
                "update_locks",
                "school",
                Some(school.id.to_string()),
                json!({ "locks": school.locks }),
            )
            .await;

        Ok(school)
    }
}
