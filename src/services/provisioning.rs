//! Alta privilegiada de usuarios
//!
//! Crea identidad y perfil en el servidor tras validar el rol del
//! llamante. Un admin solo crea roles inferiores al suyo y siempre dentro
//! de su propio colegio.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::{Caller, UserRole};
use crate::models::user::{CreateUserRequest, Profile, ProvisionedUser, UserCredentials};
use crate::repositories::DirectoryStore;
use crate::services::audit_service::AuditTrail;
use crate::services::capabilities::{can_assign_role, require, resolve_tenant, Action};
use crate::services::school_service::{ensure_unlocked, LockedModule};
use crate::utils::deadline::with_deadline;
use crate::utils::errors::{forbidden_error, validation_error, AppError, AppResult};

const TEMP_PASSWORD_LEN: usize = 12;

#[derive(Clone)]
pub struct UserProvisioning {
    directory: Arc<dyn DirectoryStore>,
    audit: AuditTrail,
    default_password: Option<String>,
    hash_cost: u32,
    mutation_timeout: Duration,
}

impl UserProvisioning {
    pub fn new(
        directory: Arc<dyn DirectoryStore>,
        audit: AuditTrail,
        default_password: Option<String>,
        mutation_timeout: Duration,
    ) -> Self {
        Self {
            directory,
            audit,
            default_password,
            hash_cost: bcrypt::DEFAULT_COST,
            mutation_timeout,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub async fn create_user(&self, caller: &Caller, mut request: CreateUserRequest) -> AppResult<ProvisionedUser> {
        require(caller, Action::ProvisionUsers)?;
        request.email = request.email.trim().to_lowercase();
        request.validate()?;

        let email = request.email.clone();

        let role = UserRole::from_str(&request.role.trim().to_lowercase())
            .ok_or_else(|| validation_error(format!("unknown role '{}'", request.role)))?;

        if !can_assign_role(caller.role, role) {
            return Err(forbidden_error(
                "create user",
                &format!("role '{}' cannot create '{}'", caller.role.as_str(), role.as_str()),
            ));
        }

        // Un super admin puede crear otro super admin sin colegio
        let tenant_id = if caller.is_super_admin() && role == UserRole::SuperAdmin {
            request.tenant_id
        } else {
            Some(resolve_tenant(caller, request.tenant_id)?)
        };

        let temp_password = self.temp_password();
        let password_hash = bcrypt::hash(&temp_password, self.hash_cost)
            .map_err(|e| AppError::Internal(format!("Error hashing password: {}", e)))?;

        let display_name = request
            .name
            .as_deref()
            .map(str::trim)
            .filter(|n| !n.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| email.split('@').next().unwrap_or_default().to_string());

        let credentials = UserCredentials {
            profile: Profile {
                uid: Uuid::new_v4(),
                email: email.clone(),
                display_name,
                role,
                tenant_id,
                must_change_password: true,
                created_by: Some(caller.uid),
                created_at: Utc::now(),
            },
            password_hash,
        };

        with_deadline("createUser", self.mutation_timeout, async {
            if let Some(tenant_id) = tenant_id {
                ensure_unlocked(self.directory.as_ref(), caller, tenant_id, LockedModule::Users).await?;
            }
            self.directory.insert_user(&credentials).await
        })
        .await?;

        let profile = credentials.profile;
        info!("👤 Usuario {} creado con rol {} en {:?}", profile.uid, role.as_str(), tenant_id);
        self.audit
            .record(
                caller,
                "create",
                "user",
                Some(profile.uid.to_string()),
                json!({ "email": profile.email, "role": role.as_str() }),
            )
            .await;

        Ok(ProvisionedUser {
            uid: profile.uid,
            email: profile.email,
            role,
            tenant_id,
            temp_password,
        })
    }

    fn temp_password(&self) -> String {
        match &self.default_password {
            Some(password) => password.clone(),
            None => rand::thread_rng()
                .sample_iter(&Alphanumeric)
                .take(TEMP_PASSWORD_LEN)
                .map(char::from)
                .collect(),
        }
    }
}
