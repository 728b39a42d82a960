use std::sync::Arc;

use bcrypt::{hash, verify, DEFAULT_COST};
use chrono::Utc;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::{Caller, LoginRequest, LoginResponse, UserRole};
use crate::models::user::{Profile, UserCredentials};
use crate::repositories::DirectoryStore;
use crate::services::jwt_service::JwtService;
use crate::utils::errors::{not_found_error, AppError, AppResult};

/// Servicio de autenticación
#[derive(Clone)]
pub struct AuthService {
    directory: Arc<dyn DirectoryStore>,
    jwt_service: Arc<JwtService>,
    hash_cost: u32,
}

impl AuthService {
    pub fn new(directory: Arc<dyn DirectoryStore>, jwt_service: Arc<JwtService>) -> Self {
        Self {
            directory,
            jwt_service,
            hash_cost: DEFAULT_COST,
        }
    }

    pub fn with_hash_cost(mut self, cost: u32) -> Self {
        self.hash_cost = cost;
        self
    }

    pub fn jwt(&self) -> &JwtService {
        &self.jwt_service
    }

    /// Autentica por email y contraseña y emite un token
    pub async fn login(&self, request: LoginRequest) -> AppResult<LoginResponse> {
        request.validate()?;
        let email = request.email.trim().to_lowercase();

        let credentials = self.directory.find_credentials(&email).await?;
        let credentials = match credentials {
            Some(c) => c,
            None => {
                warn!("🔐 Login fallido para {}", email);
                return Err(invalid_credentials());
            }
        };

        let valid = verify(&request.password, &credentials.password_hash)
            .map_err(|e| AppError::Internal(format!("Error verifying password: {}", e)))?;
        if !valid {
            warn!("🔐 Login fallido para {}", email);
            return Err(invalid_credentials());
        }

        let profile = credentials.profile;
        let (token, expires_at) = self.jwt_service.generate_access_token(&profile)?;
        info!("✅ Login de {} ({})", profile.uid, profile.role.as_str());

        Ok(LoginResponse {
            token,
            expires_at,
            uid: profile.uid,
            role: profile.role,
            tenant_id: profile.tenant_id,
            must_change_password: profile.must_change_password,
        })
    }

    /// Perfil del llamante autenticado
    pub async fn me(&self, caller: &Caller) -> AppResult<Profile> {
        self.directory
            .find_profile(caller.uid)
            .await?
            .ok_or_else(|| not_found_error("Profile", caller.uid))
    }

    /// Crea el super admin inicial si aún no existe ese email
    pub async fn ensure_super_admin(&self, email: &str, password: &str) -> AppResult<()> {
        let email = email.trim().to_lowercase();
        if self.directory.find_credentials(&email).await?.is_some() {
            return Ok(());
        }

        let password_hash = hash(password, self.hash_cost)
            .map_err(|e| AppError::Internal(format!("Error hashing password: {}", e)))?;

        let credentials = UserCredentials {
            profile: Profile {
                uid: Uuid::new_v4(),
                display_name: "Super Admin".to_string(),
                email: email.clone(),
                role: UserRole::SuperAdmin,
                tenant_id: None,
                must_change_password: false,
                created_by: None,
                created_at: Utc::now(),
            },
            password_hash,
        };

        self.directory.insert_user(&credentials).await?;
        info!("👑 Super admin inicial creado: {}", email);
        Ok(())
    }
}

fn invalid_credentials() -> AppError {
    AppError::Unauthorized("Invalid email or password".to_string())
}
