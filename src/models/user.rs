//! Modelo de User / Profile
//!
//! El perfil une una identidad con su rol y su tenant (colegio).

use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::auth::UserRole;

/// Perfil de usuario
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Profile {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,
    pub must_change_password: bool,
    pub created_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Perfil junto al hash de su contraseña; nunca sale por la API
#[derive(Debug, Clone)]
pub struct UserCredentials {
    pub profile: Profile,
    pub password_hash: String,
}

/// Request para crear un nuevo usuario
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateUserRequest {
    #[validate(length(max = 100))]
    pub name: Option<String>,

    #[validate(email, length(max = 254))]
    pub email: String,

    #[validate(length(min = 1, max = 32))]
    pub role: String,

    pub tenant_id: Option<Uuid>,
}

/// Resultado de un alta privilegiada
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionedUser {
    pub uid: Uuid,
    pub email: String,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,
    pub temp_password: String,
}

/// Response de usuario para la API
#[derive(Debug, Clone, Serialize)]
pub struct ProfileResponse {
    pub uid: Uuid,
    pub email: String,
    pub display_name: String,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,
    pub must_change_password: bool,
}

impl From<Profile> for ProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            uid: profile.uid,
            email: profile.email,
            display_name: profile.display_name,
            role: profile.role,
            tenant_id: profile.tenant_id,
            must_change_password: profile.must_change_password,
        }
    }
}
