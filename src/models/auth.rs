use serde::{Deserialize, Serialize};
use chrono::{DateTime, Utc};
use uuid::Uuid;
use validator::Validate;

/// Roles del sistema
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    SuperAdmin,
    Admin,
    Teacher,
    Student,
    Driver,
    Parent,
}

impl UserRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::SuperAdmin => "super_admin",
            UserRole::Admin => "admin",
            UserRole::Teacher => "teacher",
            UserRole::Student => "student",
            UserRole::Driver => "driver",
            UserRole::Parent => "parent",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "super_admin" => Some(UserRole::SuperAdmin),
            "admin" => Some(UserRole::Admin),
            "teacher" => Some(UserRole::Teacher),
            "student" => Some(UserRole::Student),
            "driver" => Some(UserRole::Driver),
            "parent" => Some(UserRole::Parent),
            _ => None,
        }
    }

    /// Nivel jerárquico usado para decidir qué roles puede crear cada uno
    pub fn level(&self) -> u8 {
        match self {
            UserRole::SuperAdmin => 3,
            UserRole::Admin => 2,
            UserRole::Teacher | UserRole::Student | UserRole::Driver | UserRole::Parent => 1,
        }
    }
}

/// Identidad del llamante, pasada explícitamente a cada servicio
#[derive(Debug, Clone, PartialEq)]
pub struct Caller {
    pub uid: Uuid,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,
}

impl Caller {
    pub fn new(uid: Uuid, role: UserRole, tenant_id: Option<Uuid>) -> Self {
        Self { uid, role, tenant_id }
    }

    pub fn is_super_admin(&self) -> bool {
        self.role == UserRole::SuperAdmin
    }

    /// Un super admin ve todos los tenants; el resto solo el suyo
    pub fn can_see_tenant(&self, tenant_id: Uuid) -> bool {
        self.is_super_admin() || self.tenant_id == Some(tenant_id)
    }
}

/// Claims del JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtClaims {
    pub sub: String, // user_id
    pub role: String,
    pub tenant_id: Option<String>,
    pub exp: i64,
    pub iat: i64,
}

/// Request de login
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct LoginRequest {
    #[validate(length(min = 3, max = 254))]
    pub email: String,

    #[validate(length(min = 1, max = 128))]
    pub password: String,
}

/// Response de login
#[derive(Debug, Clone, Serialize)]
pub struct LoginResponse {
    pub token: String,
    pub expires_at: DateTime<Utc>,
    pub uid: Uuid,
    pub role: UserRole,
    pub tenant_id: Option<Uuid>,
    pub must_change_password: bool,
}
