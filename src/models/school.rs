use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Bloqueos por módulo que un super admin impone a un colegio
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct TenantLocks {
    #[serde(default)]
    pub users: bool,
    #[serde(default)]
    pub academics: bool,
    #[serde(default)]
    pub transport: bool,
    #[serde(default)]
    pub finance: bool,
}

/// Colegio (tenant)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct School {
    pub id: Uuid,
    pub name: String,
    pub locks: TenantLocks,
    pub created_at: DateTime<Utc>,
}

/// Request para registrar un colegio
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateSchoolRequest {
    #[validate(length(min = 2, max = 160))]
    pub name: String,
}
