use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Sobre común de las respuestas exitosas
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub message: Option<String>,
    pub data: Option<T>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            message: None,
            data: Some(data),
        }
    }

    pub fn success_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: Some(data),
        }
    }
}

impl ApiResponse<()> {
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            data: None,
        }
    }
}

/// Filtro del viaje activo: por ruta o por conductor
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TripScopeQuery {
    pub route_id: Option<Uuid>,
    pub driver_id: Option<Uuid>,
    /// Solo lo usa un super admin
    pub tenant_id: Option<Uuid>,
}

/// Filtro del listado de rutas
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TenantQuery {
    pub tenant_id: Option<Uuid>,
}
