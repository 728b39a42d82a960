//! Modelos de notificación
//!
//! Avisos de parada para padres y notificaciones salientes genéricas.

use serde::{Deserialize, Serialize};
use validator::Validate;
use uuid::Uuid;

/// Aviso emitido cuando el viaje observado avanza de parada
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StopNotification {
    pub trip_id: Uuid,
    pub route_id: Uuid,
    pub stop_index: i32,
    pub stop_id: String,
    pub stop_name: String,
    pub message: String,
}

/// Canal de entrega de una notificación saliente
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum NotificationChannel {
    Email,
    Sms,
    Push,
}

/// Request de notificación saliente
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct SendNotificationRequest {
    #[validate(length(max = 200))]
    pub title: Option<String>,

    #[validate(length(max = 2000))]
    pub message: Option<String>,

    pub channel: NotificationChannel,

    #[validate(length(max = 120))]
    pub audience: Option<String>,
}

/// Notificación lista para despachar
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OutboundNotification {
    pub title: String,
    pub message: String,
    pub channel: NotificationChannel,
    pub topic: String,
    pub tenant_id: Option<Uuid>,
}
