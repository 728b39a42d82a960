//! Modelo de Route
//!
//! Este módulo contiene el struct Route, sus paradas y las variantes para
//! CRUD operations. Las paradas viajan como un documento JSONB dentro de la
//! fila de la ruta y su orden es el único orden de recorrido válido.

use serde::{Deserialize, Serialize};
use validator::Validate;
use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Estado declarado de una parada. No lo mueve ninguna transición del viaje;
/// el estado que se muestra se deriva del índice del viaje.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum StopStatus {
    #[default]
    Pending,
    Arrived,
    Departed,
}

/// Parada - objeto de valor propiedad de una ruta
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Stop {
    pub id: String,
    pub name: String,
    pub lat: f64,
    pub lng: f64,
    /// Texto libre, no se interpreta
    pub arrival_time: String,
    #[serde(default)]
    pub status: StopStatus,
}

/// Route principal - una ruta escolar con su secuencia fija de paradas
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Route {
    pub id: Uuid,
    pub tenant_id: Uuid,
    pub name: String,
    pub driver_id: Option<Uuid>,
    pub driver_name: Option<String>,
    pub vehicle_no: Option<String>,
    pub stops: Vec<Stop>,
    pub created_at: DateTime<Utc>,
}

impl Route {
    pub fn stop_count(&self) -> usize {
        self.stops.len()
    }

    /// Parada en un índice de progresión; -1 y fuera de rango devuelven None
    pub fn stop_at(&self, index: i32) -> Option<&Stop> {
        usize::try_from(index).ok().and_then(|i| self.stops.get(i))
    }
}

/// Parada tal como la envía el administrador al crear la ruta
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StopInput {
    #[validate(length(min = 1, max = 120))]
    pub name: String,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    #[validate(length(max = 32))]
    pub arrival_time: Option<String>,
}

/// Request para crear una nueva ruta
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct CreateRouteRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: String,

    pub driver_id: Option<Uuid>,

    #[validate(length(max = 120))]
    pub driver_name: Option<String>,

    #[validate(length(max = 40))]
    pub vehicle_no: Option<String>,

    #[validate]
    pub stops: Vec<StopInput>,

    /// Solo lo usa un super admin; el resto crea en su propio tenant
    pub tenant_id: Option<Uuid>,
}

/// Request para actualizar una ruta existente. Las paradas no son editables.
#[derive(Debug, Clone, Default, Deserialize, Serialize, Validate)]
pub struct UpdateRouteRequest {
    #[validate(length(min = 1, max = 120))]
    pub name: Option<String>,

    pub driver_id: Option<Uuid>,

    #[validate(length(max = 120))]
    pub driver_name: Option<String>,

    #[validate(length(max = 40))]
    pub vehicle_no: Option<String>,
}

impl UpdateRouteRequest {
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.driver_id.is_none()
            && self.driver_name.is_none()
            && self.vehicle_no.is_none()
    }

    /// Nombres de los campos presentes, para el audit log
    pub fn field_names(&self) -> Vec<&'static str> {
        let mut fields = Vec::new();
        if self.name.is_some() {
            fields.push("name");
        }
        if self.driver_id.is_some() {
            fields.push("driver_id");
        }
        if self.driver_name.is_some() {
            fields.push("driver_name");
        }
        if self.vehicle_no.is_some() {
            fields.push("vehicle_no");
        }
        fields
    }
}
