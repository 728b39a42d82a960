//! Registro de rutas por colegio
//!
//! CRUD de rutas con su secuencia de paradas. La secuencia se fija al
//! crear la ruta y nunca se edita después; borrar una ruta no toca los
//! viajes que la referencian.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde_json::json;
use tracing::info;
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Caller;
use crate::models::route::{CreateRouteRequest, Route, Stop, StopInput, StopStatus, UpdateRouteRequest};
use crate::repositories::{DirectoryStore, RouteStore};
use crate::services::audit_service::AuditTrail;
use crate::services::capabilities::{require, resolve_tenant, Action};
use crate::services::school_service::{ensure_unlocked, LockedModule};
use crate::utils::deadline::with_deadline;
use crate::utils::errors::{not_found_error, validation_error, AppResult};
use crate::utils::validation::validate_coordinates;

/// Centro por defecto para las paradas sin coordenadas
pub const DEFAULT_CENTER: (f64, f64) = (12.9716, 77.5946);
/// Desplazamiento máximo (en grados) de las coordenadas sintéticas
pub const SYNTHETIC_SPREAD: f64 = 0.05;

const DEFAULT_ARRIVAL_TIME: &str = "00:00";

#[derive(Clone)]
pub struct RouteRegistry {
    routes: Arc<dyn RouteStore>,
    directory: Arc<dyn DirectoryStore>,
    audit: AuditTrail,
    list_limit: usize,
    mutation_timeout: Duration,
}

impl RouteRegistry {
    pub fn new(
        routes: Arc<dyn RouteStore>,
        directory: Arc<dyn DirectoryStore>,
        audit: AuditTrail,
        list_limit: usize,
        mutation_timeout: Duration,
    ) -> Self {
        Self {
            routes,
            directory,
            audit,
            list_limit,
            mutation_timeout,
        }
    }

    /// Rutas del tenant, truncadas al límite configurado
    pub async fn list_routes(&self, caller: &Caller, tenant_id: Option<Uuid>) -> AppResult<Vec<Route>> {
        require(caller, Action::ViewRoutes)?;
        let tenant_id = resolve_tenant(caller, tenant_id)?;
        self.routes.list_routes(tenant_id, self.list_limit).await
    }

    /// Una ruta fuera del tenant del llamante se reporta como inexistente
    pub async fn get_route(&self, caller: &Caller, id: Uuid) -> AppResult<Route> {
        require(caller, Action::ViewRoutes)?;
        self.routes
            .find_route(id)
            .await?
            .filter(|route| caller.can_see_tenant(route.tenant_id))
            .ok_or_else(|| not_found_error("Route", id))
    }

    pub async fn create_route(&self, caller: &Caller, request: CreateRouteRequest) -> AppResult<Route> {
        require(caller, Action::ManageRoutes)?;
        request.validate()?;
        let tenant_id = resolve_tenant(caller, request.tenant_id)?;

        if request.stops.is_empty() {
            return Err(validation_error("a route needs at least one stop"));
        }

        let now = Utc::now();
        let route = Route {
            id: Uuid::new_v4(),
            tenant_id,
            name: request.name.trim().to_string(),
            driver_id: request.driver_id,
            driver_name: request.driver_name,
            vehicle_no: request.vehicle_no,
            stops: build_stops(&request.stops, now)?,
            created_at: now,
        };

        with_deadline("createRoute", self.mutation_timeout, async {
            ensure_unlocked(self.directory.as_ref(), caller, tenant_id, LockedModule::Transport).await?;
            self.routes.insert_route(&route).await
        })
        .await?;

        info!("🚌 Ruta creada: {} ({} paradas) en {}", route.id, route.stop_count(), route.tenant_id);
        self.audit
            .record(
                caller,
                "create",
                "route",
                Some(route.id.to_string()),
                json!({ "name": route.name, "stops": route.stop_count() }),
            )
            .await;

        Ok(route)
    }

    /// Solo nombre, conductor y vehículo; las paradas no son editables
    pub async fn update_route(&self, caller: &Caller, id: Uuid, patch: UpdateRouteRequest) -> AppResult<Route> {
        require(caller, Action::ManageRoutes)?;
        patch.validate()?;
        if patch.is_empty() {
            return Err(validation_error("no fields to update"));
        }

        let existing = self.get_route(caller, id).await?;

        let updated = with_deadline("updateRoute", self.mutation_timeout, async {
            ensure_unlocked(self.directory.as_ref(), caller, existing.tenant_id, LockedModule::Transport)
                .await?;
            self.routes.update_route(id, &patch).await
        })
        .await?
        .ok_or_else(|| not_found_error("Route", id))?;

        info!("✏️ Ruta actualizada: {} ({:?})", id, patch.field_names());
        self.audit
            .record(
                caller,
                "update",
                "route",
                Some(id.to_string()),
                json!({ "fields": patch.field_names() }),
            )
            .await;

        Ok(updated)
    }

    /// Los viajes que referencian la ruta se conservan
    pub async fn delete_route(&self, caller: &Caller, id: Uuid) -> AppResult<()> {
        require(caller, Action::ManageRoutes)?;
        let existing = self.get_route(caller, id).await?;

        let deleted = with_deadline("deleteRoute", self.mutation_timeout, async {
            ensure_unlocked(self.directory.as_ref(), caller, existing.tenant_id, LockedModule::Transport)
                .await?;
            self.routes.delete_route(id).await
        })
        .await?;

        if !deleted {
            return Err(not_found_error("Route", id));
        }

        info!("🗑️ Ruta eliminada: {}", id);
        self.audit
            .record(caller, "delete", "route", Some(id.to_string()), json!({ "name": existing.name }))
            .await;

        Ok(())
    }
}

/// Convierte las paradas recibidas en paradas persistibles.
///
/// Si faltan ambas coordenadas se generan unas sintéticas cerca del centro
/// por defecto; si falta solo una, es un error de validación.
fn build_stops(inputs: &[StopInput], now: DateTime<Utc>) -> AppResult<Vec<Stop>> {
    let mut rng = rand::thread_rng();
    let stamp = now.timestamp_millis();

    inputs
        .iter()
        .enumerate()
        .map(|(index, input)| {
            let name = input.name.trim();
            if name.is_empty() {
                return Err(validation_error(format!("stop {} has an empty name", index)));
            }

            let (lat, lng) = match (input.lat, input.lng) {
                (Some(lat), Some(lng)) => {
                    validate_coordinates(lat, lng).map_err(|e| {
                        validation_error(format!("stop '{}' has invalid {}", name, e.code))
                    })?;
                    (lat, lng)
                }
                (None, None) => (
                    DEFAULT_CENTER.0 + rng.gen_range(-SYNTHETIC_SPREAD..=SYNTHETIC_SPREAD),
                    DEFAULT_CENTER.1 + rng.gen_range(-SYNTHETIC_SPREAD..=SYNTHETIC_SPREAD),
                ),
                _ => {
                    return Err(validation_error(format!(
                        "stop '{}' must provide both lat and lng or neither",
                        name
                    )))
                }
            };

            let arrival_time = input
                .arrival_time
                .as_deref()
                .map(str::trim)
                .filter(|t| !t.is_empty())
                .unwrap_or(DEFAULT_ARRIVAL_TIME)
                .to_string();

            Ok(Stop {
                id: format!("stop-{}-{}", stamp, index),
                name: name.to_string(),
                lat,
                lng,
                arrival_time,
                status: StopStatus::Pending,
            })
        })
        .collect()
}
