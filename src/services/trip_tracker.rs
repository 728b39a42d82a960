//! Trip Tracker
//!
//! Máquina de estados del viaje: NONE → ACTIVE → COMPLETED. Cada
//! transición se calcula en `Trip` y se confirma con una escritura
//! condicional sobre la versión; solo después se publica a los
//! suscriptores. Ninguna transición se reintenta automáticamente.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;

use crate::models::auth::Caller;
use crate::models::route::Route;
use crate::models::trip::{NewTrip, StartTripRequest, Trip};
use crate::repositories::{RouteStore, TripScope, TripStore};
use crate::services::audit_service::AuditTrail;
use crate::services::capabilities::{require, resolve_tenant, Action};
use crate::services::live_feed::TripHub;
use crate::services::notifications::{stop_alert, NotificationService};
use crate::services::trip_view::TripView;
use crate::utils::deadline::with_deadline;
use crate::utils::errors::{forbidden_error, not_found_error, validation_error, AppError, AppResult};

#[derive(Clone)]
pub struct TripTracker {
    trips: Arc<dyn TripStore>,
    routes: Arc<dyn RouteStore>,
    hub: Arc<TripHub>,
    notifications: NotificationService,
    audit: AuditTrail,
    mutation_timeout: Duration,
}

impl TripTracker {
    pub fn new(
        trips: Arc<dyn TripStore>,
        routes: Arc<dyn RouteStore>,
        hub: Arc<TripHub>,
        notifications: NotificationService,
        audit: AuditTrail,
        mutation_timeout: Duration,
    ) -> Self {
        Self {
            trips,
            routes,
            hub,
            notifications,
            audit,
            mutation_timeout,
        }
    }

    /// Inicia un viaje del conductor sobre una ruta de su colegio.
    ///
    /// Falla con `Conflict` si el conductor ya tiene un viaje activo ese día.
    pub async fn start_trip(&self, caller: &Caller, request: StartTripRequest) -> AppResult<Trip> {
        require(caller, Action::StartTrip)?;
        let tenant_id = resolve_tenant(caller, None)?;
        let trip_date = request.date.unwrap_or_else(|| Utc::now().date_naive());

        let trip = with_deadline("startTrip", self.mutation_timeout, async {
            let route = self.find_route(tenant_id, request.route_id).await?;

            if route.stops.is_empty() {
                return Err(validation_error(format!("route '{}' has no stops", route.id)));
            }
            if let Some(assigned) = route.driver_id {
                if assigned != caller.uid {
                    return Err(forbidden_error(
                        "start a trip",
                        "the route is assigned to another driver",
                    ));
                }
            }

            let trip = NewTrip {
                route_id: route.id,
                driver_id: caller.uid,
                tenant_id,
                trip_date,
            }
            .into_trip(Utc::now());

            self.trips.insert_active_trip(&trip).await?;
            Ok(trip)
        })
        .await
        .map_err(|e| rejected("startTrip", request.route_id, e))?;

        info!(
            "🚦 Viaje {} iniciado: ruta {} conductor {} fecha {}",
            trip.id, trip.route_id, trip.driver_id, trip.trip_date
        );
        self.hub.publish(&trip);
        self.audit
            .record(
                caller,
                "start",
                "trip",
                Some(trip.id.to_string()),
                json!({ "route_id": trip.route_id, "date": trip.trip_date }),
            )
            .await;

        Ok(trip)
    }

    /// Avanza exactamente una parada.
    ///
    /// Con `expected_index` un doble click sobre el mismo índice se rechaza
    /// con `Conflict` en vez de saltarse una parada.
    pub async fn advance_stop(
        &self,
        caller: &Caller,
        trip_id: Uuid,
        expected_index: Option<i32>,
    ) -> AppResult<Trip> {
        require(caller, Action::AdvanceTrip)?;

        let (next, route) = with_deadline("advanceStop", self.mutation_timeout, async {
            let trip = self.find_owned_trip(caller, trip_id).await?;
            trip.ensure_active("advance")?;

            let route = self.find_route(trip.tenant_id, trip.route_id).await?;
            let next = trip.advanced(route.stop_count(), expected_index, Utc::now())?;
            self.commit(&next, trip.version).await?;
            Ok((next, route))
        })
        .await
        .map_err(|e| rejected("advanceStop", trip_id, e))?;

        info!(
            "➡️ Viaje {} en parada {} de {} (v{})",
            next.id,
            next.current_stop_index,
            route.stop_count(),
            next.version
        );
        self.hub.publish(&next);

        if let Some(alert) = stop_alert(&next, &route) {
            self.notifications.forward_stop_alert(next.tenant_id, &alert).await;
        }

        Ok(next)
    }

    /// Marca el viaje como completado; el índice se queda donde estaba
    pub async fn complete_trip(&self, caller: &Caller, trip_id: Uuid) -> AppResult<Trip> {
        require(caller, Action::CompleteTrip)?;

        let done = with_deadline("completeTrip", self.mutation_timeout, async {
            let trip = self.find_owned_trip(caller, trip_id).await?;
            let done = trip.completed(Utc::now())?;
            self.commit(&done, trip.version).await?;
            Ok(done)
        })
        .await
        .map_err(|e| rejected("completeTrip", trip_id, e))?;

        info!("🏁 Viaje {} completado en la parada {}", done.id, done.current_stop_index);
        self.hub.publish(&done);
        self.audit
            .record(
                caller,
                "complete",
                "trip",
                Some(done.id.to_string()),
                json!({ "final_stop_index": done.current_stop_index }),
            )
            .await;

        Ok(done)
    }

    /// Lectura puntual de lo que entrega la suscripción en vivo
    pub async fn active_trip(
        &self,
        caller: &Caller,
        scope: TripScope,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Option<Trip>> {
        require(caller, Action::WatchTrip)?;
        let tenant_id = resolve_tenant(caller, tenant_id)?;
        self.trips.find_active_trip(tenant_id, scope).await
    }

    pub async fn get_trip(&self, caller: &Caller, trip_id: Uuid) -> AppResult<Trip> {
        require(caller, Action::WatchTrip)?;
        self.trips
            .find_trip(trip_id)
            .await?
            .filter(|trip| caller.can_see_tenant(trip.tenant_id))
            .ok_or_else(|| not_found_error("Trip", trip_id))
    }

    pub async fn trip_view(&self, caller: &Caller, trip_id: Uuid) -> AppResult<TripView> {
        let trip = self.get_trip(caller, trip_id).await?;
        let route = self.find_route(trip.tenant_id, trip.route_id).await?;
        Ok(TripView::build(&trip, &route))
    }

    async fn find_route(&self, tenant_id: Uuid, route_id: Uuid) -> AppResult<Route> {
        self.routes
            .find_route(route_id)
            .await?
            .filter(|route| route.tenant_id == tenant_id)
            .ok_or_else(|| not_found_error("Route", route_id))
    }

    /// Solo el conductor que inició el viaje puede moverlo
    async fn find_owned_trip(&self, caller: &Caller, trip_id: Uuid) -> AppResult<Trip> {
        let trip = self
            .trips
            .find_trip(trip_id)
            .await?
            .filter(|trip| caller.can_see_tenant(trip.tenant_id))
            .ok_or_else(|| not_found_error("Trip", trip_id))?;

        if trip.driver_id != caller.uid {
            return Err(forbidden_error("modify trip", "only the driver running it may do so"));
        }
        Ok(trip)
    }

    async fn commit(&self, next: &Trip, expected_version: i64) -> AppResult<()> {
        if self.trips.replace_trip(next, expected_version).await? {
            Ok(())
        } else {
            Err(AppError::Conflict(format!(
                "trip '{}' was modified concurrently, reload and retry",
                next.id
            )))
        }
    }
}

fn rejected(operation: &str, id: Uuid, error: AppError) -> AppError {
    match &error {
        AppError::Transport(_) | AppError::Internal(_) => {}
        _ => warn!("🚫 {} rechazado para {}: {}", operation, id, error),
    }
    error
}
