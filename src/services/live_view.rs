//! Vista en vivo por rol
//!
//! `TripWatcher` combina la suscripción, las vistas derivadas y, para los
//! padres, los avisos de parada. Al cambiar de ruta o conductor observado
//! se abre la suscripción nueva y la anterior queda cancelada.

use std::collections::VecDeque;
use std::sync::Arc;

use futures::stream::{self, Stream};
use serde::Serialize;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::auth::{Caller, UserRole};
use crate::models::notification::StopNotification;
use crate::models::route::Route;
use crate::models::trip::Trip;
use crate::repositories::{RouteStore, TripScope};
use crate::services::capabilities::{require, resolve_tenant, Action};
use crate::services::live_feed::{FeedEvent, TripHub, TripSubscription};
use crate::services::notifications::StopAlertTracker;
use crate::services::trip_view::TripView;
use crate::utils::errors::AppResult;

/// Actualización entregada a la vista
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WatchUpdate {
    Trip {
        trip: Option<Trip>,
        /// None si no hay viaje o su ruta ya no existe
        view: Option<TripView>,
    },
    StopAlert(StopNotification),
    Degraded { reason: String },
}

pub struct TripWatcher {
    hub: Arc<TripHub>,
    routes: Arc<dyn RouteStore>,
    tenant_id: Uuid,
    subscription: TripSubscription,
    alerts: Option<StopAlertTracker>,
    route: Option<Route>,
    pending: VecDeque<WatchUpdate>,
}

impl TripWatcher {
    /// Abre la vista en vivo del llamante sobre `scope`
    pub async fn start(
        hub: Arc<TripHub>,
        routes: Arc<dyn RouteStore>,
        caller: &Caller,
        scope: TripScope,
        tenant_id: Option<Uuid>,
    ) -> AppResult<Self> {
        require(caller, Action::WatchTrip)?;
        let tenant_id = resolve_tenant(caller, tenant_id)?;
        let subscription = hub.subscribe(tenant_id, scope).await;

        Ok(Self {
            hub,
            routes,
            tenant_id,
            subscription,
            alerts: (caller.role == UserRole::Parent).then(StopAlertTracker::new),
            route: None,
            pending: VecDeque::new(),
        })
    }

    pub fn scope(&self) -> TripScope {
        self.subscription.scope()
    }

    /// Cambia el objetivo observado. Sin cambio de objetivo no hace nada.
    pub async fn retarget(&mut self, scope: TripScope) {
        if scope == self.subscription.scope() {
            return;
        }

        let fresh = self.hub.subscribe(self.tenant_id, scope).await;
        let previous = std::mem::replace(&mut self.subscription, fresh);
        previous.unsubscribe();

        if let Some(alerts) = self.alerts.as_mut() {
            alerts.reset();
        }
        self.route = None;
        self.pending.clear();
        debug!("🔁 Vista reorientada a {:?}", scope);
    }

    /// Siguiente actualización; None solo si el hub se ha cerrado
    pub async fn next(&mut self) -> Option<WatchUpdate> {
        if let Some(update) = self.pending.pop_front() {
            return Some(update);
        }

        match self.subscription.next().await? {
            FeedEvent::Degraded(reason) => Some(WatchUpdate::Degraded { reason }),
            FeedEvent::Snapshot(trip) => {
                let route = match &trip {
                    Some(trip) => self.route_for(trip).await,
                    None => None,
                };

                if let Some(alerts) = self.alerts.as_mut() {
                    if let Some(alert) = alerts.observe(trip.as_ref(), route.as_ref()) {
                        self.pending.push_back(WatchUpdate::StopAlert(alert));
                    }
                }

                let view = match (&trip, &route) {
                    (Some(trip), Some(route)) => Some(TripView::build(trip, route)),
                    _ => None,
                };
                Some(WatchUpdate::Trip { trip, view })
            }
        }
    }

    pub fn into_stream(self) -> impl Stream<Item = WatchUpdate> + Send {
        stream::unfold(self, |mut watcher| async move {
            watcher.next().await.map(|update| (update, watcher))
        })
    }

    /// Las paradas son inmutables, así que la ruta se cachea por id
    async fn route_for(&mut self, trip: &Trip) -> Option<Route> {
        if let Some(route) = self.route.as_ref().filter(|r| r.id == trip.route_id) {
            return Some(route.clone());
        }

        match self.routes.find_route(trip.route_id).await {
            Ok(route) => {
                self.route = route.filter(|r| r.tenant_id == self.tenant_id);
                self.route.clone()
            }
            Err(e) => {
                warn!("⚠️ Ruta {} no disponible para la vista: {}", trip.route_id, e);
                None
            }
        }
    }
}
