//! Vista en vivo por Server-Sent Events
//!
//! Eventos: `trip` (snapshot y vista, o null), `stop_alert` (solo padres)
//! y `degraded`. La suscripción se cancela al cerrarse la conexión.

use std::convert::Infallible;

use axum::{
    extract::{Query, State},
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Extension, Router,
};
use futures::stream::{Stream, StreamExt};
use serde_json::json;
use tracing::info;

use crate::dto::TripScopeQuery;
use crate::models::auth::Caller;
use crate::routes::trip_routes::scope_from_query;
use crate::services::{TripWatcher, WatchUpdate};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_live_router() -> Router<AppState> {
    Router::new().route("/trips", get(live_trips))
}

async fn live_trips(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<TripScopeQuery>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, AppError> {
    let scope = scope_from_query(&query, &caller)?;
    let watcher = TripWatcher::start(
        state.hub.clone(),
        state.route_store.clone(),
        &caller,
        scope,
        query.tenant_id,
    )
    .await?;

    info!("📺 {} ({}) observa {:?}", caller.uid, caller.role.as_str(), scope);

    let stream = watcher.into_stream().map(|update| Ok(to_event(update)));
    Ok(Sse::new(stream).keep_alive(KeepAlive::default()))
}

fn to_event(update: WatchUpdate) -> Event {
    let (name, payload) = match update {
        WatchUpdate::Trip { trip, view } => ("trip", json!({ "trip": trip, "view": view })),
        WatchUpdate::StopAlert(alert) => ("stop_alert", json!(alert)),
        WatchUpdate::Degraded { reason } => ("degraded", json!({ "reason": reason })),
    };

    Event::default()
        .event(name)
        .json_data(payload)
        .unwrap_or_else(|e| Event::default().event("degraded").data(e.to_string()))
}
