use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{get, post},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::dto::{ApiResponse, TripScopeQuery};
use crate::models::auth::{Caller, UserRole};
use crate::models::trip::{AdvanceStopRequest, StartTripRequest, Trip};
use crate::repositories::TripScope;
use crate::services::TripView;
use crate::state::AppState;
use crate::utils::errors::{validation_error, AppError, AppResult};

pub fn create_trip_router() -> Router<AppState> {
    Router::new()
        .route("/", post(start_trip))
        .route("/active", get(active_trip))
        .route("/:id", get(get_trip))
        .route("/:id/advance", post(advance_stop))
        .route("/:id/complete", post(complete_trip))
        .route("/:id/view", get(trip_view))
}

/// Ámbito observado. Sin filtro, un conductor observa su propio viaje.
pub fn scope_from_query(query: &TripScopeQuery, caller: &Caller) -> AppResult<TripScope> {
    match (query.route_id, query.driver_id) {
        (Some(route_id), None) => Ok(TripScope::Route(route_id)),
        (None, Some(driver_id)) => Ok(TripScope::Driver(driver_id)),
        (None, None) if caller.role == UserRole::Driver => Ok(TripScope::Driver(caller.uid)),
        (None, None) => Err(validation_error("route_id or driver_id is required")),
        (Some(_), Some(_)) => Err(validation_error("use either route_id or driver_id, not both")),
    }
}

async fn start_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<StartTripRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Trip>>), AppError> {
    let trip = state.trips.start_trip(&caller, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(trip, "Trip started")),
    ))
}

async fn advance_stop(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    request: Option<Json<AdvanceStopRequest>>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let expected_index = request.and_then(|Json(r)| r.expected_index);
    let trip = state.trips.advance_stop(&caller, id, expected_index).await?;
    Ok(Json(ApiResponse::success(trip)))
}

async fn complete_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let trip = state.trips.complete_trip(&caller, id).await?;
    Ok(Json(ApiResponse::success_with_message(trip, "Trip completed")))
}

async fn active_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<TripScopeQuery>,
) -> Result<Json<ApiResponse<Option<Trip>>>, AppError> {
    let scope = scope_from_query(&query, &caller)?;
    let trip = state.trips.active_trip(&caller, scope, query.tenant_id).await?;
    Ok(Json(ApiResponse::success(trip)))
}

async fn get_trip(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Trip>>, AppError> {
    let trip = state.trips.get_trip(&caller, id).await?;
    Ok(Json(ApiResponse::success(trip)))
}

async fn trip_view(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<TripView>>, AppError> {
    let view = state.trips.trip_view(&caller, id).await?;
    Ok(Json(ApiResponse::success(view)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_driver_defaults_to_own_scope() {
        let driver = Caller::new(Uuid::new_v4(), UserRole::Driver, Some(Uuid::new_v4()));
        let scope = scope_from_query(&TripScopeQuery::default(), &driver).unwrap();
        assert_eq!(scope, TripScope::Driver(driver.uid));

        let parent = Caller::new(Uuid::new_v4(), UserRole::Parent, Some(Uuid::new_v4()));
        assert!(scope_from_query(&TripScopeQuery::default(), &parent).is_err());
    }

    #[test]
    fn test_both_filters_rejected() {
        let parent = Caller::new(Uuid::new_v4(), UserRole::Parent, Some(Uuid::new_v4()));
        let query = TripScopeQuery {
            route_id: Some(Uuid::new_v4()),
            driver_id: Some(Uuid::new_v4()),
            tenant_id: None,
        };
        assert!(scope_from_query(&query, &parent).is_err());
    }
}
