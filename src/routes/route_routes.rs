use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::dto::{ApiResponse, TenantQuery};
use crate::models::auth::Caller;
use crate::models::route::{CreateRouteRequest, Route, UpdateRouteRequest};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_route_router() -> Router<AppState> {
    Router::new()
        .route("/", get(list_routes).post(create_route))
        .route("/:id", get(get_route).put(update_route).delete(delete_route))
}

async fn list_routes(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Query(query): Query<TenantQuery>,
) -> Result<Json<ApiResponse<Vec<Route>>>, AppError> {
    let routes = state.routes.list_routes(&caller, query.tenant_id).await?;
    Ok(Json(ApiResponse::success(routes)))
}

async fn create_route(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<CreateRouteRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Route>>), AppError> {
    let route = state.routes.create_route(&caller, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(route, "Route created")),
    ))
}

async fn get_route(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state.routes.get_route(&caller, id).await?;
    Ok(Json(ApiResponse::success(route)))
}

async fn update_route(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(patch): Json<UpdateRouteRequest>,
) -> Result<Json<ApiResponse<Route>>, AppError> {
    let route = state.routes.update_route(&caller, id, patch).await?;
    Ok(Json(ApiResponse::success_with_message(route, "Route updated")))
}

async fn delete_route(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
) -> Result<Json<ApiResponse<()>>, AppError> {
    state.routes.delete_route(&caller, id).await?;
    Ok(Json(ApiResponse::message("Route deleted")))
}
