use axum::{extract::State, routing::get, Extension, Json, Router};

use crate::dto::ApiResponse;
use crate::models::auth::{Caller, LoginRequest, LoginResponse};
use crate::models::user::ProfileResponse;
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_auth_router() -> Router<AppState> {
    Router::new().route("/me", get(me))
}

/// Login, sin autenticación previa
pub async fn login(
    State(state): State<AppState>,
    Json(request): Json<LoginRequest>,
) -> Result<Json<ApiResponse<LoginResponse>>, AppError> {
    let response = state.auth.login(request).await?;
    Ok(Json(ApiResponse::success(response)))
}

async fn me(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
) -> Result<Json<ApiResponse<ProfileResponse>>, AppError> {
    let profile = state.auth.me(&caller).await?;
    Ok(Json(ApiResponse::success(profile.into())))
}
