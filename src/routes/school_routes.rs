use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{post, put},
    Extension, Json, Router,
};
use uuid::Uuid;

use crate::dto::ApiResponse;
use crate::models::auth::Caller;
use crate::models::school::{CreateSchoolRequest, School, TenantLocks};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_school_router() -> Router<AppState> {
    Router::new()
        .route("/", post(create_school))
        .route("/:id/locks", put(set_locks))
}

async fn create_school(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<CreateSchoolRequest>,
) -> Result<(StatusCode, Json<ApiResponse<School>>), AppError> {
    let school = state.schools.create_school(&caller, request).await?;
    Ok((StatusCode::CREATED, Json(ApiResponse::success(school))))
}

async fn set_locks(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Path(id): Path<Uuid>,
    Json(locks): Json<TenantLocks>,
) -> Result<Json<ApiResponse<School>>, AppError> {
    let school = state.schools.set_locks(&caller, id, locks).await?;
    Ok(Json(ApiResponse::success(school)))
}
