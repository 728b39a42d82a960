use axum::{extract::State, http::StatusCode, routing::post, Extension, Json, Router};

use crate::dto::ApiResponse;
use crate::models::auth::Caller;
use crate::models::user::{CreateUserRequest, ProvisionedUser};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_user_router() -> Router<AppState> {
    Router::new().route("/", post(create_user))
}

async fn create_user(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<ApiResponse<ProvisionedUser>>), AppError> {
    let user = state.users.create_user(&caller, request).await?;
    Ok((
        StatusCode::CREATED,
        Json(ApiResponse::success_with_message(user, "User created")),
    ))
}
