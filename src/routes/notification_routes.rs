use axum::{extract::State, routing::post, Extension, Json, Router};

use crate::dto::ApiResponse;
use crate::models::auth::Caller;
use crate::models::notification::{OutboundNotification, SendNotificationRequest};
use crate::state::AppState;
use crate::utils::errors::AppError;

pub fn create_notification_router() -> Router<AppState> {
    Router::new().route("/", post(send_notification))
}

async fn send_notification(
    State(state): State<AppState>,
    Extension(caller): Extension<Caller>,
    Json(request): Json<SendNotificationRequest>,
) -> Result<Json<ApiResponse<OutboundNotification>>, AppError> {
    let sent = state.notifications.send(&caller, request).await?;
    Ok(Json(ApiResponse::success_with_message(sent, "Notification sent")))
}
