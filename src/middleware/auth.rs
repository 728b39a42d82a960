//! Middleware de autenticación JWT
//!
//! Este módulo extrae el token Bearer, lo valida y deja la identidad del
//! llamante (`Caller`) en las extensions de la request.

use axum::{
    extract::{Request, State},
    http::header,
    middleware::Next,
    response::Response,
};

use crate::{state::AppState, utils::errors::AppError};

/// Middleware de autenticación JWT
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    // Extraer token del header Authorization
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|auth_str| auth_str.to_str().ok())
        .and_then(|auth_str| auth_str.strip_prefix("Bearer "))
        .ok_or_else(|| AppError::Unauthorized("Authorization token required".to_string()))?;

    let caller = state.auth.jwt().caller_from_token(token)?;

    // Inyectar el llamante en las extensions
    request.extensions_mut().insert(caller);

    Ok(next.run(request).await)
}
