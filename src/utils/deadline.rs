//! Plazo acotado para llamadas mutantes
//!
//! Ninguna acción puede quedar pendiente indefinidamente: toda mutación
//! se envuelve con un timeout y expira como `AppError::Timeout`.

use std::future::Future;
use std::time::Duration;

use tokio::time::timeout;
use tracing::warn;

use super::errors::{AppError, AppResult};

/// Ejecuta `fut` con un plazo máximo de `limit`
pub async fn with_deadline<T, F>(operation: &str, limit: Duration, fut: F) -> AppResult<T>
where
    F: Future<Output = AppResult<T>>,
{
    match timeout(limit, fut).await {
        Ok(result) => result,
        Err(_) => {
            warn!("⏰ {} excedió el plazo de {:?}", operation, limit);
            Err(AppError::Timeout(format!(
                "{} did not complete within {}s",
                operation,
                limit.as_secs()
            )))
        }
    }
}
