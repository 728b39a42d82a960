use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use tokio::signal;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use schools24_transport::config::{DatabaseConfig, EnvironmentConfig};
use schools24_transport::database;
use schools24_transport::repositories::MemoryStore;
use schools24_transport::services::{LogDispatcher, NotificationDispatcher, WebhookDispatcher};
use schools24_transport::{create_app, AppState, Stores};

#[tokio::main]
async fn main() -> Result<()> {
    let config = EnvironmentConfig::from_env()?;

    // Configurar logging
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    info!("🚌 Schools24 Transport - seguimiento de viajes en vivo");
    info!("================================================");

    let stores = match &config.database_url {
        Some(url) => {
            let pool = match database::create_pool(&DatabaseConfig::new(url.clone())).await {
                Ok(pool) => pool,
                Err(e) => {
                    error!("❌ Error conectando a la base de datos: {:#}", e);
                    return Err(e);
                }
            };
            info!("✅ PostgreSQL conectado");
            Stores::postgres(pool)
        }
        None => {
            warn!("⚠️ DATABASE_URL no definida, usando almacenamiento en memoria");
            if config.is_production() {
                warn!("⚠️ Modo producción sin base de datos: los datos se pierden al reiniciar");
            }
            Stores::memory(Arc::new(MemoryStore::new()))
        }
    };

    let dispatcher: Arc<dyn NotificationDispatcher> = match &config.notification_webhook_url {
        Some(url) => {
            info!("📣 Notificaciones vía webhook");
            Arc::new(WebhookDispatcher::new(url.clone(), config.mutation_timeout)?)
        }
        None => Arc::new(LogDispatcher),
    };

    let state = AppState::new(config.clone(), stores, dispatcher);

    if let (Some(email), Some(password)) = (&config.super_admin_email, &config.super_admin_password) {
        state.auth.ensure_super_admin(email, password).await?;
    }

    let app = create_app(state);

    let addr: SocketAddr = config.server_url().parse()?;
    info!("🌐 Servidor iniciando en http://{}", addr);
    info!("🔍 Endpoints disponibles:");
    info!("   POST /api/auth/login · GET /api/auth/me");
    info!("   GET|POST /api/routes · GET|PUT|DELETE /api/routes/:id");
    info!("   POST /api/trips · POST /api/trips/:id/advance · POST /api/trips/:id/complete");
    info!("   GET  /api/trips/active · GET /api/trips/:id/view");
    info!("   GET  /api/live/trips (SSE)");
    info!("   POST /api/users · POST /api/notifications · POST /api/schools");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    if let Err(e) = axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
    {
        error!("❌ Error del servidor: {}", e);
        return Err(e.into());
    }

    info!("👋 Servidor terminado");
    Ok(())
}

/// Señal de apagado graceful
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("❌ No se pudo escuchar Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(e) => {
                error!("❌ No se pudo instalar el handler de SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("🛑 Señal Ctrl+C recibida, apagando servidor...");
        },
        _ = terminate => {
            info!("🛑 Señal de terminación recibida, apagando servidor...");
        },
    }
}
