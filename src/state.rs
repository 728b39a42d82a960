//! Shared application state
//!
//! Este módulo define el estado compartido de la aplicación que se pasa
//! a través del router de Axum.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::environment::EnvironmentConfig;
use crate::repositories::{
    AuditStore, DirectoryStore, MemoryStore, PgAuditRepository, PgDirectoryRepository,
    PgRouteRepository, PgTripRepository, RouteStore, TripStore,
};
use crate::services::{
    AuditTrail, AuthService, JwtConfig, JwtService, NotificationDispatcher, NotificationService,
    RouteRegistry, SchoolService, TripHub, TripTracker, UserProvisioning,
};

/// Backends de almacenamiento que consumen los servicios
#[derive(Clone)]
pub struct Stores {
    pub routes: Arc<dyn RouteStore>,
    pub trips: Arc<dyn TripStore>,
    pub directory: Arc<dyn DirectoryStore>,
    pub audit: Arc<dyn AuditStore>,
}

impl Stores {
    pub fn memory(store: Arc<MemoryStore>) -> Self {
        Self {
            routes: store.clone(),
            trips: store.clone(),
            directory: store.clone(),
            audit: store,
        }
    }

    pub fn postgres(pool: PgPool) -> Self {
        Self {
            routes: Arc::new(PgRouteRepository::new(pool.clone())),
            trips: Arc::new(PgTripRepository::new(pool.clone())),
            directory: Arc::new(PgDirectoryRepository::new(pool.clone())),
            audit: Arc::new(PgAuditRepository::new(pool)),
        }
    }
}

#[derive(Clone)]
pub struct AppState {
    pub config: EnvironmentConfig,
    pub auth: AuthService,
    pub routes: RouteRegistry,
    pub trips: TripTracker,
    pub hub: Arc<TripHub>,
    pub users: UserProvisioning,
    pub notifications: NotificationService,
    pub schools: SchoolService,
    pub route_store: Arc<dyn RouteStore>,
}

impl AppState {
    pub fn new(
        config: EnvironmentConfig,
        stores: Stores,
        dispatcher: Arc<dyn NotificationDispatcher>,
    ) -> Self {
        let audit = AuditTrail::new(stores.audit.clone());
        let jwt = Arc::new(JwtService::new(JwtConfig::new(
            config.jwt_secret.clone(),
            config.jwt_expiration,
        )));
        let hub = Arc::new(TripHub::new(stores.trips.clone(), config.feed_buffer));
        let notifications = NotificationService::new(dispatcher, audit.clone());

        Self {
            auth: AuthService::new(stores.directory.clone(), jwt).with_hash_cost(config.password_hash_cost),
            routes: RouteRegistry::new(
                stores.routes.clone(),
                stores.directory.clone(),
                audit.clone(),
                config.route_list_limit,
                config.mutation_timeout,
            ),
            trips: TripTracker::new(
                stores.trips.clone(),
                stores.routes.clone(),
                hub.clone(),
                notifications.clone(),
                audit.clone(),
                config.mutation_timeout,
            ),
            users: UserProvisioning::new(
                stores.directory.clone(),
                audit.clone(),
                config.default_user_password.clone(),
                config.mutation_timeout,
            )
            .with_hash_cost(config.password_hash_cost),
            schools: SchoolService::new(stores.directory.clone(), audit),
            notifications,
            hub,
            route_store: stores.routes,
            config,
        }
    }
}
