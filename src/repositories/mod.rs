//! Repositorios
//!
//! Contratos de almacenamiento que consumen los servicios, con dos
//! implementaciones: PostgreSQL (sqlx) y un store en memoria para tests y
//! ejecución local. Todas las escrituras son de un solo documento.

pub mod audit_repository;
pub mod directory_repository;
pub mod memory_store;
pub mod route_repository;
pub mod trip_repository;

use async_trait::async_trait;
use uuid::Uuid;

use crate::models::audit::AuditEntry;
use crate::models::route::{Route, UpdateRouteRequest};
use crate::models::school::{School, TenantLocks};
use crate::models::trip::Trip;
use crate::models::user::{Profile, UserCredentials};
use crate::utils::errors::AppResult;

pub use audit_repository::PgAuditRepository;
pub use directory_repository::PgDirectoryRepository;
pub use memory_store::MemoryStore;
pub use route_repository::PgRouteRepository;
pub use trip_repository::PgTripRepository;

/// Criterio de búsqueda del viaje activo que sigue un suscriptor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TripScope {
    Route(Uuid),
    Driver(Uuid),
}

impl TripScope {
    pub fn matches(&self, trip: &Trip) -> bool {
        match self {
            TripScope::Route(route_id) => trip.route_id == *route_id,
            TripScope::Driver(driver_id) => trip.driver_id == *driver_id,
        }
    }
}

#[async_trait]
pub trait RouteStore: Send + Sync {
    /// Rutas del tenant, más recientes primero, truncadas a `limit`
    async fn list_routes(&self, tenant_id: Uuid, limit: usize) -> AppResult<Vec<Route>>;
    async fn find_route(&self, id: Uuid) -> AppResult<Option<Route>>;
    async fn insert_route(&self, route: &Route) -> AppResult<()>;
    /// Aplica solo los campos presentes; None si la ruta no existe
    async fn update_route(&self, id: Uuid, patch: &UpdateRouteRequest) -> AppResult<Option<Route>>;
    /// false si no existía. No toca los viajes que la referencian.
    async fn delete_route(&self, id: Uuid) -> AppResult<bool>;
}

#[async_trait]
pub trait TripStore: Send + Sync {
    /// Falla con `Conflict` si ya hay un viaje activo para (conductor, fecha)
    async fn insert_active_trip(&self, trip: &Trip) -> AppResult<()>;
    async fn find_trip(&self, id: Uuid) -> AppResult<Option<Trip>>;
    /// Viaje activo más reciente del tenant que cumple `scope`
    async fn find_active_trip(&self, tenant_id: Uuid, scope: TripScope) -> AppResult<Option<Trip>>;
    /// Reemplaza el documento solo si la versión guardada es `expected_version`
    async fn replace_trip(&self, next: &Trip, expected_version: i64) -> AppResult<bool>;
}

#[async_trait]
pub trait DirectoryStore: Send + Sync {
    async fn find_profile(&self, uid: Uuid) -> AppResult<Option<Profile>>;
    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>>;
    /// Falla con `Conflict` si el email ya existe
    async fn insert_user(&self, credentials: &UserCredentials) -> AppResult<()>;
    async fn find_school(&self, id: Uuid) -> AppResult<Option<School>>;
    async fn insert_school(&self, school: &School) -> AppResult<()>;
    async fn update_school_locks(&self, id: Uuid, locks: TenantLocks) -> AppResult<Option<School>>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn record(&self, entry: &AuditEntry) -> AppResult<()>;
}
