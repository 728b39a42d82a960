//! Store en memoria
//!
//! Implementa todos los contratos de almacenamiento sobre un único
//! `RwLock`, de modo que cada operación es atómica respecto a las demás.
//! Se usa en los tests y cuando no hay `DATABASE_URL`.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{AuditStore, DirectoryStore, RouteStore, TripScope, TripStore};
use crate::models::audit::AuditEntry;
use crate::models::route::{Route, UpdateRouteRequest};
use crate::models::school::{School, TenantLocks};
use crate::models::trip::Trip;
use crate::models::user::{Profile, UserCredentials};
use crate::utils::errors::{AppError, AppResult};

#[derive(Default)]
struct MemoryState {
    routes: HashMap<Uuid, Route>,
    trips: HashMap<Uuid, Trip>,
    users: HashMap<Uuid, UserCredentials>,
    schools: HashMap<Uuid, School>,
    audit: Vec<AuditEntry>,
}

#[derive(Default)]
pub struct MemoryStore {
    state: RwLock<MemoryState>,
    offline: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Simula la caída del backend: toda operación falla con `Transport`
    pub fn set_offline(&self, offline: bool) {
        self.offline.store(offline, Ordering::SeqCst);
    }

    fn ensure_online(&self) -> AppResult<()> {
        if self.offline.load(Ordering::SeqCst) {
            return Err(AppError::Transport("memory store is offline".to_string()));
        }
        Ok(())
    }

    /// Copia del audit log en orden de escritura
    pub async fn audit_entries(&self) -> Vec<AuditEntry> {
        self.state.read().await.audit.clone()
    }
}

#[async_trait]
impl RouteStore for MemoryStore {
    async fn list_routes(&self, tenant_id: Uuid, limit: usize) -> AppResult<Vec<Route>> {
        self.ensure_online()?;
        let state = self.state.read().await;
        let mut routes: Vec<Route> = state
            .routes
            .values()
            .filter(|r| r.tenant_id == tenant_id)
            .cloned()
            .collect();
        routes.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        routes.truncate(limit);
        Ok(routes)
    }

    async fn find_route(&self, id: Uuid) -> AppResult<Option<Route>> {
        self.ensure_online()?;
        Ok(self.state.read().await.routes.get(&id).cloned())
    }

    async fn insert_route(&self, route: &Route) -> AppResult<()> {
        self.ensure_online()?;
        let mut state = self.state.write().await;
        if state.routes.contains_key(&route.id) {
            return Err(AppError::Conflict(format!("route '{}' already exists", route.id)));
        }
        state.routes.insert(route.id, route.clone());
        Ok(())
    }

    async fn update_route(&self, id: Uuid, patch: &UpdateRouteRequest) -> AppResult<Option<Route>> {
        self.ensure_online()?;
        let mut state = self.state.write().await;
        let Some(route) = state.routes.get_mut(&id) else {
            return Ok(None);
        };
        if let Some(name) = &patch.name {
            route.name = name.clone();
        }
        if let Some(driver_id) = patch.driver_id {
            route.driver_id = Some(driver_id);
        }
        if let Some(driver_name) = &patch.driver_name {
            route.driver_name = Some(driver_name.clone());
        }
        if let Some(vehicle_no) = &patch.vehicle_no {
            route.vehicle_no = Some(vehicle_no.clone());
        }
        Ok(Some(route.clone()))
    }

    async fn delete_route(&self, id: Uuid) -> AppResult<bool> {
        self.ensure_online()?;
        Ok(self.state.write().await.routes.remove(&id).is_some())
    }
}

#[async_trait]
impl TripStore for MemoryStore {
    async fn insert_active_trip(&self, trip: &Trip) -> AppResult<()> {
        self.ensure_online()?;
        let mut state = self.state.write().await;
        let duplicate = state.trips.values().any(|t| {
            t.is_active() && t.driver_id == trip.driver_id && t.trip_date == trip.trip_date
        });
        if duplicate {
            return Err(AppError::Conflict(format!(
                "driver '{}' already has an active trip on {}",
                trip.driver_id, trip.trip_date
            )));
        }
        state.trips.insert(trip.id, trip.clone());
        Ok(())
    }

    async fn find_trip(&self, id: Uuid) -> AppResult<Option<Trip>> {
        self.ensure_online()?;
        Ok(self.state.read().await.trips.get(&id).cloned())
    }

    async fn find_active_trip(&self, tenant_id: Uuid, scope: TripScope) -> AppResult<Option<Trip>> {
        self.ensure_online()?;
        let state = self.state.read().await;
        Ok(state
            .trips
            .values()
            .filter(|t| t.tenant_id == tenant_id && t.is_active() && scope.matches(t))
            .max_by_key(|t| t.started_at)
            .cloned())
    }

    async fn replace_trip(&self, next: &Trip, expected_version: i64) -> AppResult<bool> {
        self.ensure_online()?;
        let mut state = self.state.write().await;
        match state.trips.get_mut(&next.id) {
            Some(current) if current.version == expected_version => {
                *current = next.clone();
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

#[async_trait]
impl DirectoryStore for MemoryStore {
    async fn find_profile(&self, uid: Uuid) -> AppResult<Option<Profile>> {
        self.ensure_online()?;
        Ok(self
            .state
            .read()
            .await
            .users
            .get(&uid)
            .map(|c| c.profile.clone()))
    }

    async fn find_credentials(&self, email: &str) -> AppResult<Option<UserCredentials>> {
        self.ensure_online()?;
        let email = email.trim().to_lowercase();
        Ok(self
            .state
            .read()
            .await
            .users
            .values()
            .find(|c| c.profile.email == email)
            .cloned())
    }

    async fn insert_user(&self, credentials: &UserCredentials) -> AppResult<()> {
        self.ensure_online()?;
        let mut state = self.state.write().await;
        if state
            .users
            .values()
            .any(|c| c.profile.email == credentials.profile.email)
        {
            return Err(AppError::Conflict(format!(
                "user with email '{}' already exists",
                credentials.profile.email
            )));
        }
        state.users.insert(credentials.profile.uid, credentials.clone());
        Ok(())
    }

    async fn find_school(&self, id: Uuid) -> AppResult<Option<School>> {
        self.ensure_online()?;
        Ok(self.state.read().await.schools.get(&id).cloned())
    }

    async fn insert_school(&self, school: &School) -> AppResult<()> {
        self.ensure_online()?;
        self.state.write().await.schools.insert(school.id, school.clone());
        Ok(())
    }

    async fn update_school_locks(&self, id: Uuid, locks: TenantLocks) -> AppResult<Option<School>> {
        self.ensure_online()?;
        let mut state = self.state.write().await;
        Ok(state.schools.get_mut(&id).map(|school| {
            school.locks = locks;
            school.clone()
        }))
    }
}

#[async_trait]
impl AuditStore for MemoryStore {
    async fn record(&self, entry: &AuditEntry) -> AppResult<()> {
        self.ensure_online()?;
        self.state.write().await.audit.push(entry.clone());
        Ok(())
    }
}
