use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::PgPool;
use uuid::Uuid;

use super::RouteStore;
use crate::models::route::{Route, Stop, UpdateRouteRequest};
use crate::utils::errors::{AppError, AppResult};

// Fila tal como vive en la tabla routes
#[derive(Debug, sqlx::FromRow)]
struct RouteRow {
    id: Uuid,
    tenant_id: Uuid,
    name: String,
    driver_id: Option<Uuid>,
    driver_name: Option<String>,
    vehicle_no: Option<String>,
    stops: Json<Vec<Stop>>,
    created_at: DateTime<Utc>,
}

impl From<RouteRow> for Route {
    fn from(row: RouteRow) -> Self {
        Self {
            id: row.id,
            tenant_id: row.tenant_id,
            name: row.name,
            driver_id: row.driver_id,
            driver_name: row.driver_name,
            vehicle_no: row.vehicle_no,
            stops: row.stops.0,
            created_at: row.created_at,
        }
    }
}

pub struct PgRouteRepository {
    pool: PgPool,
}

impl PgRouteRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl RouteStore for PgRouteRepository {
    async fn list_routes(&self, tenant_id: Uuid, limit: usize) -> AppResult<Vec<Route>> {
        let rows = sqlx::query_as::<_, RouteRow>(
            "SELECT * FROM routes WHERE tenant_id = $1 ORDER BY created_at DESC LIMIT $2",
        )
        .bind(tenant_id)
        .bind(limit as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| AppError::Transport(format!("Error listing routes: {}", e)))?;

        Ok(rows.into_iter().map(Route::from).collect())
    }

    async fn find_route(&self, id: Uuid) -> AppResult<Option<Route>> {
        let row = sqlx::query_as::<_, RouteRow>("SELECT * FROM routes WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Transport(format!("Error finding route: {}", e)))?;

        Ok(row.map(Route::from))
    }

    async fn insert_route(&self, route: &Route) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO routes (id, tenant_id, name, driver_id, driver_name, vehicle_no, stops, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(route.id)
        .bind(route.tenant_id)
        .bind(&route.name)
        .bind(route.driver_id)
        .bind(&route.driver_name)
        .bind(&route.vehicle_no)
        .bind(Json(&route.stops))
        .bind(route.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Transport(format!("Error creating route: {}", e)))?;

        Ok(())
    }

    async fn update_route(&self, id: Uuid, patch: &UpdateRouteRequest) -> AppResult<Option<Route>> {
        let row = sqlx::query_as::<_, RouteRow>(
            r#"
            UPDATE routes
            SET name = COALESCE($2, name),
                driver_id = COALESCE($3, driver_id),
                driver_name = COALESCE($4, driver_name),
                vehicle_no = COALESCE($5, vehicle_no)
            WHERE id = $1
            RETURNING *
            "#,
        )
        .bind(id)
        .bind(&patch.name)
        .bind(patch.driver_id)
        .bind(&patch.driver_name)
        .bind(&patch.vehicle_no)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| AppError::Transport(format!("Error updating route: {}", e)))?;

        Ok(row.map(Route::from))
    }

    async fn delete_route(&self, id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM routes WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| AppError::Transport(format!("Error deleting route: {}", e)))?;

        Ok(result.rows_affected() > 0)
    }
}
