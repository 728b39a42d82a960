use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use sqlx::PgPool;
use uuid::Uuid;

use super::{TripScope, TripStore};
use crate::models::trip::{Trip, TripStatus};
use crate::utils::errors::{AppError, AppResult};

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Debug, sqlx::FromRow)]
struct TripRow {
    id: Uuid,
    route_id: Uuid,
    driver_id: Uuid,
    tenant_id: Uuid,
    trip_date: NaiveDate,
    status: String,
    current_stop_index: i32,
    version: i64,
    started_at: DateTime<Utc>,
    last_updated: DateTime<Utc>,
}

impl TryFrom<TripRow> for Trip {
    type Error = AppError;

    fn try_from(row: TripRow) -> Result<Self, Self::Error> {
        let status = TripStatus::from_str(&row.status).ok_or_else(|| {
            AppError::Transport(format!("trip '{}' has unknown status '{}'", row.id, row.status))
        })?;

        Ok(Self {
            id: row.id,
            route_id: row.route_id,
            driver_id: row.driver_id,
            tenant_id: row.tenant_id,
            trip_date: row.trip_date,
            status,
            current_stop_index: row.current_stop_index,
            version: row.version,
            started_at: row.started_at,
            last_updated: row.last_updated,
        })
    }
}

pub struct PgTripRepository {
    pool: PgPool,
}

impl PgTripRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TripStore for PgTripRepository {
    async fn insert_active_trip(&self, trip: &Trip) -> AppResult<()> {
        // El índice parcial trips_one_active_per_driver_day cierra la carrera
        let result = sqlx::query(
            r#"
            INSERT INTO trips (id, route_id, driver_id, tenant_id, trip_date, status, current_stop_index, version, started_at, last_updated)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            "#,
        )
        .bind(trip.id)
        .bind(trip.route_id)
        .bind(trip.driver_id)
        .bind(trip.tenant_id)
        .bind(trip.trip_date)
        .bind(trip.status.as_str())
        .bind(trip.current_stop_index)
        .bind(trip.version)
        .bind(trip.started_at)
        .bind(trip.last_updated)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.code().as_deref() == Some(UNIQUE_VIOLATION) => {
                Err(AppError::Conflict(format!(
                    "driver '{}' already has an active trip on {}",
                    trip.driver_id, trip.trip_date
                )))
            }
            Err(e) => Err(AppError::Transport(format!("Error starting trip: {}", e))),
        }
    }

    async fn find_trip(&self, id: Uuid) -> AppResult<Option<Trip>> {
        let row = sqlx::query_as::<_, TripRow>("SELECT * FROM trips WHERE id = $1")
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Transport(format!("Error finding trip: {}", e)))?;

        row.map(Trip::try_from).transpose()
    }

    async fn find_active_trip(&self, tenant_id: Uuid, scope: TripScope) -> AppResult<Option<Trip>> {
        let (column, value) = match scope {
            TripScope::Route(id) => ("route_id", id),
            TripScope::Driver(id) => ("driver_id", id),
        };

        let sql = format!(
            "SELECT * FROM trips WHERE tenant_id = $1 AND {} = $2 AND status = 'active' \
             ORDER BY started_at DESC LIMIT 1",
            column
        );

        let row = sqlx::query_as::<_, TripRow>(&sql)
            .bind(tenant_id)
            .bind(value)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| AppError::Transport(format!("Error finding active trip: {}", e)))?;

        row.map(Trip::try_from).transpose()
    }

    async fn replace_trip(&self, next: &Trip, expected_version: i64) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE trips
            SET status = $2, current_stop_index = $3, version = $4, last_updated = $5
            WHERE id = $1 AND version = $6
            "#,
        )
        .bind(next.id)
        .bind(next.status.as_str())
        .bind(next.current_stop_index)
        .bind(next.version)
        .bind(next.last_updated)
        .bind(expected_version)
        .execute(&self.pool)
        .await
        .map_err(|e| AppError::Transport(format!("Error updating trip: {}", e)))?;

        Ok(result.rows_affected() == 1)
    }
}
