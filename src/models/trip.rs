//! Modelo de Trip
//!
//! Un viaje es un recorrido fechado de una ruta por un conductor. El índice
//! de progresión arranca en -1 (antes de la primera parada) y solo avanza de
//! uno en uno. Las transiciones puras viven aquí; el almacenamiento solo
//! aplica el resultado con una escritura condicional sobre `version`.

use serde::{Deserialize, Serialize};
use chrono::{DateTime, NaiveDate, Utc};
use uuid::Uuid;

use crate::utils::errors::{AppError, AppResult};

/// Índice de un viaje que aún no ha llegado a ninguna parada
pub const PRE_DEPARTURE_INDEX: i32 = -1;

/// Estado del viaje
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TripStatus {
    Active,
    Completed,
}

impl TripStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            TripStatus::Active => "active",
            TripStatus::Completed => "completed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "active" => Some(TripStatus::Active),
            "completed" => Some(TripStatus::Completed),
            _ => None,
        }
    }
}

/// Trip principal
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Trip {
    pub id: Uuid,
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub tenant_id: Uuid,
    pub trip_date: NaiveDate,
    pub status: TripStatus,
    pub current_stop_index: i32,
    /// Se incrementa en cada escritura; ordena los snapshots publicados
    pub version: i64,
    pub started_at: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

/// Datos para insertar un viaje nuevo
#[derive(Debug, Clone)]
pub struct NewTrip {
    pub route_id: Uuid,
    pub driver_id: Uuid,
    pub tenant_id: Uuid,
    pub trip_date: NaiveDate,
}

impl NewTrip {
    pub fn into_trip(self, now: DateTime<Utc>) -> Trip {
        Trip {
            id: Uuid::new_v4(),
            route_id: self.route_id,
            driver_id: self.driver_id,
            tenant_id: self.tenant_id,
            trip_date: self.trip_date,
            status: TripStatus::Active,
            current_stop_index: PRE_DEPARTURE_INDEX,
            version: 1,
            started_at: now,
            last_updated: now,
        }
    }
}

impl Trip {
    pub fn is_active(&self) -> bool {
        self.status == TripStatus::Active
    }

    /// `InvalidState` si el viaje ya no admite transiciones
    pub fn ensure_active(&self, transition: &str) -> AppResult<()> {
        if self.is_active() {
            return Ok(());
        }
        Err(AppError::InvalidState(format!(
            "trip '{}' is {} and cannot {}",
            self.id,
            self.status.as_str(),
            transition
        )))
    }

    /// Siguiente estado tras avanzar una parada.
    ///
    /// Orden de comprobación: estado, índice esperado, límites de la ruta.
    pub fn advanced(
        &self,
        stop_count: usize,
        expected_index: Option<i32>,
        now: DateTime<Utc>,
    ) -> AppResult<Trip> {
        self.ensure_active("advance")?;

        if let Some(expected) = expected_index {
            if expected != self.current_stop_index {
                return Err(AppError::Conflict(format!(
                    "trip '{}' is at stop index {}, expected {}",
                    self.id, self.current_stop_index, expected
                )));
            }
        }

        let next = self.current_stop_index + 1;
        let last = stop_count as i64 - 1;
        if i64::from(next) > last {
            return Err(AppError::OutOfRange(format!(
                "stop index {} exceeds the last stop index {} of route '{}'",
                next, last, self.route_id
            )));
        }

        Ok(Trip {
            current_stop_index: next,
            version: self.version + 1,
            last_updated: now,
            ..self.clone()
        })
    }

    /// Siguiente estado tras completar el viaje; el índice se conserva
    pub fn completed(&self, now: DateTime<Utc>) -> AppResult<Trip> {
        self.ensure_active("complete")?;

        Ok(Trip {
            status: TripStatus::Completed,
            version: self.version + 1,
            last_updated: now,
            ..self.clone()
        })
    }
}

/// Request para iniciar un viaje
#[derive(Debug, Clone, Deserialize)]
pub struct StartTripRequest {
    pub route_id: Uuid,
    /// Día de operación; por defecto la fecha UTC actual
    pub date: Option<NaiveDate>,
}

/// Request para avanzar una parada
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AdvanceStopRequest {
    /// Índice que el conductor ve en pantalla; protege contra doble click
    pub expected_index: Option<i32>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fresh_trip() -> Trip {
        NewTrip {
            route_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            trip_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        }
        .into_trip(Utc::now())
    }

    #[test]
    fn test_new_trip_starts_before_first_stop() {
        let trip = fresh_trip();
        assert_eq!(trip.current_stop_index, PRE_DEPARTURE_INDEX);
        assert_eq!(trip.status, TripStatus::Active);
        assert_eq!(trip.version, 1);
    }

    #[test]
    fn test_advance_increments_by_one() {
        let trip = fresh_trip();
        let next = trip.advanced(3, None, Utc::now()).unwrap();
        assert_eq!(next.current_stop_index, 0);
        assert_eq!(next.version, 2);
        let next = next.advanced(3, Some(0), Utc::now()).unwrap();
        assert_eq!(next.current_stop_index, 1);
    }

    #[test]
    fn test_advance_rejects_past_last_stop() {
        let mut trip = fresh_trip();
        for _ in 0..3 {
            trip = trip.advanced(3, None, Utc::now()).unwrap();
        }
        assert_eq!(trip.current_stop_index, 2);
        let err = trip.advanced(3, None, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::OutOfRange(_)));
    }

    #[test]
    fn test_advance_on_empty_route_is_out_of_range() {
        let err = fresh_trip().advanced(0, None, Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::OutOfRange(_)));
    }

    #[test]
    fn test_stale_expected_index_conflicts() {
        let trip = fresh_trip().advanced(3, None, Utc::now()).unwrap();
        let err = trip.advanced(3, Some(-1), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_completed_trip_cannot_advance_or_complete() {
        let trip = fresh_trip()
            .advanced(3, None, Utc::now())
            .unwrap()
            .completed(Utc::now())
            .unwrap();
        assert_eq!(trip.current_stop_index, 0);
        assert!(matches!(
            trip.advanced(3, None, Utc::now()).unwrap_err(),
            AppError::InvalidState(_)
        ));
        assert!(matches!(
            trip.completed(Utc::now()).unwrap_err(),
            AppError::InvalidState(_)
        ));
    }

    #[test]
    fn test_invalid_state_checked_before_expected_index() {
        let trip = fresh_trip().completed(Utc::now()).unwrap();
        let err = trip.advanced(3, Some(5), Utc::now()).unwrap_err();
        assert!(matches!(err, AppError::InvalidState(_)));
    }
}
