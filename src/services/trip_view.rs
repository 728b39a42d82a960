//! Vistas derivadas de un viaje
//!
//! Funciones puras de (Trip, Route): siguiente parada, posición del bus y
//! estado de cada parada para pintar la ruta.

use serde::Serialize;
use uuid::Uuid;

use crate::models::route::{Route, Stop};
use crate::models::trip::{Trip, TripStatus};

/// Estado de una parada respecto al índice del viaje
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StopDisplayStatus {
    Passed,
    Next,
    Upcoming,
}

/// Parada que sigue al índice actual; None si el bus está en la última
pub fn next_stop<'a>(trip: &Trip, route: &'a Route) -> Option<&'a Stop> {
    route.stop_at(trip.current_stop_index + 1)
}

/// Parada donde se pinta el bus. Antes de salir se usa la primera parada.
pub fn bus_position<'a>(trip: &Trip, route: &'a Route) -> Option<&'a Stop> {
    if trip.current_stop_index >= 0 {
        route.stop_at(trip.current_stop_index)
    } else {
        route.stops.first()
    }
}

pub fn stop_display_status(stop_index: usize, trip: &Trip) -> StopDisplayStatus {
    let index = stop_index as i64;
    let current = i64::from(trip.current_stop_index);

    if index <= current {
        StopDisplayStatus::Passed
    } else if index == current + 1 {
        StopDisplayStatus::Next
    } else {
        StopDisplayStatus::Upcoming
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct StopView {
    pub index: usize,
    #[serde(flatten)]
    pub stop: Stop,
    pub display_status: StopDisplayStatus,
}

/// Vista completa de un viaje para conductores, padres y alumnos
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TripView {
    pub trip_id: Uuid,
    pub route_id: Uuid,
    pub route_name: String,
    pub status: TripStatus,
    pub current_stop_index: i32,
    pub next_stop: Option<Stop>,
    pub bus_position: Option<Stop>,
    pub stops: Vec<StopView>,
}

impl TripView {
    pub fn build(trip: &Trip, route: &Route) -> Self {
        Self {
            trip_id: trip.id,
            route_id: route.id,
            route_name: route.name.clone(),
            status: trip.status,
            current_stop_index: trip.current_stop_index,
            next_stop: next_stop(trip, route).cloned(),
            bus_position: bus_position(trip, route).cloned(),
            stops: route
                .stops
                .iter()
                .enumerate()
                .map(|(index, stop)| StopView {
                    index,
                    stop: stop.clone(),
                    display_status: stop_display_status(index, trip),
                })
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::route::StopStatus;
    use crate::models::trip::NewTrip;
    use chrono::{NaiveDate, Utc};

    fn route(names: &[&str]) -> Route {
        Route {
            id: Uuid::new_v4(),
            tenant_id: Uuid::new_v4(),
            name: "R1".to_string(),
            driver_id: None,
            driver_name: None,
            vehicle_no: None,
            stops: names
                .iter()
                .enumerate()
                .map(|(i, n)| Stop {
                    id: format!("stop-{}", i),
                    name: n.to_string(),
                    lat: 12.97,
                    lng: 77.59,
                    arrival_time: "07:30".to_string(),
                    status: StopStatus::Pending,
                })
                .collect(),
            created_at: Utc::now(),
        }
    }

    fn trip_at(route: &Route, index: i32) -> Trip {
        let mut trip = NewTrip {
            route_id: route.id,
            driver_id: Uuid::new_v4(),
            tenant_id: route.tenant_id,
            trip_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        }
        .into_trip(Utc::now());
        trip.current_stop_index = index;
        trip
    }

    #[test]
    fn test_next_stop() {
        let r = route(&["Gate", "Park", "School"]);
        assert_eq!(next_stop(&trip_at(&r, -1), &r).map(|s| s.name.as_str()), Some("Gate"));
        assert_eq!(next_stop(&trip_at(&r, 1), &r).map(|s| s.name.as_str()), Some("School"));
        assert!(next_stop(&trip_at(&r, 2), &r).is_none());
    }

    #[test]
    fn test_bus_position_falls_back_to_first_stop() {
        let r = route(&["Gate", "Park"]);
        assert_eq!(bus_position(&trip_at(&r, -1), &r).map(|s| s.name.as_str()), Some("Gate"));
        assert_eq!(bus_position(&trip_at(&r, 1), &r).map(|s| s.name.as_str()), Some("Park"));

        let empty = route(&[]);
        assert!(bus_position(&trip_at(&empty, -1), &empty).is_none());
    }

    #[test]
    fn test_display_statuses() {
        let r = route(&["Gate", "Park", "School", "Library"]);
        let view = TripView::build(&trip_at(&r, 1), &r);
        let statuses: Vec<_> = view.stops.iter().map(|s| s.display_status).collect();
        assert_eq!(
            statuses,
            vec![
                StopDisplayStatus::Passed,
                StopDisplayStatus::Passed,
                StopDisplayStatus::Next,
                StopDisplayStatus::Upcoming,
            ]
        );
    }

    #[test]
    fn test_pre_departure_marks_first_stop_next() {
        let r = route(&["Gate", "Park"]);
        assert_eq!(stop_display_status(0, &trip_at(&r, -1)), StopDisplayStatus::Next);
        assert_eq!(stop_display_status(1, &trip_at(&r, -1)), StopDisplayStatus::Upcoming);
    }
}
