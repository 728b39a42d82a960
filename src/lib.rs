//! Schools24 transport backend
//!
//! Seguimiento en vivo de viajes de autobús escolar: registro de rutas,
//! máquina de estados del viaje, suscriptores en vivo y avisos de parada.

pub mod config;
pub mod database;
pub mod dto;
pub mod middleware;
pub mod models;
pub mod repositories;
pub mod routes;
pub mod services;
pub mod state;
pub mod utils;

pub use routes::create_app;
pub use state::{AppState, Stores};
