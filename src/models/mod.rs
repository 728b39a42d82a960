//! Modelos del sistema
//!
//! Este módulo contiene todos los modelos de datos del dominio de
//! transporte escolar.

pub mod audit;
pub mod auth;
pub mod notification;
pub mod route;
pub mod school;
pub mod trip;
pub mod user;

pub use auth::{Caller, UserRole};
pub use route::{Route, Stop, StopStatus};
pub use trip::{Trip, TripStatus};
