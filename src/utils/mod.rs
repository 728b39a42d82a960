//! Utilidades del sistema
//!
//! Este módulo contiene utilidades para manejo de errores, validación
//! y plazos de las mutaciones.

pub mod errors;
pub mod validation;
pub mod deadline;

pub use errors::{AppError, AppResult};
