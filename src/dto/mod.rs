//! DTOs de la API HTTP

pub mod api_response;

pub use api_response::{ApiResponse, TenantQuery, TripScopeQuery};
