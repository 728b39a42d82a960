//! Services module
//!
//! Este módulo contiene la lógica de negocio de transporte escolar. Cada
//! operación recibe explícitamente la identidad del llamante (`Caller`).

pub mod audit_service;
pub mod auth_service;
pub mod capabilities;
pub mod jwt_service;
pub mod live_feed;
pub mod live_view;
pub mod notifications;
pub mod provisioning;
pub mod route_registry;
pub mod school_service;
pub mod trip_tracker;
pub mod trip_view;

pub use audit_service::AuditTrail;
pub use auth_service::AuthService;
pub use jwt_service::{JwtConfig, JwtService};
pub use live_feed::{FeedEvent, TripHub, TripSubscription};
pub use live_view::{TripWatcher, WatchUpdate};
pub use notifications::{LogDispatcher, NotificationDispatcher, NotificationService, WebhookDispatcher};
pub use provisioning::UserProvisioning;
pub use route_registry::RouteRegistry;
pub use school_service::SchoolService;
pub use trip_tracker::TripTracker;
pub use trip_view::TripView;
