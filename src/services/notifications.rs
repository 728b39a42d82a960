//! Notificaciones
//!
//! - `StopAlertTracker`: decide, snapshot a snapshot, cuándo avisar a un
//!   padre de que el bus ha salido de una parada.
//! - `NotificationService`: notificaciones salientes por un
//!   `NotificationDispatcher` (webhook o log).

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lazy_static::lazy_static;
use regex::Regex;
use reqwest::Client;
use serde_json::json;
use tracing::{info, warn};
use uuid::Uuid;
use validator::Validate;

use crate::models::auth::Caller;
use crate::models::notification::{
    NotificationChannel, OutboundNotification, SendNotificationRequest, StopNotification,
};
use crate::models::route::Route;
use crate::models::trip::Trip;
use crate::services::audit_service::AuditTrail;
use crate::services::capabilities::{require, Action};
use crate::utils::errors::{validation_error, AppError, AppResult};

/// Topic por defecto de las notificaciones salientes
pub const DEFAULT_TOPIC: &str = "all_users";

lazy_static! {
    static ref WHITESPACE: Regex = Regex::new(r"\s+").expect("valid whitespace pattern");
}

/// Audiencia libre → topic: minúsculas y espacios colapsados en `_`
pub fn normalize_topic(audience: Option<&str>) -> String {
    match audience.map(str::trim).filter(|a| !a.is_empty()) {
        Some(audience) => WHITESPACE.replace_all(&audience.to_lowercase(), "_").into_owned(),
        None => DEFAULT_TOPIC.to_string(),
    }
}

/// Topic de los avisos de una ruta
pub fn route_topic(route_id: Uuid) -> String {
    format!("route_{}", route_id)
}

/// Aviso para el índice actual del viaje (la parada recién alcanzada)
pub fn stop_alert(trip: &Trip, route: &Route) -> Option<StopNotification> {
    if trip.route_id != route.id {
        return None;
    }
    let stop = route.stop_at(trip.current_stop_index)?;

    Some(StopNotification {
        trip_id: trip.id,
        route_id: route.id,
        stop_index: trip.current_stop_index,
        stop_id: stop.id.clone(),
        stop_name: stop.name.clone(),
        message: format!("Bus has departed {}", stop.name),
    })
}

/// Compara snapshots consecutivos de un mismo viaje.
///
/// Solo emite cuando el índice del mismo viaje crece estrictamente. El
/// primer snapshot y los de otro viaje fijan la línea base sin emitir.
/// Sin ruta resuelta el incremento queda pendiente hasta que llegue.
#[derive(Debug, Default)]
pub struct StopAlertTracker {
    last: Option<(Uuid, i32)>,
}

impl StopAlertTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn observe(&mut self, trip: Option<&Trip>, route: Option<&Route>) -> Option<StopNotification> {
        let trip = match trip {
            Some(trip) => trip,
            None => {
                self.last = None;
                return None;
            }
        };

        let previous = self.last.filter(|(trip_id, _)| *trip_id == trip.id);
        match previous {
            Some((_, index)) if trip.current_stop_index <= index => None,
            Some(_) => {
                let route = route?;
                self.last = Some((trip.id, trip.current_stop_index));
                stop_alert(trip, route)
            }
            None => {
                self.last = Some((trip.id, trip.current_stop_index));
                None
            }
        }
    }

    pub fn reset(&mut self) {
        self.last = None;
    }
}

/// Canal de entrega de notificaciones salientes
#[async_trait]
pub trait NotificationDispatcher: Send + Sync {
    async fn dispatch(&self, notification: &OutboundNotification) -> AppResult<()>;
}

/// Solo deja constancia en el log
pub struct LogDispatcher;

#[async_trait]
impl NotificationDispatcher for LogDispatcher {
    async fn dispatch(&self, notification: &OutboundNotification) -> AppResult<()> {
        info!(
            "📣 [{:?}] {} → {}: {}",
            notification.channel, notification.topic, notification.title, notification.message
        );
        Ok(())
    }
}

/// Envía cada notificación como JSON a un webhook
pub struct WebhookDispatcher {
    client: Client,
    url: String,
}

impl WebhookDispatcher {
    pub fn new(url: impl Into<String>, timeout: Duration) -> AppResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Internal(format!("Error building HTTP client: {}", e)))?;

        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

#[async_trait]
impl NotificationDispatcher for WebhookDispatcher {
    async fn dispatch(&self, notification: &OutboundNotification) -> AppResult<()> {
        let response = self
            .client
            .post(&self.url)
            .json(notification)
            .send()
            .await
            .map_err(|e| AppError::Transport(format!("Notification webhook failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(AppError::Transport(format!(
                "Notification webhook returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationService {
    dispatcher: Arc<dyn NotificationDispatcher>,
    audit: AuditTrail,
}

impl NotificationService {
    pub fn new(dispatcher: Arc<dyn NotificationDispatcher>, audit: AuditTrail) -> Self {
        Self { dispatcher, audit }
    }

    /// Notificación manual de un administrador
    pub async fn send(&self, caller: &Caller, request: SendNotificationRequest) -> AppResult<OutboundNotification> {
        require(caller, Action::SendNotifications)?;
        request.validate()?;

        let title = request.title.as_deref().map(str::trim).unwrap_or_default();
        let message = request.message.as_deref().map(str::trim).unwrap_or_default();
        if title.is_empty() || message.is_empty() {
            return Err(validation_error("title and message are required"));
        }

        let notification = OutboundNotification {
            title: title.to_string(),
            message: message.to_string(),
            channel: request.channel,
            topic: normalize_topic(request.audience.as_deref()),
            tenant_id: caller.tenant_id,
        };

        self.dispatcher.dispatch(&notification).await?;

        info!("📨 Notificación enviada a '{}' por {:?}", notification.topic, notification.channel);
        self.audit
            .record(
                caller,
                "send",
                "notification",
                None,
                json!({ "topic": notification.topic, "channel": notification.channel }),
            )
            .await;

        Ok(notification)
    }

    /// Reenvía un aviso de parada al topic de la ruta. Nunca falla.
    pub async fn forward_stop_alert(&self, tenant_id: Uuid, alert: &StopNotification) {
        let notification = OutboundNotification {
            title: "Bus update".to_string(),
            message: alert.message.clone(),
            channel: NotificationChannel::Push,
            topic: route_topic(alert.route_id),
            tenant_id: Some(tenant_id),
        };

        if let Err(e) = self.dispatcher.dispatch(&notification).await {
            warn!("⚠️ Aviso de parada no entregado para trip {}: {}", alert.trip_id, e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::route::{Stop, StopStatus};
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

    fn start(route: &Route) -> Trip {
        NewTrip {
            route_id: route.id,
            driver_id: Uuid::new_v4(),
            tenant_id: route.tenant_id,
            trip_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        }
        .into_trip(Utc::now())
    }

    #[test]
    fn test_normalize_topic() {
        assert_eq!(normalize_topic(Some("Grade 5  Parents")), "grade_5_parents");
        assert_eq!(normalize_topic(Some("  ")), DEFAULT_TOPIC);
        assert_eq!(normalize_topic(None), DEFAULT_TOPIC);
    }

    #[test]
    fn test_no_alert_on_first_snapshot() {
        let r = route(&["Gate", "Park"]);
        let trip = start(&r).advanced(2, None, Utc::now()).unwrap();
        let mut tracker = StopAlertTracker::new();
        assert!(tracker.observe(Some(&trip), Some(&r)).is_none());
    }

    #[test]
    fn test_one_alert_per_increment() {
        let r = route(&["Gate", "Park", "School"]);
        let mut tracker = StopAlertTracker::new();

        let t0 = start(&r);
        assert!(tracker.observe(Some(&t0), Some(&r)).is_none());

        let t1 = t0.advanced(3, None, Utc::now()).unwrap();
        let alert = tracker.observe(Some(&t1), Some(&r)).unwrap();
        assert_eq!(alert.stop_name, "Gate");
        assert_eq!(alert.message, "Bus has departed Gate");

        // Redelivery of the same snapshot
        assert!(tracker.observe(Some(&t1), Some(&r)).is_none());

        let t2 = t1.advanced(3, None, Utc::now()).unwrap();
        assert_eq!(tracker.observe(Some(&t2), Some(&r)).unwrap().stop_name, "Park");
    }

    #[test]
    fn test_skipped_indices_alert_once_for_latest_stop() {
        let r = route(&["Gate", "Park", "School"]);
        let mut tracker = StopAlertTracker::new();
        let t0 = start(&r);
        tracker.observe(Some(&t0), Some(&r));

        let t2 = t0
            .advanced(3, None, Utc::now())
            .unwrap()
            .advanced(3, None, Utc::now())
            .unwrap();
        assert_eq!(tracker.observe(Some(&t2), Some(&r)).unwrap().stop_name, "Park");
    }

    #[test]
    fn test_alert_waits_for_route() {
        let r = route(&["Gate", "Park", "School"]);
        let mut tracker = StopAlertTracker::new();

        let t0 = start(&r);
        assert!(tracker.observe(Some(&t0), Some(&r)).is_none());

        let t1 = t0.advanced(3, None, Utc::now()).unwrap();
        assert!(tracker.observe(Some(&t1), None).is_none());

        let t2 = t1.advanced(3, None, Utc::now()).unwrap();
        let alert = tracker.observe(Some(&t2), Some(&r)).unwrap();
        assert_eq!(alert.stop_name, "Park");
        assert_eq!(alert.stop_index, 1);
    }

    #[test]
    fn test_unrelated_route_never_alerts() {
        let mine = route(&["Gate", "Park"]);
        let other = route(&["Mall", "Lake"]);
        let mut tracker = StopAlertTracker::new();

        let t0 = start(&other);
        tracker.observe(Some(&t0), Some(&mine));
        let t1 = t0.advanced(2, None, Utc::now()).unwrap();
        assert!(tracker.observe(Some(&t1), Some(&mine)).is_none());
    }

    #[derive(Default)]
    struct Recorder {
        sent: std::sync::Mutex<Vec<OutboundNotification>>,
    }

    #[async_trait]
    impl NotificationDispatcher for Recorder {
        async fn dispatch(&self, notification: &OutboundNotification) -> AppResult<()> {
            self.sent.lock().unwrap().push(notification.clone());
            Ok(())
        }
    }

    fn service(recorder: Arc<Recorder>) -> NotificationService {
        let store = Arc::new(crate::repositories::MemoryStore::new());
        NotificationService::new(recorder, AuditTrail::new(store))
    }

    fn request(title: Option<&str>, message: Option<&str>) -> SendNotificationRequest {
        SendNotificationRequest {
            title: title.map(str::to_string),
            message: message.map(str::to_string),
            channel: NotificationChannel::Sms,
            audience: Some("Route 7 Parents".to_string()),
        }
    }

    #[tokio::test]
    async fn test_send_requires_title_and_message() {
        let recorder = Arc::new(Recorder::default());
        let notifications = service(recorder.clone());
        let admin = Caller::new(Uuid::new_v4(), crate::models::auth::UserRole::Admin, Some(Uuid::new_v4()));

        let err = notifications.send(&admin, request(Some("Delay"), Some("  "))).await.unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        let sent = notifications
            .send(&admin, request(Some("Delay"), Some("Bus is 10 minutes late")))
            .await
            .unwrap();
        assert_eq!(sent.topic, "route_7_parents");
        assert_eq!(recorder.sent.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_parents_cannot_send() {
        let notifications = service(Arc::new(Recorder::default()));
        let parent = Caller::new(Uuid::new_v4(), crate::models::auth::UserRole::Parent, Some(Uuid::new_v4()));

        let err = notifications.send(&parent, request(Some("Hi"), Some("Hello"))).await.unwrap_err();
        assert!(matches!(err, AppError::Forbidden(_)));
    }

    #[tokio::test]
    async fn test_stop_alert_goes_to_route_topic() {
        let recorder = Arc::new(Recorder::default());
        let notifications = service(recorder.clone());
        let r = route(&["Gate", "Park"]);
        let trip = start(&r).advanced(2, None, Utc::now()).unwrap();

        let alert = stop_alert(&trip, &r).unwrap();
        notifications.forward_stop_alert(r.tenant_id, &alert).await;

        let sent = recorder.sent.lock().unwrap();
        assert_eq!(sent[0].topic, format!("route_{}", r.id));
        assert_eq!(sent[0].channel, NotificationChannel::Push);
        assert_eq!(sent[0].message, "Bus has departed Gate");
    }

    #[test]
    fn test_new_trip_resets_baseline() {
        let r = route(&["Gate", "Park"]);
        let mut tracker = StopAlertTracker::new();

        let first = start(&r).advanced(2, None, Utc::now()).unwrap();
        tracker.observe(Some(&first), Some(&r));
        tracker.observe(None, Some(&r));

        let second = start(&r).advanced(2, None, Utc::now()).unwrap();
        assert!(tracker.observe(Some(&second), Some(&r)).is_none());
    }
}
