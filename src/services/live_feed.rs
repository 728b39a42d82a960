//! Suscripciones en vivo al viaje activo
//!
//! `TripHub` difunde cada estado de viaje confirmado a todos los
//! suscriptores. Una versión igual o anterior a la última publicada para
//! el mismo viaje se descarta, así el orden observado es el de commit.
//!
//! Cada `TripSubscription` entrega primero un snapshot inicial y después
//! un evento por cambio observado. Si el suscriptor se queda atrás solo ve
//! el último estado (los intermedios pueden perderse). Se cancela al
//! soltarla.
//!
//! El registro de versiones publicadas solo guarda viajes activos de ayer
//! en adelante; los viajes nunca completados no se acumulan.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{Duration, NaiveDate, Utc};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, warn};
use uuid::Uuid;

use crate::models::trip::Trip;
use crate::repositories::{TripScope, TripStore};

/// Evento entregado a un suscriptor
#[derive(Debug, Clone, PartialEq)]
pub enum FeedEvent {
    /// Estado actual del viaje observado; `None` si no hay viaje activo
    Snapshot(Option<Trip>),
    /// El almacenamiento falló; la vista debe mostrarse degradada
    Degraded(String),
}

pub struct TripHub {
    sender: broadcast::Sender<Trip>,
    /// Última versión publicada por viaje activo, con su fecha
    published: Mutex<HashMap<Uuid, (i64, NaiveDate)>>,
    trips: Arc<dyn TripStore>,
}

impl TripHub {
    pub fn new(trips: Arc<dyn TripStore>, capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            published: Mutex::new(HashMap::new()),
            trips,
        }
    }

    /// Publica un estado ya confirmado. Devuelve false si era obsoleto.
    pub fn publish(&self, trip: &Trip) -> bool {
        let mut published = self.published.lock().unwrap_or_else(PoisonError::into_inner);

        if let Some(&(version, _)) = published.get(&trip.id) {
            if version >= trip.version {
                debug!("⏭️ Snapshot obsoleto descartado: trip {} v{}", trip.id, trip.version);
                return false;
            }
        }

        // Viajes de días pasados que nadie completó
        let cutoff = Utc::now().date_naive() - Duration::days(1);
        published.retain(|id, (_, date)| *id == trip.id || *date >= cutoff);

        if trip.is_active() {
            published.insert(trip.id, (trip.version, trip.trip_date));
        } else {
            published.remove(&trip.id);
        }

        // El envío ocurre con el lock tomado para conservar el orden de commit
        let receivers = self.sender.send(trip.clone()).unwrap_or(0);
        debug!(
            "📡 Trip {} v{} (índice {}) publicado a {} suscriptores",
            trip.id, trip.version, trip.current_stop_index, receivers
        );
        true
    }

    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Viajes cuya última versión publicada sigue registrada
    pub fn tracked_trips(&self) -> usize {
        self.published.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    /// Abre una suscripción al viaje activo que cumple `scope` en el tenant
    pub async fn subscribe(&self, tenant_id: Uuid, scope: TripScope) -> TripSubscription {
        // Recibir antes de leer: ningún commit posterior a la lectura se pierde
        let receiver = self.sender.subscribe();
        let mut subscription = TripSubscription {
            receiver,
            trips: self.trips.clone(),
            tenant_id,
            scope,
            current: None,
            initial: None,
        };

        subscription.initial = Some(match self.trips.find_active_trip(tenant_id, scope).await {
            Ok(trip) => {
                subscription.current = trip.clone();
                FeedEvent::Snapshot(trip)
            }
            Err(e) => {
                warn!("⚠️ Snapshot inicial no disponible para {:?}: {}", scope, e);
                FeedEvent::Degraded(e.to_string())
            }
        });

        debug!("👀 Nueva suscripción {:?} en {}", scope, tenant_id);
        subscription
    }
}

pub struct TripSubscription {
    receiver: broadcast::Receiver<Trip>,
    trips: Arc<dyn TripStore>,
    tenant_id: Uuid,
    scope: TripScope,
    current: Option<Trip>,
    initial: Option<FeedEvent>,
}

impl TripSubscription {
    pub fn scope(&self) -> TripScope {
        self.scope
    }

    pub fn current(&self) -> Option<&Trip> {
        self.current.as_ref()
    }

    /// Siguiente evento. Solo devuelve `None` si el hub se ha cerrado.
    pub async fn next(&mut self) -> Option<FeedEvent> {
        if let Some(event) = self.initial.take() {
            return Some(event);
        }

        loop {
            match self.receiver.recv().await {
                Ok(trip) => {
                    if trip.tenant_id != self.tenant_id || !self.scope.matches(&trip) {
                        continue;
                    }
                    if let Some(event) = self.apply(trip).await {
                        return Some(event);
                    }
                }
                Err(RecvError::Lagged(skipped)) => {
                    warn!("🐢 Suscripción {:?} retrasada, {} eventos omitidos", self.scope, skipped);
                    if let Some(event) = self.refresh().await {
                        return Some(event);
                    }
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }

    /// Cancela la suscripción
    pub fn unsubscribe(self) {
        debug!("👋 Suscripción {:?} cancelada", self.scope);
    }

    pub fn into_stream(self) -> impl Stream<Item = FeedEvent> + Send {
        stream::unfold(self, |mut subscription| async move {
            subscription.next().await.map(|event| (event, subscription))
        })
    }

    async fn apply(&mut self, trip: Trip) -> Option<FeedEvent> {
        let current_version = match &self.current {
            Some(current) if current.id == trip.id => current.version,
            // Otro viaje del mismo ámbito: el almacenamiento decide cuál es el activo
            _ => return self.refresh().await,
        };

        if trip.version <= current_version {
            return None;
        }

        if trip.is_active() {
            self.current = Some(trip.clone());
            Some(FeedEvent::Snapshot(Some(trip)))
        } else {
            self.current = None;
            Some(FeedEvent::Snapshot(None))
        }
    }

    async fn refresh(&mut self) -> Option<FeedEvent> {
        let latest = match self.trips.find_active_trip(self.tenant_id, self.scope).await {
            Ok(latest) => latest,
            Err(e) => {
                warn!("⚠️ Suscripción {:?} degradada: {}", self.scope, e);
                return Some(FeedEvent::Degraded(e.to_string()));
            }
        };

        let unchanged = match (&self.current, &latest) {
            (None, None) => true,
            (Some(a), Some(b)) => a.id == b.id && b.version <= a.version,
            _ => false,
        };
        if unchanged {
            return None;
        }

        self.current = latest.clone();
        Some(FeedEvent::Snapshot(latest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::trip::NewTrip;
    use crate::repositories::MemoryStore;
    use tokio::time::timeout;

    fn new_trip(tenant_id: Uuid) -> Trip {
        NewTrip {
            route_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            tenant_id,
            trip_date: NaiveDate::from_ymd_opt(2024, 6, 3).unwrap(),
        }
        .into_trip(Utc::now())
    }

    #[test]
    fn test_publish_drops_stale_versions() {
        let hub = TripHub::new(Arc::new(MemoryStore::new()), 16);
        let trip = new_trip(Uuid::new_v4());
        let next = trip.advanced(3, None, Utc::now()).unwrap();

        assert!(hub.publish(&next));
        assert!(!hub.publish(&trip));
        assert!(!hub.publish(&next));
    }

    #[tokio::test]
    async fn test_initial_snapshot_then_updates() {
        let store = Arc::new(MemoryStore::new());
        let hub = TripHub::new(store.clone(), 16);
        let tenant = Uuid::new_v4();
        let trip = new_trip(tenant);
        store.insert_active_trip(&trip).await.unwrap();

        let mut sub = hub.subscribe(tenant, TripScope::Route(trip.route_id)).await;
        assert_eq!(sub.next().await, Some(FeedEvent::Snapshot(Some(trip.clone()))));

        let next = trip.advanced(3, None, Utc::now()).unwrap();
        store.replace_trip(&next, trip.version).await.unwrap();
        hub.publish(&next);

        assert_eq!(sub.next().await, Some(FeedEvent::Snapshot(Some(next))));
    }

    #[tokio::test]
    async fn test_other_scopes_are_filtered() {
        let store = Arc::new(MemoryStore::new());
        let hub = TripHub::new(store.clone(), 16);
        let tenant = Uuid::new_v4();
        let mine = new_trip(tenant);
        let other = new_trip(tenant);

        let mut sub = hub.subscribe(tenant, TripScope::Driver(mine.driver_id)).await;
        assert_eq!(sub.next().await, Some(FeedEvent::Snapshot(None)));

        hub.publish(&other);
        let waited = timeout(std::time::Duration::from_millis(50), sub.next()).await;
        assert!(waited.is_err());
    }

    #[tokio::test]
    async fn test_completion_clears_snapshot() {
        let store = Arc::new(MemoryStore::new());
        let hub = TripHub::new(store.clone(), 16);
        let tenant = Uuid::new_v4();
        let trip = new_trip(tenant);
        store.insert_active_trip(&trip).await.unwrap();

        let mut sub = hub.subscribe(tenant, TripScope::Driver(trip.driver_id)).await;
        sub.next().await;

        let done = trip.completed(Utc::now()).unwrap();
        store.replace_trip(&done, trip.version).await.unwrap();
        hub.publish(&done);

        assert_eq!(sub.next().await, Some(FeedEvent::Snapshot(None)));
    }

    #[tokio::test]
    async fn test_offline_store_degrades_initial_snapshot() {
        let store = Arc::new(MemoryStore::new());
        store.set_offline(true);
        let hub = TripHub::new(store.clone(), 16);

        let mut sub = hub.subscribe(Uuid::new_v4(), TripScope::Route(Uuid::new_v4())).await;
        assert!(matches!(sub.next().await, Some(FeedEvent::Degraded(_))));
    }

    #[tokio::test]
    async fn test_lagging_subscriber_still_sees_final_state() {
        let store = Arc::new(MemoryStore::new());
        let hub = TripHub::new(store.clone(), 1);
        let tenant = Uuid::new_v4();
        let mut trip = new_trip(tenant);
        store.insert_active_trip(&trip).await.unwrap();

        let mut sub = hub.subscribe(tenant, TripScope::Route(trip.route_id)).await;
        assert_eq!(sub.next().await, Some(FeedEvent::Snapshot(Some(trip.clone()))));

        for _ in 0..4 {
            let next = trip.advanced(5, None, Utc::now()).unwrap();
            assert!(store.replace_trip(&next, trip.version).await.unwrap());
            hub.publish(&next);
            trip = next;
        }

        match sub.next().await {
            Some(FeedEvent::Snapshot(Some(latest))) => {
                assert_eq!(latest.current_stop_index, 3);
                assert_eq!(latest.version, trip.version);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[test]
    fn test_published_versions_forget_past_days() {
        let hub = TripHub::new(Arc::new(MemoryStore::new()), 16);
        let tenant = Uuid::new_v4();

        let abandoned = new_trip(tenant);
        assert!(hub.publish(&abandoned));
        assert_eq!(hub.tracked_trips(), 1);

        let today = NewTrip {
            route_id: Uuid::new_v4(),
            driver_id: Uuid::new_v4(),
            tenant_id: tenant,
            trip_date: Utc::now().date_naive(),
        }
        .into_trip(Utc::now());
        assert!(hub.publish(&today));
        assert_eq!(hub.tracked_trips(), 1);

        let done = today.completed(Utc::now()).unwrap();
        assert!(hub.publish(&done));
        assert_eq!(hub.tracked_trips(), 0);
    }

    #[tokio::test]
    async fn test_dropping_subscription_releases_receiver() {
        let hub = TripHub::new(Arc::new(MemoryStore::new()), 16);
        let sub = hub.subscribe(Uuid::new_v4(), TripScope::Route(Uuid::new_v4())).await;
        assert_eq!(hub.subscriber_count(), 1);
        sub.unsubscribe();
        assert_eq!(hub.subscriber_count(), 0);
    }
}
