//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// Per-client session handling. The transport layer (socket server, test
// harness) owns the wire; it opens a `Session` per client, feeds inbound
// frames through it and drains the outbound channel back to the client.
// The session routes each inbound event into the matching service and
// tracks the identity announced on it.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::SessionError;
use crate::domain::models::events::{InboundEvent, OutboundEvent};
use crate::domain::models::types::ParticipantId;
use crate::domain::services::connections::{Connection, ConnectionRegistry};
use crate::domain::services::discovery::RiderDiscovery;
use crate::domain::services::dispatch::DispatchEngine;
use crate::domain::services::lifecycle::LifecycleController;
use crate::domain::services::relay::ResponseRelay;

/// +----------------------------------------------------------------------+
/// | SessionHandler                                                       |
/// +----------------------------------------------------------------------+
/// | Shared entry point of the inbound side. Holds the services every    |
/// | session routes into and opens one `Session` per connected client.   |
/// +----------------------------------------------------------------------+
pub struct SessionHandler {
    connections: ConnectionRegistry,
    discovery: Arc<RiderDiscovery>,
    dispatch: Arc<DispatchEngine>,
    relay: Arc<ResponseRelay>,
    lifecycle: Arc<LifecycleController>,
}

impl SessionHandler {
    pub fn new(
        connections: ConnectionRegistry,
        discovery: Arc<RiderDiscovery>,
        dispatch: Arc<DispatchEngine>,
        relay: Arc<ResponseRelay>,
        lifecycle: Arc<LifecycleController>,
    ) -> Arc<Self> {
        Arc::new(Self {
            connections,
            discovery,
            dispatch,
            relay,
            lifecycle,
        })
    }

    /// Opens a session for one connected client. `sender` is the outbound
    /// half of the client's channel; it is registered once the client
    /// announces its identity.
    pub fn open(self: &Arc<Self>, sender: UnboundedSender<OutboundEvent>) -> Session {
        Session {
            handler: Arc::clone(self),
            session_id: Uuid::new_v4(),
            identity: None,
            sender,
        }
    }
}

/// One client's duplex session.
///
/// Events that require an identity (`arrived`) fail with `NotIdentified`
/// until the client has announced one. A `disconnect` removes the
/// identity mapping, but only if this session still owns it.
pub struct Session {
    handler: Arc<SessionHandler>,
    session_id: Uuid,
    identity: Option<ParticipantId>,
    sender: UnboundedSender<OutboundEvent>,
}

impl Session {
    pub fn session_id(&self) -> Uuid {
        self.session_id
    }

    pub fn identity(&self) -> Option<ParticipantId> {
        self.identity
    }

    /// Decodes and handles one raw client frame.
    pub async fn handle_frame(&mut self, raw: &[u8]) -> Result<(), SessionError> {
        let event = serde_json::from_slice::<InboundEvent>(raw)?;
        self.handle(event).await
    }

    /// Routes one inbound event into the dispatch services.
    ///
    /// # Errors
    /// Infrastructure failures surface as errors for the transport layer
    /// to log; conditions the client cannot act on (no rider available)
    /// are logged here and swallowed.
    pub async fn handle(&mut self, event: InboundEvent) -> Result<(), SessionError> {
        match event {
            InboundEvent::RiderId { rider_id } => {
                self.identify(rider_id);
                Ok(())
            }
            InboundEvent::CustomerId { customer_id } => {
                self.identify(customer_id);
                Ok(())
            }
            InboundEvent::PackageRequest(request) => {
                match self.handler.discovery.find_rider(request.customer_id).await {
                    Ok(record) => debug!(
                        "matched rider {} for delivery {}",
                        record.rider_id, request.delivery_id
                    ),
                    Err(e) if e.is_not_found() => {
                        warn!(
                            "no rider for delivery {}: {}, dropping request",
                            request.delivery_id, e
                        );
                        return Ok(());
                    }
                    Err(e) => return Err(e.into()),
                }
                self.handler.dispatch.submit_package_request(request).await?;
                Ok(())
            }
            InboundEvent::DriverResponse(response) => {
                self.handler.relay.send_driver_response(&response)?;
                Ok(())
            }
            InboundEvent::Arrived { customer_id } => {
                let rider_id = self.identity.ok_or(SessionError::NotIdentified)?;
                self.handler.connections.send(
                    &customer_id,
                    OutboundEvent::RiderArrivalNotification { rider_id },
                );
                Ok(())
            }
            InboundEvent::StartDelivery { delivery_id } => {
                self.handler.lifecycle.start_delivery(delivery_id).await?;
                Ok(())
            }
            InboundEvent::EndDelivery { delivery_id } => {
                self.handler.lifecycle.end_delivery(delivery_id).await?;
                Ok(())
            }
            InboundEvent::NotificationAck => {
                debug!("session {} acknowledged dispatch offer", self.session_id);
                Ok(())
            }
            InboundEvent::RiderResponseNotificationAck => {
                debug!(
                    "session {} acknowledged rider response relay",
                    self.session_id
                );
                Ok(())
            }
            InboundEvent::Disconnect => {
                self.close();
                Ok(())
            }
        }
    }

    /// Binds an identity to this session and registers its connection.
    /// A repeated announcement simply re-registers.
    fn identify(&mut self, identity: ParticipantId) {
        self.identity = Some(identity);
        self.handler.connections.register(
            identity,
            Connection::new(self.session_id, self.sender.clone()),
        );
        info!("session {} identified as {}", self.session_id, identity);
    }

    /// Removes this session's identity mapping. Safe to call more than
    /// once; the transport layer also calls it when the socket drops
    /// without a disconnect frame.
    pub fn close(&mut self) {
        if let Some(identity) = self.identity.take() {
            if self
                .handler
                .connections
                .remove_session(&identity, self.session_id)
            {
                info!("session {} for {} closed", self.session_id, identity);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::events::{DriverResponse, PackageRequest};
    use crate::domain::models::types::{
        Delivery, DeliveryStatus, GeoPoint, Rider, RiderLocation, RiderStatus, Vehicle,
        VehicleKind,
    };
    use crate::domain::models::events::AssignedPackage;
    use crate::domain::services::dispatch::{ClaimRegistry, DispatchError, DispatchPublisher};
    use crate::domain::services::match_cache::InMemoryMatchCache;
    use crate::domain::services::relay::{RelayError, ResponsePublisher};
    use crate::outbounds::memory::InMemoryPersistence;
    use crate::outbounds::persistence::{
        DeliveryStore, RiderLocationStore, RiderStore, VehicleStore,
    };
    use chrono::Utc;
    use parking_lot::Mutex;
    use rust_decimal_macros::dec;
    use tokio::sync::mpsc;

    #[derive(Default)]
    struct RecordingBus {
        requests: Mutex<Vec<PackageRequest>>,
        assignments: Mutex<Vec<AssignedPackage>>,
        responses: Mutex<Vec<DriverResponse>>,
    }

    impl DispatchPublisher for RecordingBus {
        fn publish_package_request(
            &self,
            request: &PackageRequest,
            _ttl_ms: u64,
        ) -> Result<(), DispatchError> {
            self.requests.lock().push(request.clone());
            Ok(())
        }

        fn publish_assignment(&self, assigned: &AssignedPackage) -> Result<(), DispatchError> {
            self.assignments.lock().push(assigned.clone());
            Ok(())
        }
    }

    impl ResponsePublisher for RecordingBus {
        fn publish_driver_response(&self, response: &DriverResponse) -> Result<(), RelayError> {
            self.responses.lock().push(response.clone());
            Ok(())
        }
    }

    struct World {
        handler: Arc<SessionHandler>,
        connections: ConnectionRegistry,
        stores: Arc<InMemoryPersistence>,
        bus: Arc<RecordingBus>,
        delivery_id: Uuid,
        rider_id: Uuid,
        customer_id: Uuid,
    }

    async fn world() -> World {
        let connections = ConnectionRegistry::new();
        let cache = Arc::new(InMemoryMatchCache::new());
        let stores = InMemoryPersistence::new();
        let claims = ClaimRegistry::new();
        let bus = Arc::new(RecordingBus::default());

        let discovery = Arc::new(RiderDiscovery::new(
            stores.clone(),
            stores.clone(),
            stores.clone(),
            stores.clone(),
            cache.clone(),
            5.0,
        ));
        let dispatch = Arc::new(DispatchEngine::new(
            connections.clone(),
            cache.clone(),
            bus.clone(),
            claims.clone(),
            40_000,
        ));
        let relay = Arc::new(ResponseRelay::new(
            connections.clone(),
            cache.clone(),
            stores.clone(),
            stores.clone(),
            claims.clone(),
            bus.clone(),
        ));
        let lifecycle = Arc::new(LifecycleController::new(
            connections.clone(),
            cache.clone(),
            stores.clone(),
            stores.clone(),
            stores.clone(),
            stores.clone(),
            claims.clone(),
            dec!(10),
        ));

        let handler = SessionHandler::new(
            connections.clone(),
            discovery,
            dispatch,
            relay,
            lifecycle,
        );

        let delivery_id = Uuid::new_v4();
        let rider_id = Uuid::new_v4();
        let customer_id = Uuid::new_v4();
        let vehicle_id = Uuid::new_v4();
        let pickup = GeoPoint::new(6.45, 3.39);

        DeliveryStore::create(
            stores.as_ref(),
            Delivery {
                id: delivery_id,
                customer: customer_id,
                rider: None,
                status: DeliveryStatus::Pending,
                delivery_fee: dec!(100),
                delivery_ref: "DEL-0007".to_string(),
                sender_name: "Ada".to_string(),
                sender_address: "12 Marina Rd".to_string(),
                recipient_address: "3 Broad St".to_string(),
                sender_location: pickup,
                created_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        RiderStore::create(
            stores.as_ref(),
            Rider {
                id: rider_id,
                name: "Chidi".to_string(),
                phone: "+2348000000000".to_string(),
                email: "chidi@example.com".to_string(),
                gender: "male".to_string(),
                status: RiderStatus::Online,
                active: true,
                busy: false,
                vehicle: vehicle_id,
            },
        )
        .await
        .unwrap();

        VehicleStore::create(
            stores.as_ref(),
            Vehicle {
                id: vehicle_id,
                owner: rider_id,
                kind: VehicleKind::Bike,
                plate_number: "LAG-123-XY".to_string(),
            },
        )
        .await
        .unwrap();

        RiderLocationStore::upsert(
            stores.as_ref(),
            RiderLocation {
                rider: rider_id,
                position: GeoPoint::new(pickup.lat + 0.01, pickup.lon),
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        World {
            handler,
            connections,
            stores,
            bus,
            delivery_id,
            rider_id,
            customer_id,
        }
    }

    fn request(w: &World) -> PackageRequest {
        PackageRequest {
            delivery_id: w.delivery_id,
            customer_id: w.customer_id,
            sender_name: "Ada".to_string(),
            sender_address: "12 Marina Rd".to_string(),
            recipient_address: "3 Broad St".to_string(),
            delivery_ref: "DEL-0007".to_string(),
        }
    }

    #[tokio::test]
    async fn test_identity_registers_and_disconnect_removes() {
        let w = world().await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = w.handler.open(tx);

        session
            .handle(InboundEvent::RiderId { rider_id: w.rider_id })
            .await
            .unwrap();
        assert!(w.connections.lookup(&w.rider_id).is_some());

        session.handle(InboundEvent::Disconnect).await.unwrap();
        assert!(w.connections.lookup(&w.rider_id).is_none());
    }

    #[tokio::test]
    async fn test_package_request_reaches_connected_rider() {
        let w = world().await;

        let (rider_tx, mut rider_rx) = mpsc::unbounded_channel();
        let mut rider_session = w.handler.open(rider_tx);
        rider_session
            .handle(InboundEvent::RiderId { rider_id: w.rider_id })
            .await
            .unwrap();

        let (customer_tx, _customer_rx) = mpsc::unbounded_channel();
        let mut customer_session = w.handler.open(customer_tx);
        customer_session
            .handle(InboundEvent::CustomerId {
                customer_id: w.customer_id,
            })
            .await
            .unwrap();

        customer_session
            .handle(InboundEvent::PackageRequest(request(&w)))
            .await
            .unwrap();

        match rider_rx.try_recv().unwrap() {
            OutboundEvent::Notification { customer_id, .. } => {
                assert_eq!(customer_id, w.customer_id)
            }
            other => panic!("unexpected event: {:?}", other),
        }

        assert_eq!(w.bus.requests.lock().len(), 1);
        assert_eq!(w.bus.assignments.lock().len(), 1);
        assert_eq!(w.bus.assignments.lock()[0].assigned_to, w.rider_id);
    }

    #[tokio::test]
    async fn test_request_without_nearby_rider_is_dropped() {
        let w = world().await;

        // Move the only rider out of range.
        RiderLocationStore::upsert(
            w.stores.as_ref(),
            RiderLocation {
                rider: w.rider_id,
                position: GeoPoint::new(7.5, 3.39),
                updated_at: Utc::now(),
            },
        )
        .await
        .unwrap();

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = w.handler.open(tx);
        session
            .handle(InboundEvent::CustomerId {
                customer_id: w.customer_id,
            })
            .await
            .unwrap();

        session
            .handle(InboundEvent::PackageRequest(request(&w)))
            .await
            .unwrap();

        assert!(w.bus.requests.lock().is_empty());
    }

    #[tokio::test]
    async fn test_arrived_requires_identity() {
        let w = world().await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = w.handler.open(tx);

        let err = session
            .handle(InboundEvent::Arrived {
                customer_id: w.customer_id,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, SessionError::NotIdentified));
    }

    #[tokio::test]
    async fn test_arrived_notifies_customer() {
        let w = world().await;

        let (customer_tx, mut customer_rx) = mpsc::unbounded_channel();
        let mut customer_session = w.handler.open(customer_tx);
        customer_session
            .handle(InboundEvent::CustomerId {
                customer_id: w.customer_id,
            })
            .await
            .unwrap();

        let (rider_tx, _rider_rx) = mpsc::unbounded_channel();
        let mut rider_session = w.handler.open(rider_tx);
        rider_session
            .handle(InboundEvent::RiderId { rider_id: w.rider_id })
            .await
            .unwrap();

        rider_session
            .handle(InboundEvent::Arrived {
                customer_id: w.customer_id,
            })
            .await
            .unwrap();

        match customer_rx.try_recv().unwrap() {
            OutboundEvent::RiderArrivalNotification { rider_id } => {
                assert_eq!(rider_id, w.rider_id)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_driver_response_is_published() {
        let w = world().await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = w.handler.open(tx);
        session
            .handle(InboundEvent::RiderId { rider_id: w.rider_id })
            .await
            .unwrap();

        session
            .handle(InboundEvent::DriverResponse(DriverResponse {
                delivery_id: w.delivery_id,
                rider_id: w.rider_id,
                customer_id: w.customer_id,
                availability: true,
                arrival_time: Some(Utc::now()),
            }))
            .await
            .unwrap();

        assert_eq!(w.bus.responses.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_frame_is_rejected() {
        let w = world().await;

        let (tx, _rx) = mpsc::unbounded_channel();
        let mut session = w.handler.open(tx);

        let err = session.handle_frame(b"not json").await.unwrap_err();
        assert!(matches!(err, SessionError::Decode(_)));
    }
}
