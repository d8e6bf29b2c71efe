//--------------------------------------------------------------------------------------------------
// STRUCTS
//--------------------------------------------------------------------------------------------------
// | Name            | Description                                        | Key Methods             |
// |-----------------|----------------------------------------------------|-------------------------|
// | DispatchEngine  | Broadcasts requests, notifies candidate riders     | submit_package_request  |
// |                 |                                                    | assign_package_to_driver|
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use tracing::{debug, info, warn};

use super::{ClaimRegistry, DispatchError, DispatchPublisher};
use crate::domain::models::events::{AssignedPackage, OutboundEvent, PackageRequest};
use crate::domain::services::connections::ConnectionRegistry;
use crate::domain::services::match_cache::{MatchCache, match_key};

/// Orchestrates the dispatch pipeline: broadcast the request, read the
/// candidate from the match cache, notify the rider, fan out the
/// assignment.
pub struct DispatchEngine {
    connections: ConnectionRegistry,
    cache: Arc<dyn MatchCache>,
    publisher: Arc<dyn DispatchPublisher>,
    claims: ClaimRegistry,
    request_ttl_ms: u64,
}

impl DispatchEngine {
    pub fn new(
        connections: ConnectionRegistry,
        cache: Arc<dyn MatchCache>,
        publisher: Arc<dyn DispatchPublisher>,
        claims: ClaimRegistry,
        request_ttl_ms: u64,
    ) -> Self {
        Self {
            connections,
            cache,
            publisher,
            claims,
            request_ttl_ms,
        }
    }

    /// Submits a new package request.
    ///
    /// Broadcasts the request on `package_request` with a short TTL, then
    /// immediately attempts assignment without waiting for a consumer.
    /// A duplicate submission for the same delivery is answered with
    /// `requestAlreadySent` on the customer's connection and otherwise
    /// ignored.
    ///
    /// # Errors
    /// Returns an error only for bus/cache infrastructure failures; a
    /// missing candidate is a logged NotFound condition, not an error.
    /// On failure the submission claim is released, so the customer can
    /// retry instead of being answered `requestAlreadySent` for a request
    /// that never reached the bus.
    pub async fn submit_package_request(
        &self,
        request: PackageRequest,
    ) -> Result<(), DispatchError> {
        if !self.claims.claim_submission(request.delivery_id) {
            info!(
                "duplicate submission for delivery {}, notifying customer",
                request.delivery_id
            );
            self.connections.send(
                &request.customer_id,
                OutboundEvent::RequestAlreadySent {
                    delivery_id: request.delivery_id,
                },
            );
            return Ok(());
        }

        let outcome = self.broadcast_and_assign(&request).await;
        if outcome.is_err() {
            warn!(
                "dispatch of delivery {} failed, re-opening it for retry",
                request.delivery_id
            );
            self.claims.release(request.delivery_id);
        }
        outcome
    }

    async fn broadcast_and_assign(&self, request: &PackageRequest) -> Result<(), DispatchError> {
        self.publisher
            .publish_package_request(request, self.request_ttl_ms)?;
        debug!(
            "broadcast package request for delivery {} (ttl {} ms)",
            request.delivery_id, self.request_ttl_ms
        );

        self.assign_package_to_driver(request).await
    }

    /// Attempts to hand the request to the candidate rider recorded by
    /// discovery.
    ///
    /// Runs both directly after submission and for every `package_request`
    /// broadcast this process consumes - including its own. The assignment
    /// claim keeps the attempts idempotent: only the first one for a
    /// delivery notifies the rider and publishes the assignment.
    ///
    /// When the match cache holds no candidate the condition is logged and
    /// the call returns `Ok` - callers on the bus path cannot observe
    /// failure synchronously.
    pub async fn assign_package_to_driver(
        &self,
        request: &PackageRequest,
    ) -> Result<(), DispatchError> {
        let record = match self.cache.get(&match_key(request.delivery_id)).await? {
            Some(record) => record,
            None => {
                warn!(
                    "no candidate rider for delivery {}, request stays unassigned",
                    request.delivery_id
                );
                return Ok(());
            }
        };

        if !self.claims.claim_assignment(request.delivery_id) {
            debug!(
                "assignment for delivery {} already attempted, skipping",
                request.delivery_id
            );
            return Ok(());
        }

        let assigned = AssignedPackage {
            request: request.clone(),
            assigned_to: record.rider_id,
        };

        self.connections.send(
            &record.rider_id,
            OutboundEvent::Notification {
                title: "New delivery request".to_string(),
                body: format!(
                    "{} needs a package delivered from {} to {}",
                    request.sender_name, request.sender_address, request.recipient_address
                ),
                sender_address: request.sender_address.clone(),
                recipient_address: request.recipient_address.clone(),
                customer_id: request.customer_id,
            },
        );

        if let Err(e) = self.publisher.publish_assignment(&assigned) {
            // Give the next broadcast for this delivery another shot.
            self.claims.release_assignment(request.delivery_id);
            return Err(e);
        }
        info!(
            "assigned delivery {} to rider {}",
            request.delivery_id, record.rider_id
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::events::{MatchRecord, RiderSnapshot};
    use crate::domain::models::types::{GeoPoint, RiderStatus};
    use crate::domain::services::connections::Connection;
    use crate::domain::services::match_cache::{InMemoryMatchCache, MATCH_TTL_SECS};
    use parking_lot::Mutex;
    use tokio::sync::mpsc;
    use uuid::Uuid;

    /// Records published payloads instead of touching a broker.
    #[derive(Default)]
    struct RecordingPublisher {
        requests: Mutex<Vec<(PackageRequest, u64)>>,
        assignments: Mutex<Vec<AssignedPackage>>,
    }

    impl DispatchPublisher for RecordingPublisher {
        fn publish_package_request(
            &self,
            request: &PackageRequest,
            ttl_ms: u64,
        ) -> Result<(), DispatchError> {
            self.requests.lock().push((request.clone(), ttl_ms));
            Ok(())
        }

        fn publish_assignment(&self, assigned: &AssignedPackage) -> Result<(), DispatchError> {
            self.assignments.lock().push(assigned.clone());
            Ok(())
        }
    }

    /// Fails a configurable number of publishes before delegating to the
    /// recorder, imitating a bus outage that clears up.
    struct FlakyPublisher {
        inner: RecordingPublisher,
        request_failures: Mutex<u32>,
        assignment_failures: Mutex<u32>,
    }

    impl FlakyPublisher {
        fn new(request_failures: u32, assignment_failures: u32) -> Self {
            Self {
                inner: RecordingPublisher::default(),
                request_failures: Mutex::new(request_failures),
                assignment_failures: Mutex::new(assignment_failures),
            }
        }
    }

    impl DispatchPublisher for FlakyPublisher {
        fn publish_package_request(
            &self,
            request: &PackageRequest,
            ttl_ms: u64,
        ) -> Result<(), DispatchError> {
            let mut left = self.request_failures.lock();
            if *left > 0 {
                *left -= 1;
                return Err(DispatchError::Publish {
                    exchange: "package_request",
                    reason: "connection reset".to_string(),
                });
            }
            self.inner.publish_package_request(request, ttl_ms)
        }

        fn publish_assignment(&self, assigned: &AssignedPackage) -> Result<(), DispatchError> {
            let mut left = self.assignment_failures.lock();
            if *left > 0 {
                *left -= 1;
                return Err(DispatchError::Publish {
                    exchange: "assigned_package_requests",
                    reason: "connection reset".to_string(),
                });
            }
            self.inner.publish_assignment(assigned)
        }
    }

    fn request() -> PackageRequest {
        PackageRequest {
            delivery_id: Uuid::new_v4(),
            customer_id: Uuid::new_v4(),
            sender_name: "Ada".to_string(),
            sender_address: "12 Marina Rd".to_string(),
            recipient_address: "3 Broad St".to_string(),
            delivery_ref: "DEL-0001".to_string(),
        }
    }

    fn match_record(request: &PackageRequest, rider_id: Uuid) -> MatchRecord {
        MatchRecord {
            delivery_id: request.delivery_id,
            rider_id,
            customer_id: request.customer_id,
            sender_address: request.sender_address.clone(),
            recipient_address: request.recipient_address.clone(),
            estimated_delivery_time: 4,
            delivery_ref: request.delivery_ref.clone(),
            rider: RiderSnapshot {
                id: rider_id,
                name: "Chidi".to_string(),
                phone: "+2348000000000".to_string(),
                email: "chidi@example.com".to_string(),
                gender: "male".to_string(),
                status: RiderStatus::Online,
                location: GeoPoint::new(6.45, 3.39),
            },
        }
    }

    struct Fixture {
        engine: DispatchEngine,
        connections: ConnectionRegistry,
        cache: Arc<InMemoryMatchCache>,
        publisher: Arc<RecordingPublisher>,
    }

    fn fixture() -> Fixture {
        let connections = ConnectionRegistry::new();
        let cache = Arc::new(InMemoryMatchCache::new());
        let publisher = Arc::new(RecordingPublisher::default());
        let engine = DispatchEngine::new(
            connections.clone(),
            cache.clone(),
            publisher.clone(),
            ClaimRegistry::new(),
            30_000,
        );
        Fixture {
            engine,
            connections,
            cache,
            publisher,
        }
    }

    #[tokio::test]
    async fn test_submit_broadcasts_with_ttl_and_assigns() {
        let fx = fixture();
        let request = request();
        let rider_id = Uuid::new_v4();

        fx.cache
            .set(
                &match_key(request.delivery_id),
                match_record(&request, rider_id),
                MATCH_TTL_SECS,
            )
            .await
            .unwrap();

        let (tx, mut rider_rx) = mpsc::unbounded_channel();
        fx.connections
            .register(rider_id, Connection::new(Uuid::new_v4(), tx));

        fx.engine
            .submit_package_request(request.clone())
            .await
            .unwrap();

        let published = fx.publisher.requests.lock();
        assert_eq!(published.len(), 1);
        assert_eq!(published[0].1, 30_000);

        let assignments = fx.publisher.assignments.lock();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].assigned_to, rider_id);

        match rider_rx.try_recv().unwrap() {
            OutboundEvent::Notification { body, customer_id, .. } => {
                assert!(body.contains("Ada"));
                assert_eq!(customer_id, request.customer_id);
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_no_candidate_is_logged_not_error() {
        let fx = fixture();
        fx.engine.submit_package_request(request()).await.unwrap();

        assert_eq!(fx.publisher.requests.lock().len(), 1);
        assert!(fx.publisher.assignments.lock().is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_submission_gets_request_already_sent() {
        let fx = fixture();
        let request = request();

        let (tx, mut customer_rx) = mpsc::unbounded_channel();
        fx.connections
            .register(request.customer_id, Connection::new(Uuid::new_v4(), tx));

        fx.engine
            .submit_package_request(request.clone())
            .await
            .unwrap();
        fx.engine
            .submit_package_request(request.clone())
            .await
            .unwrap();

        // Only the first submission reaches the bus.
        assert_eq!(fx.publisher.requests.lock().len(), 1);

        match customer_rx.try_recv().unwrap() {
            OutboundEvent::RequestAlreadySent { delivery_id } => {
                assert_eq!(delivery_id, request.delivery_id)
            }
            other => panic!("unexpected event: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_retry_after_failed_broadcast_is_not_a_duplicate() {
        let connections = ConnectionRegistry::new();
        let cache = Arc::new(InMemoryMatchCache::new());
        let publisher = Arc::new(FlakyPublisher::new(1, 0));
        let engine = DispatchEngine::new(
            connections.clone(),
            cache.clone(),
            publisher.clone(),
            ClaimRegistry::new(),
            30_000,
        );
        let request = request();

        let (tx, mut customer_rx) = mpsc::unbounded_channel();
        connections.register(request.customer_id, Connection::new(Uuid::new_v4(), tx));

        let err = engine
            .submit_package_request(request.clone())
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Publish { .. }));

        // The failed attempt re-opened the delivery: the retry reaches the
        // bus instead of answering the customer with requestAlreadySent.
        engine.submit_package_request(request.clone()).await.unwrap();

        assert_eq!(publisher.inner.requests.lock().len(), 1);
        assert!(customer_rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_failed_assignment_publish_allows_rebroadcast_retry() {
        let connections = ConnectionRegistry::new();
        let cache = Arc::new(InMemoryMatchCache::new());
        let publisher = Arc::new(FlakyPublisher::new(0, 1));
        let engine = DispatchEngine::new(
            connections.clone(),
            cache.clone(),
            publisher.clone(),
            ClaimRegistry::new(),
            30_000,
        );
        let request = request();
        let rider_id = Uuid::new_v4();

        cache
            .set(
                &match_key(request.delivery_id),
                match_record(&request, rider_id),
                MATCH_TTL_SECS,
            )
            .await
            .unwrap();

        assert!(engine.assign_package_to_driver(&request).await.is_err());

        // The rebroadcast consumed off the bus retries the hand-off.
        engine.assign_package_to_driver(&request).await.unwrap();

        let assignments = publisher.inner.assignments.lock();
        assert_eq!(assignments.len(), 1);
        assert_eq!(assignments[0].assigned_to, rider_id);
    }

    #[tokio::test]
    async fn test_rebroadcast_assignment_attempt_is_idempotent() {
        let fx = fixture();
        let request = request();
        let rider_id = Uuid::new_v4();

        fx.cache
            .set(
                &match_key(request.delivery_id),
                match_record(&request, rider_id),
                MATCH_TTL_SECS,
            )
            .await
            .unwrap();

        fx.engine
            .submit_package_request(request.clone())
            .await
            .unwrap();
        // The broadcast comes back through the standing subscriber.
        fx.engine.assign_package_to_driver(&request).await.unwrap();
        fx.engine.assign_package_to_driver(&request).await.unwrap();

        assert_eq!(fx.publisher.assignments.lock().len(), 1);
    }
}
