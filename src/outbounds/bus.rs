//--------------------------------------------------------------------------------------------------
// MODULE OVERVIEW
//--------------------------------------------------------------------------------------------------
// RabbitMQ adapters for the dispatch pipeline. `BusPublishers` backs the
// publisher seams of the dispatch engine and the response relay with the
// three fanout exchanges; the `run_*_consumer` loops feed broadcasts back
// into the services. Consumer loops never crash on a bad message - a
// payload that fails to decode or to process is logged and dropped.
//--------------------------------------------------------------------------------------------------

use std::sync::Arc;

use rabbitmq::{Broker, PublishOptions, Publisher, RabbitMQError};
use tracing::{error, info};

use crate::domain::models::events::{AssignedPackage, DriverResponse, PackageRequest};
use crate::domain::services::dispatch::{DispatchEngine, DispatchError, DispatchPublisher};
use crate::domain::services::relay::{RelayError, ResponsePublisher, ResponseRelay};

/// Fanout carrying fresh package requests; messages expire per publish.
pub const PACKAGE_REQUEST_EXCHANGE: &str = "package_request";
/// Fanout carrying rider accept/decline decisions.
pub const DRIVER_RESPONSES_EXCHANGE: &str = "driver_responses";
/// Informational fanout of completed assignments.
pub const ASSIGNED_PACKAGES_EXCHANGE: &str = "assigned_package_requests";

/// +----------------------------------------------------------------------+
/// | BusPublishers                                                        |
/// +----------------------------------------------------------------------+
/// | Owns one publisher per outbound exchange and adapts them to the      |
/// | `DispatchPublisher` and `ResponsePublisher` seams. Each publisher    |
/// | keeps its own channel and background task alive for the lifetime of  |
/// | this struct.                                                         |
/// +----------------------------------------------------------------------+
pub struct BusPublishers {
    package_requests: Publisher,
    assignments: Publisher,
    driver_responses: Publisher,
}

impl BusPublishers {
    /// Declares the three exchanges and opens a publisher on each.
    pub async fn connect(broker: &Broker) -> Result<Arc<Self>, RabbitMQError> {
        let package_requests = broker.fanout_publisher(PACKAGE_REQUEST_EXCHANGE).await?;
        let assignments = broker.fanout_publisher(ASSIGNED_PACKAGES_EXCHANGE).await?;
        let driver_responses = broker.fanout_publisher(DRIVER_RESPONSES_EXCHANGE).await?;

        Ok(Arc::new(Self {
            package_requests,
            assignments,
            driver_responses,
        }))
    }
}

impl DispatchPublisher for BusPublishers {
    fn publish_package_request(
        &self,
        request: &PackageRequest,
        ttl_ms: u64,
    ) -> Result<(), DispatchError> {
        let payload = serde_json::to_vec(request)?;
        let opts = PublishOptions::expiring(ttl_ms)
            .with_message_id(&request.delivery_id.to_string());

        self.package_requests
            .publish(payload, opts)
            .map_err(|e| DispatchError::Publish {
                exchange: PACKAGE_REQUEST_EXCHANGE,
                reason: e.to_string(),
            })
    }

    fn publish_assignment(&self, assigned: &AssignedPackage) -> Result<(), DispatchError> {
        let payload = serde_json::to_vec(assigned)?;
        let opts =
            PublishOptions::default().with_message_id(&assigned.request.delivery_id.to_string());

        self.assignments
            .publish(payload, opts)
            .map_err(|e| DispatchError::Publish {
                exchange: ASSIGNED_PACKAGES_EXCHANGE,
                reason: e.to_string(),
            })
    }
}

impl ResponsePublisher for BusPublishers {
    fn publish_driver_response(&self, response: &DriverResponse) -> Result<(), RelayError> {
        let payload = serde_json::to_vec(response)?;
        let opts =
            PublishOptions::default().with_message_id(&response.delivery_id.to_string());

        self.driver_responses
            .publish(payload, opts)
            .map_err(|e| RelayError::Publish(e.to_string()))
    }
}

/// Consumes `package_request` broadcasts and runs the assignment attempt
/// for each. Runs until the subscription closes.
pub async fn run_package_request_consumer(
    broker: &Broker,
    engine: Arc<DispatchEngine>,
) -> Result<(), RabbitMQError> {
    let mut subscription = broker.fanout_subscriber(PACKAGE_REQUEST_EXCHANGE).await?;
    info!(
        "consuming {} on queue {}",
        PACKAGE_REQUEST_EXCHANGE,
        subscription.queue_name()
    );

    while let Some(message) = subscription.receive().await {
        let Some(content) = message.content else {
            continue;
        };
        match serde_json::from_slice::<PackageRequest>(&content) {
            Ok(request) => {
                if let Err(e) = engine.assign_package_to_driver(&request).await {
                    error!(
                        "assignment failed for delivery {}: {}",
                        request.delivery_id, e
                    );
                }
            }
            Err(e) => error!("discarding malformed package request: {}", e),
        }
    }

    info!("{} subscription closed", PACKAGE_REQUEST_EXCHANGE);
    Ok(())
}

/// Consumes `driver_responses` broadcasts and relays each decision to the
/// waiting customer. Runs until the subscription closes.
pub async fn run_driver_response_consumer(
    broker: &Broker,
    relay: Arc<ResponseRelay>,
) -> Result<(), RabbitMQError> {
    let mut subscription = broker.fanout_subscriber(DRIVER_RESPONSES_EXCHANGE).await?;
    info!(
        "consuming {} on queue {}",
        DRIVER_RESPONSES_EXCHANGE,
        subscription.queue_name()
    );

    while let Some(message) = subscription.receive().await {
        let Some(content) = message.content else {
            continue;
        };
        match serde_json::from_slice::<DriverResponse>(&content) {
            Ok(response) => {
                if let Err(e) = relay.handle_driver_response(response).await {
                    error!("driver response handling failed: {}", e);
                }
            }
            Err(e) => error!("discarding malformed driver response: {}", e),
        }
    }

    info!("{} subscription closed", DRIVER_RESPONSES_EXCHANGE);
    Ok(())
}
