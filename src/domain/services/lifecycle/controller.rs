//----------------------------------------------------------------------
// MODULE OVERVIEW
//----------------------------------------------------------------------
// Drives a matched delivery through its trip stages. `start_delivery`
// moves a pending delivery onto the road; `end_delivery` completes it,
// settles the fee into the rider's wallet and retires the match record.
// Settlement is keyed by the delivery reference number, so a replayed
// completion never pays twice.
//----------------------------------------------------------------------

use std::sync::Arc;

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::domain::models::events::{MatchRecord, OutboundEvent};
use crate::domain::models::types::{AdminFeeRecord, Delivery, DeliveryStatus, RiderWallet};
use crate::domain::services::connections::ConnectionRegistry;
use crate::domain::services::dispatch::ClaimRegistry;
use crate::domain::services::lifecycle::settlement::{Settlement, split_delivery_fee};
use crate::domain::services::lifecycle::LifecycleError;
use crate::domain::services::match_cache::{match_key, MatchCache};
use crate::outbounds::persistence::{AdminFeeStore, DeliveryStore, RiderStore, WalletStore};

/// +----------------------------------------------------------------------+
/// | LifecycleController                                                  |
/// +----------------------------------------------------------------------+
/// | Owns the start and end transitions of a matched delivery and the     |
/// | wallet settlement that completion triggers. Status changes are       |
/// | validated against the delivery state machine; customer-facing        |
/// | notifications are best-effort through the connection registry.       |
/// +----------------------------------------------------------------------+
pub struct LifecycleController {
    connections: ConnectionRegistry,
    cache: Arc<dyn MatchCache>,
    deliveries: Arc<dyn DeliveryStore>,
    riders: Arc<dyn RiderStore>,
    wallets: Arc<dyn WalletStore>,
    admin_fees: Arc<dyn AdminFeeStore>,
    claims: ClaimRegistry,
    admin_charge_pct: Decimal,
}

impl LifecycleController {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        connections: ConnectionRegistry,
        cache: Arc<dyn MatchCache>,
        deliveries: Arc<dyn DeliveryStore>,
        riders: Arc<dyn RiderStore>,
        wallets: Arc<dyn WalletStore>,
        admin_fees: Arc<dyn AdminFeeStore>,
        claims: ClaimRegistry,
        admin_charge_pct: Decimal,
    ) -> Self {
        Self {
            connections,
            cache,
            deliveries,
            riders,
            wallets,
            admin_fees,
            claims,
            admin_charge_pct,
        }
    }

    /// Starts the trip for a matched delivery.
    ///
    /// Reads the match record, notifies the customer, moves the delivery
    /// to `on_transit` and marks the rider busy. The persisted state
    /// changes regardless of whether the customer is currently connected;
    /// only the notification is best-effort.
    ///
    /// # Errors
    /// Fails when the match record has expired, the delivery is missing,
    /// or the delivery is not in the `pending` stage.
    pub async fn start_delivery(&self, delivery_id: Uuid) -> Result<(), LifecycleError> {
        let (record, delivery) = self
            .load_matched_delivery(delivery_id, DeliveryStatus::OnTransit)
            .await?;

        self.connections.send(
            &record.customer_id,
            OutboundEvent::StartDeliveryNotification {
                delivery_id,
                rider_id: record.rider_id,
                delivery_ref: record.delivery_ref.clone(),
                estimated_delivery_time: record.estimated_delivery_time,
            },
        );

        self.deliveries
            .set_status(delivery_id, DeliveryStatus::OnTransit)
            .await?;
        self.riders.set_busy(record.rider_id, true).await?;

        info!(
            "delivery {} started by rider {} for customer {}",
            delivery.id, record.rider_id, record.customer_id
        );
        Ok(())
    }

    /// Completes the trip for a delivery that is on the road.
    ///
    /// Settles the fee, notifies the customer, moves the delivery to
    /// `delivered`, frees the rider and retires the match record so the
    /// delivery can never be dispatched or settled again. Settlement runs
    /// before the status write: a completion that fails mid-settlement
    /// leaves the delivery `on_transit`, so a replay passes the transition
    /// check and re-enters the idempotent settlement.
    ///
    /// # Errors
    /// Fails when the match record has expired, the delivery is missing,
    /// or the delivery is not in the `on_transit` stage.
    pub async fn end_delivery(&self, delivery_id: Uuid) -> Result<(), LifecycleError> {
        let (record, delivery) = self
            .load_matched_delivery(delivery_id, DeliveryStatus::Delivered)
            .await?;

        self.settle(&delivery, record.rider_id).await?;

        self.connections.send(
            &record.customer_id,
            OutboundEvent::EndDeliveryNotification {
                delivery_id,
                rider_id: record.rider_id,
                delivery_ref: record.delivery_ref.clone(),
            },
        );

        self.deliveries
            .set_status(delivery_id, DeliveryStatus::Delivered)
            .await?;
        self.riders.set_busy(record.rider_id, false).await?;

        self.cache.delete(&match_key(delivery_id)).await?;
        self.claims.release(delivery_id);

        info!(
            "delivery {} completed by rider {}",
            delivery.id, record.rider_id
        );
        Ok(())
    }

    /// Splits the delivery fee and credits the rider's wallet.
    ///
    /// Idempotent by delivery reference: the admin fee record doubles as
    /// the settlement marker and is written before the wallet credit, so a
    /// retried completion skips the payout instead of doubling it.
    ///
    /// # Returns
    /// The settlement amounts, or `None` when the delivery was already
    /// settled.
    pub async fn settle(
        &self,
        delivery: &Delivery,
        rider_id: Uuid,
    ) -> Result<Option<Settlement>, LifecycleError> {
        if self
            .admin_fees
            .find_by_ref(&delivery.delivery_ref)
            .await?
            .is_some()
        {
            info!(
                "delivery ref {} already settled, skipping payout",
                delivery.delivery_ref
            );
            return Ok(None);
        }

        let split = split_delivery_fee(delivery.delivery_fee, self.admin_charge_pct);

        self.admin_fees
            .append(AdminFeeRecord {
                delivery_ref: delivery.delivery_ref.clone(),
                rider: rider_id,
                admin_fee: split.admin_fee,
                created_at: Utc::now(),
            })
            .await?;

        match self.wallets.find_by_rider(rider_id).await? {
            Some(_) => self.wallets.credit(rider_id, split.rider_fee).await?,
            None => {
                debug!("creating wallet for rider {}", rider_id);
                self.wallets
                    .create(RiderWallet {
                        rider: rider_id,
                        balance: split.rider_fee,
                    })
                    .await?
            }
        }

        info!(
            "settled delivery ref {}: rider {} credited {}, platform kept {}",
            delivery.delivery_ref, rider_id, split.rider_fee, split.admin_fee
        );
        Ok(Some(split))
    }

    async fn load_matched_delivery(
        &self,
        delivery_id: Uuid,
        target: DeliveryStatus,
    ) -> Result<(MatchRecord, Delivery), LifecycleError> {
        let record = self
            .cache
            .get(&match_key(delivery_id))
            .await?
            .ok_or_else(|| {
                warn!("no match record for delivery {}", delivery_id);
                LifecycleError::NoMatchRecord(delivery_id)
            })?;

        let delivery = self
            .deliveries
            .find_by_id(delivery_id)
            .await?
            .ok_or(LifecycleError::DeliveryNotFound(delivery_id))?;

        if !delivery.status.can_transition_to(target) {
            return Err(LifecycleError::InvalidTransition {
                from: delivery.status,
                to: target,
            });
        }

        Ok((record, delivery))
    }
}
