use std::collections::HashSet;
use std::sync::Arc;

use parking_lot::Mutex;
use uuid::Uuid;

/// Per-delivery idempotency claims.
///
/// Every process attached to the `package_request` exchange attempts
/// assignment for every broadcast it sees, including its own. The claim
/// registry makes those duplicate attempts harmless within a process:
/// `claim_*` has exactly one winner per delivery, and losers back off.
///
/// Claims are released when a match attempt dies (rider declines) or the
/// delivery completes, so a manual re-submission can run the pipeline
/// again.
#[derive(Debug, Clone, Default)]
pub struct ClaimRegistry {
    inner: Arc<Mutex<Claims>>,
}

#[derive(Debug, Default)]
struct Claims {
    submitted: HashSet<Uuid>,
    assigned: HashSet<Uuid>,
}

impl ClaimRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claims the submission of a delivery. Returns `true` for the first
    /// caller only; later callers are duplicates.
    pub fn claim_submission(&self, delivery_id: Uuid) -> bool {
        self.inner.lock().submitted.insert(delivery_id)
    }

    /// Claims the assignment attempt for a delivery. Returns `true` for
    /// the first caller only.
    pub fn claim_assignment(&self, delivery_id: Uuid) -> bool {
        self.inner.lock().assigned.insert(delivery_id)
    }

    /// Drops only the assignment claim, so a later broadcast for the same
    /// delivery can retry the hand-off without re-opening submission.
    pub fn release_assignment(&self, delivery_id: Uuid) {
        self.inner.lock().assigned.remove(&delivery_id);
    }

    /// Drops both claims for a delivery, re-opening it for dispatch.
    pub fn release(&self, delivery_id: Uuid) {
        let mut claims = self.inner.lock();
        claims.submitted.remove(&delivery_id);
        claims.assigned.remove(&delivery_id);
    }
}
