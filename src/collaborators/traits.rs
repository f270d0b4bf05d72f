//! Traits implemented by the scheduler's collaborators

use crate::error::Error;
use crate::types::{Batch, TrackedAccount};
use async_trait::async_trait;

/// Supplies the per-cycle ceiling on how many accounts may be retrieved
///
/// Queried once at the start of every cycle, so implementations can react to
/// changes in the external service's rate allowance between cycles.
#[async_trait]
pub trait MaxCountProvider: Send + Sync {
    /// Ceiling for the current cycle
    ///
    /// # Errors
    ///
    /// Any error ends the current cycle; no accounts are fetched.
    async fn max_count(&self) -> crate::Result<usize>;
}

/// Source of truth for tracked accounts
#[async_trait]
pub trait AccountStore: Send + Sync {
    /// Return up to `limit` tracked accounts in a stable order
    ///
    /// Called every cycle; results must reflect the current persisted state
    /// rather than a cached copy.
    ///
    /// # Errors
    ///
    /// Any error ends the current cycle.
    async fn tracked_accounts(&self, limit: usize) -> crate::Result<Vec<TrackedAccount>>;
}

/// Optional task executed before each cycle when enabled in configuration
///
/// Must be idempotent: a failed or cancelled run is simply repeated on the
/// next cycle.
#[async_trait]
pub trait AuxiliarySync: Send + Sync {
    /// Perform one synchronization pass
    ///
    /// # Errors
    ///
    /// Any error ends the current cycle before the count limit is queried.
    async fn run(&self) -> crate::Result<()>;
}

/// Queue through which batches reach the downstream stage
///
/// `publish` may complete immediately, wait for capacity, or fail. The
/// scheduler races it against cancellation, so a blocked publish never delays
/// shutdown.
#[async_trait]
pub trait HandoffChannel: Send + Sync {
    /// Hand one batch downstream, transferring ownership to the consumer
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if no consumer remains, or any other
    /// error the queue reports; either ends the current cycle.
    async fn publish(&self, batch: Batch) -> crate::Result<()>;
}

/// Sink for failures that ended a cycle
///
/// Reporting is synchronous and must not block: the scheduler starts the next
/// cycle right after `report` returns.
pub trait FailureObserver: Send + Sync {
    /// Record a failure; `context` describes where it happened
    fn report(&self, error: &Error, context: &str);
}
