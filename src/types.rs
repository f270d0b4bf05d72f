//! Core types and events for account-retriever

use crate::retriever::CyclePhase;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A remote account whose activity is being mirrored
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedAccount {
    /// Store-assigned identifier
    pub id: i64,
    /// Account handle on the external service
    pub handle: String,
    /// Most recent post seen on the external service
    #[serde(default)]
    pub last_post_id: i64,
    /// Most recent post already delivered to followers
    #[serde(default)]
    pub last_synced_post_id: i64,
    /// When the account was last retrieved (None = never)
    #[serde(default)]
    pub last_sync: Option<DateTime<Utc>>,
    /// Consecutive failures while fetching this account
    #[serde(default)]
    pub fetching_error_count: u32,
}

impl TrackedAccount {
    /// New account that has never been synchronized
    pub fn new(id: i64, handle: impl Into<String>) -> Self {
        Self {
            id,
            handle: handle.into(),
            last_post_id: 0,
            last_synced_post_id: 0,
            last_sync: None,
            fetching_error_count: 0,
        }
    }
}

/// A contiguous, ordered group of accounts handed downstream as one unit
pub type Batch = Vec<TrackedAccount>;

/// Event emitted by the retrieval scheduler
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A new cycle began
    CycleStarted {
        /// Cycle sequence number, starting at 1
        cycle: u64,
    },

    /// A batch was accepted by the handoff channel
    BatchPublished {
        /// Cycle sequence number
        cycle: u64,
        /// Zero-based batch position within the cycle
        index: usize,
        /// Number of accounts in the batch
        size: usize,
    },

    /// All batches were published and the cadence window elapsed
    CycleCompleted {
        /// Cycle sequence number
        cycle: u64,
        /// Number of batches produced
        batches: usize,
        /// Number of accounts fetched
        accounts: usize,
    },

    /// The cycle ended early because a collaborator failed
    CycleFailed {
        /// Cycle sequence number
        cycle: u64,
        /// Phase the cycle was in when it failed
        phase: CyclePhase,
        /// Error message
        error: String,
    },

    /// The scheduler observed cancellation and exited
    Stopped {
        /// Number of cycles that were started
        cycles: u64,
    },
}
