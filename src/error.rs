//! Error types for account-retriever
//!
//! Every failure the scheduler can observe falls into one of three groups:
//! - Transient collaborator failures (auxiliary sync, count limit, store, handoff)
//! - Cancellation, which ends the loop and is never reported
//! - Defects, such as a violated partition invariant or a panicking collaborator

use thiserror::Error;

/// Result type alias for account-retriever operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for account-retriever
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "unit_delay")
        key: Option<String>,
    },

    /// The auxiliary pre-cycle task failed
    #[error("auxiliary sync failed: {0}")]
    AuxiliarySync(String),

    /// The count-limit provider could not supply a ceiling
    #[error("count limit lookup failed: {0}")]
    MaxCount(String),

    /// The account store could not return tracked accounts
    #[error("account store error: {0}")]
    Store(String),

    /// Handing a batch to the downstream stage failed
    #[error("publish failed: {0}")]
    Publish(String),

    /// The downstream receiver of the handoff channel is gone
    #[error("handoff channel closed")]
    ChannelClosed,

    /// Batches produced by the partitioner do not match the fetched accounts
    #[error("partition invariant violated: {message}")]
    PartitionInvariant {
        /// Which invariant failed and with what numbers
        message: String,
    },

    /// A collaborator panicked while the cycle was running
    #[error("cycle panicked: {0}")]
    Panicked(String),

    /// Cancellation was requested; this is a shutdown path, not a failure
    #[error("retrieval cancelled")]
    Cancelled,
}

/// How seriously a reported failure should be taken
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Severity {
    /// Environmental condition; the next cycle may well succeed
    Transient,
    /// Logic bug in this crate; should never happen
    Defect,
}

impl Error {
    /// Classify the error for reporting
    pub fn severity(&self) -> Severity {
        match self {
            Error::PartitionInvariant { .. } | Error::Panicked(_) => Severity::Defect,
            Error::Config { .. }
            | Error::AuxiliarySync(_)
            | Error::MaxCount(_)
            | Error::Store(_)
            | Error::Publish(_)
            | Error::ChannelClosed
            | Error::Cancelled => Severity::Transient,
        }
    }

    /// Returns true if this error only signals a requested shutdown
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Error::Cancelled)
    }

    pub(crate) fn config(message: impl Into<String>, key: &str) -> Self {
        Error::Config {
            message: message.into(),
            key: Some(key.to_string()),
        }
    }
}
