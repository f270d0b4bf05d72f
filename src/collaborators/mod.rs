//! Collaborators of the retrieval scheduler
//!
//! The scheduler owns none of the systems it coordinates. Each one is reached
//! through a trait so hosts can plug in their own storage, rate-limit
//! accounting and downstream queue:
//!
//! - [`MaxCountProvider`]: per-cycle ceiling on retrieved accounts
//! - [`AccountStore`]: source of tracked accounts
//! - [`AuxiliarySync`]: optional task run before each cycle
//! - [`HandoffChannel`]: queue that carries batches downstream
//! - [`FailureObserver`]: sink for cycle failures
//!
//! ## Provided implementations
//!
//! - [`InMemoryAccountStore`], [`FixedMaxCount`], [`WarmUpMaxCount`] and
//!   [`NoOpAuxiliarySync`] for tests and small hosts
//! - [`HandoffChannel`] for tokio `mpsc` senders, see [`handoff_channel`]
//! - [`TracingObserver`], which logs failures through `tracing`
//!
//! ## Usage
//!
//! ```
//! use account_retriever::collaborators::{
//!     AccountStore, FixedMaxCount, InMemoryAccountStore, MaxCountProvider,
//! };
//! use account_retriever::TrackedAccount;
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let store = InMemoryAccountStore::new(vec![
//!     TrackedAccount::new(1, "first"),
//!     TrackedAccount::new(2, "second"),
//! ]);
//! let limit = FixedMaxCount::new(1).max_count().await?;
//!
//! let accounts = store.tracked_accounts(limit).await?;
//! assert_eq!(accounts.len(), 1);
//! # Ok(())
//! # }
//! ```

mod channel;
mod memory;
mod observer;
mod traits;

pub use channel::handoff_channel;
pub use memory::{FixedMaxCount, InMemoryAccountStore, NoOpAuxiliarySync, WarmUpMaxCount};
pub use observer::{CYCLE_FAILURE, TracingObserver};
pub use traits::{AccountStore, AuxiliarySync, FailureObserver, HandoffChannel, MaxCountProvider};
