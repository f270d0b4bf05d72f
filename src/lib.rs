//! # account-retriever
//!
//! Rate-paced retrieval scheduler for tracked accounts.
//!
//! A long-running loop pulls the tracked accounts from a store, splits them
//! into at most `max_batches_per_cycle` batches and hands one batch downstream
//! every `unit_delay`. Every cycle lasts exactly `max_batches_per_cycle ×
//! unit_delay`, so the downstream stage never outruns the external service's
//! rate-limit window.
//!
//! ## Design Philosophy
//!
//! - **Library-first** - storage, rate accounting and consumers are traits the host implements
//! - **Never dies on its own** - collaborator failures are reported and the next cycle starts
//! - **Cancellable everywhere** - a [`CancellationToken`](tokio_util::sync::CancellationToken)
//!   interrupts fetches, publishes and waits
//!
//! ## Quick Start
//!
//! ```no_run
//! use account_retriever::collaborators::{FixedMaxCount, InMemoryAccountStore, handoff_channel};
//! use account_retriever::retriever::{Collaborators, RetrievalScheduler};
//! use account_retriever::{RetrievalConfig, TrackedAccount, cancel_on_shutdown_signal};
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = InMemoryAccountStore::new(vec![TrackedAccount::new(1, "rustlang")]);
//!     let (tx, mut rx) = handoff_channel(15);
//!
//!     let scheduler = RetrievalScheduler::new(
//!         RetrievalConfig::default(),
//!         Collaborators::new(Arc::new(FixedMaxCount::new(1400)), Arc::new(store), Arc::new(tx)),
//!     )?;
//!
//!     let cancel = CancellationToken::new();
//!     let handle = scheduler.spawn(cancel.clone());
//!     tokio::spawn(cancel_on_shutdown_signal(cancel));
//!
//!     while let Some(batch) = rx.recv().await {
//!         println!("Retrieving {} accounts", batch.len());
//!     }
//!
//!     handle.await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Collaborator traits and provided implementations
pub mod collaborators;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Fixed-window cycle pacing
pub mod pacer;
/// Batch partitioning
pub mod partition;
/// Retrieval scheduler
pub mod retriever;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use config::RetrievalConfig;
pub use error::{Error, Result, Severity};
pub use pacer::CadencePacer;
pub use retriever::{Collaborators, CyclePhase, CycleSummary, RetrievalScheduler};
pub use types::{Batch, Event, TrackedAccount};

use tokio_util::sync::CancellationToken;

/// Cancel `token` when the process receives a termination signal.
///
/// On Unix this listens for SIGTERM and SIGINT, skipping whichever cannot be
/// registered and falling back to `tokio::signal::ctrl_c()` if neither can.
/// Elsewhere it listens for Ctrl+C only.
///
/// Returns early, without waiting for a signal, if the token is cancelled
/// by someone else first.
pub async fn cancel_on_shutdown_signal(token: CancellationToken) {
    tokio::select! {
        _ = wait_for_signal() => {
            tracing::info!("Shutdown signal received, cancelling retrieval");
            token.cancel();
        }
        _ = token.cancelled() => {}
    }
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{Signal, SignalKind, signal};

    fn register(kind: SignalKind, name: &'static str) -> Option<Signal> {
        signal(kind)
            .inspect_err(|e| tracing::warn!(error = %e, signal = name, "Could not register signal handler"))
            .ok()
    }

    async fn recv(stream: Option<Signal>) {
        match stream {
            Some(mut stream) => {
                stream.recv().await;
            }
            None => std::future::pending().await,
        }
    }

    let terminate = register(SignalKind::terminate(), "SIGTERM");
    let interrupt = register(SignalKind::interrupt(), "SIGINT");

    if terminate.is_none() && interrupt.is_none() {
        tracing::error!("No signal handlers registered, falling back to ctrl_c");
        wait_for_ctrl_c().await;
        return;
    }

    tokio::select! {
        _ = recv(terminate) => tracing::info!(signal = "SIGTERM", "Received shutdown signal"),
        _ = recv(interrupt) => tracing::info!(signal = "SIGINT", "Received shutdown signal"),
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    wait_for_ctrl_c().await;
}

/// Resolves on Ctrl+C; never resolves if the listener cannot be installed
async fn wait_for_ctrl_c() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => tracing::info!(signal = "ctrl_c", "Received shutdown signal"),
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C, shutdown must come from the token");
            std::future::pending::<()>().await;
        }
    }
}
