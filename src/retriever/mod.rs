//! Rate-paced retrieval of tracked accounts
//!
//! The [`RetrievalScheduler`] repeats one cycle until cancelled:
//!
//! 1. Run the auxiliary sync task (only when enabled)
//! 2. Ask the count-limit provider for this cycle's ceiling
//! 3. Fetch up to that many tracked accounts
//! 4. Partition them into at most `max_batches_per_cycle` batches
//! 5. Publish each batch, waiting `unit_delay` after each one
//! 6. Pad the cycle so it always lasts `max_batches_per_cycle × unit_delay`
//!
//! Any collaborator failure ends the current cycle, is handed to the
//! [`FailureObserver`], and the next cycle starts right away. A panic inside a
//! collaborator is caught and reported the same way, as [`Error::Panicked`]. Cancellation is
//! checked before every cycle, publish and wait, and interrupts whatever the
//! scheduler is blocked on.
//!
//! # Example
//!
//! ```no_run
//! use account_retriever::collaborators::{FixedMaxCount, InMemoryAccountStore, handoff_channel};
//! use account_retriever::retriever::{Collaborators, RetrievalScheduler};
//! use account_retriever::RetrievalConfig;
//! use std::sync::Arc;
//! use tokio_util::sync::CancellationToken;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let (tx, mut rx) = handoff_channel(15);
//! let collaborators = Collaborators::new(
//!     Arc::new(FixedMaxCount::new(1400)),
//!     Arc::new(InMemoryAccountStore::default()),
//!     Arc::new(tx),
//! );
//! let scheduler = RetrievalScheduler::new(RetrievalConfig::default(), collaborators)?;
//!
//! let cancel = CancellationToken::new();
//! let handle = scheduler.spawn(cancel.clone());
//!
//! while let Some(batch) = rx.recv().await {
//!     println!("retrieving {} accounts", batch.len());
//! }
//!
//! cancel.cancel();
//! handle.await?;
//! # Ok(())
//! # }
//! ```

mod state;


pub use state::{CyclePhase, CycleSummary};

use crate::collaborators::{
    AccountStore, AuxiliarySync, CYCLE_FAILURE, FailureObserver, HandoffChannel,
    MaxCountProvider, TracingObserver,
};
use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use crate::pacer::CadencePacer;
use crate::partition::{partition, verify_partition};
use crate::types::Event;
use futures::FutureExt;
use state::CycleState;
use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

/// Buffer size for the scheduler's event broadcast channel
const EVENT_CHANNEL_BUFFER: usize = 256;

/// Systems the scheduler coordinates but does not own
#[derive(Clone)]
pub struct Collaborators {
    /// Per-cycle ceiling on fetched accounts
    pub max_count: Arc<dyn MaxCountProvider>,
    /// Source of tracked accounts
    pub store: Arc<dyn AccountStore>,
    /// Queue that carries batches downstream
    pub handoff: Arc<dyn HandoffChannel>,
    /// Task run before each cycle when `auxiliary_sync_enabled` is set
    pub auxiliary: Option<Arc<dyn AuxiliarySync>>,
    /// Sink for cycle failures (default: [`TracingObserver`])
    pub observer: Arc<dyn FailureObserver>,
}

impl Collaborators {
    /// Collaborators without an auxiliary task, reporting failures through `tracing`
    pub fn new(
        max_count: Arc<dyn MaxCountProvider>,
        store: Arc<dyn AccountStore>,
        handoff: Arc<dyn HandoffChannel>,
    ) -> Self {
        Self {
            max_count,
            store,
            handoff,
            auxiliary: None,
            observer: Arc::new(TracingObserver),
        }
    }

    /// Set the auxiliary pre-cycle task
    #[must_use]
    pub fn with_auxiliary(mut self, auxiliary: Arc<dyn AuxiliarySync>) -> Self {
        self.auxiliary = Some(auxiliary);
        self
    }

    /// Replace the failure observer
    #[must_use]
    pub fn with_observer(mut self, observer: Arc<dyn FailureObserver>) -> Self {
        self.observer = observer;
        self
    }
}

/// Error that ended a cycle, with the phase it ended in
#[derive(Debug)]
struct CycleFailure {
    phase: CyclePhase,
    error: Error,
}

/// Long-running producer that hands tracked accounts downstream at a fixed cadence
pub struct RetrievalScheduler {
    config: RetrievalConfig,
    pacer: CadencePacer,
    collaborators: Collaborators,
    event_tx: broadcast::Sender<Event>,
}

impl RetrievalScheduler {
    /// Create a scheduler
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration is invalid, or if
    /// auxiliary sync is enabled without an auxiliary task.
    pub fn new(config: RetrievalConfig, collaborators: Collaborators) -> Result<Self> {
        let pacer = CadencePacer::from_config(&config)?;

        if config.auxiliary_sync_enabled && collaborators.auxiliary.is_none() {
            return Err(Error::Config {
                message: "auxiliary sync is enabled but no auxiliary task was provided".into(),
                key: Some("auxiliary_sync_enabled".into()),
            });
        }

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_BUFFER);

        Ok(Self {
            config,
            pacer,
            collaborators,
            event_tx,
        })
    }

    /// Subscribe to scheduler lifecycle events
    ///
    /// Subscribe before calling [`run`](Self::run) or [`spawn`](Self::spawn);
    /// a receiver that falls behind loses the oldest events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Active configuration
    pub fn config(&self) -> &RetrievalConfig {
        &self.config
    }

    /// Pacer enforcing the cycle window
    pub fn pacer(&self) -> &CadencePacer {
        &self.pacer
    }

    /// Run the scheduler on a new tokio task
    pub fn spawn(self, cancel: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(self.run(cancel))
    }

    /// Run cycles until `cancel` fires
    ///
    /// Never returns for any other reason: every failure is reported and
    /// followed by a fresh cycle, without backoff.
    pub async fn run(self, cancel: CancellationToken) {
        info!(
            max_batches = self.pacer.max_batches().get(),
            unit_delay_secs = self.pacer.unit_delay().as_secs_f64(),
            auxiliary_sync = self.config.auxiliary_sync_enabled,
            "Retrieval scheduler started"
        );

        let mut cycle: u64 = 0;

        loop {
            if cancel.is_cancelled() {
                break;
            }

            cycle += 1;
            self.emit(Event::CycleStarted { cycle });

            match self.run_cycle(cycle, &cancel).await {
                Ok(summary) => {
                    debug!(
                        cycle,
                        batches = summary.batches,
                        accounts = summary.accounts,
                        "Retrieval cycle completed"
                    );
                    self.emit(Event::CycleCompleted {
                        cycle,
                        batches: summary.batches,
                        accounts: summary.accounts,
                    });
                }
                Err(CycleFailure { error, .. })
                    if error.is_cancellation() && cancel.is_cancelled() =>
                {
                    break;
                }
                Err(CycleFailure { phase, error }) => {
                    debug!(cycle, %phase, "Retrieval cycle ended early");
                    self.report(&error);
                    self.emit(Event::CycleFailed {
                        cycle,
                        phase,
                        error: error.to_string(),
                    });
                    // No backoff, but let other tasks run before retrying
                    tokio::task::yield_now().await;
                }
            }
        }

        info!(cycles = cycle, "Retrieval scheduler stopped");
        self.emit(Event::Stopped { cycles: cycle });
    }

    /// Drive one cycle from `Idle` back to `Idle`, turning a panic into a failure
    async fn run_cycle(
        &self,
        cycle: u64,
        cancel: &CancellationToken,
    ) -> std::result::Result<CycleSummary, CycleFailure> {
        let mut phase = CyclePhase::Idle;

        let outcome = AssertUnwindSafe(self.drive_cycle(cycle, cancel, &mut phase))
            .catch_unwind()
            .await;

        match outcome {
            Ok(result) => result,
            Err(payload) => Err(CycleFailure {
                phase,
                error: Error::Panicked(panic_message(payload)),
            }),
        }
    }

    /// Step the state machine, recording the phase being worked on in `phase`
    async fn drive_cycle(
        &self,
        cycle: u64,
        cancel: &CancellationToken,
        phase: &mut CyclePhase,
    ) -> std::result::Result<CycleSummary, CycleFailure> {
        let mut state = CycleState::Idle;

        loop {
            *phase = state.phase();
            state = match self.step(cycle, state, cancel).await {
                Ok(CycleState::Complete(summary)) => return Ok(summary),
                Ok(next) => next,
                Err(error) => {
                    return Err(CycleFailure {
                        phase: *phase,
                        error,
                    });
                }
            };
        }
    }

    /// Perform the work of `state` and return the state that follows it
    async fn step(
        &self,
        cycle: u64,
        state: CycleState,
        cancel: &CancellationToken,
    ) -> Result<CycleState> {
        match state {
            CycleState::Idle => {
                if self.config.auxiliary_sync_enabled {
                    Ok(CycleState::AuxiliarySync)
                } else {
                    Ok(CycleState::FetchLimit)
                }
            }

            CycleState::AuxiliarySync => {
                if let Some(auxiliary) = &self.collaborators.auxiliary {
                    until_cancelled(cancel, auxiliary.run()).await?;
                    debug!(cycle, "Auxiliary sync finished");
                }
                Ok(CycleState::FetchLimit)
            }

            CycleState::FetchLimit => {
                let limit = until_cancelled(cancel, self.collaborators.max_count.max_count()).await?;
                debug!(cycle, limit, "Fetched count limit");
                Ok(CycleState::FetchAccounts { limit })
            }

            CycleState::FetchAccounts { limit } => {
                let accounts =
                    until_cancelled(cancel, self.collaborators.store.tracked_accounts(limit))
                        .await?;
                debug!(cycle, limit, fetched = accounts.len(), "Fetched tracked accounts");
                Ok(CycleState::Partitioning { accounts })
            }

            CycleState::Partitioning { accounts } => {
                let fetched = accounts.len();
                let max_batches = self.pacer.max_batches();
                let batches = partition(accounts, max_batches);
                verify_partition(fetched, &batches, max_batches)?;

                Ok(CycleState::Dispatching {
                    produced: batches.len(),
                    batches: batches.into_iter(),
                    index: 0,
                    accounts: fetched,
                })
            }

            CycleState::Dispatching {
                mut batches,
                index,
                produced,
                accounts,
            } => {
                let Some(batch) = batches.next() else {
                    return Ok(CycleState::Padding { produced, accounts });
                };

                check_cancelled(cancel)?;
                let size = batch.len();
                until_cancelled(cancel, self.collaborators.handoff.publish(batch)).await?;
                debug!(cycle, index, size, produced, "Published batch");
                self.emit(Event::BatchPublished { cycle, index, size });

                check_cancelled(cancel)?;
                self.pacer.after_batch(cancel).await?;

                Ok(CycleState::Dispatching {
                    batches,
                    index: index + 1,
                    produced,
                    accounts,
                })
            }

            CycleState::Padding { produced, accounts } => {
                let padding = self.pacer.padding_for(produced);
                if !padding.is_zero() {
                    check_cancelled(cancel)?;
                    debug!(
                        cycle,
                        produced,
                        padding_secs = padding.as_secs_f64(),
                        "Padding cycle window"
                    );
                    self.pacer.pad(produced, cancel).await?;
                }

                Ok(CycleState::Complete(CycleSummary {
                    batches: produced,
                    accounts,
                }))
            }

            CycleState::Complete(summary) => Ok(CycleState::Complete(summary)),
        }
    }

    /// Hand `error` to the observer; a panicking observer must not end the loop
    fn report(&self, error: &Error) {
        let observer = &self.collaborators.observer;
        let reported =
            std::panic::catch_unwind(AssertUnwindSafe(|| observer.report(error, CYCLE_FAILURE)));

        if let Err(payload) = reported {
            error!(
                %error,
                panic = %panic_message(payload),
                "Failure observer panicked while reporting"
            );
        }
    }

    fn emit(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

fn check_cancelled(cancel: &CancellationToken) -> Result<()> {
    if cancel.is_cancelled() {
        Err(Error::Cancelled)
    } else {
        Ok(())
    }
}

/// Await `operation`, giving up with [`Error::Cancelled`] as soon as `cancel` fires
async fn until_cancelled<T>(
    cancel: &CancellationToken,
    operation: impl Future<Output = Result<T>>,
) -> Result<T> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        result = operation => result,
    }
}
