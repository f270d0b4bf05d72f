//! Cadence pacing for retrieval cycles
//!
//! Every cycle's dispatch phase occupies exactly `max_batches × unit_delay`,
//! no matter how many batches were produced:
//!
//! - each published batch is followed by one `unit_delay`
//! - if fewer than `max_batches` batches were produced, the shortfall is
//!   waited out once, after the last batch
//!
//! All waits race against a [`CancellationToken`] and end early with
//! [`Error::Cancelled`] when it fires.

use crate::config::RetrievalConfig;
use crate::error::{Error, Result};
use std::num::NonZeroUsize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

const DEFAULT_UNIT_DELAY: Duration = Duration::from_secs(60);

const DEFAULT_MAX_BATCHES: NonZeroUsize = match NonZeroUsize::new(15) {
    Some(n) => n,
    None => panic!("default batch count must be non-zero"),
};

/// Fixed-window pacer shared by all cycles of one scheduler
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CadencePacer {
    unit_delay: Duration,
    max_batches: NonZeroUsize,
}

impl CadencePacer {
    /// Create a pacer for `max_batches` units of `unit_delay`
    pub fn new(unit_delay: Duration, max_batches: NonZeroUsize) -> Self {
        Self {
            unit_delay,
            max_batches,
        }
    }

    /// Create a pacer from validated configuration
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the configuration does not validate.
    pub fn from_config(config: &RetrievalConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::new(config.unit_delay, config.max_batches()?))
    }

    /// Wait applied after every published batch
    pub fn unit_delay(&self) -> Duration {
        self.unit_delay
    }

    /// Number of units in one cycle
    pub fn max_batches(&self) -> NonZeroUsize {
        self.max_batches
    }

    /// Total dispatch-phase duration of one cycle
    pub fn cycle_duration(&self) -> Duration {
        self.units(self.max_batches.get())
    }

    /// End-of-cycle wait after `produced` batches
    ///
    /// Zero when the cycle produced `max_batches` batches (or more).
    pub fn padding_for(&self, produced: usize) -> Duration {
        self.units(self.max_batches.get().saturating_sub(produced))
    }

    /// Wait one unit after a published batch
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires before the wait ends.
    pub async fn after_batch(&self, cancel: &CancellationToken) -> Result<()> {
        sleep_or_cancel(self.unit_delay, cancel).await
    }

    /// Wait out the remainder of the cycle window after `produced` batches
    ///
    /// Returns immediately when there is nothing to pad.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Cancelled`] if `cancel` fires before the wait ends.
    pub async fn pad(&self, produced: usize, cancel: &CancellationToken) -> Result<()> {
        let padding = self.padding_for(produced);
        if padding.is_zero() {
            return Ok(());
        }
        sleep_or_cancel(padding, cancel).await
    }

    fn units(&self, count: usize) -> Duration {
        self.unit_delay
            .saturating_mul(u32::try_from(count).unwrap_or(u32::MAX))
    }
}

impl Default for CadencePacer {
    fn default() -> Self {
        Self::new(DEFAULT_UNIT_DELAY, DEFAULT_MAX_BATCHES)
    }
}

async fn sleep_or_cancel(duration: Duration, cancel: &CancellationToken) -> Result<()> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        _ = tokio::time::sleep(duration) => Ok(()),
    }
}
