//! Configuration types for account-retriever

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::time::Duration;

/// Retrieval scheduler configuration
///
/// The defaults describe a 15-minute window: fifteen batches, one per minute.
/// Deserializing from an empty object yields the defaults.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrievalConfig {
    /// Run the auxiliary sync task before every cycle (default: false)
    #[serde(default)]
    pub auxiliary_sync_enabled: bool,

    /// Upper bound on batches per cycle; also the cadence length in units (default: 15)
    #[serde(default = "default_max_batches_per_cycle")]
    pub max_batches_per_cycle: usize,

    /// Wait after each batch, serialized in seconds (default: 60 seconds)
    ///
    /// Whole seconds are written as an integer, anything finer as a fraction.
    #[serde(default = "default_unit_delay", with = "duration_serde")]
    pub unit_delay: Duration,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            auxiliary_sync_enabled: false,
            max_batches_per_cycle: default_max_batches_per_cycle(),
            unit_delay: default_unit_delay(),
        }
    }
}

impl RetrievalConfig {
    /// Check that the settings describe a usable cadence
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if `max_batches_per_cycle` is zero or
    /// `unit_delay` is zero.
    pub fn validate(&self) -> Result<()> {
        self.max_batches()?;
        if self.unit_delay.is_zero() {
            return Err(Error::config(
                "unit_delay must be greater than zero",
                "unit_delay",
            ));
        }
        Ok(())
    }

    /// Batch ceiling as a non-zero count
    pub fn max_batches(&self) -> Result<NonZeroUsize> {
        NonZeroUsize::new(self.max_batches_per_cycle).ok_or_else(|| {
            Error::config(
                "max_batches_per_cycle must be at least 1",
                "max_batches_per_cycle",
            )
        })
    }
}

fn default_max_batches_per_cycle() -> usize {
    15
}

fn default_unit_delay() -> Duration {
    Duration::from_secs(60)
}

// Duration serialization helper: seconds, fractional when needed
mod duration_serde {
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        if duration.subsec_nanos() == 0 {
            serializer.serialize_u64(duration.as_secs())
        } else {
            serializer.serialize_f64(duration.as_secs_f64())
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs)
            .map_err(|e| D::Error::custom(format!("invalid duration {secs}: {e}")))
    }
}
