//! Per-cycle state machine of the retrieval scheduler

use crate::types::{Batch, TrackedAccount};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Phase of a retrieval cycle, without the data carried between phases
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CyclePhase {
    /// Between cycles
    Idle,
    /// Running the optional auxiliary task
    AuxiliarySync,
    /// Asking the count-limit provider for this cycle's ceiling
    FetchLimit,
    /// Reading tracked accounts from the store
    FetchAccounts,
    /// Splitting the fetched accounts into batches
    Partitioning,
    /// Publishing batches, one unit delay apart
    Dispatching,
    /// Waiting out the rest of the cycle window
    Padding,
}

impl fmt::Display for CyclePhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            CyclePhase::Idle => "idle",
            CyclePhase::AuxiliarySync => "auxiliary_sync",
            CyclePhase::FetchLimit => "fetch_limit",
            CyclePhase::FetchAccounts => "fetch_accounts",
            CyclePhase::Partitioning => "partitioning",
            CyclePhase::Dispatching => "dispatching",
            CyclePhase::Padding => "padding",
        };
        f.write_str(name)
    }
}

/// Outcome of a cycle that ran to completion
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CycleSummary {
    /// Batches published
    pub batches: usize,
    /// Accounts fetched (and published)
    pub accounts: usize,
}

/// State carried from one step of a cycle to the next
#[derive(Debug)]
pub(crate) enum CycleState {
    Idle,
    AuxiliarySync,
    FetchLimit,
    FetchAccounts {
        limit: usize,
    },
    Partitioning {
        accounts: Vec<TrackedAccount>,
    },
    Dispatching {
        batches: std::vec::IntoIter<Batch>,
        index: usize,
        produced: usize,
        accounts: usize,
    },
    Padding {
        produced: usize,
        accounts: usize,
    },
    Complete(CycleSummary),
}

impl CycleState {
    pub(crate) fn phase(&self) -> CyclePhase {
        match self {
            CycleState::Idle | CycleState::Complete(_) => CyclePhase::Idle,
            CycleState::AuxiliarySync => CyclePhase::AuxiliarySync,
            CycleState::FetchLimit => CyclePhase::FetchLimit,
            CycleState::FetchAccounts { .. } => CyclePhase::FetchAccounts,
            CycleState::Partitioning { .. } => CyclePhase::Partitioning,
            CycleState::Dispatching { .. } => CyclePhase::Dispatching,
            CycleState::Padding { .. } => CyclePhase::Padding,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn phase_names_are_snake_case() {
        assert_eq!(CyclePhase::FetchLimit.to_string(), "fetch_limit");
        assert_eq!(CyclePhase::AuxiliarySync.to_string(), "auxiliary_sync");
    }

    #[test]
    fn completed_cycle_returns_to_idle() {
        let state = CycleState::Complete(CycleSummary {
            batches: 1,
            accounts: 0,
        });
        assert_eq!(state.phase(), CyclePhase::Idle);
    }

    #[test]
    fn dispatching_reports_its_phase() {
        let state = CycleState::Dispatching {
            batches: Vec::new().into_iter(),
            index: 0,
            produced: 0,
            accounts: 0,
        };
        assert_eq!(state.phase(), CyclePhase::Dispatching);
    }
}
