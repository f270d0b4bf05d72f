//! Failure reporting through `tracing`

use super::traits::FailureObserver;
use crate::error::{Error, Severity};

/// Context attached to failures that ended a retrieval cycle
pub const CYCLE_FAILURE: &str = "cycle failure";

/// Observer that logs failures as structured `tracing` events
///
/// Transient collaborator failures are logged at `WARN`; defects such as a
/// broken partition invariant or a caught panic are logged at `ERROR`.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl FailureObserver for TracingObserver {
    fn report(&self, error: &Error, context: &str) {
        match error.severity() {
            Severity::Transient => {
                tracing::warn!(error = %error, context, "Failing retrieving tracked accounts");
            }
            Severity::Defect => {
                tracing::error!(
                    error = %error,
                    context,
                    "Retrieval cycle aborted by internal defect"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reports_without_subscriber() {
        let observer = TracingObserver;
        observer.report(&Error::Store("offline".into()), CYCLE_FAILURE);
        observer.report(
            &Error::PartitionInvariant {
                message: "2 items fetched, 1 batched".into(),
            },
            CYCLE_FAILURE,
        );
    }
}
