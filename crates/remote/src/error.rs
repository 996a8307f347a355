//! Remote and pass errors

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Class of a remote failure
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    /// Concurrent modification; the batch may be resubmitted
    TransientConflict,
    /// The referenced resource does not exist
    NotFound,
    Other,
}

/// One entry of a remote failure list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    /// Index of the offending operation in the submitted batch
    pub index: usize,
    pub kind: FailureKind,
    pub message: String,
}

impl fmt::Display for Failure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "operation {}: {:?}: {}", self.index, self.kind, self.message)
    }
}

/// Structured error returned by the remote service
///
/// A failed batch is never partially applied.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("remote returned {} failure(s): {}", .failures.len(), first_failure(.failures))]
pub struct ServiceError {
    pub failures: Vec<Failure>,
}

fn first_failure(failures: &[Failure]) -> String {
    failures
        .first()
        .map(ToString::to_string)
        .unwrap_or_else(|| "no details".to_string())
}

impl ServiceError {
    pub fn new(failures: Vec<Failure>) -> Self {
        Self { failures }
    }

    pub fn single(index: usize, kind: FailureKind, message: impl Into<String>) -> Self {
        Self::new(vec![Failure {
            index,
            kind,
            message: message.into(),
        }])
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::single(0, FailureKind::TransientConflict, message)
    }

    /// Every failure is a concurrent-modification signal
    pub fn is_transient(&self) -> bool {
        !self.failures.is_empty()
            && self
                .failures
                .iter()
                .all(|failure| failure.kind == FailureKind::TransientConflict)
    }
}

/// Errors surfaced by a reconciliation pass
#[derive(Debug, Error)]
pub enum SyncError {
    /// Malformed remote tree or a plan breaking a structural rule
    #[error(transparent)]
    Tree(#[from] lt_core::Error),

    /// Non-transient rejection; the plan must be re-derived from a fresh read
    #[error("remote rejected operation {index}: {message}")]
    RemoteRejected { index: usize, message: String },

    /// Transient conflicts outlasted the retry ceiling
    #[error("reconciliation failed after {attempts} attempts: {last}")]
    ReconciliationFailed { attempts: u32, last: ServiceError },

    #[error("pass cancelled between batches")]
    Cancelled,

    /// Configuration rejected before any pass ran
    #[error("invalid configuration: {0}")]
    Config(String),

    /// Search failed while materializing
    #[error("search failed: {0}")]
    Service(ServiceError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(ServiceError::transient("busy").is_transient());
        assert!(!ServiceError::single(1, FailureKind::NotFound, "gone").is_transient());
        assert!(!ServiceError::new(Vec::new()).is_transient());

        let mixed = ServiceError::new(vec![
            Failure {
                index: 0,
                kind: FailureKind::TransientConflict,
                message: "busy".into(),
            },
            Failure {
                index: 1,
                kind: FailureKind::Other,
                message: "bad".into(),
            },
        ]);
        assert!(!mixed.is_transient());
    }

    #[test]
    fn test_display() {
        let err = ServiceError::single(2, FailureKind::NotFound, "no such node");
        assert_eq!(
            err.to_string(),
            "remote returned 1 failure(s): operation 2: NotFound: no such node"
        );
    }
}
