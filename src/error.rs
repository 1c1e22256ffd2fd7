// src/error.rs

// Collaborator read failures. Timeouts and an unreachable store are transient;
// unreadable fixture or alias files are not.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("{what} timed out after {secs} seconds")]
    Timeout { what: String, secs: u64 },

    #[error("{what} is unavailable: {reason}")]
    Unavailable { what: String, reason: String },

    #[error("Invalid fixture data: {0}")]
    Fixture(String),
}

impl SourceError {
    /// Returns true if retrying the same read may succeed
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SourceError::Timeout { .. } | SourceError::Unavailable { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_are_transient() {
        let err = SourceError::Timeout {
            what: "training".to_string(),
            secs: 30,
        };
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "training timed out after 30 seconds");
    }

    #[test]
    fn fixture_errors_are_permanent() {
        assert!(!SourceError::Fixture("not an object".to_string()).is_transient());
    }
}
