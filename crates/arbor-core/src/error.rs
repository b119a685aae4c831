//! Error taxonomy for the Arbor forum engine.

use thiserror::Error;

/// Result type alias using the crate's error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors surfaced by the store, guard, and assembler.
///
/// This is the whole taxonomy callers see: storage-level failures are
/// classified into one of these kinds at the store boundary and never leak
/// their driver-specific text upward.
#[derive(Error, Debug)]
pub enum Error {
    /// A referenced thread, author, parent, or post does not exist.
    #[error("{what} not found")]
    NotFound {
        /// What was looked up, e.g. `thread 'weekly-news'` or `post 42`.
        what: String,
    },

    /// A referential rule was violated (parent in another thread,
    /// duplicate unique key).
    #[error("conflict: {reason}")]
    Conflict {
        /// Which rule was violated.
        reason: String,
    },

    /// The caller supplied a malformed parameter (unknown sort mode,
    /// negative limit).
    #[error("invalid argument: {reason}")]
    InvalidArgument {
        /// Description of the malformed input.
        reason: String,
    },

    /// A storage failure not otherwise classified: I/O, timeout,
    /// cancellation.
    #[error("internal error: {reason}")]
    Internal {
        /// Coarse description; the underlying cause is logged, not returned.
        reason: String,
    },
}

impl Error {
    /// A `NotFound` error for the given subject.
    pub fn not_found(what: impl Into<String>) -> Self {
        Self::NotFound { what: what.into() }
    }

    /// A `Conflict` error with the given reason.
    pub fn conflict(reason: impl Into<String>) -> Self {
        Self::Conflict {
            reason: reason.into(),
        }
    }

    /// An `InvalidArgument` error with the given reason.
    pub fn invalid_argument(reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            reason: reason.into(),
        }
    }

    /// An `Internal` error with the given coarse reason.
    pub fn internal(reason: impl Into<String>) -> Self {
        Self::Internal {
            reason: reason.into(),
        }
    }

    /// True if this error is a `NotFound`.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// True if this error is a `Conflict`.
    pub fn is_conflict(&self) -> bool {
        matches!(self, Self::Conflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_display() {
        let err = Error::not_found("thread 'weekly-news'");
        let msg = err.to_string();
        assert!(msg.contains("thread 'weekly-news'"));
        assert!(msg.contains("not found"));
    }

    #[test]
    fn test_conflict_display() {
        let err = Error::conflict("parent post 7 belongs to another thread");
        let msg = err.to_string();
        assert!(msg.contains("conflict"));
        assert!(msg.contains("parent post 7"));
    }

    #[test]
    fn test_invalid_argument_display() {
        let err = Error::invalid_argument("limit must not be negative");
        let msg = err.to_string();
        assert!(msg.contains("invalid argument"));
        assert!(msg.contains("limit"));
    }

    #[test]
    fn test_internal_display() {
        let err = Error::internal("storage failure");
        let msg = err.to_string();
        assert!(msg.contains("internal error"));
        assert!(msg.contains("storage failure"));
    }

    #[test]
    fn test_kind_predicates() {
        assert!(Error::not_found("post 1").is_not_found());
        assert!(!Error::not_found("post 1").is_conflict());
        assert!(Error::conflict("duplicate").is_conflict());
    }

    #[test]
    fn test_result_type_ok() {
        let result: Result<i32> = Ok(42);
        assert!(matches!(result, Ok(42)));
    }

    #[test]
    fn test_result_type_err() {
        let result: Result<i32> = Err(Error::internal("timeout"));
        assert!(result.is_err());
    }
}
