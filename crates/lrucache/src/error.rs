//! Error types for lrucache

use std::fmt;

/// Result type alias for lrucache operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for cache construction and validation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Error {
    /// Capacity must be at least 1
    InvalidCapacity(usize),

    /// Internal structure check failed
    Invariant(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::InvalidCapacity(cap) => {
                write!(f, "Invalid capacity: {} (must be at least 1)", cap)
            }
            Error::Invariant(msg) => write!(f, "Invariant violated: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_invalid_capacity() {
        let err = Error::InvalidCapacity(0);
        assert_eq!(err.to_string(), "Invalid capacity: 0 (must be at least 1)");
    }

    #[test]
    fn test_display_invariant() {
        let err = Error::Invariant("table has 3 entries, list has 2".to_string());
        assert!(err.to_string().contains("list has 2"));
    }
}
