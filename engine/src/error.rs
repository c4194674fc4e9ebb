//! Error types for the fieldsync engine.

use thiserror::Error;

/// All possible errors from the fieldsync engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Validation errors
    #[error("invalid record: {0}")]
    InvalidRecord(String),

    #[error("unknown meter category: {0}")]
    UnknownCategory(String),

    // Remote payload errors
    #[error("invalid serial directory payload: {0}")]
    InvalidDirectoryPayload(String),
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::InvalidRecord("account_id is required".into());
        assert_eq!(err.to_string(), "invalid record: account_id is required");

        let err = Error::UnknownCategory("XX".into());
        assert_eq!(err.to_string(), "unknown meter category: XX");

        let err = Error::InvalidDirectoryPayload("missing user_information".into());
        assert_eq!(
            err.to_string(),
            "invalid serial directory payload: missing user_information"
        );
    }
}
