//! Error types for the Tether core.

use thiserror::Error;

/// All possible errors from the Tether core.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum Error {
    // Envelope validation errors
    #[error("malformed message: {0}")]
    MalformedMessage(String),

    #[error("missing required field: {0}")]
    MissingField(&'static str),

    #[error("type mismatch for field '{field}': expected {expected}")]
    TypeMismatch {
        field: &'static str,
        expected: &'static str,
    },

    // Store errors
    #[error("record not found: {0}")]
    RecordNotFound(String),
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = Error::MissingField("timestamp");
        assert_eq!(err.to_string(), "missing required field: timestamp");

        let err = Error::TypeMismatch {
            field: "message",
            expected: "object",
        };
        assert_eq!(
            err.to_string(),
            "type mismatch for field 'message': expected object"
        );
    }
}
