//! Caller-facing escalation errors
//!
//! Only structural problems reach callers. Delivery failures are handled
//! inside the coordinator and never show up here.

/// Errors returned by coordinator operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EscalationError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Escalation not active: {0}")]
    NotFound(String),
}

/// Result type for coordinator operations
pub type EscalationResult<T> = Result<T, EscalationError>;

impl EscalationError {
    /// Stable machine-readable code for RPC layers
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "INVALID_INPUT",
            Self::NotFound(_) => "NOT_FOUND",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_and_code() {
        let err = EscalationError::NotFound("esc-1".to_string());
        assert_eq!(err.to_string(), "Escalation not active: esc-1");
        assert_eq!(err.code(), "NOT_FOUND");
        assert_eq!(
            EscalationError::InvalidInput("x".into()).code(),
            "INVALID_INPUT"
        );
    }
}
