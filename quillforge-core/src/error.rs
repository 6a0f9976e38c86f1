//! ABOUTME: Error taxonomy shared across the QuillForge pipeline
//! ABOUTME: Mirrors the failure kinds in the error-handling design (validation, auth, not-found,
//! ABOUTME: illegal transition, upstream transient/permanent, truncation, cancellation)

use thiserror::Error;

/// Comprehensive error enum for all QuillForge operations.
///
/// Variants correspond to the taxonomy of *kinds*, not concrete types: callers
/// match on the variant to decide whether to retry, surface a 4xx, or fail the
/// enclosing job.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },

    #[error("authentication error: {message}")]
    Auth { message: String },

    #[error("not found: {message}")]
    NotFound { message: String },

    #[error("illegal transition: {message}")]
    IllegalTransition { message: String },

    #[error("upstream transient error: {message}")]
    UpstreamTransient {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("upstream permanent error: {message}")]
    UpstreamPermanent { message: String },

    #[error("truncated response: {message}")]
    Truncation { message: String },

    #[error("storage error: {message}")]
    Storage {
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("provider error: {message}")]
    Provider {
        message: String,
        provider: Option<String>,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    #[error("agent not found: {0}")]
    AgentNotFound(String),

    #[error("persona not found for agent type {0}")]
    PersonaNotFound(String),

    #[error("operation cancelled")]
    Cancelled,

    #[error("internal orchestrator error: {message}")]
    Internal { message: String },
}

impl PipelineError {
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: None,
        }
    }

    #[must_use]
    pub fn validation_field(message: impl Into<String>, field: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field: Some(field.into()),
        }
    }

    #[must_use]
    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound {
            message: message.into(),
        }
    }

    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Whether a retry loop (§4.10) should attempt this error again.
    ///
    /// Authentication, schema/validation, and cancellation errors are never retried.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::UpstreamTransient { .. } | Self::Truncation { .. })
    }
}

pub type Result<T> = std::result::Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn upstream_transient_and_truncation_are_retryable() {
        assert!(PipelineError::UpstreamTransient {
            message: "503".to_string(),
            source: None,
        }
        .is_retryable());
        assert!(PipelineError::Truncation {
            message: "cut off".to_string(),
        }
        .is_retryable());
    }

    #[test]
    fn auth_validation_and_cancelled_are_not_retryable() {
        assert!(!PipelineError::validation("bad field").is_retryable());
        assert!(!PipelineError::Auth {
            message: "bad key".to_string()
        }
        .is_retryable());
        assert!(!PipelineError::Cancelled.is_retryable());
    }
}
