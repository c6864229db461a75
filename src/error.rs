//! Error types for tiergate.

use std::time::Duration;

use uuid::Uuid;

/// Terminal errors surfaced by the execution engine.
///
/// Admission and credit failures are produced before any provider call and
/// are cheap to return. Provider failures only surface after the retry loop
/// and the fallback model are both exhausted, or immediately for
/// non-retryable error kinds.
#[derive(Debug, thiserror::Error)]
pub enum RouterError {
    #[error("Rate limit exceeded for caller {caller_id}, retry in {retry_in:?}")]
    AdmissionDenied {
        caller_id: Uuid,
        retry_in: Duration,
    },

    #[error("Insufficient credits: {required} required, {available} available")]
    InsufficientCredits { required: i64, available: i64 },

    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    #[error("Primary and fallback models exhausted for tier {tier}: {reason}")]
    Exhausted { tier: String, reason: String },

    #[error("Ledger error: {0}")]
    Ledger(#[from] LedgerError),
}

/// Errors returned by a generation provider.
///
/// `PermissionDenied` and `QuotaExhausted` are non-retryable: a retry against
/// the same credentials cannot fix them. Everything else is treated as
/// transient.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ProviderError {
    #[error("Model {model} request failed: {reason}")]
    Transient { model: String, reason: String },

    #[error("Model {model} rate limited, retry after {retry_after:?}")]
    RateLimited {
        model: String,
        retry_after: Option<Duration>,
    },

    #[error("Model {model} timed out after {timeout:?}")]
    Timeout { model: String, timeout: Duration },

    #[error("Permission denied for model {model}")]
    PermissionDenied { model: String },

    #[error("Quota exhausted for model {model}")]
    QuotaExhausted { model: String },
}

impl ProviderError {
    /// Returns `true` if the request should be retried (or handed to the
    /// fallback model) after this error.
    pub fn is_retryable(&self) -> bool {
        !matches!(
            self,
            Self::PermissionDenied { .. } | Self::QuotaExhausted { .. }
        )
    }
}

/// Errors from the external credit ledger.
#[derive(Debug, Clone, thiserror::Error)]
pub enum LedgerError {
    #[error("No credit account for caller {caller_id}")]
    AccountNotFound { caller_id: Uuid },

    #[error("Ledger backend failure: {0}")]
    Backend(String),
}

/// Errors from the usage log sink.
#[derive(Debug, thiserror::Error)]
pub enum UsageError {
    #[error("Usage sink write failed: {0}")]
    Sink(String),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(ProviderError::Transient {
            model: "m".into(),
            reason: "connection reset".into(),
        }
        .is_retryable());
        assert!(ProviderError::RateLimited {
            model: "m".into(),
            retry_after: Some(Duration::from_secs(5)),
        }
        .is_retryable());
        assert!(ProviderError::Timeout {
            model: "m".into(),
            timeout: Duration::from_secs(60),
        }
        .is_retryable());

        assert!(!ProviderError::PermissionDenied { model: "m".into() }.is_retryable());
        assert!(!ProviderError::QuotaExhausted { model: "m".into() }.is_retryable());
    }
}
