//! Error taxonomy shared across every chain handler.
//!
//! Mirrors the layered `CoreError` / `ErrorCategory` / stable-code shape used
//! elsewhere in this workspace's core crates, trimmed to `std` (no
//! `no_std`/`alloc` split — nothing in this crate targets an embedded host).

use core::fmt;
use std::error::Error as StdError;
use std::sync::Arc;

/// Coarse classification every error maps to, used by callers to decide
/// retry/propagation policy without matching on string codes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ErrorCategory {
    /// Transport-level failure; retriable by the caller, never by the core.
    Retryable,
    /// Policy or token validation rejected the request.
    PermissionDenied,
    /// A handler's configured identity disagreed with path state.
    InvalidArgument,
    /// A referenced name, record, or connection id does not exist.
    NotFound,
    /// The operation was cancelled by its caller.
    Cancelled,
    /// The operation's deadline elapsed before completion.
    DeadlineExceeded,
    /// A programming invariant was violated; never retried.
    Internal,
}

/// Stable, dot-separated string codes. Do not rename an existing constant —
/// they are meant to be logged and matched on across versions.
pub mod codes {
    pub const TRANSPORT_DIAL_FAILED: &str = "nsm.transport.dial_failed";
    pub const TRANSPORT_STREAM_BROKEN: &str = "nsm.transport.stream_broken";
    pub const AUTH_DENIED: &str = "nsm.auth.denied";
    pub const TOKEN_EXPIRED: &str = "nsm.auth.token_expired";
    pub const PATH_MISMATCH: &str = "nsm.path.mismatch";
    pub const PATH_INDEX_OUT_OF_RANGE: &str = "nsm.path.index_out_of_range";
    pub const REGISTRY_NOT_FOUND: &str = "nsm.registry.not_found";
    pub const CONNECTION_NOT_FOUND: &str = "nsm.connection.not_found";
    pub const DNS_NO_SRV_RECORD: &str = "nsm.dns.no_srv_record";
    pub const DNS_RESOLUTION_FAILED: &str = "nsm.dns.resolution_failed";
    pub const NAME_SYNTAX_INVALID: &str = "nsm.name.syntax_invalid";
    pub const CANCELLED: &str = "nsm.cancelled";
    pub const DEADLINE_EXCEEDED: &str = "nsm.deadline_exceeded";
    pub const INTERNAL: &str = "nsm.internal";
}

/// A single, uniform error type flowing through every chain in this crate.
#[derive(Clone)]
pub struct NsmError {
    category: ErrorCategory,
    code: &'static str,
    message: Arc<str>,
    cause: Option<Arc<dyn StdError + Send + Sync>>,
}

impl NsmError {
    pub fn new(category: ErrorCategory, code: &'static str, message: impl Into<Arc<str>>) -> Self {
        Self {
            category,
            code,
            message: message.into(),
            cause: None,
        }
    }

    pub fn with_cause(
        category: ErrorCategory,
        code: &'static str,
        message: impl Into<Arc<str>>,
        cause: impl StdError + Send + Sync + 'static,
    ) -> Self {
        Self {
            category,
            code,
            message: message.into(),
            cause: Some(Arc::new(cause)),
        }
    }

    pub fn category(&self) -> ErrorCategory {
        self.category
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn path_mismatch(handler_name: &str, found: &str) -> Self {
        Self::new(
            ErrorCategory::InvalidArgument,
            codes::PATH_MISMATCH,
            format!(
                "handler {handler_name:?} does not own path segment named {found:?}"
            ),
        )
    }

    pub fn token_expired(segment_name: &str) -> Self {
        Self::new(
            ErrorCategory::PermissionDenied,
            codes::TOKEN_EXPIRED,
            format!("token for path segment {segment_name:?} has expired"),
        )
    }

    pub fn connection_not_found(id: &str) -> Self {
        Self::new(
            ErrorCategory::NotFound,
            codes::CONNECTION_NOT_FOUND,
            format!("no connection with id {id:?}"),
        )
    }

    pub fn cancelled() -> Self {
        Self::new(ErrorCategory::Cancelled, codes::CANCELLED, "operation cancelled")
    }

    pub fn deadline_exceeded() -> Self {
        Self::new(
            ErrorCategory::DeadlineExceeded,
            codes::DEADLINE_EXCEEDED,
            "deadline exceeded",
        )
    }

    pub fn internal(message: impl Into<Arc<str>>) -> Self {
        Self::new(ErrorCategory::Internal, codes::INTERNAL, message)
    }
}

impl fmt::Debug for NsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NsmError")
            .field("category", &self.category)
            .field("code", &self.code)
            .field("message", &self.message)
            .finish()
    }
}

impl fmt::Display for NsmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] {}", self.code, self.message)
    }
}

impl StdError for NsmError {
    fn source(&self) -> Option<&(dyn StdError + 'static)> {
        self.cause.as_ref().map(|c| c.as_ref() as &(dyn StdError + 'static))
    }
}

pub type Result<T> = core::result::Result<T, NsmError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn path_mismatch_is_invalid_argument() {
        let err = NsmError::path_mismatch("nsmgr-1", "nsmgr-2");
        assert_eq!(err.category(), ErrorCategory::InvalidArgument);
        assert_eq!(err.code(), codes::PATH_MISMATCH);
    }

    #[test]
    fn token_expired_is_permission_denied() {
        let err = NsmError::token_expired("nsmgr-1");
        assert_eq!(err.category(), ErrorCategory::PermissionDenied);
    }
}
