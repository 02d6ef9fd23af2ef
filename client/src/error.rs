//! Error taxonomy for the authenticated request pipeline.
//!
//! ERROR HANDLING
//! ==============
//! Only authentication failures are recovered inside the pipeline. Everything
//! else (transport faults, timeouts, non-auth statuses) surfaces to the caller
//! unchanged, and a failed refresh surfaces as [`ApiError::RefreshFailed`]
//! after the session has already been torn down.

#[cfg(test)]
#[path = "error_test.rs"]
mod error_test;

/// Stable machine-readable codes for client errors.
pub trait ErrorCode: std::fmt::Display {
    fn error_code(&self) -> &'static str;

    fn retryable(&self) -> bool {
        false
    }
}

// =============================================================================
// STORE
// =============================================================================

/// Errors produced by the persisted key-value medium.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// Reading or writing the backing file failed.
    #[error("store io failed: {0}")]
    Io(#[from] std::io::Error),

    /// The persisted state could not be encoded.
    #[error("store serialize failed: {0}")]
    Serialize(#[from] serde_json::Error),
}

// =============================================================================
// CONFIG
// =============================================================================

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("invalid API base URL: {0} (expected http:// or https://)")]
    InvalidBaseUrl(String),
}

// =============================================================================
// REFRESH
// =============================================================================

/// Outcome of a failed refresh, shared by every request awaiting it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("credential refresh failed: {message}")]
pub struct RefreshFailure {
    /// HTTP status of the refresh call, or `None` if it never got a response.
    pub status: Option<u16>,
    pub message: String,
}

impl RefreshFailure {
    /// Whether the server rejected the refresh itself (401/403).
    #[must_use]
    pub fn is_auth_rejection(&self) -> bool {
        matches!(self.status, Some(401 | 403))
    }
}

// =============================================================================
// API
// =============================================================================

/// Errors returned by [`crate::net::api::ApiClient`] operations.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The login endpoint rejected the supplied credentials.
    #[error("wrong email or password")]
    InvalidCredentials,

    /// The server answered with a non-success status.
    #[error("request failed with status {status}")]
    Status { status: u16, body: String },

    /// The request never produced a response.
    #[error("transport failed: {0}")]
    Transport(String),

    /// The request exceeded the fixed ceiling.
    #[error("request to {path} timed out")]
    Timeout { path: String },

    /// A response body did not match the expected shape.
    #[error("response decode failed: {0}")]
    Decode(String),

    /// Credential refresh failed; the session is gone.
    #[error("credential refresh failed (status {status:?}): {message}")]
    RefreshFailed { status: Option<u16>, message: String },

    /// Persisting session state failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ApiError {
    /// Whether this error is a 401/403 from the server.
    #[must_use]
    pub fn is_auth_failure(&self) -> bool {
        match self {
            Self::InvalidCredentials => true,
            Self::Status { status, .. } => is_auth_status(*status),
            Self::RefreshFailed { status, .. } => matches!(status, Some(401 | 403)),
            _ => false,
        }
    }
}

impl From<RefreshFailure> for ApiError {
    fn from(failure: RefreshFailure) -> Self {
        Self::RefreshFailed { status: failure.status, message: failure.message }
    }
}

impl ErrorCode for ApiError {
    fn error_code(&self) -> &'static str {
        match self {
            Self::InvalidCredentials => "E_INVALID_CREDENTIALS",
            Self::Status { .. } => "E_STATUS",
            Self::Transport(_) => "E_TRANSPORT",
            Self::Timeout { .. } => "E_TIMEOUT",
            Self::Decode(_) => "E_DECODE",
            Self::RefreshFailed { .. } => "E_REFRESH_FAILED",
            Self::Store(_) => "E_STORE",
        }
    }

    fn retryable(&self) -> bool {
        matches!(self, Self::Transport(_) | Self::Timeout { .. } | Self::Status { status: 429 | 500..=599, .. })
    }
}

/// 401 and 403 are the only statuses the pipeline treats as session failures.
#[must_use]
pub fn is_auth_status(status: u16) -> bool {
    matches!(status, 401 | 403)
}
