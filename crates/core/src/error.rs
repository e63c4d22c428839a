//! Error types for the Greenroom coordination layer
//!
//! This module defines all error types used throughout the system.
//! We use `thiserror` for automatic `Display` and `Error` trait
//! implementations.
//!
//! Every variant is `Clone`: a failed session refresh fans out to every
//! request queued behind it, so the same error value must be deliverable
//! to multiple callers.

use thiserror::Error;

/// Result type alias for Greenroom operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types for the Greenroom coordination layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Error {
    /// Transport failure while talking to the resource or auth API
    #[error("network error: {message}")]
    Network {
        /// Human-readable transport failure description
        message: String,
    },

    /// The session has expired and the request must be replayed after a
    /// refresh. Recovered transparently by the auth gate unless the
    /// refresh itself fails.
    #[error("reauthentication required")]
    ReauthRequired,

    /// The session refresh call failed. Always session-fatal: the
    /// application boundary is expected to terminate the session.
    #[error("session refresh failed: {message}")]
    AuthRefreshFailed {
        /// What the refresh attempt reported
        message: String,
    },

    /// The server rejected the request with a non-auth status
    /// (validation problems, missing records, server-side faults).
    /// Never intercepted by the auth gate.
    #[error("request rejected with status {status}: {message}")]
    Rejected {
        /// HTTP status code returned by the server
        status: u16,
        /// Response body or reason phrase
        message: String,
    },
}

impl Error {
    /// Construct a transport failure from any displayable source
    pub fn network(source: impl std::fmt::Display) -> Self {
        Error::Network {
            message: source.to_string(),
        }
    }

    /// Wrap a refresh failure into the session-fatal variant
    pub fn refresh_failed(source: impl std::fmt::Display) -> Self {
        Error::AuthRefreshFailed {
            message: source.to_string(),
        }
    }

    /// Whether this error means the session cannot be recovered
    pub fn is_session_fatal(&self) -> bool {
        matches!(self, Error::AuthRefreshFailed { .. })
    }
}
