//! Unified error handling with Sentry integration.
//!
//! Every fallible operation in this crate returns [`Result<T>`]. Errors carry
//! an [`ErrorKind`] for callers that branch on the category, and a
//! [`Error::user_message`] that is safe to show to readers.

use newsdesk_core::{CheckoutError, EmailError, PasswordError};
use thiserror::Error;

use crate::api::ApiError;
use crate::config::ConfigError;
use crate::storage::StorageError;

/// Client-level error type.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Backend call failed.
    #[error("API error: {0}")]
    Api(#[from] ApiError),

    /// Token storage failed.
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// Email rejected before it reached the backend.
    #[error("Invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    /// Password rejected before it reached the backend.
    #[error("Weak password: {0}")]
    WeakPassword(#[from] PasswordError),

    /// The operation needs a signed-in reader.
    #[error("Not signed in")]
    NotAuthenticated,

    /// Checkout step does not allow the requested action.
    #[error("Checkout error: {0}")]
    Checkout(#[from] CheckoutError),
}

/// Broad category of an [`Error`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Network failure, timeout, rate limiting or a 5xx.
    Transport,
    /// Missing, invalid or expired credentials.
    Authentication,
    /// Input rejected locally or by the backend.
    Validation,
    /// Valid request refused by a business rule.
    Business,
    /// Local token storage failed.
    Storage,
    /// Bug or misconfiguration on this side.
    Internal,
}

impl Error {
    /// Category of the error.
    #[must_use]
    pub const fn kind(&self) -> ErrorKind {
        match self {
            Self::Api(api) => match api {
                ApiError::Http(_) | ApiError::RateLimited(_) => ErrorKind::Transport,
                ApiError::Status { status, .. } if *status >= 500 => ErrorKind::Transport,
                ApiError::Unauthorized(_) | ApiError::Forbidden(_) => ErrorKind::Authentication,
                ApiError::Validation(_) => ErrorKind::Validation,
                ApiError::NotFound(_) | ApiError::Status { .. } => ErrorKind::Business,
                ApiError::Parse(_) | ApiError::Url(_) => ErrorKind::Internal,
            },
            Self::NotAuthenticated => ErrorKind::Authentication,
            Self::InvalidEmail(_) | Self::WeakPassword(_) => ErrorKind::Validation,
            Self::Checkout(_) => ErrorKind::Business,
            Self::Storage(_) => ErrorKind::Storage,
            Self::Config(_) => ErrorKind::Internal,
        }
    }

    /// Whether the backend rejected the session's token.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Api(ApiError::Unauthorized(_)))
    }

    /// Message suitable for showing to a reader.
    ///
    /// Transport and internal details are replaced with generic text.
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            Self::Api(api) => match api {
                ApiError::Http(e) if e.is_timeout() => {
                    "The server took too long to respond. Please try again.".to_string()
                }
                ApiError::Http(_) => {
                    "Could not reach the server. Check your connection and try again.".to_string()
                }
                ApiError::RateLimited(secs) => {
                    format!("Too many requests. Try again in {secs} seconds.")
                }
                ApiError::Status { status, .. } if *status >= 500 => {
                    "The server encountered an error. Please try again later.".to_string()
                }
                ApiError::Unauthorized(msg) if !msg.is_empty() => sentence(msg),
                ApiError::Unauthorized(_) => {
                    "Your session has expired. Please sign in again.".to_string()
                }
                ApiError::Forbidden(_) => "You do not have permission to do that.".to_string(),
                ApiError::NotFound(msg)
                | ApiError::Validation(msg)
                | ApiError::Status { message: msg, .. } => sentence(msg),
                ApiError::Parse(_) | ApiError::Url(_) => {
                    "Something went wrong. Please try again.".to_string()
                }
            },
            Self::NotAuthenticated => "Please sign in first.".to_string(),
            Self::InvalidEmail(e) => format!("Invalid email address: {e}."),
            Self::WeakPassword(e) => sentence(&e.to_string()),
            Self::Checkout(e) => sentence(&e.to_string()),
            Self::Storage(_) => "Could not access the saved session on this device.".to_string(),
            Self::Config(e) => e.to_string(),
        }
    }

    /// Report transport and internal errors to Sentry.
    ///
    /// Other kinds are expected outcomes (bad password, locked article) and
    /// are only logged.
    pub fn report(&self) {
        if matches!(self.kind(), ErrorKind::Transport | ErrorKind::Internal) {
            let event_id = sentry::capture_error(self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Client error"
            );
        } else {
            tracing::debug!(error = %self, kind = ?self.kind(), "Client error");
        }
    }
}

/// Capitalize the first letter and end with a period.
fn sentence(msg: &str) -> String {
    let msg = msg.trim();
    let mut chars = msg.chars();
    let mut out = match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
        None => return "Something went wrong. Please try again.".to_string(),
    };
    if !out.ends_with(['.', '!', '?']) {
        out.push('.');
    }
    out
}

/// Result type alias for [`Error`].
pub type Result<T> = std::result::Result<T, Error>;
