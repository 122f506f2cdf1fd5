//! Newsdesk client library.
//!
//! Talks to the news backend on behalf of one reader: keeps their session,
//! gates premium articles on their subscription and drives plan checkout.
//!
//! # Modules
//!
//! - [`config`] - Environment-based configuration
//! - [`api`] - HTTP client for the backend, with an article cache
//! - [`storage`] - Persisted session token
//! - [`session`] - Session store (token, user, subscription)
//! - [`articles`] - Article listing and gated detail views
//! - [`checkout`] - Plan selection, checkout and payment confirmation
//! - [`error`] - Error taxonomy and user-facing messages
//! - [`telemetry`] - Tracing and Sentry setup
//! - [`state`] - Wiring of the above

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod articles;
pub mod checkout;
pub mod config;
pub mod error;
pub mod session;
pub mod state;
pub mod storage;
pub mod telemetry;

pub use api::{ApiClient, ApiError};
pub use articles::{ArticleDetail, ArticleService};
pub use checkout::CheckoutService;
pub use config::{ClientConfig, ConfigError};
pub use error::{Error, ErrorKind, Result};
pub use session::{Landing, LoginOutcome, SessionStore};
pub use state::ClientState;
pub use storage::{FileTokenStore, MemoryTokenStore, StorageError, TokenStore};
