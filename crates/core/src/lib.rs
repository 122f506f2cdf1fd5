//! Newsdesk Core - Shared types and pure logic.
//!
//! This crate provides the types used across all Newsdesk components:
//! - `client` - HTTP client, session store and services for the news backend
//! - `cli` - Command-line reader built on the client
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no HTTP
//! clients, no clocks. Anything time-dependent takes `now` as an argument so
//! it can be tested deterministically.
//!
//! # Modules
//!
//! - [`types`] - IDs, email, password policy, roles, prices, users, subscriptions
//! - [`article`] - Articles, teasers and related-article selection
//! - [`session`] - Read-only session snapshot
//! - [`access`] - Premium content gate
//! - [`checkout`] - Plans and the checkout state machine
//! - [`widgets`] - Ad carousel and image crop state

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod access;
pub mod article;
pub mod checkout;
pub mod session;
pub mod types;
pub mod widgets;

pub use access::{Access, ArticleContent, ArticleView, article_access};
pub use article::{Article, ArticleSummary, related_articles};
pub use checkout::{CheckoutError, CheckoutFlow, CheckoutReceipt, CheckoutStep, Plan};
pub use session::SessionSnapshot;
pub use types::*;
