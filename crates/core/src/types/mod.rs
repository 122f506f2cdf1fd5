//! Core types for Newsdesk.
//!
//! This module provides type-safe wrappers and backend record mirrors.

pub mod email;
pub mod id;
pub mod password;
pub mod price;
pub mod role;
pub mod subscription;
pub mod timestamp;
pub mod user;

pub use email::{Email, EmailError};
pub use id::*;
pub use password::{PasswordError, validate_password};
pub use price::Price;
pub use role::Role;
pub use subscription::{PlanRef, Subscription, SubscriptionState};
pub use user::User;
