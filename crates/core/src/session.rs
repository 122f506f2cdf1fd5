//! Read-only view of the reader's session.

use chrono::{DateTime, Utc};

use crate::types::{Subscription, User};

/// Immutable copy of the session for rendering and access decisions.
///
/// Never carries the bearer token. A snapshot has a user only when the store
/// it came from holds both a token and a user, so `user.is_some()` is the
/// authentication test.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionSnapshot {
    /// Signed-in user.
    pub user: Option<User>,
    /// Latest subscription status.
    pub subscription: Option<Subscription>,
    /// Whether a startup token verification is still running.
    pub loading: bool,
}

impl SessionSnapshot {
    /// Snapshot of a signed-out reader.
    #[must_use]
    pub fn anonymous() -> Self {
        Self::default()
    }

    /// Snapshot of a signed-in reader.
    #[must_use]
    pub const fn signed_in(user: User, subscription: Option<Subscription>) -> Self {
        Self {
            user: Some(user),
            subscription,
            loading: false,
        }
    }

    /// Whether a user is signed in.
    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        self.user.is_some()
    }

    /// Whether the signed-in user is an administrator.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.user.as_ref().is_some_and(User::is_admin)
    }

    /// Whether the subscription unlocks premium content at `now`.
    #[must_use]
    pub fn has_active_subscription(&self, now: DateTime<Utc>) -> bool {
        self.is_authenticated()
            && self
                .subscription
                .as_ref()
                .is_some_and(|sub| sub.is_active_at(now))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Role, SubscriptionState, UserId};

    fn user(role: &str) -> User {
        User {
            id: UserId::new(1),
            email: "r@example.com".to_string(),
            name: None,
            role: Role::from(role),
        }
    }

    #[test]
    fn test_anonymous() {
        let snap = SessionSnapshot::anonymous();
        assert!(!snap.is_authenticated());
        assert!(!snap.is_admin());
        assert!(!snap.has_active_subscription(Utc::now()));
    }

    #[test]
    fn test_admin_flag_follows_role() {
        assert!(SessionSnapshot::signed_in(user("admin"), None).is_admin());
        assert!(!SessionSnapshot::signed_in(user("Admin"), None).is_admin());
    }

    #[test]
    fn test_subscription_without_user_does_not_count() {
        let snap = SessionSnapshot {
            user: None,
            subscription: Some(Subscription {
                state: SubscriptionState::Active,
                ..Subscription::default()
            }),
            loading: false,
        };
        assert!(!snap.has_active_subscription(Utc::now()));
    }
}
