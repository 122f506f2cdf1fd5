//! User roles as reported by the backend.

use core::fmt;

use serde::{Deserialize, Serialize};

/// A role string from the backend's user record.
///
/// The backend has emitted the administrator role both as `"admin"` and as
/// `"ADMIN"`. Only those two spellings grant admin status; other casings such
/// as `"Admin"` do not.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(transparent)]
pub struct Role(String);

impl Role {
    /// The regular reader role.
    pub const USER: &'static str = "user";

    /// Create a role from its wire value.
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self(role.into())
    }

    /// The role as sent by the backend.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether this role grants access to the admin area.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        matches!(self.0.as_str(), "admin" | "ADMIN")
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Role {
    fn from(role: &str) -> Self {
        Self::new(role)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_admin_spellings() {
        assert!(Role::from("admin").is_admin());
        assert!(Role::from("ADMIN").is_admin());
    }

    #[test]
    fn test_other_casings_are_not_admin() {
        for role in ["Admin", "aDmIn", "administrator", " admin", "user", ""] {
            assert!(!Role::from(role).is_admin(), "{role:?} must not be admin");
        }
    }

    #[test]
    fn test_default_is_empty() {
        assert_eq!(Role::default().as_str(), "");
    }
}
