//! Authenticated user identity.

use serde::{Deserialize, Serialize};

use super::{Role, UserId};

/// A user as returned by `/auth/me` and `/auth/login`.
///
/// The email is kept as the backend sent it rather than re-validated; the
/// server is the authority on accounts it created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Backend user ID.
    pub id: UserId,
    /// Account email.
    pub email: String,
    /// Display name, if the reader set one.
    #[serde(default, alias = "nombre", alias = "full_name")]
    pub name: Option<String>,
    /// Role string (`"user"`, `"admin"`, ...).
    #[serde(default, alias = "rol")]
    pub role: Role,
}

impl User {
    /// Whether the user may enter the admin area.
    #[must_use]
    pub fn is_admin(&self) -> bool {
        self.role.is_admin()
    }

    /// Name to greet the user with, falling back to the email.
    #[must_use]
    pub fn display_name(&self) -> &str {
        self.name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .unwrap_or(&self.email)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_spanish_fields() {
        let user: User = serde_json::from_str(
            r#"{"id": 4, "email": "ana@example.com", "nombre": "Ana", "rol": "ADMIN"}"#,
        )
        .unwrap();
        assert_eq!(user.id, UserId::new(4));
        assert_eq!(user.display_name(), "Ana");
        assert!(user.is_admin());
    }

    #[test]
    fn test_missing_role_is_not_admin() {
        let user: User =
            serde_json::from_str(r#"{"id": 1, "email": "x@example.com"}"#).unwrap();
        assert!(!user.is_admin());
        assert_eq!(user.display_name(), "x@example.com");
    }

    #[test]
    fn test_blank_name_falls_back_to_email() {
        let user = User {
            id: UserId::new(2),
            email: "b@example.com".to_string(),
            name: Some("  ".to_string()),
            role: Role::from("user"),
        };
        assert_eq!(user.display_name(), "b@example.com");
    }
}
