//! Password policy applied before a registration request leaves the client.
//!
//! The backend enforces its own rules; checking locally gives the reader an
//! immediate message instead of a round-trip.

/// Minimum password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// Maximum password length.
pub const MAX_PASSWORD_LENGTH: usize = 128;

/// Reasons a password fails the policy.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum PasswordError {
    /// No password was entered.
    #[error("password is required")]
    Empty,
    /// Shorter than [`MIN_PASSWORD_LENGTH`].
    #[error("password must be at least {min} characters")]
    TooShort {
        /// Minimum allowed length.
        min: usize,
    },
    /// Longer than [`MAX_PASSWORD_LENGTH`].
    #[error("password must be at most {max} characters")]
    TooLong {
        /// Maximum allowed length.
        max: usize,
    },
    /// No alphabetic character.
    #[error("password must contain at least one letter")]
    MissingLetter,
    /// No digit.
    #[error("password must contain at least one number")]
    MissingDigit,
}

/// Check a new password against the registration policy.
///
/// Length is counted in characters, not bytes.
///
/// # Errors
///
/// Returns the first [`PasswordError`] that applies.
pub fn validate_password(password: &str) -> Result<(), PasswordError> {
    let len = password.chars().count();
    if len == 0 {
        return Err(PasswordError::Empty);
    }
    if len < MIN_PASSWORD_LENGTH {
        return Err(PasswordError::TooShort {
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if len > MAX_PASSWORD_LENGTH {
        return Err(PasswordError::TooLong {
            max: MAX_PASSWORD_LENGTH,
        });
    }
    if !password.chars().any(char::is_alphabetic) {
        return Err(PasswordError::MissingLetter);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(PasswordError::MissingDigit);
    }
    Ok(())
}
