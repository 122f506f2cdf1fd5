//! Command implementations.

pub mod account;
pub mod articles;
pub mod subscription;

use std::io::{BufRead, Write};

use secrecy::SecretString;

/// Password from the flag/env value, or one line read from stdin.
///
/// An unreadable stdin yields an empty password, which login and register
/// reject with a "password is required" message.
fn read_password(given: Option<String>) -> SecretString {
    if let Some(password) = given {
        return SecretString::from(password);
    }

    let mut stderr = std::io::stderr().lock();
    let _ = write!(stderr, "Password: ");
    let _ = stderr.flush();

    let mut line = String::new();
    if std::io::stdin().lock().read_line(&mut line).is_err() {
        line.clear();
    }
    SecretString::from(line.trim_end_matches(['\r', '\n']).to_string())
}
