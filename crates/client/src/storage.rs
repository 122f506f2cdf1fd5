//! Durable storage for the session token.
//!
//! Only the bearer token is persisted. It lives under the key
//! [`TOKEN_KEY`] in a small JSON file, readable by the owner only.

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;
use tracing::debug;

/// Storage key for the bearer token.
pub const TOKEN_KEY: &str = "newsdesk_token";

/// File name inside the data directory.
pub const SESSION_FILE: &str = "session.json";

/// Errors from token storage.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Reading or writing the session file failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The session file is not valid JSON.
    #[error("Corrupt session file: {0}")]
    Corrupt(#[from] serde_json::Error),

    /// A lock guarding in-memory storage was poisoned.
    #[error("Token storage lock poisoned")]
    Poisoned,
}

/// Where the session token is kept between runs.
pub trait TokenStore: Send + Sync {
    /// Read the stored token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be read.
    fn load(&self) -> Result<Option<SecretString>, StorageError>;

    /// Replace the stored token.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn save(&self, token: &SecretString) -> Result<(), StorageError>;

    /// Remove the stored token. Removing a missing token is not an error.
    ///
    /// # Errors
    ///
    /// Returns `StorageError` if the backing store cannot be written.
    fn clear(&self) -> Result<(), StorageError>;
}

// ─────────────────────────────────────────────────────────────────────────────
// File storage
// ─────────────────────────────────────────────────────────────────────────────

/// Token storage in `<data_dir>/session.json`.
///
/// The file is a JSON object; keys other than [`TOKEN_KEY`] are preserved.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
}

impl FileTokenStore {
    /// Storage inside `data_dir`. The directory is created on first save.
    #[must_use]
    pub fn new(data_dir: &Path) -> Self {
        Self {
            path: data_dir.join(SESSION_FILE),
        }
    }

    /// Path of the session file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_map(&self) -> Result<BTreeMap<String, serde_json::Value>, StorageError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_map(&self, map: &BTreeMap<String, serde_json::Value>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }

        // Write beside the target, then rename over it.
        let tmp = self.path.with_extension("json.tmp");
        {
            let mut file = open_private(&tmp)?;
            file.write_all(&serde_json::to_vec_pretty(map)?)?;
            file.sync_all()?;
        }
        fs::rename(&tmp, &self.path)?;
        Ok(())
    }
}

impl TokenStore for FileTokenStore {
    fn load(&self) -> Result<Option<SecretString>, StorageError> {
        let token = self
            .read_map()?
            .remove(TOKEN_KEY)
            .and_then(|value| value.as_str().map(str::to_owned))
            .filter(|token| !token.is_empty())
            .map(SecretString::from);
        Ok(token)
    }

    fn save(&self, token: &SecretString) -> Result<(), StorageError> {
        let mut map = self.read_map().unwrap_or_default();
        map.insert(
            TOKEN_KEY.to_string(),
            serde_json::Value::String(token.expose_secret().to_string()),
        );
        self.write_map(&map)?;
        debug!(path = %self.path.display(), "Saved session token");
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        let mut map = match self.read_map() {
            Ok(map) => map,
            // An unreadable file cannot hold a usable token; start over.
            Err(StorageError::Corrupt(_)) => BTreeMap::new(),
            Err(e) => return Err(e),
        };

        if map.remove(TOKEN_KEY).is_none() && self.path.exists() && !map.is_empty() {
            return Ok(());
        }

        if map.is_empty() {
            match fs::remove_file(&self.path) {
                Ok(()) => {}
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => return Err(e.into()),
            }
        } else {
            self.write_map(&map)?;
        }
        debug!(path = %self.path.display(), "Cleared session token");
        Ok(())
    }
}

#[cfg(unix)]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    use std::os::unix::fs::OpenOptionsExt;

    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .mode(0o600)
        .open(path)
}

#[cfg(not(unix))]
fn open_private(path: &Path) -> std::io::Result<fs::File> {
    fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(true)
        .open(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Memory storage
// ─────────────────────────────────────────────────────────────────────────────

/// Token storage that lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryTokenStore {
    token: Mutex<Option<SecretString>>,
}

impl MemoryTokenStore {
    /// Empty storage.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Storage pre-seeded with `token`.
    #[must_use]
    pub fn with_token(token: impl Into<String>) -> Self {
        Self {
            token: Mutex::new(Some(SecretString::from(token.into()))),
        }
    }
}

impl TokenStore for MemoryTokenStore {
    fn load(&self) -> Result<Option<SecretString>, StorageError> {
        Ok(self.token.lock().map_err(|_| StorageError::Poisoned)?.clone())
    }

    fn save(&self, token: &SecretString) -> Result<(), StorageError> {
        *self.token.lock().map_err(|_| StorageError::Poisoned)? = Some(token.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), StorageError> {
        *self.token.lock().map_err(|_| StorageError::Poisoned)? = None;
        Ok(())
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn test_missing_file_loads_nothing() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path());
        assert!(store.load().unwrap().is_none());
        store.clear().unwrap();
    }

    #[test]
    fn test_save_load_clear() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(&dir.path().join("nested"));

        store.save(&SecretString::from("tok-1")).unwrap();
        assert_eq!(store.load().unwrap().unwrap().expose_secret(), "tok-1");

        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains(TOKEN_KEY));

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[test]
    fn test_clear_preserves_other_keys() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path());
        fs::write(
            store.path(),
            r#"{"newsdesk_token": "tok", "theme": "dark"}"#,
        )
        .unwrap();

        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
        let raw = fs::read_to_string(store.path()).unwrap();
        assert!(raw.contains("theme"));
    }

    #[test]
    fn test_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path());
        fs::write(store.path(), "not json").unwrap();

        assert!(matches!(store.load(), Err(StorageError::Corrupt(_))));
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }

    #[cfg(unix)]
    #[test]
    fn test_file_is_owner_only() {
        use std::os::unix::fs::PermissionsExt;

        let dir = TempDir::new().unwrap();
        let store = FileTokenStore::new(dir.path());
        store.save(&SecretString::from("tok")).unwrap();

        let mode = fs::metadata(store.path()).unwrap().permissions().mode();
        assert_eq!(mode & 0o777, 0o600);
    }

    #[test]
    fn test_memory_store() {
        let store = MemoryTokenStore::with_token("seed");
        assert_eq!(store.load().unwrap().unwrap().expose_secret(), "seed");
        store.clear().unwrap();
        assert!(store.load().unwrap().is_none());
    }
}
