//! Session store.
//!
//! Holds the bearer token, the signed-in user and their subscription behind
//! one `RwLock`, so readers never observe a half-applied login or logout.
//!
//! # Invariants
//!
//! - A reader is authenticated exactly when both token and user are present.
//! - Any 401 from a call made with the session's token clears the whole
//!   session, in memory and in storage.
//! - A response computed from a token is applied only if that token is
//!   still the session's token when the response arrives.

use std::sync::Arc;

use newsdesk_core::{Email, SessionSnapshot, Subscription, User, validate_password};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, info, instrument, warn};

use crate::api::{ApiClient, ApiError, RegisterResponse};
use crate::error::{Error, Result};
use crate::storage::TokenStore;
use crate::telemetry;

/// Where the reader should land after signing in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Landing {
    /// Administration area.
    Admin,
    /// Regular front page.
    Home,
}

/// Result of a successful login.
#[derive(Debug, Clone)]
pub struct LoginOutcome {
    /// Identity returned by the backend for these credentials.
    pub user: User,
    /// Subscription fetched right after login, if the fetch succeeded.
    pub subscription: Option<Subscription>,
}

impl LoginOutcome {
    /// Redirect target for the freshly signed-in user.
    #[must_use]
    pub fn landing(&self) -> Landing {
        if self.user.is_admin() {
            Landing::Admin
        } else {
            Landing::Home
        }
    }
}

#[derive(Default)]
struct SessionState {
    token: Option<SecretString>,
    user: Option<User>,
    subscription: Option<Subscription>,
    loading: bool,
}

impl SessionState {
    const fn is_authenticated(&self) -> bool {
        self.token.is_some() && self.user.is_some()
    }

    fn holds(&self, token: &SecretString) -> bool {
        self.token
            .as_ref()
            .is_some_and(|current| current.expose_secret() == token.expose_secret())
    }

    fn clear(&mut self) {
        self.token = None;
        self.user = None;
        self.subscription = None;
    }

    fn snapshot(&self) -> SessionSnapshot {
        if self.is_authenticated() {
            SessionSnapshot {
                user: self.user.clone(),
                subscription: self.subscription.clone(),
                loading: self.loading,
            }
        } else {
            SessionSnapshot {
                loading: self.loading,
                ..SessionSnapshot::anonymous()
            }
        }
    }
}

/// The reader's session.
///
/// Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionStore {
    inner: Arc<SessionStoreInner>,
}

struct SessionStoreInner {
    api: ApiClient,
    storage: Arc<dyn TokenStore>,
    state: RwLock<SessionState>,
}

impl SessionStore {
    /// Create an empty session backed by `storage`.
    ///
    /// Call [`SessionStore::restore`] to pick up a token from a previous run.
    #[must_use]
    pub fn new(api: ApiClient, storage: Arc<dyn TokenStore>) -> Self {
        Self {
            inner: Arc::new(SessionStoreInner {
                api,
                storage,
                state: RwLock::new(SessionState::default()),
            }),
        }
    }

    /// API client the session talks to.
    #[must_use]
    pub fn api(&self) -> &ApiClient {
        &self.inner.api
    }

    // =========================================================================
    // Lifecycle
    // =========================================================================

    /// Verify a persisted token and hydrate the session from it.
    ///
    /// Any failure (unreadable storage, network error, rejected token)
    /// leaves the session empty and removes the stored token. The loading
    /// flag is set for the duration of the call.
    #[instrument(skip(self))]
    pub async fn restore(&self) -> SessionSnapshot {
        self.inner.state.write().await.loading = true;

        let token = match self.inner.storage.load() {
            Ok(Some(token)) => token,
            Ok(None) => {
                debug!("No stored session");
                return self.finish_loading().await;
            }
            Err(e) => {
                warn!(error = %e, "Could not read stored session");
                self.discard_stored_token();
                return self.finish_loading().await;
            }
        };

        let user = match self.inner.api.me(&token).await {
            Ok(user) => user,
            Err(e) => {
                if e.is_unauthorized() {
                    info!("Stored session token was rejected");
                } else {
                    warn!(error = %e, "Could not verify stored session");
                }
                let mut state = self.inner.state.write().await;
                // A login that completed meanwhile owns the session now.
                if state.token.is_none() {
                    state.clear();
                    self.discard_stored_token();
                }
                state.loading = false;
                return state.snapshot();
            }
        };

        {
            let mut state = self.inner.state.write().await;
            if state.token.is_some() {
                debug!("Session was replaced while restoring; keeping the newer one");
                state.loading = false;
                return state.snapshot();
            }
            state.token = Some(token.clone());
            state.user = Some(user.clone());
            state.subscription = None;
        }

        telemetry::set_sentry_user(&user.id, Some(&user.email));
        info!(user_id = %user.id, "Session restored");

        if let Err(e) = self.fetch_subscription(&token).await {
            warn!(error = %e, "Could not load subscription while restoring");
        }

        self.finish_loading().await
    }

    /// Sign in.
    ///
    /// On success the token is persisted, the session holds the user the
    /// backend returned, and the subscription is fetched. The returned
    /// outcome carries that same user for role-based redirects.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidEmail` or `Error::WeakPassword` for input that
    /// fails local checks, `Error::Api` if the backend rejects the
    /// credentials, and `Error::Storage` if the token cannot be persisted.
    /// The previous session is untouched on error.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(&self, email: &str, password: &SecretString) -> Result<LoginOutcome> {
        let email = Email::parse(email)?;
        if password.expose_secret().is_empty() {
            return Err(newsdesk_core::PasswordError::Empty.into());
        }

        let response = self.inner.api.login(&email, password).await?;
        let token = response.access_token;
        let user = response.user;

        self.establish(&token, &user).await?;

        telemetry::set_sentry_user(&user.id, Some(&user.email));
        telemetry::add_breadcrumb("auth", "Signed in", None);
        info!(user_id = %user.id, admin = user.is_admin(), "Signed in");

        let subscription = match self.fetch_subscription(&token).await {
            Ok(subscription) => subscription,
            Err(e) => {
                warn!(error = %e, "Could not load subscription after login");
                None
            }
        };

        Ok(LoginOutcome { user, subscription })
    }

    /// Create an account. Does not sign in.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidEmail` or `Error::WeakPassword` before any
    /// network call, or `Error::Api` if the backend refuses the account.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        email: &str,
        password: &SecretString,
        name: Option<&str>,
    ) -> Result<RegisterResponse> {
        let email = Email::parse(email)?;
        validate_password(password.expose_secret())?;
        let name = name.map(str::trim).filter(|n| !n.is_empty());

        let response = self.inner.api.register(&email, password, name).await?;
        info!("Account registered");
        Ok(response)
    }

    /// Sign out. Memory is cleared before storage.
    ///
    /// # Errors
    ///
    /// Returns `Error::Storage` if the stored token cannot be removed. The
    /// in-memory session is already empty at that point.
    #[instrument(skip(self))]
    pub async fn logout(&self) -> Result<()> {
        let mut state = self.inner.state.write().await;
        state.clear();
        let cleared = self.inner.storage.clear();
        drop(state);

        telemetry::clear_sentry_user();
        cleared?;
        info!("Signed out");
        Ok(())
    }

    /// Re-fetch the subscription.
    ///
    /// Concurrent refreshes are not ordered; the last one to complete wins.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotAuthenticated` without a session, and `Error::Api`
    /// if the fetch fails. A 401 also ends the session.
    #[instrument(skip(self))]
    pub async fn refresh_subscription(&self) -> Result<Option<Subscription>> {
        let token = self.bearer().await.ok_or(Error::NotAuthenticated)?;
        self.fetch_subscription(&token).await
    }

    // =========================================================================
    // Reads
    // =========================================================================

    /// Immutable copy of the session, without the token.
    pub async fn snapshot(&self) -> SessionSnapshot {
        self.inner.state.read().await.snapshot()
    }

    /// Whether both a token and a user are present.
    pub async fn is_authenticated(&self) -> bool {
        self.inner.state.read().await.is_authenticated()
    }

    /// Whether the signed-in user has the admin role.
    pub async fn is_admin(&self) -> bool {
        self.snapshot().await.is_admin()
    }

    /// Whether [`SessionStore::restore`] is running.
    pub async fn is_loading(&self) -> bool {
        self.inner.state.read().await.loading
    }

    /// Signed-in user.
    pub async fn current_user(&self) -> Option<User> {
        self.snapshot().await.user
    }

    /// Latest known subscription.
    pub async fn subscription(&self) -> Option<Subscription> {
        self.snapshot().await.subscription
    }

    // =========================================================================
    // Crate-internal
    // =========================================================================

    /// Token for authenticated calls, if signed in.
    pub(crate) async fn bearer(&self) -> Option<SecretString> {
        let state = self.inner.state.read().await;
        if state.is_authenticated() {
            state.token.clone()
        } else {
            None
        }
    }

    /// Store a subscription computed from `token` if the session still holds
    /// that token.
    pub(crate) async fn apply_subscription(
        &self,
        token: &SecretString,
        subscription: Option<Subscription>,
    ) -> bool {
        let mut state = self.inner.state.write().await;
        if state.holds(token) {
            state.subscription = subscription;
            true
        } else {
            debug!("Discarding subscription for a replaced session");
            false
        }
    }

    /// End the session if `error` says `token` was rejected.
    pub(crate) async fn handle_rejection(&self, token: &SecretString, error: &ApiError) {
        if !error.is_unauthorized() {
            return;
        }
        let mut state = self.inner.state.write().await;
        if state.holds(token) {
            info!("Session token was rejected; signing out");
            state.clear();
            self.discard_stored_token();
            drop(state);
            telemetry::clear_sentry_user();
        }
    }

    /// Make `token` and `user` the current session.
    ///
    /// Storage is written under the state lock, so the stored token always
    /// belongs to the session held in memory.
    async fn establish(&self, token: &SecretString, user: &User) -> Result<()> {
        let mut state = self.inner.state.write().await;
        self.inner.storage.save(token)?;
        state.token = Some(token.clone());
        state.user = Some(user.clone());
        state.subscription = None;
        Ok(())
    }

    async fn fetch_subscription(&self, token: &SecretString) -> Result<Option<Subscription>> {
        match self.inner.api.my_subscription(token).await {
            Ok(subscription) => {
                self.apply_subscription(token, subscription.clone()).await;
                Ok(subscription)
            }
            Err(e) => {
                self.handle_rejection(token, &e).await;
                Err(e.into())
            }
        }
    }

    async fn finish_loading(&self) -> SessionSnapshot {
        let mut state = self.inner.state.write().await;
        state.loading = false;
        state.snapshot()
    }

    fn discard_stored_token(&self) {
        if let Err(e) = self.inner.storage.clear() {
            warn!(error = %e, "Could not remove stored session token");
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::ClientConfig;
    use crate::storage::{MemoryTokenStore, StorageError};

    /// Session pointed at a port nothing listens on.
    fn offline_session(storage: Arc<MemoryTokenStore>) -> SessionStore {
        let mut config = ClientConfig::new("http://127.0.0.1:9").unwrap();
        config.http_timeout = std::time::Duration::from_millis(500);
        SessionStore::new(ApiClient::new(&config).unwrap(), storage)
    }

    #[tokio::test]
    async fn test_new_session_is_empty() {
        let session = offline_session(Arc::new(MemoryTokenStore::new()));
        assert!(!session.is_authenticated().await);
        assert!(!session.is_admin().await);
        assert!(!session.is_loading().await);
        assert!(session.current_user().await.is_none());
        assert!(session.bearer().await.is_none());
    }

    #[tokio::test]
    async fn test_restore_without_token() {
        let session = offline_session(Arc::new(MemoryTokenStore::new()));
        let snapshot = session.restore().await;
        assert!(!snapshot.is_authenticated());
        assert!(!snapshot.loading);
    }

    #[tokio::test]
    async fn test_restore_network_failure_clears_everything() {
        let storage = Arc::new(MemoryTokenStore::with_token("stale"));
        let session = offline_session(Arc::clone(&storage));

        let snapshot = session.restore().await;

        assert!(!snapshot.is_authenticated());
        assert!(!snapshot.loading);
        assert!(storage.load().unwrap().is_none());
    }

    #[tokio::test]
    async fn test_refresh_requires_session() {
        let session = offline_session(Arc::new(MemoryTokenStore::new()));
        let err = session.refresh_subscription().await.unwrap_err();
        assert!(matches!(err, Error::NotAuthenticated));
    }

    #[tokio::test]
    async fn test_login_rejects_bad_email_before_network() {
        let session = offline_session(Arc::new(MemoryTokenStore::new()));
        let err = session
            .login("not-an-email", &SecretString::from("whatever1"))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn test_register_enforces_password_policy() {
        let session = offline_session(Arc::new(MemoryTokenStore::new()));
        let err = session
            .register("new@example.com", &SecretString::from("short"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, Error::WeakPassword(_)));
    }

    #[tokio::test]
    async fn test_logout_clears_storage() {
        let storage = Arc::new(MemoryTokenStore::with_token("tok"));
        let session = offline_session(Arc::clone(&storage));
        session.logout().await.unwrap();
        assert!(storage.load().unwrap().is_none());
        assert!(!session.is_authenticated().await);
    }

    #[tokio::test]
    async fn test_stale_subscription_is_discarded() {
        let session = offline_session(Arc::new(MemoryTokenStore::new()));
        {
            let mut state = session.inner.state.write().await;
            state.token = Some(SecretString::from("new"));
        }
        let applied = session
            .apply_subscription(&SecretString::from("old"), Some(Subscription::default()))
            .await;
        assert!(!applied);
        assert!(session.inner.state.read().await.subscription.is_none());
    }

    /// Token store that is slow to write.
    #[derive(Default)]
    struct SlowStore {
        inner: MemoryTokenStore,
    }

    impl TokenStore for SlowStore {
        fn load(&self) -> std::result::Result<Option<SecretString>, StorageError> {
            self.inner.load()
        }

        fn save(&self, token: &SecretString) -> std::result::Result<(), StorageError> {
            std::thread::sleep(std::time::Duration::from_millis(20));
            self.inner.save(token)
        }

        fn clear(&self) -> std::result::Result<(), StorageError> {
            self.inner.clear()
        }
    }

    fn user(id: i64, email: &str) -> User {
        User {
            id: newsdesk_core::UserId::new(id),
            email: email.to_string(),
            name: None,
            role: newsdesk_core::Role::from("user"),
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_sign_ins_keep_storage_and_memory_together() {
        let storage = Arc::new(SlowStore::default());
        let mut config = ClientConfig::new("http://127.0.0.1:9").unwrap();
        config.http_timeout = std::time::Duration::from_millis(500);
        let session = SessionStore::new(ApiClient::new(&config).unwrap(), storage.clone());

        for _ in 0..10 {
            let (a, b) = (session.clone(), session.clone());
            let (ra, rb) = tokio::join!(
                tokio::spawn(async move {
                    a.establish(&SecretString::from("tok-a"), &user(1, "a@example.com"))
                        .await
                }),
                tokio::spawn(async move {
                    b.establish(&SecretString::from("tok-b"), &user(2, "b@example.com"))
                        .await
                }),
            );
            ra.unwrap().unwrap();
            rb.unwrap().unwrap();

            let stored = storage.load().unwrap().unwrap();
            let held = session.bearer().await.unwrap();
            assert_eq!(stored.expose_secret(), held.expose_secret());
            let expected = if held.expose_secret() == "tok-a" { 1 } else { 2 };
            assert_eq!(
                session.current_user().await.unwrap().id,
                newsdesk_core::UserId::new(expected)
            );
        }
    }

    #[tokio::test]
    async fn test_failed_save_leaves_session_untouched() {
        struct BrokenStore;

        impl TokenStore for BrokenStore {
            fn load(&self) -> std::result::Result<Option<SecretString>, StorageError> {
                Ok(None)
            }

            fn save(&self, _token: &SecretString) -> std::result::Result<(), StorageError> {
                Err(StorageError::Poisoned)
            }

            fn clear(&self) -> std::result::Result<(), StorageError> {
                Ok(())
            }
        }

        let config = ClientConfig::new("http://127.0.0.1:9").unwrap();
        let session = SessionStore::new(ApiClient::new(&config).unwrap(), Arc::new(BrokenStore));

        let err = session
            .establish(&SecretString::from("tok"), &user(1, "a@example.com"))
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Storage(_)));
        assert!(!session.is_authenticated().await);
    }

    #[test]
    fn test_landing_follows_role() {
        let outcome = |role: &str| LoginOutcome {
            user: User {
                id: newsdesk_core::UserId::new(1),
                email: "a@example.com".to_string(),
                name: None,
                role: newsdesk_core::Role::from(role),
            },
            subscription: None,
        };
        assert_eq!(outcome("admin").landing(), Landing::Admin);
        assert_eq!(outcome("ADMIN").landing(), Landing::Admin);
        assert_eq!(outcome("Admin").landing(), Landing::Home);
        assert_eq!(outcome("user").landing(), Landing::Home);
    }
}
