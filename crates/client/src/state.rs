//! Wiring of the client components.

use std::sync::Arc;

use crate::api::ApiClient;
use crate::articles::ArticleService;
use crate::checkout::CheckoutService;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::session::SessionStore;
use crate::storage::{FileTokenStore, TokenStore};

/// Everything a front end needs, sharing one API client and one session.
///
/// Cheaply cloneable via `Arc`.
#[derive(Clone)]
pub struct ClientState {
    inner: Arc<ClientStateInner>,
}

struct ClientStateInner {
    config: ClientConfig,
    session: SessionStore,
    articles: ArticleService,
    checkout: CheckoutService,
}

impl ClientState {
    /// Build the client with file-backed token storage.
    ///
    /// # Errors
    ///
    /// Returns `Error::Config` if no data directory can be determined, or
    /// `Error::Api` if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let storage = FileTokenStore::new(&config.resolve_data_dir()?);
        Self::with_storage(config, Arc::new(storage))
    }

    /// Build the client with the given token storage.
    ///
    /// # Errors
    ///
    /// Returns `Error::Api` if the HTTP client cannot be built.
    pub fn with_storage(config: ClientConfig, storage: Arc<dyn TokenStore>) -> Result<Self> {
        let api = ApiClient::new(&config)?;
        let session = SessionStore::new(api, storage);
        let articles = ArticleService::new(session.clone(), config.related_limit);
        let checkout = CheckoutService::new(session.clone());

        Ok(Self {
            inner: Arc::new(ClientStateInner {
                config,
                session,
                articles,
                checkout,
            }),
        })
    }

    /// Configuration the client was built from.
    #[must_use]
    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// The reader's session.
    #[must_use]
    pub fn session(&self) -> &SessionStore {
        &self.inner.session
    }

    /// Article listing and detail.
    #[must_use]
    pub fn articles(&self) -> &ArticleService {
        &self.inner.articles
    }

    /// Subscription checkout.
    #[must_use]
    pub fn checkout(&self) -> &CheckoutService {
        &self.inner.checkout
    }
}
