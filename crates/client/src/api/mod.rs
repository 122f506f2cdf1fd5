//! HTTP client for the news backend.
//!
//! # Architecture
//!
//! - JSON over HTTP with `reqwest`; bearer tokens are passed per call, the
//!   client itself holds no session
//! - Article responses are cached using `moka` (TTL from configuration)
//! - Error bodies (`{"detail": ...}` or `{"message": ...}`) become
//!   [`ApiError`] variants keyed on the status code

mod cache;
pub mod types;

use std::sync::Arc;

use moka::future::Cache;
use newsdesk_core::{
    Article, ArticleId, CheckoutReceipt, Email, Plan, PlanId, Subscription, SubscriptionId, User,
};
use reqwest::{RequestBuilder, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::{Serialize, de::DeserializeOwned};
use thiserror::Error;
use tracing::{debug, instrument};
use url::Url;

use crate::config::ClientConfig;
use cache::{ARTICLES_KEY, CacheValue, article_key};
pub use types::{LoginResponse, PaymentAck, RegisterResponse, SubscriptionStatus};
use types::{
    CheckoutRequest, LoginRequest, LoginWire, PaymentNotifyRequest, RegisterRequest,
    decode_status, decode_subscription,
};

const CACHE_CAPACITY: u64 = 500;

// =============================================================================
// Errors
// =============================================================================

/// Errors that can occur when calling the backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// HTTP request failed (connection, timeout, TLS).
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Token missing, invalid or expired; or credentials rejected.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Authenticated but not allowed.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// The backend rejected the request body.
    #[error("Validation failed: {0}")]
    Validation(String),

    /// Rate limited by the backend.
    #[error("Rate limited, retry after {0} seconds")]
    RateLimited(u64),

    /// Any other non-success status.
    #[error("Backend error ({status}): {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Message from the error body, or the status reason.
        message: String,
    },

    /// Response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// Endpoint URL could not be built.
    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the backend rejected the bearer token or credentials.
    #[must_use]
    pub const fn is_unauthorized(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Message from the backend's error body, when one was sent.
    #[must_use]
    pub fn backend_message(&self) -> Option<&str> {
        match self {
            Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::NotFound(msg)
            | Self::Validation(msg)
            | Self::Status { message: msg, .. } => Some(msg),
            _ => None,
        }
    }
}

// =============================================================================
// Client
// =============================================================================

/// Client for the news backend API.
///
/// Cheap to clone; clones share the connection pool and article cache.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<ApiClientInner>,
}

struct ApiClientInner {
    client: reqwest::Client,
    base_url: Url,
    cache: Cache<String, CacheValue>,
}

impl ApiClient {
    /// Create a client for the configured backend.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Http` if the HTTP client cannot be built.
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(config.http_timeout)
            .user_agent(concat!("newsdesk/", env!("CARGO_PKG_VERSION")))
            .build()?;

        let cache = Cache::builder()
            .max_capacity(CACHE_CAPACITY)
            .time_to_live(config.cache_ttl)
            .build();

        Ok(Self {
            inner: Arc::new(ApiClientInner {
                client,
                base_url: config.api_url.clone(),
                cache,
            }),
        })
    }

    /// Backend base URL.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.inner.base_url
    }

    // =========================================================================
    // Auth
    // =========================================================================

    /// Exchange credentials for a bearer token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the credentials are rejected.
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn login(
        &self,
        email: &Email,
        password: &SecretString,
    ) -> Result<LoginResponse, ApiError> {
        let body = LoginRequest {
            email: email.as_str(),
            password: password.expose_secret(),
        };
        let wire: LoginWire = self.send(self.post("auth/login", None, &body)?).await?;
        Ok(wire.into())
    }

    /// Create an account.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Validation` or `ApiError::Status` if the backend
    /// refuses the registration (e.g. email already taken).
    #[instrument(skip(self, password), fields(email = %email))]
    pub async fn register(
        &self,
        email: &Email,
        password: &SecretString,
        name: Option<&str>,
    ) -> Result<RegisterResponse, ApiError> {
        let body = RegisterRequest {
            email: email.as_str(),
            password: password.expose_secret(),
            name,
        };
        self.send(self.post("auth/register", None, &body)?).await
    }

    /// Identity behind a token.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is invalid or expired.
    #[instrument(skip_all)]
    pub async fn me(&self, token: &SecretString) -> Result<User, ApiError> {
        self.send(self.get("auth/me", Some(token))?).await
    }

    // =========================================================================
    // Subscriptions
    // =========================================================================

    /// The reader's subscription, or `None` if they have never subscribed.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip_all)]
    pub async fn my_subscription(
        &self,
        token: &SecretString,
    ) -> Result<Option<Subscription>, ApiError> {
        match self
            .send::<serde_json::Value>(self.get("subscriptions/me", Some(token))?)
            .await
        {
            Ok(value) => Ok(decode_subscription(value)?),
            Err(ApiError::NotFound(_)) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Current verification status of the reader's subscription.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip_all)]
    pub async fn subscription_status(
        &self,
        token: &SecretString,
    ) -> Result<SubscriptionStatus, ApiError> {
        match self
            .send::<serde_json::Value>(self.get("subscriptions/status", Some(token))?)
            .await
        {
            Ok(value) => Ok(decode_status(value)?),
            Err(ApiError::NotFound(_)) => Ok(SubscriptionStatus::default()),
            Err(e) => Err(e),
        }
    }

    /// Plans on offer.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or decoding failures.
    #[instrument(skip(self))]
    pub async fn plans(&self) -> Result<Vec<Plan>, ApiError> {
        self.send(self.get("subscriptions/plans", None)?).await
    }

    /// Start a checkout for `plan_id`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown plan and
    /// `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip(self, token), fields(plan_id = %plan_id))]
    pub async fn start_checkout(
        &self,
        token: &SecretString,
        plan_id: PlanId,
    ) -> Result<CheckoutReceipt, ApiError> {
        let body = CheckoutRequest { plan_id };
        self.send(self.post("subscriptions/checkout", Some(token), &body)?)
            .await
    }

    /// Tell the backend the reader has paid for `subscription_id`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` for an unknown subscription and
    /// `ApiError::Unauthorized` if the token is rejected.
    #[instrument(skip(self, token), fields(subscription_id = %subscription_id))]
    pub async fn notify_payment(
        &self,
        token: &SecretString,
        subscription_id: SubscriptionId,
    ) -> Result<PaymentAck, ApiError> {
        let body = PaymentNotifyRequest { subscription_id };
        self.send(self.post("subscriptions/payment/notify", Some(token), &body)?)
            .await
    }

    // =========================================================================
    // Articles (cached)
    // =========================================================================

    /// All published articles.
    ///
    /// # Errors
    ///
    /// Returns `ApiError` on transport or decoding failures.
    #[instrument(skip(self))]
    pub async fn articles(&self) -> Result<Vec<Article>, ApiError> {
        if let Some(CacheValue::Articles(articles)) =
            self.inner.cache.get(ARTICLES_KEY).await
        {
            debug!("Cache hit for article list");
            return Ok(articles);
        }

        let articles: Vec<Article> = self.send(self.get("noticias", None)?).await?;

        self.inner
            .cache
            .insert(
                ARTICLES_KEY.to_string(),
                CacheValue::Articles(articles.clone()),
            )
            .await;

        Ok(articles)
    }

    /// One article, including its body.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::NotFound` if the article does not exist.
    #[instrument(skip(self), fields(article_id = %id))]
    pub async fn article(&self, id: ArticleId) -> Result<Article, ApiError> {
        let cache_key = article_key(id);

        if let Some(CacheValue::Article(article)) = self.inner.cache.get(&cache_key).await {
            debug!("Cache hit for article");
            return Ok(*article);
        }

        let article: Article = self
            .send(self.get(&format!("noticias/{id}"), None)?)
            .await?;

        self.inner
            .cache
            .insert(cache_key, CacheValue::Article(Box::new(article.clone())))
            .await;

        Ok(article)
    }

    /// Drop every cached article response.
    pub async fn invalidate_cache(&self) {
        self.inner.cache.invalidate_all();
        self.inner.cache.run_pending_tasks().await;
    }

    // =========================================================================
    // Request plumbing
    // =========================================================================

    fn get(&self, path: &str, token: Option<&SecretString>) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path)?;
        Ok(with_token(self.inner.client.get(url), token))
    }

    fn post<B: Serialize>(
        &self,
        path: &str,
        token: Option<&SecretString>,
        body: &B,
    ) -> Result<RequestBuilder, ApiError> {
        let url = self.inner.base_url.join(path)?;
        Ok(with_token(self.inner.client.post(url), token).json(body))
    }

    /// Send a request and decode a JSON success body.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, ApiError> {
        let response = request.send().await?;
        let status = response.status();

        if status.is_success() {
            let bytes = response.bytes().await?;
            // Some endpoints answer 204 or an empty body for "nothing here".
            if bytes.is_empty() {
                return Ok(serde_json::from_value(serde_json::Value::Null)?);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get("Retry-After")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse().ok())
                .unwrap_or(60);
            return Err(ApiError::RateLimited(retry_after));
        }

        let text = response.text().await.unwrap_or_default();
        let message = error_message(&text)
            .unwrap_or_else(|| status.canonical_reason().unwrap_or("Unknown error").to_string());

        tracing::debug!(status = %status, message = %message, "Backend returned error");

        Err(match status {
            StatusCode::UNAUTHORIZED => ApiError::Unauthorized(message),
            StatusCode::FORBIDDEN => ApiError::Forbidden(message),
            StatusCode::NOT_FOUND => ApiError::NotFound(message),
            StatusCode::BAD_REQUEST | StatusCode::CONFLICT | StatusCode::UNPROCESSABLE_ENTITY => {
                ApiError::Validation(message)
            }
            _ => ApiError::Status {
                status: status.as_u16(),
                message,
            },
        })
    }
}

fn with_token(request: RequestBuilder, token: Option<&SecretString>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token.expose_secret()),
        None => request,
    }
}

/// Extract a human-readable message from an error body.
///
/// Accepts `{"detail": "..."}`, `{"message": "..."}`, `{"error": "..."}` and
/// validation lists of the form `{"detail": [{"msg": "..."}, ...]}`.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    let field = ["detail", "message", "mensaje", "error"]
        .iter()
        .find_map(|key| value.get(key))?;

    match field {
        serde_json::Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        serde_json::Value::Array(items) => {
            let messages: Vec<&str> = items
                .iter()
                .filter_map(|item| item.get("msg").and_then(serde_json::Value::as_str))
                .collect();
            (!messages.is_empty()).then(|| messages.join("; "))
        }
        _ => None,
    }
}
