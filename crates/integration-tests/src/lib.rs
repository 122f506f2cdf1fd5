//! Integration tests for Newsdesk.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p newsdesk-integration-tests
//! ```
//!
//! # Test Categories
//!
//! - `session_lifecycle` - Login, restore, logout, token rejection
//! - `article_gate` - Premium gate, related articles, caching
//! - `checkout_flow` - Plans, checkout, payment confirmation, activation
//!
//! Every test talks to a [`FakeBackend`]: an axum server on an ephemeral
//! port that mimics the news API, with seeded plans and articles and hooks
//! for what a back office would do (approve payments, revoke tokens).

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use chrono::{DateTime, Utc};
use newsdesk_client::{ClientConfig, ClientState, TokenStore};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

// =============================================================================
// Fake backend
// =============================================================================

/// An account on the fake backend.
#[derive(Debug, Clone)]
struct Account {
    id: i64,
    email: String,
    password: String,
    name: Option<String>,
    role: String,
}

impl Account {
    fn to_json(&self) -> Value {
        json!({
            "id": self.id,
            "email": self.email,
            "nombre": self.name,
            "rol": self.role,
        })
    }
}

/// A subscription record on the fake backend.
#[derive(Debug, Clone)]
struct SubscriptionRecord {
    id: i64,
    user_id: i64,
    plan_id: i64,
    state: &'static str,
    expires_at: Option<DateTime<Utc>>,
}

#[derive(Default)]
struct Db {
    accounts: Vec<Account>,
    tokens: HashMap<String, i64>,
    subscriptions: Vec<SubscriptionRecord>,
    plans: Vec<Value>,
    articles: Vec<Value>,
    next_id: i64,
    hits: HashMap<String, usize>,
    subscription_delay: Duration,
    outages: HashMap<String, StatusCode>,
}

impl Db {
    fn next_id(&mut self) -> i64 {
        self.next_id += 1;
        self.next_id
    }

    fn account(&self, id: i64) -> Option<&Account> {
        self.accounts.iter().find(|a| a.id == id)
    }

    fn plan_name(&self, plan_id: i64) -> Option<String> {
        self.plans
            .iter()
            .find(|p| p["id"] == plan_id)
            .and_then(|p| p["nombre"].as_str())
            .map(str::to_owned)
    }

    fn latest_subscription(&self, user_id: i64) -> Option<&SubscriptionRecord> {
        self.subscriptions.iter().rev().find(|s| s.user_id == user_id)
    }

    fn subscription_json(&self, record: &SubscriptionRecord) -> Value {
        json!({
            "id": record.id,
            "estado": record.state,
            "plan": {
                "id": record.plan_id,
                "nombre": self.plan_name(record.plan_id),
            },
            "fecha_inicio": "2025-01-01T00:00:00",
            "fecha_fin": record.expires_at.map(|t| t.to_rfc3339()),
        })
    }
}

#[derive(Clone, Default)]
struct Shared {
    db: Arc<Mutex<Db>>,
}

impl Shared {
    fn db(&self) -> MutexGuard<'_, Db> {
        self.db.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// In-process stand-in for the news backend.
///
/// The server is stopped when the value is dropped.
pub struct FakeBackend {
    addr: SocketAddr,
    shared: Shared,
    server: JoinHandle<()>,
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

impl FakeBackend {
    /// Start a backend with the seeded plans and articles.
    ///
    /// # Errors
    ///
    /// Returns an I/O error if no local port can be bound.
    pub async fn spawn() -> std::io::Result<Self> {
        let shared = Shared::default();
        seed(&mut shared.db());

        let api = Router::new()
            .route("/auth/login", post(login))
            .route("/auth/register", post(register))
            .route("/auth/me", get(me))
            .route("/subscriptions/me", get(my_subscription))
            .route("/subscriptions/status", get(subscription_status))
            .route("/subscriptions/plans", get(plans))
            .route("/subscriptions/checkout", post(checkout))
            .route("/subscriptions/payment/notify", post(notify_payment))
            .route("/noticias", get(articles))
            .route("/noticias/{id}", get(article));

        let app = Router::new()
            .nest("/api", api)
            .layer(axum::middleware::from_fn_with_state(shared.clone(), count_hits))
            .with_state(shared.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Ok(Self {
            addr,
            shared,
            server,
        })
    }

    /// Base URL of the API, including the `/api` prefix.
    #[must_use]
    pub fn url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// Client wired to this backend with the given token storage.
    ///
    /// # Panics
    ///
    /// Panics if the client cannot be built.
    #[must_use]
    #[allow(clippy::expect_used)]
    pub fn client(&self, storage: Arc<dyn TokenStore>) -> ClientState {
        let mut config = ClientConfig::new(&self.url()).expect("fake backend url is valid");
        config.http_timeout = Duration::from_secs(5);
        ClientState::with_storage(config, storage).expect("client builds")
    }

    // ─────────────────────────────────────────────────────────────────────────
    // Back-office hooks
    // ─────────────────────────────────────────────────────────────────────────

    /// Create an account directly. Returns its ID.
    pub fn add_account(&self, email: &str, password: &str, name: Option<&str>, role: &str) -> i64 {
        let mut db = self.shared.db();
        let id = db.next_id();
        db.accounts.push(Account {
            id,
            email: email.to_string(),
            password: password.to_string(),
            name: name.map(str::to_owned),
            role: role.to_string(),
        });
        id
    }

    /// Give `user_id` a subscription to `plan_id` in `state`.
    /// Returns the subscription ID.
    pub fn set_subscription(
        &self,
        user_id: i64,
        plan_id: i64,
        state: &'static str,
        expires_at: Option<DateTime<Utc>>,
    ) -> i64 {
        let mut db = self.shared.db();
        let id = db.next_id();
        db.subscriptions.push(SubscriptionRecord {
            id,
            user_id,
            plan_id,
            state,
            expires_at,
        });
        id
    }

    /// Approve the payment for a subscription, as an administrator would.
    pub fn verify_payment(&self, subscription_id: i64, expires_at: DateTime<Utc>) {
        let mut db = self.shared.db();
        if let Some(record) = db
            .subscriptions
            .iter_mut()
            .find(|s| s.id == subscription_id)
        {
            record.state = "activa";
            record.expires_at = Some(expires_at);
        }
    }

    /// Invalidate every issued token.
    pub fn revoke_tokens(&self) {
        self.shared.db().tokens.clear();
    }

    /// Number of tokens currently valid.
    #[must_use]
    pub fn live_tokens(&self) -> usize {
        self.shared.db().tokens.len()
    }

    /// Delay every subscription lookup by `delay`.
    pub fn set_subscription_delay(&self, delay: Duration) {
        self.shared.db().subscription_delay = delay;
    }

    /// Answer every request for `path` (without the `/api` prefix) with
    /// `status` until [`FakeBackend::recover`] is called.
    pub fn fail(&self, path: &str, status: StatusCode) {
        self.shared.db().outages.insert(format!("/api{path}"), status);
    }

    /// Serve `path` normally again.
    pub fn recover(&self, path: &str) {
        self.shared.db().outages.remove(&format!("/api{path}"));
    }

    /// Requests received for `path` (without the `/api` prefix).
    #[must_use]
    pub fn hits(&self, path: &str) -> usize {
        self.shared
            .db()
            .hits
            .get(&format!("/api{path}"))
            .copied()
            .unwrap_or(0)
    }
}

// =============================================================================
// Seed data
// =============================================================================

/// Plan IDs seeded on every backend.
pub const MONTHLY_PLAN: i64 = 1;
/// See [`MONTHLY_PLAN`].
pub const YEARLY_PLAN: i64 = 2;

/// Article IDs seeded on every backend.
pub mod seeded {
    /// Free politics article.
    pub const FREE_POLITICS: i64 = 101;
    /// Premium politics article, the newest politics piece.
    pub const PREMIUM_POLITICS: i64 = 102;
    /// Older free politics article.
    pub const OLD_POLITICS: i64 = 103;
    /// Free sports article, the newest article overall.
    pub const SPORTS: i64 = 104;
    /// Premium economy article.
    pub const PREMIUM_ECONOMY: i64 = 105;
    /// Body of [`PREMIUM_ECONOMY`], which has no summary.
    pub const ECONOMY_BODY: &str = "Análisis para suscriptores.";
    /// Body of [`PREMIUM_POLITICS`].
    pub const PREMIUM_BODY: &str = "Documentos internos muestran que el presupuesto se desvió.";
}

fn seed(db: &mut Db) {
    db.next_id = 1000;
    db.plans = vec![
        json!({
            "id": MONTHLY_PLAN,
            "nombre": "Mensual",
            "descripcion": "Acceso completo durante un mes",
            "precio": "4.99",
            "moneda": "usd",
            "duracion_dias": 30,
            "beneficios": ["Artículos premium", "Sin anuncios"],
        }),
        json!({
            "id": YEARLY_PLAN,
            "nombre": "Anual",
            "precio": 49.9,
            "duracion_dias": 365,
        }),
    ];
    db.articles = vec![
        json!({
            "id": seeded::FREE_POLITICS,
            "titulo": "Sesión del congreso",
            "resumen": "Resumen de la sesión",
            "contenido": "Texto libre de la sesión.",
            "categoria": "Política",
            "autor": "Ana Ruiz",
            "fecha_publicacion": "2025-03-02T09:00:00",
            "es_premium": false,
        }),
        json!({
            "id": seeded::PREMIUM_POLITICS,
            "titulo": "Investigación: el presupuesto",
            "resumen": "Lo que revelan los documentos",
            "contenido": seeded::PREMIUM_BODY,
            "categoria": "política",
            "fecha_publicacion": "2025-03-05T09:00:00Z",
            "es_premium": true,
        }),
        json!({
            "id": seeded::OLD_POLITICS,
            "titulo": "Elecciones pasadas",
            "contenido": "Archivo.",
            "categoria": "Política",
            "fecha_publicacion": "2024-11-20",
            "es_premium": false,
        }),
        json!({
            "id": seeded::SPORTS,
            "titulo": "Final del torneo",
            "contenido": "Crónica del partido.",
            "categoria": "Deportes",
            "fecha_publicacion": "2025-03-06 20:30:00",
            "es_premium": false,
        }),
        json!({
            "id": seeded::PREMIUM_ECONOMY,
            "titulo": "Mercados en alerta",
            "contenido": seeded::ECONOMY_BODY,
            "categoria": "Economía",
            "fecha_publicacion": "2025-03-01T08:00:00",
            "es_premium": true,
        }),
    ];
}

// =============================================================================
// Handlers
// =============================================================================

fn error(status: StatusCode, detail: &str) -> Response {
    (status, Json(json!({ "detail": detail }))).into_response()
}

fn bearer_user(shared: &Shared, headers: &HeaderMap) -> Result<i64, Response> {
    let token = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Not authenticated"))?;

    shared
        .db()
        .tokens
        .get(token)
        .copied()
        .ok_or_else(|| error(StatusCode::UNAUTHORIZED, "Token inválido o expirado"))
}

async fn count_hits(
    State(shared): State<Shared>,
    uri: Uri,
    request: axum::extract::Request,
    next: axum::middleware::Next,
) -> Response {
    let outage = {
        let mut db = shared.db();
        *db.hits.entry(uri.path().to_string()).or_default() += 1;
        db.outages.get(uri.path()).copied()
    };
    if let Some(status) = outage {
        return error(status, "Servicio no disponible");
    }
    next.run(request).await
}

#[derive(Deserialize)]
struct Credentials {
    email: String,
    password: String,
    #[serde(default)]
    name: Option<String>,
}

async fn login(State(shared): State<Shared>, Json(body): Json<Credentials>) -> Response {
    let mut db = shared.db();
    let Some(account) = db
        .accounts
        .iter()
        .find(|a| a.email == body.email && a.password == body.password)
        .cloned()
    else {
        return error(StatusCode::UNAUTHORIZED, "Credenciales inválidas");
    };

    let token = format!("tok-{}", db.next_id());
    db.tokens.insert(token.clone(), account.id);
    Json(json!({
        "access_token": token,
        "token_type": "bearer",
        "user": account.to_json(),
    }))
    .into_response()
}

async fn register(State(shared): State<Shared>, Json(body): Json<Credentials>) -> Response {
    let mut db = shared.db();
    if db.accounts.iter().any(|a| a.email == body.email) {
        return error(StatusCode::BAD_REQUEST, "El email ya está registrado");
    }

    let id = db.next_id();
    db.accounts.push(Account {
        id,
        email: body.email.clone(),
        password: body.password,
        name: body.name,
        role: "user".to_string(),
    });
    (
        StatusCode::CREATED,
        Json(json!({ "id": id, "email": body.email, "mensaje": "Usuario registrado" })),
    )
        .into_response()
}

async fn me(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let user_id = match bearer_user(&shared, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };
    let db = shared.db();
    match db.account(user_id) {
        Some(account) => Json(account.to_json()).into_response(),
        None => error(StatusCode::UNAUTHORIZED, "Usuario no encontrado"),
    }
}

async fn my_subscription(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let user_id = match bearer_user(&shared, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let delay = shared.db().subscription_delay;
    if !delay.is_zero() {
        tokio::time::sleep(delay).await;
    }

    let db = shared.db();
    match db.latest_subscription(user_id) {
        Some(record) => Json(db.subscription_json(record)).into_response(),
        None => error(StatusCode::NOT_FOUND, "Sin suscripción"),
    }
}

async fn subscription_status(State(shared): State<Shared>, headers: HeaderMap) -> Response {
    let user_id = match bearer_user(&shared, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let db = shared.db();
    let record = db.latest_subscription(user_id);
    let active = record.is_some_and(|r| {
        r.state == "activa" && r.expires_at.is_none_or(|end| Utc::now() < end)
    });
    Json(json!({
        "active": active,
        "subscription": record.map(|r| db.subscription_json(r)),
    }))
    .into_response()
}

async fn plans(State(shared): State<Shared>) -> Response {
    Json(Value::Array(shared.db().plans.clone())).into_response()
}

#[derive(Deserialize)]
struct CheckoutBody {
    plan_id: i64,
}

async fn checkout(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<CheckoutBody>,
) -> Response {
    let user_id = match bearer_user(&shared, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let mut db = shared.db();
    let Some(plan_name) = db.plan_name(body.plan_id) else {
        return error(StatusCode::NOT_FOUND, "Plan no encontrado");
    };

    let id = db.next_id();
    db.subscriptions.push(SubscriptionRecord {
        id,
        user_id,
        plan_id: body.plan_id,
        state: "pendiente",
        expires_at: None,
    });

    Json(json!({
        "subscription_id": id,
        "referencia_pago": format!("REF-{id}"),
        "plan": plan_name,
        "instrucciones": "Transfiera el importe indicando la referencia.",
    }))
    .into_response()
}

#[derive(Deserialize)]
struct NotifyBody {
    subscription_id: i64,
}

async fn notify_payment(
    State(shared): State<Shared>,
    headers: HeaderMap,
    Json(body): Json<NotifyBody>,
) -> Response {
    let user_id = match bearer_user(&shared, &headers) {
        Ok(id) => id,
        Err(response) => return response,
    };

    let db = shared.db();
    let owned = db
        .subscriptions
        .iter()
        .any(|s| s.id == body.subscription_id && s.user_id == user_id);
    if !owned {
        return error(StatusCode::NOT_FOUND, "Suscripción no encontrada");
    }

    Json(json!({
        "mensaje": "Pago recibido, en verificación",
        "estado": "pendiente",
    }))
    .into_response()
}

async fn articles(State(shared): State<Shared>) -> Response {
    Json(Value::Array(shared.db().articles.clone())).into_response()
}

async fn article(State(shared): State<Shared>, Path(id): Path<i64>) -> Response {
    let db = shared.db();
    match db.articles.iter().find(|a| a["id"] == id) {
        Some(article) => Json(article.clone()).into_response(),
        None => error(StatusCode::NOT_FOUND, "Noticia no encontrada"),
    }
}
