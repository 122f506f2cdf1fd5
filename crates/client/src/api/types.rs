//! Request and response bodies for the backend API.
//!
//! Domain records (`User`, `Subscription`, `Plan`, ...) live in
//! `newsdesk-core`; this module only holds the envelopes around them.

use newsdesk_core::{Subscription, SubscriptionState, User, UserId};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};

// ─────────────────────────────────────────────────────────────────────────────
// Requests
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
pub(crate) struct LoginRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
}

/// Account registration payload.
#[derive(Debug, Serialize)]
pub(crate) struct RegisterRequest<'a> {
    pub email: &'a str,
    pub password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct CheckoutRequest {
    pub plan_id: newsdesk_core::PlanId,
}

#[derive(Debug, Serialize)]
pub(crate) struct PaymentNotifyRequest {
    pub subscription_id: newsdesk_core::SubscriptionId,
}

// ─────────────────────────────────────────────────────────────────────────────
// Responses
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub(crate) struct LoginWire {
    #[serde(alias = "token")]
    pub access_token: String,
    #[serde(alias = "usuario")]
    pub user: User,
}

/// Successful login: the bearer token and the identity it belongs to.
#[derive(Debug, Clone)]
pub struct LoginResponse {
    /// Bearer token for authenticated calls.
    pub access_token: SecretString,
    /// Identity returned by the backend.
    pub user: User,
}

impl From<LoginWire> for LoginResponse {
    fn from(wire: LoginWire) -> Self {
        Self {
            access_token: SecretString::from(wire.access_token),
            user: wire.user,
        }
    }
}

/// Backend confirmation of a new account.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterResponse {
    /// ID of the created account, when the backend returns it.
    #[serde(default)]
    pub id: Option<UserId>,
    /// Email of the created account.
    #[serde(default)]
    pub email: Option<String>,
    /// Human-readable confirmation.
    #[serde(default, alias = "mensaje")]
    pub message: Option<String>,
}

/// Acknowledgement of a payment notification.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct PaymentAck {
    /// Human-readable confirmation.
    #[serde(default, alias = "mensaje")]
    pub message: Option<String>,
    /// Subscription state after the notification, if reported.
    #[serde(default, alias = "estado", alias = "state")]
    pub status: Option<SubscriptionState>,
}

/// Answer of `GET /subscriptions/status`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubscriptionStatus {
    /// Backend's own verdict, when it sends one.
    pub active: Option<bool>,
    /// The subscription record, if any.
    pub subscription: Option<Subscription>,
}

impl SubscriptionStatus {
    /// Collapse into a single record.
    ///
    /// The backend's `active` flag wins over the record's state. A record
    /// whose `expires_at` has passed stays locked either way.
    #[must_use]
    pub fn into_subscription(self) -> Option<Subscription> {
        match (self.active, self.subscription) {
            (Some(true), None) => Some(Subscription {
                state: SubscriptionState::Active,
                ..Subscription::default()
            }),
            (Some(true), Some(mut sub)) => {
                sub.state = SubscriptionState::Active;
                Some(sub)
            }
            (Some(false), Some(mut sub)) if sub.state == SubscriptionState::Active => {
                sub.state = SubscriptionState::Expired;
                Some(sub)
            }
            (_, sub) => sub,
        }
    }
}

/// Decode a subscription payload that may be `null`, `{}`, a bare record,
/// or a record wrapped as `{"subscription": ...}`.
pub(crate) fn decode_subscription(
    value: serde_json::Value,
) -> Result<Option<Subscription>, serde_json::Error> {
    match value {
        serde_json::Value::Null => Ok(None),
        serde_json::Value::Object(mut map) => {
            let inner = map
                .remove("subscription")
                .or_else(|| map.remove("suscripcion"));
            match inner {
                Some(inner) => decode_subscription(inner),
                None if map.is_empty() => Ok(None),
                None => serde_json::from_value(serde_json::Value::Object(map)).map(Some),
            }
        }
        other => serde_json::from_value(other).map(Some),
    }
}

/// Decode `GET /subscriptions/status`.
pub(crate) fn decode_status(
    mut value: serde_json::Value,
) -> Result<SubscriptionStatus, serde_json::Error> {
    let mut active = None;
    if let Some(map) = value.as_object_mut() {
        for key in STATUS_FLAGS {
            if let Some(flag) = map.remove(key).and_then(|v| v.as_bool()) {
                active = Some(flag);
            }
        }
    }

    Ok(SubscriptionStatus {
        active,
        subscription: decode_subscription(value)?,
    })
}

const STATUS_FLAGS: [&str; 3] = ["active", "activa", "has_active_subscription"];
