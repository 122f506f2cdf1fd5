//! Subscription status as reported by the backend.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::timestamp;
use super::{PlanId, SubscriptionId};

/// Lifecycle state of a reader's subscription.
///
/// Values the client does not recognize decode as [`SubscriptionState::None`],
/// which keeps premium content locked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum SubscriptionState {
    /// Checkout started, payment not yet verified.
    #[serde(alias = "pendiente", alias = "PENDING")]
    Pending,
    /// Paid and current.
    #[serde(alias = "activa", alias = "activo", alias = "ACTIVE")]
    Active,
    /// Ran past its end date.
    #[serde(alias = "vencida", alias = "expirada", alias = "EXPIRED")]
    Expired,
    /// Cancelled by the reader or an administrator.
    #[serde(alias = "cancelada", alias = "CANCELLED", alias = "canceled")]
    Cancelled,
    /// No subscription.
    #[default]
    #[serde(other)]
    None,
}

impl SubscriptionState {
    /// Wire name of the state.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Expired => "expired",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for SubscriptionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Plan a subscription belongs to.
///
/// Some endpoints send the plan name as a bare string, others a nested object.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PlanRef {
    /// Plan name only.
    Named(String),
    /// Plan object with its ID.
    Summary {
        /// Plan ID, when included.
        #[serde(default)]
        id: Option<PlanId>,
        /// Plan name.
        #[serde(alias = "nombre")]
        name: String,
    },
}

impl PlanRef {
    /// Human-readable plan name.
    #[must_use]
    pub fn name(&self) -> &str {
        match self {
            Self::Named(name) | Self::Summary { name, .. } => name,
        }
    }
}

/// A subscription snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Subscription {
    /// Backend subscription ID.
    #[serde(default)]
    pub id: Option<SubscriptionId>,
    /// Current state.
    #[serde(default, alias = "status", alias = "estado")]
    pub state: SubscriptionState,
    /// Plan this subscription is for.
    #[serde(default)]
    pub plan: Option<PlanRef>,
    /// When the subscription started.
    #[serde(
        default,
        alias = "fecha_inicio",
        alias = "startedAt",
        deserialize_with = "timestamp::deserialize_optional"
    )]
    pub started_at: Option<DateTime<Utc>>,
    /// When access ends, if the backend set an end date.
    ///
    /// Decoded strictly: an end date that cannot be read fails the whole
    /// record instead of turning into "never expires".
    #[serde(
        default,
        alias = "fecha_fin",
        alias = "expiresAt",
        alias = "fecha_expiracion",
        deserialize_with = "timestamp::deserialize_deadline"
    )]
    pub expires_at: Option<DateTime<Utc>>,
}

impl Subscription {
    /// Whether this subscription unlocks premium content at `now`.
    ///
    /// Requires the `active` state; when `expires_at` is present it must lie
    /// strictly after `now`.
    #[must_use]
    pub fn is_active_at(&self, now: DateTime<Utc>) -> bool {
        self.state == SubscriptionState::Active && self.expires_at.is_none_or(|end| now < end)
    }

    /// Plan name, if known.
    #[must_use]
    pub fn plan_name(&self) -> Option<&str> {
        self.plan.as_ref().map(PlanRef::name)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).unwrap()
    }

    #[test]
    fn test_state_aliases() {
        let parse = |s: &str| serde_json::from_str::<SubscriptionState>(s).unwrap();
        assert_eq!(parse("\"active\""), SubscriptionState::Active);
        assert_eq!(parse("\"activa\""), SubscriptionState::Active);
        assert_eq!(parse("\"pendiente\""), SubscriptionState::Pending);
        assert_eq!(parse("\"none\""), SubscriptionState::None);
        assert_eq!(parse("\"suspended\""), SubscriptionState::None);
        assert_eq!(SubscriptionState::default(), SubscriptionState::None);
        assert_eq!(
            serde_json::to_string(&SubscriptionState::None).unwrap(),
            "\"none\""
        );
    }

    #[test]
    fn test_deserialize_backend_payload() {
        let sub: Subscription = serde_json::from_str(
            r#"{
                "id": 31,
                "estado": "activa",
                "plan": {"id": 2, "nombre": "Mensual"},
                "fecha_inicio": "2025-01-01T00:00:00",
                "fecha_fin": "2025-02-01T00:00:00"
            }"#,
        )
        .unwrap();
        assert_eq!(sub.id, Some(SubscriptionId::new(31)));
        assert_eq!(sub.state, SubscriptionState::Active);
        assert_eq!(sub.plan_name(), Some("Mensual"));
        assert_eq!(sub.expires_at, Some(at(2025, 2, 1)));
    }

    #[test]
    fn test_unreadable_end_date_is_rejected() {
        let result = serde_json::from_str::<Subscription>(
            r#"{"estado": "activa", "fecha_fin": "31/01/2020"}"#,
        );
        assert!(result.is_err());

        let sub: Subscription =
            serde_json::from_str(r#"{"estado": "activa", "fecha_fin": null}"#).unwrap();
        assert_eq!(sub.expires_at, None);
    }

    #[test]
    fn test_unreadable_start_date_is_tolerated() {
        let sub: Subscription = serde_json::from_str(
            r#"{"estado": "activa", "fecha_inicio": "ayer", "fecha_fin": "2025-02-01"}"#,
        )
        .unwrap();
        assert_eq!(sub.started_at, None);
        assert_eq!(sub.expires_at, Some(at(2025, 2, 1)));
    }

    #[test]
    fn test_plan_as_plain_string() {
        let sub: Subscription =
            serde_json::from_str(r#"{"status": "pending", "plan": "Anual"}"#).unwrap();
        assert_eq!(sub.state, SubscriptionState::Pending);
        assert_eq!(sub.plan_name(), Some("Anual"));
    }

    #[test]
    fn test_is_active_at_respects_expiry() {
        let sub = Subscription {
            state: SubscriptionState::Active,
            expires_at: Some(at(2025, 2, 1)),
            ..Subscription::default()
        };
        assert!(sub.is_active_at(at(2025, 1, 31)));
        assert!(!sub.is_active_at(at(2025, 2, 1)));
        assert!(!sub.is_active_at(at(2025, 3, 1)));
    }

    #[test]
    fn test_is_active_without_expiry() {
        let sub = Subscription {
            state: SubscriptionState::Active,
            ..Subscription::default()
        };
        assert!(sub.is_active_at(at(2099, 1, 1)));
    }

    #[test]
    fn test_non_active_states_never_unlock() {
        for state in [
            SubscriptionState::None,
            SubscriptionState::Pending,
            SubscriptionState::Expired,
            SubscriptionState::Cancelled,
        ] {
            let sub = Subscription {
                state,
                ..Subscription::default()
            };
            assert!(!sub.is_active_at(at(2025, 1, 1)));
        }
    }
}
