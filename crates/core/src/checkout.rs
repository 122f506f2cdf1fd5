//! Subscription plans and the checkout state machine.
//!
//! ```text
//!            select (signed out)
//!   Plans ───────────────────────▶ AuthRequired
//!     │  ▲                              │ select (signed in)
//!     │  │ back                         ▼
//!     └──┼──────── select ──────────▶ Selected ── checkout_started ──▶ Checkout
//!        │                            ▲    │ select (retry)
//!        │                            └────┘                            │
//!        └──────────────────────── back ◀───────────────────────────────┤
//!                                                                       │ payment_notified
//!                                                                       ▼
//!            status_checked (backend reports active)           PendingVerification
//!   any ───────────────────────────────────────────────────▶ Active
//! ```
//!
//! The machine is pure: the client crate performs the HTTP calls and feeds
//! their results in through the transition methods.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::types::price::DEFAULT_CURRENCY;
use crate::types::{PlanId, PlanRef, Price, Subscription, SubscriptionId};

/// A subscription plan offered for sale.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PlanWire")]
pub struct Plan {
    /// Backend plan ID.
    pub id: PlanId,
    /// Plan name.
    pub name: String,
    /// Marketing description.
    pub description: Option<String>,
    /// Price per period.
    pub price: Price,
    /// Length of one period in days.
    pub duration_days: Option<u32>,
    /// Bullet-point benefits.
    pub features: Vec<String>,
}

#[derive(Deserialize)]
struct PlanWire {
    id: PlanId,
    #[serde(alias = "nombre")]
    name: String,
    #[serde(default, alias = "descripcion")]
    description: Option<String>,
    #[serde(alias = "precio")]
    price: Decimal,
    #[serde(default, alias = "moneda")]
    currency: Option<String>,
    #[serde(default, alias = "duracion_dias", alias = "duration")]
    duration_days: Option<u32>,
    #[serde(default, alias = "beneficios", alias = "caracteristicas")]
    features: Vec<String>,
}

impl From<PlanWire> for Plan {
    fn from(wire: PlanWire) -> Self {
        Self {
            id: wire.id,
            name: wire.name,
            description: wire.description,
            price: Price::new(
                wire.price,
                wire.currency.as_deref().unwrap_or(DEFAULT_CURRENCY),
            ),
            duration_days: wire.duration_days,
            features: wire.features,
        }
    }
}

/// Payment details returned when a checkout starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckoutReceipt {
    /// Pending subscription created for this checkout.
    pub subscription_id: SubscriptionId,
    /// Reference the reader quotes when paying.
    #[serde(rename = "referencia_pago", alias = "payment_reference")]
    pub payment_reference: String,
    /// Plan being purchased.
    pub plan: PlanRef,
    /// Payment instructions, if the backend sent any.
    #[serde(default, alias = "instrucciones")]
    pub instructions: Option<String>,
}

/// Errors from invalid checkout transitions.
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CheckoutError {
    /// The selected plan is not in the fetched plan list.
    #[error("plan {0} is not available")]
    UnknownPlan(PlanId),
    /// The action does not apply to the current step.
    #[error("cannot {action} while {step}")]
    InvalidTransition {
        /// Step the flow was in.
        step: &'static str,
        /// Attempted action.
        action: &'static str,
    },
}

/// Where the reader is in the checkout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "step", rename_all = "snake_case")]
pub enum CheckoutStep {
    /// Choosing a plan.
    Plans,
    /// Picked a plan while signed out; waiting for login.
    AuthRequired {
        /// The chosen plan.
        plan: Plan,
    },
    /// Picked a plan while signed in; checkout not started yet.
    Selected {
        /// The chosen plan.
        plan: Plan,
    },
    /// Checkout started; waiting for the reader to pay.
    Checkout {
        /// Payment details.
        receipt: CheckoutReceipt,
    },
    /// Reader reported payment; backend has not confirmed yet.
    PendingVerification {
        /// Payment details.
        receipt: CheckoutReceipt,
    },
    /// Subscription is active; premium content is unlocked.
    Active {
        /// The active subscription.
        subscription: Subscription,
    },
}

impl CheckoutStep {
    /// Short name used in error messages and logs.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Plans => "choosing a plan",
            Self::AuthRequired { .. } => "waiting for login",
            Self::Selected { .. } => "a plan is selected",
            Self::Checkout { .. } => "awaiting payment",
            Self::PendingVerification { .. } => "payment is being verified",
            Self::Active { .. } => "the subscription is active",
        }
    }
}

/// The checkout flow: the fetched plans plus the current step.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CheckoutFlow {
    plans: Vec<Plan>,
    step: CheckoutStep,
}

impl CheckoutFlow {
    /// Open the flow.
    ///
    /// Starts at [`CheckoutStep::Active`] when `subscription` is already
    /// active at `now`, otherwise at [`CheckoutStep::Plans`].
    #[must_use]
    pub fn open(plans: Vec<Plan>, subscription: Option<&Subscription>, now: DateTime<Utc>) -> Self {
        let step = match subscription {
            Some(sub) if sub.is_active_at(now) => CheckoutStep::Active {
                subscription: sub.clone(),
            },
            _ => CheckoutStep::Plans,
        };
        Self { plans, step }
    }

    /// Plans fetched when the flow opened.
    #[must_use]
    pub fn plans(&self) -> &[Plan] {
        &self.plans
    }

    /// Current step.
    #[must_use]
    pub const fn step(&self) -> &CheckoutStep {
        &self.step
    }

    /// Whether the flow ended with an active subscription.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        matches!(self.step, CheckoutStep::Active { .. })
    }

    /// Pick a plan.
    ///
    /// Allowed while choosing a plan, while waiting for login (the reader
    /// may pick again after signing in) and while a selection is waiting on
    /// a checkout that has not started yet.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::UnknownPlan`] if `plan_id` is not offered, and
    /// [`CheckoutError::InvalidTransition`] from any other step.
    pub fn select_plan(self, plan_id: PlanId, authenticated: bool) -> Result<Self, CheckoutError> {
        if !matches!(
            self.step,
            CheckoutStep::Plans | CheckoutStep::AuthRequired { .. } | CheckoutStep::Selected { .. }
        ) {
            return Err(self.invalid("select a plan"));
        }

        let plan = self
            .plans
            .iter()
            .find(|p| p.id == plan_id)
            .cloned()
            .ok_or(CheckoutError::UnknownPlan(plan_id))?;

        let step = if authenticated {
            CheckoutStep::Selected { plan }
        } else {
            CheckoutStep::AuthRequired { plan }
        };
        Ok(Self { step, ..self })
    }

    /// The plan awaiting checkout, if a plan is selected.
    #[must_use]
    pub const fn selected_plan(&self) -> Option<&Plan> {
        match &self.step {
            CheckoutStep::Selected { plan } | CheckoutStep::AuthRequired { plan } => Some(plan),
            _ => None,
        }
    }

    /// Record the backend's response to "start checkout".
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] unless a plan is selected.
    pub fn checkout_started(self, receipt: CheckoutReceipt) -> Result<Self, CheckoutError> {
        match self.step {
            CheckoutStep::Selected { .. } => Ok(Self {
                step: CheckoutStep::Checkout { receipt },
                ..self
            }),
            _ => Err(self.invalid("start checkout")),
        }
    }

    /// Record that the reader's "I paid" notification was accepted.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] unless awaiting payment.
    pub fn payment_notified(self) -> Result<Self, CheckoutError> {
        match self.step {
            CheckoutStep::Checkout { receipt } => Ok(Self {
                plans: self.plans,
                step: CheckoutStep::PendingVerification { receipt },
            }),
            step => Err(CheckoutError::InvalidTransition {
                step: step.name(),
                action: "confirm payment",
            }),
        }
    }

    /// Apply a fresh subscription status from the backend.
    ///
    /// Moves to [`CheckoutStep::Active`] when the subscription is active at
    /// `now`; otherwise the step is unchanged. Valid from every step.
    #[must_use]
    pub fn status_checked(self, subscription: Option<&Subscription>, now: DateTime<Utc>) -> Self {
        match subscription {
            Some(sub) if sub.is_active_at(now) => Self {
                step: CheckoutStep::Active {
                    subscription: sub.clone(),
                },
                ..self
            },
            _ => self,
        }
    }

    /// Return to the plan list.
    ///
    /// # Errors
    ///
    /// [`CheckoutError::InvalidTransition`] once payment has been reported or
    /// the subscription is active.
    pub fn back(self) -> Result<Self, CheckoutError> {
        match self.step {
            CheckoutStep::Plans
            | CheckoutStep::AuthRequired { .. }
            | CheckoutStep::Selected { .. }
            | CheckoutStep::Checkout { .. } => Ok(Self {
                step: CheckoutStep::Plans,
                ..self
            }),
            _ => Err(self.invalid("go back")),
        }
    }

    fn invalid(&self, action: &'static str) -> CheckoutError {
        CheckoutError::InvalidTransition {
            step: self.step.name(),
            action,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use chrono::TimeZone;

    use super::*;
    use crate::types::SubscriptionState;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap()
    }

    fn plans() -> Vec<Plan> {
        serde_json::from_str(
            r#"[
                {"id": 1, "nombre": "Mensual", "precio": 9.9, "moneda": "pen", "duracion_dias": 30},
                {"id": 2, "name": "Anual", "price": "99.00", "features": ["Sin anuncios"]}
            ]"#,
        )
        .unwrap()
    }

    fn receipt() -> CheckoutReceipt {
        serde_json::from_str(
            r#"{"subscription_id": 55, "referencia_pago": "PAY-0055", "plan": "Mensual"}"#,
        )
        .unwrap()
    }

    fn active() -> Subscription {
        Subscription {
            state: SubscriptionState::Active,
            ..Subscription::default()
        }
    }

    #[test]
    fn test_plan_wire_format() {
        let plans = plans();
        assert_eq!(plans[0].name, "Mensual");
        assert_eq!(plans[0].price.to_string(), "9.90 PEN");
        assert_eq!(plans[0].duration_days, Some(30));
        assert_eq!(plans[1].price.currency, "USD");
        assert_eq!(plans[1].features, vec!["Sin anuncios".to_string()]);
    }

    #[test]
    fn test_open_without_subscription_shows_plans() {
        let flow = CheckoutFlow::open(plans(), None, now());
        assert_eq!(flow.step(), &CheckoutStep::Plans);
        assert_eq!(flow.plans().len(), 2);
    }

    #[test]
    fn test_open_with_active_subscription() {
        let flow = CheckoutFlow::open(plans(), Some(&active()), now());
        assert!(flow.is_active());
    }

    #[test]
    fn test_select_signed_out_halts_for_auth() {
        let flow = CheckoutFlow::open(plans(), None, now())
            .select_plan(PlanId::new(1), false)
            .unwrap();
        assert!(matches!(flow.step(), CheckoutStep::AuthRequired { plan } if plan.id == PlanId::new(1)));

        // After logging in the reader picks again.
        let flow = flow.select_plan(PlanId::new(2), true).unwrap();
        assert_eq!(flow.selected_plan().map(|p| p.id), Some(PlanId::new(2)));
    }

    #[test]
    fn test_unknown_plan() {
        let err = CheckoutFlow::open(plans(), None, now())
            .select_plan(PlanId::new(9), true)
            .unwrap_err();
        assert_eq!(err, CheckoutError::UnknownPlan(PlanId::new(9)));
    }

    #[test]
    fn test_happy_path_to_pending() {
        let flow = CheckoutFlow::open(plans(), None, now())
            .select_plan(PlanId::new(1), true)
            .unwrap()
            .checkout_started(receipt())
            .unwrap();
        assert!(matches!(flow.step(), CheckoutStep::Checkout { receipt } if receipt.payment_reference == "PAY-0055"));

        let flow = flow.payment_notified().unwrap();
        assert!(matches!(
            flow.step(),
            CheckoutStep::PendingVerification { .. }
        ));

        // Backend has not verified yet.
        let pending_sub = Subscription {
            state: SubscriptionState::Pending,
            ..Subscription::default()
        };
        let flow = flow.status_checked(Some(&pending_sub), now());
        assert!(!flow.is_active());

        let flow = flow.status_checked(Some(&active()), now());
        assert!(flow.is_active());
    }

    #[test]
    fn test_checkout_requires_selection() {
        let err = CheckoutFlow::open(plans(), None, now())
            .checkout_started(receipt())
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTransition { action: "start checkout", .. }));

        let err = CheckoutFlow::open(plans(), None, now())
            .select_plan(PlanId::new(1), false)
            .unwrap()
            .checkout_started(receipt())
            .unwrap_err();
        assert!(matches!(err, CheckoutError::InvalidTransition { step: "waiting for login", .. }));
    }

    #[test]
    fn test_payment_notified_requires_checkout() {
        let err = CheckoutFlow::open(plans(), None, now())
            .payment_notified()
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "cannot confirm payment while choosing a plan"
        );
    }

    #[test]
    fn test_back_from_checkout_and_not_from_pending() {
        let flow = CheckoutFlow::open(plans(), None, now())
            .select_plan(PlanId::new(1), true)
            .unwrap()
            .checkout_started(receipt())
            .unwrap();
        let flow = flow.back().unwrap();
        assert_eq!(flow.step(), &CheckoutStep::Plans);

        let pending = flow
            .select_plan(PlanId::new(2), true)
            .unwrap()
            .checkout_started(receipt())
            .unwrap()
            .payment_notified()
            .unwrap();
        assert!(pending.back().is_err());
    }

    #[test]
    fn test_select_not_allowed_once_active() {
        let flow = CheckoutFlow::open(plans(), Some(&active()), now());
        assert!(flow.select_plan(PlanId::new(1), true).is_err());
    }

    #[test]
    fn test_selected_plan_can_be_picked_again() {
        let flow = CheckoutFlow::open(plans(), None, now())
            .select_plan(PlanId::new(1), true)
            .unwrap();

        let flow = flow.select_plan(PlanId::new(2), true).unwrap();

        assert_eq!(flow.selected_plan().unwrap().id, PlanId::new(2));
        assert!(matches!(flow.step(), CheckoutStep::Selected { .. }));

        let started = flow.checkout_started(receipt()).unwrap();
        assert!(started.select_plan(PlanId::new(1), true).is_err());
    }
}
