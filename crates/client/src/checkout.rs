//! Checkout driver.
//!
//! Performs the backend calls around the pure [`CheckoutFlow`] machine and
//! keeps the session's subscription current as the flow advances.

use chrono::Utc;
use newsdesk_core::{
    CheckoutError, CheckoutFlow, CheckoutStep, PlanId, Subscription, SubscriptionId,
};
use tracing::{info, instrument};

use crate::api::{ApiClient, PaymentAck};
use crate::error::{Error, Result};
use crate::session::SessionStore;
use crate::telemetry;

/// Subscription purchase for the current session.
#[derive(Clone)]
pub struct CheckoutService {
    api: ApiClient,
    session: SessionStore,
}

impl CheckoutService {
    /// Create a service acting on behalf of `session`.
    #[must_use]
    pub fn new(session: SessionStore) -> Self {
        Self {
            api: session.api().clone(),
            session,
        }
    }

    /// Fetch plans and open the flow.
    ///
    /// A signed-in reader's subscription is refreshed first, so an already
    /// active subscription opens straight at [`CheckoutStep::Active`].
    ///
    /// # Errors
    ///
    /// Returns `Error::Api` if plans cannot be fetched.
    #[instrument(skip(self))]
    pub async fn open(&self) -> Result<CheckoutFlow> {
        let plans = self.api.plans().await?;

        if self.session.is_authenticated().await
            && let Err(e) = self.session.refresh_subscription().await
        {
            tracing::warn!(error = %e, "Could not refresh subscription before checkout");
        }

        let subscription = self.session.subscription().await;
        Ok(CheckoutFlow::open(plans, subscription.as_ref(), Utc::now()))
    }

    /// Pick a plan and, when signed in, start the checkout for it.
    ///
    /// A signed-out reader ends at [`CheckoutStep::AuthRequired`]; call this
    /// again after login to continue. The flow only advances on success, so
    /// a failed checkout leaves it at [`CheckoutStep::Selected`] for a retry.
    ///
    /// # Errors
    ///
    /// Returns `Error::Checkout` for an unknown plan or a step that does not
    /// allow selection, and `Error::Api` if the backend refuses the checkout.
    #[instrument(skip(self, flow), fields(plan_id = %plan_id))]
    pub async fn select_plan(&self, flow: &mut CheckoutFlow, plan_id: PlanId) -> Result<()> {
        let token = self.session.bearer().await;
        *flow = flow.clone().select_plan(plan_id, token.is_some())?;

        let Some(token) = token else {
            info!("Plan selected while signed out");
            return Ok(());
        };

        let receipt = match self.api.start_checkout(&token, plan_id).await {
            Ok(receipt) => receipt,
            Err(e) => {
                self.session.handle_rejection(&token, &e).await;
                return Err(e.into());
            }
        };

        let plan = plan_id.to_string();
        telemetry::add_breadcrumb("checkout", "Checkout started", Some(&[("plan_id", plan.as_str())]));
        info!(
            subscription_id = %receipt.subscription_id,
            "Checkout started"
        );
        *flow = flow.clone().checkout_started(receipt)?;
        Ok(())
    }

    /// Report payment for the flow's pending checkout.
    ///
    /// The flow is left at [`CheckoutStep::Checkout`] if the notification
    /// fails.
    ///
    /// # Errors
    ///
    /// Returns `Error::Checkout` unless the flow is awaiting payment,
    /// `Error::NotAuthenticated` without a session, and `Error::Api` if the
    /// notification is refused.
    #[instrument(skip(self, flow))]
    pub async fn confirm_payment(&self, flow: &mut CheckoutFlow) -> Result<()> {
        let subscription_id = match flow.step() {
            CheckoutStep::Checkout { receipt } => receipt.subscription_id,
            step => {
                return Err(CheckoutError::InvalidTransition {
                    step: step.name(),
                    action: "confirm payment",
                }
                .into());
            }
        };

        self.notify_payment(subscription_id).await?;
        *flow = flow.clone().payment_notified()?;
        Ok(())
    }

    /// Report payment for `subscription_id` outside a flow.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotAuthenticated` without a session and `Error::Api`
    /// if the notification is refused.
    #[instrument(skip(self), fields(subscription_id = %subscription_id))]
    pub async fn notify_payment(&self, subscription_id: SubscriptionId) -> Result<PaymentAck> {
        let token = self.session.bearer().await.ok_or(Error::NotAuthenticated)?;

        match self.api.notify_payment(&token, subscription_id).await {
            Ok(ack) => {
                info!("Payment notification accepted");
                Ok(ack)
            }
            Err(e) => {
                self.session.handle_rejection(&token, &e).await;
                Err(e.into())
            }
        }
    }

    /// Ask the backend for the current subscription status.
    ///
    /// Needs no plan list. The answer is stored in the session, so gated
    /// articles unlock as soon as this reports an active subscription.
    ///
    /// # Errors
    ///
    /// Returns `Error::NotAuthenticated` without a session and `Error::Api`
    /// if the status cannot be fetched.
    #[instrument(skip(self))]
    pub async fn status(&self) -> Result<Option<Subscription>> {
        let token = self.session.bearer().await.ok_or(Error::NotAuthenticated)?;

        let subscription = match self.api.subscription_status(&token).await {
            Ok(status) => status.into_subscription(),
            Err(e) => {
                self.session.handle_rejection(&token, &e).await;
                return Err(e.into());
            }
        };

        self.session
            .apply_subscription(&token, subscription.clone())
            .await;
        Ok(subscription)
    }

    /// Ask the backend whether the flow's subscription is active yet.
    ///
    /// # Errors
    ///
    /// Same as [`CheckoutService::status`]. The flow is unchanged on error.
    #[instrument(skip(self, flow))]
    pub async fn recheck(&self, flow: &mut CheckoutFlow) -> Result<()> {
        let subscription = self.status().await?;

        *flow = flow.clone().status_checked(subscription.as_ref(), Utc::now());
        if flow.is_active() {
            info!("Subscription is active");
        }
        Ok(())
    }
}
