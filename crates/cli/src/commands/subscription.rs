//! Plan and subscription commands.

use chrono::Utc;
use newsdesk_client::ClientState;
use newsdesk_core::{CheckoutStep, PlanId, SubscriptionId};
use serde_json::json;

use crate::output::{self, Output};

pub async fn plans(state: &ClientState, out: &Output) -> newsdesk_client::Result<()> {
    let flow = state.checkout().open().await?;
    out.emit(&flow.plans(), || output::plans(flow.plans()));
    Ok(())
}

pub async fn subscribe(
    state: &ClientState,
    out: &Output,
    plan_id: PlanId,
) -> newsdesk_client::Result<()> {
    let mut flow = state.checkout().open().await?;
    if let CheckoutStep::Active { subscription } = flow.step() {
        out.emit(flow.step(), || {
            format!(
                "You already have an active subscription.\n{}",
                output::subscription(Some(subscription))
            )
        });
        return Ok(());
    }

    state.checkout().select_plan(&mut flow, plan_id).await?;
    match flow.step() {
        CheckoutStep::AuthRequired { plan } => {
            out.emit(flow.step(), || {
                format!(
                    "Sign in to subscribe to {}: run `newsdesk login`, then `newsdesk subscribe {}`.",
                    plan.name, plan.id
                )
            });
            Err(newsdesk_client::Error::NotAuthenticated)
        }
        CheckoutStep::Checkout { receipt } => {
            out.emit(flow.step(), || output::receipt(receipt));
            Ok(())
        }
        step => {
            out.emit(step, || format!("Checkout is at step: {}", step.name()));
            Ok(())
        }
    }
}

pub async fn confirm_payment(
    state: &ClientState,
    out: &Output,
    subscription_id: SubscriptionId,
) -> newsdesk_client::Result<()> {
    let ack = state.checkout().notify_payment(subscription_id).await?;
    let subscription = state.session().refresh_subscription().await?;

    let message = ack
        .message
        .clone()
        .unwrap_or_else(|| "Payment reported. It will be verified shortly.".to_string());
    out.emit(
        &json!({ "message": message, "subscription": subscription }),
        || format!("{message}\n{}", output::subscription(subscription.as_ref())),
    );
    Ok(())
}

pub async fn status(state: &ClientState, out: &Output) -> newsdesk_client::Result<()> {
    if !state.session().is_authenticated().await {
        return Err(newsdesk_client::Error::NotAuthenticated);
    }

    let subscription = state.checkout().status().await?;
    let active = subscription
        .as_ref()
        .is_some_and(|s| s.is_active_at(Utc::now()));

    out.emit(
        &json!({ "active": active, "subscription": subscription }),
        || output::subscription(subscription.as_ref()),
    );
    Ok(())
}
