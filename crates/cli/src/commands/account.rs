//! Account commands.

use newsdesk_client::{ClientState, Landing};
use serde_json::json;

use super::read_password;
use crate::output::{self, Output};

pub async fn login(
    state: &ClientState,
    out: &Output,
    email: &str,
    password: Option<String>,
) -> newsdesk_client::Result<()> {
    let password = read_password(password);
    let outcome = state.session().login(email, &password).await?;

    let landing = match outcome.landing() {
        Landing::Admin => "admin",
        Landing::Home => "home",
    };
    out.emit(
        &json!({
            "user": outcome.user,
            "subscription": outcome.subscription,
            "landing": landing,
        }),
        || {
            let mut text = format!("Signed in as {}", output::user(&outcome.user, outcome.subscription.as_ref()));
            if outcome.landing() == Landing::Admin {
                text.push_str("\nAdministrator account.");
            }
            text
        },
    );
    Ok(())
}

pub async fn register(
    state: &ClientState,
    out: &Output,
    email: &str,
    name: Option<&str>,
    password: Option<String>,
) -> newsdesk_client::Result<()> {
    let password = read_password(password);
    let response = state.session().register(email, &password, name).await?;

    let message = response
        .message
        .clone()
        .unwrap_or_else(|| "Account created.".to_string());
    out.emit(
        &json!({ "id": response.id, "email": response.email, "message": message }),
        || format!("{message}\nRun `newsdesk login -e {email}` to sign in."),
    );
    Ok(())
}

pub async fn logout(state: &ClientState, out: &Output) -> newsdesk_client::Result<()> {
    let was_signed_in = state.session().is_authenticated().await;
    state.session().logout().await?;
    out.message(if was_signed_in {
        "Signed out."
    } else {
        "Not signed in."
    });
    Ok(())
}

pub async fn whoami(state: &ClientState, out: &Output) -> newsdesk_client::Result<()> {
    let snapshot = state.session().snapshot().await;
    match &snapshot.user {
        Some(user) => out.emit(
            &json!({ "user": user, "subscription": snapshot.subscription }),
            || output::user(user, snapshot.subscription.as_ref()),
        ),
        None => out.message("Not signed in."),
    }
    Ok(())
}
