//! Newsdesk CLI - read articles and manage your subscription.
//!
//! # Usage
//!
//! ```bash
//! # Sign in (prompts for the password if --password and NEWSDESK_PASSWORD are unset)
//! newsdesk login -e reader@example.com
//!
//! # Browse
//! newsdesk articles list --category Deportes
//! newsdesk articles show 42
//!
//! # Subscribe
//! newsdesk plans
//! newsdesk subscribe 2
//! newsdesk confirm-payment 17
//! newsdesk status
//! ```
//!
//! # Commands
//!
//! - `login` / `register` / `logout` / `whoami` - Account
//! - `articles list` / `articles show` - Reading, with the premium gate applied
//! - `plans` / `subscribe` / `confirm-payment` / `status` - Subscription

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::io::Write;

use clap::{Parser, Subcommand};
use newsdesk_client::{ClientConfig, ClientState, telemetry};
use newsdesk_core::{ArticleId, PlanId, SubscriptionId};

mod commands;
mod output;

#[derive(Parser)]
#[command(name = "newsdesk")]
#[command(author, version, about = "Newsdesk command-line reader")]
struct Cli {
    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    json: bool,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sign in
    Login {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Account password (read from stdin when omitted)
        #[arg(short, long, env = "NEWSDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Create an account
    Register {
        /// Account email
        #[arg(short, long)]
        email: String,

        /// Display name
        #[arg(short, long)]
        name: Option<String>,

        /// Account password (read from stdin when omitted)
        #[arg(short, long, env = "NEWSDESK_PASSWORD", hide_env_values = true)]
        password: Option<String>,
    },
    /// Sign out and forget the stored session
    Logout,
    /// Show the signed-in account
    Whoami,
    /// Browse articles
    Articles {
        #[command(subcommand)]
        action: ArticlesAction,
    },
    /// List subscription plans
    Plans,
    /// Start a checkout for a plan
    Subscribe {
        /// Plan ID (see `newsdesk plans`)
        plan_id: PlanId,
    },
    /// Report that a checkout has been paid
    ConfirmPayment {
        /// Subscription ID printed by `newsdesk subscribe`
        subscription_id: SubscriptionId,
    },
    /// Show subscription status
    Status,
}

#[derive(Subcommand)]
enum ArticlesAction {
    /// List articles, newest first
    List {
        /// Only this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Show one article and related reading
    Show {
        /// Article ID
        id: ArticleId,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match ClientConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            telemetry::init_tracing(cli.log_json);
            fail(&newsdesk_client::Error::from(e));
        }
    };

    // Sentry must be initialized before the tracing subscriber
    let _sentry_guard = telemetry::init_sentry(&config);
    telemetry::init_tracing(cli.log_json);

    let result = match ClientState::new(config) {
        Ok(state) => run(cli, &state).await,
        Err(e) => Err(e),
    };

    if let Err(e) = result {
        fail(&e);
    }
}

fn fail(error: &newsdesk_client::Error) -> ! {
    error.report();
    let _ = writeln!(std::io::stderr().lock(), "error: {}", error.user_message());
    std::process::exit(1);
}

async fn run(cli: Cli, state: &ClientState) -> newsdesk_client::Result<()> {
    let snapshot = state.session().restore().await;
    tracing::debug!(authenticated = snapshot.is_authenticated(), "Session ready");

    let out = output::Output::new(cli.json);

    match cli.command {
        Commands::Login { email, password } => {
            commands::account::login(state, &out, &email, password).await
        }
        Commands::Register {
            email,
            name,
            password,
        } => commands::account::register(state, &out, &email, name.as_deref(), password).await,
        Commands::Logout => commands::account::logout(state, &out).await,
        Commands::Whoami => commands::account::whoami(state, &out).await,
        Commands::Articles { action } => match action {
            ArticlesAction::List { category } => {
                commands::articles::list(state, &out, category.as_deref()).await
            }
            ArticlesAction::Show { id } => commands::articles::show(state, &out, id).await,
        },
        Commands::Plans => commands::subscription::plans(state, &out).await,
        Commands::Subscribe { plan_id } => {
            commands::subscription::subscribe(state, &out, plan_id).await
        }
        Commands::ConfirmPayment { subscription_id } => {
            commands::subscription::confirm_payment(state, &out, subscription_id).await
        }
        Commands::Status => commands::subscription::status(state, &out).await,
    }
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn test_cli_definition() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_article_show() {
        let Ok(cli) = Cli::try_parse_from(["newsdesk", "articles", "show", "42"]) else {
            panic!("should parse");
        };
        assert!(matches!(
            cli.command,
            Commands::Articles {
                action: ArticlesAction::Show { id }
            } if id == ArticleId::new(42)
        ));
    }

    #[test]
    fn test_rejects_non_numeric_plan() {
        assert!(Cli::try_parse_from(["newsdesk", "subscribe", "gold"]).is_err());
    }
}
