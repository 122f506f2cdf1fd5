//! Text and JSON rendering for command results.

use std::fmt::Write as _;
use std::io::Write as _;

use chrono::{DateTime, Utc};
use newsdesk_client::ArticleDetail;
use newsdesk_core::{
    Access, ArticleContent, ArticleSummary, CheckoutReceipt, Plan, Subscription, User,
};
use serde::Serialize;

/// Where command results go.
pub struct Output {
    json: bool,
}

impl Output {
    pub const fn new(json: bool) -> Self {
        Self { json }
    }

    /// Print `value` as JSON, or the text produced by `text`.
    pub fn emit<T: Serialize>(&self, value: &T, text: impl FnOnce() -> String) {
        let rendered = if self.json {
            serde_json::to_string_pretty(value).unwrap_or_else(|e| format!("{{\"error\": \"{e}\"}}"))
        } else {
            text()
        };
        self.line(&rendered);
    }

    /// Print a status message; in JSON mode as `{"message": ...}`.
    pub fn message(&self, text: &str) {
        if self.json {
            self.line(&serde_json::json!({ "message": text }).to_string());
        } else {
            self.line(text);
        }
    }

    fn line(&self, text: &str) {
        // A closed pipe (e.g. `| head`) is not an error worth reporting.
        let _ = writeln!(std::io::stdout().lock(), "{}", text.trim_end());
    }
}

fn date(ts: Option<DateTime<Utc>>) -> String {
    ts.map_or_else(|| "-".to_string(), |ts| ts.format("%Y-%m-%d").to_string())
}

pub fn user(user: &User, subscription: Option<&Subscription>) -> String {
    let mut out = format!("{} <{}>", user.display_name(), user.email);
    if user.is_admin() {
        out.push_str(" [admin]");
    }
    out.push('\n');
    out.push_str(&self::subscription(subscription));
    out
}

pub fn subscription(subscription: Option<&Subscription>) -> String {
    let Some(sub) = subscription else {
        return "Subscription: none".to_string();
    };

    let mut out = format!("Subscription: {}", sub.state);
    if let Some(plan) = sub.plan_name() {
        let _ = write!(out, " ({plan})");
    }
    if sub.expires_at.is_some() {
        let _ = write!(out, ", until {}", date(sub.expires_at));
    }
    if sub.state == newsdesk_core::SubscriptionState::Active && !sub.is_active_at(Utc::now()) {
        out.push_str(" [lapsed]");
    }
    out
}

pub fn article_list(articles: &[ArticleSummary]) -> String {
    if articles.is_empty() {
        return "No articles.".to_string();
    }

    let mut out = String::new();
    for article in articles {
        let _ = writeln!(
            out,
            "{:>5}  {}  {}{}",
            article.id,
            date(article.published_at),
            article.title,
            if article.premium { "  [premium]" } else { "" }
        );
        if let Some(category) = &article.category {
            let _ = writeln!(out, "       {category}");
        }
    }
    out
}

pub fn article(detail: &ArticleDetail) -> String {
    let view = &detail.article;
    let mut out = format!("{}\n", view.title);

    let mut byline = Vec::new();
    if let Some(author) = &view.author {
        byline.push(author.clone());
    }
    if let Some(category) = &view.category {
        byline.push(category.clone());
    }
    if view.published_at.is_some() {
        byline.push(date(view.published_at));
    }
    if !byline.is_empty() {
        let _ = writeln!(out, "{}", byline.join(" · "));
    }
    out.push('\n');

    match &view.content {
        ArticleContent::Full { body } => {
            let _ = writeln!(out, "{body}");
        }
        ArticleContent::Locked { teaser } => {
            let _ = writeln!(out, "{teaser}\n");
            let hint = match view.access {
                Access::LoginRequired => "Run `newsdesk login` to continue.",
                Access::SubscriptionRequired => "Run `newsdesk plans` to see subscription options.",
                Access::Full => "",
            };
            let _ = writeln!(out, "-- {} {hint}", view.access.upsell().unwrap_or_default());
        }
    }

    if !detail.related.is_empty() {
        out.push_str("\nRelated:\n");
        for related in &detail.related {
            let _ = writeln!(out, "{:>5}  {}", related.id, related.title);
        }
    }
    out
}

pub fn plans(plans: &[Plan]) -> String {
    if plans.is_empty() {
        return "No plans available.".to_string();
    }

    let mut out = String::new();
    for plan in plans {
        let _ = write!(out, "{:>3}  {}  {}", plan.id, plan.name, plan.price);
        if let Some(days) = plan.duration_days {
            let _ = write!(out, " / {days} days");
        }
        out.push('\n');
        if let Some(description) = &plan.description {
            let _ = writeln!(out, "     {description}");
        }
        for feature in &plan.features {
            let _ = writeln!(out, "     - {feature}");
        }
    }
    out
}

pub fn receipt(receipt: &CheckoutReceipt) -> String {
    let mut out = format!(
        "Checkout started for {}.\nSubscription: {}\nPayment reference: {}\n",
        receipt.plan.name(),
        receipt.subscription_id,
        receipt.payment_reference
    );
    if let Some(instructions) = &receipt.instructions {
        let _ = writeln!(out, "\n{instructions}");
    }
    let _ = write!(
        out,
        "\nAfter paying, run `newsdesk confirm-payment {}`.",
        receipt.subscription_id
    );
    out
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use newsdesk_core::{
        ArticleView, PlanRef, Role, SessionSnapshot, SubscriptionId, SubscriptionState, UserId,
    };

    use super::*;

    fn premium_detail() -> ArticleDetail {
        let article: newsdesk_core::Article = serde_json::from_value(serde_json::json!({
            "id": 5,
            "titulo": "Informe exclusivo",
            "resumen": "Lo que nadie contó",
            "contenido": "El texto completo",
            "es_premium": true
        }))
        .unwrap();
        ArticleDetail {
            article: ArticleView::gate(article, &SessionSnapshot::anonymous(), Utc::now()),
            related: Vec::new(),
        }
    }

    #[test]
    fn test_locked_article_shows_teaser_and_hint() {
        let text = article(&premium_detail());
        assert!(text.contains("Lo que nadie contó"));
        assert!(!text.contains("El texto completo"));
        assert!(text.contains("newsdesk login"));
    }

    #[test]
    fn test_user_line_marks_admin() {
        let admin = User {
            id: UserId::new(1),
            email: "boss@example.com".to_string(),
            name: Some("Boss".to_string()),
            role: Role::from("ADMIN"),
        };
        let text = user(&admin, None);
        assert!(text.starts_with("Boss <boss@example.com> [admin]"));
        assert!(text.ends_with("Subscription: none"));
    }

    #[test]
    fn test_pending_subscription() {
        let sub = Subscription {
            state: SubscriptionState::Pending,
            plan: Some(PlanRef::Named("Mensual".to_string())),
            ..Subscription::default()
        };
        assert_eq!(subscription(Some(&sub)), "Subscription: pending (Mensual)");
    }

    #[test]
    fn test_receipt_mentions_next_step() {
        let text = receipt(&CheckoutReceipt {
            subscription_id: SubscriptionId::new(17),
            payment_reference: "REF-17".to_string(),
            plan: PlanRef::Named("Anual".to_string()),
            instructions: None,
        });
        assert!(text.contains("REF-17"));
        assert!(text.ends_with("`newsdesk confirm-payment 17`."));
    }

    #[test]
    fn test_empty_lists() {
        assert_eq!(article_list(&[]), "No articles.");
        assert_eq!(plans(&[]), "No plans available.");
    }
}
