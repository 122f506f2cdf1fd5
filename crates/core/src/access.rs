//! Premium content gate.
//!
//! Decides how much of an article a reader may see. The decision is a pure
//! function of the article, a [`SessionSnapshot`] and the current time, so
//! views can re-evaluate it whenever the session changes.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::article::Article;
use crate::session::SessionSnapshot;
use crate::types::ArticleId;

/// Outcome of the gate for one article and one reader.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Access {
    /// The full text may be shown.
    Full,
    /// Premium article, reader not signed in: offer login.
    LoginRequired,
    /// Premium article, signed-in reader without an active subscription:
    /// offer plans.
    SubscriptionRequired,
}

impl Access {
    /// Whether the full text may be shown.
    #[must_use]
    pub const fn is_full(self) -> bool {
        matches!(self, Self::Full)
    }

    /// Upsell line for locked articles.
    #[must_use]
    pub const fn upsell(self) -> Option<&'static str> {
        match self {
            Self::Full => None,
            Self::LoginRequired => Some("Sign in to keep reading this premium article."),
            Self::SubscriptionRequired => {
                Some("Subscribe to a plan to unlock premium articles.")
            }
        }
    }
}

/// Evaluate the gate.
///
/// Free articles are always [`Access::Full`]. Premium articles need a
/// signed-in reader whose subscription is active at `now`.
#[must_use]
pub fn article_access(premium: bool, session: &SessionSnapshot, now: DateTime<Utc>) -> Access {
    if !premium {
        Access::Full
    } else if !session.is_authenticated() {
        Access::LoginRequired
    } else if session.has_active_subscription(now) {
        Access::Full
    } else {
        Access::SubscriptionRequired
    }
}

/// What a reader gets for an article body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ArticleContent {
    /// Full text.
    Full {
        /// Article body.
        body: String,
    },
    /// Locked; only the teaser is available.
    Locked {
        /// Summary or opening excerpt.
        teaser: String,
    },
}

/// An article after the gate has been applied.
///
/// A locked view does not hold the body at all, so nothing downstream can
/// render it by mistake.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleView {
    /// Backend article ID.
    pub id: ArticleId,
    /// Headline.
    pub title: String,
    /// Section name.
    pub category: Option<String>,
    /// Byline.
    pub author: Option<String>,
    /// Lead image URL.
    pub image_url: Option<String>,
    /// Publication time.
    pub published_at: Option<DateTime<Utc>>,
    /// Whether the article is premium.
    pub premium: bool,
    /// Gate decision.
    pub access: Access,
    /// Body or teaser.
    pub content: ArticleContent,
}

impl ArticleView {
    /// Apply the gate to `article` for the reader described by `session`.
    #[must_use]
    pub fn gate(article: Article, session: &SessionSnapshot, now: DateTime<Utc>) -> Self {
        let access = article_access(article.premium, session, now);
        let content = if access.is_full() {
            ArticleContent::Full {
                body: article.body.clone(),
            }
        } else {
            ArticleContent::Locked {
                teaser: article.teaser(),
            }
        };

        Self {
            id: article.id,
            title: article.title,
            category: article.category,
            author: article.author,
            image_url: article.image_url,
            published_at: article.published_at,
            premium: article.premium,
            access,
            content,
        }
    }

    /// The body, when unlocked.
    #[must_use]
    pub fn body(&self) -> Option<&str> {
        match &self.content {
            ArticleContent::Full { body } => Some(body),
            ArticleContent::Locked { .. } => None,
        }
    }
}
