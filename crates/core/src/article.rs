//! News articles and the related-articles selection.

use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::types::ArticleId;
use crate::types::timestamp;

/// Teaser length used when an article has no summary.
pub const TEASER_CHARS: usize = 280;

/// A news article as served by `/noticias`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Article {
    /// Backend article ID.
    pub id: ArticleId,
    /// Headline.
    #[serde(alias = "titulo")]
    pub title: String,
    /// Short standfirst.
    #[serde(default, alias = "resumen", alias = "descripcion")]
    pub summary: Option<String>,
    /// Full text.
    #[serde(default, alias = "contenido", alias = "content")]
    pub body: String,
    /// Section name.
    #[serde(default, alias = "categoria")]
    pub category: Option<String>,
    /// Byline.
    #[serde(default, alias = "autor")]
    pub author: Option<String>,
    /// Lead image URL.
    #[serde(default, alias = "imagen_url", alias = "imagen")]
    pub image_url: Option<String>,
    /// Publication time.
    #[serde(
        default,
        alias = "fecha_publicacion",
        alias = "created_at",
        deserialize_with = "timestamp::deserialize_optional"
    )]
    pub published_at: Option<DateTime<Utc>>,
    /// Whether the full text is reserved for subscribers.
    #[serde(default, alias = "es_premium", alias = "is_premium")]
    pub premium: bool,
}

/// Listing entry: an article without its body.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleSummary {
    /// Backend article ID.
    pub id: ArticleId,
    /// Headline.
    pub title: String,
    /// Short standfirst or teaser.
    pub summary: String,
    /// Section name.
    pub category: Option<String>,
    /// Lead image URL.
    pub image_url: Option<String>,
    /// Publication time.
    pub published_at: Option<DateTime<Utc>>,
    /// Whether the full text is reserved for subscribers.
    pub premium: bool,
}

impl Article {
    /// Summary if the article has one, otherwise the opening of the body.
    ///
    /// Body excerpts are cut at the last word boundary within
    /// [`TEASER_CHARS`] and end with an ellipsis. For premium articles the
    /// excerpt is also limited to half the body, so a short premium body is
    /// never returned whole.
    #[must_use]
    pub fn teaser(&self) -> String {
        if let Some(summary) = self.summary.as_deref().map(str::trim)
            && !summary.is_empty()
        {
            return summary.to_string();
        }

        let body = self.body.trim();
        let limit = if self.premium {
            TEASER_CHARS.min(body.chars().count() / 2)
        } else {
            TEASER_CHARS
        };
        if limit == 0 {
            return String::new();
        }
        excerpt(body, limit)
    }

    /// Whether the article belongs to `category` (case-insensitive).
    #[must_use]
    pub fn in_category(&self, category: &str) -> bool {
        self.category
            .as_deref()
            .is_some_and(|c| c.trim().eq_ignore_ascii_case(category.trim()))
    }

    /// Listing entry for this article.
    #[must_use]
    pub fn to_summary(&self) -> ArticleSummary {
        ArticleSummary {
            id: self.id,
            title: self.title.clone(),
            summary: self.teaser(),
            category: self.category.clone(),
            image_url: self.image_url.clone(),
            published_at: self.published_at,
            premium: self.premium,
        }
    }
}

fn excerpt(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars).collect();
    let trimmed = cut
        .rfind(char::is_whitespace)
        .map_or(cut.as_str(), |idx| cut.get(..idx).unwrap_or(cut.as_str()));
    format!("{}…", trimmed.trim_end_matches([',', ';', ':', '.', ' ']))
}

/// Pick up to `limit` articles to show next to `current`.
///
/// Articles in the same category come first, then the rest; each group is
/// ordered newest first. `current` itself is never included.
#[must_use]
pub fn related_articles(all: &[Article], current: &Article, limit: usize) -> Vec<ArticleSummary> {
    let mut candidates: Vec<&Article> = all.iter().filter(|a| a.id != current.id).collect();

    let same_category = |a: &Article| {
        current
            .category
            .as_deref()
            .is_some_and(|category| a.in_category(category))
    };

    candidates.sort_by_key(|a| (Reverse(same_category(a)), Reverse(a.published_at), a.id));
    candidates
        .into_iter()
        .take(limit)
        .map(Article::to_summary)
        .collect()
}
