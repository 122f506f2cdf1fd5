//! Article browsing with the premium gate applied.

use chrono::Utc;
use newsdesk_core::{ArticleId, ArticleSummary, ArticleView, related_articles};
use serde::Serialize;
use tracing::{instrument, warn};

use crate::api::ApiClient;
use crate::error::Result;
use crate::session::SessionStore;

/// An opened article and what to read next.
#[derive(Debug, Clone, Serialize)]
pub struct ArticleDetail {
    /// The article, gated for the current reader.
    pub article: ArticleView,
    /// Related articles, most relevant first.
    pub related: Vec<ArticleSummary>,
}

/// Article listing and detail for the current session.
#[derive(Clone)]
pub struct ArticleService {
    api: ApiClient,
    session: SessionStore,
    related_limit: usize,
}

impl ArticleService {
    /// Create a service reading through `session`'s API client.
    #[must_use]
    pub fn new(session: SessionStore, related_limit: usize) -> Self {
        Self {
            api: session.api().clone(),
            session,
            related_limit,
        }
    }

    /// Article summaries, newest first, optionally limited to one category.
    ///
    /// # Errors
    ///
    /// Returns `Error::Api` if the list cannot be fetched.
    #[instrument(skip(self))]
    pub async fn list(&self, category: Option<&str>) -> Result<Vec<ArticleSummary>> {
        let mut articles = self.api.articles().await?;
        if let Some(category) = category.map(str::trim).filter(|c| !c.is_empty()) {
            articles.retain(|article| article.in_category(category));
        }
        articles.sort_by(|a, b| {
            b.published_at
                .cmp(&a.published_at)
                .then_with(|| a.id.cmp(&b.id))
        });
        Ok(articles.iter().map(newsdesk_core::Article::to_summary).collect())
    }

    /// Open one article.
    ///
    /// The body is included only if the session passes the premium gate.
    /// Related articles are best effort: if the list cannot be fetched the
    /// article is still returned, with none.
    ///
    /// # Errors
    ///
    /// Returns `Error::Api` (usually `NotFound`) if the article cannot be
    /// fetched.
    #[instrument(skip(self), fields(article_id = %id))]
    pub async fn open(&self, id: ArticleId) -> Result<ArticleDetail> {
        let (article, all) = tokio::join!(self.api.article(id), self.api.articles());
        let article = article?;

        let related = match all {
            Ok(all) => related_articles(&all, &article, self.related_limit),
            Err(e) => {
                warn!(error = %e, "Could not load related articles");
                Vec::new()
            }
        };

        let session = self.session.snapshot().await;
        let article = ArticleView::gate(article, &session, Utc::now());

        Ok(ArticleDetail { article, related })
    }

    /// Drop cached article responses so the next read hits the backend.
    pub async fn invalidate(&self) {
        self.api.invalidate_cache().await;
    }
}
