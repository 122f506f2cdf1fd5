//! Cache types for article responses.

use newsdesk_core::Article;

/// Cached value types.
#[derive(Debug, Clone)]
pub enum CacheValue {
    Article(Box<Article>),
    Articles(Vec<Article>),
}

pub const ARTICLES_KEY: &str = "articles";

pub fn article_key(id: newsdesk_core::ArticleId) -> String {
    format!("article:{id}")
}
