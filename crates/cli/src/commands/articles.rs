//! Article commands.

use newsdesk_client::ClientState;
use newsdesk_core::ArticleId;

use crate::output::{self, Output};

pub async fn list(
    state: &ClientState,
    out: &Output,
    category: Option<&str>,
) -> newsdesk_client::Result<()> {
    let articles = state.articles().list(category).await?;
    out.emit(&articles, || output::article_list(&articles));
    Ok(())
}

pub async fn show(state: &ClientState, out: &Output, id: ArticleId) -> newsdesk_client::Result<()> {
    let detail = state.articles().open(id).await?;
    out.emit(&detail, || output::article(&detail));
    Ok(())
}
