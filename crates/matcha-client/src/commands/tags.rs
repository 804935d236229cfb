use tracing::info;

use matcha_shared::models::normalize_tags;
use matcha_shared::profile::Tag;
use matcha_shared::types::TagId;

use crate::context::ClientContext;
use crate::error::Result;
use crate::session::RefreshOutcome;

/// Attach tags to the own profile. Names are normalized the way the
/// backend stores them.
pub async fn add_tags<S: AsRef<str>>(ctx: &ClientContext, names: &[S]) -> Result<RefreshOutcome> {
    let tags = normalize_tags(names)?;
    let token = ctx.session().require_token()?;

    ctx.api().add_tags(&token, &tags).await?;
    info!(count = tags.len(), "Tags added");
    Ok(ctx.session().refresh_profile().await)
}

pub async fn remove_tag(ctx: &ClientContext, id: TagId) -> Result<RefreshOutcome> {
    let token = ctx.session().require_token()?;
    ctx.api().remove_tag(&token, id).await?;
    Ok(ctx.session().refresh_profile().await)
}

/// Tag catalogue lookup; needs no session.
pub async fn search_tags(ctx: &ClientContext, query: Option<&str>) -> Result<Vec<Tag>> {
    Ok(ctx.api().search_tags(query).await?)
}
