use tracing::debug;

use matcha_shared::notification::Notification;
use matcha_shared::types::NotificationId;

use crate::cache::QueryKey;
use crate::context::ClientContext;
use crate::error::{ClientError, Result};

/// Fetch the server list, merge it into the local feed and return the
/// merged list, newest first.
pub async fn list_notifications(ctx: &ClientContext) -> Result<Vec<Notification>> {
    let token = ctx.session().require_token()?;
    let epoch = ctx.session().epoch();
    let generation = ctx.cache().generation(QueryKey::Notifications);

    let fetched = ctx.api().notifications(&token).await?;
    if ctx.session().epoch() != epoch {
        return Err(ClientError::Superseded);
    }
    ctx.notifications().reconcile(fetched);
    ctx.cache().mark_fetched(QueryKey::Notifications, generation);
    Ok(ctx.notifications().snapshot())
}

/// Unread entries in the local feed.
pub fn unread_count(ctx: &ClientContext) -> usize {
    ctx.notifications().unread_count()
}

/// The server's own unread counter.
pub async fn server_unread_count(ctx: &ClientContext) -> Result<u32> {
    let token = ctx.session().require_token()?;
    Ok(ctx.api().unread_count(&token).await?)
}

/// Mark one notification read. The local flag flips only after the
/// server confirmed.
pub async fn mark_read(ctx: &ClientContext, id: NotificationId) -> Result<()> {
    let token = ctx.session().require_token()?;
    ctx.api().mark_notification_read(&token, id).await?;

    if !ctx.notifications().mark_read(id) {
        debug!(id = %id, "Marked a notification that was not unread locally");
    }
    ctx.cache().invalidate(QueryKey::UnreadCount);
    Ok(())
}
