use tracing::info;

use matcha_shared::constants::MAX_MESSAGE_PAGE;
use matcha_shared::models::{validate_message, ChatMessage, Conversation, MessagePage};
use matcha_shared::types::{MessageId, UserId};

use crate::cache::QueryKey;
use crate::context::ClientContext;
use crate::error::Result;

pub async fn conversations(ctx: &ClientContext) -> Result<Vec<Conversation>> {
    let token = ctx.session().require_token()?;
    Ok(ctx.api().conversations(&token).await?)
}

/// One page of history with `user`, oldest first. `before` pages
/// backwards from that message.
pub async fn messages(
    ctx: &ClientContext,
    user: UserId,
    limit: u32,
    before: Option<MessageId>,
) -> Result<MessagePage> {
    let token = ctx.session().require_token()?;
    let limit = limit.clamp(1, MAX_MESSAGE_PAGE);
    Ok(ctx
        .api()
        .messages(&token, user, limit, before.map(|id| id.0))
        .await?)
}

pub async fn send_message(ctx: &ClientContext, user: UserId, content: &str) -> Result<ChatMessage> {
    let content = validate_message(content)?;
    let token = ctx.session().require_token()?;

    let message = ctx.api().send_message(&token, user, &content).await?;
    info!(to = %user, id = %message.id, "Message sent");
    ctx.cache()
        .invalidate_many(&[QueryKey::Messages, QueryKey::Conversations]);
    Ok(message)
}

pub async fn mark_conversation_read(ctx: &ClientContext, user: UserId) -> Result<()> {
    let token = ctx.session().require_token()?;
    ctx.api().mark_messages_read(&token, user).await?;
    ctx.cache().invalidate(QueryKey::Conversations);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::signed_in;
    use crate::error::ClientError;
    use crate::testing::COMPLETE;
    use matcha_net::Method;
    use matcha_shared::ValidationError;
    use serde_json::json;

    #[tokio::test]
    async fn test_send_message_validates_and_invalidates() {
        let (transport, ctx) = signed_in(COMPLETE).await;
        transport.ok(
            Method::Post,
            "chat/messages/2",
            json!({"message": "Message sent", "data": {
                "id": 11, "sender_id": 1, "receiver_id": 2, "content": "hello",
                "is_read": false, "is_mine": true, "created_at": "2024-05-01T10:00:00"
            }}),
        );
        let before = ctx.cache().generation(QueryKey::Messages);

        let sent = send_message(&ctx, UserId(2), "  hello ").await.unwrap();
        assert_eq!(sent.id, MessageId(11));
        assert!(ctx.cache().generation(QueryKey::Messages) > before);

        let long = "x".repeat(2001);
        assert!(matches!(
            send_message(&ctx, UserId(2), &long).await,
            Err(ClientError::Validation(ValidationError::TooLong { .. }))
        ));
        assert!(matches!(
            send_message(&ctx, UserId(2), "   ").await,
            Err(ClientError::Validation(ValidationError::Empty { .. }))
        ));
        assert_eq!(transport.count(Method::Post, "chat/messages/2"), 1);
    }

    #[tokio::test]
    async fn test_messages_clamps_page_size() {
        let (transport, ctx) = signed_in(COMPLETE).await;
        transport.ok(
            Method::Get,
            "chat/messages/2",
            json!({"messages": [], "has_more": false}),
        );
        messages(&ctx, UserId(2), 500, Some(MessageId(40))).await.unwrap();
        let sent = transport.last(Method::Get, "chat/messages/2").unwrap();
        assert_eq!(
            sent.query,
            vec![
                ("limit".to_string(), "100".to_string()),
                ("before_id".to_string(), "40".to_string())
            ]
        );
    }

    #[tokio::test]
    async fn test_conversations() {
        let (transport, ctx) = signed_in(COMPLETE).await;
        transport.ok(
            Method::Get,
            "chat/conversations",
            json!({"conversations": [{
                "user": {"id": 2, "username": "bob", "is_online": true},
                "last_message": {"content": "hey", "created_at": "2024-05-01T10:00:00", "is_mine": false},
                "unread_count": 1
            }]}),
        );
        let list = conversations(&ctx).await.unwrap();
        assert_eq!(list[0].user.username, "bob");
        assert_eq!(list[0].unread_count, 1);
    }
}
