use tracing::debug;

use matcha_shared::models::{BrowseQuery, BrowseResult};

use crate::context::ClientContext;
use crate::error::Result;

/// Suggestion feed, or search results when a gender filter is set.
pub async fn suggestions(ctx: &ClientContext, query: &BrowseQuery) -> Result<BrowseResult> {
    let token = ctx.session().require_token()?;
    let result = ctx.api().suggestions(&token, query).await?;
    debug!(
        count = result.users.len(),
        page = result.pagination.page,
        mode = ?result.mode,
        "Suggestions loaded"
    );
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::signed_in;
    use crate::error::ClientError;
    use crate::testing::COMPLETE;
    use matcha_net::Method;
    use matcha_shared::models::{BrowseSort, SortOrder};
    use serde_json::json;

    #[tokio::test]
    async fn test_suggestions_query_and_decode() {
        let (transport, ctx) = signed_in(COMPLETE).await;
        transport.ok(
            Method::Get,
            "browsing",
            json!({
                "users": [{"id": 2, "username": "bob", "age": 31, "fame_rating": 3.5,
                           "distance_km": 2.4, "common_tags_count": 2}],
                "pagination": {"page": 1, "limit": 20, "total": 1, "pages": 1},
                "mode": "suggestions"
            }),
        );
        let query = BrowseQuery {
            sort: Some(BrowseSort::Distance),
            order: Some(SortOrder::Asc),
            max_distance_km: Some(50),
            ..BrowseQuery::default()
        };
        let result = suggestions(&ctx, &query).await.unwrap();
        assert_eq!(result.users[0].username, "bob");

        let sent = transport.last(Method::Get, "browsing").unwrap();
        assert_eq!(sent.query, query.to_query());
        assert_eq!(sent.token.as_deref(), Some("tok"));
    }

    #[tokio::test]
    async fn test_suggestions_need_session() {
        let (_, ctx) = signed_in(COMPLETE).await;
        ctx.session().logout().await;
        assert!(matches!(
            suggestions(&ctx, &BrowseQuery::default()).await,
            Err(ClientError::NotAuthenticated)
        ));
    }
}
