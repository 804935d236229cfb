use tracing::info;

use matcha_shared::constants::MAX_PROFILE_IMAGES;
use matcha_shared::types::ImageId;
use matcha_shared::ValidationError;

use crate::context::ClientContext;
use crate::error::Result;
use crate::session::RefreshOutcome;

/// Upload a picture. Rejected locally once the profile holds the maximum
/// number of images.
pub async fn upload_image(
    ctx: &ClientContext,
    file_name: &str,
    mime: &str,
    bytes: Vec<u8>,
) -> Result<RefreshOutcome> {
    if bytes.is_empty() {
        return Err(ValidationError::Empty { field: "image" }.into());
    }
    if let Some(profile) = ctx.session().profile() {
        if profile.images.len() >= MAX_PROFILE_IMAGES {
            return Err(ValidationError::TooManyImages(MAX_PROFILE_IMAGES).into());
        }
    }
    let token = ctx.session().require_token()?;

    let size = bytes.len();
    ctx.api().upload_image(&token, file_name, mime, bytes).await?;
    info!(file_name, size, "Image uploaded");
    Ok(ctx.session().refresh_profile().await)
}

pub async fn delete_image(ctx: &ClientContext, id: ImageId) -> Result<RefreshOutcome> {
    let token = ctx.session().require_token()?;
    ctx.api().delete_image(&token, id).await?;
    info!(image = %id, "Image deleted");
    Ok(ctx.session().refresh_profile().await)
}

pub async fn set_primary_image(ctx: &ClientContext, id: ImageId) -> Result<RefreshOutcome> {
    let token = ctx.session().require_token()?;
    ctx.api().set_primary_image(&token, id).await?;
    Ok(ctx.session().refresh_profile().await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::fixture::signed_in;
    use crate::error::ClientError;
    use crate::guard::GuardDecision;
    use crate::testing::{profile_json, COMPLETE, INCOMPLETE};
    use matcha_net::{Method, RequestBody};
    use serde_json::json;

    #[tokio::test]
    async fn test_first_image_completes_profile() {
        let (transport, ctx) = signed_in(INCOMPLETE).await;
        assert_eq!(
            ctx.guard_route("/discover"),
            GuardDecision::Redirect("/me?incomplete=true".into())
        );

        transport.ok(Method::Post, "profile/images", json!({"message": "ok"}));
        transport.ok(Method::Get, "profile/me", profile_json(1, COMPLETE));
        let outcome = upload_image(&ctx, "me.jpg", "image/jpeg", vec![0xFF, 0xD8])
            .await
            .unwrap();

        assert_eq!(outcome, RefreshOutcome::Refreshed);
        assert!(ctx.session().profile_completeness().unwrap().is_complete());
        assert_eq!(ctx.guard_route("/discover"), GuardDecision::Render);

        let sent = transport.last(Method::Post, "profile/images").unwrap();
        assert!(matches!(
            sent.body,
            RequestBody::Multipart { ref field, .. } if field == "image"
        ));
    }

    #[tokio::test]
    async fn test_sixth_image_rejected_locally() {
        let (transport, ctx) = signed_in(COMPLETE).await;
        let mut body = profile_json(1, COMPLETE);
        body["images"] = json!((1..=5)
            .map(|i| json!({"id": i, "file_path": format!("/uploads/{i}.jpg")}))
            .collect::<Vec<_>>());
        transport.ok(Method::Get, "profile/me", body);
        ctx.session().refresh_profile().await;

        assert!(matches!(
            upload_image(&ctx, "six.jpg", "image/jpeg", vec![1]).await,
            Err(ClientError::Validation(ValidationError::TooManyImages(5)))
        ));
        assert_eq!(transport.count(Method::Post, "profile/images"), 0);
    }

    #[tokio::test]
    async fn test_delete_and_primary_paths() {
        let (transport, ctx) = signed_in(COMPLETE).await;
        transport.ok(Method::Delete, "profile/images/10", json!({"message": "ok"}));
        transport.ok(Method::Put, "profile/images/10/primary", json!({"message": "ok"}));

        delete_image(&ctx, ImageId(10)).await.unwrap();
        set_primary_image(&ctx, ImageId(10)).await.unwrap();
        assert_eq!(transport.count(Method::Get, "profile/me"), 3);
    }
}
