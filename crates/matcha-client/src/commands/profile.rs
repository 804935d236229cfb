use chrono::Utc;
use tracing::info;

use matcha_shared::models::{validate_location, ProfileUpdate};

use crate::context::ClientContext;
use crate::error::Result;
use crate::session::RefreshOutcome;

/// Validate and submit a partial profile edit.
pub async fn update_profile(ctx: &ClientContext, update: &ProfileUpdate) -> Result<RefreshOutcome> {
    let body = update.to_body(Utc::now().date_naive())?;
    let token = ctx.session().require_token()?;

    ctx.api().update_profile(&token, body).await?;
    info!("Profile updated");
    Ok(ctx.session().refresh_profile().await)
}

pub async fn update_location(
    ctx: &ClientContext,
    latitude: f64,
    longitude: f64,
) -> Result<RefreshOutcome> {
    let location = validate_location(latitude, longitude)?;
    let token = ctx.session().require_token()?;

    ctx.api().update_location(&token, location).await?;
    info!("Location updated");
    Ok(ctx.session().refresh_profile().await)
}
