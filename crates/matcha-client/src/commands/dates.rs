use chrono::Utc;
use tracing::info;

use matcha_shared::models::{DateProposal, DateProposalRequest, DateResponse};
use matcha_shared::types::{ProposalId, UserId};

use crate::cache::QueryKey;
use crate::context::ClientContext;
use crate::error::Result;

pub async fn propose_date(
    ctx: &ClientContext,
    user: UserId,
    request: &DateProposalRequest,
) -> Result<DateProposal> {
    let body = request.to_body(Utc::now())?;
    let token = ctx.session().require_token()?;

    let proposal = ctx.api().propose_date(&token, user, body).await?;
    info!(to = %user, id = %proposal.id, "Date proposed");
    ctx.cache().invalidate(QueryKey::DateProposals);
    Ok(proposal)
}

pub async fn respond_to_date(
    ctx: &ClientContext,
    id: ProposalId,
    response: DateResponse,
) -> Result<()> {
    let token = ctx.session().require_token()?;
    ctx.api().respond_to_date(&token, id, response).await?;
    ctx.cache().invalidate(QueryKey::DateProposals);
    Ok(())
}

/// Proposals exchanged with `user`.
pub async fn date_proposals(ctx: &ClientContext, user: UserId) -> Result<Vec<DateProposal>> {
    let token = ctx.session().require_token()?;
    Ok(ctx.api().date_proposals(&token, user).await?)
}
