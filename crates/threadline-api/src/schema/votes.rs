use async_graphql::{Context, Object};
use tracing::{debug, warn};

use threadline_db::ledger::VoteOutcome;
use threadline_types::models::{PostId, VoteValue};

use crate::context::require_user;
use crate::error::ApiError;
use crate::state::{AppState, run_db};

#[derive(Default)]
pub struct VoteMutation;

#[Object]
impl VoteMutation {
    /// Vote on a post. Any value other than -1 counts as an upvote. Returns
    /// `false` on any failure; repeating the same vote succeeds.
    async fn vote(&self, ctx: &Context<'_>, post_id: PostId, value: i64) -> bool {
        match cast_vote(ctx, post_id, VoteValue::normalize(value)).await {
            Ok(outcome) => {
                debug!(post_id, ?outcome, "vote accepted");
                true
            }
            Err(ApiError::Unauthenticated) => {
                debug!(post_id, "vote rejected: not authenticated");
                false
            }
            Err(e) => {
                warn!(post_id, "vote failed: {}", e);
                false
            }
        }
    }
}

async fn cast_vote(
    ctx: &Context<'_>,
    post_id: PostId,
    value: VoteValue,
) -> Result<VoteOutcome, ApiError> {
    // Identity first: an anonymous vote never reaches the datastore.
    let user_id = require_user(ctx)?;
    let state = ctx
        .data::<AppState>()
        .map_err(|e| anyhow::anyhow!("App state not available: {}", e.message))?;

    run_db(state, move |db| db.cast_vote(post_id, user_id, value)).await
}
