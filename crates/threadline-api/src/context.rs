use async_graphql::Context;
use tracing::debug;

use threadline_types::models::UserId;

use crate::auth::decode_token;
use crate::error::ApiError;

/// Per-request identity, attached to every GraphQL request by the HTTP layer.
#[derive(Debug, Clone, Copy, Default)]
pub struct RequestContext {
    pub user_id: Option<UserId>,
}

impl RequestContext {
    pub fn anonymous() -> Self {
        Self::default()
    }

    pub fn authenticated(user_id: UserId) -> Self {
        Self {
            user_id: Some(user_id),
        }
    }

    /// Resolve a bearer token. A bad or expired token is not an error: the
    /// request just proceeds anonymously.
    pub fn from_bearer(secret: &str, token: Option<&str>) -> Self {
        let Some(token) = token else {
            return Self::anonymous();
        };
        match decode_token(secret, token) {
            Ok(claims) => Self::authenticated(claims.sub),
            Err(e) => {
                debug!("Rejected bearer token: {}", e);
                Self::anonymous()
            }
        }
    }
}

pub(crate) fn viewer(ctx: &Context<'_>) -> Option<UserId> {
    ctx.data_opt::<RequestContext>().and_then(|c| c.user_id)
}

pub(crate) fn require_user(ctx: &Context<'_>) -> Result<UserId, ApiError> {
    viewer(ctx).ok_or(ApiError::Unauthenticated)
}
