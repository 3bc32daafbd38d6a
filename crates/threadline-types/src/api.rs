use serde::{Deserialize, Serialize};

use crate::models::UserId;

// -- JWT Claims --

/// JWT claims issued by the login/register mutations and decoded by the HTTP
/// layer into a request context.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: UserId,
    pub username: String,
    pub exp: usize,
}
