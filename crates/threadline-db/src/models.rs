//! Database row types. These map directly to SQLite rows.
//! Timestamps are epoch milliseconds.

use threadline_types::models::{PostId, UserId, VoteValue};

#[derive(Debug, Clone)]
pub struct UserRow {
    pub id: UserId,
    pub username: String,
    pub email: String,
    pub password: String,
    pub created_at: i64,
    pub updated_at: i64,
}

#[derive(Debug, Clone)]
pub struct PostRow {
    pub id: PostId,
    pub title: String,
    pub text: String,
    pub points: i64,
    pub creator_id: UserId,
    pub created_at: i64,
    pub updated_at: i64,
}

/// A post as seen by a particular viewer.
#[derive(Debug, Clone)]
pub struct PostView {
    pub post: PostRow,
    pub creator: UserRow,
    /// `None` for anonymous viewers and for posts the viewer has not voted on.
    pub vote_status: Option<VoteValue>,
}

#[derive(Debug, Clone)]
pub struct FeedPage {
    pub posts: Vec<PostView>,
    pub has_more: bool,
}

/// Result of attempting to insert a user.
#[derive(Debug)]
pub enum NewUser {
    Created(UserRow),
    UsernameTaken,
    EmailTaken,
}
