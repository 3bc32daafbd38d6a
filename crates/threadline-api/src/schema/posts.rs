use async_graphql::{Context, InputObject, Object, Result as GraphQLResult, SimpleObject};

use threadline_db::models::{PostRow, PostView, UserRow};
use threadline_types::cursor::Cursor;
use threadline_types::models::{PostId, UserId};

use crate::context::{require_user, viewer};
use crate::schema::users::User;
use crate::state::{AppState, run_db};

const SNIPPET_CHARS: usize = 97;

/// A post as seen by the requesting user.
pub struct Post(PostView);

#[Object]
impl Post {
    async fn id(&self) -> PostId {
        self.0.post.id
    }

    async fn title(&self) -> &str {
        &self.0.post.title
    }

    async fn text(&self) -> &str {
        &self.0.post.text
    }

    /// The first 97 characters of the text, marked when cut.
    async fn text_snippet(&self) -> String {
        snippet(&self.0.post.text)
    }

    async fn points(&self) -> i64 {
        self.0.post.points
    }

    /// The viewer's vote on this post: 1, -1, or null.
    async fn vote_status(&self) -> Option<i32> {
        self.0.vote_status.map(|v| v.as_i64() as i32)
    }

    async fn creator_id(&self) -> UserId {
        self.0.post.creator_id
    }

    async fn creator(&self) -> User {
        User(self.0.creator.clone())
    }

    /// Epoch milliseconds; usable as a feed cursor.
    async fn created_at(&self) -> String {
        self.0.post.created_at.to_string()
    }

    async fn updated_at(&self) -> String {
        self.0.post.updated_at.to_string()
    }
}

#[derive(SimpleObject)]
pub struct PaginatedPosts {
    pub posts: Vec<Post>,
    pub has_more: bool,
}

#[derive(InputObject)]
pub struct PostInput {
    pub title: String,
    pub text: String,
}

fn snippet(text: &str) -> String {
    match text.char_indices().nth(SNIPPET_CHARS) {
        Some((cut, _)) => format!("{} . . .", &text[..cut]),
        None => text.to_string(),
    }
}

/// Wrap a freshly written row. The author is the viewer and nobody has voted.
fn own_post(post: PostRow, author: UserRow) -> Post {
    Post(PostView {
        creator: author,
        post,
        vote_status: None,
    })
}

#[derive(Default)]
pub struct PostQuery;

#[Object]
impl PostQuery {
    /// Newest posts first. `cursor` is the `createdAt` of the last post already
    /// seen; a cursor that is not an integer is ignored.
    async fn posts(
        &self,
        ctx: &Context<'_>,
        limit: i32,
        cursor: Option<String>,
    ) -> GraphQLResult<PaginatedPosts> {
        let state = ctx.data::<AppState>()?;
        let viewer = viewer(ctx);
        let cursor = Cursor::parse_lenient(cursor.as_deref());

        let page = run_db(state, move |db| db.list_posts(limit.into(), cursor, viewer)).await?;

        Ok(PaginatedPosts {
            posts: page.posts.into_iter().map(Post).collect(),
            has_more: page.has_more,
        })
    }

    async fn post(&self, ctx: &Context<'_>, id: PostId) -> GraphQLResult<Option<Post>> {
        let state = ctx.data::<AppState>()?;
        let viewer = viewer(ctx);

        let view = run_db(state, move |db| db.get_post_view(id, viewer)).await?;
        Ok(view.map(Post))
    }
}

#[derive(Default)]
pub struct PostMutation;

#[Object]
impl PostMutation {
    async fn create_post(&self, ctx: &Context<'_>, input: PostInput) -> GraphQLResult<Post> {
        let state = ctx.data::<AppState>()?;
        let user_id = require_user(ctx)?;

        let (post, author) = run_db(state, move |db| {
            let author = db
                .get_user_by_id(user_id)?
                .ok_or_else(|| anyhow::anyhow!("Authenticated user {} does not exist", user_id))?;
            let post = db.create_post(user_id, &input.title, &input.text)?;
            Ok((post, author))
        })
        .await?;

        Ok(own_post(post, author))
    }

    /// Null unless the post exists and belongs to the caller.
    async fn update_post(
        &self,
        ctx: &Context<'_>,
        id: PostId,
        input: PostInput,
    ) -> GraphQLResult<Option<Post>> {
        let state = ctx.data::<AppState>()?;
        let user_id = require_user(ctx)?;

        let updated = run_db(state, move |db| {
            if db.update_post(id, user_id, &input.title, &input.text)?.is_none() {
                return Ok(None);
            }
            db.get_post_view(id, Some(user_id))
        })
        .await?;

        Ok(updated.map(Post))
    }

    /// Deletes the post only if the caller created it.
    async fn delete_post(&self, ctx: &Context<'_>, id: PostId) -> GraphQLResult<bool> {
        let state = ctx.data::<AppState>()?;
        let user_id = require_user(ctx)?;

        run_db(state, move |db| db.delete_post(id, user_id)).await?;
        Ok(true)
    }
}
