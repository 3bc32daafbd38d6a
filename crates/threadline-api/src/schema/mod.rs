//! GraphQL schema: feed and post CRUD, voting, accounts.

pub mod posts;
pub mod users;
pub mod votes;

use async_graphql::{EmptySubscription, MergedObject, Schema};

use crate::state::AppState;

#[derive(MergedObject, Default)]
pub struct QueryRoot(posts::PostQuery, users::UserQuery);

#[derive(MergedObject, Default)]
pub struct MutationRoot(posts::PostMutation, votes::VoteMutation, users::UserMutation);

pub type AppSchema = Schema<QueryRoot, MutationRoot, EmptySubscription>;

pub fn build_schema(state: AppState) -> AppSchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), EmptySubscription)
        .data(state)
        .finish()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing;

    #[test]
    fn sdl_exposes_the_public_operations() {
        let (schema, _) = testing::schema();
        let sdl = schema.sdl();
        for field in [
            "posts(limit: Int!, cursor: String): PaginatedPosts!",
            "post(id: Int!): Post",
            "me: User",
            "creator: User!",
            "vote(postId: Int!, value: Int!): Boolean!",
            "createPost(input: PostInput!): Post!",
            "register(options: UsernamePasswordInput!): UserResponse!",
        ] {
            assert!(sdl.contains(field), "missing `{}` in\n{}", field, sdl);
        }
    }
}
