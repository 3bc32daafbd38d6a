use async_graphql::{Context, InputObject, Object, Result as GraphQLResult, SimpleObject};
use tracing::{error, info, warn};
use uuid::Uuid;

use threadline_db::models::{NewUser, UserRow};
use threadline_types::models::{UserId, now_millis};

use crate::auth::{create_token, hash_password, verify_password};
use crate::context::viewer;
use crate::state::{AppState, run_db};

/// Reset links stay valid for three days.
const RESET_TOKEN_TTL_MS: i64 = 3 * 24 * 60 * 60 * 1000;

pub struct User(pub(crate) UserRow);

#[Object]
impl User {
    async fn id(&self) -> UserId {
        self.0.id
    }

    async fn username(&self) -> &str {
        &self.0.username
    }

    /// Only visible to the user themself; empty for everyone else.
    async fn email(&self, ctx: &Context<'_>) -> &str {
        if viewer(ctx) == Some(self.0.id) {
            &self.0.email
        } else {
            ""
        }
    }

    async fn created_at(&self) -> String {
        self.0.created_at.to_string()
    }

    async fn updated_at(&self) -> String {
        self.0.updated_at.to_string()
    }
}

#[derive(SimpleObject, Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

impl FieldError {
    fn new(field: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            message: message.to_string(),
        }
    }
}

/// Either a list of input problems or the user with a fresh session token.
#[derive(SimpleObject, Default)]
pub struct UserResponse {
    pub errors: Option<Vec<FieldError>>,
    pub user: Option<User>,
    pub token: Option<String>,
}

impl UserResponse {
    fn error(field: &str, message: &str) -> Self {
        Self {
            errors: Some(vec![FieldError::new(field, message)]),
            ..Default::default()
        }
    }

    fn signed_in(state: &AppState, user: UserRow) -> GraphQLResult<Self> {
        let token = create_token(&state.jwt_secret, user.id, &user.username).map_err(|e| {
            error!("Failed to sign token for user {}: {}", user.id, e);
            async_graphql::Error::new("internal error")
        })?;
        Ok(Self {
            errors: None,
            user: Some(User(user)),
            token: Some(token),
        })
    }
}

#[derive(InputObject)]
pub struct UsernamePasswordInput {
    pub email: String,
    pub username: String,
    pub password: String,
}

/// First problem with a registration, if any.
pub fn validate_register(input: &UsernamePasswordInput) -> Option<FieldError> {
    if !input.email.contains('@') {
        return Some(FieldError::new("email", "invalid email"));
    }
    if input.username.contains('@') {
        return Some(FieldError::new("username", "cannot include @"));
    }
    if input.username.chars().count() <= 2 {
        return Some(FieldError::new(
            "username",
            "username length must be greater than 2",
        ));
    }
    if input.password.chars().count() <= 2 {
        return Some(FieldError::new(
            "password",
            "password length must be greater than 2",
        ));
    }
    None
}

#[derive(Default)]
pub struct UserQuery;

#[Object]
impl UserQuery {
    /// The signed-in user, or null.
    async fn me(&self, ctx: &Context<'_>) -> GraphQLResult<Option<User>> {
        let Some(user_id) = viewer(ctx) else {
            return Ok(None);
        };
        let state = ctx.data::<AppState>()?;

        let user = run_db(state, move |db| db.get_user_by_id(user_id)).await?;
        Ok(user.map(User))
    }
}

#[derive(Default)]
pub struct UserMutation;

#[Object]
impl UserMutation {
    async fn register(
        &self,
        ctx: &Context<'_>,
        options: UsernamePasswordInput,
    ) -> GraphQLResult<UserResponse> {
        if let Some(problem) = validate_register(&options) {
            return Ok(UserResponse {
                errors: Some(vec![problem]),
                ..Default::default()
            });
        }
        let state = ctx.data::<AppState>()?;

        let password_hash = hash_password(&options.password).map_err(|e| {
            error!("{}", e);
            async_graphql::Error::new("internal error")
        })?;

        let UsernamePasswordInput {
            email, username, ..
        } = options;
        let created = run_db(state, move |db| db.create_user(&username, &email, &password_hash)).await;

        match created {
            Ok(NewUser::Created(user)) => {
                info!(user_id = user.id, "registered {}", user.username);
                UserResponse::signed_in(state, user)
            }
            Ok(NewUser::EmailTaken) => Ok(UserResponse::error("email", "email already exists")),
            Ok(NewUser::UsernameTaken) => {
                Ok(UserResponse::error("username", "username already exists"))
            }
            Err(_) => Ok(UserResponse::error(
                "username",
                "server error - try again later",
            )),
        }
    }

    /// `usernameOrEmail` is treated as an email when it contains `@`.
    async fn login(
        &self,
        ctx: &Context<'_>,
        username_or_email: String,
        password: String,
    ) -> GraphQLResult<UserResponse> {
        let state = ctx.data::<AppState>()?;

        let lookup = username_or_email.clone();
        let user = run_db(state, move |db| {
            if lookup.contains('@') {
                db.get_user_by_email(&lookup)
            } else {
                db.get_user_by_username(&lookup)
            }
        })
        .await?;

        let Some(user) = user else {
            return Ok(UserResponse::error(
                "usernameOrEmail",
                "that username or email doesn't exist",
            ));
        };

        if !verify_password(&user.password, &password) {
            return Ok(UserResponse::error("password", "incorrect password"));
        }

        UserResponse::signed_in(state, user)
    }

    /// Always `true`, so the response does not reveal which emails exist.
    async fn forgot_password(&self, ctx: &Context<'_>, email: String) -> GraphQLResult<bool> {
        let state = ctx.data::<AppState>()?;

        let lookup = email.clone();
        let Some(user) = run_db(state, move |db| db.get_user_by_email(&lookup)).await? else {
            return Ok(true);
        };

        let user_id = user.id;
        let token = Uuid::new_v4().to_string();
        let stored = token.clone();
        let expires_at = now_millis() + RESET_TOKEN_TTL_MS;
        run_db(state, move |db| db.insert_reset_token(&stored, user_id, expires_at)).await?;

        let link = format!(
            "{}/change-password/{}",
            state.frontend_url.trim_end_matches('/'),
            token
        );
        let html = format!("<a href=\"{}\">reset password</a>", link);
        if let Err(e) = state.mailer.send(&email, "Change password", &html).await {
            warn!("Failed to send reset mail to user {}: {:#}", user_id, e);
        }

        Ok(true)
    }

    async fn change_password(
        &self,
        ctx: &Context<'_>,
        token: String,
        new_password: String,
    ) -> GraphQLResult<UserResponse> {
        if new_password.chars().count() <= 2 {
            return Ok(UserResponse::error(
                "newPassword",
                "password length must be greater than 2",
            ));
        }
        let state = ctx.data::<AppState>()?;

        let Some(user_id) = run_db(state, move |db| db.take_reset_token(&token, now_millis())).await?
        else {
            return Ok(UserResponse::error("token", "expired token"));
        };

        let password_hash = hash_password(&new_password).map_err(|e| {
            error!("{}", e);
            async_graphql::Error::new("internal error")
        })?;

        let user = run_db(state, move |db| {
            if !db.update_password(user_id, &password_hash)? {
                return Ok(None);
            }
            db.get_user_by_id(user_id)
        })
        .await?;

        match user {
            Some(user) => UserResponse::signed_in(state, user),
            None => Ok(UserResponse::error("token", "user no longer exist")),
        }
    }
}
