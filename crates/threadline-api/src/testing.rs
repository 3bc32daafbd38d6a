use std::sync::{Arc, Mutex};

use async_graphql::Request;
use async_trait::async_trait;

use threadline_db::Database;
use threadline_db::models::NewUser;
use threadline_types::models::UserId;

use crate::auth::hash_password;
use crate::context::RequestContext;
use crate::mailer::Mailer;
use crate::schema::{AppSchema, build_schema};
use crate::state::{AppState, AppStateInner};

pub const TEST_PASSWORD: &str = "password";

/// Keeps every mail as `(to, html)`.
#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<(String, String)>>,
}

impl RecordingMailer {
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to: &str, _subject: &str, html: &str) -> anyhow::Result<()> {
        self.sent.lock().unwrap().push((to.to_string(), html.to_string()));
        Ok(())
    }
}

pub enum Viewer {
    Anonymous,
    User(UserId),
}

pub fn schema_with_mailer() -> (AppSchema, AppState, Arc<RecordingMailer>) {
    let mailer = Arc::new(RecordingMailer::default());
    let state: AppState = Arc::new(AppStateInner {
        db: Database::open_in_memory().unwrap(),
        jwt_secret: "test-secret".into(),
        frontend_url: "http://localhost:3000".into(),
        mailer: mailer.clone(),
    });
    (build_schema(state.clone()), state, mailer)
}

pub fn schema() -> (AppSchema, AppState) {
    let (schema, state, _) = schema_with_mailer();
    (schema, state)
}

/// Insert `<name>` with email `<name>@example.com` and `TEST_PASSWORD`.
pub fn user(state: &AppState, name: &str) -> UserId {
    let hash = hash_password(TEST_PASSWORD).unwrap();
    match state
        .db
        .create_user(name, &format!("{}@example.com", name), &hash)
        .unwrap()
    {
        NewUser::Created(user) => user.id,
        other => panic!("unexpected {:?}", other),
    }
}

fn request(query: &str, viewer: Viewer) -> Request {
    let ctx = match viewer {
        Viewer::Anonymous => RequestContext::anonymous(),
        Viewer::User(id) => RequestContext::authenticated(id),
    };
    Request::new(query).data(ctx)
}

/// Execute and return `data` as JSON, failing on any GraphQL error.
pub async fn run(schema: &AppSchema, query: &str, viewer: Viewer) -> serde_json::Value {
    let response = schema.execute(request(query, viewer)).await;
    assert!(response.errors.is_empty(), "errors: {:?}", response.errors);
    response.data.into_json().unwrap()
}

/// Execute and return the error messages.
pub async fn run_err(schema: &AppSchema, query: &str, viewer: Viewer) -> Vec<String> {
    let response = schema.execute(request(query, viewer)).await;
    response.errors.into_iter().map(|e| e.message).collect()
}
