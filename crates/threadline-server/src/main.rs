mod config;

use std::net::SocketAddr;
use std::sync::Arc;

use async_graphql::http::GraphiQLSource;
use axum::{
    Json, Router,
    extract::State,
    http::{HeaderValue, Method, header},
    response::{Html, IntoResponse},
    routing::get,
};
use axum_extra::TypedHeader;
use axum_extra::typed_header::TypedHeaderRejection;
use axum_extra::headers::{Authorization, authorization::Bearer};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{debug, info};

use threadline_api::context::RequestContext;
use threadline_api::mailer::{LogMailer, Mailer, SmtpMailer};
use threadline_api::schema::{AppSchema, build_schema};
use threadline_api::state::{AppState, AppStateInner};

use crate::config::Config;

#[derive(Clone)]
struct ServerState {
    schema: AppSchema,
    app: AppState,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    // Init logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "threadline=debug,tower_http=debug".into()),
        )
        .init();

    let config = Config::from_env()?;

    // Init database
    let db = threadline_db::Database::open(&config.db_path)?;

    let mailer: Arc<dyn Mailer> = match &config.smtp {
        Some(smtp) => Arc::new(SmtpMailer::new(smtp)?),
        None => Arc::new(LogMailer),
    };

    let app_state: AppState = Arc::new(AppStateInner {
        db,
        jwt_secret: config.jwt_secret.clone(),
        frontend_url: config.frontend_url.clone(),
        mailer,
    });

    let origin: HeaderValue = config.cors_origin.parse()?;
    let app = router(app_state, origin);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    info!("Threadline server listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

fn router(app_state: AppState, cors_origin: HeaderValue) -> Router {
    let state = ServerState {
        schema: build_schema(app_state.clone()),
        app: app_state,
    };

    let cors = CorsLayer::new()
        .allow_origin(cors_origin)
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(true);

    Router::new()
        .route("/graphql", get(graphiql).post(graphql))
        .route("/health", get(|| async { "ok" }))
        .with_state(state)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
}

async fn graphql(
    State(state): State<ServerState>,
    bearer: Result<TypedHeader<Authorization<Bearer>>, TypedHeaderRejection>,
    Json(request): Json<async_graphql::Request>,
) -> Json<async_graphql::Response> {
    let token = match &bearer {
        Ok(TypedHeader(auth)) => Some(auth.token()),
        Err(rejection) => {
            if !rejection.is_missing() {
                debug!("Ignoring malformed authorization header: {}", rejection);
            }
            None
        }
    };
    let ctx = RequestContext::from_bearer(&state.app.jwt_secret, token);
    Json(state.schema.execute(request.data(ctx)).await)
}

async fn graphiql() -> impl IntoResponse {
    Html(GraphiQLSource::build().endpoint("/graphql").finish())
}
