use std::sync::Arc;

use tracing::error;

use threadline_db::Database;

use crate::error::ApiError;
use crate::mailer::Mailer;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub frontend_url: String,
    pub mailer: Arc<dyn Mailer>,
}

/// Run a blocking datastore call off the async runtime. Failures are logged
/// here and come back as an opaque `ApiError::Datastore`.
pub(crate) async fn run_db<F, T>(state: &AppState, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&Database) -> anyhow::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let state = Arc::clone(state);
    tokio::task::spawn_blocking(move || f(&state.db))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            ApiError::Datastore(anyhow::anyhow!("join error: {}", e))
        })?
        .map_err(|e| {
            error!("Datastore failure: {:#}", e);
            ApiError::Datastore(e)
        })
}
