use thiserror::Error;

/// Failures a resolver can run into. `Display` is what the client sees, so
/// datastore detail stays in the logs.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("not authenticated")]
    Unauthenticated,

    #[error("internal error")]
    Datastore(#[from] anyhow::Error),
}
