pub mod auth;
pub mod context;
pub mod error;
pub mod mailer;
pub mod schema;
pub mod state;

#[cfg(test)]
pub(crate) mod testing;
