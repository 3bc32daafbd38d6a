use std::path::PathBuf;

use anyhow::{Result, bail};
use tracing::info;

use threadline_api::mailer::SmtpConfig;

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &["change-me-to-a-random-string", "dev-secret-change-me"];

pub struct Config {
    pub host: String,
    pub port: u16,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    pub cors_origin: String,
    pub frontend_url: String,
    /// `None` when `SMTP_HOST` is unset; mail is then only logged.
    pub smtp: Option<SmtpConfig>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let jwt_secret = std::env::var("THREADLINE_JWT_SECRET").unwrap_or_default();
        check_secret(&jwt_secret)?;

        let smtp = match std::env::var("SMTP_HOST") {
            Ok(host) if !host.is_empty() => Some(SmtpConfig {
                host,
                port: var_or("SMTP_PORT", "587").parse()?,
                username: var_or("SMTP_USERNAME", ""),
                password: var_or("SMTP_PASSWORD", ""),
                from: var_or("SMTP_FROM", "Threadline <noreply@threadline.local>"),
            }),
            _ => {
                info!("SMTP_HOST not set, outgoing mail will be logged");
                None
            }
        };

        Ok(Self {
            host: var_or("THREADLINE_HOST", "0.0.0.0"),
            port: var_or("THREADLINE_PORT", "4000").parse()?,
            db_path: var_or("THREADLINE_DB_PATH", "threadline.db").into(),
            jwt_secret,
            cors_origin: var_or("THREADLINE_CORS_ORIGIN", "http://localhost:3000"),
            frontend_url: var_or("THREADLINE_FRONTEND_URL", "http://localhost:3000"),
            smtp,
        })
    }
}

fn var_or(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn check_secret(secret: &str) -> Result<()> {
    if secret.is_empty() || PLACEHOLDER_SECRETS.contains(&secret) {
        bail!("THREADLINE_JWT_SECRET is unset or still a placeholder; set it in your .env file");
    }
    Ok(())
}
