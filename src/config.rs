//! Server configuration.
//!
//! Everything comes from environment variables; there is no config file.
//! `JWT_SECRET` is the only required variable.

use std::path::PathBuf;

use anyhow::Context;

#[derive(Debug, Clone)]
pub struct Config {
    /// Address to bind, e.g. `0.0.0.0`.
    pub host: String,
    pub port: u16,
    /// Directory holding `tasks.json` and `users.json`.
    pub data_dir: PathBuf,
    /// HS256 secret for signing bearer tokens.
    pub jwt_secret: String,
    /// Token lifetime in days.
    pub jwt_ttl_days: i64,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let host = std::env::var("HOST").unwrap_or_else(|_| "0.0.0.0".to_string());

        let port = match std::env::var("PORT") {
            Ok(p) => p.parse().context("PORT must be a number")?,
            Err(_) => 5000,
        };

        let data_dir = std::env::var("DATA_DIR")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("./data"));

        let jwt_secret = std::env::var("JWT_SECRET")
            .context("JWT_SECRET must be set (tokens cannot be signed without it)")?;

        let jwt_ttl_days = match std::env::var("JWT_TTL_DAYS") {
            Ok(d) => d.parse().context("JWT_TTL_DAYS must be a number")?,
            Err(_) => 30,
        };

        Ok(Self {
            host,
            port,
            data_dir,
            jwt_secret,
            jwt_ttl_days,
        })
    }
}
