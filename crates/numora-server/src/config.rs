use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{Context, bail};

/// Placeholder JWT secrets that MUST NOT be used.
const PLACEHOLDER_SECRETS: &[&str] = &[
    "change-me-to-a-random-string",
    "dev-secret-change-me",
];

pub struct Config {
    pub addr: SocketAddr,
    pub db_path: PathBuf,
    pub jwt_secret: String,
    /// User id granted the admin role at startup, if set.
    pub bootstrap_admin: Option<String>,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let jwt_secret = std::env::var("NUMORA_JWT_SECRET").unwrap_or_default();
        if jwt_secret.is_empty() || PLACEHOLDER_SECRETS.contains(&jwt_secret.as_str()) {
            bail!("NUMORA_JWT_SECRET is unset or still a placeholder; it must match the sign-in service's secret");
        }

        let host = std::env::var("NUMORA_HOST").unwrap_or_else(|_| "0.0.0.0".into());
        let port: u16 = std::env::var("NUMORA_PORT")
            .unwrap_or_else(|_| "3000".into())
            .parse()
            .context("NUMORA_PORT must be a port number")?;
        let addr: SocketAddr = format!("{}:{}", host, port).parse()?;

        let db_path: PathBuf = std::env::var("NUMORA_DB_PATH")
            .unwrap_or_else(|_| "numora.db".into())
            .into();

        let bootstrap_admin = std::env::var("NUMORA_BOOTSTRAP_ADMIN")
            .ok()
            .filter(|v| !v.trim().is_empty());

        Ok(Self {
            addr,
            db_path,
            jwt_secret,
            bootstrap_admin,
        })
    }
}
