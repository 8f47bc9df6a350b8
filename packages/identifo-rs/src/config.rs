use anyhow::{Context, Result};
use dotenvy::dotenv;
use std::env;
use std::path::PathBuf;

/// Client configuration for one Identifo application.
#[derive(Debug, Clone)]
pub struct IdentifoConfig {
    /// Base URL of the identity service, e.g. `https://auth.example.com`.
    pub base_url: String,
    /// Application ID issued by the identity service.
    pub app_id: String,
    /// Application secret paired with the ID.
    pub secret: String,
    /// Directory the token/user records are persisted under.
    pub storage_dir: PathBuf,
}

impl IdentifoConfig {
    pub fn new(
        base_url: impl Into<String>,
        app_id: impl Into<String>,
        secret: impl Into<String>,
        storage_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_url: base_url.into(),
            app_id: app_id.into(),
            secret: secret.into(),
            storage_dir: storage_dir.into(),
        }
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        // Load .env file if present (development)
        let _ = dotenv();

        Ok(Self {
            base_url: env::var("IDENTIFO_BASE_URL").context("IDENTIFO_BASE_URL must be set")?,
            app_id: env::var("IDENTIFO_APP_ID").context("IDENTIFO_APP_ID must be set")?,
            secret: env::var("IDENTIFO_APP_SECRET").context("IDENTIFO_APP_SECRET must be set")?,
            storage_dir: env::var("IDENTIFO_STORAGE_DIR")
                .unwrap_or_else(|_| ".identifo".to_string())
                .into(),
        })
    }
}
