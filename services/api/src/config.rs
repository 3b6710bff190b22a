//! Service configuration loaded from environment variables

use std::{net::SocketAddr, path::PathBuf};

use anyhow::{Context, Result};
use common::database::DatabaseConfig;
use serde::Deserialize;

/// Deployment mode; development exposes error details in responses
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RunMode {
    Development,
    #[default]
    Production,
}

impl RunMode {
    pub fn is_development(self) -> bool {
        self == RunMode::Development
    }

    /// Log filter used when `RUST_LOG` is not set
    pub fn default_log_filter(self) -> &'static str {
        match self {
            RunMode::Development => "info",
            RunMode::Production => "error",
        }
    }
}

/// Third-party credentials.
///
/// They are loaded so deployments can provide them, but no handler uses them
/// yet; startup only reports which groups are configured.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Credentials {
    pub jwt_secret: Option<String>,
    pub cookie_secret: Option<String>,
    pub huawei_access_key_id: Option<String>,
    pub huawei_secret_access_key: Option<String>,
    pub huawei_bucket: Option<String>,
    pub huawei_endpoint: Option<String>,
    pub huawei_region: Option<String>,
    pub google_client_id: Option<String>,
    pub google_client_secret: Option<String>,
    pub google_redirect_uri: Option<String>,
}

impl Credentials {
    pub fn session_configured(&self) -> bool {
        self.jwt_secret.is_some() && self.cookie_secret.is_some()
    }

    pub fn object_storage_configured(&self) -> bool {
        [
            &self.huawei_access_key_id,
            &self.huawei_secret_access_key,
            &self.huawei_bucket,
            &self.huawei_endpoint,
        ]
        .iter()
        .all(|value| value.is_some())
    }

    pub fn oauth_configured(&self) -> bool {
        self.google_client_id.is_some()
            && self.google_client_secret.is_some()
            && self.google_redirect_uri.is_some()
    }
}

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    pub app_host: String,
    pub app_port: u16,
    pub app_env: RunMode,
    pub database_url: String,
    pub database_max_connections: u32,
    pub database_min_connections: u32,
    pub database_connection_timeout: u64,
    /// Directory for the log file; stdout only when unset
    pub log_dir: Option<PathBuf>,
    /// HTML template for server-side rendering; built-in template when unset
    pub index_html_path: Option<PathBuf>,
    /// Allowed CORS origin
    pub frontend_url: Option<String>,
    #[serde(skip)]
    pub credentials: Credentials,
}

impl AppConfig {
    /// Load the configuration from environment variables
    ///
    /// # Environment Variables
    /// - `APP_HOST` (default: "0.0.0.0"), `APP_PORT` (default: 3000)
    /// - `APP_ENV`: "development" or "production" (default: "production")
    /// - `DATABASE_URL` (required)
    /// - `DATABASE_MAX_CONNECTIONS` (10), `DATABASE_MIN_CONNECTIONS` (1),
    ///   `DATABASE_CONNECTION_TIMEOUT` (30 seconds)
    /// - `LOG_DIR`, `INDEX_HTML_PATH`, `FRONTEND_URL` (optional)
    /// - JWT, cookie, object storage and OAuth credentials (optional)
    pub fn from_env() -> Result<Self> {
        let settings = config::Config::builder()
            .set_default("app_host", "0.0.0.0")?
            .set_default("app_port", 3000)?
            .set_default("app_env", "production")?
            .set_default("database_max_connections", 10)?
            .set_default("database_min_connections", 1)?
            .set_default("database_connection_timeout", 30)?
            .add_source(config::Environment::default())
            .build()
            .context("failed to read configuration")?;

        let mut config: AppConfig = settings
            .clone()
            .try_deserialize()
            .context("invalid configuration; is DATABASE_URL set?")?;
        config.credentials = settings
            .try_deserialize()
            .context("invalid credentials configuration")?;

        Ok(config)
    }

    /// Address the HTTP server binds to
    pub fn listen_addr(&self) -> Result<SocketAddr> {
        format!("{}:{}", self.app_host, self.app_port)
            .parse()
            .with_context(|| format!("invalid listen address {}:{}", self.app_host, self.app_port))
    }

    pub fn database(&self) -> DatabaseConfig {
        DatabaseConfig {
            database_url: self.database_url.clone(),
            max_connections: self.database_max_connections,
            min_connections: self.database_min_connections,
            connection_timeout: self.database_connection_timeout,
        }
    }
}
