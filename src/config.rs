//! Environment-driven application configuration.
//!
//! All settings come from the process environment (a `.env` file is loaded
//! by the binary before this runs). The remote credential, namespace and
//! document id have no sensible defaults and are required.

use std::env;

use crate::errors::{GistlinkError, Result};

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub remote: RemoteConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Origin used to build short URLs, e.g. `https://s.example.com`.
    pub public_origin: String,
}

#[derive(Debug, Clone)]
pub struct RemoteConfig {
    /// Base URL of the object-store-and-document API.
    pub api_base: String,
    /// Static bearer credential, pre-provisioned.
    pub token: String,
    /// Object-store namespace objects are created under.
    pub namespace: String,
    /// Fixed branch targeted by object writes.
    pub branch: String,
    /// Identifier of the document holding the slug table.
    pub document_id: String,
    /// Named file inside the document that carries the table JSON.
    pub document_file: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    /// Empty or unset means stdout.
    pub file: Option<String>,
}

fn required(name: &str) -> Result<String> {
    env::var(name)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .ok_or_else(|| {
            GistlinkError::validation(format!("missing required environment variable: {}", name))
        })
}

impl AppConfig {
    pub fn from_env() -> Result<Self> {
        let port = env::var("GISTLINK_PORT")
            .unwrap_or_else(|_| "8080".to_string())
            .parse::<u16>()
            .map_err(|e| GistlinkError::validation(format!("invalid GISTLINK_PORT: {}", e)))?;

        let timeout_secs = env::var("REMOTE_TIMEOUT_SECS")
            .unwrap_or_else(|_| "10".to_string())
            .parse::<u64>()
            .map_err(|e| GistlinkError::validation(format!("invalid REMOTE_TIMEOUT_SECS: {}", e)))?;

        Ok(AppConfig {
            server: ServerConfig {
                host: env::var("GISTLINK_HOST").unwrap_or_else(|_| "127.0.0.1".to_string()),
                port,
                public_origin: env::var("PUBLIC_ORIGIN")
                    .unwrap_or_else(|_| "http://localhost:8080".to_string())
                    .trim_end_matches('/')
                    .to_string(),
            },
            remote: RemoteConfig {
                api_base: env::var("REMOTE_API_BASE")
                    .unwrap_or_else(|_| "https://api.github.com".to_string())
                    .trim_end_matches('/')
                    .to_string(),
                token: required("REMOTE_TOKEN")?,
                namespace: required("STORE_NAMESPACE")?,
                branch: env::var("STORE_BRANCH").unwrap_or_else(|_| "main".to_string()),
                document_id: required("DOCUMENT_ID")?,
                document_file: env::var("DOCUMENT_FILE").unwrap_or_else(|_| "urls.json".to_string()),
                timeout_secs,
            },
            logging: LoggingConfig {
                level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
                file: env::var("LOG_FILE").ok().filter(|f| !f.is_empty()),
            },
        })
    }
}
