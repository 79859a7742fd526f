// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Application configuration loaded from environment variables.
//!
//! On Cloud Run the webhook secret is injected as an environment variable
//! through a secret binding, so everything is read from the process env.

use std::env;
use std::str::FromStr;
use std::time::Duration;

/// Name of the header Terra uses to carry the webhook signature.
pub const TERRA_SIGNATURE_HEADER: &str = "terra-signature";

/// Which datastore backs the metric store.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoreBackend {
    /// Google Cloud Firestore (or the emulator when `FIRESTORE_EMULATOR_HOST` is set).
    Firestore,
    /// Process-local store, for local development.
    Memory,
}

impl FromStr for StoreBackend {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "firestore" => Ok(StoreBackend::Firestore),
            "memory" => Ok(StoreBackend::Memory),
            _ => Err(ConfigError::Invalid("STORE_BACKEND", s.to_string())),
        }
    }
}

/// Application configuration, loaded once at startup.
#[derive(Debug, Clone)]
pub struct Config {
    /// Frontend URL allowed by CORS
    pub frontend_url: String,
    /// GCP project ID
    pub gcp_project_id: String,
    /// Server port
    pub port: u16,
    /// Datastore backend
    pub store_backend: StoreBackend,
    /// Maximum allowed distance between a signature timestamp and now.
    /// `None` disables the freshness check.
    pub webhook_max_skew: Option<Duration>,

    // --- Secrets ---
    /// Shared HMAC secret for Terra webhooks
    pub terra_webhook_secret: String,
}

impl Config {
    /// Config for tests: memory store, fixed secret, no freshness window.
    pub fn test_default() -> Self {
        Self {
            frontend_url: "http://localhost:5173".to_string(),
            gcp_project_id: "test-project".to_string(),
            port: 8080,
            store_backend: StoreBackend::Memory,
            webhook_max_skew: None,
            terra_webhook_secret: "test_webhook_secret".to_string(),
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file is honored for local development.
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenvy::dotenv().ok();

        let store_backend = match env::var("STORE_BACKEND") {
            Ok(v) => v.parse()?,
            Err(_) => StoreBackend::Firestore,
        };

        let webhook_max_skew = match env::var("WEBHOOK_MAX_SKEW_SECS") {
            Ok(v) if !v.trim().is_empty() => {
                let secs: u64 = v
                    .trim()
                    .parse()
                    .map_err(|_| ConfigError::Invalid("WEBHOOK_MAX_SKEW_SECS", v.clone()))?;
                Some(Duration::from_secs(secs))
            }
            _ => None,
        };

        Ok(Self {
            frontend_url: env::var("FRONTEND_URL")
                .unwrap_or_else(|_| "http://localhost:5173".to_string()),
            gcp_project_id: env::var("GCP_PROJECT_ID").unwrap_or_else(|_| "local-dev".to_string()),
            port: env::var("PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse()
                .unwrap_or(8080),
            store_backend,
            webhook_max_skew,
            terra_webhook_secret: env::var("TERRA_WEBHOOK_SECRET")
                .map(|v| v.trim().to_string())
                .map_err(|_| ConfigError::Missing("TERRA_WEBHOOK_SECRET"))?,
        })
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    Missing(&'static str),

    #[error("Invalid value for {0}: {1:?}")]
    Invalid(&'static str, String),
}
