use crate::validation::validate_api_url;
use anyhow::{anyhow, Context, Result};
use reqwest::Url;
use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_API_URL: &str = "http://localhost:3000/api";
pub const HTTP_REQUEST_TIMEOUT_SECS: u64 = 30;

/// Where credentials are persisted between runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenBackend {
    /// Operating-system keyring.
    Keyring,
    /// The preferences file in the data directory, for hosts without a keyring.
    File,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base of every endpoint path, e.g. `https://api.example.com/api`.
    pub api_url: Url,
    pub request_timeout: Duration,
    pub data_dir: PathBuf,
    pub keyring_service: String,
    pub token_backend: TokenBackend,
    /// Production mode requires https and silences per-call failure logs.
    pub production: bool,
}

impl ClientConfig {
    pub fn new(api_url: Url) -> Self {
        Self {
            api_url,
            request_timeout: Duration::from_secs(HTTP_REQUEST_TIMEOUT_SECS),
            data_dir: default_data_dir(),
            keyring_service: crate::APP_NAME.to_string(),
            token_backend: TokenBackend::Keyring,
            production: false,
        }
    }

    pub fn from_env() -> Result<Self> {
        let production = std::env::var("GOLBUCKS_ENV")
            .map(|v| v.eq_ignore_ascii_case("production"))
            .unwrap_or(false);

        let raw_url =
            std::env::var("GOLBUCKS_API_URL").unwrap_or_else(|_| DEFAULT_API_URL.into());
        let api_url = validate_api_url(&raw_url, production)
            .map_err(|e| anyhow!(e))
            .context("Invalid GOLBUCKS_API_URL")?;

        let timeout_secs: u64 = std::env::var("GOLBUCKS_TIMEOUT_SECS")
            .unwrap_or_else(|_| HTTP_REQUEST_TIMEOUT_SECS.to_string())
            .parse()
            .context("Invalid GOLBUCKS_TIMEOUT_SECS")?;
        if timeout_secs == 0 {
            return Err(anyhow!("GOLBUCKS_TIMEOUT_SECS must be positive"));
        }

        let token_backend = match std::env::var("GOLBUCKS_TOKEN_STORE")
            .unwrap_or_else(|_| "keyring".into())
            .to_ascii_lowercase()
            .as_str()
        {
            "keyring" => TokenBackend::Keyring,
            "file" => TokenBackend::File,
            other => return Err(anyhow!("Unsupported GOLBUCKS_TOKEN_STORE: {other}")),
        };

        Ok(Self {
            api_url,
            request_timeout: Duration::from_secs(timeout_secs),
            data_dir: std::env::var("GOLBUCKS_DATA_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|_| default_data_dir()),
            keyring_service: std::env::var("GOLBUCKS_KEYRING_SERVICE")
                .unwrap_or_else(|_| crate::APP_NAME.into()),
            token_backend,
            production,
        })
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    pub fn with_data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = dir.into();
        self
    }
}

fn default_data_dir() -> PathBuf {
    dirs::data_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("golbucks")
}
