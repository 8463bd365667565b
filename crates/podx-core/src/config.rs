use std::num::NonZeroUsize;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::{PodxError, Result};

pub const API_KEY_VAR: &str = "REDUCTO_API_KEY";
pub const BASE_URL_VAR: &str = "REDUCTO_BASE_URL";
pub const CONCURRENCY_VAR: &str = "PODX_CONCURRENCY";
pub const TIMEOUT_VAR: &str = "PODX_REQUEST_TIMEOUT_SECS";

pub const DEFAULT_BASE_URL: &str = "https://v1.api.reducto.ai";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    #[serde(skip_serializing)]
    pub api_key: String,
    pub base_url: Url,
    pub concurrency: usize,
    /// Per-request timeout. `None` leaves requests unbounded.
    pub request_timeout: Option<Duration>,
}

impl ClientConfig {
    pub fn new(api_key: impl Into<String>, base_url: Url) -> Self {
        Self {
            api_key: api_key.into(),
            base_url,
            concurrency: default_concurrency(),
            request_timeout: None,
        }
    }

    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let api_key = lookup(API_KEY_VAR)
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| PodxError::Config(format!("{API_KEY_VAR} is not set")))?;

        let raw_base = lookup(BASE_URL_VAR).unwrap_or_else(|| DEFAULT_BASE_URL.into());
        let base_url = Url::parse(&raw_base)
            .map_err(|e| PodxError::Config(format!("invalid {BASE_URL_VAR} '{raw_base}': {e}")))?;

        let concurrency = match lookup(CONCURRENCY_VAR) {
            Some(raw) => match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(PodxError::Config(format!(
                        "{CONCURRENCY_VAR} must be a positive integer, got '{raw}'"
                    )))
                }
            },
            None => default_concurrency(),
        };

        let request_timeout = lookup(TIMEOUT_VAR)
            .map(|raw| {
                raw.trim()
                    .parse::<u64>()
                    .map(Duration::from_secs)
                    .map_err(|_| {
                        PodxError::Config(format!("{TIMEOUT_VAR} must be whole seconds, got '{raw}'"))
                    })
            })
            .transpose()?;

        Ok(Self {
            api_key,
            base_url,
            concurrency,
            request_timeout,
        })
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    /// Resolves an API path against the base URL, keeping any path prefix the base carries.
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let mut base = self.base_url.clone();
        if !base.path().ends_with('/') {
            let with_slash = format!("{}/", base.path());
            base.set_path(&with_slash);
        }
        base.join(path.trim_start_matches('/'))
            .map_err(|e| PodxError::Config(format!("cannot build endpoint '{path}': {e}")))
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}
