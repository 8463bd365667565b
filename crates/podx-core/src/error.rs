use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PodxError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Remote error during {step} (status {status}): {body}")]
    Remote {
        step: &'static str,
        status: u16,
        body: String,
    },

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema error: {0}")]
    Schema(String),

    #[error("Task error: {0}")]
    Task(String),
}

impl PodxError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

pub type Result<T> = std::result::Result<T, PodxError>;
