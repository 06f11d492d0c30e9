use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing configuration: {env_var} environment variable is not set")]
    MissingEnv { env_var: String },

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: String, reason: String },
}

#[derive(Error, Debug)]
pub enum AuthError {
    #[error("Client secret file {path} could not be used: {reason}")]
    ClientSecret { path: PathBuf, reason: String },

    #[error("Authorization was denied: {reason}")]
    Denied { reason: String },

    #[error("Timed out after {seconds}s waiting for authorization consent")]
    TimedOut { seconds: u64 },

    #[error("Authorization redirect state did not match the request")]
    StateMismatch,

    #[error("Token endpoint rejected the credential: {reason}")]
    Rejected { reason: String },

    #[error("Malformed authorization redirect: {reason}")]
    BadRedirect { reason: String },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum FetchError {
    #[error("Authorization expired or revoked (HTTP {status})")]
    Unauthorized { status: u16 },

    #[error("History service returned HTTP {status}: {body}")]
    Service { status: u16, body: String },

    #[error("Invalid history payload: {reason}")]
    Malformed { reason: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum ResolveError {
    #[error("{what} request for {video_id} returned HTTP {status}")]
    Service {
        what: &'static str,
        video_id: String,
        status: u16,
    },

    #[error("Invalid {what} payload for {video_id}: {reason}")]
    Malformed {
        what: &'static str,
        video_id: String,
        reason: String,
    },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum SummarizeError {
    #[error("No content to summarize for {video_id}")]
    NoContent { video_id: String },

    #[error("Summary backend returned HTTP {status}: {body}")]
    Backend { status: u16, body: String },

    #[error("Summary response could not be parsed: {reason}")]
    Malformed { reason: String },

    #[error("API request failed: {0}")]
    ApiError(#[from] reqwest::Error),
}

#[derive(Error, Debug)]
pub enum WriteError {
    #[error("Could not write report to {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON serialize error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Errors that abort a run. Per-video failures never reach this type.
#[derive(Error, Debug)]
pub enum RecapError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    Write(#[from] WriteError),
}

impl RecapError {
    pub fn stage(&self) -> &'static str {
        match self {
            RecapError::Config(_) => "config",
            RecapError::Auth(_) => "auth",
            RecapError::Fetch(_) => "history",
            RecapError::Write(_) => "report",
        }
    }
}

pub type Result<T> = std::result::Result<T, RecapError>;
