use std::{path::PathBuf, time::Duration};

use crate::{cache::get_token_cache_path, provider::Provider};

pub const YOUTUBE_API_URL: &str = "https://www.googleapis.com/youtube/v3";
pub const TIMEDTEXT_URL: &str = "https://www.youtube.com/api/timedtext";
pub const YOUTUBE_API_KEY_ENV: &str = "YOUTUBE_API_KEY";

/// Process-wide settings, resolved once at startup and passed by reference
/// to every component.
#[derive(Clone, Debug)]
pub struct Config {
    pub youtube_api_key: String,
    pub llm_api_key: String,
    pub provider: Provider,
    /// Overrides the provider's chat-completions endpoint.
    pub llm_api_url: Option<String>,
    pub llm_model: Option<String>,
    pub client_secret_path: PathBuf,
    pub token_cache_path: PathBuf,
    pub output_dir: PathBuf,
    pub window: chrono::Duration,
    pub summary_lang: String,
    pub transcript_lang: String,
    pub max_input_chars: usize,
    pub http_timeout: Duration,
    pub auth_timeout: Duration,
    pub youtube_api_url: String,
    pub timedtext_url: String,
}

impl Config {
    /// A config with every optional setting at its default.
    pub fn new(youtube_api_key: String, llm_api_key: String, provider: Provider) -> Self {
        Self {
            youtube_api_key,
            llm_api_key,
            provider,
            llm_api_url: None,
            llm_model: None,
            client_secret_path: PathBuf::from("client_secret.json"),
            token_cache_path: get_token_cache_path(),
            output_dir: PathBuf::from("data"),
            window: chrono::Duration::days(7),
            summary_lang: "English".to_string(),
            transcript_lang: "en".to_string(),
            max_input_chars: 48_000,
            http_timeout: Duration::from_secs(60),
            auth_timeout: Duration::from_secs(300),
            youtube_api_url: YOUTUBE_API_URL.to_string(),
            timedtext_url: TIMEDTEXT_URL.to_string(),
        }
    }

    pub fn llm_api_url(&self) -> &str {
        self.llm_api_url
            .as_deref()
            .unwrap_or(self.provider.config().api_url)
    }

    pub fn llm_model(&self) -> &str {
        self.llm_model
            .as_deref()
            .unwrap_or(self.provider.config().model)
    }

    pub fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        reqwest::Client::builder()
            .timeout(self.http_timeout)
            .user_agent(concat!("recap/", env!("CARGO_PKG_VERSION")))
            .build()
    }
}
