pub mod auth;
pub mod cache;
pub mod config;
pub mod content;
pub mod error;
pub mod format;
pub mod history;
pub mod pipeline;
pub mod provider;
pub mod report;
pub mod summarizer;
pub mod types;

pub use auth::{AuthHandle, CredentialProvider, InteractiveCredential, authenticate};
pub use cache::{get_report_path, get_root_cache_dir, get_token_cache_path};
pub use config::Config;
pub use content::{ContentResolver, YoutubeContentResolver};
pub use error::{RecapError, Result};
pub use format::format_report_readable;
pub use history::{HistoryFetcher, YoutubeHistory};
pub use pipeline::{Pipeline, Progress};
pub use provider::{Provider, ProviderConfig};
pub use report::{load_report, write_report};
pub use summarizer::{ChatSummarizer, Summarizer};
pub use types::{
    ContentSource, RecordOutcome, Report, ReportRecord, TimeWindow, VideoContent, VideoSummary,
    WatchedVideo,
};
