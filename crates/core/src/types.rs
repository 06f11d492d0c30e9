use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Closed interval `[start, end]` of watch timestamps considered recent.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeWindow {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl TimeWindow {
    /// The `length` leading up to `now`, or `None` when the start would fall
    /// outside the representable date range.
    pub fn trailing(length: Duration, now: DateTime<Utc>) -> Option<Self> {
        Some(Self {
            start: now.checked_sub_signed(length)?,
            end: now,
        })
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        self.start <= ts && ts <= self.end
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WatchedVideo {
    pub video_id: String,
    pub title: String,
    pub author: String,
    pub watched_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentSource {
    Transcript,
    Description,
    None,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoContent {
    pub video_id: String,
    pub text: String,
    pub source: ContentSource,
}

impl VideoContent {
    pub fn none(video_id: &str) -> Self {
        Self {
            video_id: video_id.to_string(),
            text: String::new(),
            source: ContentSource::None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.source == ContentSource::None
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoSummary {
    pub video_id: String,
    pub overview: String,
    pub key_points: Vec<String>,
    pub learnings: Vec<String>,
}

/// What happened to one watched video during a run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum RecordOutcome {
    Summarized {
        content_source: ContentSource,
        summary: VideoSummary,
    },
    NoContent,
    ContentUnavailable {
        reason: String,
    },
    SummaryUnavailable {
        content_source: ContentSource,
        reason: String,
    },
}

impl RecordOutcome {
    pub fn summary(&self) -> Option<&VideoSummary> {
        match self {
            RecordOutcome::Summarized { summary, .. } => Some(summary),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            RecordOutcome::Summarized { .. } => "summarized",
            RecordOutcome::NoContent => "no content",
            RecordOutcome::ContentUnavailable { .. } => "content unavailable",
            RecordOutcome::SummaryUnavailable { .. } => "summary unavailable",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportRecord {
    #[serde(flatten)]
    pub video: WatchedVideo,
    #[serde(flatten)]
    pub outcome: RecordOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub run_date: NaiveDate,
    pub generated_at: DateTime<Utc>,
    pub window_start: DateTime<Utc>,
    pub window_end: DateTime<Utc>,
    pub provider: String,
    pub videos: Vec<ReportRecord>,
}

impl Report {
    /// An empty report for a run over `window`, generated at the window's end.
    pub fn new(window: &TimeWindow, provider: &str) -> Self {
        Self {
            run_date: window.end.date_naive(),
            generated_at: window.end,
            window_start: window.start,
            window_end: window.end,
            provider: provider.to_string(),
            videos: Vec::new(),
        }
    }

    pub fn push(&mut self, record: ReportRecord) {
        self.videos.push(record);
    }

    pub fn summarized_count(&self) -> usize {
        self.videos
            .iter()
            .filter(|r| r.outcome.summary().is_some())
            .count()
    }
}
