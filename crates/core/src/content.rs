use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::{
    error::ResolveError,
    history::VideoListResponse,
    types::{ContentSource, VideoContent, WatchedVideo},
};

#[async_trait]
pub trait ContentResolver: Send + Sync {
    /// Best available text for `video`. "Nothing available" is a
    /// `ContentSource::None` value, never an error.
    async fn resolve_content(&self, video: &WatchedVideo) -> Result<VideoContent, ResolveError>;
}

/// Transcript from the timed-text endpoint, falling back to the video
/// description from the Data API.
pub struct YoutubeContentResolver {
    http: reqwest::Client,
    timedtext_url: String,
    api_url: String,
    api_key: String,
    transcript_lang: String,
}

#[derive(Debug, Default, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
struct TimedTextEvent {
    #[serde(default)]
    segs: Vec<TimedTextSeg>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    #[serde(default)]
    utf8: String,
}

/// Caption lines of a json3 timed-text document, blank events dropped
fn parse_timed_text(body: &str) -> Result<Vec<String>, serde_json::Error> {
    let doc: TimedText = serde_json::from_str(body)?;
    Ok(doc
        .events
        .into_iter()
        .map(|event| {
            let text = event
                .segs
                .iter()
                .map(|seg| seg.utf8.as_str())
                .collect::<String>();
            normalize_whitespace(&text)
        })
        .filter(|line| !line.is_empty())
        .collect())
}

fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

impl YoutubeContentResolver {
    pub fn new(
        http: reqwest::Client,
        timedtext_url: &str,
        api_url: &str,
        api_key: &str,
        transcript_lang: &str,
    ) -> Self {
        Self {
            http,
            timedtext_url: timedtext_url.to_string(),
            api_url: api_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            transcript_lang: transcript_lang.to_string(),
        }
    }

    async fn fetch_transcript(&self, video_id: &str) -> Result<Option<String>, ResolveError> {
        let response = self
            .http
            .get(&self.timedtext_url)
            .query(&[
                ("v", video_id),
                ("lang", self.transcript_lang.as_str()),
                ("fmt", "json3"),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ResolveError::Service {
                what: "transcript",
                video_id: video_id.to_string(),
                status: status.as_u16(),
            });
        }

        // Videos without captions answer 200 with an empty body.
        let body = response.text().await?;
        if body.trim().is_empty() {
            return Ok(None);
        }

        let lines = parse_timed_text(&body).map_err(|e| ResolveError::Malformed {
            what: "transcript",
            video_id: video_id.to_string(),
            reason: e.to_string(),
        })?;
        debug!(video_id, lines = lines.len(), "Parsed transcript");

        let text = lines.join(" ");
        Ok((!text.is_empty()).then_some(text))
    }

    async fn fetch_description(&self, video_id: &str) -> Result<Option<String>, ResolveError> {
        let response = self
            .http
            .get(format!("{}/videos", self.api_url))
            .query(&[
                ("part", "snippet"),
                ("id", video_id),
                ("key", self.api_key.as_str()),
            ])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ResolveError::Service {
                what: "description",
                video_id: video_id.to_string(),
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        let list: VideoListResponse =
            serde_json::from_str(&body).map_err(|e| ResolveError::Malformed {
                what: "description",
                video_id: video_id.to_string(),
                reason: e.to_string(),
            })?;

        Ok(list
            .items
            .into_iter()
            .find(|item| item.id == video_id)
            .map(|item| item.snippet.description.trim().to_string())
            .filter(|description| !description.is_empty()))
    }
}

#[async_trait]
impl ContentResolver for YoutubeContentResolver {
    async fn resolve_content(&self, video: &WatchedVideo) -> Result<VideoContent, ResolveError> {
        let video_id = video.video_id.as_str();

        if let Some(text) = self.fetch_transcript(video_id).await? {
            return Ok(VideoContent {
                video_id: video_id.to_string(),
                text,
                source: ContentSource::Transcript,
            });
        }

        debug!(video_id, "No transcript, falling back to description");
        if let Some(text) = self.fetch_description(video_id).await? {
            return Ok(VideoContent {
                video_id: video_id.to_string(),
                text,
                source: ContentSource::Description,
            });
        }

        Ok(VideoContent::none(video_id))
    }
}
