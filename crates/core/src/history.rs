use std::collections::HashSet;

use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::{
    auth::AuthHandle,
    error::FetchError,
    types::{TimeWindow, WatchedVideo},
};

const PAGE_SIZE: &str = "50";
const MAX_PAGES: usize = 20;
/// videos.list accepts at most this many ids per call
const LOOKUP_BATCH: usize = 50;

#[async_trait]
pub trait HistoryFetcher: Send + Sync {
    /// Videos watched within `window`, in the order the platform lists them.
    async fn fetch_recent_history(
        &self,
        handle: &AuthHandle,
        window: &TimeWindow,
    ) -> Result<Vec<WatchedVideo>, FetchError>;
}

/// Reads the signed-in user's activity feed from the YouTube Data API.
pub struct YoutubeHistory {
    http: reqwest::Client,
    api_url: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityListResponse {
    next_page_token: Option<String>,
    #[serde(default)]
    items: Vec<Activity>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Activity {
    snippet: ActivitySnippet,
    #[serde(default)]
    content_details: ActivityContentDetails,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivitySnippet {
    published_at: DateTime<Utc>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    channel_title: String,
}

#[derive(Default, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityContentDetails {
    upload: Option<UploadDetails>,
    like: Option<ResourceDetails>,
    favorite: Option<ResourceDetails>,
    playlist_item: Option<ResourceDetails>,
    recommendation: Option<ResourceDetails>,
    bulletin: Option<ResourceDetails>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UploadDetails {
    video_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceDetails {
    resource_id: ResourceId,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ResourceId {
    video_id: Option<String>,
}

impl ActivityContentDetails {
    fn video_id(&self) -> Option<&str> {
        if let Some(upload) = &self.upload {
            return Some(upload.video_id.as_str());
        }
        [
            &self.like,
            &self.favorite,
            &self.playlist_item,
            &self.recommendation,
            &self.bulletin,
        ]
        .into_iter()
        .flatten()
        .find_map(|details| details.resource_id.video_id.as_deref())
    }
}

#[derive(Deserialize)]
pub(crate) struct VideoListResponse {
    #[serde(default)]
    pub items: Vec<VideoResource>,
}

#[derive(Deserialize)]
pub(crate) struct VideoResource {
    pub id: String,
    pub snippet: VideoSnippet,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct VideoSnippet {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub channel_title: String,
}

impl YoutubeHistory {
    pub fn new(http: reqwest::Client, api_url: &str) -> Self {
        Self {
            http,
            api_url: api_url.trim_end_matches('/').to_string(),
        }
    }

    async fn get<T: serde::de::DeserializeOwned>(
        &self,
        handle: &AuthHandle,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<T, FetchError> {
        let response = self
            .http
            .get(format!("{}/{}", self.api_url, endpoint))
            .bearer_auth(&handle.access_token)
            .query(&[("key", handle.api_key.as_str())])
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(FetchError::Unauthorized {
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(FetchError::Service {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let body = response.text().await?;
        serde_json::from_str(&body).map_err(|e| FetchError::Malformed {
            reason: format!("{endpoint}: {e}"),
        })
    }

    async fn list_activities(
        &self,
        handle: &AuthHandle,
        window: &TimeWindow,
    ) -> Result<Vec<WatchedVideo>, FetchError> {
        let published_after = window.start.to_rfc3339_opts(SecondsFormat::Secs, true);
        let mut videos = Vec::new();
        let mut seen = HashSet::new();
        let mut page_token: Option<String> = None;

        for page in 0..MAX_PAGES {
            let mut query = vec![
                ("part", "snippet,contentDetails"),
                ("mine", "true"),
                ("maxResults", PAGE_SIZE),
                ("publishedAfter", published_after.as_str()),
            ];
            if let Some(token) = page_token.as_deref() {
                query.push(("pageToken", token));
            }

            let response: ActivityListResponse = self.get(handle, "activities", &query).await?;
            debug!(page, items = response.items.len(), "Fetched activity page");

            let mut reached_window_start = false;
            for activity in response.items {
                let watched_at = activity.snippet.published_at;
                if watched_at < window.start {
                    reached_window_start = true;
                    continue;
                }
                if !window.contains(watched_at) {
                    continue;
                }
                let Some(video_id) = activity.content_details.video_id() else {
                    continue;
                };
                if !seen.insert(video_id.to_string()) {
                    continue;
                }
                videos.push(WatchedVideo {
                    video_id: video_id.to_string(),
                    title: activity.snippet.title,
                    author: activity.snippet.channel_title,
                    watched_at,
                });
            }

            match response.next_page_token {
                Some(token) if !reached_window_start => page_token = Some(token),
                _ => break,
            }
        }

        Ok(videos)
    }

    /// Replace activity titles/channels with the video's own metadata, since a
    /// "like" activity is attributed to the liking account rather than the
    /// video's author.
    async fn fill_video_metadata(
        &self,
        handle: &AuthHandle,
        videos: &mut [WatchedVideo],
    ) -> Result<(), FetchError> {
        for chunk in videos.chunks_mut(LOOKUP_BATCH) {
            let ids = chunk
                .iter()
                .map(|v| v.video_id.as_str())
                .collect::<Vec<_>>()
                .join(",");
            let response: VideoListResponse = self
                .get(handle, "videos", &[("part", "snippet"), ("id", ids.as_str())])
                .await?;

            for resource in response.items {
                for video in chunk.iter_mut().filter(|v| v.video_id == resource.id) {
                    if !resource.snippet.title.is_empty() {
                        video.title = resource.snippet.title.clone();
                    }
                    if !resource.snippet.channel_title.is_empty() {
                        video.author = resource.snippet.channel_title.clone();
                    }
                }
            }
        }
        Ok(())
    }
}

#[async_trait]
impl HistoryFetcher for YoutubeHistory {
    async fn fetch_recent_history(
        &self,
        handle: &AuthHandle,
        window: &TimeWindow,
    ) -> Result<Vec<WatchedVideo>, FetchError> {
        let mut videos = self.list_activities(handle, window).await?;
        self.fill_video_metadata(handle, &mut videos).await?;
        Ok(videos)
    }
}
