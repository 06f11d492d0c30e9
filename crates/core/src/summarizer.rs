use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{
    config::Config,
    error::SummarizeError,
    types::{ContentSource, VideoContent, VideoSummary},
};

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Summarize resolved text. Callers must not pass `ContentSource::None`.
    async fn summarize(
        &self,
        title: &str,
        content: &VideoContent,
    ) -> Result<VideoSummary, SummarizeError>;
}

/// Summaries from an OpenAI-compatible chat-completions endpoint.
pub struct ChatSummarizer {
    http: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    lang: String,
    max_input_chars: usize,
}

#[derive(Deserialize)]
struct SummaryPayload {
    overview: String,
    key_points: Vec<String>,
    learnings: Vec<String>,
}

fn system_prompt(lang: &str) -> String {
    format!(
        r#"You are a video content analyzer. You summarize YouTube videos the user watched recently, working only from the transcript or description you are given.

IMPORTANT: Write ALL text content in {lang}.

You MUST output ONLY valid JSON matching this exact structure (no markdown, no explanation):
{{
  "overview": "2-3 sentence summary of what the video covers",
  "key_points": ["point1", "point2", "point3"],
  "learnings": ["learning1", "learning2"]
}}

Rules:
- key_points: the main ideas presented, in the order the video presents them (3-7 items)
- learnings: what a viewer should remember or do after watching (2-5 items)
- Use an empty list rather than inventing content the text does not support
- Output ONLY the JSON, nothing else"#
    )
}

/// Keep at most `max_chars` characters, cutting on a char boundary.
pub fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((byte_idx, _)) => (&text[..byte_idx], true),
        None => (text, false),
    }
}

fn strip_code_fence(content: &str) -> &str {
    let trimmed = content.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string ("json") on the opening fence line.
    let rest = rest.split_once('\n').map_or("", |(_, body)| body);
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

fn clean_items(items: Vec<String>) -> Vec<String> {
    items
        .into_iter()
        .map(|item| item.trim().to_string())
        .filter(|item| !item.is_empty())
        .collect()
}

/// Parse the model's reply into a complete summary, or fail
pub fn parse_summary(video_id: &str, content: &str) -> Result<VideoSummary, SummarizeError> {
    let payload: SummaryPayload =
        serde_json::from_str(strip_code_fence(content)).map_err(|e| SummarizeError::Malformed {
            reason: e.to_string(),
        })?;

    let overview = payload.overview.trim().to_string();
    if overview.is_empty() {
        return Err(SummarizeError::Malformed {
            reason: "overview is empty".to_string(),
        });
    }

    Ok(VideoSummary {
        video_id: video_id.to_string(),
        overview,
        key_points: clean_items(payload.key_points),
        learnings: clean_items(payload.learnings),
    })
}

impl ChatSummarizer {
    pub fn new(http: reqwest::Client, config: &Config) -> Self {
        Self {
            http,
            api_url: config.llm_api_url().to_string(),
            api_key: config.llm_api_key.clone(),
            model: config.llm_model().to_string(),
            lang: config.summary_lang.clone(),
            max_input_chars: config.max_input_chars,
        }
    }

    fn user_prompt(&self, title: &str, content: &VideoContent) -> String {
        let (text, truncated) = truncate_chars(&content.text, self.max_input_chars);
        let note = if truncated {
            format!(" (truncated to the first {} characters)", self.max_input_chars)
        } else {
            String::new()
        };
        format!(
            "Summarize the YouTube video titled \"{}\". Source: video {}{}.\n\n{}",
            title,
            match content.source {
                ContentSource::Transcript => "transcript",
                _ => "description",
            },
            note,
            text
        )
    }
}

#[async_trait]
impl Summarizer for ChatSummarizer {
    async fn summarize(
        &self,
        title: &str,
        content: &VideoContent,
    ) -> Result<VideoSummary, SummarizeError> {
        if content.is_empty() {
            return Err(SummarizeError::NoContent {
                video_id: content.video_id.clone(),
            });
        }

        let response = self
            .http
            .post(&self.api_url)
            .header("Content-Type", "application/json")
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&serde_json::json!({
                "model": self.model,
                "messages": [
                    {
                        "role": "system",
                        "content": system_prompt(&self.lang),
                    },
                    {
                        "role": "user",
                        "content": self.user_prompt(title, content),
                    },
                ],
                "temperature": 0.3,
            }))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SummarizeError::Backend {
                status: status.as_u16(),
                body: response.text().await.unwrap_or_default(),
            });
        }

        let response = response.json::<serde_json::Value>().await?;

        // Extract content from response
        let reply = response["choices"][0]["message"]["content"]
            .as_str()
            .ok_or_else(|| SummarizeError::Malformed {
                reason: format!("Invalid API response: {:?}", response),
            })?;
        debug!(video_id = %content.video_id, chars = reply.len(), "Summary reply received");

        parse_summary(&content.video_id, reply)
    }
}
