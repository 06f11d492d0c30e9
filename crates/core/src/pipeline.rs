use tracing::{info, warn};

use crate::{
    auth::AuthHandle,
    content::ContentResolver,
    error::Result,
    history::HistoryFetcher,
    summarizer::Summarizer,
    types::{RecordOutcome, Report, ReportRecord, TimeWindow, WatchedVideo},
};

/// Per-video progress, reported in history order.
#[derive(Debug)]
pub enum Progress<'a> {
    Fetched { total: usize },
    Started { index: usize, total: usize, video: &'a WatchedVideo },
    Finished { index: usize, total: usize, record: &'a ReportRecord },
}

/// Sequential digest run over one history window.
pub struct Pipeline<'a> {
    history: &'a dyn HistoryFetcher,
    resolver: &'a dyn ContentResolver,
    summarizer: &'a dyn Summarizer,
    provider_name: String,
}

impl<'a> Pipeline<'a> {
    pub fn new(
        history: &'a dyn HistoryFetcher,
        resolver: &'a dyn ContentResolver,
        summarizer: &'a dyn Summarizer,
        provider_name: &str,
    ) -> Self {
        Self {
            history,
            resolver,
            summarizer,
            provider_name: provider_name.to_string(),
        }
    }

    /// Fetch the window's history and produce one record per video.
    ///
    /// Only a history failure aborts the run. Content and summary failures
    /// are recorded on the affected video and processing moves on.
    pub async fn run(
        &self,
        handle: &AuthHandle,
        window: &TimeWindow,
        mut on_progress: impl FnMut(Progress<'_>),
    ) -> Result<Report> {
        let videos = self.history.fetch_recent_history(handle, window).await?;
        let total = videos.len();
        info!(total, "Fetched watch history");
        on_progress(Progress::Fetched { total });

        let mut report = Report::new(window, &self.provider_name);
        for (index, video) in videos.into_iter().enumerate() {
            on_progress(Progress::Started {
                index,
                total,
                video: &video,
            });
            let outcome = self.process_video(&video).await;
            report.push(ReportRecord { video, outcome });
            if let Some(record) = report.videos.last() {
                on_progress(Progress::Finished {
                    index,
                    total,
                    record,
                });
            }
        }

        info!(
            total,
            summarized = report.summarized_count(),
            "Digest complete"
        );
        Ok(report)
    }

    async fn process_video(&self, video: &WatchedVideo) -> RecordOutcome {
        let content = match self.resolver.resolve_content(video).await {
            Ok(content) => content,
            Err(e) => {
                warn!(video_id = %video.video_id, error = %e, "Content unavailable");
                return RecordOutcome::ContentUnavailable {
                    reason: e.to_string(),
                };
            }
        };

        if content.is_empty() {
            info!(video_id = %video.video_id, "No transcript or description");
            return RecordOutcome::NoContent;
        }

        match self.summarizer.summarize(&video.title, &content).await {
            Ok(summary) => RecordOutcome::Summarized {
                content_source: content.source,
                summary,
            },
            Err(e) => {
                warn!(video_id = %video.video_id, error = %e, "Summary unavailable");
                RecordOutcome::SummaryUnavailable {
                    content_source: content.source,
                    reason: e.to_string(),
                }
            }
        }
    }
}
