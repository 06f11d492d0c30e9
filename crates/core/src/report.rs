use std::path::{Path, PathBuf};

use tokio::fs;
use tracing::info;

use crate::{cache::get_report_path, error::WriteError, types::Report};

/// Persist `report` as `digest_<run date>.json` under `output_dir`.
///
/// The file is written next to its final name and renamed into place, so a
/// failed write never leaves a truncated artifact behind. A second run on the
/// same day replaces the first.
pub async fn write_report(report: &Report, output_dir: &Path) -> Result<PathBuf, WriteError> {
    let path = get_report_path(output_dir, report.run_date);
    let tmp_path = path.with_extension("json.tmp");

    let pretty_json = serde_json::to_string_pretty(report)?;

    fs::create_dir_all(output_dir)
        .await
        .map_err(|e| io_error(output_dir, e))?;
    fs::write(&tmp_path, &pretty_json)
        .await
        .map_err(|e| io_error(&tmp_path, e))?;
    if let Err(e) = fs::rename(&tmp_path, &path).await {
        let _ = fs::remove_file(&tmp_path).await;
        return Err(io_error(&path, e));
    }

    info!(path = %path.display(), videos = report.videos.len(), "Report written");
    Ok(path)
}

fn io_error(path: &Path, source: std::io::Error) -> WriteError {
    WriteError::Io {
        path: path.to_path_buf(),
        source,
    }
}

/// Load a previously written report
pub async fn load_report(path: &Path) -> Result<Report, WriteError> {
    let json_content = fs::read_to_string(path)
        .await
        .map_err(|e| io_error(path, e))?;
    Ok(serde_json::from_str(&json_content)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{
        ContentSource, RecordOutcome, ReportRecord, TimeWindow, VideoSummary, WatchedVideo,
    };
    use chrono::{Duration, TimeZone, Utc};

    fn window() -> TimeWindow {
        TimeWindow::trailing(
            Duration::days(7),
            Utc.with_ymd_and_hms(2026, 10, 16, 8, 0, 0).unwrap(),
        )
        .unwrap()
    }

    fn record(id: &str) -> ReportRecord {
        ReportRecord {
            video: WatchedVideo {
                video_id: id.to_string(),
                title: format!("Video {id}"),
                author: "Channel".to_string(),
                watched_at: Utc.with_ymd_and_hms(2026, 10, 14, 20, 0, 0).unwrap(),
            },
            outcome: RecordOutcome::Summarized {
                content_source: ContentSource::Transcript,
                summary: VideoSummary {
                    video_id: id.to_string(),
                    overview: "overview".to_string(),
                    key_points: vec!["point".to_string()],
                    learnings: vec!["learning".to_string()],
                },
            },
        }
    }

    #[tokio::test]
    async fn empty_report_is_a_valid_artifact() {
        let dir = tempfile::tempdir().unwrap();
        let report = Report::new(&window(), "OpenAI");

        let path = write_report(&report, &dir.path().join("data")).await.unwrap();
        assert!(path.ends_with("digest_2026-10-16.json"));

        let raw: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw["videos"], serde_json::json!([]));
        assert_eq!(raw["run_date"], "2026-10-16");
    }

    #[tokio::test]
    async fn same_day_rerun_overwrites() {
        let dir = tempfile::tempdir().unwrap();

        let mut first = Report::new(&window(), "OpenAI");
        first.push(record("abc123"));
        first.push(record("def456"));
        let first_path = write_report(&first, dir.path()).await.unwrap();

        let mut second = Report::new(&window(), "OpenAI");
        second.push(record("abc123"));
        let second_path = write_report(&second, dir.path()).await.unwrap();

        assert_eq!(first_path, second_path);
        let loaded = load_report(&second_path).await.unwrap();
        assert_eq!(loaded, second);

        let leftovers: Vec<_> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn unwritable_destination_is_write_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("not-a-dir");
        std::fs::write(&blocker, "file in the way").unwrap();

        let err = write_report(&Report::new(&window(), "OpenAI"), &blocker)
            .await
            .unwrap_err();
        assert!(matches!(err, WriteError::Io { .. }));
    }
}
