use chrono::{DateTime, Utc};

use crate::types::{ContentSource, RecordOutcome, Report, ReportRecord};

/// Format a watch timestamp as `YYYY-MM-DD HH:MM UTC`
pub fn format_watched_at(ts: DateTime<Utc>) -> String {
    ts.format("%Y-%m-%d %H:%M UTC").to_string()
}

fn push_list(output: &mut String, heading: &str, items: &[String]) {
    if items.is_empty() {
        return;
    }
    output.push_str(&format!("**{}**\n\n", heading));
    for item in items {
        output.push_str(&format!("• {}\n", item));
    }
    output.push('\n');
}

fn format_record(output: &mut String, index: usize, record: &ReportRecord) {
    let video = &record.video;
    output.push_str(&format!("## {}. {}\n\n", index + 1, video.title));
    output.push_str(&format!(
        "**Channel:** {} | **Watched:** {} | **Video:** https://www.youtube.com/watch?v={}\n\n",
        video.author,
        format_watched_at(video.watched_at),
        video.video_id
    ));

    match &record.outcome {
        RecordOutcome::Summarized {
            content_source,
            summary,
        } => {
            let source = match content_source {
                ContentSource::Transcript => "transcript",
                ContentSource::Description => "description",
                ContentSource::None => "none",
            };
            output.push_str(&format!("_source: {}_\n\n", source));
            output.push_str(&summary.overview);
            output.push_str("\n\n");
            push_list(output, "Key points", &summary.key_points);
            push_list(output, "Learnings", &summary.learnings);
        }
        RecordOutcome::NoContent => {
            output.push_str("_No transcript or description available._\n\n");
        }
        RecordOutcome::ContentUnavailable { reason }
        | RecordOutcome::SummaryUnavailable { reason, .. } => {
            output.push_str(&format!("_{}: {}_\n\n", record.outcome.label(), reason));
        }
    }
}

pub fn format_report_readable(report: &Report) -> String {
    let mut output = String::new();
    output.push_str(&format!("# Weekly recap for {}\n\n", report.run_date));
    output.push_str(&format!(
        "**Window:** {} to {} | **Videos:** {} | **Summarized:** {} | **Provider:** {}\n\n",
        format_watched_at(report.window_start),
        format_watched_at(report.window_end),
        report.videos.len(),
        report.summarized_count(),
        report.provider
    ));

    if report.videos.is_empty() {
        output.push_str("No videos watched in this window.\n");
        return output;
    }

    for (index, record) in report.videos.iter().enumerate() {
        format_record(&mut output, index, record);
    }

    output
}
