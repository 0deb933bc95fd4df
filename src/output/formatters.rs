use crate::transcript::TranscriptResult;
use crate::utils::{format_duration, format_timestamp};

/// Segments joined by single spaces, no timestamps
pub fn format_as_plain(result: &TranscriptResult) -> String {
    result.plain_text()
}

/// One `[MM:SS] text` line per segment
pub fn format_as_timestamped(result: &TranscriptResult) -> String {
    result
        .segments
        .iter()
        .map(|segment| format!("[{}] {}", format_timestamp(segment.start), segment.text))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render the transcript body, with or without timestamps
pub fn format_body(result: &TranscriptResult, include_timestamps: bool) -> String {
    if include_timestamps {
        format_as_timestamped(result)
    } else {
        format_as_plain(result)
    }
}

/// Human readable report: a short header followed by the transcript body
pub fn format_as_text(result: &TranscriptResult, include_timestamps: bool) -> String {
    let mut output = Vec::new();

    if let Some(title) = &result.title {
        output.push(title.clone());
    }
    output.push(format!("Video: https://www.youtube.com/watch?v={}", result.video_id));

    if let Some(metadata) = &result.metadata {
        if let Some(channel) = &metadata.channel {
            output.push(format!("Channel: {}", channel));
        }
        if let Some(duration) = metadata.duration {
            output.push(format!("Duration: {}", format_duration(duration)));
        }
        if let Some(views) = metadata.view_count {
            output.push(format!("Views: {}", group_thousands(views)));
        }
        if let Some(date) = metadata.upload_date.as_deref().and_then(format_upload_date) {
            output.push(format!("Uploaded: {}", date));
        }
    }

    output.push(format!(
        "Language: {}{}",
        result.language_code,
        if result.is_auto_generated { " (auto-generated)" } else { "" }
    ));
    output.push(format!("Method: {}", result.source_method));

    if !result.available_tracks.is_empty() {
        let tracks: Vec<String> = result
            .available_tracks
            .iter()
            .map(|track| {
                if track.is_auto_generated {
                    format!("{} (auto)", track.language_code)
                } else {
                    track.language_code.clone()
                }
            })
            .collect();
        output.push(format!("Available languages: {}", tracks.join(", ")));
    }

    if let Some(last) = result.segments.last() {
        output.push(format!(
            "Segments: {} ({} words, {})",
            result.segments.len(),
            result.word_count(),
            format_duration(last.start + last.duration)
        ));
    }

    output.push(String::new());
    output.push(format_body(result, include_timestamps));

    output.join("\n")
}

/// `1234567` -> `1,234,567`
fn group_thousands(value: u64) -> String {
    let digits = value.to_string();
    let mut grouped = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, digit) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            grouped.push(',');
        }
        grouped.push(digit);
    }
    grouped
}

/// yt-dlp's `YYYYMMDD` as `YYYY-MM-DD`
fn format_upload_date(raw: &str) -> Option<String> {
    chrono::NaiveDate::parse_from_str(raw, "%Y%m%d")
        .ok()
        .map(|date| date.format("%Y-%m-%d").to_string())
}

/// Pretty-printed JSON of the full result
pub fn format_as_json(result: &TranscriptResult) -> serde_json::Result<String> {
    serde_json::to_string_pretty(result)
}
