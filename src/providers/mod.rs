//! Transcript providers and the error classification shared by them.
//!
//! A provider turns a video id and a [`LanguagePlan`] into a
//! [`FetchedTranscript`]. Provider-native payloads (yt-dlp JSON, WebVTT cues,
//! timedtext events) never leave the provider: everything is converted to
//! [`TranscriptSegment`] before it is returned.

use async_trait::async_trait;

pub mod timedtext;
pub mod vtt;
pub mod ytdlp;

use crate::identifier::VideoId;
use crate::transcript::{AvailableTrack, LanguagePlan, TranscriptSegment, VideoMetadata};

/// Substrings that identify the proof-of-origin token failure class
const AUTHORIZATION_MARKERS: &[&str] = &[
    "po_token",
    "po token",
    "missing_pot",
    "proof of origin",
    "sign in to confirm",
    "http error 403",
];

/// Errors a provider can report
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// The provider was rejected for lack of a proof-of-origin token. Only used
    /// to decide whether the alternate client identity is worth a try.
    #[error("Provider authorization failure: {0}")]
    Authorization(String),

    #[error("No captions available: {0}")]
    NoCaptions(String),

    #[error("Provider failed: {0}")]
    Failed(String),
}

impl ProviderError {
    pub fn is_authorization(&self) -> bool {
        matches!(self, ProviderError::Authorization(_))
    }
}

/// Transcript as produced by a provider, before it is tagged with a source method
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTranscript {
    pub language_code: String,
    pub is_auto_generated: bool,
    pub title: Option<String>,
    pub segments: Vec<TranscriptSegment>,
    pub metadata: Option<VideoMetadata>,
    pub available_tracks: Vec<AvailableTrack>,
}

/// A source of transcripts for a single video
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranscriptProvider: Send + Sync {
    /// Fetch the best available transcript for `video_id` according to `plan`
    async fn fetch(
        &self,
        video_id: &VideoId,
        plan: &LanguagePlan,
    ) -> Result<FetchedTranscript, ProviderError>;

    /// Short name used in logs
    fn name(&self) -> &'static str;
}

/// Classify a raw failure message from a provider
pub fn classify_failure(message: &str) -> ProviderError {
    let lower = message.to_lowercase();

    if AUTHORIZATION_MARKERS.iter().any(|marker| lower.contains(marker)) {
        ProviderError::Authorization(message.trim().to_string())
    } else if lower.contains("no subtitles")
        || lower.contains("subtitles are disabled")
        || lower.contains("transcripts disabled")
    {
        ProviderError::NoCaptions(message.trim().to_string())
    } else {
        ProviderError::Failed(message.trim().to_string())
    }
}

/// Keep the tail of a long stderr dump, where the actual error usually sits
pub(crate) fn truncate_message(message: &str, max_chars: usize) -> String {
    let trimmed = message.trim();
    let count = trimmed.chars().count();
    if count <= max_chars {
        return trimmed.to_string();
    }
    let tail: String = trimmed.chars().skip(count - max_chars).collect();
    format!("...{}", tail)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_authorization_markers() {
        let samples = [
            "ERROR: [youtube] dQw4w9WgXcQ: Some formats require a PO Token",
            "WARNING: android client https formats require a GVS PO Token; missing_pot",
            "ERROR: [youtube] abc: Sign in to confirm you're not a bot",
            "ERROR: unable to download video data: HTTP Error 403: Forbidden",
        ];
        for sample in samples {
            assert!(classify_failure(sample).is_authorization(), "sample: {}", sample);
        }
    }

    #[test]
    fn test_classify_other_failures() {
        assert!(matches!(
            classify_failure("ERROR: [youtube] abc: Video unavailable"),
            ProviderError::Failed(_)
        ));
        assert!(matches!(
            classify_failure("There are no subtitles for the requested languages"),
            ProviderError::NoCaptions(_)
        ));
    }

    #[test]
    fn test_truncate_message_keeps_tail() {
        assert_eq!(truncate_message("  short  ", 10), "short");
        assert_eq!(truncate_message("abcdefghij", 4), "...ghij");
    }
}
