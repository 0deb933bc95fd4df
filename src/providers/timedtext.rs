//! Direct caption fetch from the watch page, used as the last strategy.
//!
//! No client identity is declared: the watch page is requested like a plain
//! browser visit, the player response's caption track list is read, and the
//! chosen track is downloaded in YouTube's `json3` timedtext format.

use async_trait::async_trait;
use serde::Deserialize;

use super::vtt::decode_entities;
use super::{FetchedTranscript, ProviderError, TranscriptProvider};
use crate::identifier::VideoId;
use crate::transcript::{AvailableTrack, LanguagePlan, TranscriptSegment};

const CAPTIONS_MARKER: &str = "\"captions\":";
const CAPTIONS_END_MARKER: &str = ",\"videoDetails";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CaptionsJson {
    player_captions_tracklist_renderer: Option<TracklistRenderer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TracklistRenderer {
    #[serde(default)]
    caption_tracks: Vec<CaptionTrack>,
}

/// One entry of the player response's caption track list
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaptionTrack {
    pub base_url: String,
    pub language_code: String,
    /// `"asr"` for auto-generated tracks
    pub kind: Option<String>,
}

impl CaptionTrack {
    pub fn is_auto_generated(&self) -> bool {
        self.kind.as_deref() == Some("asr")
    }

    fn json3_url(&self) -> String {
        let base = self.base_url.replace("&fmt=srv3", "");
        format!("{}&fmt=json3", base)
    }
}

#[derive(Debug, Deserialize)]
struct TimedText {
    #[serde(default)]
    events: Vec<TimedTextEvent>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimedTextEvent {
    t_start_ms: Option<u64>,
    d_duration_ms: Option<u64>,
    segs: Option<Vec<TimedTextSeg>>,
}

#[derive(Debug, Deserialize)]
struct TimedTextSeg {
    utf8: Option<String>,
}

impl TimedTextEvent {
    /// Convert to the crate's segment shape; events without text yield `None`
    fn into_segment(self) -> Option<TranscriptSegment> {
        let raw: String = self
            .segs?
            .into_iter()
            .filter_map(|seg| seg.utf8)
            .collect();
        let text = decode_entities(&raw)
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");

        if text.is_empty() {
            return None;
        }

        Some(TranscriptSegment {
            text,
            start: self.t_start_ms.unwrap_or(0) as f64 / 1000.0,
            duration: self.d_duration_ms.unwrap_or(0) as f64 / 1000.0,
        })
    }
}

/// Read the caption track list out of a watch page
pub fn extract_caption_tracks(html: &str) -> Result<Vec<CaptionTrack>, ProviderError> {
    let Some((_, after)) = html.split_once(CAPTIONS_MARKER) else {
        if html.contains("class=\"g-recaptcha\"") {
            return Err(ProviderError::Failed(
                "YouTube is rate limiting requests from this IP".to_string(),
            ));
        }
        return Err(ProviderError::NoCaptions(
            "transcripts disabled or video unavailable".to_string(),
        ));
    };

    let fragment = after
        .split_once(CAPTIONS_END_MARKER)
        .map(|(captions, _)| captions)
        .unwrap_or(after);

    let captions: CaptionsJson = serde_json::from_str(fragment)
        .map_err(|e| ProviderError::Failed(format!("unreadable caption list: {}", e)))?;

    let tracks = captions
        .player_captions_tracklist_renderer
        .map(|renderer| renderer.caption_tracks)
        .unwrap_or_default();

    if tracks.is_empty() {
        return Err(ProviderError::NoCaptions("no caption tracks listed".to_string()));
    }

    Ok(tracks)
}

/// Parse a `fmt=json3` timedtext document
pub fn segments_from_json3(body: &str) -> Result<Vec<TranscriptSegment>, ProviderError> {
    let timed_text: TimedText = serde_json::from_str(body)
        .map_err(|e| ProviderError::Failed(format!("unreadable timedtext: {}", e)))?;

    Ok(timed_text
        .events
        .into_iter()
        .filter_map(TimedTextEvent::into_segment)
        .collect())
}

/// Secondary provider reading captions straight from youtube.com
pub struct TimedTextProvider {
    http: reqwest::Client,
}

impl TimedTextProvider {
    pub fn new() -> Self {
        Self {
            http: reqwest::Client::new(),
        }
    }

    async fn get_text(&self, url: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .get(url)
            .header(reqwest::header::ACCEPT_LANGUAGE, "en-US,en;q=0.9")
            .send()
            .await
            .map_err(|e| ProviderError::Failed(format!("request to {} failed: {}", url, e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(ProviderError::Failed(
                "YouTube is rate limiting requests from this IP".to_string(),
            ));
        }
        if !status.is_success() {
            return Err(ProviderError::Failed(format!("HTTP {} from {}", status, url)));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Failed(format!("reading {} failed: {}", url, e)))
    }
}

impl Default for TimedTextProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl TranscriptProvider for TimedTextProvider {
    async fn fetch(
        &self,
        video_id: &VideoId,
        plan: &LanguagePlan,
    ) -> Result<FetchedTranscript, ProviderError> {
        let html = self.get_text(&video_id.watch_url()).await?;
        let tracks = extract_caption_tracks(&html)?;

        let available: Vec<AvailableTrack> = tracks
            .iter()
            .map(|track| AvailableTrack {
                language_code: track.language_code.clone(),
                is_auto_generated: track.is_auto_generated(),
            })
            .collect();

        let index = plan
            .select(&available, None)
            .ok_or_else(|| ProviderError::NoCaptions(format!("no caption tracks for {}", video_id)))?;
        let track = &tracks[index];

        tracing::debug!(
            "Fetching timedtext track {} (auto: {}) for {}",
            track.language_code,
            track.is_auto_generated(),
            video_id
        );

        let segments = segments_from_json3(&self.get_text(&track.json3_url()).await?)?;
        if segments.is_empty() {
            return Err(ProviderError::NoCaptions(format!(
                "timedtext track {} is empty",
                track.language_code
            )));
        }

        Ok(FetchedTranscript {
            language_code: track.language_code.clone(),
            is_auto_generated: track.is_auto_generated(),
            title: None,
            segments,
            metadata: None,
            available_tracks: available,
        })
    }

    fn name(&self) -> &'static str {
        "timedtext"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const WATCH_PAGE: &str = r#"<html><script>var ytInitialPlayerResponse = {"playabilityStatus":{"status":"OK"},"captions":{"playerCaptionsTracklistRenderer":{"captionTracks":[{"baseUrl":"https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en&fmt=srv3","name":{"simpleText":"English"},"languageCode":"en","isTranslatable":true},{"baseUrl":"https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=es&kind=asr","languageCode":"es","kind":"asr"}]}},"videoDetails":{"videoId":"dQw4w9WgXcQ"}};</script></html>"#;

    #[test]
    fn test_extract_caption_tracks() {
        let tracks = extract_caption_tracks(WATCH_PAGE).unwrap();
        assert_eq!(tracks.len(), 2);
        assert_eq!(tracks[0].language_code, "en");
        assert!(!tracks[0].is_auto_generated());
        assert!(tracks[1].is_auto_generated());
        assert_eq!(
            tracks[0].json3_url(),
            "https://www.youtube.com/api/timedtext?v=dQw4w9WgXcQ&lang=en&fmt=json3"
        );
    }

    #[test]
    fn test_missing_captions_is_no_captions() {
        let err = extract_caption_tracks("<html>\"playabilityStatus\":{}</html>").unwrap_err();
        assert!(matches!(err, ProviderError::NoCaptions(_)));

        let err = extract_caption_tracks("<div class=\"g-recaptcha\"></div>").unwrap_err();
        assert!(matches!(err, ProviderError::Failed(_)));
    }

    #[test]
    fn test_segments_from_json3() {
        let body = r#"{"wireMagic":"pb3","events":[
            {"tStartMs":0,"dDurationMs":1500,"segs":[{"utf8":"never "},{"utf8":"gonna"}]},
            {"tStartMs":1500,"dDurationMs":10,"segs":[{"utf8":"\n"}]},
            {"tStartMs":1600},
            {"tStartMs":2000,"dDurationMs":2250,"segs":[{"utf8":"give you up &amp; more"}]}
        ]}"#;

        let segments = segments_from_json3(body).unwrap();
        assert_eq!(segments.len(), 2);
        assert_eq!(segments[0].text, "never gonna");
        assert_eq!(segments[0].duration, 1.5);
        assert_eq!(segments[1].start, 2.0);
        assert_eq!(segments[1].text, "give you up & more");
    }
}
