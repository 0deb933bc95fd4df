use serde::{Deserialize, Serialize};
use std::fmt;

use crate::utils::{base_language, is_valid_language_code};
use crate::ExtractError;

/// One timed caption unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptSegment {
    /// Segment text
    pub text: String,

    /// Start offset in seconds
    pub start: f64,

    /// Duration in seconds
    pub duration: f64,
}

/// Which tier of the extraction chain produced a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceMethod {
    /// yt-dlp with the default player clients
    Primary,
    /// yt-dlp with the alternate player clients
    Alternate,
    /// Direct timedtext fetch
    Fallback,
}

impl fmt::Display for SourceMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SourceMethod::Primary => write!(f, "primary"),
            SourceMethod::Alternate => write!(f, "alternate"),
            SourceMethod::Fallback => write!(f, "fallback"),
        }
    }
}

/// A transcript as returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscriptResult {
    pub video_id: String,

    /// Video title, when the provider reports one
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Language code of the caption track that was used
    pub language_code: String,

    pub is_auto_generated: bool,

    /// Segments in chronological order
    pub segments: Vec<TranscriptSegment>,

    pub source_method: SourceMethod,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<VideoMetadata>,

    /// Every caption track the provider offered, not just the one used
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub available_tracks: Vec<AvailableTrack>,
}

/// Descriptive video details reported alongside the captions
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VideoMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub channel: Option<String>,

    /// Length in seconds
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,

    /// `YYYYMMDD`, as yt-dlp reports it
    #[serde(skip_serializing_if = "Option::is_none")]
    pub upload_date: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub view_count: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub webpage_url: Option<String>,
}

impl VideoMetadata {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

impl TranscriptResult {
    pub fn plain_text(&self) -> String {
        self.segments
            .iter()
            .map(|segment| segment.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    pub fn word_count(&self) -> usize {
        self.segments
            .iter()
            .map(|segment| segment.text.split_whitespace().count())
            .sum()
    }
}

/// The language part of a request: `auto` or an explicit list of codes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LanguageRequest {
    Auto,
    Codes(Vec<String>),
}

impl LanguageRequest {
    /// Parse `auto`, an empty string, a single code or a comma separated list.
    ///
    /// Malformed codes are dropped and returned alongside the request as
    /// [`ExtractError::UnsupportedLanguage`] so callers can log them. A request whose
    /// codes are all malformed degrades to `Auto`.
    pub fn parse(input: &str) -> (Self, Vec<ExtractError>) {
        let trimmed = input.trim();
        if trimmed.is_empty() || trimmed.eq_ignore_ascii_case("auto") {
            return (LanguageRequest::Auto, Vec::new());
        }

        let mut codes = Vec::new();
        let mut rejected = Vec::new();
        for raw in trimmed.split(',').map(str::trim).filter(|s| !s.is_empty()) {
            if raw.eq_ignore_ascii_case("auto") {
                continue;
            }
            if is_valid_language_code(raw) {
                codes.push(raw.to_string());
            } else {
                rejected.push(ExtractError::UnsupportedLanguage(raw.to_string()));
            }
        }

        if codes.is_empty() {
            (LanguageRequest::Auto, rejected)
        } else {
            (LanguageRequest::Codes(codes), rejected)
        }
    }

    /// Resolve against the configured defaults into an ordered plan
    pub fn resolve(&self, default_languages: &[String]) -> LanguagePlan {
        let mut preferred: Vec<String> = Vec::new();
        let requested = match self {
            LanguageRequest::Auto => &[][..],
            LanguageRequest::Codes(codes) => codes.as_slice(),
        };

        for code in requested.iter().chain(default_languages.iter()) {
            if !preferred.iter().any(|p| p.eq_ignore_ascii_case(code)) {
                preferred.push(code.clone());
            }
        }

        LanguagePlan { preferred }
    }
}

impl fmt::Display for LanguageRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LanguageRequest::Auto => write!(f, "auto"),
            LanguageRequest::Codes(codes) => write!(f, "{}", codes.join(",")),
        }
    }
}

/// Ordered language preferences handed to the providers.
///
/// The provider's own default language is always the last resort, after every
/// entry in `preferred`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct LanguagePlan {
    pub preferred: Vec<String>,
}

/// A caption track offered by a provider, reduced to what selection needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AvailableTrack {
    pub language_code: String,
    pub is_auto_generated: bool,
}

impl LanguagePlan {
    pub fn new<S: Into<String>>(preferred: impl IntoIterator<Item = S>) -> Self {
        Self {
            preferred: preferred.into_iter().map(Into::into).collect(),
        }
    }

    /// Pick a track index.
    ///
    /// For each preferred language in order: manual before auto-generated, exact
    /// code before a base-language match. Falls back to the track matching
    /// `provider_default`, then to the first listed track.
    pub fn select(&self, tracks: &[AvailableTrack], provider_default: Option<&str>) -> Option<usize> {
        if tracks.is_empty() {
            return None;
        }

        for language in &self.preferred {
            if let Some(index) = find_track(tracks, language) {
                return Some(index);
            }
            tracing::debug!("No caption track for language {}", language);
        }

        provider_default
            .and_then(|language| find_track(tracks, language))
            .or(Some(0))
    }
}

fn find_track(tracks: &[AvailableTrack], language: &str) -> Option<usize> {
    let exact = |t: &AvailableTrack| t.language_code.eq_ignore_ascii_case(language);
    let base = |t: &AvailableTrack| base_language(&t.language_code) == base_language(language);

    for auto_generated in [false, true] {
        let kind = |t: &AvailableTrack| t.is_auto_generated == auto_generated;
        if let Some(index) = tracks.iter().position(|t| kind(t) && exact(t)) {
            return Some(index);
        }
        if let Some(index) = tracks.iter().position(|t| kind(t) && base(t)) {
            return Some(index);
        }
    }

    None
}
