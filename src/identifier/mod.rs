//! Canonical video and playlist identifiers parsed from user input

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::OnceLock;
use url::Url;

use crate::ExtractError;

const YOUTUBE_HOSTS: &[&str] = &[
    "youtube.com",
    "www.youtube.com",
    "m.youtube.com",
    "music.youtube.com",
    "youtube-nocookie.com",
    "www.youtube-nocookie.com",
];

/// Path prefixes that carry the video id as the next path segment
const VIDEO_PATH_PREFIXES: &[&str] = &["embed", "v", "shorts", "live", "e"];

fn video_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[0-9A-Za-z_-]{11}$").expect("valid video id regex"))
}

fn playlist_id_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"^(PL|UU|LL|FL|OL|RD|UL|EL|OLAK5uy_)[0-9A-Za-z_-]{10,}$")
            .expect("valid playlist id regex")
    })
}

/// An 11 character YouTube video id
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VideoId(String);

/// A YouTube playlist id (`PL...`, `UU...`, `OLAK5uy_...`, ...)
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlaylistId(String);

impl VideoId {
    /// Parse a watch URL, short URL, embed/shorts URL or bare id
    pub fn parse(input: &str) -> Result<Self, ExtractError> {
        let input = input.trim();

        if video_id_pattern().is_match(input) {
            return Ok(Self(input.to_string()));
        }

        let url = parse_loose_url(input)
            .ok_or_else(|| ExtractError::InvalidUrlFormat(input.to_string()))?;
        let host = url.host_str().unwrap_or_default().to_lowercase();

        let candidate = if host == "youtu.be" {
            url.path_segments().and_then(|mut segments| segments.next()).map(str::to_string)
        } else if YOUTUBE_HOSTS.contains(&host.as_str()) {
            video_id_from_youtube_url(&url)
        } else {
            None
        };

        candidate
            .filter(|id| video_id_pattern().is_match(id))
            .map(Self)
            .ok_or_else(|| ExtractError::InvalidUrlFormat(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Canonical watch URL for this video
    pub fn watch_url(&self) -> String {
        format!("https://www.youtube.com/watch?v={}", self.0)
    }
}

impl PlaylistId {
    /// Parse a playlist URL (or a watch URL carrying `list=`) or a bare playlist id
    pub fn parse(input: &str) -> Result<Self, ExtractError> {
        let input = input.trim();

        if playlist_id_pattern().is_match(input) {
            return Ok(Self(input.to_string()));
        }

        let url = parse_loose_url(input)
            .ok_or_else(|| ExtractError::InvalidUrlFormat(input.to_string()))?;
        let host = url.host_str().unwrap_or_default().to_lowercase();

        if !YOUTUBE_HOSTS.contains(&host.as_str()) && host != "youtu.be" {
            return Err(ExtractError::InvalidUrlFormat(input.to_string()));
        }

        url.query_pairs()
            .find(|(key, _)| key == "list")
            .map(|(_, value)| value.into_owned())
            .filter(|id| playlist_id_pattern().is_match(id))
            .map(Self)
            .ok_or_else(|| ExtractError::InvalidUrlFormat(input.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn playlist_url(&self) -> String {
        format!("https://www.youtube.com/playlist?list={}", self.0)
    }
}

impl fmt::Display for VideoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl fmt::Display for PlaylistId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Accept URLs with or without a scheme (`youtu.be/abc`, `www.youtube.com/watch?v=`)
fn parse_loose_url(input: &str) -> Option<Url> {
    if input.is_empty() || input.contains(char::is_whitespace) {
        return None;
    }

    let parsed = if input.starts_with("http://") || input.starts_with("https://") {
        Url::parse(input).ok()?
    } else {
        Url::parse(&format!("https://{}", input)).ok()?
    };

    matches!(parsed.scheme(), "http" | "https").then_some(parsed)
}

fn video_id_from_youtube_url(url: &Url) -> Option<String> {
    if let Some((_, value)) = url.query_pairs().find(|(key, _)| key == "v") {
        return Some(value.into_owned());
    }

    let segments: Vec<&str> = url.path_segments()?.filter(|s| !s.is_empty()).collect();
    match segments.as_slice() {
        [prefix, id, ..] if VIDEO_PATH_PREFIXES.contains(prefix) => Some(id.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ID: &str = "dQw4w9WgXcQ";

    #[test]
    fn test_all_video_shapes_share_one_id() {
        let inputs = [
            "dQw4w9WgXcQ",
            "https://www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://youtube.com/watch?v=dQw4w9WgXcQ&t=42s",
            "https://m.youtube.com/watch?feature=share&v=dQw4w9WgXcQ",
            "http://youtu.be/dQw4w9WgXcQ",
            "https://youtu.be/dQw4w9WgXcQ?si=abcdef",
            "youtu.be/dQw4w9WgXcQ",
            "www.youtube.com/watch?v=dQw4w9WgXcQ",
            "https://www.youtube.com/embed/dQw4w9WgXcQ",
            "https://www.youtube.com/shorts/dQw4w9WgXcQ",
            "https://www.youtube-nocookie.com/embed/dQw4w9WgXcQ?rel=0",
            "https://music.youtube.com/watch?v=dQw4w9WgXcQ&list=RDAMVM",
            "  https://www.youtube.com/live/dQw4w9WgXcQ  ",
        ];

        for input in inputs {
            let id = VideoId::parse(input).unwrap_or_else(|e| panic!("{}: {}", input, e));
            assert_eq!(id.as_str(), ID, "input: {}", input);
        }
    }

    #[test]
    fn test_invalid_video_inputs() {
        let inputs = [
            "",
            "not a url",
            "https://vimeo.com/123456",
            "https://www.youtube.com/watch?v=short",
            "https://www.youtube.com/channel/UCxyz",
            "ftp://youtube.com/watch?v=dQw4w9WgXcQ",
            "https://evil.example.com/watch?v=dQw4w9WgXcQ",
        ];

        for input in inputs {
            let err = VideoId::parse(input).unwrap_err();
            assert!(matches!(err, ExtractError::InvalidUrlFormat(_)), "input: {}", input);
        }
    }

    #[test]
    fn test_playlist_shapes() {
        let list = "PLrAXtmErZgOeiKm4sgNOknGvNjby9efdf";
        let inputs = [
            list.to_string(),
            format!("https://www.youtube.com/playlist?list={}", list),
            format!("https://youtube.com/watch?v={}&list={}&index=2", ID, list),
            format!("youtube.com/playlist?list={}", list),
        ];

        for input in &inputs {
            assert_eq!(PlaylistId::parse(input).unwrap().as_str(), list, "input: {}", input);
        }
    }

    #[test]
    fn test_invalid_playlist_inputs() {
        assert!(PlaylistId::parse("https://www.youtube.com/watch?v=dQw4w9WgXcQ").is_err());
        assert!(PlaylistId::parse("https://example.com/playlist?list=PLrAXtmErZgOeiKm4sgNOknGvNjby9efdf").is_err());
        assert!(PlaylistId::parse("XXrAXtmErZgOeiKm4sg").is_err());
    }

    #[test]
    fn test_canonical_urls() {
        let id = VideoId::parse(ID).unwrap();
        assert_eq!(id.watch_url(), "https://www.youtube.com/watch?v=dQw4w9WgXcQ");
        assert_eq!(id.to_string(), ID);
    }
}
