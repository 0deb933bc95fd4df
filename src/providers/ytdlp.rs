use async_trait::async_trait;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::process::Stdio;
use tokio::process::Command;

use super::{classify_failure, truncate_message, vtt, FetchedTranscript, ProviderError, TranscriptProvider};
use crate::config::ProviderSettings;
use crate::identifier::{PlaylistId, VideoId};
use crate::playlist::{PlaylistListing, PlaylistMember, PlaylistSource};
use crate::transcript::{AvailableTrack, LanguagePlan, VideoMetadata};
use crate::ExtractError;

/// Keeps error messages readable when yt-dlp dumps a long stderr
const MAX_ERROR_CHARS: usize = 600;

/// Subset of `yt-dlp --dump-json` used for caption selection and metadata
#[derive(Debug, Deserialize)]
struct VideoInfo {
    id: String,
    title: Option<String>,
    language: Option<String>,
    channel: Option<String>,
    uploader: Option<String>,
    duration: Option<f64>,
    upload_date: Option<String>,
    view_count: Option<u64>,
    description: Option<String>,
    webpage_url: Option<String>,
    subtitles: Option<BTreeMap<String, Vec<SubtitleFormat>>>,
    automatic_captions: Option<BTreeMap<String, Vec<SubtitleFormat>>>,
}

#[derive(Debug, Clone, Deserialize)]
struct SubtitleFormat {
    ext: String,
    url: Option<String>,
}

/// A caption track together with the download options yt-dlp reported for it
#[derive(Debug)]
struct CaptionChoice {
    track: AvailableTrack,
    formats: Vec<SubtitleFormat>,
}

impl VideoInfo {
    /// Manual tracks first, then auto-generated, each in language-code order
    fn caption_choices(&self) -> Vec<CaptionChoice> {
        let manual = self.subtitles.iter().flatten().map(|entry| (entry, false));
        let auto = self.automatic_captions.iter().flatten().map(|entry| (entry, true));

        manual
            .chain(auto)
            .filter(|((code, _), _)| code.as_str() != "live_chat")
            .map(|((code, formats), is_auto_generated)| CaptionChoice {
                track: AvailableTrack {
                    language_code: code.clone(),
                    is_auto_generated,
                },
                formats: formats.clone(),
            })
            .collect()
    }

    fn metadata(&self) -> Option<VideoMetadata> {
        let metadata = VideoMetadata {
            channel: self.channel.clone().or_else(|| self.uploader.clone()),
            duration: self.duration,
            upload_date: self.upload_date.clone(),
            view_count: self.view_count,
            description: self.description.clone(),
            webpage_url: self.webpage_url.clone(),
        };
        (!metadata.is_empty()).then_some(metadata)
    }

    /// The language yt-dlp believes the video is spoken in
    fn default_language(&self) -> Option<String> {
        self.language.clone().or_else(|| {
            self.automatic_captions
                .iter()
                .flatten()
                .map(|(code, _)| code)
                .find(|code| code.ends_with("-orig"))
                .map(|code| code.trim_end_matches("-orig").to_string())
        })
    }
}

/// Transcript provider backed by the yt-dlp executable.
///
/// The primary and alternate strategies are both this provider; they differ only
/// in the player clients yt-dlp is told to impersonate.
pub struct YtDlpProvider {
    yt_dlp_path: String,
    player_clients: Vec<String>,
    name: &'static str,
    http: reqwest::Client,
}

impl YtDlpProvider {
    pub fn new(yt_dlp_path: impl Into<String>, player_clients: Vec<String>, name: &'static str) -> Self {
        Self {
            yt_dlp_path: yt_dlp_path.into(),
            player_clients,
            name,
            http: reqwest::Client::new(),
        }
    }

    pub fn primary(settings: &ProviderSettings) -> Self {
        Self::new(&settings.yt_dlp_path, settings.primary_clients.clone(), "yt-dlp")
    }

    pub fn alternate(settings: &ProviderSettings) -> Self {
        Self::new(
            &settings.yt_dlp_path,
            settings.alternate_clients.clone(),
            "yt-dlp (alternate client)",
        )
    }

    /// `--extractor-args` value: client identity plus the PO token bypass flag
    fn extractor_args(&self) -> String {
        format!(
            "youtube:player_client={};formats=missing_pot",
            self.player_clients.join(",")
        )
    }

    fn info_args(&self, video_id: &VideoId) -> Vec<String> {
        vec![
            "--dump-json".to_string(),
            "--skip-download".to_string(),
            "--no-playlist".to_string(),
            "--extractor-args".to_string(),
            self.extractor_args(),
            video_id.watch_url(),
        ]
    }

    async fn get_video_info(&self, video_id: &VideoId) -> Result<VideoInfo, ProviderError> {
        tracing::debug!(
            "Running {} for {} with clients {:?}",
            self.yt_dlp_path,
            video_id,
            self.player_clients
        );

        let output = Command::new(&self.yt_dlp_path)
            .args(self.info_args(video_id))
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| ProviderError::Failed(format!("failed to run {}: {}", self.yt_dlp_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(classify_failure(&truncate_message(&stderr, MAX_ERROR_CHARS)));
        }

        serde_json::from_slice(&output.stdout)
            .map_err(|e| ProviderError::Failed(format!("unexpected yt-dlp output: {}", e)))
    }

    async fn download_captions(&self, url: &str) -> Result<String, ProviderError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| ProviderError::Failed(format!("caption download failed: {}", e)))?;

        let status = response.status();
        if status == reqwest::StatusCode::FORBIDDEN {
            return Err(ProviderError::Authorization(format!(
                "caption download rejected (HTTP {}); a PO token may be required",
                status
            )));
        }
        if !status.is_success() {
            return Err(ProviderError::Failed(format!("caption download failed: HTTP {}", status)));
        }

        response
            .text()
            .await
            .map_err(|e| ProviderError::Failed(format!("caption download failed: {}", e)))
    }
}

#[async_trait]
impl TranscriptProvider for YtDlpProvider {
    async fn fetch(
        &self,
        video_id: &VideoId,
        plan: &LanguagePlan,
    ) -> Result<FetchedTranscript, ProviderError> {
        let info = self.get_video_info(video_id).await?;
        let choices = info.caption_choices();
        let tracks: Vec<AvailableTrack> = choices.iter().map(|c| c.track.clone()).collect();
        let default_language = info.default_language();

        let index = plan
            .select(&tracks, default_language.as_deref())
            .ok_or_else(|| ProviderError::NoCaptions(format!("yt-dlp lists no captions for {}", info.id)))?;
        let choice = &choices[index];

        let url = choice
            .formats
            .iter()
            .find(|format| format.ext == "vtt")
            .and_then(|format| format.url.as_deref())
            .ok_or_else(|| {
                ProviderError::Failed(format!(
                    "no vtt download for caption track {}",
                    choice.track.language_code
                ))
            })?;

        tracing::debug!(
            "Selected caption track {} (auto: {}) for {}",
            choice.track.language_code,
            choice.track.is_auto_generated,
            video_id
        );

        let segments = vtt::parse(
            &self.download_captions(url).await?,
            choice.track.is_auto_generated,
        );
        if segments.is_empty() {
            return Err(ProviderError::NoCaptions(format!(
                "caption track {} is empty",
                choice.track.language_code
            )));
        }

        Ok(FetchedTranscript {
            language_code: choice.track.language_code.trim_end_matches("-orig").to_string(),
            is_auto_generated: choice.track.is_auto_generated,
            metadata: info.metadata(),
            title: info.title,
            segments,
            available_tracks: tracks,
        })
    }

    fn name(&self) -> &'static str {
        self.name
    }
}

/// `yt-dlp --flat-playlist --dump-single-json` output
#[derive(Debug, Deserialize)]
struct FlatPlaylist {
    title: Option<String>,
    #[serde(default)]
    entries: Vec<Option<FlatEntry>>,
}

#[derive(Debug, Deserialize)]
struct FlatEntry {
    id: Option<String>,
    title: Option<String>,
}

/// Enumerates playlist members with yt-dlp's flat playlist mode
pub struct YtDlpPlaylistSource {
    yt_dlp_path: String,
}

impl YtDlpPlaylistSource {
    pub fn new(settings: &ProviderSettings) -> Self {
        Self {
            yt_dlp_path: settings.yt_dlp_path.clone(),
        }
    }
}

/// Every listed entry becomes a member, broken ones included, so positions match the playlist
fn listing_from_flat(playlist_id: &PlaylistId, flat: FlatPlaylist) -> PlaylistListing {
    let members = flat
        .entries
        .into_iter()
        .map(|entry| match entry {
            Some(FlatEntry { id: Some(raw_id), title }) => match VideoId::parse(&raw_id) {
                Ok(video_id) => PlaylistMember::new(video_id, title),
                Err(e) => PlaylistMember::unusable(raw_id, title, e),
            },
            Some(FlatEntry { id: None, title }) => PlaylistMember::unusable("", title, unavailable_entry()),
            None => PlaylistMember::unusable("", None, unavailable_entry()),
        })
        .collect();

    PlaylistListing {
        playlist_id: playlist_id.clone(),
        title: flat.title,
        members,
    }
}

/// yt-dlp lists deleted and private videos without an id
fn unavailable_entry() -> ExtractError {
    ExtractError::TranscriptUnavailable {
        video_id: String::new(),
        message: "playlist entry is unavailable (deleted or private video)".to_string(),
    }
}

#[async_trait]
impl PlaylistSource for YtDlpPlaylistSource {
    async fn list_members(&self, playlist_id: &PlaylistId) -> Result<PlaylistListing, ExtractError> {
        tracing::debug!("Listing playlist {}", playlist_id);

        let output = Command::new(&self.yt_dlp_path)
            .args(["--flat-playlist", "--dump-single-json"])
            .arg(playlist_id.playlist_url())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| {
                ExtractError::PlaylistUnavailable(format!("failed to run {}: {}", self.yt_dlp_path, e))
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(ExtractError::PlaylistUnavailable(truncate_message(
                &stderr,
                MAX_ERROR_CHARS,
            )));
        }

        let flat: FlatPlaylist = serde_json::from_slice(&output.stdout).map_err(|e| {
            ExtractError::PlaylistUnavailable(format!("unexpected yt-dlp output: {}", e))
        })?;

        Ok(listing_from_flat(playlist_id, flat))
    }
}
