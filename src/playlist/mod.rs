use async_trait::async_trait;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::extractor::TranscriptExtractor;
use crate::identifier::{PlaylistId, VideoId};
use crate::transcript::{LanguagePlan, TranscriptResult};
use crate::{ErrorKind, ErrorReport, ExtractError};

/// One member of a playlist, in provider order
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistMember {
    /// Identifier exactly as the source listed it; empty for unavailable entries
    pub listed_id: String,
    pub title: Option<String>,
    /// Parsed identifier, or why this member cannot be extracted
    pub video_id: Result<VideoId, ExtractError>,
}

impl PlaylistMember {
    pub fn new(video_id: VideoId, title: Option<String>) -> Self {
        Self {
            listed_id: video_id.to_string(),
            title,
            video_id: Ok(video_id),
        }
    }

    /// A listed entry that is kept in position but will be reported as a failure
    pub fn unusable(listed_id: impl Into<String>, title: Option<String>, error: ExtractError) -> Self {
        Self {
            listed_id: listed_id.into(),
            title,
            video_id: Err(error),
        }
    }
}

/// Playlist membership as reported by a [`PlaylistSource`]
#[derive(Debug, Clone, PartialEq)]
pub struct PlaylistListing {
    pub playlist_id: PlaylistId,
    pub title: Option<String>,
    pub members: Vec<PlaylistMember>,
}

/// Something that can enumerate a playlist's videos
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait PlaylistSource: Send + Sync {
    async fn list_members(&self, playlist_id: &PlaylistId) -> Result<PlaylistListing, ExtractError>;
}

/// Outcome of extracting a single playlist member
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum VideoOutcome {
    Success {
        transcript: TranscriptResult,
        #[serde(skip_serializing_if = "Option::is_none")]
        saved_to: Option<std::path::PathBuf>,
        #[serde(skip_serializing_if = "Option::is_none")]
        save_error: Option<ErrorReport>,
    },
    Failure {
        kind: ErrorKind,
        message: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistEntry {
    /// 1-based position in the playlist
    pub position: usize,
    pub video_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub outcome: VideoOutcome,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaylistExtractionReport {
    pub playlist_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub total_members: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub entries: Vec<PlaylistEntry>,
    pub completed_at: chrono::DateTime<chrono::Utc>,
}

impl PlaylistExtractionReport {
    pub fn successes(&self) -> impl Iterator<Item = &TranscriptResult> {
        self.entries.iter().filter_map(|entry| match &entry.outcome {
            VideoOutcome::Success { transcript, .. } => Some(transcript),
            VideoOutcome::Failure { .. } => None,
        })
    }
}

/// Hook invoked on each successful transcript; returns where it was saved
pub type SaveHook<'a> = dyn Fn(&TranscriptResult) -> Result<std::path::PathBuf, ExtractError> + Send + Sync + 'a;

/// Walks a playlist sequentially, one extraction chain at a time
pub struct PlaylistWalker<'a> {
    source: &'a dyn PlaylistSource,
    extractor: &'a TranscriptExtractor,
    max_videos: usize,
    delay: Duration,
    show_progress: bool,
}

impl<'a> PlaylistWalker<'a> {
    pub fn new(source: &'a dyn PlaylistSource, extractor: &'a TranscriptExtractor) -> Self {
        Self {
            source,
            extractor,
            max_videos: usize::MAX,
            delay: Duration::ZERO,
            show_progress: false,
        }
    }

    pub fn max_videos(mut self, max_videos: usize) -> Self {
        self.max_videos = max_videos.max(1);
        self
    }

    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    /// Extract every member; per-video failures are recorded, not propagated.
    ///
    /// Only a failure to enumerate the playlist fails the walk. `save` is applied
    /// to each successful transcript; a save failure is attached to that entry
    /// and the transcript is kept.
    pub async fn walk(
        &self,
        playlist_id: &PlaylistId,
        plan: &LanguagePlan,
        save: Option<&SaveHook<'_>>,
    ) -> Result<PlaylistExtractionReport, ExtractError> {
        let listing = self.source.list_members(playlist_id).await?;
        let members: Vec<PlaylistMember> = listing.members.into_iter().take(self.max_videos).collect();

        tracing::info!(
            "Processing playlist {} ({} videos)",
            listing.title.as_deref().unwrap_or(playlist_id.as_str()),
            members.len()
        );

        let progress = self.progress_bar(members.len() as u64);
        let mut entries = Vec::with_capacity(members.len());

        let mut attempted = false;
        for (index, member) in members.into_iter().enumerate() {
            if let Some(pb) = &progress {
                pb.set_message(member.title.clone().unwrap_or_else(|| member.listed_id.clone()));
            }

            let outcome = match &member.video_id {
                Ok(video_id) => {
                    if attempted && !self.delay.is_zero() {
                        tokio::time::sleep(self.delay).await;
                    }
                    attempted = true;
                    self.extract_member(index + 1, video_id, plan, save).await
                }
                Err(e) => {
                    tracing::warn!("Video {} of playlist is unusable: {}", index + 1, e);
                    failure(e)
                }
            };

            entries.push(PlaylistEntry {
                position: index + 1,
                video_id: member.listed_id,
                title: member.title,
                outcome,
            });

            if let Some(pb) = &progress {
                pb.inc(1);
            }
        }

        if let Some(pb) = progress {
            pb.finish_and_clear();
        }

        let succeeded = entries
            .iter()
            .filter(|entry| matches!(entry.outcome, VideoOutcome::Success { .. }))
            .count();

        Ok(PlaylistExtractionReport {
            playlist_id: playlist_id.to_string(),
            title: listing.title,
            total_members: entries.len(),
            succeeded,
            failed: entries.len() - succeeded,
            entries,
            completed_at: chrono::Utc::now(),
        })
    }

    async fn extract_member(
        &self,
        position: usize,
        video_id: &VideoId,
        plan: &LanguagePlan,
        save: Option<&SaveHook<'_>>,
    ) -> VideoOutcome {
        let transcript = match self.extractor.extract(video_id, plan).await {
            Ok(transcript) => transcript,
            Err(e) => {
                tracing::warn!("Video {} of playlist failed: {}", position, e);
                return failure(&e);
            }
        };

        let (saved_to, save_error) = match save.map(|hook| hook(&transcript)) {
            Some(Ok(path)) => (Some(path), None),
            Some(Err(e)) => {
                tracing::warn!("Video {} of playlist extracted but not saved: {}", position, e);
                (None, Some(ErrorReport::from(&e)))
            }
            None => (None, None),
        };

        VideoOutcome::Success {
            transcript,
            saved_to,
            save_error,
        }
    }

    fn progress_bar(&self, len: u64) -> Option<ProgressBar> {
        if !self.show_progress {
            return None;
        }

        let pb = ProgressBar::new(len);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{bar:30.cyan/blue}] {pos}/{len} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style.progress_chars("#>-"));
        Some(pb)
    }
}

fn failure(error: &ExtractError) -> VideoOutcome {
    VideoOutcome::Failure {
        kind: error.kind(),
        message: error.to_string(),
    }
}
