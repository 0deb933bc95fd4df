//! YouTube Extract - a local tool server for pulling YouTube transcripts
//!
//! This library exposes four operations (video extraction, playlist extraction,
//! output directory configuration and config inspection) on top of a three-tier
//! extraction chain: yt-dlp, yt-dlp with an alternate player client, and a direct
//! timedtext fetch as the last resort.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod extractor;
pub mod identifier;
pub mod output;
pub mod playlist;
pub mod providers;
pub mod server;
pub mod transcript;
pub mod utils;

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

pub use cli::{Cli, Commands, ResponseFormat};
pub use config::Config;
pub use dispatch::{Dispatcher, OperationResponse, ToolCall};
pub use extractor::TranscriptExtractor;
pub use identifier::{PlaylistId, VideoId};
pub use playlist::{PlaylistExtractionReport, PlaylistWalker};
pub use transcript::{SourceMethod, TranscriptResult, TranscriptSegment};

/// Result type used for plumbing (config files, CLI, stdio loop)
pub type Result<T> = anyhow::Result<T>;

/// Errors surfaced to callers of the four operations
#[derive(thiserror::Error, Debug, Clone, PartialEq)]
pub enum ExtractError {
    #[error("Invalid YouTube URL format: {0}")]
    InvalidUrlFormat(String),

    #[error("Transcript unavailable for {video_id}: {message}")]
    TranscriptUnavailable { video_id: String, message: String },

    #[error("Directory not writable: {}: {message}", path.display())]
    DirectoryNotWritable { path: PathBuf, message: String },

    #[error("Unsupported language code: {0}")]
    UnsupportedLanguage(String),

    #[error("Playlist unavailable: {0}")]
    PlaylistUnavailable(String),

    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    #[error("Unknown operation: {0}")]
    UnknownOperation(String),

    /// A result could not be encoded for the caller
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Machine-readable tag for an [`ExtractError`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidUrlFormat,
    TranscriptUnavailable,
    DirectoryNotWritable,
    UnsupportedLanguage,
    PlaylistUnavailable,
    InvalidArguments,
    UnknownOperation,
    Internal,
}

impl ExtractError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ExtractError::InvalidUrlFormat(_) => ErrorKind::InvalidUrlFormat,
            ExtractError::TranscriptUnavailable { .. } => ErrorKind::TranscriptUnavailable,
            ExtractError::DirectoryNotWritable { .. } => ErrorKind::DirectoryNotWritable,
            ExtractError::UnsupportedLanguage(_) => ErrorKind::UnsupportedLanguage,
            ExtractError::PlaylistUnavailable(_) => ErrorKind::PlaylistUnavailable,
            ExtractError::InvalidArguments(_) => ErrorKind::InvalidArguments,
            ExtractError::UnknownOperation(_) => ErrorKind::UnknownOperation,
            ExtractError::Internal(_) => ErrorKind::Internal,
        }
    }

    pub(crate) fn not_writable(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        ExtractError::DirectoryNotWritable {
            path: path.into(),
            message: message.into(),
        }
    }
}

/// An [`ExtractError`] as reported to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorReport {
    pub kind: ErrorKind,
    pub message: String,
}

impl From<&ExtractError> for ErrorReport {
    fn from(error: &ExtractError) -> Self {
        ErrorReport {
            kind: error.kind(),
            message: error.to_string(),
        }
    }
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ErrorKind::InvalidUrlFormat => "invalid_url_format",
            ErrorKind::TranscriptUnavailable => "transcript_unavailable",
            ErrorKind::DirectoryNotWritable => "directory_not_writable",
            ErrorKind::UnsupportedLanguage => "unsupported_language",
            ErrorKind::PlaylistUnavailable => "playlist_unavailable",
            ErrorKind::InvalidArguments => "invalid_arguments",
            ErrorKind::UnknownOperation => "unknown_operation",
            ErrorKind::Internal => "internal",
        };
        write!(f, "{}", name)
    }
}
