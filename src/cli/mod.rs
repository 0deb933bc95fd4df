use clap::{Parser, Subcommand, ValueEnum};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Parser)]
#[command(
    name = "youtube-extract",
    about = "YouTube Extract - pull transcripts from YouTube videos and playlists",
    version,
    long_about = "Extracts YouTube transcripts through yt-dlp, retrying with an alternate player client on PO token failures and falling back to a direct timedtext fetch. Run `serve` to accept line-delimited JSON tool calls on stdin."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "YOUTUBE_EXTRACT_CONFIG_PATH", value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Disable progress indicators and informational logs
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Extract the transcript of a single video
    Video {
        /// Video URL (watch, youtu.be, embed, shorts) or bare video id
        #[arg(value_name = "URL")]
        url: String,

        /// Preferred language code(s), comma separated, or `auto`
        #[arg(short, long, value_name = "LANG", default_value = "auto")]
        language: String,

        /// Omit timestamps from the rendered transcript
        #[arg(long)]
        no_timestamps: bool,

        /// Response format
        #[arg(short, long, value_enum, default_value = "json")]
        format: ResponseFormat,

        /// Save the transcript to the configured output directory
        #[arg(long)]
        save: bool,
    },

    /// Extract transcripts for every video of a playlist
    Playlist {
        /// Playlist URL or bare playlist id
        #[arg(value_name = "PLAYLIST_URL")]
        playlist_url: String,

        /// Preferred language code(s), comma separated, or `auto`
        #[arg(short, long, value_name = "LANG", default_value = "auto")]
        language: String,

        /// Maximum number of videos to process (1-100)
        #[arg(long, value_name = "COUNT")]
        max_videos: Option<usize>,

        /// Save each transcript to the configured output directory
        #[arg(long)]
        save: bool,
    },

    /// Set the directory transcripts are saved to
    Configure {
        /// Existing directory, or a new direct child of an existing one
        #[arg(value_name = "DIR")]
        path: String,
    },

    /// Show the current configuration
    Config {
        /// Show current configuration
        #[arg(short, long)]
        show: bool,
    },

    /// Serve tool calls as line-delimited JSON over stdin/stdout
    Serve,
}

#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResponseFormat {
    /// Human readable report
    Text,
    /// Structured JSON
    #[default]
    Json,
}

impl std::fmt::Display for ResponseFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ResponseFormat::Text => write!(f, "text"),
            ResponseFormat::Json => write!(f, "json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_video_defaults() {
        let cli = Cli::try_parse_from(["youtube-extract", "video", "dQw4w9WgXcQ"]).unwrap();
        match cli.command {
            Commands::Video {
                language,
                no_timestamps,
                format,
                save,
                ..
            } => {
                assert_eq!(language, "auto");
                assert!(!no_timestamps);
                assert_eq!(format, ResponseFormat::Json);
                assert!(!save);
            }
            _ => panic!("expected video command"),
        }
    }
}
