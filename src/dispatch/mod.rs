//! The four externally callable operations.
//!
//! The [`Dispatcher`] owns the configuration and threads it through every
//! operation; there is no process-global state. Each operation has a typed
//! entry point, and [`Dispatcher::call`] routes a named [`ToolCall`] to it and
//! wraps the outcome in an [`OperationResponse`].

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cli::ResponseFormat;
use crate::config::{expand_home, Config};
use crate::extractor::TranscriptExtractor;
use crate::identifier::{PlaylistId, VideoId};
use crate::output::{self, TranscriptFormat};
use crate::playlist::{PlaylistExtractionReport, PlaylistSource, PlaylistWalker};
use crate::providers::ytdlp::YtDlpPlaylistSource;
use crate::transcript::{LanguagePlan, LanguageRequest, TranscriptResult};
use crate::{ErrorReport, ExtractError};

/// Hard ceiling for a per-call `max_videos`
pub const MAX_PLAYLIST_VIDEOS: usize = 100;

const WRITE_PROBE: &str = ".write_test";

fn default_language() -> String {
    "auto".to_string()
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractVideoArgs {
    pub url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default = "default_true")]
    pub include_timestamps: bool,
    #[serde(default)]
    pub format: ResponseFormat,
    #[serde(default)]
    pub save_locally: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractPlaylistArgs {
    pub playlist_url: String,
    #[serde(default = "default_language")]
    pub language: String,
    #[serde(default)]
    pub max_videos: Option<usize>,
    #[serde(default)]
    pub save_locally: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigureArgs {
    #[serde(alias = "directory_path")]
    pub path: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoExtraction {
    pub transcript: TranscriptResult,
    /// Rendered transcript, timestamped or plain depending on the request
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub saved_to: Option<PathBuf>,
    /// Why a requested save did not happen; the transcript is still returned
    #[serde(skip_serializing_if = "Option::is_none")]
    pub save_error: Option<ErrorReport>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigureOutcome {
    pub output_directory: PathBuf,
    /// Whether the new directory was written back to the config file
    pub persisted: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigSnapshot {
    #[serde(flatten)]
    pub config: Config,
    pub config_file: Option<PathBuf>,
    pub config_file_exists: bool,
}

/// Name and summary of an operation, returned by `list_tools`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub arguments: Vec<String>,
}

pub fn tool_descriptors() -> Vec<ToolDescriptor> {
    let describe = |name: &str, description: &str, arguments: &[&str]| ToolDescriptor {
        name: name.to_string(),
        description: description.to_string(),
        arguments: arguments.iter().map(|a| a.to_string()).collect(),
    };

    vec![
        describe(
            "youtube_extract_video",
            "Extract a video transcript, optionally saving it to the output directory",
            &["url", "language", "include_timestamps", "format", "save_locally"],
        ),
        describe(
            "youtube_extract_playlist",
            "Extract transcripts for every video of a playlist; failures are reported per video",
            &["playlist_url", "language", "max_videos", "save_locally"],
        ),
        describe(
            "configure_output_directory",
            "Set the directory transcripts are saved to",
            &["path"],
        ),
        describe("show_current_config", "Show the active configuration", &[]),
    ]
}

/// A named operation with JSON arguments, as delivered by the host transport
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    pub tool: String,
    #[serde(default)]
    pub arguments: Value,
}

/// Structured result of every operation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum OperationResponse {
    Success { result: Value },
    Failure { error: ErrorReport },
}

impl OperationResponse {
    pub fn failure(error: &ExtractError) -> Self {
        OperationResponse::Failure {
            error: ErrorReport::from(error),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, OperationResponse::Success { .. })
    }
}

pub struct Dispatcher {
    config: Config,
    config_path: Option<PathBuf>,
    extractor: TranscriptExtractor,
    playlist_source: Box<dyn PlaylistSource>,
    show_progress: bool,
}

impl Dispatcher {
    /// Dispatcher backed by yt-dlp and the timedtext fetch
    pub fn new(config: Config, config_path: Option<PathBuf>) -> Self {
        let extractor = TranscriptExtractor::from_settings(&config.providers);
        let playlist_source = Box::new(YtDlpPlaylistSource::new(&config.providers));
        Self::with_components(config, config_path, extractor, playlist_source)
    }

    pub fn with_components(
        config: Config,
        config_path: Option<PathBuf>,
        extractor: TranscriptExtractor,
        playlist_source: Box<dyn PlaylistSource>,
    ) -> Self {
        Self {
            config,
            config_path,
            extractor,
            playlist_source,
            show_progress: false,
        }
    }

    pub fn show_progress(mut self, show_progress: bool) -> Self {
        self.show_progress = show_progress;
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    fn language_plan(&self, language: &str) -> LanguagePlan {
        let (request, rejected) = LanguageRequest::parse(language);
        for error in rejected {
            tracing::warn!("{} (ignored)", error);
        }
        request.resolve(&self.config.default_languages)
    }

    /// `youtube_extract_video`
    pub async fn extract_video(&self, args: &ExtractVideoArgs) -> Result<VideoExtraction, ExtractError> {
        let video_id = VideoId::parse(&args.url)?;
        let plan = self.language_plan(&args.language);

        tracing::info!("Extracting video {} (languages: {:?})", video_id, plan.preferred);
        let transcript = self.extractor.extract(&video_id, &plan).await?;

        let format = TranscriptFormat::from_timestamps(args.include_timestamps);
        let mut saved_to = None;
        let mut save_error = None;
        if args.save_locally {
            match output::save_to_directory(&transcript, format, &self.config.output_directory) {
                Ok(path) => saved_to = Some(path),
                Err(e) => {
                    tracing::warn!("Transcript for {} extracted but not saved: {}", video_id, e);
                    save_error = Some(ErrorReport::from(&e));
                }
            }
        }

        Ok(VideoExtraction {
            text: format.render(&transcript),
            transcript,
            saved_to,
            save_error,
        })
    }

    /// `youtube_extract_playlist`
    pub async fn extract_playlist(
        &self,
        args: &ExtractPlaylistArgs,
    ) -> Result<PlaylistExtractionReport, ExtractError> {
        let playlist_id = PlaylistId::parse(&args.playlist_url)?;
        let plan = self.language_plan(&args.language);
        let max_videos = args
            .max_videos
            .unwrap_or(self.config.playlist.max_videos)
            .clamp(1, MAX_PLAYLIST_VIDEOS);

        let walker = PlaylistWalker::new(self.playlist_source.as_ref(), &self.extractor)
            .max_videos(max_videos)
            .delay(Duration::from_millis(self.config.playlist.delay_ms))
            .show_progress(self.show_progress);

        let directory = self.config.output_directory.as_path();
        let save = |transcript: &TranscriptResult| {
            output::save_to_directory(transcript, TranscriptFormat::Plain, directory)
        };

        let report = if args.save_locally {
            walker.walk(&playlist_id, &plan, Some(&save)).await?
        } else {
            walker.walk(&playlist_id, &plan, None).await?
        };

        tracing::info!(
            "Playlist {} finished: {} succeeded, {} failed",
            playlist_id,
            report.succeeded,
            report.failed
        );
        Ok(report)
    }

    /// `configure_output_directory`
    ///
    /// The directory must exist, or be a direct child of an existing directory
    /// (in which case it is created). The resolved absolute path replaces the
    /// configured one and is written back to the config file when there is one.
    pub fn configure_output_directory(&mut self, args: &ConfigureArgs) -> Result<ConfigureOutcome, ExtractError> {
        let raw = args.path.trim();
        if raw.is_empty() {
            return Err(ExtractError::InvalidArguments("directory path is required".to_string()));
        }

        let mut directory = expand_home(Path::new(raw));
        if directory.is_relative() {
            let cwd = std::env::current_dir().map_err(|e| ExtractError::not_writable(&directory, e.to_string()))?;
            directory = cwd.join(directory);
        }

        prepare_directory(&directory)?;

        let resolved = fs_err::canonicalize(&directory)
            .map_err(|e| ExtractError::not_writable(&directory, e.to_string()))?;

        self.config.output_directory = resolved.clone();

        let persisted = match &self.config_path {
            Some(path) => match self.config.save(path) {
                Ok(()) => true,
                Err(e) => {
                    tracing::warn!("Could not persist configuration: {:#}", e);
                    false
                }
            },
            None => false,
        };

        tracing::info!("Output directory set to {}", resolved.display());
        Ok(ConfigureOutcome {
            output_directory: resolved,
            persisted,
        })
    }

    /// `show_current_config`
    pub fn show_current_config(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            config: self.config.clone(),
            config_file: self.config_path.clone(),
            config_file_exists: self.config_path.as_deref().map(Path::exists).unwrap_or(false),
        }
    }

    /// Route a named call to its operation
    pub async fn call(&mut self, call: ToolCall) -> OperationResponse {
        tracing::info!("Executing tool: {}", call.tool);

        let result = match call.tool.as_str() {
            "youtube_extract_video" => match parse_args::<ExtractVideoArgs>(call.arguments) {
                Ok(args) => self
                    .extract_video(&args)
                    .await
                    .and_then(|extraction| video_response(&extraction, &args)),
                Err(e) => Err(e),
            },
            "youtube_extract_playlist" => match parse_args::<ExtractPlaylistArgs>(call.arguments) {
                Ok(args) => self.extract_playlist(&args).await.and_then(to_value),
                Err(e) => Err(e),
            },
            "configure_output_directory" => parse_args::<ConfigureArgs>(call.arguments)
                .and_then(|args| self.configure_output_directory(&args))
                .and_then(to_value),
            "show_current_config" => to_value(self.show_current_config()),
            "list_tools" => to_value(tool_descriptors()),
            other => Err(ExtractError::UnknownOperation(other.to_string())),
        };

        match result {
            Ok(result) => OperationResponse::Success { result },
            Err(e) => {
                tracing::error!("Tool {} failed: {}", call.tool, e);
                OperationResponse::failure(&e)
            }
        }
    }
}

/// Create the directory if only its last component is missing, then probe writes
fn prepare_directory(directory: &Path) -> Result<(), ExtractError> {
    if !directory.exists() {
        let parent_exists = directory.parent().map(Path::is_dir).unwrap_or(false);
        if !parent_exists {
            return Err(ExtractError::not_writable(directory, "parent directory does not exist"));
        }
        fs_err::create_dir(directory).map_err(|e| ExtractError::not_writable(directory, e.to_string()))?;
    } else if !directory.is_dir() {
        return Err(ExtractError::not_writable(directory, "not a directory"));
    }

    let probe = directory.join(WRITE_PROBE);
    fs_err::write(&probe, b"test").map_err(|e| ExtractError::not_writable(directory, e.to_string()))?;
    fs_err::remove_file(&probe).map_err(|e| ExtractError::not_writable(directory, e.to_string()))?;
    Ok(())
}

fn parse_args<T: serde::de::DeserializeOwned>(arguments: Value) -> Result<T, ExtractError> {
    let arguments = if arguments.is_null() {
        Value::Object(Default::default())
    } else {
        arguments
    };
    serde_json::from_value(arguments).map_err(|e| ExtractError::InvalidArguments(e.to_string()))
}

fn to_value<T: Serialize>(value: T) -> Result<Value, ExtractError> {
    serde_json::to_value(value).map_err(|e| ExtractError::Internal(e.to_string()))
}

fn video_response(extraction: &VideoExtraction, args: &ExtractVideoArgs) -> Result<Value, ExtractError> {
    match args.format {
        ResponseFormat::Json => to_value(extraction),
        ResponseFormat::Text => {
            let mut text = output::format_as_text(&extraction.transcript, args.include_timestamps);
            if let Some(path) = &extraction.saved_to {
                text.push_str(&format!("\n\nSaved to: {}", path.display()));
            }
            if let Some(error) = &extraction.save_error {
                text.push_str(&format!("\n\nNot saved ({}): {}", error.kind, error.message));
            }
            Ok(Value::String(text))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{Strategy, Trigger};
    use crate::playlist::MockPlaylistSource;
    use crate::providers::{FetchedTranscript, MockTranscriptProvider};
    use crate::transcript::{AvailableTrack, SourceMethod, TranscriptSegment, VideoMetadata};
    use crate::ErrorKind;
    use serde_json::json;
    use std::sync::Arc;

    fn fetched() -> FetchedTranscript {
        FetchedTranscript {
            language_code: "es".to_string(),
            is_auto_generated: false,
            title: Some("Title".to_string()),
            segments: vec![
                TranscriptSegment { text: "hola".to_string(), start: 0.0, duration: 1.0 },
                TranscriptSegment { text: "mundo".to_string(), start: 61.0, duration: 1.0 },
            ],
            metadata: Some(VideoMetadata {
                channel: Some("Canal".to_string()),
                duration: Some(62.0),
                ..Default::default()
            }),
            available_tracks: vec![AvailableTrack {
                language_code: "es".to_string(),
                is_auto_generated: false,
            }],
        }
    }

    fn dispatcher(output_directory: &Path, config_path: Option<PathBuf>) -> Dispatcher {
        let mut provider = MockTranscriptProvider::new();
        provider
            .expect_fetch()
            .withf(|_, plan| plan.preferred == vec!["es", "en"])
            .returning(|_, _| Ok(fetched()));
        provider.expect_name().return_const("mock");

        let extractor = TranscriptExtractor::new(vec![Strategy::new(
            SourceMethod::Primary,
            Arc::new(provider),
            Trigger::Always,
        )]);

        let mut config = Config::default();
        config.output_directory = output_directory.to_path_buf();
        config.default_languages = vec!["es".to_string(), "en".to_string()];

        Dispatcher::with_components(config, config_path, extractor, Box::new(MockPlaylistSource::new()))
    }

    #[test]
    fn test_configure_then_show_reflects_new_path() {
        let dir = tempfile::tempdir().unwrap();
        let config_path = dir.path().join("config.yaml");
        let target = dir.path().join("transcripts");
        let mut dispatcher = dispatcher(dir.path(), Some(config_path.clone()));

        let outcome = dispatcher
            .configure_output_directory(&ConfigureArgs {
                path: target.to_string_lossy().into_owned(),
            })
            .unwrap();

        let expected = fs_err::canonicalize(&target).unwrap();
        assert_eq!(outcome.output_directory, expected);
        assert!(outcome.persisted);
        assert!(!target.join(WRITE_PROBE).exists());

        let snapshot = dispatcher.show_current_config();
        assert_eq!(snapshot.config.output_directory, expected);
        assert!(snapshot.config_file_exists);
        assert_eq!(Config::load(&config_path).unwrap().output_directory, expected);
    }

    #[test]
    fn test_configure_rejects_nested_missing_path() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(dir.path(), None);
        let target = dir.path().join("a").join("b");

        let err = dispatcher
            .configure_output_directory(&ConfigureArgs {
                path: target.to_string_lossy().into_owned(),
            })
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::DirectoryNotWritable);
        assert!(!dir.path().join("a").exists());
        assert_eq!(dispatcher.config().output_directory, dir.path());
    }

    #[test]
    fn test_configure_without_config_file_is_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(dir.path(), None);
        let outcome = dispatcher
            .configure_output_directory(&ConfigureArgs {
                path: dir.path().to_string_lossy().into_owned(),
            })
            .unwrap();
        assert!(!outcome.persisted);
    }

    #[tokio::test]
    async fn test_extract_video_with_save() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(dir.path(), None);

        let extraction = dispatcher
            .extract_video(&ExtractVideoArgs {
                url: "https://youtu.be/dQw4w9WgXcQ".to_string(),
                language: "auto".to_string(),
                include_timestamps: false,
                format: ResponseFormat::Json,
                save_locally: true,
            })
            .await
            .unwrap();

        assert_eq!(extraction.text, "hola mundo");
        assert_eq!(extraction.transcript.source_method, SourceMethod::Primary);
        let saved = extraction.saved_to.unwrap();
        assert_eq!(saved, dir.path().join("dQw4w9WgXcQ_es_plain.txt"));
        assert_eq!(fs_err::read_to_string(saved).unwrap(), "hola mundo");
    }

    #[tokio::test]
    async fn test_failed_save_keeps_extracted_transcript() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("gone");
        let mut dispatcher = dispatcher(&missing, None);

        let args = ExtractVideoArgs {
            url: "dQw4w9WgXcQ".to_string(),
            language: "auto".to_string(),
            include_timestamps: true,
            format: ResponseFormat::Json,
            save_locally: true,
        };
        let extraction = dispatcher.extract_video(&args).await.unwrap();

        assert_eq!(extraction.saved_to, None);
        let error = extraction.save_error.as_ref().unwrap();
        assert_eq!(error.kind, ErrorKind::DirectoryNotWritable);
        assert_eq!(extraction.text, "[00:00] hola\n[01:01] mundo");
        assert_eq!(extraction.transcript.segments.len(), 2);
        assert!(!missing.exists());

        let response = dispatcher
            .call(ToolCall {
                tool: "youtube_extract_video".to_string(),
                arguments: json!({"url": "dQw4w9WgXcQ", "save_locally": true}),
            })
            .await;
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["status"], "success");
        assert_eq!(value["result"]["save_error"]["kind"], "directory_not_writable");
        assert_eq!(value["result"]["transcript"]["metadata"]["channel"], "Canal");
        assert_eq!(value["result"]["transcript"]["available_tracks"][0]["language_code"], "es");
    }

    #[test]
    fn test_call_routes_and_wraps_results() {
        let dir = tempfile::tempdir().unwrap();
        let mut dispatcher = dispatcher(dir.path(), None);

        let response = tokio_test::block_on(dispatcher.call(ToolCall {
            tool: "youtube_extract_video".to_string(),
            arguments: json!({"url": "https://www.youtube.com/watch?v=dQw4w9WgXcQ", "format": "text"}),
        }));
        match response {
            OperationResponse::Success { result } => {
                let text = result.as_str().unwrap();
                assert!(text.contains("Method: primary"));
                assert!(text.contains("[01:01] mundo"));
            }
            other => panic!("unexpected response: {:?}", other),
        }

        let response = tokio_test::block_on(dispatcher.call(ToolCall {
            tool: "youtube_extract_video".to_string(),
            arguments: json!({"url": "https://vimeo.com/1234"}),
        }));
        assert_eq!(
            serde_json::to_value(&response).unwrap()["error"]["kind"],
            "invalid_url_format"
        );

        let response = tokio_test::block_on(dispatcher.call(ToolCall {
            tool: "show_current_config".to_string(),
            arguments: Value::Null,
        }));
        assert!(response.is_success());

        let response = tokio_test::block_on(dispatcher.call(ToolCall {
            tool: "configure_output_directory".to_string(),
            arguments: json!({}),
        }));
        assert!(matches!(
            response,
            OperationResponse::Failure { error: ErrorReport { kind: ErrorKind::InvalidArguments, .. } }
        ));

        let response = tokio_test::block_on(dispatcher.call(ToolCall {
            tool: "list_tools".to_string(),
            arguments: Value::Null,
        }));
        match response {
            OperationResponse::Success { result } => assert_eq!(result.as_array().unwrap().len(), 4),
            other => panic!("unexpected response: {:?}", other),
        }

        let response = tokio_test::block_on(dispatcher.call(ToolCall {
            tool: "delete_everything".to_string(),
            arguments: Value::Null,
        }));
        assert!(matches!(
            response,
            OperationResponse::Failure { error: ErrorReport { kind: ErrorKind::UnknownOperation, .. } }
        ));
    }

    #[test]
    fn test_unencodable_result_is_internal() {
        let mut unencodable = std::collections::BTreeMap::new();
        unencodable.insert((1u8, 2u8), "tuple keys are not JSON object keys");

        let err = to_value(unencodable).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Internal);
        assert_eq!(
            serde_json::to_value(OperationResponse::failure(&err)).unwrap()["error"]["kind"],
            "internal"
        );
    }

    #[test]
    fn test_playlist_url_is_validated_before_listing() {
        let dir = tempfile::tempdir().unwrap();
        let dispatcher = dispatcher(dir.path(), None);

        let err = tokio_test::block_on(dispatcher.extract_playlist(&ExtractPlaylistArgs {
            playlist_url: "https://www.youtube.com/watch?v=dQw4w9WgXcQ".to_string(),
            language: "auto".to_string(),
            max_videos: None,
            save_locally: false,
        }))
        .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidUrlFormat);
    }
}
