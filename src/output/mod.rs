use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::transcript::TranscriptResult;
use crate::utils::sanitize_filename;
use crate::ExtractError;

pub mod formatters;

pub use formatters::*;

/// On-disk transcript format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TranscriptFormat {
    Plain,
    Timestamped,
}

impl TranscriptFormat {
    pub fn from_timestamps(include_timestamps: bool) -> Self {
        if include_timestamps {
            TranscriptFormat::Timestamped
        } else {
            TranscriptFormat::Plain
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TranscriptFormat::Plain => "plain",
            TranscriptFormat::Timestamped => "timestamped",
        }
    }

    pub fn render(&self, result: &TranscriptResult) -> String {
        match self {
            TranscriptFormat::Plain => format_as_plain(result),
            TranscriptFormat::Timestamped => format_as_timestamped(result),
        }
    }
}

/// `{video_id}_{language}_{format}.txt`
pub fn file_name(result: &TranscriptResult, format: TranscriptFormat) -> String {
    format!(
        "{}_{}_{}.txt",
        sanitize_filename(&result.video_id),
        sanitize_filename(&result.language_code),
        format.as_str()
    )
}

/// Write a transcript into `directory`, replacing any previous file of the same name.
///
/// The directory must already exist; nothing below it is created.
pub fn save_to_directory(
    result: &TranscriptResult,
    format: TranscriptFormat,
    directory: &Path,
) -> Result<PathBuf, ExtractError> {
    if !directory.is_dir() {
        return Err(ExtractError::not_writable(directory, "directory does not exist"));
    }

    let path = directory.join(file_name(result, format));
    fs_err::write(&path, format.render(result))
        .map_err(|e| ExtractError::not_writable(directory, e.to_string()))?;

    tracing::info!("Transcript saved to {}", path.display());
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transcript::{SourceMethod, TranscriptSegment};

    fn sample() -> TranscriptResult {
        TranscriptResult {
            video_id: "dQw4w9WgXcQ".to_string(),
            title: None,
            language_code: "en-US".to_string(),
            is_auto_generated: false,
            segments: vec![
                TranscriptSegment { text: "first".to_string(), start: 1.0, duration: 1.0 },
                TranscriptSegment { text: "second".to_string(), start: 2.0, duration: 1.0 },
            ],
            source_method: SourceMethod::Primary,
            metadata: None,
            available_tracks: Vec::new(),
        }
    }

    #[test]
    fn test_file_name_is_deterministic() {
        assert_eq!(file_name(&sample(), TranscriptFormat::Plain), "dQw4w9WgXcQ_en-US_plain.txt");
        assert_eq!(
            file_name(&sample(), TranscriptFormat::Timestamped),
            "dQw4w9WgXcQ_en-US_timestamped.txt"
        );
    }

    #[test]
    fn test_writing_twice_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let result = sample();

        let first = save_to_directory(&result, TranscriptFormat::Timestamped, dir.path()).unwrap();
        let first_bytes = fs_err::read(&first).unwrap();
        let second = save_to_directory(&result, TranscriptFormat::Timestamped, dir.path()).unwrap();
        let second_bytes = fs_err::read(&second).unwrap();

        assert_eq!(first, second);
        assert_eq!(first_bytes, second_bytes);
        assert_eq!(String::from_utf8(first_bytes).unwrap(), "[00:01] first\n[00:02] second");
        assert_eq!(fs_err::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_plain_file_contents() {
        let dir = tempfile::tempdir().unwrap();
        let path = save_to_directory(&sample(), TranscriptFormat::Plain, dir.path()).unwrap();
        assert_eq!(fs_err::read_to_string(path).unwrap(), "first second");
    }

    #[test]
    fn test_missing_directory_is_not_writable() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing").join("deeper");

        let err = save_to_directory(&sample(), TranscriptFormat::Plain, &missing).unwrap_err();
        assert!(matches!(err, ExtractError::DirectoryNotWritable { .. }));
        assert!(!missing.exists());
    }
}
