use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Seeds the output directory when the config file does not set one
pub const OUTPUT_DIR_ENV: &str = "YOUTUBE_EXTRACT_OUTPUT_DIR";

/// Overrides the config file location
pub const CONFIG_PATH_ENV: &str = "YOUTUBE_EXTRACT_CONFIG_PATH";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory transcripts are written to when saving is requested
    pub output_directory: PathBuf,

    /// Languages tried, in order, when a request asks for `auto`
    pub default_languages: Vec<String>,

    /// Playlist walk settings
    pub playlist: PlaylistSettings,

    /// External provider settings
    pub providers: ProviderSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlaylistSettings {
    /// Upper bound on members processed per playlist
    pub max_videos: usize,

    /// Pause between per-video extractions, in milliseconds
    pub delay_ms: u64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProviderSettings {
    /// yt-dlp executable
    pub yt_dlp_path: String,

    /// Player clients for the primary strategy
    pub primary_clients: Vec<String>,

    /// Player clients for the alternate strategy
    pub alternate_clients: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_directory: dirs::home_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("YouTube-Transcripts"),
            default_languages: vec!["es".to_string(), "en".to_string()],
            playlist: PlaylistSettings::default(),
            providers: ProviderSettings::default(),
        }
    }
}

impl Default for PlaylistSettings {
    fn default() -> Self {
        Self {
            max_videos: 50,
            delay_ms: 0,
        }
    }
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            yt_dlp_path: "yt-dlp".to_string(),
            primary_clients: vec!["web".to_string(), "web_safari".to_string()],
            alternate_clients: vec!["android".to_string(), "web_embedded".to_string()],
        }
    }
}

/// Partial view of the file, used to tell "unset" from "set to the default"
#[derive(Debug, Deserialize)]
struct FileOverrides {
    output_directory: Option<PathBuf>,
}

impl Config {
    /// Load configuration from `path` (or the default location).
    ///
    /// A missing file yields defaults. `YOUTUBE_EXTRACT_OUTPUT_DIR` seeds the output
    /// directory, but a directory stored in the file wins.
    pub fn load(path: &Path) -> Result<Self> {
        let env_output_dir = std::env::var_os(OUTPUT_DIR_ENV).map(PathBuf::from);

        if !path.exists() {
            let mut config = Self::default();
            if let Some(dir) = env_output_dir {
                config.output_directory = expand_home(&dir);
            }
            return Ok(config);
        }

        let content = fs_err::read_to_string(path).context("Failed to read config file")?;
        let mut config: Config =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;
        let overrides: FileOverrides =
            serde_yaml::from_str(&content).context("Failed to parse config file")?;

        match (overrides.output_directory, env_output_dir) {
            (Some(dir), _) => config.output_directory = expand_home(&dir),
            (None, Some(dir)) => config.output_directory = expand_home(&dir),
            (None, None) => {}
        }

        config.validate()?;
        tracing::info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs_err::create_dir_all(parent)?;
        }

        let content = serde_yaml::to_string(self).context("Failed to serialize config")?;

        fs_err::write(path, content).context("Failed to write config file")?;

        tracing::info!("Configuration saved to {}", path.display());
        Ok(())
    }

    /// Get the default configuration file path
    pub fn default_path() -> Result<PathBuf> {
        let config_dir = dirs::config_dir().context("Could not determine config directory")?;

        Ok(config_dir.join("youtube-extract").join("config.yaml"))
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.playlist.max_videos == 0 {
            anyhow::bail!("playlist.max_videos must be at least 1");
        }

        if self.providers.primary_clients.is_empty() || self.providers.alternate_clients.is_empty() {
            anyhow::bail!("providers.primary_clients and providers.alternate_clients must not be empty");
        }

        if let Some(code) = self
            .default_languages
            .iter()
            .find(|code| !crate::utils::is_valid_language_code(code))
        {
            anyhow::bail!("Invalid language code in default_languages: {}", code);
        }

        Ok(())
    }
}

/// Expand a leading `~` to the home directory
pub fn expand_home(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => dirs::home_dir()
            .map(|home| home.join(rest))
            .unwrap_or_else(|| path.to_path_buf()),
        Err(_) => path.to_path_buf(),
    }
}
