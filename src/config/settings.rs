//! Settings file format and loading.

use std::path::{Path, PathBuf};

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio;
use crate::language::Language;

/// XTTS v2, the multilingual zero-shot cloning model.
pub const DEFAULT_MODEL_NAME: &str = "tts_models/multilingual/multi-dataset/xtts_v2";

/// Environment variable naming an explicit settings file.
pub const ENV_CONFIG_PATH: &str = "VOICE_CLONER_CONFIG";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Could not serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("Invalid setting {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Which front-end to start.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UiMode {
    /// Interactive console
    #[default]
    Desktop,
    /// Browser UI served locally
    Web,
}

/// How the synthesis engine is reached.
#[derive(ValueEnum, Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Coqui `tts` executable
    #[default]
    Command,
    /// REST engine server
    Http,
    /// Gradio app with a `tts` endpoint
    Gradio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BackendSettings {
    pub kind: BackendKind,
    pub url: String,
    pub executable: PathBuf,
    pub use_cuda: bool,
    /// Forwarded to the engine as `TTS_HOME`.
    pub model_cache: Option<PathBuf>,
    pub poll_timeout_secs: u64,
}

impl Default for BackendSettings {
    fn default() -> Self {
        Self {
            kind: BackendKind::default(),
            url: "http://localhost:8020".to_string(),
            executable: PathBuf::from("tts"),
            use_cuda: false,
            model_cache: None,
            poll_timeout_secs: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WebSettings {
    pub bind: String,
}

impl Default for WebSettings {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:7860".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingSettings {
    pub seconds: f32,
}

impl Default for RecordingSettings {
    fn default() -> Self {
        Self { seconds: 5.0 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub ui_mode: UiMode,
    pub language_default: Language,
    pub model_name: String,
    /// Emit a short silent clip when synthesis fails.
    pub fallback_silence: bool,
    pub output_dir: Option<PathBuf>,
    pub data_dir: Option<PathBuf>,
    pub backend: BackendSettings,
    pub web: WebSettings,
    pub recording: RecordingSettings,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ui_mode: UiMode::default(),
            language_default: Language::default(),
            model_name: DEFAULT_MODEL_NAME.to_string(),
            fallback_silence: true,
            output_dir: None,
            data_dir: None,
            backend: BackendSettings::default(),
            web: WebSettings::default(),
            recording: RecordingSettings::default(),
        }
    }
}

impl Settings {
    /// Load settings from `path`, or from the default location when it exists.
    ///
    /// An explicit path that does not exist is an error; a missing default
    /// file just means built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            return Self::from_file(path);
        }

        match Self::default_path() {
            Some(default) if default.exists() => Self::from_file(&default),
            _ => Ok(Self::default()),
        }
    }

    /// `~/.voice-cloner/config.toml`
    pub fn default_path() -> Option<PathBuf> {
        dirs::home_dir().map(|home| home.join(".voice-cloner").join("config.toml"))
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let settings = Self::from_toml_str(&contents)?;
        tracing::debug!(path = %path.display(), "loaded settings");
        Ok(settings)
    }

    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        let settings: Self = toml::from_str(contents)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Reject values the parser accepts but the program cannot use.
    pub fn validate(&self) -> Result<(), ConfigError> {
        audio::recording_duration(self.recording.seconds).map_err(|e| ConfigError::Invalid {
            key: "recording.seconds",
            reason: e.to_string(),
        })?;
        Ok(())
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Where generated clips go. Defaults to a directory under the OS temp dir.
    pub fn output_dir(&self) -> PathBuf {
        self.output_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join("voice_cloner"))
    }

    /// Where uploaded reference samples are stored in web mode.
    pub fn uploads_dir(&self) -> PathBuf {
        self.output_dir().join("uploads")
    }

    /// Persistent data directory, `~/.voice-cloner` unless configured.
    pub fn data_dir(&self) -> PathBuf {
        if let Some(dir) = &self.data_dir {
            return dir.clone();
        }
        dirs::home_dir()
            .map(|home| home.join(".voice-cloner"))
            .unwrap_or_else(|| PathBuf::from(".voice-cloner"))
    }

    /// Voice library directory.
    pub fn voices_dir(&self) -> PathBuf {
        self.data_dir().join("voices")
    }
}
