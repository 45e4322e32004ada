//! Voice library for named reference samples.

use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::audio;

/// Errors that can occur while handling reference voices.
#[derive(Error, Debug)]
pub enum VoiceError {
    #[error("Voice not found: {0}")]
    NotFound(String),

    #[error("Invalid voice name: {0}")]
    InvalidName(String),

    #[error("No file given")]
    NoFile,

    #[error("Audio file not found: {0}")]
    AudioNotFound(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Metadata for a saved voice.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct VoiceMetadata {
    pub name: String,
    /// Sample file inside the voices directory.
    pub file_name: String,
    pub created_at: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_secs: Option<f32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sample_rate: Option<u32>,
}

/// Manages the on-disk voice library.
pub struct VoiceManager {
    voices_dir: PathBuf,
}

impl VoiceManager {
    /// Create a VoiceManager storing voices in `voices_dir`.
    pub fn with_dir(voices_dir: PathBuf) -> Self {
        Self { voices_dir }
    }

    /// Get the voices directory path.
    pub fn voices_dir(&self) -> &Path {
        &self.voices_dir
    }

    /// Validate a voice name.
    fn validate_name(name: &str) -> Result<(), VoiceError> {
        if name.trim().is_empty() {
            return Err(VoiceError::InvalidName("Name cannot be empty".to_string()));
        }

        // Prevent path traversal
        if name.contains('/') || name.contains('\\') || name.contains("..") {
            return Err(VoiceError::InvalidName(
                "Name cannot contain path separators".to_string(),
            ));
        }

        Ok(())
    }

    fn metadata_path(&self, name: &str) -> PathBuf {
        self.voices_dir.join(format!("{name}.json"))
    }

    /// Copy a reference sample into the library under `name`.
    ///
    /// An existing voice with the same name is replaced.
    pub fn save(&self, name: &str, source: &Path) -> Result<VoiceMetadata, VoiceError> {
        Self::validate_name(name)?;

        if !source.is_file() {
            return Err(VoiceError::AudioNotFound(source.display().to_string()));
        }

        std::fs::create_dir_all(&self.voices_dir)?;

        let extension = source
            .extension()
            .and_then(|e| e.to_str())
            .map(|e| e.to_ascii_lowercase())
            .unwrap_or_else(|| "wav".to_string());
        let file_name = format!("{name}.{extension}");
        let target = self.voices_dir.join(&file_name);

        // Copying a file onto itself truncates it
        if !same_file(source, &target) {
            std::fs::copy(source, &target)?;
        }

        if let Ok(previous) = self.load_metadata(name)
            && previous.file_name != file_name
        {
            let stale = self.voices_dir.join(&previous.file_name);
            if stale.is_file() && !same_file(&stale, source) {
                std::fs::remove_file(&stale)?;
                tracing::debug!(voice = name, file = %stale.display(), "removed replaced sample");
            }
        }

        let info = audio::read_info(&target).ok();
        let metadata = VoiceMetadata {
            name: name.to_string(),
            file_name,
            created_at: Utc::now().to_rfc3339(),
            duration_secs: info.map(|i| i.duration_secs),
            sample_rate: info.map(|i| i.sample_rate),
        };

        let json = serde_json::to_string_pretty(&metadata)?;
        std::fs::write(self.metadata_path(name), json)?;

        tracing::info!(voice = name, file = %target.display(), "voice saved");

        Ok(metadata)
    }

    /// Load voice metadata from the library.
    pub fn load_metadata(&self, name: &str) -> Result<VoiceMetadata, VoiceError> {
        Self::validate_name(name)?;

        let path = self.metadata_path(name);

        if !path.exists() {
            return Err(VoiceError::NotFound(name.to_string()));
        }

        let json = std::fs::read_to_string(path)?;
        let metadata = serde_json::from_str(&json)?;

        Ok(metadata)
    }

    /// Path of the stored sample for `name`.
    pub fn audio_path(&self, name: &str) -> Result<PathBuf, VoiceError> {
        let metadata = self.load_metadata(name)?;
        let path = self.voices_dir.join(&metadata.file_name);

        if !path.exists() {
            return Err(VoiceError::AudioNotFound(path.display().to_string()));
        }

        Ok(path)
    }

    /// Delete a voice and its sample from the library.
    pub fn delete_local(&self, name: &str) -> Result<(), VoiceError> {
        let metadata = self.load_metadata(name)?;

        let audio = self.voices_dir.join(&metadata.file_name);
        if audio.exists() {
            std::fs::remove_file(audio)?;
        }
        std::fs::remove_file(self.metadata_path(name))?;

        Ok(())
    }

    /// List all voices, sorted by name.
    pub fn list_local(&self) -> Result<Vec<VoiceMetadata>, VoiceError> {
        if !self.voices_dir.exists() {
            return Ok(Vec::new());
        }

        let mut voices = Vec::new();

        for entry in std::fs::read_dir(&self.voices_dir)? {
            let path = entry?.path();

            if path.extension().is_some_and(|ext| ext == "json") {
                let json = std::fs::read_to_string(&path)?;
                match serde_json::from_str::<VoiceMetadata>(&json) {
                    Ok(metadata) => voices.push(metadata),
                    Err(e) => {
                        tracing::warn!(file = %path.display(), error = %e, "skipping unreadable voice")
                    }
                }
            }
        }

        voices.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(voices)
    }
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}
