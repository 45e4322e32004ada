//! The reference sample a synthesis is conditioned on.

use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use super::VoiceError;
use crate::audio::{self, AudioInfo};

/// A reference voice sample on disk.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReferenceVoice {
    pub path: PathBuf,
    /// Header info, absent for formats without a readable header (e.g. MP3).
    pub info: Option<AudioInfo>,
}

impl ReferenceVoice {
    /// Check that `path` points at an existing file and read its header.
    pub fn open(path: &Path) -> Result<Self, VoiceError> {
        if path.as_os_str().is_empty() {
            return Err(VoiceError::NoFile);
        }
        if !path.is_file() {
            return Err(VoiceError::AudioNotFound(path.display().to_string()));
        }

        let info = match audio::read_info(path) {
            Ok(info) => Some(info),
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "could not read reference header");
                None
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            info,
        })
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| self.path.display().to_string())
    }

    /// The sample may be removed behind our back.
    pub fn exists(&self) -> bool {
        self.path.is_file()
    }
}

impl fmt::Display for ReferenceVoice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.info {
            Some(info) => write!(f, "{} ({info})", self.file_name()),
            None => f.write_str(&self.file_name()),
        }
    }
}
