//! Backend request/response types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::language::Language;

/// Errors that can occur when talking to the synthesis engine.
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("TTS executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("TTS command failed: {0}")]
    CommandFailed(String),

    #[error("Timed out after {0}s")]
    Timeout(u64),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Health check response from the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthResponse {
    pub status: String,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub cuda_available: bool,
    #[serde(default)]
    pub device: Option<String>,
}

/// Description of a loaded model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ModelInfo {
    pub model_name: String,
    #[serde(default)]
    pub languages: Vec<String>,
}

impl ModelInfo {
    pub fn new(model_name: impl Into<String>) -> Self {
        Self {
            model_name: model_name.into(),
            languages: Vec::new(),
        }
    }
}

/// Request for speech synthesis.
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesizeRequest {
    pub text: String,
    pub language: Language,
    pub model_name: String,
    /// Reference sample for zero-shot voice cloning.
    pub speaker_wav: Option<PathBuf>,
}

impl SynthesizeRequest {
    /// Create a new synthesis request without a reference voice.
    pub fn new(text: impl Into<String>, language: Language, model_name: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            language,
            model_name: model_name.into(),
            speaker_wav: None,
        }
    }

    /// Condition the synthesis on a reference sample.
    pub fn with_speaker_wav(mut self, path: PathBuf) -> Self {
        self.speaker_wav = Some(path);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_synthesize_request_builder() {
        let request = SynthesizeRequest::new("Hallo Welt", Language::default(), "xtts")
            .with_speaker_wav(PathBuf::from("/tmp/ref.wav"));

        assert_eq!(request.text, "Hallo Welt");
        assert_eq!(request.language.as_str(), "de");
        assert_eq!(request.speaker_wav, Some(PathBuf::from("/tmp/ref.wav")));
    }

    #[test]
    fn test_synthesize_request_defaults() {
        let request = SynthesizeRequest::new("Hello", Language::parse("en").unwrap(), "xtts");

        assert_eq!(request.model_name, "xtts");
        assert_eq!(request.speaker_wav, None);
    }

    #[test]
    fn test_health_response_deserialize() {
        let json = r#"{
            "status": "healthy",
            "model": "tts_models/multilingual/multi-dataset/xtts_v2",
            "cuda_available": true,
            "device": "cuda:0"
        }"#;

        let response: HealthResponse = serde_json::from_str(json).unwrap();
        assert_eq!(response.status, "healthy");
        assert!(response.cuda_available);
        assert_eq!(response.device.as_deref(), Some("cuda:0"));
    }

    #[test]
    fn test_health_response_minimal() {
        let response: HealthResponse = serde_json::from_str(r#"{"status": "ok"}"#).unwrap();
        assert!(!response.cuda_available);
        assert_eq!(response.model, None);
    }

    #[test]
    fn test_model_info_deserialize_without_languages() {
        let info: ModelInfo = serde_json::from_str(r#"{"model_name": "xtts_v2"}"#).unwrap();
        assert_eq!(info, ModelInfo::new("xtts_v2"));
    }
}
