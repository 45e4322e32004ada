//! Session state shared by every front-end.

use std::fmt;
use std::path::{Path, PathBuf};

use chrono::Utc;
use serde::Serialize;
use thiserror::Error;

use crate::audio::{self, AudioError, SILENCE_SAMPLE_RATE};
use crate::backend::{Backend, BackendError, HealthResponse, ModelInfo, SynthesizeRequest};
use crate::config::Settings;
use crate::language::Language;
use crate::voice::{ReferenceVoice, VoiceError, VoiceManager, VoiceMetadata};

/// Length of the placeholder clip written when synthesis fails.
const FALLBACK_SECONDS: f32 = 0.5;

/// Errors that can occur during session operations.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Please enter text")]
    EmptyText,

    #[error("No file given")]
    NoFile,

    #[error("Reference file not found: {0}")]
    ReferenceNotFound(String),

    #[error("No reference voice set")]
    NoReference,

    #[error("No generated audio yet")]
    NoOutput,

    #[error("Model could not be loaded: {0}")]
    ModelLoad(#[source] BackendError),

    #[error("Error during audio generation: {0}")]
    Synthesis(#[source] BackendError),

    #[error("Engine error: {0}")]
    Engine(#[from] BackendError),

    #[error("Voice library error: {0}")]
    Voice(#[from] VoiceError),

    #[error("Audio error: {0}")]
    Audio(#[from] AudioError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Session parameters resolved from the settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub model_name: String,
    pub default_language: Language,
    pub output_dir: PathBuf,
    pub voices_dir: PathBuf,
    pub fallback_silence: bool,
}

impl From<&Settings> for SessionConfig {
    fn from(settings: &Settings) -> Self {
        Self {
            model_name: settings.model_name.clone(),
            default_language: settings.language_default.clone(),
            output_dir: settings.output_dir(),
            voices_dir: settings.voices_dir(),
            fallback_silence: settings.fallback_silence,
        }
    }
}

/// Outcome of a model load request.
#[derive(Debug, Clone, PartialEq)]
pub enum ModelStatus {
    Loaded(ModelInfo),
    AlreadyLoaded(ModelInfo),
}

impl fmt::Display for ModelStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModelStatus::Loaded(info) => write!(f, "Model {} loaded.", info.model_name),
            ModelStatus::AlreadyLoaded(_) => f.write_str("Model already loaded."),
        }
    }
}

/// A finished synthesis call.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Synthesis {
    pub path: PathBuf,
    pub language: Language,
    /// Reference sample the engine was conditioned on.
    pub reference: Option<PathBuf>,
    /// Set when `path` is a silent placeholder; holds the engine failure.
    pub fallback: Option<String>,
}

impl Synthesis {
    pub fn is_fallback(&self) -> bool {
        self.fallback.is_some()
    }

    pub fn file_name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }
}

impl fmt::Display for Synthesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.fallback {
            Some(reason) => write!(f, "Error during audio generation: {reason}"),
            None => write!(f, "Audio generated: {}", self.file_name()),
        }
    }
}

/// Read-only view of the session for status displays.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SessionSnapshot {
    pub model_name: String,
    pub model_loaded: bool,
    pub default_language: Language,
    pub reference: Option<ReferenceVoice>,
    pub last_output: Option<PathBuf>,
}

/// Owns the engine handle and everything a user has selected so far.
///
/// One session lives for the whole process. Front-ends never touch it
/// directly but go through [`crate::engine::EngineHandle`].
pub struct Session<B: Backend> {
    backend: B,
    config: SessionConfig,
    voices: VoiceManager,
    model: Option<ModelInfo>,
    reference: Option<ReferenceVoice>,
    last_output: Option<PathBuf>,
}

impl<B: Backend> Session<B> {
    /// Create a session, making sure the output directory exists.
    pub fn new(backend: B, config: SessionConfig) -> Result<Self, SessionError> {
        std::fs::create_dir_all(&config.output_dir)?;

        Ok(Self {
            voices: VoiceManager::with_dir(config.voices_dir.clone()),
            backend,
            config,
            model: None,
            reference: None,
            last_output: None,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn set_default_language(&mut self, language: Language) {
        self.config.default_language = language;
    }

    /// Check engine reachability.
    pub fn health(&self) -> Result<HealthResponse, SessionError> {
        Ok(self.backend.health()?)
    }

    pub fn is_model_loaded(&self) -> bool {
        self.model.is_some()
    }

    /// Load the configured model once; later calls are no-ops.
    pub fn load_model(&mut self) -> Result<ModelStatus, SessionError> {
        if let Some(info) = &self.model {
            return Ok(ModelStatus::AlreadyLoaded(info.clone()));
        }

        tracing::info!(model = %self.config.model_name, "loading model");
        let info = self
            .backend
            .load_model(&self.config.model_name)
            .map_err(SessionError::ModelLoad)?;

        self.model = Some(info.clone());
        Ok(ModelStatus::Loaded(info))
    }

    pub fn reference(&self) -> Option<&ReferenceVoice> {
        self.reference.as_ref()
    }

    /// Remember `path` as the reference voice.
    ///
    /// On failure the previous reference stays in place.
    pub fn set_reference(&mut self, path: &Path) -> Result<ReferenceVoice, SessionError> {
        let reference = ReferenceVoice::open(path).map_err(|e| match e {
            VoiceError::NoFile => SessionError::NoFile,
            VoiceError::AudioNotFound(p) => SessionError::ReferenceNotFound(p),
            other => SessionError::Voice(other),
        })?;

        tracing::info!(reference = %reference, "reference voice set");
        self.reference = Some(reference.clone());
        Ok(reference)
    }

    /// Forget the reference voice, returning the one that was set.
    pub fn clear_reference(&mut self) -> Option<ReferenceVoice> {
        let previous = self.reference.take();
        if previous.is_some() {
            tracing::info!("reference voice cleared");
        }
        previous
    }

    /// Synthesize `text`, cloning the reference voice when one is set.
    pub fn synthesize(
        &mut self,
        text: &str,
        language: Option<Language>,
    ) -> Result<Synthesis, SessionError> {
        // Reject empty input before touching the engine
        let text = text.trim();
        if text.is_empty() {
            return Err(SessionError::EmptyText);
        }

        // Load the model lazily on first use
        self.load_model()?;

        let language = language.unwrap_or_else(|| self.config.default_language.clone());
        let output = self.next_output_path("tts");

        // Condition on the reference only if its file is still there
        let reference = match &self.reference {
            Some(reference) if reference.exists() => Some(reference.path.clone()),
            Some(reference) => {
                tracing::warn!(path = %reference.path.display(), "reference voice vanished, synthesizing without it");
                None
            }
            None => None,
        };

        let mut request = SynthesizeRequest::new(text, language.clone(), &self.config.model_name);
        if let Some(path) = &reference {
            request = request.with_speaker_wav(path.clone());
        }

        tracing::info!(
            language = %language,
            chars = text.chars().count(),
            cloned = reference.is_some(),
            "synthesizing"
        );

        // Run the engine; on failure fall back to silence when configured
        match self.backend.synthesize(&request, &output) {
            Ok(()) => {
                tracing::info!(output = %output.display(), "synthesis finished");
                self.last_output = Some(output.clone());
                Ok(Synthesis {
                    path: output,
                    language,
                    reference,
                    fallback: None,
                })
            }
            Err(e) if self.config.fallback_silence => {
                // Not recorded as last output, so it can never be exported
                tracing::error!(error = %e, "synthesis failed, emitting silent placeholder");
                let placeholder = self.next_output_path("silence");
                audio::write_silence(&placeholder, FALLBACK_SECONDS, SILENCE_SAMPLE_RATE)?;
                Ok(Synthesis {
                    path: placeholder,
                    language,
                    reference,
                    fallback: Some(e.to_string()),
                })
            }
            Err(e) => {
                tracing::error!(error = %e, "synthesis failed");
                Err(SessionError::Synthesis(e))
            }
        }
    }

    /// The last generated file, if it still exists.
    pub fn last_output(&self) -> Option<&Path> {
        self.last_output.as_deref().filter(|p| p.is_file())
    }

    /// Copy the last generated file to `dest` (a file or a directory).
    pub fn export_output(&self, dest: &Path) -> Result<PathBuf, SessionError> {
        let source = self.last_output().ok_or(SessionError::NoOutput)?;

        let target = if dest.is_dir() {
            match source.file_name() {
                Some(name) => dest.join(name),
                None => return Err(SessionError::NoOutput),
            }
        } else {
            dest.to_path_buf()
        };

        if let Some(parent) = target.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(source, &target)?;

        tracing::info!(target = %target.display(), "output exported");
        Ok(target)
    }

    /// Store the current reference in the voice library.
    pub fn save_reference_as(&self, name: &str) -> Result<VoiceMetadata, SessionError> {
        let reference = self.reference.as_ref().ok_or(SessionError::NoReference)?;
        if !reference.exists() {
            return Err(SessionError::ReferenceNotFound(
                reference.path.display().to_string(),
            ));
        }
        Ok(self.voices.save(name, &reference.path)?)
    }

    /// Use a library voice as the reference.
    pub fn use_voice(&mut self, name: &str) -> Result<ReferenceVoice, SessionError> {
        let path = self.voices.audio_path(name)?;
        self.set_reference(&path)
    }

    pub fn list_voices(&self) -> Result<Vec<VoiceMetadata>, SessionError> {
        Ok(self.voices.list_local()?)
    }

    /// Delete a library voice. A reference pointing at it is not cleared,
    /// synthesis skips it once the file is gone.
    pub fn delete_voice(&self, name: &str) -> Result<(), SessionError> {
        Ok(self.voices.delete_local(name)?)
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            model_name: self.config.model_name.clone(),
            model_loaded: self.model.is_some(),
            default_language: self.config.default_language.clone(),
            reference: self.reference.clone(),
            last_output: self.last_output().map(Path::to_path_buf),
        }
    }

    /// A fresh `<prefix>_<millis>.wav` path that does not exist yet.
    fn next_output_path(&self, prefix: &str) -> PathBuf {
        let stamp = Utc::now().timestamp_millis();
        let mut path = self.config.output_dir.join(format!("{prefix}_{stamp}.wav"));
        let mut counter = 1;
        while path.exists() {
            path = self
                .config
                .output_dir
                .join(format!("{prefix}_{stamp}_{counter}.wav"));
            counter += 1;
        }
        path
    }
}
