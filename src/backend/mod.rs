//! Adapters for the external voice cloning engine.
//!
//! The engine itself (XTTS) is never reimplemented here. A backend only
//! forwards text, language and an optional reference sample and leaves an
//! audio file behind.

mod client;
mod command;
mod types;

use std::path::Path;
use std::time::Duration;

pub use client::{HttpBackend, HttpProtocol};
pub use command::CommandBackend;
pub use types::{BackendError, HealthResponse, ModelInfo, SynthesizeRequest};

use crate::config::{BackendKind, BackendSettings};

/// Trait for talking to the synthesis engine.
///
/// Abstracts the process or HTTP plumbing so sessions can be tested with mocks.
#[cfg_attr(test, mockall::automock)]
pub trait Backend: Send + Sync {
    /// Check that the engine can be reached.
    fn health(&self) -> Result<HealthResponse, BackendError>;

    /// Make sure `model_name` is available, downloading it if the engine does that.
    fn load_model(&self, model_name: &str) -> Result<ModelInfo, BackendError>;

    /// Synthesize speech and write the audio file to `output`.
    fn synthesize(&self, request: &SynthesizeRequest, output: &Path) -> Result<(), BackendError>;
}

impl<T: Backend + ?Sized> Backend for Box<T> {
    fn health(&self) -> Result<HealthResponse, BackendError> {
        (**self).health()
    }

    fn load_model(&self, model_name: &str) -> Result<ModelInfo, BackendError> {
        (**self).load_model(model_name)
    }

    fn synthesize(&self, request: &SynthesizeRequest, output: &Path) -> Result<(), BackendError> {
        (**self).synthesize(request, output)
    }
}

/// Create the backend described by the settings.
pub fn create_backend(settings: &BackendSettings) -> Box<dyn Backend> {
    let timeout = Duration::from_secs(settings.poll_timeout_secs);

    match settings.kind {
        BackendKind::Command => Box::new(
            CommandBackend::new(&settings.executable)
                .with_cuda(settings.use_cuda)
                .with_model_cache(settings.model_cache.clone()),
        ),
        BackendKind::Http => Box::new(HttpBackend::new(HttpProtocol::Rest, &settings.url, timeout)),
        BackendKind::Gradio => Box::new(HttpBackend::new(
            HttpProtocol::Gradio,
            &settings.url,
            timeout,
        )),
    }
}
