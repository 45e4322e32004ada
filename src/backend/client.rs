//! HTTP client for engine servers.

use std::path::Path;
use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::Backend;
use super::types::{BackendError, HealthResponse, ModelInfo, SynthesizeRequest};

const POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Wire protocol spoken by the engine server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HttpProtocol {
    /// Plain REST endpoints: `/health`, `/load`, `/synthesize`.
    Rest,
    /// A Gradio app exposing a `tts` endpoint taking `[text, speaker_wav, language]`.
    Gradio,
}

/// HTTP-based backend client.
pub struct HttpBackend {
    base_url: String,
    client: reqwest::blocking::Client,
    protocol: HttpProtocol,
    poll_timeout: Duration,
}

#[derive(Serialize)]
struct LoadRequest<'a> {
    model_name: &'a str,
}

impl HttpBackend {
    /// Create a new HTTP backend client.
    ///
    /// Must not be called from inside an async runtime, the blocking client
    /// spins up its own.
    pub fn new(protocol: HttpProtocol, base_url: &str, poll_timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client: reqwest::blocking::Client::new(),
            protocol,
            poll_timeout,
        }
    }

    /// Get the base URL for this backend.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn protocol(&self) -> HttpProtocol {
        self.protocol
    }

    /// Upload a file to the Gradio app, returns the server side path.
    fn gradio_upload(&self, audio_path: &Path) -> Result<String, BackendError> {
        let url = format!("{}/gradio_api/upload", self.base_url);

        let form = reqwest::blocking::multipart::Form::new()
            .part("files", audio_part(audio_path)?);

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::RequestFailed(format!(
                "Upload failed: {}",
                response.status()
            )));
        }

        let paths: Vec<String> = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        paths
            .into_iter()
            .next()
            .ok_or_else(|| BackendError::InvalidResponse("No path returned".to_string()))
    }

    /// Call the Gradio `tts` endpoint and wait for the generated file.
    fn gradio_generate(
        &self,
        request: &SynthesizeRequest,
        speaker_path: Option<&str>,
    ) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/gradio_api/call/tts", self.base_url);

        let speaker_value = match speaker_path {
            Some(path) => serde_json::json!({
                "path": path,
                "meta": {"_type": "gradio.FileData"}
            }),
            None => serde_json::Value::Null,
        };

        let body = serde_json::json!({
            "data": [request.text, speaker_value, request.language.as_str()]
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::RequestFailed(format!(
                "Generate call failed: {}",
                response.status()
            )));
        }

        #[derive(Deserialize)]
        struct EventResponse {
            event_id: String,
        }

        let event: EventResponse = response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

        let poll_url = format!("{}/gradio_api/call/tts/{}", self.base_url, event.event_id);
        let max_attempts = (self.poll_timeout.as_secs() / POLL_INTERVAL.as_secs()).max(1);
        let mut attempts = 0;

        loop {
            thread::sleep(POLL_INTERVAL);
            attempts += 1;

            let text = self
                .client
                .get(&poll_url)
                .send()
                .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?
                .text()
                .map_err(|e| BackendError::InvalidResponse(e.to_string()))?;

            if let Some(result) = parse_gradio_event(&text) {
                let file_url = self.resolve_url(&result?);
                tracing::debug!(url = %file_url, "downloading generated audio");
                return self.download_audio(&file_url);
            }

            if attempts >= max_attempts {
                return Err(BackendError::Timeout(self.poll_timeout.as_secs()));
            }
        }
    }

    fn resolve_url(&self, url: &str) -> String {
        if url.starts_with("http://") || url.starts_with("https://") {
            url.to_string()
        } else {
            format!("{}/{}", self.base_url, url.trim_start_matches('/'))
        }
    }

    /// Download audio from URL.
    fn download_audio(&self, url: &str) -> Result<Vec<u8>, BackendError> {
        let response = self
            .client
            .get(url)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::RequestFailed(format!(
                "Download failed: {}",
                response.status()
            )));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn rest_synthesize(&self, request: &SynthesizeRequest) -> Result<Vec<u8>, BackendError> {
        let url = format!("{}/synthesize", self.base_url);

        let mut form = reqwest::blocking::multipart::Form::new()
            .text("text", request.text.clone())
            .text("language", request.language.to_string())
            .text("model_name", request.model_name.clone());

        if let Some(path) = &request.speaker_wav {
            form = form.part("speaker_wav", audio_part(path)?);
        }

        let response = self
            .client
            .post(&url)
            .multipart(form)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::RequestFailed(format!(
                "Status: {}",
                response.status()
            )));
        }

        response
            .bytes()
            .map(|b| b.to_vec())
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }
}

impl Backend for HttpBackend {
    fn health(&self) -> Result<HealthResponse, BackendError> {
        let url = match self.protocol {
            HttpProtocol::Rest => format!("{}/health", self.base_url),
            HttpProtocol::Gradio => format!("{}/config", self.base_url),
        };

        let response = self
            .client
            .get(&url)
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::RequestFailed(format!(
                "Status: {}",
                response.status()
            )));
        }

        match self.protocol {
            HttpProtocol::Rest => response
                .json()
                .map_err(|e| BackendError::InvalidResponse(e.to_string())),
            HttpProtocol::Gradio => Ok(HealthResponse {
                status: "healthy".to_string(),
                model: None,
                cuda_available: false,
                device: None,
            }),
        }
    }

    fn load_model(&self, model_name: &str) -> Result<ModelInfo, BackendError> {
        if self.protocol == HttpProtocol::Gradio {
            // The Gradio app owns its model, reachability is all we can check
            self.health()?;
            return Ok(ModelInfo::new(model_name));
        }

        let url = format!("{}/load", self.base_url);

        let response = self
            .client
            .post(&url)
            .json(&LoadRequest { model_name })
            .send()
            .map_err(|e| BackendError::ConnectionFailed(e.to_string()))?;

        if !response.status().is_success() {
            return Err(BackendError::RequestFailed(format!(
                "Status: {}",
                response.status()
            )));
        }

        response
            .json()
            .map_err(|e| BackendError::InvalidResponse(e.to_string()))
    }

    fn synthesize(&self, request: &SynthesizeRequest, output: &Path) -> Result<(), BackendError> {
        let audio = match self.protocol {
            HttpProtocol::Rest => self.rest_synthesize(request)?,
            HttpProtocol::Gradio => {
                let server_path = match &request.speaker_wav {
                    Some(path) => Some(self.gradio_upload(path)?),
                    None => None,
                };
                self.gradio_generate(request, server_path.as_deref())?
            }
        };

        if audio.is_empty() {
            return Err(BackendError::InvalidResponse("Empty audio".to_string()));
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(output, audio)?;

        Ok(())
    }
}

/// Build a multipart part from an audio file on disk.
fn audio_part(audio_path: &Path) -> Result<reqwest::blocking::multipart::Part, BackendError> {
    let audio_data = std::fs::read(audio_path)
        .map_err(|_| BackendError::FileNotFound(audio_path.display().to_string()))?;

    let file_name = audio_path
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("reference.wav");

    reqwest::blocking::multipart::Part::bytes(audio_data)
        .file_name(file_name.to_string())
        .mime_str(mime_for(audio_path))
        .map_err(|e| BackendError::RequestFailed(e.to_string()))
}

pub(crate) fn mime_for(path: &Path) -> &'static str {
    match path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .as_deref()
    {
        Some("mp3") => "audio/mpeg",
        _ => "audio/wav",
    }
}

/// Inspect one poll of a Gradio SSE result.
///
/// Returns `None` while the job is still pending, otherwise the URL of the
/// generated file or the reported failure.
pub(crate) fn parse_gradio_event(text: &str) -> Option<Result<String, BackendError>> {
    if text.contains("event: error") {
        let detail = text
            .lines()
            .find_map(|line| line.strip_prefix("data: "))
            .filter(|d| *d != "null")
            .unwrap_or("Generation failed");
        return Some(Err(BackendError::RequestFailed(detail.to_string())));
    }

    if !text.contains("event: complete") {
        return None;
    }

    for line in text.lines() {
        if let Some(data) = line.strip_prefix("data: ") {
            let parsed: serde_json::Value = match serde_json::from_str(data) {
                Ok(value) => value,
                Err(e) => return Some(Err(BackendError::InvalidResponse(e.to_string()))),
            };

            if let Some(url) = parsed
                .as_array()
                .and_then(|a| a.first())
                .and_then(|v| v.get("url"))
                .and_then(|u| u.as_str())
            {
                return Some(Ok(url.to_string()));
            }
        }
    }

    Some(Err(BackendError::InvalidResponse(
        "No audio URL in response".to_string(),
    )))
}
