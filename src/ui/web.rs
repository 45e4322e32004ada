//! Web mode: a small browser UI served by axum.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use axum::{
    Json, Router,
    extract::{DefaultBodyLimit, Multipart, Path as AxumPath, State},
    http::{StatusCode, header},
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::json;
use thiserror::Error;

use crate::backend::Backend;
use crate::engine::{EngineHandle, SessionError, SessionSnapshot, WorkerError};
use crate::language::Language;
use crate::voice::ReferenceVoice;

const INDEX_HTML: &str = include_str!("index.html");

/// Upload formats passed through to the engine.
const UPLOAD_EXTENSIONS: &[&str] = &["wav", "mp3"];

/// Request body cap, room for a 30 s stereo 48 kHz WAV several times over.
pub const MAX_UPLOAD_BYTES: usize = 32 * 1024 * 1024;

/// Errors returned to the browser as `{"error": ...}`.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),

    #[error("{0}")]
    NotFound(String),

    #[error("A synthesis is already running")]
    Busy,

    #[error("{0}")]
    Engine(String),

    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Busy => StatusCode::CONFLICT,
            ApiError::Engine(_) => StatusCode::BAD_GATEWAY,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<WorkerError> for ApiError {
    fn from(e: WorkerError) -> Self {
        match e {
            WorkerError::Busy => ApiError::Busy,
            WorkerError::Stopped => ApiError::Internal(e.to_string()),
        }
    }
}

impl From<SessionError> for ApiError {
    fn from(e: SessionError) -> Self {
        match e {
            SessionError::EmptyText
            | SessionError::NoFile
            | SessionError::ReferenceNotFound(_)
            | SessionError::NoReference => ApiError::BadRequest(e.to_string()),
            SessionError::NoOutput => ApiError::NotFound(e.to_string()),
            SessionError::ModelLoad(_) | SessionError::Synthesis(_) | SessionError::Engine(_) => {
                ApiError::Engine(e.to_string())
            }
            _ => ApiError::Internal(e.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if matches!(self, ApiError::Internal(_) | ApiError::Engine(_)) {
            tracing::error!(error = %self, "request failed");
        }
        (self.status(), Json(json!({ "error": self.to_string() }))).into_response()
    }
}

/// Shared state of the web handlers.
pub struct WebState<B: Backend + 'static> {
    engine: EngineHandle<B>,
    uploads_dir: PathBuf,
    output_dir: PathBuf,
}

impl<B: Backend + 'static> WebState<B> {
    pub fn new(engine: EngineHandle<B>, uploads_dir: PathBuf, output_dir: PathBuf) -> Self {
        Self {
            engine,
            uploads_dir,
            output_dir,
        }
    }
}

type SharedState<B> = State<Arc<WebState<B>>>;

#[derive(Debug, Serialize)]
pub struct MessageResponse {
    pub message: String,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    #[serde(flatten)]
    pub session: SessionSnapshot,
    pub busy: bool,
}

#[derive(Debug, Serialize)]
pub struct ReferenceResponse {
    pub message: String,
    pub reference: ReferenceVoice,
}

#[derive(Debug, Deserialize)]
pub struct TtsRequest {
    pub text: String,
    #[serde(default)]
    pub language: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct TtsResponse {
    pub message: String,
    pub file: String,
    pub url: String,
    pub language: Language,
    pub fallback: bool,
}

#[derive(Debug, Serialize)]
pub struct LanguagesResponse {
    pub languages: Vec<Language>,
    pub default: Language,
}

/// Build the router for all pages and API routes.
pub fn router<B: Backend + 'static>(state: WebState<B>) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/api/status", get(status::<B>))
        .route("/api/languages", get(languages::<B>))
        .route("/api/model/load", post(load_model::<B>))
        .route(
            "/api/reference",
            post(upload_reference::<B>).delete(clear_reference::<B>),
        )
        .route("/api/tts", post(synthesize::<B>))
        .route("/api/audio/{file}", get(audio_file::<B>))
        .route("/api/file", get(download_output::<B>))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .with_state(Arc::new(state))
}

/// Serve the web UI on `bind` until Ctrl-C.
///
/// The model load is started right away so the first synthesis does not
/// pay for it.
pub async fn serve<B: Backend + 'static>(state: WebState<B>, bind: &str) -> anyhow::Result<()> {
    match state.engine.load_model() {
        Ok(completion) => {
            tokio::spawn(async move {
                match completion.wait().await {
                    Ok(Ok(status)) => tracing::info!("{status}"),
                    Ok(Err(e)) => tracing::warn!(error = %e, "model load at startup failed"),
                    Err(e) => tracing::warn!(error = %e, "model load at startup aborted"),
                }
            });
        }
        Err(e) => tracing::warn!(error = %e, "could not start model load"),
    }

    let listener = tokio::net::TcpListener::bind(bind)
        .await
        .with_context(|| format!("Failed to bind {bind}"))?;
    let addr = listener.local_addr()?;
    tracing::info!("web UI running on http://{addr}");

    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Web server failed")?;

    tracing::info!("web UI stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

pub(crate) async fn index() -> Html<&'static str> {
    Html(INDEX_HTML)
}

pub(crate) async fn status<B: Backend + 'static>(
    State(state): SharedState<B>,
) -> Result<Json<StatusResponse>, ApiError> {
    let session = state.engine.snapshot()?.wait().await?;
    Ok(Json(StatusResponse {
        session,
        busy: state.engine.is_busy(),
    }))
}

pub(crate) async fn languages<B: Backend + 'static>(
    State(state): SharedState<B>,
) -> Result<Json<LanguagesResponse>, ApiError> {
    let snapshot = state.engine.snapshot()?.wait().await?;
    Ok(Json(LanguagesResponse {
        languages: Language::all(),
        default: snapshot.default_language,
    }))
}

pub(crate) async fn load_model<B: Backend + 'static>(
    State(state): SharedState<B>,
) -> Result<Json<MessageResponse>, ApiError> {
    let status = state.engine.load_model()?.wait().await??;
    Ok(Json(MessageResponse {
        message: status.to_string(),
    }))
}

pub(crate) async fn upload_reference<B: Backend + 'static>(
    State(state): SharedState<B>,
    mut multipart: Multipart,
) -> Result<Json<ReferenceResponse>, ApiError> {
    let mut stored = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(e.to_string()))?
    {
        if field.name() != Some("audio") {
            continue;
        }
        let file_name = field.file_name().map(str::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|e| ApiError::BadRequest(e.to_string()))?;
        stored = Some(store_upload(&state.uploads_dir, file_name.as_deref(), &bytes)?);
        break;
    }

    let path = stored.ok_or_else(|| ApiError::BadRequest(SessionError::NoFile.to_string()))?;

    let candidate = path.clone();
    let result = state
        .engine
        .submit(move |session| {
            let previous = session.reference().map(|r| r.path.clone());
            session
                .set_reference(&candidate)
                .map(|reference| (reference, previous))
        })?
        .wait()
        .await?;

    let (reference, previous) = match result {
        Ok(replaced) => replaced,
        Err(e) => {
            discard_upload(&state.uploads_dir, &path).await;
            return Err(e.into());
        }
    };

    // The superseded upload is no longer reachable from the session
    if let Some(previous) = previous
        && previous != reference.path
    {
        discard_upload(&state.uploads_dir, &previous).await;
    }

    Ok(Json(ReferenceResponse {
        message: format!("Reference voice: {reference}"),
        reference,
    }))
}

pub(crate) async fn clear_reference<B: Backend + 'static>(
    State(state): SharedState<B>,
) -> Result<Json<MessageResponse>, ApiError> {
    let message = match state.engine.clear_reference()?.wait().await? {
        Some(previous) => {
            discard_upload(&state.uploads_dir, &previous.path).await;
            "Reference voice cleared."
        }
        None => "No reference voice set.",
    };
    Ok(Json(MessageResponse {
        message: message.to_string(),
    }))
}

pub(crate) async fn synthesize<B: Backend + 'static>(
    State(state): SharedState<B>,
    Json(request): Json<TtsRequest>,
) -> Result<Json<TtsResponse>, ApiError> {
    let language = match request.language.as_deref().map(str::trim) {
        None | Some("") => None,
        Some(code) => Some(Language::parse(code).map_err(|e| ApiError::BadRequest(e.to_string()))?),
    };

    let synthesis = state
        .engine
        .synthesize(request.text, language)?
        .wait()
        .await??;

    let file = synthesis.file_name();
    Ok(Json(TtsResponse {
        message: synthesis.to_string(),
        url: format!("/api/audio/{file}"),
        file,
        language: synthesis.language.clone(),
        fallback: synthesis.is_fallback(),
    }))
}

pub(crate) async fn audio_file<B: Backend + 'static>(
    State(state): SharedState<B>,
    AxumPath(file): AxumPath<String>,
) -> Result<Response, ApiError> {
    let path = resolve_output_file(&state.output_dir, &file)?;
    audio_response(&path, false).await
}

pub(crate) async fn download_output<B: Backend + 'static>(
    State(state): SharedState<B>,
) -> Result<Response, ApiError> {
    let path = state
        .engine
        .last_output()?
        .wait()
        .await?
        .ok_or(SessionError::NoOutput)?;
    audio_response(&path, true).await
}

/// Map a requested file name onto a file inside `output_dir`.
pub fn resolve_output_file(output_dir: &Path, file: &str) -> Result<PathBuf, ApiError> {
    let invalid = file.is_empty()
        || file.contains('/')
        || file.contains('\\')
        || file.contains("..");
    if invalid {
        return Err(ApiError::BadRequest(format!("Invalid file name: {file}")));
    }

    let path = output_dir.join(file);
    if !path.is_file() {
        return Err(ApiError::NotFound(format!("Audio not found: {file}")));
    }
    Ok(path)
}

/// Write an uploaded reference sample to `uploads_dir` under a fresh name.
pub fn store_upload(
    uploads_dir: &Path,
    file_name: Option<&str>,
    bytes: &[u8],
) -> Result<PathBuf, ApiError> {
    let extension = file_name
        .and_then(|name| Path::new(name).extension())
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .filter(|ext| UPLOAD_EXTENSIONS.contains(&ext.as_str()))
        .ok_or_else(|| ApiError::BadRequest("Reference must be a .wav or .mp3 file".to_string()))?;

    if bytes.is_empty() {
        return Err(ApiError::BadRequest("Uploaded file is empty".to_string()));
    }

    let io_error = |e: std::io::Error| ApiError::Internal(format!("Could not store upload: {e}"));
    std::fs::create_dir_all(uploads_dir).map_err(io_error)?;

    let stamp = Utc::now().timestamp_millis();
    let mut path = uploads_dir.join(format!("upload_{stamp}.{extension}"));
    let mut counter = 1;
    while path.exists() {
        path = uploads_dir.join(format!("upload_{stamp}_{counter}.{extension}"));
        counter += 1;
    }
    std::fs::write(&path, bytes).map_err(io_error)?;

    tracing::info!(path = %path.display(), bytes = bytes.len(), "reference uploaded");
    Ok(path)
}

/// Remove `path` when it is one of our own uploads.
async fn discard_upload(uploads_dir: &Path, path: &Path) {
    if !path.starts_with(uploads_dir) {
        return;
    }
    match tokio::fs::remove_file(path).await {
        Ok(()) => tracing::debug!(path = %path.display(), "removed superseded upload"),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::warn!(path = %path.display(), error = %e, "could not remove upload"),
    }
}

async fn audio_response(path: &Path, attachment: bool) -> Result<Response, ApiError> {
    let bytes = tokio::fs::read(path)
        .await
        .map_err(|e| ApiError::Internal(format!("Could not read audio: {e}")))?;

    let content_type = match path.extension().and_then(|e| e.to_str()) {
        Some("mp3") => "audio/mpeg",
        _ => "audio/wav",
    };
    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.wav".to_string());
    let disposition = if attachment {
        format!("attachment; filename=\"{file_name}\"")
    } else {
        format!("inline; filename=\"{file_name}\"")
    };

    Ok((
        [
            (header::CONTENT_TYPE, content_type.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        bytes,
    )
        .into_response())
}
