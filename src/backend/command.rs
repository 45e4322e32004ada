//! Backend that drives Coqui's `tts` command line program.

use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};

use super::Backend;
use super::types::{BackendError, HealthResponse, ModelInfo, SynthesizeRequest};

/// Lines of stderr kept when a run fails.
const STDERR_TAIL_LINES: usize = 5;

/// Runs the `tts` executable once per request.
pub struct CommandBackend {
    executable: PathBuf,
    use_cuda: bool,
    model_cache: Option<PathBuf>,
}

impl CommandBackend {
    pub fn new(executable: impl Into<PathBuf>) -> Self {
        Self {
            executable: executable.into(),
            use_cuda: false,
            model_cache: None,
        }
    }

    pub fn with_cuda(mut self, use_cuda: bool) -> Self {
        self.use_cuda = use_cuda;
        self
    }

    /// Directory the engine downloads models into (`TTS_HOME`).
    pub fn with_model_cache(mut self, dir: Option<PathBuf>) -> Self {
        self.model_cache = dir;
        self
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    /// Locate the executable, either as given or on `PATH` (honouring `PATHEXT` on Windows).
    pub(crate) fn resolve_executable(&self) -> Result<PathBuf, BackendError> {
        which::which(&self.executable).map_err(|e| {
            tracing::debug!(executable = %self.executable.display(), error = %e, "executable lookup failed");
            BackendError::ExecutableNotFound(self.executable.display().to_string())
        })
    }

    /// Arguments for one synthesis run.
    pub(crate) fn synthesize_args(&self, request: &SynthesizeRequest, output: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec![
            "--model_name".into(),
            request.model_name.clone().into(),
            "--text".into(),
            request.text.clone().into(),
            "--language_idx".into(),
            request.language.as_str().into(),
        ];

        if let Some(speaker) = &request.speaker_wav {
            args.push("--speaker_wav".into());
            args.push(speaker.clone().into_os_string());
        }

        args.push("--out_path".into());
        args.push(output.as_os_str().to_os_string());

        if self.use_cuda {
            args.push("--use_cuda".into());
            args.push("true".into());
        }

        args
    }

    fn run(&self, args: &[OsString]) -> Result<Output, BackendError> {
        let executable = self.resolve_executable()?;

        let mut command = Command::new(&executable);
        command
            .args(args)
            // XTTS refuses to download without an accepted licence prompt otherwise
            .env("COQUI_TOS_AGREED", "1")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        if let Some(cache) = &self.model_cache {
            command.env("TTS_HOME", cache);
        }

        tracing::debug!(executable = %executable.display(), ?args, "running tts command");

        let output = command.output()?;

        if !output.status.success() {
            return Err(BackendError::CommandFailed(format!(
                "{} ({})",
                stderr_tail(&output.stderr),
                output.status
            )));
        }

        Ok(output)
    }
}

impl Backend for CommandBackend {
    fn health(&self) -> Result<HealthResponse, BackendError> {
        let executable = self.resolve_executable()?;

        Ok(HealthResponse {
            status: "ready".to_string(),
            model: None,
            cuda_available: self.use_cuda,
            device: Some(executable.display().to_string()),
        })
    }

    fn load_model(&self, model_name: &str) -> Result<ModelInfo, BackendError> {
        let args: Vec<OsString> = vec!["--model_info_by_name".into(), model_name.into()];
        self.run(&args)?;
        Ok(ModelInfo::new(model_name))
    }

    fn synthesize(&self, request: &SynthesizeRequest, output: &Path) -> Result<(), BackendError> {
        if let Some(speaker) = &request.speaker_wav
            && !speaker.exists()
        {
            return Err(BackendError::FileNotFound(speaker.display().to_string()));
        }

        if let Some(parent) = output.parent() {
            std::fs::create_dir_all(parent)?;
        }

        self.run(&self.synthesize_args(request, output))?;

        if !output.exists() {
            return Err(BackendError::InvalidResponse(format!(
                "tts finished without writing {}",
                output.display()
            )));
        }

        Ok(())
    }
}

/// Last few non-empty stderr lines, enough to show the Python exception.
pub(crate) fn stderr_tail(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let lines: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();

    if lines.is_empty() {
        return "no error output".to_string();
    }

    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join(" | ")
}
