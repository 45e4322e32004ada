//! Desktop mode: an interactive line console.

use std::io::{BufRead, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result, anyhow};
use chrono::Utc;
use thiserror::Error;

use crate::audio::{self, AudioInfo, DeviceError};
use crate::backend::Backend;
use crate::engine::{EngineHandle, SessionError};
use crate::language::{Language, LanguageError};

const HELP: &str = "\
Commands:
  load                       load the synthesis model
  record [path] [secs]       record a reference from the microphone
  ref [path]                 use a file (or the last recording) as reference
  clear                      forget the reference voice
  lang <code>                set the synthesis language
  say <text>                 synthesize text in the reference voice
  play [out|ref|rec]         play the last output, reference or recording
  save <path>                copy the last output to a file or directory
  voices                     list saved voices
  voice save|use|delete <n>  manage the voice library
  status                     show the current session
  help                       show this help
  quit                       exit";

/// Microphone and speaker access used by the console.
#[cfg_attr(test, mockall::automock)]
pub trait AudioDevices {
    fn record(&self, path: &Path, seconds: f32) -> Result<AudioInfo, DeviceError>;
    fn play(&self, path: &Path) -> Result<(), DeviceError>;
}

/// The default input and output devices.
pub struct SystemDevices;

impl AudioDevices for SystemDevices {
    fn record(&self, path: &Path, seconds: f32) -> Result<AudioInfo, DeviceError> {
        audio::record_wav(path, seconds)
    }

    fn play(&self, path: &Path) -> Result<(), DeviceError> {
        audio::play_file(path)
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum CommandError {
    #[error("Unknown command '{0}', type 'help'")]
    Unknown(String),

    #[error("Usage: {0}")]
    Usage(&'static str),

    #[error("Invalid duration: {0}")]
    InvalidSeconds(String),

    #[error(transparent)]
    Language(#[from] LanguageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayTarget {
    Output,
    Reference,
    Recording,
}

/// One parsed console line.
#[derive(Debug, Clone, PartialEq)]
pub enum ConsoleCommand {
    Help,
    Load,
    Record {
        path: Option<PathBuf>,
        seconds: Option<f32>,
    },
    Reference(Option<PathBuf>),
    Clear,
    Language(Language),
    Say(String),
    Play(PlayTarget),
    Save(PathBuf),
    Voices,
    VoiceSave(String),
    VoiceUse(String),
    VoiceDelete(String),
    Status,
    Quit,
}

fn parse_seconds(token: &str) -> Result<f32, CommandError> {
    match token.parse::<f32>() {
        Ok(secs) if audio::recording_duration(secs).is_ok() => Ok(secs),
        _ => Err(CommandError::InvalidSeconds(token.to_string())),
    }
}

impl FromStr for ConsoleCommand {
    type Err = CommandError;

    fn from_str(line: &str) -> Result<Self, Self::Err> {
        let line = line.trim();
        let (word, rest) = match line.split_once(char::is_whitespace) {
            Some((word, rest)) => (word, rest.trim()),
            None => (line, ""),
        };

        let command = match word.to_ascii_lowercase().as_str() {
            "help" | "?" => ConsoleCommand::Help,
            "load" => ConsoleCommand::Load,
            "record" | "rec" => {
                let tokens: Vec<&str> = rest.split_whitespace().collect();
                match tokens.as_slice() {
                    [] => ConsoleCommand::Record {
                        path: None,
                        seconds: None,
                    },
                    [single] => match single.parse::<f32>() {
                        Ok(_) => ConsoleCommand::Record {
                            path: None,
                            seconds: Some(parse_seconds(single)?),
                        },
                        Err(_) => ConsoleCommand::Record {
                            path: Some(PathBuf::from(single)),
                            seconds: None,
                        },
                    },
                    [path, secs] => ConsoleCommand::Record {
                        path: Some(PathBuf::from(path)),
                        seconds: Some(parse_seconds(secs)?),
                    },
                    _ => return Err(CommandError::Usage("record [path] [secs]")),
                }
            }
            "ref" | "reference" => {
                ConsoleCommand::Reference((!rest.is_empty()).then(|| PathBuf::from(rest)))
            }
            "clear" => ConsoleCommand::Clear,
            "lang" | "language" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("lang <code>"));
                }
                ConsoleCommand::Language(Language::parse(rest)?)
            }
            "say" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("say <text>"));
                }
                ConsoleCommand::Say(rest.to_string())
            }
            "play" => ConsoleCommand::Play(match rest {
                "" | "out" | "output" => PlayTarget::Output,
                "ref" | "reference" => PlayTarget::Reference,
                "rec" | "recording" => PlayTarget::Recording,
                _ => return Err(CommandError::Usage("play [out|ref|rec]")),
            }),
            "save" => {
                if rest.is_empty() {
                    return Err(CommandError::Usage("save <path>"));
                }
                ConsoleCommand::Save(PathBuf::from(rest))
            }
            "voices" => ConsoleCommand::Voices,
            "voice" => {
                const USAGE: &str = "voice save|use|delete <name>";
                let (action, name) = rest.split_once(char::is_whitespace).ok_or(CommandError::Usage(USAGE))?;
                let name = name.trim().to_string();
                match action {
                    "save" => ConsoleCommand::VoiceSave(name),
                    "use" => ConsoleCommand::VoiceUse(name),
                    "delete" | "rm" => ConsoleCommand::VoiceDelete(name),
                    _ => return Err(CommandError::Usage(USAGE)),
                }
            }
            "status" => ConsoleCommand::Status,
            "quit" | "exit" | "q" => ConsoleCommand::Quit,
            other => return Err(CommandError::Unknown(other.to_string())),
        };

        Ok(command)
    }
}

/// Interactive front-end driving the engine worker from stdin-like input.
pub struct Console<B: Backend + 'static, D: AudioDevices> {
    engine: EngineHandle<B>,
    devices: D,
    recordings_dir: PathBuf,
    record_seconds: f32,
    autoplay: bool,
    last_recording: Option<PathBuf>,
}

impl<B: Backend + 'static, D: AudioDevices> Console<B, D> {
    pub fn new(engine: EngineHandle<B>, devices: D, recordings_dir: PathBuf, record_seconds: f32) -> Self {
        Self {
            engine,
            devices,
            recordings_dir,
            record_seconds,
            autoplay: true,
            last_recording: None,
        }
    }

    /// Play each new clip as soon as it is generated.
    pub fn with_autoplay(mut self, autoplay: bool) -> Self {
        self.autoplay = autoplay;
        self
    }

    /// Read commands until `quit` or end of input.
    ///
    /// Command failures are printed and the loop continues; only I/O errors
    /// on `input` or `out` end it early.
    pub fn run<R: BufRead, W: Write>(&mut self, input: R, out: &mut W) -> Result<()> {
        writeln!(out, "Voice cloner ready. Type 'help' for commands.")?;

        let mut lines = input.lines();
        loop {
            write!(out, "> ")?;
            out.flush()?;

            let Some(line) = lines.next() else {
                writeln!(out)?;
                break;
            };
            let line = line.context("Failed to read input")?;
            if line.trim().is_empty() {
                continue;
            }

            let command = match line.parse::<ConsoleCommand>() {
                Ok(command) => command,
                Err(e) => {
                    writeln!(out, "{e}")?;
                    continue;
                }
            };

            if command == ConsoleCommand::Quit {
                break;
            }

            if let Err(e) = self.execute(command, out) {
                tracing::debug!(error = %e, "command failed");
                writeln!(out, "Error: {e:#}")?;
            }
        }

        Ok(())
    }

    fn execute<W: Write>(&mut self, command: ConsoleCommand, out: &mut W) -> Result<()> {
        match command {
            ConsoleCommand::Help => writeln!(out, "{HELP}")?,
            ConsoleCommand::Load => {
                writeln!(out, "Loading model...")?;
                let status = self.engine.load_model()?.wait_blocking()??;
                writeln!(out, "{status}")?;
            }
            ConsoleCommand::Record { path, seconds } => {
                let path = match path {
                    Some(path) => path,
                    None => {
                        std::fs::create_dir_all(&self.recordings_dir)?;
                        self.recordings_dir
                            .join(format!("recording_{}.wav", Utc::now().timestamp_millis()))
                    }
                };
                let seconds = seconds.unwrap_or(self.record_seconds);

                writeln!(out, "Recording for {seconds:.1}s...")?;
                out.flush()?;
                let info = self.devices.record(&path, seconds)?;
                writeln!(out, "Recording saved: {} ({info})", path.display())?;
                self.last_recording = Some(path);
            }
            ConsoleCommand::Reference(path) => {
                let path = path
                    .or_else(|| self.last_recording.clone())
                    .ok_or_else(|| anyhow!("No recording yet, give a file path"))?;
                let reference = self.engine.set_reference(path)?.wait_blocking()??;
                writeln!(out, "Reference voice: {reference}")?;
            }
            ConsoleCommand::Clear => match self.engine.clear_reference()?.wait_blocking()? {
                Some(_) => writeln!(out, "Reference voice cleared.")?,
                None => writeln!(out, "No reference voice set.")?,
            },
            ConsoleCommand::Language(language) => {
                let code = language.clone();
                self.engine
                    .submit(move |session| session.set_default_language(language))?
                    .wait_blocking()?;
                writeln!(out, "Language: {code}")?;
            }
            ConsoleCommand::Say(text) => {
                writeln!(out, "Generating audio...")?;
                out.flush()?;
                let synthesis = self.engine.synthesize(text, None)?.wait_blocking()??;
                writeln!(out, "{synthesis}")?;

                if self.autoplay
                    && !synthesis.is_fallback()
                    && let Err(e) = self.devices.play(&synthesis.path)
                {
                    tracing::warn!(error = %e, "autoplay failed");
                    writeln!(out, "Playback failed: {e}")?;
                }
            }
            ConsoleCommand::Play(target) => {
                let path = self.play_target(target)?;
                self.devices.play(&path)?;
            }
            ConsoleCommand::Save(dest) => {
                let target = self
                    .engine
                    .submit(move |session| session.export_output(&dest))?
                    .wait_blocking()??;
                writeln!(out, "Saved to {}", target.display())?;
            }
            ConsoleCommand::Voices => {
                let voices = self
                    .engine
                    .submit(|session| session.list_voices())?
                    .wait_blocking()??;
                if voices.is_empty() {
                    writeln!(out, "No voices found.")?;
                }
                for voice in voices {
                    match voice.duration_secs {
                        Some(secs) => writeln!(out, "  {} ({secs:.1}s)", voice.name)?,
                        None => writeln!(out, "  {}", voice.name)?,
                    }
                }
            }
            ConsoleCommand::VoiceSave(name) => {
                let metadata = self
                    .engine
                    .submit(move |session| session.save_reference_as(&name))?
                    .wait_blocking()??;
                writeln!(out, "Voice '{}' saved.", metadata.name)?;
            }
            ConsoleCommand::VoiceUse(name) => {
                let reference = self
                    .engine
                    .submit(move |session| session.use_voice(&name))?
                    .wait_blocking()??;
                writeln!(out, "Reference voice: {reference}")?;
            }
            ConsoleCommand::VoiceDelete(name) => {
                let label = name.clone();
                self.engine
                    .submit(move |session| session.delete_voice(&name))?
                    .wait_blocking()??;
                writeln!(out, "Voice '{label}' deleted.")?;
            }
            ConsoleCommand::Status => {
                let snapshot = self.engine.snapshot()?.wait_blocking()?;
                let loaded = if snapshot.model_loaded { "loaded" } else { "not loaded" };
                writeln!(out, "Model:     {} ({loaded})", snapshot.model_name)?;
                writeln!(out, "Language:  {}", snapshot.default_language)?;
                match &snapshot.reference {
                    Some(reference) => writeln!(out, "Reference: {reference}")?,
                    None => writeln!(out, "Reference: none")?,
                }
                match &snapshot.last_output {
                    Some(path) => writeln!(out, "Output:    {}", path.display())?,
                    None => writeln!(out, "Output:    none")?,
                }
            }
            ConsoleCommand::Quit => {}
        }

        Ok(())
    }

    fn play_target(&self, target: PlayTarget) -> Result<PathBuf> {
        match target {
            PlayTarget::Output => self
                .engine
                .last_output()?
                .wait_blocking()?
                .ok_or_else(|| SessionError::NoOutput.into()),
            PlayTarget::Reference => self
                .engine
                .snapshot()?
                .wait_blocking()?
                .reference
                .map(|reference| reference.path)
                .ok_or_else(|| SessionError::NoReference.into()),
            PlayTarget::Recording => self
                .last_recording
                .clone()
                .ok_or_else(|| anyhow!("No recording available")),
        }
    }
}
