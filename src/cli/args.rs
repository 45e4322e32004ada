//! CLI argument definitions.

use clap::Parser;
use std::path::PathBuf;

use crate::config::{BackendKind, ENV_CONFIG_PATH, Settings, UiMode};
use crate::language::Language;

/// Zero-shot voice cloning front-end for XTTS.
#[derive(Parser, Debug)]
#[command(name = "voice-cloner")]
#[command(about = "Clone a voice from a short sample and speak text with it")]
#[command(version)]
pub struct Args {
    /// Front-end to start when no one-shot action is given
    #[arg(short, long, value_enum)]
    pub ui: Option<UiMode>,

    /// Language code for synthesis (de, en, fr, ...)
    #[arg(short, long)]
    pub language: Option<Language>,

    /// Engine model identifier
    #[arg(short, long)]
    pub model_name: Option<String>,

    /// How the engine is reached
    #[arg(short, long, value_enum)]
    pub backend: Option<BackendKind>,

    /// Engine server URL for the http and gradio backends
    #[arg(long)]
    pub backend_url: Option<String>,

    /// Path or name of the `tts` executable
    #[arg(long)]
    pub tts_bin: Option<PathBuf>,

    /// Model cache directory passed to the engine
    #[arg(long, env = "TTS_HOME")]
    pub model_cache: Option<PathBuf>,

    /// Run the engine on the GPU
    #[arg(long)]
    pub cuda: bool,

    /// Reference audio to clone
    #[arg(short, long)]
    pub reference: Option<PathBuf>,

    /// Text to speak
    #[arg(short, long)]
    pub generate: Option<String>,

    /// Library voice: saved under this name with -r, used as reference otherwise
    #[arg(short, long)]
    pub name: Option<String>,

    /// Output audio file
    #[arg(short, long, default_value = "output.wav")]
    pub output: PathBuf,

    /// Enable verbose output
    #[arg(short, long)]
    pub verbose: bool,

    /// List all saved voices
    #[arg(long)]
    pub list_voices: bool,

    /// Delete a saved voice
    #[arg(long)]
    pub delete_voice: Option<String>,

    /// List supported language codes
    #[arg(long)]
    pub list_languages: bool,

    /// Address for the web front-end
    #[arg(long)]
    pub bind: Option<String>,

    /// Report engine failures instead of writing a silent clip
    #[arg(long)]
    pub no_fallback: bool,

    /// Settings file
    #[arg(long, env = ENV_CONFIG_PATH)]
    pub config: Option<PathBuf>,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Args {
    /// True when the invocation asks for a one-shot action instead of a UI.
    pub fn is_one_shot(&self) -> bool {
        self.list_voices
            || self.list_languages
            || self.delete_voice.is_some()
            || self.reference.is_some()
            || self.generate.is_some()
            || self.name.is_some()
    }

    /// Override file settings with whatever was given on the command line.
    pub fn apply_to(&self, settings: &mut Settings) {
        if let Some(ui) = self.ui {
            settings.ui_mode = ui;
        }
        if let Some(language) = &self.language {
            settings.language_default = language.clone();
        }
        if let Some(model_name) = &self.model_name {
            settings.model_name = model_name.clone();
        }
        if let Some(kind) = self.backend {
            settings.backend.kind = kind;
        }
        if let Some(url) = &self.backend_url {
            settings.backend.url = url.clone();
        }
        if let Some(bin) = &self.tts_bin {
            settings.backend.executable = bin.clone();
        }
        if let Some(cache) = &self.model_cache {
            settings.backend.model_cache = Some(cache.clone());
        }
        if self.cuda {
            settings.backend.use_cuda = true;
        }
        if let Some(bind) = &self.bind {
            settings.web.bind = bind.clone();
        }
        if self.no_fallback {
            settings.fallback_silence = false;
        }
    }
}
