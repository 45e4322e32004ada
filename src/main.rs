//! voice-cloner entry point.

use std::io::{self, BufReader};

use anyhow::{Context, Result};
use clap::Parser;
use voice_cloner_rs::backend::{Backend, create_backend};
use voice_cloner_rs::cli::Args;
use voice_cloner_rs::config::{Settings, UiMode};
use voice_cloner_rs::engine::{Engine, EngineHandle, Session, SessionConfig};
use voice_cloner_rs::language::Language;
use voice_cloner_rs::logging;
use voice_cloner_rs::ui::{self, Console, SystemDevices, WebState};

fn main() -> Result<()> {
    let args = Args::parse();
    logging::init(&args.log_level, args.verbose)?;

    if args.list_languages {
        for language in Language::all() {
            println!("{language}");
        }
        return Ok(());
    }

    let mut settings =
        Settings::load(args.config.as_deref()).context("Failed to load settings")?;
    args.apply_to(&mut settings);
    tracing::debug!(?settings, "effective settings");

    // The blocking HTTP client must be created outside any async runtime
    let backend = create_backend(&settings.backend);
    let session = Session::new(backend, SessionConfig::from(&settings))
        .context("Failed to prepare output directory")?;

    if args.is_one_shot() {
        return one_shot(session, &args);
    }

    let engine = Engine::spawn(session).context("Failed to start synthesis worker")?;

    match settings.ui_mode {
        UiMode::Desktop => run_console(engine.handle(), &settings),
        UiMode::Web => run_web(engine.handle(), &settings),
    }
}

fn run_console<B: Backend + 'static>(handle: EngineHandle<B>, settings: &Settings) -> Result<()> {
    let mut console = Console::new(
        handle,
        SystemDevices,
        settings.output_dir().join("recordings"),
        settings.recording.seconds,
    );

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    console.run(BufReader::new(stdin.lock()), &mut stdout)
}

fn run_web<B: Backend + 'static>(handle: EngineHandle<B>, settings: &Settings) -> Result<()> {
    let state = WebState::new(handle, settings.uploads_dir(), settings.output_dir());
    let runtime = tokio::runtime::Runtime::new().context("Failed to start async runtime")?;
    runtime.block_on(ui::serve(state, &settings.web.bind))
}

/// Flag driven flow: manage voices, set a reference, synthesize, export.
fn one_shot<B: Backend>(mut session: Session<B>, args: &Args) -> Result<()> {
    // Handle utility commands first
    if args.list_voices {
        return list_voices(&session);
    }

    if let Some(name) = &args.delete_voice {
        session
            .delete_voice(name)
            .with_context(|| format!("Failed to delete voice '{name}'"))?;
        println!("Voice '{name}' deleted.");
        return Ok(());
    }

    // Pick the voice: a reference file (optionally saved under -n) or a saved one
    if let Some(path) = &args.reference {
        let reference = session
            .set_reference(path)
            .context("Failed to use reference audio")?;
        println!("Reference voice: {reference}");

        if let Some(name) = &args.name {
            let metadata = session
                .save_reference_as(name)
                .with_context(|| format!("Failed to save voice '{name}'"))?;
            println!("Voice '{}' saved.", metadata.name);
        }
    } else if let Some(name) = &args.name {
        let reference = session
            .use_voice(name)
            .with_context(|| format!("Voice '{name}' not found"))?;
        println!("Using voice: {reference}");
    }

    // Generate speech if requested
    let Some(text) = &args.generate else {
        if args.reference.is_none() {
            eprintln!("No text given. Use -g to generate speech or --ui to start a front-end.");
        }
        return Ok(());
    };

    let synthesis = session
        .synthesize(text, args.language.clone())
        .context("Failed to generate speech")?;
    println!("{synthesis}");

    // A silent placeholder counts as a failed run
    if synthesis.is_fallback() {
        anyhow::bail!("Engine failed, only a silent placeholder was written");
    }

    // Copy the clip to the requested output path
    let target = session
        .export_output(&args.output)
        .with_context(|| format!("Failed to write {}", args.output.display()))?;
    println!("Saved to {}", target.display());

    Ok(())
}

fn list_voices<B: Backend>(session: &Session<B>) -> Result<()> {
    let voices = session.list_voices().context("Failed to list voices")?;

    if voices.is_empty() {
        println!("No voices found.");
        return Ok(());
    }

    println!("Available voices:");
    for voice in voices {
        println!("  {} ({})", voice.name, voice.file_name);
        if let Some(duration) = voice.duration_secs {
            println!("    Duration: {duration:.2}s");
        }
        println!("    Created: {}", voice.created_at);
    }

    Ok(())
}
