//! voice-cloner-rs: zero-shot voice cloning front-end.
//!
//! Records or accepts a short reference sample, hands text and sample to the
//! external XTTS engine and plays or saves the result. The same session runs
//! behind an interactive console (desktop mode) or a local web UI.

pub mod audio;
pub mod backend;
pub mod cli;
pub mod config;
pub mod engine;
pub mod language;
pub mod logging;
pub mod ui;
pub mod voice;
