//! Front-ends.
//!
//! Both modes drive the same [`crate::engine::EngineHandle`]; they differ
//! only in how text, references and results reach the user.

mod console;
mod web;

pub use console::{
    AudioDevices, CommandError, Console, ConsoleCommand, PlayTarget, SystemDevices,
};
pub use web::{ApiError, WebState, resolve_output_file, router, serve, store_upload};
