//! Session and worker.
//!
//! [`Session`] is the single owner of the loaded model, the current reference
//! voice and the last output. [`Engine`] moves it onto a worker thread so the
//! front-ends stay responsive while the engine runs.

mod session;
mod worker;

pub use session::{
    ModelStatus, Session, SessionConfig, SessionError, SessionSnapshot, Synthesis,
};
pub use worker::{Completion, Engine, EngineHandle, WorkerError};
