//! Background worker that owns the session.
//!
//! Front-ends submit jobs and receive a single-shot [`Completion`]. The
//! worker runs jobs one at a time; slow jobs (model load, synthesis) are
//! additionally limited to one in flight so a second click is rejected
//! instead of queued.

use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tokio::sync::oneshot;

use super::session::{ModelStatus, Session, SessionError, SessionSnapshot, Synthesis};
use crate::backend::Backend;
use crate::language::Language;
use crate::voice::ReferenceVoice;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerError {
    #[error("A synthesis is already running")]
    Busy,

    #[error("Engine worker has stopped")]
    Stopped,
}

type Job<B> = Box<dyn FnOnce(&mut Session<B>) + Send>;

enum Message<B: Backend + 'static> {
    Run(Job<B>),
    Stop,
}

/// Result of a submitted job, delivered once.
#[must_use = "a completion does nothing unless waited on"]
pub struct Completion<T> {
    receiver: oneshot::Receiver<T>,
}

impl<T> Completion<T> {
    /// Wait asynchronously for the job result.
    pub async fn wait(self) -> Result<T, WorkerError> {
        self.receiver.await.map_err(|_| WorkerError::Stopped)
    }

    /// Block the current thread until the job result arrives.
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait_blocking(self) -> Result<T, WorkerError> {
        self.receiver.blocking_recv().map_err(|_| WorkerError::Stopped)
    }
}

/// Clears the busy flag when the exclusive job is finished or dropped.
struct BusyGuard(Arc<AtomicBool>);

impl Drop for BusyGuard {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cloneable submission side of the worker.
pub struct EngineHandle<B: Backend + 'static> {
    sender: mpsc::Sender<Message<B>>,
    busy: Arc<AtomicBool>,
}

impl<B: Backend + 'static> Clone for EngineHandle<B> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            busy: Arc::clone(&self.busy),
        }
    }
}

impl<B: Backend + 'static> EngineHandle<B> {
    /// Queue a job on the worker.
    pub fn submit<T, F>(&self, job: F) -> Result<Completion<T>, WorkerError>
    where
        F: FnOnce(&mut Session<B>) -> T + Send + 'static,
        T: Send + 'static,
    {
        let (tx, rx) = oneshot::channel();
        let boxed: Job<B> = Box::new(move |session| {
            // The caller may have stopped listening
            let _ = tx.send(job(session));
        });

        self.sender
            .send(Message::Run(boxed))
            .map_err(|_| WorkerError::Stopped)?;

        Ok(Completion { receiver: rx })
    }

    /// Queue a slow job, rejecting it while another one is in flight.
    pub fn submit_exclusive<T, F>(&self, job: F) -> Result<Completion<T>, WorkerError>
    where
        F: FnOnce(&mut Session<B>) -> T + Send + 'static,
        T: Send + 'static,
    {
        if self
            .busy
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(WorkerError::Busy);
        }

        let guard = BusyGuard(Arc::clone(&self.busy));
        self.submit(move |session| {
            let _guard = guard;
            job(session)
        })
    }

    /// True while a slow job is queued or running.
    pub fn is_busy(&self) -> bool {
        self.busy.load(Ordering::Acquire)
    }

    pub fn load_model(
        &self,
    ) -> Result<Completion<Result<ModelStatus, SessionError>>, WorkerError> {
        self.submit_exclusive(|session| session.load_model())
    }

    pub fn synthesize(
        &self,
        text: impl Into<String>,
        language: Option<Language>,
    ) -> Result<Completion<Result<Synthesis, SessionError>>, WorkerError> {
        let text = text.into();
        self.submit_exclusive(move |session| session.synthesize(&text, language))
    }

    pub fn set_reference(
        &self,
        path: PathBuf,
    ) -> Result<Completion<Result<ReferenceVoice, SessionError>>, WorkerError> {
        self.submit(move |session| session.set_reference(&path))
    }

    pub fn clear_reference(&self) -> Result<Completion<Option<ReferenceVoice>>, WorkerError> {
        self.submit(|session| session.clear_reference())
    }

    pub fn last_output(&self) -> Result<Completion<Option<PathBuf>>, WorkerError> {
        self.submit(|session| session.last_output().map(|p| p.to_path_buf()))
    }

    pub fn snapshot(&self) -> Result<Completion<SessionSnapshot>, WorkerError> {
        self.submit(|session| session.snapshot())
    }
}

/// The worker thread together with its session.
///
/// Dropping the engine stops the worker after the queued jobs have run and
/// destroys the session.
pub struct Engine<B: Backend + 'static> {
    handle: EngineHandle<B>,
    thread: Option<JoinHandle<()>>,
}

impl<B: Backend + 'static> Engine<B> {
    /// Move `session` onto a dedicated worker thread.
    pub fn spawn(session: Session<B>) -> std::io::Result<Self> {
        let (sender, receiver) = mpsc::channel::<Message<B>>();

        let thread = thread::Builder::new()
            .name("synthesis-worker".to_string())
            .spawn(move || {
                let mut session = session;
                while let Ok(Message::Run(job)) = receiver.recv() {
                    job(&mut session);
                }
                tracing::debug!("synthesis worker stopped");
            })?;

        Ok(Self {
            handle: EngineHandle {
                sender,
                busy: Arc::new(AtomicBool::new(false)),
            },
            thread: Some(thread),
        })
    }

    pub fn handle(&self) -> EngineHandle<B> {
        self.handle.clone()
    }

    /// Stop the worker and wait for it to exit.
    pub fn shutdown(self) {
        drop(self);
    }
}

impl<B: Backend + 'static> Drop for Engine<B> {
    fn drop(&mut self) {
        let _ = self.handle.sender.send(Message::Stop);
        if let Some(thread) = self.thread.take()
            && thread.join().is_err()
        {
            tracing::error!("synthesis worker panicked");
        }
    }
}
