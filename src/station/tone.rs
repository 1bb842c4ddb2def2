//! Background tone sessions
//!
//! Each pattern request spawns a session that renders ten seconds of sine
//! and streams it to an output line chunk by chunk. Starting a session
//! cancels the previous one, and the new session waits for the old one to
//! let go of its line before opening its own.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::engine::{LineProvider, OutputLine};
use crate::error::StationError;
use crate::synth::tone::{is_blank, render_pattern};
use crate::synth::{CHUNK_BYTES, TONE_FORMAT};

/// Cooperative cancellation flag shared with one session
#[derive(Debug, Clone, Default)]
pub struct CancellationToken {
    cancelled: Arc<AtomicBool>,
}

impl CancellationToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// How a stream ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamOutcome {
    Completed { chunks: usize },
    Cancelled { chunks: usize },
}

/// Write `bytes` to `line` in fixed-size chunks
///
/// The token is checked before every chunk; a chunk already handed to the
/// line always completes.
pub fn stream_chunks(
    line: &mut dyn OutputLine,
    bytes: &[u8],
    token: &CancellationToken,
) -> Result<StreamOutcome, StationError> {
    let mut chunks = 0;
    for chunk in bytes.chunks(CHUNK_BYTES) {
        if token.is_cancelled() {
            return Ok(StreamOutcome::Cancelled { chunks });
        }
        line.write(chunk)?;
        chunks += 1;
    }
    Ok(StreamOutcome::Completed { chunks })
}

/// A running (or just cancelled) session
///
/// `done` closes when the session task ends. Any number of waiters can
/// hold a receiver, so the slot never has to give the session up.
struct ToneSession {
    token: CancellationToken,
    task: JoinHandle<()>,
    done: watch::Receiver<()>,
}

impl ToneSession {
    fn finished(&self) -> impl std::future::Future<Output = ()> {
        wait_closed(self.done.clone())
    }
}

async fn wait_closed(mut done: watch::Receiver<()>) {
    // Nothing is ever sent, so this only returns once the sender is dropped
    while done.changed().await.is_ok() {}
}

/// Spawns and replaces tone sessions
pub struct ToneSynthesizer {
    name: Arc<str>,
    provider: Arc<dyn LineProvider>,
    runtime: Handle,
    current: Mutex<Option<ToneSession>>,
}

impl ToneSynthesizer {
    /// Create a synthesizer that spawns sessions on `runtime`
    pub fn new(
        name: impl Into<Arc<str>>,
        provider: Arc<dyn LineProvider>,
        runtime: Handle,
    ) -> Self {
        Self {
            name: name.into(),
            provider,
            runtime,
            current: Mutex::new(None),
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<ToneSession>> {
        self.current.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Cancel the running tone and start one for `pattern`
    ///
    /// Returns immediately. A blank or missing pattern only cancels.
    pub fn change_sound_pattern(&self, pattern: Option<&str>) {
        let mut current = self.lock();

        if let Some(session) = current.as_ref() {
            session.token.cancel();
        }

        let pattern = match pattern {
            Some(p) if !is_blank(Some(p)) => p.to_string(),
            _ => {
                info!(station = %self.name, "empty sound pattern received");
                return;
            }
        };

        let previous = current.as_ref().map(ToneSession::finished);
        let token = CancellationToken::new();
        let session_token = token.clone();
        let provider = Arc::clone(&self.provider);
        let name = Arc::clone(&self.name);
        let (done_tx, done) = watch::channel(());

        let task = self.runtime.spawn(async move {
            let _done = done_tx;
            if let Some(previous) = previous {
                // The previous session was cancelled above; wait for it to
                // release its line.
                previous.await;
            }
            let result = tokio::task::spawn_blocking(move || {
                run_session(&name, provider.as_ref(), &pattern, &session_token)
            })
            .await;
            if let Err(e) = result {
                error!("tone session panicked: {}", e);
            }
        });

        *current = Some(ToneSession { token, task, done });
    }

    /// Check if a session has been started and not yet finished
    pub fn is_active(&self) -> bool {
        self.lock()
            .as_ref()
            .map(|session| !session.token.is_cancelled() && !session.task.is_finished())
            .unwrap_or(false)
    }

    /// Wait for the current session, and every session before it, to end
    pub async fn settle(&self) {
        let finished = self.lock().as_ref().map(ToneSession::finished);
        if let Some(finished) = finished {
            finished.await;
        }
    }

    /// Cancel the current session and wait for it to release its line
    pub async fn shutdown(&self) {
        if let Some(session) = self.lock().as_ref() {
            session.token.cancel();
        }
        self.settle().await;
    }
}

/// Body of one session, run on the blocking pool
fn run_session(
    name: &str,
    provider: &dyn LineProvider,
    pattern: &str,
    token: &CancellationToken,
) {
    if token.is_cancelled() {
        debug!(station = %name, "tone superseded before it started");
        return;
    }

    let (frequency, bytes) = render_pattern(pattern);
    info!(station = %name, frequency, "playing tone");

    let mut line = match provider.open_line(&TONE_FORMAT) {
        Ok(line) => line,
        Err(e) => {
            error!(station = %name, "cannot open tone output: {}", e);
            return;
        }
    };

    match stream_chunks(line.as_mut(), &bytes, token) {
        Ok(StreamOutcome::Completed { chunks }) => {
            debug!(station = %name, frequency, chunks, "tone streamed")
        }
        Ok(StreamOutcome::Cancelled { chunks }) => {
            info!(station = %name, frequency, chunks, "tone cancelled")
        }
        Err(e) => error!(station = %name, "tone output failed: {}", e),
    }

    if let Err(e) = line.drain() {
        error!(station = %name, "tone drain failed: {}", e);
    }
    // `line` is released here on every path
}
