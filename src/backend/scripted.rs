//! Deterministic backend double driven by per-connection scripts.
//!
//! Each successful `connect` consumes the next `ConnectionScript`; its steps
//! fire once the connection has received the configured number of frames.
//! No audio is interpreted. Used by the integration tests and the demo
//! binary.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::debug;

use super::{BackendConnection, BackendEvent, RecognitionBackend};
use crate::audio::AudioFrame;
use crate::error::{Result, SessionError};
use crate::session::RecognizerConfig;

struct ScriptStep {
    after_frames: u64,
    event: BackendEvent,
}

/// Ordered event script for one backend connection.
#[derive(Default)]
pub struct ConnectionScript {
    steps: Vec<ScriptStep>,
}

impl ConnectionScript {
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit `event` once the connection has received `after_frames` frames.
    /// A threshold of zero fires as soon as the connection is established.
    pub fn emit_after(mut self, after_frames: u64, event: BackendEvent) -> Self {
        self.steps.push(ScriptStep {
            after_frames,
            event,
        });
        self
    }
}

/// Scripted implementation of `RecognitionBackend`.
pub struct ScriptedBackend {
    scripts: Mutex<VecDeque<ConnectionScript>>,
    reject_below: AtomicUsize,
    reject_from: AtomicUsize,
    connect_attempts: AtomicUsize,
    connect_delay: Duration,
}

impl ScriptedBackend {
    pub fn new(scripts: Vec<ConnectionScript>) -> Self {
        Self {
            scripts: Mutex::new(scripts.into()),
            reject_below: AtomicUsize::new(0),
            reject_from: AtomicUsize::new(usize::MAX),
            connect_attempts: AtomicUsize::new(0),
            connect_delay: Duration::ZERO,
        }
    }

    /// Reject the first `count` connection attempts with a connection error.
    pub fn reject_first_connects(mut self, count: usize) -> Self {
        self.reject_below = AtomicUsize::new(count);
        self
    }

    /// Reject every connection attempt from index `from` onward (0-indexed).
    pub fn reject_connects_from(mut self, from: usize) -> Self {
        self.reject_from = AtomicUsize::new(from);
        self
    }

    /// Delay every `connect` call, to widen the `Starting` window.
    pub fn with_connect_delay(mut self, delay: Duration) -> Self {
        self.connect_delay = delay;
        self
    }

    /// Total `connect` calls observed, successful or not.
    pub fn connect_attempts(&self) -> usize {
        self.connect_attempts.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl RecognitionBackend for ScriptedBackend {
    async fn connect(&self, _config: &RecognizerConfig) -> Result<Box<dyn BackendConnection>> {
        let attempt = self.connect_attempts.fetch_add(1, Ordering::SeqCst);
        if !self.connect_delay.is_zero() {
            tokio::time::sleep(self.connect_delay).await;
        }
        if attempt < self.reject_below.load(Ordering::SeqCst)
            || attempt >= self.reject_from.load(Ordering::SeqCst)
        {
            return Err(SessionError::Connection(format!(
                "scripted backend rejected connect attempt {}",
                attempt + 1
            )));
        }

        let script = self
            .scripts
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .pop_front()
            .unwrap_or_default();

        let (tx, rx) = mpsc::unbounded_channel();
        let mut pending = script.steps;
        pending.sort_by_key(|s| s.after_frames);

        // Zero-threshold steps fire without waiting for audio.
        let mut connection = ScriptedConnection {
            tx: Some(tx),
            pending: pending.into(),
            frames_received: 0,
            events: Some(rx),
        };
        connection.fire_due();
        Ok(Box::new(connection))
    }
}

struct ScriptedConnection {
    tx: Option<mpsc::UnboundedSender<BackendEvent>>,
    pending: VecDeque<ScriptStep>,
    frames_received: u64,
    events: Option<mpsc::UnboundedReceiver<BackendEvent>>,
}

impl ScriptedConnection {
    fn fire_due(&mut self) {
        while self
            .pending
            .front()
            .map_or(false, |step| step.after_frames <= self.frames_received)
        {
            if let Some(step) = self.pending.pop_front() {
                if let Some(tx) = &self.tx {
                    debug!(frames = self.frames_received, "scripted backend firing event");
                    let _ = tx.send(step.event);
                }
            }
        }
    }
}

#[async_trait::async_trait]
impl BackendConnection for ScriptedConnection {
    async fn send(&mut self, _frame: AudioFrame) -> Result<()> {
        if self.tx.is_none() {
            return Err(SessionError::Backend(
                "send on a disconnected scripted connection".into(),
            ));
        }
        self.frames_received += 1;
        self.fire_due();
        Ok(())
    }

    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<BackendEvent>> {
        self.events.take()
    }

    async fn disconnect(&mut self) -> Result<()> {
        self.tx = None;
        Ok(())
    }
}
