//! Recognition backend contract
//!
//! The recognition service is an opaque collaborator: it accepts audio
//! frames and asynchronously emits recognition events on its own delivery
//! context. The acoustic model and wire protocol live behind this trait.

pub mod scripted;

use std::time::Duration;
use tokio::sync::mpsc;

use crate::audio::AudioFrame;
use crate::error::Result;
use crate::events::{CancelErrorCode, Hypothesis, NoMatchReason};
use crate::session::RecognizerConfig;

pub use scripted::{ConnectionScript, ScriptedBackend};

/// Raw event stream from a backend connection. The session controller maps
/// these onto `RecognitionEvent`s, adding session identity and connection
/// bookkeeping.
#[derive(Debug, Clone)]
pub enum BackendEvent {
    /// Partial, revisable hypothesis
    Recognizing(Hypothesis),
    /// Final phrase for the current utterance
    Recognized(Hypothesis),
    /// Explicit no-match outcome, not an error
    NoMatch(NoMatchReason),
    /// Backend-initiated cancellation (terminal)
    Canceled {
        code: CancelErrorCode,
        details: String,
    },
    SpeechStart { offset: Duration },
    SpeechEnd { offset: Duration },
    /// Backend closed the session normally (terminal)
    SessionStopped,
    /// Connection dropped; `transient` drops are eligible for reconnection
    Disconnected { transient: bool },
}

/// One live connection to the recognition service.
///
/// The event receiver may be taken exactly once; the connection owns the
/// sending half and closes it on disconnect.
#[async_trait::async_trait]
pub trait BackendConnection: Send {
    /// Push one audio frame into the recognition stream.
    async fn send(&mut self, frame: AudioFrame) -> Result<()>;

    /// Take the asynchronous event stream for this connection.
    fn take_events(&mut self) -> Option<mpsc::UnboundedReceiver<BackendEvent>>;

    /// Close the connection and release service resources.
    async fn disconnect(&mut self) -> Result<()>;
}

/// Factory for backend connections. A backend may be asked to connect more
/// than once per session when the controller reconnects after a transient
/// drop.
#[async_trait::async_trait]
pub trait RecognitionBackend: Send + Sync {
    async fn connect(&self, config: &RecognizerConfig) -> Result<Box<dyn BackendConnection>>;
}
