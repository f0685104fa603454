//! Error types for session control.

use thiserror::Error;

use crate::session::SessionState;

/// Errors surfaced by the session controller and its collaborators.
///
/// Mid-session recognition failures are not represented here: the backend
/// reports them as a terminal `Canceled` event, which is an expected outcome
/// of a live streaming operation rather than an error return.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Bad credentials or proxy parameters. Raised at the setter, never
    /// deferred to connection time.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Backend unreachable or rejected the connection during `start`.
    #[error("connection failed: {0}")]
    Connection(String),

    /// Operation invoked in a state that forbids it.
    #[error("invalid state for {operation}: session is {state}")]
    InvalidState {
        operation: &'static str,
        state: SessionState,
    },

    /// Audio source or backend connection already owned by an active session.
    #[error("resource busy: {0}")]
    ResourceBusy(String),

    /// The session was canceled before the operation could complete.
    #[error("canceled: {0}")]
    Canceled(String),

    /// Transport-level backend failure (send or disconnect).
    #[error("backend error: {0}")]
    Backend(String),

    /// Audio source failure (open, read, or close).
    #[error("audio source error: {0}")]
    Audio(String),
}

pub type Result<T> = std::result::Result<T, SessionError>;
