use serde::Serialize;
use std::time::Duration;

/// Delivery category for an event. Each category has its own ordered
/// observer list and its own ordering guarantee.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum EventCategory {
    /// Backend connection established or lost
    Connection,
    /// Session lifecycle and speech-activity boundaries
    Session,
    /// Partial (revisable) hypotheses
    Recognizing,
    /// Final results, including explicit no-match
    Recognized,
    /// Terminal cancellation
    Canceled,
}

/// A provisional or final recognition hypothesis.
#[derive(Debug, Clone, Serialize)]
pub struct Hypothesis {
    /// Recognized text
    pub text: String,
    /// Offset of the audio this hypothesis covers, from session start
    pub offset: Duration,
    /// Duration of the audio this hypothesis covers
    pub duration: Duration,
    /// Backend-reported result latency, if available
    pub latency: Option<Duration>,
}

/// Why a final result carried no recognized phrase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NoMatchReason {
    NotRecognized,
    InitialSilenceTimeout,
    BabbleTimeout,
}

/// Outcome of a final recognition: either a phrase or an explicit no-match.
/// A no-match is a distinct result, not an error.
#[derive(Debug, Clone, Serialize)]
pub enum RecognizedOutcome {
    Phrase(Hypothesis),
    NoMatch(NoMatchReason),
}

/// Why a session was canceled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CancelReason {
    /// Caller invoked `cancel()` or a `recognize_once` timeout fired
    UserCancelled,
    /// The audio source ran out in single-shot mode before any result
    EndOfStream,
    /// Backend-reported error
    Error,
}

/// Service error codes carried by a `Canceled` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum CancelErrorCode {
    NoError,
    AuthenticationFailure,
    BadRequest,
    TooManyRequests,
    Forbidden,
    ConnectionFailure,
    ServiceTimeout,
    ServiceError,
    ServiceUnavailable,
    RuntimeError,
}

/// A typed event emitted by a recognition session.
///
/// Events are immutable once constructed. Ownership passes to the dispatcher
/// on emission; observers see a shared reference for the duration of their
/// callback only.
#[derive(Debug, Clone, Serialize)]
pub enum RecognitionEvent {
    Connected {
        session_id: String,
    },
    Disconnected {
        session_id: String,
    },
    SessionStarted {
        session_id: String,
    },
    SessionStopped {
        session_id: String,
    },
    SpeechStart {
        session_id: String,
        offset: Duration,
    },
    SpeechEnd {
        session_id: String,
        offset: Duration,
    },
    Recognizing {
        session_id: String,
        hypothesis: Hypothesis,
    },
    Recognized {
        session_id: String,
        outcome: RecognizedOutcome,
    },
    Canceled {
        session_id: String,
        reason: CancelReason,
        code: CancelErrorCode,
        details: String,
    },
}

impl RecognitionEvent {
    /// Delivery category for this event. Speech-activity boundaries ride the
    /// session category so they stay ordered with lifecycle events.
    pub fn category(&self) -> EventCategory {
        match self {
            RecognitionEvent::Connected { .. } | RecognitionEvent::Disconnected { .. } => {
                EventCategory::Connection
            }
            RecognitionEvent::SessionStarted { .. }
            | RecognitionEvent::SessionStopped { .. }
            | RecognitionEvent::SpeechStart { .. }
            | RecognitionEvent::SpeechEnd { .. } => EventCategory::Session,
            RecognitionEvent::Recognizing { .. } => EventCategory::Recognizing,
            RecognitionEvent::Recognized { .. } => EventCategory::Recognized,
            RecognitionEvent::Canceled { .. } => EventCategory::Canceled,
        }
    }

    /// Session this event belongs to.
    pub fn session_id(&self) -> &str {
        match self {
            RecognitionEvent::Connected { session_id }
            | RecognitionEvent::Disconnected { session_id }
            | RecognitionEvent::SessionStarted { session_id }
            | RecognitionEvent::SessionStopped { session_id }
            | RecognitionEvent::SpeechStart { session_id, .. }
            | RecognitionEvent::SpeechEnd { session_id, .. }
            | RecognitionEvent::Recognizing { session_id, .. }
            | RecognitionEvent::Recognized { session_id, .. }
            | RecognitionEvent::Canceled { session_id, .. } => session_id,
        }
    }

    /// True for events after which the current session cannot continue.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            RecognitionEvent::Recognized { .. }
                | RecognitionEvent::Canceled { .. }
                | RecognitionEvent::SessionStopped { .. }
        )
    }
}
