pub mod audio;
pub mod backend;
pub mod config;
pub mod error;
pub mod events;
pub mod session;

pub use audio::{
    AudioFrame, AudioSource, BufferSource, FileReadMode, SharedAudioSource, SilenceSource,
    SourceClaim, WavFileSource,
};
pub use backend::{
    BackendConnection, BackendEvent, ConnectionScript, RecognitionBackend, ScriptedBackend,
};
pub use config::Config;
pub use error::SessionError;
pub use events::{
    CancelErrorCode, CancelReason, EventCategory, EventDispatcher, Hypothesis, NoMatchReason,
    RecognitionEvent, RecognizedOutcome, SubscriptionHandle,
};
pub use session::{
    Authorization, ProxyConfig, RecognitionMode, RecognizerConfig, RetryPolicy, SessionController,
    SessionState, SessionStats,
};
