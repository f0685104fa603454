//! Recognition session management
//!
//! This module provides the `SessionController` abstraction that manages:
//! - The session lifecycle state machine (idle/starting/active/stopping/canceled)
//! - Pumping audio frames from a claimed source into the backend
//! - Ordered delivery of backend events through the dispatcher
//! - Cancellation, single-shot waits, and transient-drop reconnection

mod controller;
mod recognizer_config;
mod retry;
mod state;
mod stats;

pub use controller::SessionController;
pub use recognizer_config::{Authorization, ProxyConfig, RecognizerConfig};
pub use retry::RetryPolicy;
pub use state::{RecognitionMode, SessionState};
pub use stats::SessionStats;
