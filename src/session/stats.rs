use chrono::{DateTime, Utc};
use serde::Serialize;

use super::state::SessionState;

/// Snapshot of a controller's current session.
#[derive(Debug, Clone, Serialize)]
pub struct SessionStats {
    /// Current lifecycle state
    pub state: SessionState,

    /// Identifier of the current (or most recent) session
    pub session_id: Option<String>,

    /// When the current session started
    pub started_at: Option<DateTime<Utc>>,

    /// Audio frames pushed to the backend so far
    pub frames_sent: usize,

    /// Events delivered through the dispatcher
    pub events_dispatched: usize,

    /// Successful reconnects after transient drops
    pub reconnects: usize,
}
