use chrono::{DateTime, Utc};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex as StdMutex};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot, Mutex as AsyncMutex, Notify};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use super::recognizer_config::RecognizerConfig;
use super::retry::RetryPolicy;
use super::state::{RecognitionMode, SessionState};
use super::stats::SessionStats;
use crate::audio::{SharedAudioSource, SourceClaim};
use crate::backend::{BackendConnection, BackendEvent, RecognitionBackend};
use crate::error::{Result, SessionError};
use crate::events::{
    CancelErrorCode, CancelReason, EventDispatcher, RecognitionEvent, RecognizedOutcome,
};

const FRAME_CHANNEL_CAPACITY: usize = 16;

/// Owns one recognition session at a time: binds an audio source to a
/// backend connection, runs the lifecycle state machine, and routes backend
/// events through the dispatcher.
///
/// Backend events arrive on the backend's own delivery context; every
/// state transition goes through a single guarded cell, so callers only
/// ever observe fully-applied states.
pub struct SessionController {
    config: RecognizerConfig,
    retry: RetryPolicy,
    shared: Arc<Shared>,
    active: AsyncMutex<Option<ActiveSession>>,
}

struct ActiveSession {
    feed: JoinHandle<()>,
    driver: JoinHandle<()>,
}

#[derive(Default)]
struct WaiterSlot {
    /// Terminal event for the current session, once produced
    terminal: Option<RecognitionEvent>,
    /// Pending `recognize_once` waiter, resolved exactly once
    tx: Option<oneshot::Sender<RecognitionEvent>>,
}

struct Shared {
    state: StdMutex<SessionState>,
    mode: StdMutex<Option<RecognitionMode>>,
    session_id: StdMutex<Option<String>>,
    started_at: StdMutex<Option<DateTime<Utc>>>,
    waiter: StdMutex<WaiterSlot>,
    /// Latched once a terminal event has been claimed for this session
    terminal: AtomicBool,
    /// Bumped per session; an interrupted start must not outlive its epoch
    epoch: AtomicU64,
    stop_flag: AtomicBool,
    stop_notify: Notify,
    cancel_notify: Notify,
    dispatcher: Arc<EventDispatcher>,
    frames_sent: AtomicUsize,
    events_dispatched: AtomicUsize,
    reconnects: AtomicUsize,
}

impl Shared {
    fn new(dispatcher: Arc<EventDispatcher>) -> Self {
        Self {
            state: StdMutex::new(SessionState::Idle),
            mode: StdMutex::new(None),
            session_id: StdMutex::new(None),
            started_at: StdMutex::new(None),
            waiter: StdMutex::new(WaiterSlot::default()),
            terminal: AtomicBool::new(false),
            epoch: AtomicU64::new(0),
            stop_flag: AtomicBool::new(false),
            stop_notify: Notify::new(),
            cancel_notify: Notify::new(),
            dispatcher,
            frames_sent: AtomicUsize::new(0),
            events_dispatched: AtomicUsize::new(0),
            reconnects: AtomicUsize::new(0),
        }
    }

    fn reset(&self, mode: RecognitionMode) -> u64 {
        self.terminal.store(false, Ordering::SeqCst);
        self.stop_flag.store(false, Ordering::SeqCst);
        *lock(&self.waiter) = WaiterSlot::default();
        *lock(&self.mode) = Some(mode);
        *lock(&self.session_id) = Some(uuid::Uuid::new_v4().to_string());
        *lock(&self.started_at) = Some(Utc::now());
        self.frames_sent.store(0, Ordering::SeqCst);
        self.events_dispatched.store(0, Ordering::SeqCst);
        self.reconnects.store(0, Ordering::SeqCst);
        self.epoch.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn state(&self) -> SessionState {
        *lock(&self.state)
    }

    fn set_state(&self, next: SessionState) {
        let mut state = lock(&self.state);
        if *state != next && !state.can_transition_to(next) {
            warn!(from = %*state, to = %next, "unexpected session state transition");
        }
        *state = next;
    }

    fn session_id(&self) -> String {
        lock(&self.session_id).clone().unwrap_or_default()
    }

    fn dispatch(&self, event: &RecognitionEvent) {
        self.dispatcher.dispatch(event);
        self.events_dispatched.fetch_add(1, Ordering::Relaxed);
    }

    fn stop_requested(&self) -> bool {
        self.stop_flag.load(Ordering::SeqCst)
    }

    fn request_stop(&self) {
        self.stop_flag.store(true, Ordering::SeqCst);
        self.stop_notify.notify_waiters();
    }

    /// Claim the terminal slot for this session and deliver `event`.
    /// Returns false if a terminal event was already claimed; nothing is
    /// delivered in that case.
    fn emit_terminal(&self, event: RecognitionEvent) -> bool {
        if self.terminal.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.dispatch(&event);
        self.resolve_waiter(event);
        true
    }

    /// Record the terminal event and release a pending `recognize_once`
    /// waiter, if any.
    fn resolve_waiter(&self, event: RecognitionEvent) {
        let mut slot = lock(&self.waiter);
        slot.terminal = Some(event.clone());
        if let Some(tx) = slot.tx.take() {
            let _ = tx.send(event);
        }
    }
}

impl SessionController {
    pub fn new(config: RecognizerConfig) -> Self {
        let dispatcher = Arc::new(EventDispatcher::new());
        Self {
            config,
            retry: RetryPolicy::default(),
            shared: Arc::new(Shared::new(Arc::clone(&dispatcher))),
            active: AsyncMutex::new(None),
        }
    }

    /// Override the reconnect policy for transient connection drops.
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Dispatcher for registering observers. Default observers are the
    /// caller's business; the controller registers none.
    pub fn dispatcher(&self) -> Arc<EventDispatcher> {
        Arc::clone(&self.shared.dispatcher)
    }

    pub fn state(&self) -> SessionState {
        self.shared.state()
    }

    pub fn stats(&self) -> SessionStats {
        SessionStats {
            state: self.shared.state(),
            session_id: lock(&self.shared.session_id).clone(),
            started_at: *lock(&self.shared.started_at),
            frames_sent: self.shared.frames_sent.load(Ordering::Relaxed),
            events_dispatched: self.shared.events_dispatched.load(Ordering::Relaxed),
            reconnects: self.shared.reconnects.load(Ordering::Relaxed),
        }
    }

    /// Start a recognition session. Valid only from `Idle`; claims the audio
    /// source (fail-fast if another session owns it), connects the backend,
    /// and on success emits `Connected` then `SessionStarted`.
    ///
    /// A `cancel` issued while the connection is still being established
    /// aborts the start: no `Connected` or `SessionStarted` is emitted and
    /// the call returns `SessionError::Canceled`.
    pub async fn start(
        &self,
        mode: RecognitionMode,
        source: &Arc<SharedAudioSource>,
        backend: Arc<dyn RecognitionBackend>,
    ) -> Result<()> {
        {
            let mut state = lock(&self.shared.state);
            if *state != SessionState::Idle {
                return Err(SessionError::InvalidState {
                    operation: "start",
                    state: *state,
                });
            }
            *state = SessionState::Starting;
        }
        self.reap().await;
        let epoch = self.shared.reset(mode);

        let result = self.start_inner(mode, source, backend, epoch).await;
        if let Err(err) = &result {
            // Cancellation has already settled the state machine itself.
            if !matches!(err, SessionError::Canceled(_)) {
                self.shared.set_state(SessionState::Idle);
            }
        }
        result
    }

    async fn start_inner(
        &self,
        mode: RecognitionMode,
        source: &Arc<SharedAudioSource>,
        backend: Arc<dyn RecognitionBackend>,
        epoch: u64,
    ) -> Result<()> {
        let session_id = self.shared.session_id();
        info!(%session_id, ?mode, source = source.name(), "starting recognition session");

        let claim = source.claim()?;
        claim.open().await?;

        // The connect future borrows `backend`; keep it scoped so the
        // borrow ends before the backend moves into the driver below.
        let mut conn = {
            let connect = backend.connect(&self.config);
            tokio::pin!(connect);
            tokio::select! {
                _ = self.shared.cancel_notify.notified() => {
                    let _ = claim.close().await;
                    return Err(SessionError::Canceled(
                        "session canceled before start completed".into(),
                    ));
                }
                result = &mut connect => result.map_err(|e| match e {
                    SessionError::Connection(_) => e,
                    other => SessionError::Connection(other.to_string()),
                })?,
            }
        };

        // Cancel (or a newer session) may have raced the connection
        // completing.
        if self.shared.terminal.load(Ordering::SeqCst)
            || self.shared.epoch.load(Ordering::SeqCst) != epoch
        {
            let _ = conn.disconnect().await;
            let _ = claim.close().await;
            return Err(SessionError::Canceled(
                "session canceled before start completed".into(),
            ));
        }

        let events = conn.take_events().ok_or_else(|| {
            SessionError::Backend("backend connection provided no event stream".into())
        })?;

        self.shared.set_state(SessionState::Active);
        self.shared.dispatch(&RecognitionEvent::Connected {
            session_id: session_id.clone(),
        });
        self.shared.dispatch(&RecognitionEvent::SessionStarted {
            session_id: session_id.clone(),
        });

        let (frame_tx, frame_rx) = mpsc::channel(FRAME_CHANNEL_CAPACITY);
        let feed = tokio::spawn(run_feed(Arc::clone(&self.shared), claim, frame_tx));

        let driver = Driver {
            shared: Arc::clone(&self.shared),
            backend,
            config: self.config.clone(),
            retry: self.retry.clone(),
            mode,
            session_id,
        };
        let driver = tokio::spawn(driver.run(conn, events, frame_rx));

        *self.active.lock().await = Some(ActiveSession { feed, driver });
        Ok(())
    }

    /// Convenience for `start(RecognitionMode::Continuous, ...)`.
    pub async fn start_continuous(
        &self,
        source: &Arc<SharedAudioSource>,
        backend: Arc<dyn RecognitionBackend>,
    ) -> Result<()> {
        self.start(RecognitionMode::Continuous, source, backend).await
    }

    /// Convenience for `start(RecognitionMode::SingleShot, ...)`.
    pub async fn start_single_shot(
        &self,
        source: &Arc<SharedAudioSource>,
        backend: Arc<dyn RecognitionBackend>,
    ) -> Result<()> {
        self.start(RecognitionMode::SingleShot, source, backend).await
    }

    /// Wait for the single terminal event of a single-shot session, then
    /// automatically stop it. Intermediate `Recognizing` events are still
    /// dispatched to observers while waiting; only the terminal event is
    /// returned.
    pub async fn recognize_once(&self) -> Result<RecognitionEvent> {
        self.recognize_once_inner(None).await
    }

    /// `recognize_once` with a caller-supplied deadline. If the deadline
    /// passes before a terminal event arrives the session is canceled and
    /// the resulting `Canceled` event is returned.
    pub async fn recognize_once_timeout(&self, timeout: Duration) -> Result<RecognitionEvent> {
        self.recognize_once_inner(Some(timeout)).await
    }

    async fn recognize_once_inner(&self, timeout: Option<Duration>) -> Result<RecognitionEvent> {
        if *lock(&self.shared.mode) != Some(RecognitionMode::SingleShot) {
            return Err(SessionError::InvalidState {
                operation: "recognize_once",
                state: self.state(),
            });
        }

        enum Wait {
            Ready(RecognitionEvent),
            Pending(oneshot::Receiver<RecognitionEvent>),
        }

        // A backend that fails fast may have settled the session to Idle
        // before the caller gets here; the latched terminal still resolves
        // the wait. Only an empty slot requires a live session.
        let wait = {
            let mut slot = lock(&self.shared.waiter);
            match slot.terminal.clone() {
                Some(event) => Wait::Ready(event),
                None => {
                    let state = self.state();
                    if state != SessionState::Active {
                        return Err(SessionError::InvalidState {
                            operation: "recognize_once",
                            state,
                        });
                    }
                    let (tx, rx) = oneshot::channel();
                    slot.tx = Some(tx);
                    Wait::Pending(rx)
                }
            }
        };

        let event = match wait {
            Wait::Ready(event) => event,
            Wait::Pending(rx) => match timeout {
                None => rx.await.map_err(|_| {
                    SessionError::Canceled("session ended without a terminal event".into())
                })?,
                Some(deadline) => match tokio::time::timeout(deadline, rx).await {
                    Ok(received) => received.map_err(|_| {
                        SessionError::Canceled("session ended without a terminal event".into())
                    })?,
                    Err(_) => {
                        warn!("recognize_once timed out, canceling session");
                        self.cancel().await?;
                        lock(&self.shared.waiter).terminal.clone().unwrap_or_else(|| {
                            RecognitionEvent::Canceled {
                                session_id: self.shared.session_id(),
                                reason: CancelReason::UserCancelled,
                                code: CancelErrorCode::NoError,
                                details: "recognize_once timed out".into(),
                            }
                        })
                    }
                },
            },
        };

        if matches!(event, RecognitionEvent::Recognized { .. }) {
            self.finish_single_shot().await;
        } else {
            self.reap().await;
        }
        Ok(event)
    }

    /// Stop a continuous session: drains the audio feed, releases the
    /// backend connection, emits `SessionStopped`, and returns to `Idle`.
    pub async fn stop(&self) -> Result<()> {
        if *lock(&self.shared.mode) != Some(RecognitionMode::Continuous) {
            return Err(SessionError::InvalidState {
                operation: "stop",
                state: self.state(),
            });
        }
        {
            let mut state = lock(&self.shared.state);
            match *state {
                SessionState::Active => *state = SessionState::Stopping,
                SessionState::Idle => {
                    warn!("stop requested but no session is active");
                    return Ok(());
                }
                other => {
                    return Err(SessionError::InvalidState {
                        operation: "stop",
                        state: other,
                    });
                }
            }
        }

        let session_id = self.shared.session_id();
        info!(%session_id, "stopping recognition session");

        // The session is ending on the caller's terms; suppress any late
        // backend terminal.
        self.shared.terminal.store(true, Ordering::SeqCst);
        self.shared.request_stop();
        self.reap().await;

        let event = RecognitionEvent::SessionStopped {
            session_id: session_id.clone(),
        };
        self.shared.dispatch(&event);
        self.shared.resolve_waiter(event);
        self.shared.set_state(SessionState::Idle);
        info!(%session_id, "recognition session stopped");
        Ok(())
    }

    /// Cancel the in-flight session, whatever phase it is in. Emits exactly
    /// one `Canceled(UserCancelled)` for the session; a second call (or a
    /// call after a terminal event) is a no-op.
    pub async fn cancel(&self) -> Result<()> {
        if self.state() == SessionState::Idle {
            return Ok(());
        }
        let first_terminal = !self.shared.terminal.swap(true, Ordering::SeqCst);

        let session_id = self.shared.session_id();
        info!(%session_id, "canceling recognition session");

        self.shared.set_state(SessionState::Canceled);
        self.shared.request_stop();
        self.shared.cancel_notify.notify_waiters();
        self.reap().await;

        if first_terminal {
            let event = RecognitionEvent::Canceled {
                session_id,
                reason: CancelReason::UserCancelled,
                code: CancelErrorCode::NoError,
                details: "canceled by caller".into(),
            };
            self.shared.dispatch(&event);
            self.shared.resolve_waiter(event);
        }
        self.shared.set_state(SessionState::Idle);
        Ok(())
    }

    /// Auto-stop after a single-shot terminal result. Only the call that
    /// actually winds the session down announces the stop; collecting an
    /// already-settled result dispatches nothing.
    async fn finish_single_shot(&self) {
        let was_active = {
            let mut state = lock(&self.shared.state);
            if *state == SessionState::Active {
                *state = SessionState::Stopping;
                true
            } else {
                false
            }
        };
        self.shared.request_stop();
        self.reap().await;

        if was_active {
            self.shared.dispatch(&RecognitionEvent::SessionStopped {
                session_id: self.shared.session_id(),
            });
        }
        self.shared.set_state(SessionState::Idle);
    }

    /// Join any finished (or stopping) session tasks.
    async fn reap(&self) {
        if let Some(active) = self.active.lock().await.take() {
            if let Err(e) = active.feed.await {
                error!("audio feed task panicked: {}", e);
            }
            if let Err(e) = active.driver.await {
                error!("driver task panicked: {}", e);
            }
        }
    }
}

/// Reads frames from the claimed source into the frame channel until the
/// source ends or a stop is requested, then closes the source.
async fn run_feed(
    shared: Arc<Shared>,
    claim: SourceClaim,
    frame_tx: mpsc::Sender<crate::audio::AudioFrame>,
) {
    debug!("audio feed task started");
    loop {
        if shared.stop_requested() {
            break;
        }
        tokio::select! {
            _ = shared.stop_notify.notified() => break,
            frame = claim.read_frame() => match frame {
                Ok(Some(frame)) => {
                    if frame_tx.send(frame).await.is_err() {
                        break;
                    }
                }
                Ok(None) => {
                    debug!("audio source reached end of stream");
                    break;
                }
                Err(e) => {
                    warn!("audio source read failed: {}", e);
                    break;
                }
            }
        }
    }
    if let Err(e) = claim.close().await {
        warn!("failed to close audio source: {}", e);
    }
    debug!("audio feed task stopped");
}

enum Flow {
    Continue,
    Reconnect,
    Terminal,
}

/// Pumps frames into the backend connection and backend events through the
/// dispatcher, reconnecting across transient drops in continuous mode.
struct Driver {
    shared: Arc<Shared>,
    backend: Arc<dyn RecognitionBackend>,
    config: RecognizerConfig,
    retry: RetryPolicy,
    mode: RecognitionMode,
    session_id: String,
}

impl Driver {
    async fn run(
        self,
        mut conn: Box<dyn BackendConnection>,
        mut events: mpsc::UnboundedReceiver<BackendEvent>,
        mut frame_rx: mpsc::Receiver<crate::audio::AudioFrame>,
    ) {
        debug!(session_id = %self.session_id, "session driver started");
        let mut frames_open = true;
        'session: loop {
            if self.shared.stop_requested() {
                break;
            }
            tokio::select! {
                _ = self.shared.stop_notify.notified() => break 'session,
                frame = frame_rx.recv(), if frames_open => match frame {
                    Some(frame) => {
                        if let Err(e) = conn.send(frame).await {
                            warn!("failed to push audio frame to backend: {}", e);
                        } else {
                            self.shared.frames_sent.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                    // Source drained; keep pumping backend events.
                    None => frames_open = false,
                },
                event = events.recv() => {
                    // A closed event stream without a preceding terminal is a drop.
                    let event = event.unwrap_or(BackendEvent::Disconnected { transient: true });
                    match self.handle_event(event) {
                        Flow::Continue => {}
                        Flow::Terminal => break 'session,
                        Flow::Reconnect => match self.reconnect(&mut conn).await {
                            Some(new_events) => events = new_events,
                            None => break 'session,
                        },
                    }
                }
            }
        }
        if let Err(e) = conn.disconnect().await {
            debug!("backend disconnect failed: {}", e);
        }
        debug!(session_id = %self.session_id, "session driver stopped");
    }

    fn handle_event(&self, event: BackendEvent) -> Flow {
        let session_id = self.session_id.clone();
        match event {
            BackendEvent::Recognizing(hypothesis) => {
                self.shared.dispatch(&RecognitionEvent::Recognizing {
                    session_id,
                    hypothesis,
                });
                Flow::Continue
            }
            BackendEvent::Recognized(hypothesis) => {
                self.finalize(RecognizedOutcome::Phrase(hypothesis))
            }
            BackendEvent::NoMatch(reason) => self.finalize(RecognizedOutcome::NoMatch(reason)),
            BackendEvent::SpeechStart { offset } => {
                self.shared
                    .dispatch(&RecognitionEvent::SpeechStart { session_id, offset });
                Flow::Continue
            }
            BackendEvent::SpeechEnd { offset } => {
                self.shared
                    .dispatch(&RecognitionEvent::SpeechEnd { session_id, offset });
                Flow::Continue
            }
            BackendEvent::Canceled { code, details } => {
                warn!(%session_id, ?code, "backend canceled the session: {}", details);
                self.shared.emit_terminal(RecognitionEvent::Canceled {
                    session_id,
                    reason: CancelReason::Error,
                    code,
                    details,
                });
                self.shared.request_stop();
                self.shared.set_state(SessionState::Canceled);
                self.shared.set_state(SessionState::Idle);
                Flow::Terminal
            }
            BackendEvent::SessionStopped => {
                match self.mode {
                    RecognitionMode::SingleShot => {
                        // Backend ended the session before producing a result.
                        self.shared.emit_terminal(RecognitionEvent::Canceled {
                            session_id: session_id.clone(),
                            reason: CancelReason::EndOfStream,
                            code: CancelErrorCode::NoError,
                            details: "audio stream ended before a result was produced".into(),
                        });
                        self.shared
                            .dispatch(&RecognitionEvent::SessionStopped { session_id });
                    }
                    RecognitionMode::Continuous => {
                        self.shared
                            .emit_terminal(RecognitionEvent::SessionStopped { session_id });
                    }
                }
                self.shared.request_stop();
                self.shared.set_state(SessionState::Stopping);
                self.shared.set_state(SessionState::Idle);
                Flow::Terminal
            }
            BackendEvent::Disconnected { transient } => {
                if transient && self.mode == RecognitionMode::Continuous {
                    Flow::Reconnect
                } else {
                    self.shared.emit_terminal(RecognitionEvent::Canceled {
                        session_id,
                        reason: CancelReason::Error,
                        code: CancelErrorCode::ConnectionFailure,
                        details: "backend connection lost".into(),
                    });
                    self.shared.request_stop();
                    self.shared.set_state(SessionState::Canceled);
                    self.shared.set_state(SessionState::Idle);
                    Flow::Terminal
                }
            }
        }
    }

    fn finalize(&self, outcome: RecognizedOutcome) -> Flow {
        let event = RecognitionEvent::Recognized {
            session_id: self.session_id.clone(),
            outcome,
        };
        match self.mode {
            RecognitionMode::SingleShot => {
                // Terminal for the session; `recognize_once` performs the
                // auto-stop once it has collected the event.
                self.shared.emit_terminal(event);
                self.shared.request_stop();
                Flow::Terminal
            }
            RecognitionMode::Continuous => {
                self.shared.dispatch(&event);
                Flow::Continue
            }
        }
    }

    /// Bounded-backoff reconnect after a transient drop. Returns the new
    /// event stream, or None when stopping or after emitting the fatal
    /// `Canceled`.
    async fn reconnect(
        &self,
        conn: &mut Box<dyn BackendConnection>,
    ) -> Option<mpsc::UnboundedReceiver<BackendEvent>> {
        warn!(session_id = %self.session_id, "backend connection dropped, attempting reconnect");
        self.shared.dispatch(&RecognitionEvent::Disconnected {
            session_id: self.session_id.clone(),
        });
        if let Err(e) = conn.disconnect().await {
            debug!("disconnect after drop failed: {}", e);
        }

        for attempt in 0..self.retry.max_attempts {
            if self.shared.stop_requested() {
                return None;
            }
            let delay = self.retry.delay_for_attempt(attempt);
            if !delay.is_zero() {
                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.shared.stop_notify.notified() => return None,
                }
            }
            match self.backend.connect(&self.config).await {
                Ok(mut new_conn) => {
                    let Some(events) = new_conn.take_events() else {
                        warn!(attempt, "reconnected but backend provided no event stream");
                        continue;
                    };
                    *conn = new_conn;
                    self.shared.reconnects.fetch_add(1, Ordering::Relaxed);
                    info!(attempt, session_id = %self.session_id, "reconnected to recognition backend");
                    self.shared.dispatch(&RecognitionEvent::Connected {
                        session_id: self.session_id.clone(),
                    });
                    return Some(events);
                }
                Err(e) => {
                    warn!(attempt, "reconnect attempt failed: {}", e);
                }
            }
        }

        error!(session_id = %self.session_id, "reconnect attempts exhausted");
        self.shared.emit_terminal(RecognitionEvent::Canceled {
            session_id: self.session_id.clone(),
            reason: CancelReason::Error,
            code: CancelErrorCode::ConnectionFailure,
            details: format!(
                "connection lost and {} reconnect attempts failed",
                self.retry.max_attempts
            ),
        });
        self.shared.request_stop();
        self.shared.set_state(SessionState::Canceled);
        self.shared.set_state(SessionState::Idle);
        None
    }
}

// A poisoned guard means a panic mid-update elsewhere; the state cell is a
// plain value, safe to keep using.
fn lock<T>(mutex: &StdMutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|e| e.into_inner())
}
