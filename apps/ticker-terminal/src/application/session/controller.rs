//! Session Controller
//!
//! Binds one feed client, sample channel, price history and renderer to one
//! interactive session.
//!
//! # Lifecycle
//!
//! 1. [`SessionController::spawn`] allocates the sample channel, derives the
//!    session scope from the host's termination token, and starts the feed
//!    client on a child of that scope.
//! 2. The consumption loop keeps exactly one receive outstanding, driving
//!    [`transition`] with samples, host input and end-of-stream.
//! 3. When the loop ends for any reason the scope is cancelled, which stops
//!    the feed client and its keepalive. On cancellation the loop stops
//!    reading host input but waits for the sample channel to close, then
//!    publishes the stream-closed status. The session is then removed from
//!    the registry.
//!
//! Frames are published through a `watch` channel; the host always sees the
//! latest one and may skip intermediate frames.

use std::ops::ControlFlow;
use std::sync::Arc;

use chrono::Local;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::Instrument;

use super::registry::{SessionId, SessionRegistry};
use crate::application::render::{DisplayConfig, Renderer};
use crate::domain::history::{DEFAULT_HISTORY_CAPACITY, HistorySnapshot, PriceHistory};
use crate::domain::session::{
    Key, STREAM_CLOSED_STATUS, SessionCommand, SessionEvent, SessionState, Viewport, transition,
};
use crate::infrastructure::config::{FeedSettings, TerminalConfig};
use crate::infrastructure::feed::channel::DEFAULT_QUEUE_CAPACITY;
use crate::infrastructure::feed::{
    FeedState, SampleReceiver, StreamClient, StreamClientConfig, sample_channel,
};

/// Buffered host inputs per session.
const INPUT_BUFFER: usize = 32;

// =============================================================================
// Configuration
// =============================================================================

/// Settings shared by every session a host opens.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    /// Upstream feed settings.
    pub feed: FeedSettings,
    /// Sample channel capacity.
    pub queue_capacity: usize,
    /// Price history capacity.
    pub history_capacity: usize,
    /// Presentation settings.
    pub display: DisplayConfig,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            feed: FeedSettings::default(),
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            display: DisplayConfig::default(),
        }
    }
}

impl SessionConfig {
    /// Derive session settings from the process configuration.
    #[must_use]
    pub fn from_terminal_config(config: &TerminalConfig) -> Self {
        Self {
            feed: config.feed.clone(),
            queue_capacity: config.session.queue_capacity,
            history_capacity: config.session.history_capacity,
            display: DisplayConfig::with_czk_rate(config.display.czk_rate),
        }
    }
}

// =============================================================================
// Host Interface
// =============================================================================

/// Input forwarded by the terminal host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HostInput {
    /// The terminal was resized.
    Resize(Viewport),
    /// A key was pressed.
    Key(Key),
}

/// A rendered frame and the geometry it was rendered for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Display text; lines separated by `\n`.
    pub content: String,
    /// Viewport at render time.
    pub viewport: Viewport,
}

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionExit {
    /// The user pressed a quit key.
    Quit,
    /// The host or process ended the session.
    Terminated,
}

/// Host-side handle to a running session.
#[derive(Debug)]
pub struct SessionHandle {
    id: SessionId,
    input: mpsc::Sender<HostInput>,
    frames: watch::Receiver<Frame>,
    scope: CancellationToken,
    feed: Arc<FeedState>,
    task: JoinHandle<SessionExit>,
}

impl SessionHandle {
    /// Session identifier.
    #[must_use]
    pub const fn id(&self) -> SessionId {
        self.id
    }

    /// Forward an input. Returns `false` once the session has ended.
    pub async fn send(&self, input: HostInput) -> bool {
        self.input.send(input).await.is_ok()
    }

    /// A sender for forwarding inputs from another task.
    #[must_use]
    pub fn input(&self) -> mpsc::Sender<HostInput> {
        self.input.clone()
    }

    /// Subscribe to rendered frames.
    #[must_use]
    pub fn frames(&self) -> watch::Receiver<Frame> {
        self.frames.clone()
    }

    /// The session's upstream feed state.
    #[must_use]
    pub fn feed_state(&self) -> Arc<FeedState> {
        Arc::clone(&self.feed)
    }

    /// End the session from the host side.
    pub fn terminate(&self) {
        self.scope.cancel();
    }

    /// Wait for the session to finish.
    pub async fn join(self) -> SessionExit {
        match self.task.await {
            Ok(exit) => exit,
            Err(e) => {
                tracing::error!(session_id = %self.id, error = %e, "Session task failed");
                SessionExit::Terminated
            }
        }
    }
}

// =============================================================================
// Controller
// =============================================================================

/// Per-session consumption loop.
pub struct SessionController {
    state: SessionState,
    awaiting_sample: bool,
    history: PriceHistory,
    renderer: Renderer,
    samples: SampleReceiver,
    input: mpsc::Receiver<HostInput>,
    frames: watch::Sender<Frame>,
    scope: CancellationToken,
}

enum Wake {
    Cancelled,
    Input(Option<HostInput>),
    Sample(Option<f64>),
}

impl SessionController {
    /// Start a session and its feed client.
    ///
    /// The session ends when the user quits, when [`SessionHandle::terminate`]
    /// is called, or when `termination` is cancelled.
    #[must_use]
    pub fn spawn(
        config: &SessionConfig,
        viewport: Viewport,
        termination: &CancellationToken,
        registry: Arc<SessionRegistry>,
        peer: Option<String>,
    ) -> SessionHandle {
        let id = SessionId::new();
        let span = tracing::info_span!("session", session_id = %id);

        let scope = termination.child_token();
        let (sample_tx, sample_rx) = sample_channel(config.queue_capacity);
        let feed = Arc::new(FeedState::new());

        let client = StreamClient::new(
            StreamClientConfig::from_feed_settings(&config.feed),
            sample_tx,
            scope.child_token(),
            Arc::clone(&feed),
        );
        tokio::spawn(
            async move {
                if let Err(e) = client.run().await {
                    tracing::error!(error = %e, "Feed client stopped");
                }
            }
            .instrument(span.clone()),
        );

        registry.register(id, peer.clone(), Arc::clone(&feed));

        let renderer = Renderer::new(config.display.clone());
        let initial = Frame {
            content: renderer.config().connecting.clone(),
            viewport,
        };
        let (frames_tx, frames_rx) = watch::channel(initial);
        let (input_tx, input_rx) = mpsc::channel(INPUT_BUFFER);

        let controller = Self {
            state: SessionState::new(viewport),
            awaiting_sample: false,
            history: PriceHistory::with_capacity(config.history_capacity),
            renderer,
            samples: sample_rx,
            input: input_rx,
            frames: frames_tx,
            scope: scope.clone(),
        };

        let task = tokio::spawn(
            async move {
                tracing::info!(
                    peer = peer.as_deref().unwrap_or("-"),
                    width = viewport.width,
                    height = viewport.height,
                    "Session started"
                );
                let exit = controller.run().await;
                registry.deregister(id);
                tracing::info!(?exit, "Session ended");
                exit
            }
            .instrument(span),
        );

        SessionHandle {
            id,
            input: input_tx,
            frames: frames_rx,
            scope,
            feed,
            task,
        }
    }

    async fn run(mut self) -> SessionExit {
        let _cancel_on_exit = self.scope.clone().drop_guard();

        if let ControlFlow::Break(exit) = self.apply(SessionState::init()) {
            return exit;
        }

        loop {
            let wake = tokio::select! {
                biased;
                () = self.scope.cancelled() => Wake::Cancelled,
                input = self.input.recv() => Wake::Input(input),
                sample = self.samples.recv(), if self.awaiting_sample => Wake::Sample(sample),
            };

            let event = match wake {
                Wake::Cancelled | Wake::Input(None) => return self.wind_down().await,
                Wake::Input(Some(HostInput::Resize(viewport))) => SessionEvent::Resize(viewport),
                Wake::Input(Some(HostInput::Key(key))) => SessionEvent::KeyPress(key),
                Wake::Sample(sample) => {
                    self.awaiting_sample = false;
                    sample.map_or(SessionEvent::StreamEnded, SessionEvent::SampleReceived)
                }
            };

            if let ControlFlow::Break(exit) = self.step(event) {
                return exit;
            }
        }
    }

    /// Finish a cancelled session: host input is no longer read, but the
    /// outstanding receive completes once the feed client drops its sender,
    /// so the stream-closed status is still published.
    async fn wind_down(&mut self) -> SessionExit {
        self.scope.cancel();

        if self.awaiting_sample {
            let mut discarded = 0_usize;
            while self.samples.recv().await.is_some() {
                discarded += 1;
            }
            self.awaiting_sample = false;
            tracing::debug!(discarded, "Samples discarded after cancellation");
            let _ = self.step(SessionEvent::StreamEnded);
        }

        SessionExit::Terminated
    }

    fn step(&mut self, event: SessionEvent) -> ControlFlow<SessionExit> {
        let (next, commands) = transition(self.state, event);
        if next.is_stream_closed() && !self.state.is_stream_closed() {
            tracing::info!(samples = self.history.len(), "Sample stream closed");
        }
        self.state = next;
        self.apply(commands)
    }

    fn apply(&mut self, commands: Vec<SessionCommand>) -> ControlFlow<SessionExit> {
        for command in commands {
            match command {
                SessionCommand::Append(value) => self.history.append(value),
                SessionCommand::Render => self.publish(),
                SessionCommand::AwaitSample => self.awaiting_sample = true,
                SessionCommand::Quit => return ControlFlow::Break(SessionExit::Quit),
            }
        }
        ControlFlow::Continue(())
    }

    fn publish(&self) {
        let content = if self.state.is_stream_closed() {
            self.renderer.render_status(STREAM_CLOSED_STATUS)
        } else {
            let snapshot: HistorySnapshot = self.history.snapshot();
            self.renderer.render(
                &snapshot,
                self.state.viewport,
                self.state.show_help,
                Local::now().time(),
            )
        };

        self.frames.send_replace(Frame {
            content,
            viewport: self.state.viewport,
        });
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;

    /// Feed settings pointing at a closed local port.
    fn unreachable_feed() -> FeedSettings {
        FeedSettings {
            url: "ws://127.0.0.1:9/ws".to_string(),
            ..FeedSettings::default()
        }
    }

    fn config(feed: FeedSettings) -> SessionConfig {
        SessionConfig {
            feed,
            ..SessionConfig::default()
        }
    }

    async fn wait_for<F>(frames: &mut watch::Receiver<Frame>, predicate: F) -> Frame
    where
        F: Fn(&Frame) -> bool,
    {
        tokio::time::timeout(Duration::from_secs(5), async {
            loop {
                {
                    let frame = frames.borrow_and_update();
                    if predicate(&frame) {
                        return Frame::clone(&frame);
                    }
                }
                frames.changed().await.unwrap();
            }
        })
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn quit_key_ends_session() {
        let registry = Arc::new(SessionRegistry::new());
        let termination = CancellationToken::new();
        let handle = SessionController::spawn(
            &config(unreachable_feed()),
            Viewport::default(),
            &termination,
            Arc::clone(&registry),
            None,
        );
        assert_eq!(registry.active(), 1);

        assert!(handle.send(HostInput::Key(Key::Quit)).await);
        assert_eq!(handle.join().await, SessionExit::Quit);
        assert_eq!(registry.active(), 0);
    }

    #[tokio::test]
    async fn termination_token_ends_session() {
        let registry = Arc::new(SessionRegistry::new());
        let termination = CancellationToken::new();
        let handle = SessionController::spawn(
            &config(unreachable_feed()),
            Viewport::default(),
            &termination,
            Arc::clone(&registry),
            Some("peer".to_string()),
        );

        termination.cancel();
        assert_eq!(handle.join().await, SessionExit::Terminated);
        assert_eq!(registry.active(), 0);
    }

    #[tokio::test]
    async fn cancellation_surfaces_stream_closed() {
        let termination = CancellationToken::new();
        let handle = SessionController::spawn(
            &config(unreachable_feed()),
            Viewport::default(),
            &termination,
            Arc::new(SessionRegistry::new()),
            None,
        );
        let frames = handle.frames();

        termination.cancel();
        let exit = tokio::time::timeout(Duration::from_secs(5), handle.join())
            .await
            .unwrap();
        assert_eq!(exit, SessionExit::Terminated);
        assert_eq!(frames.borrow().content, "stream closed\n\nPress q to quit.");
    }

    #[tokio::test]
    async fn host_terminate_surfaces_stream_closed() {
        let termination = CancellationToken::new();
        let handle = SessionController::spawn(
            &config(unreachable_feed()),
            Viewport::default(),
            &termination,
            Arc::new(SessionRegistry::new()),
            None,
        );
        let frames = handle.frames();

        handle.terminate();
        assert_eq!(handle.join().await, SessionExit::Terminated);
        assert!(frames.borrow().content.starts_with("stream closed"));
        assert!(!termination.is_cancelled());
    }

    #[tokio::test]
    async fn connecting_placeholder_before_first_sample() {
        let termination = CancellationToken::new();
        let handle = SessionController::spawn(
            &config(unreachable_feed()),
            Viewport::default(),
            &termination,
            Arc::new(SessionRegistry::new()),
            None,
        );

        let frame = Frame::clone(&handle.frames().borrow());
        assert_eq!(frame.content, "Connecting to Binance…");
        handle.terminate();
        assert_eq!(handle.join().await, SessionExit::Terminated);
    }

    #[tokio::test]
    async fn resize_publishes_new_geometry() {
        let termination = CancellationToken::new();
        let handle = SessionController::spawn(
            &config(unreachable_feed()),
            Viewport::default(),
            &termination,
            Arc::new(SessionRegistry::new()),
            None,
        );
        let mut frames = handle.frames();

        let viewport = Viewport::new(120, 40);
        assert!(handle.send(HostInput::Resize(viewport)).await);
        let frame = wait_for(&mut frames, |f| f.viewport == viewport).await;
        assert_eq!(frame.viewport, viewport);

        handle.terminate();
        handle.join().await;
    }

    #[tokio::test]
    async fn exhausted_feed_shows_stream_closed_once() {
        let feed = FeedSettings {
            backoff_cap: Duration::ZERO,
            max_reconnect_attempts: 1,
            ..unreachable_feed()
        };
        let termination = CancellationToken::new();
        let handle = SessionController::spawn(
            &config(feed),
            Viewport::default(),
            &termination,
            Arc::new(SessionRegistry::new()),
            None,
        );
        let mut frames = handle.frames();

        let frame = wait_for(&mut frames, |f| f.content.starts_with("stream closed")).await;
        assert_eq!(frame.content, "stream closed\n\nPress q to quit.");

        // Keys still work after the stream has closed.
        assert!(handle.send(HostInput::Key(Key::Quit)).await);
        assert_eq!(handle.join().await, SessionExit::Quit);
    }

    #[test]
    fn session_config_from_terminal_config() {
        let mut terminal = TerminalConfig::default();
        terminal.session.queue_capacity = 8;
        terminal.display.czk_rate = 25.0;

        let config = SessionConfig::from_terminal_config(&terminal);
        assert_eq!(config.queue_capacity, 8);
        assert_eq!(config.history_capacity, 1800);
        assert_eq!(config.display.units[1].rate, 25.0);
    }
}
