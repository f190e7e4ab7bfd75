//! Session State Machine
//!
//! Pure transition function driving one session's cooperative consumption
//! loop. The host executes the returned commands; "await sample" eventually
//! feeds back a `SampleReceived` or `StreamEnded` event.
//!
//! ```text
//!            SampleReceived                    StreamEnded
//! AwaitingSample ───────► (append, render) ──┐      │
//!       ▲                                    │      ▼
//!       └────────── AwaitSample ◄────────────┘  StreamClosed (terminal)
//! ```

use super::history::PriceSample;

/// Message shown once the sample stream has closed.
pub const STREAM_CLOSED_STATUS: &str = "stream closed";

// =============================================================================
// Viewport
// =============================================================================

/// Terminal dimensions negotiated by the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    /// Columns.
    pub width: u16,
    /// Rows.
    pub height: u16,
}

impl Default for Viewport {
    fn default() -> Self {
        Self {
            width: 80,
            height: 24,
        }
    }
}

impl Viewport {
    /// Create a viewport, falling back to the defaults for zero dimensions.
    #[must_use]
    pub fn new(width: u16, height: u16) -> Self {
        let fallback = Self::default();
        Self {
            width: if width > 0 { width } else { fallback.width },
            height: if height > 0 { height } else { fallback.height },
        }
    }
}

// =============================================================================
// Events and Commands
// =============================================================================

/// Key inputs recognised by a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Key {
    /// End the session (`q`, Ctrl-C).
    Quit,
    /// Show or hide the expanded help text (`?`).
    ToggleHelp,
    /// Anything else; ignored.
    Other,
}

impl Key {
    /// Map a single input byte to a key.
    #[must_use]
    pub const fn from_byte(byte: u8) -> Self {
        match byte {
            b'q' | 0x03 => Self::Quit,
            b'?' => Self::ToggleHelp,
            _ => Self::Other,
        }
    }
}

/// Inputs to the session state machine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionEvent {
    /// Terminal was resized.
    Resize(Viewport),
    /// A sample came off the channel.
    SampleReceived(PriceSample),
    /// A key was pressed.
    KeyPress(Key),
    /// The channel reported closed.
    StreamEnded,
}

/// Effects requested by a transition, executed by the host in order.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SessionCommand {
    /// Append the sample to the session history.
    Append(PriceSample),
    /// Re-render the current view.
    Render,
    /// Issue the next (single outstanding) receive on the sample channel.
    AwaitSample,
    /// End the session.
    Quit,
}

// =============================================================================
// State
// =============================================================================

/// Consumption phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SessionPhase {
    /// One receive is outstanding.
    #[default]
    AwaitingSample,
    /// The channel is closed; no further receives are issued.
    StreamClosed,
}

/// Per-session UI state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SessionState {
    /// Current consumption phase.
    pub phase: SessionPhase,
    /// Render geometry.
    pub viewport: Viewport,
    /// Whether the expanded help is visible.
    pub show_help: bool,
}

impl SessionState {
    /// Initial state for a new session; the first receive is issued by
    /// [`SessionState::init`].
    #[must_use]
    pub fn new(viewport: Viewport) -> Self {
        Self {
            phase: SessionPhase::AwaitingSample,
            viewport,
            show_help: false,
        }
    }

    /// Commands to run when the session starts.
    #[must_use]
    pub fn init() -> Vec<SessionCommand> {
        vec![SessionCommand::Render, SessionCommand::AwaitSample]
    }

    /// Whether the stream has closed.
    #[must_use]
    pub fn is_stream_closed(&self) -> bool {
        self.phase == SessionPhase::StreamClosed
    }
}

/// Apply `event` to `state`, returning the next state and the commands to run.
#[must_use]
pub fn transition(state: SessionState, event: SessionEvent) -> (SessionState, Vec<SessionCommand>) {
    let mut next = state;

    let commands = match event {
        SessionEvent::Resize(viewport) => {
            next.viewport = viewport;
            vec![SessionCommand::Render]
        }
        SessionEvent::SampleReceived(value) => match state.phase {
            SessionPhase::AwaitingSample => vec![
                SessionCommand::Append(value),
                SessionCommand::Render,
                SessionCommand::AwaitSample,
            ],
            SessionPhase::StreamClosed => Vec::new(),
        },
        SessionEvent::StreamEnded => match state.phase {
            SessionPhase::AwaitingSample => {
                next.phase = SessionPhase::StreamClosed;
                vec![SessionCommand::Render]
            }
            SessionPhase::StreamClosed => Vec::new(),
        },
        SessionEvent::KeyPress(Key::Quit) => vec![SessionCommand::Quit],
        SessionEvent::KeyPress(Key::ToggleHelp) => {
            next.show_help = !state.show_help;
            vec![SessionCommand::Render]
        }
        SessionEvent::KeyPress(Key::Other) => Vec::new(),
    };

    (next, commands)
}

// =============================================================================
// Tests
// =============================================================================
