//! Session Renderer
//!
//! Pure mapping from a history snapshot, viewport and display settings to
//! the text shown in a session. The wall-clock time is an explicit input so
//! identical inputs always produce identical output.
//!
//! # Layout
//!
//! ```text
//! BTC/USDT Live Price
//!
//!
//! <chart with caption "BTC/USDT 64123.45" in the trend color>
//!
//! Δ: 12.30 (0.02%)  3:04PM
//! Last: 64 123.45usdt  Min: 64 111.15usdt  Max: 64 123.45usdt
//! Last: 1 346 592.45czk  Min: ...
//!
//! q quit • ? more
//! ```

mod chart;
mod format;

use std::fmt::Write as _;

use chrono::NaiveTime;

use crate::domain::history::{HistorySnapshot, Trend};
use crate::domain::session::Viewport;

pub use chart::{Caption, PlotConfig, interpolate, plot};
pub use format::format_with_spaces;

const STATUS_FOOTER: &str = "Press q to quit.";

// =============================================================================
// Display Configuration
// =============================================================================

/// ANSI color prefixes keyed by trend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrendColors {
    /// Price moved up.
    pub up: String,
    /// Price moved down.
    pub down: String,
    /// Unchanged or not enough samples.
    pub neutral: String,
}

impl Default for TrendColors {
    fn default() -> Self {
        Self {
            up: "\x1b[32m".to_string(),
            down: "\x1b[31m".to_string(),
            neutral: "\x1b[37m".to_string(),
        }
    }
}

impl TrendColors {
    /// Color for `trend`.
    #[must_use]
    pub fn for_trend(&self, trend: Trend) -> &str {
        match trend {
            Trend::Up => &self.up,
            Trend::Down => &self.down,
            Trend::Neutral => &self.neutral,
        }
    }
}

/// A currency the value lines are reported in.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueUnit {
    /// Suffix printed after each figure.
    pub label: String,
    /// Multiplier applied to the quote price.
    pub rate: f64,
}

impl ValueUnit {
    /// Create a unit.
    #[must_use]
    pub fn new(label: impl Into<String>, rate: f64) -> Self {
        Self {
            label: label.into(),
            rate,
        }
    }
}

/// Static presentation settings shared by every session.
#[derive(Debug, Clone, PartialEq)]
pub struct DisplayConfig {
    /// First line of every frame.
    pub title: String,
    /// Pair label used in the chart caption.
    pub pair: String,
    /// Placeholder shown before the first sample.
    pub connecting: String,
    /// Caption colors.
    pub colors: TrendColors,
    /// One value line is printed per unit, in order.
    pub units: Vec<ValueUnit>,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::with_czk_rate(21.0)
    }
}

impl DisplayConfig {
    /// BTC/USDT display with USDT and CZK value lines.
    #[must_use]
    pub fn with_czk_rate(czk_rate: f64) -> Self {
        Self {
            title: "BTC/USDT Live Price".to_string(),
            pair: "BTC/USDT".to_string(),
            connecting: "Connecting to Binance…".to_string(),
            colors: TrendColors::default(),
            units: vec![ValueUnit::new("usdt", 1.0), ValueUnit::new("czk", czk_rate)],
        }
    }
}

// =============================================================================
// Geometry
// =============================================================================

/// Chart size derived from the viewport.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChartGeometry {
    /// Data columns.
    pub width: usize,
    /// Row span.
    pub height: usize,
}

impl ChartGeometry {
    /// Smallest chart width.
    pub const MIN_WIDTH: usize = 20;
    /// Smallest chart height.
    pub const MIN_HEIGHT: usize = 8;
    /// Largest chart height.
    pub const MAX_HEIGHT: usize = 20;

    /// `width = max(20, w - 4)`, `height = clamp(h - 6, 8, 20)`.
    #[must_use]
    pub fn for_viewport(viewport: Viewport) -> Self {
        let width = usize::from(viewport.width.saturating_sub(4));
        let height = usize::from(viewport.height.saturating_sub(6));
        Self {
            width: width.max(Self::MIN_WIDTH),
            height: height.clamp(Self::MIN_HEIGHT, Self::MAX_HEIGHT),
        }
    }
}

// =============================================================================
// Renderer
// =============================================================================

/// Produces session frames.
#[derive(Debug, Clone, Default)]
pub struct Renderer {
    config: DisplayConfig,
}

impl Renderer {
    /// Create a renderer.
    #[must_use]
    pub const fn new(config: DisplayConfig) -> Self {
        Self { config }
    }

    /// Display settings in use.
    #[must_use]
    pub const fn config(&self) -> &DisplayConfig {
        &self.config
    }

    /// Render the live view.
    ///
    /// Returns the connecting placeholder when `snapshot` is empty.
    #[must_use]
    pub fn render(
        &self,
        snapshot: &HistorySnapshot,
        viewport: Viewport,
        show_help: bool,
        now: NaiveTime,
    ) -> String {
        if snapshot.is_empty() {
            return self.config.connecting.clone();
        }

        let geometry = ChartGeometry::for_viewport(viewport);
        let trend = snapshot.trend();
        let chart = plot(
            &snapshot.samples,
            &PlotConfig {
                width: geometry.width,
                height: geometry.height,
                caption: Some(Caption {
                    text: format!("{} {:.2}", self.config.pair, snapshot.last),
                    color: Some(self.config.colors.for_trend(trend).to_string()),
                }),
            },
        );

        let stats = snapshot.stats();
        let mut out = String::with_capacity(chart.len() + 512);

        out.push_str(&self.config.title);
        out.push_str("\n\n\n");
        out.push_str(&chart);
        out.push_str("\n\n");
        let _ = write!(
            out,
            "Δ: {:.2} ({:.2}%)  {}",
            stats.delta,
            stats.percent_change,
            now.format("%-I:%M%p")
        );

        for unit in &self.config.units {
            let _ = write!(
                out,
                "\nLast: {last}{label}  Min: {min}{label}  Max: {max}{label}",
                last = format_with_spaces(snapshot.last * unit.rate),
                min = format_with_spaces(stats.min * unit.rate),
                max = format_with_spaces(stats.max * unit.rate),
                label = unit.label,
            );
        }

        out.push_str("\n\n");
        out.push_str(help_text(show_help));
        out
    }

    /// Render a terminal status message such as "stream closed".
    #[must_use]
    pub fn render_status(&self, status: &str) -> String {
        format!("{status}\n\n{STATUS_FOOTER}")
    }
}

const fn help_text(expanded: bool) -> &'static str {
    if expanded {
        "q quit • ? less\n\nq, ctrl+c  quit the session\n?          toggle this help"
    } else {
        "q quit • ? more"
    }
}

// =============================================================================
// Tests
// =============================================================================
