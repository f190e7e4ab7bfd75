//! ASCII Line Chart
//!
//! Plots a single series as box-drawing glyphs with a labelled left axis:
//!
//! ```text
//!  3.00 ┤ ╭
//!  2.00 ┤╭╯
//!  1.00 ┼╯
//!          caption
//! ```
//!
//! The series is resampled by linear interpolation to exactly `width`
//! columns. Each value maps to one of `height + 1` rows by its position
//! within the data range; a flat series collapses to a single row.

use crate::domain::history::min_max;

/// Columns reserved left of the plot for the axis glyph.
const OFFSET: usize = 3;

/// Label decimals before magnitude adjustment.
const PRECISION: usize = 2;

const RESET: &str = "\x1b[0m";

/// Caption printed centered beneath the plot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Caption {
    /// Visible caption text.
    pub text: String,
    /// ANSI color prefix wrapped around the text, if any.
    pub color: Option<String>,
}

/// Plot dimensions and caption.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlotConfig {
    /// Data columns.
    pub width: usize,
    /// Target row span for the data range.
    pub height: usize,
    /// Optional caption.
    pub caption: Option<Caption>,
}

/// Render `series` as an ASCII line chart. Empty input yields an empty string.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn plot(series: &[f64], config: &PlotConfig) -> String {
    if series.is_empty() {
        return String::new();
    }

    let data = interpolate(series, config.width.max(2));
    let columns = data.len();

    let (minimum, maximum) = min_max(&data);
    // Halved so that extreme ranges such as [-1e308, 1e308] stay finite.
    let half_span = maximum.mul_add(0.5, -(minimum * 0.5));
    let rows = if half_span > 0.0 { config.height.max(1) } else { 0 };

    let level = |value: f64| -> usize {
        if rows == 0 {
            return 0;
        }
        let t = value.mul_add(0.5, -(minimum * 0.5)) / half_span;
        ((t * rows as f64).round() as usize).min(rows)
    };

    let mut grid: Vec<Vec<String>> = vec![vec![" ".to_string(); columns + OFFSET]; rows + 1];

    let precision = label_precision(minimum, maximum);
    let max_width = format!("{maximum:.precision$}")
        .len()
        .max(format!("{minimum:.precision$}").len());

    for (row, cells) in grid.iter_mut().enumerate() {
        let magnitude = if rows == 0 {
            maximum
        } else {
            let f = row as f64 / rows as f64;
            minimum.mul_add(f, maximum * (1.0 - f))
        };

        let label = format!("{magnitude:>width$.precision$}", width = max_width + 1);
        let column = OFFSET.saturating_sub(label.len());
        cells[column] = label;
        cells[OFFSET - 1] = "┤".to_string();
    }

    grid[rows - level(data[0])][OFFSET - 1] = "┼".to_string();

    for (x, pair) in data.windows(2).enumerate() {
        let (y0, y1) = (level(pair[0]), level(pair[1]));
        let column = x + OFFSET;

        if y0 == y1 {
            grid[rows - y0][column] = "─".to_string();
            continue;
        }

        let (to_glyph, from_glyph) = if y0 > y1 { ("╰", "╮") } else { ("╭", "╯") };
        grid[rows - y1][column] = to_glyph.to_string();
        grid[rows - y0][column] = from_glyph.to_string();

        for y in y0.min(y1) + 1..y0.max(y1) {
            grid[rows - y][column] = "│".to_string();
        }
    }

    let mut lines: Vec<String> = grid
        .into_iter()
        .map(|row| {
            let end = row.iter().rposition(|cell| cell != " ").unwrap_or(0);
            row[..=end].concat()
        })
        .collect();

    if let Some(caption) = &config.caption {
        let visible = caption.text.chars().count();
        let mut line = " ".repeat(OFFSET + max_width);
        if visible < columns {
            line.push_str(&" ".repeat((columns - visible) / 2));
        }
        match &caption.color {
            Some(color) => {
                line.push_str(color);
                line.push_str(&caption.text);
                line.push_str(RESET);
            }
            None => line.push_str(&caption.text),
        }
        lines.push(line);
    }

    lines.join("\n")
}

/// Resample `data` to `fit` points, keeping both endpoints.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn interpolate(data: &[f64], fit: usize) -> Vec<f64> {
    let (Some(&first), Some(&last)) = (data.first(), data.last()) else {
        return Vec::new();
    };
    if fit < 2 {
        return vec![last];
    }

    let spring = (data.len() - 1) as f64 / (fit - 1) as f64;
    let mut out = Vec::with_capacity(fit);
    out.push(first);
    for i in 1..fit - 1 {
        let point = i as f64 * spring;
        let before = point.floor();
        let after = point.ceil();
        let at = point - before;
        let (b, a) = (data[before as usize], data[after as usize]);
        out.push(a.mul_add(at, b * (1.0 - at)));
    }
    out.push(last);
    out
}

/// Decimals used for axis labels: fewer for large magnitudes, more for
/// values below one.
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn label_precision(minimum: f64, maximum: f64) -> usize {
    let log_maximum = if minimum == 0.0 && maximum == 0.0 {
        -1.0
    } else {
        maximum.abs().max(minimum.abs()).log10()
    };

    if log_maximum < 0.0 {
        if log_maximum % 1.0 == 0.0 {
            PRECISION + (log_maximum.abs() - 1.0) as usize
        } else {
            PRECISION + log_maximum.abs() as usize
        }
    } else if log_maximum > 2.0 {
        0
    } else {
        PRECISION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(width: usize, height: usize) -> PlotConfig {
        PlotConfig {
            width,
            height,
            caption: None,
        }
    }

    #[test]
    fn rising_series() {
        let chart = plot(&[1.0, 2.0, 3.0], &config(3, 2));
        assert_eq!(chart, " 3.00 ┤ ╭\n 2.00 ┤╭╯\n 1.00 ┼╯");
    }

    #[test]
    fn falling_series() {
        let chart = plot(&[3.0, 2.0, 1.0], &config(3, 2));
        assert_eq!(chart, " 3.00 ┼╮\n 2.00 ┤╰╮\n 1.00 ┤ ╰");
    }

    #[test]
    fn flat_series_is_one_row() {
        let chart = plot(&[5.0, 5.0], &config(2, 8));
        assert_eq!(chart, " 5.00 ┼─");
    }

    #[test]
    fn steep_move_draws_vertical_run() {
        let chart = plot(&[0.0, 3.0], &config(2, 3));
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[0].ends_with('╭'));
        assert!(lines[1].ends_with('│'));
        assert!(lines[2].ends_with('│'));
        assert!(lines[3].ends_with('╯'));
        assert!(lines[3].contains('┼'));
    }

    #[test]
    fn large_values_drop_label_decimals() {
        let chart = plot(&[64_000.0, 64_010.0], &config(2, 2));
        let first = chart.lines().next().unwrap();
        assert!(first.starts_with(" 64010 ┤"), "{first}");
    }

    #[test]
    fn caption_is_centered_under_plot() {
        let cfg = PlotConfig {
            width: 10,
            height: 2,
            caption: Some(Caption {
                text: "BTC".to_string(),
                color: None,
            }),
        };
        let chart = plot(&[1.0, 2.0], &cfg);
        let caption = chart.lines().last().unwrap();
        // OFFSET + label width (4) + (10 - 3) / 2
        assert_eq!(caption, format!("{}BTC", " ".repeat(3 + 4 + 3)));
    }

    #[test]
    fn caption_color_is_reset() {
        let cfg = PlotConfig {
            width: 4,
            height: 2,
            caption: Some(Caption {
                text: "up".to_string(),
                color: Some("\x1b[32m".to_string()),
            }),
        };
        let chart = plot(&[1.0, 2.0], &cfg);
        assert!(chart.ends_with("\x1b[32mup\x1b[0m"));
    }

    #[test]
    fn empty_series_renders_nothing() {
        assert!(plot(&[], &config(20, 8)).is_empty());
    }

    #[test]
    fn interpolation_keeps_endpoints() {
        let resampled = interpolate(&[0.0, 8.0], 5);
        assert_eq!(resampled, vec![0.0, 2.0, 4.0, 6.0, 8.0]);

        let shrunk = interpolate(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(shrunk, vec![1.0, 3.0, 5.0]);
    }

    #[test]
    fn single_sample_fills_width() {
        assert_eq!(interpolate(&[7.0], 4), vec![7.0; 4]);
    }

    #[test]
    fn subnormal_range_keeps_height() {
        let chart = plot(&[0.0, 1e-310], &config(76, 18));
        assert_eq!(chart.lines().count(), 19);
        assert!(chart.lines().last().unwrap().contains('┼'));
    }

    #[test]
    fn extreme_range_stays_finite() {
        let chart = plot(&[-1e308, 1e308], &config(10, 4));
        let lines: Vec<&str> = chart.lines().collect();
        assert_eq!(lines.len(), 5);
        assert!(!chart.contains("NaN") && !chart.contains("inf"), "{chart}");
        assert!(lines.iter().all(|l| l.contains('┤') || l.contains('┼')));
        assert!(lines[4].contains('┼'));
    }

    #[test]
    fn interpolation_of_extreme_values_is_finite() {
        let resampled = interpolate(&[-1e308, 1e308], 5);
        assert!(resampled.iter().all(|v| v.is_finite()));
        assert_eq!(resampled[2], 0.0);
    }

    #[test]
    fn every_row_has_an_axis() {
        let series: Vec<f64> = (0..100).map(|i| f64::from(i % 17) * 3.5).collect();
        let chart = plot(&series, &config(40, 10));
        for line in chart.lines() {
            assert!(line.contains('┤') || line.contains('┼'), "{line}");
        }
    }
}
