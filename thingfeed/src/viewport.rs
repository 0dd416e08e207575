//! Viewport calculation for line charts.
//!
//! Two rectangles are derived for every chart: the maximum viewport, which
//! covers all data plus a quarter-step of padding above and below the value
//! axis, and the default viewport the chart opens with. The default viewport
//! narrows the time range to an optional chart start/end date.

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::model::Feed;
use crate::series::offset_millis;

/// Fraction of a value tick interval added above and below the value axis.
pub const VERTICAL_PADDING: f64 = 0.25;

/// A visible `time x value` window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Viewport {
    /// Leftmost time offset in milliseconds.
    pub left: i64,
    /// Rightmost time offset in milliseconds.
    pub right: i64,
    /// Upper value bound.
    pub top: f64,
    /// Lower value bound.
    pub bottom: f64,
}

impl Viewport {
    /// Time span covered, in milliseconds.
    pub fn width(&self) -> i64 {
        self.right - self.left
    }

    /// Value span covered.
    pub fn height(&self) -> f64 {
        self.top - self.bottom
    }
}

/// Computes the maximum and default viewports.
///
/// The default viewport starts at the first entry strictly after
/// `chart_start` and ends at the last entry strictly before `chart_end`.
/// Without a matching entry (or without the date) the corresponding edge of
/// the maximum viewport is kept. Entries are matched whether or not their
/// value parsed.
pub fn compute_viewports(
    axis_min: f64,
    axis_max: f64,
    interval: f64,
    entries: &[Feed],
    last_offset: i64,
    chart_start: Option<DateTime<Utc>>,
    chart_end: Option<DateTime<Utc>>,
) -> (Viewport, Viewport) {
    let max_viewport = Viewport {
        left: 0,
        right: last_offset,
        top: axis_max + interval * VERTICAL_PADDING,
        bottom: axis_min - interval * VERTICAL_PADDING,
    };

    let mut default_viewport = max_viewport;
    let Some(reference) = entries.first().map(|e| e.created_at) else {
        return (max_viewport, default_viewport);
    };

    if let Some(start) = chart_start
        && let Some(entry) = entries.iter().find(|e| e.created_at > start)
    {
        default_viewport.left = offset_millis(reference, entry.created_at);
    }

    if let Some(end) = chart_end
        && let Some(entry) = entries.iter().rev().find(|e| e.created_at < end)
    {
        default_viewport.right = offset_millis(reference, entry.created_at);
    }

    (max_viewport, default_viewport)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at_secs(secs: i64) -> DateTime<Utc> {
        Utc.timestamp_opt(secs, 0).unwrap()
    }

    fn entries(secs: &[i64]) -> Vec<Feed> {
        secs.iter().map(|&s| Feed::new(0, at_secs(s))).collect()
    }

    #[test]
    fn test_max_viewport_padding() {
        let (max, _) = compute_viewports(0.0, 20.0, 10.0, &entries(&[0, 20]), 20_000, None, None);
        assert_eq!(max.left, 0);
        assert_eq!(max.right, 20_000);
        assert_eq!(max.top, 22.5);
        assert_eq!(max.bottom, -2.5);
        assert_eq!(max.width(), 20_000);
        assert_eq!(max.height(), 25.0);
    }

    #[test]
    fn test_default_equals_max_without_dates() {
        let feed = entries(&[0, 10, 20]);
        let (max, default) = compute_viewports(0.0, 20.0, 10.0, &feed, 20_000, None, None);
        assert_eq!(max, default);
    }

    #[test]
    fn test_default_uses_strict_bounds() {
        let feed = entries(&[100, 110, 120, 130, 140]);
        // Start equal to an entry's timestamp skips that entry.
        let (_, default) = compute_viewports(
            0.0,
            10.0,
            10.0,
            &feed,
            40_000,
            Some(at_secs(110)),
            Some(at_secs(140)),
        );
        assert_eq!(default.left, 20_000);
        assert_eq!(default.right, 30_000);
        assert_eq!(default.top, 12.5);
    }

    #[test]
    fn test_dates_outside_data_keep_max_edges() {
        let feed = entries(&[100, 110, 120]);
        let (max, default) = compute_viewports(
            0.0,
            10.0,
            10.0,
            &feed,
            20_000,
            Some(at_secs(500)),
            Some(at_secs(50)),
        );
        assert_eq!(default.left, max.left);
        assert_eq!(default.right, max.right);
    }

    #[test]
    fn test_empty_entries() {
        let (max, default) =
            compute_viewports(0.0, 10.0, 10.0, &[], 0, Some(at_secs(1)), Some(at_secs(2)));
        assert_eq!(max, default);
        assert_eq!(max.right, 0);
    }
}
