//! Series builder: turns one field of a channel feed into plottable points.
//!
//! A single pass over the feed produces everything a line chart needs on its
//! data side:
//!
//! - **Points** as `(offset, value)` pairs, where `offset` is the number of
//!   milliseconds since the first entry in the feed
//! - **Date ticks** on wall-clock minute boundaries that are a multiple of the
//!   configured interval (10 minutes by default)
//! - **Value ticks** at fixed steps spanning the observed values, with one
//!   step of headroom above the maximum
//! - **Bounds** of the parsed values and of the value axis
//!
//! Entries whose value for the chosen field is missing or not a number are
//! skipped. They produce neither a point nor a date tick, but they still
//! count towards `last_offset` and viewport placement.
//!
//! # Example
//!
//! ```rust
//! use chrono::{TimeZone, Utc};
//! use thingfeed::chart::ChartConfig;
//! use thingfeed::model::{Feed, FieldSlot};
//! use thingfeed::series::build_series;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let field = FieldSlot::new(1)?;
//! let t0 = Utc.with_ymd_and_hms(2015, 3, 1, 8, 0, 0).unwrap();
//! let entries = vec![
//!     Feed::new(1, t0).with_field(field, "5"),
//!     Feed::new(2, t0 + chrono::Duration::seconds(10)).with_field(field, "x"),
//!     Feed::new(3, t0 + chrono::Duration::seconds(20)).with_field(field, "15"),
//! ];
//!
//! let built = build_series(&entries, 1, &ChartConfig::default())?;
//! assert_eq!(built.points.len(), 2);
//! assert_eq!((built.axis_min, built.axis_max), (0.0, 20.0));
//! # Ok(())
//! # }
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::chart::ChartConfig;
use crate::error::{ChartError, Result};
use crate::model::{Feed, FieldSlot};

/// One plotted value.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Point {
    /// Milliseconds since the first entry of the feed.
    pub offset: i64,
    /// The parsed field value.
    pub value: f64,
}

/// A labelled position on the date axis.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DateTick {
    /// Milliseconds since the first entry of the feed.
    pub offset: i64,
    /// Wall-clock label of the minute bucket.
    pub label: String,
}

/// A labelled position on the value axis.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ValueTick {
    /// Position on the value axis.
    pub value: f64,
    /// Formatted value.
    pub label: String,
}

/// Output of [`build_series`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BuiltSeries {
    /// Timestamp of the first entry; offsets count from here.
    pub reference_time: DateTime<Utc>,
    /// Points for entries whose value parsed, in feed order.
    pub points: Vec<Point>,
    /// Date axis ticks.
    pub date_ticks: Vec<DateTick>,
    /// Value axis ticks, ascending.
    pub value_ticks: Vec<ValueTick>,
    /// Smallest tracked value (0 when nothing parsed).
    pub min_value: f64,
    /// Largest tracked value (0 when nothing parsed).
    pub max_value: f64,
    /// Lowest value tick.
    pub axis_min: f64,
    /// Highest value tick.
    pub axis_max: f64,
    /// Offset of the last entry, parsed or not.
    pub last_offset: i64,
}

/// Builds the point series and axis ticks for one field of a feed.
///
/// `entries` are expected in chronological order; offsets are not sorted or
/// checked.
///
/// # Errors
///
/// Returns [`ChartError::InvalidField`] if `field` is outside `1..=8`,
/// [`ChartError::EmptyFeed`] if `entries` is empty, and
/// [`ChartError::InvalidConfig`] if `config` fails validation or the value
/// range is too wide to step through in finite ticks.
pub fn build_series(entries: &[Feed], field: u32, config: &ChartConfig) -> Result<BuiltSeries> {
    let slot = FieldSlot::new(field)?;
    let first = entries.first().ok_or(ChartError::EmptyFeed)?;
    config.validate()?;

    let reference = first.created_at;
    let bucket_width = i64::from(config.date_tick_interval_minutes) * 60;

    let mut points = Vec::with_capacity(entries.len());
    let mut date_ticks = Vec::new();
    let mut bounds = ValueBounds::default();
    let mut last_bucket: Option<i64> = None;
    let mut last_offset = 0;

    for entry in entries {
        let offset = offset_millis(reference, entry.created_at);
        last_offset = offset;

        let Some(value) = parse_value(entry.field(slot)) else {
            tracing::trace!(entry_id = entry.entry_id, %slot, "skipping entry without numeric value");
            continue;
        };
        points.push(Point { offset, value });

        let secs = entry.created_at.timestamp();
        let bucket = secs - secs.rem_euclid(60);
        if bucket % bucket_width == 0 && last_bucket != Some(bucket) {
            last_bucket = Some(bucket);
            if let Some(label) = config.format_date_label(bucket) {
                date_ticks.push(DateTick { offset, label });
            }
        }

        bounds.track(value);
    }

    let (min_value, max_value) = bounds.get();
    let (axis_min, axis_max, value_ticks) =
        value_axis(min_value, max_value, config.value_tick_interval)?;

    tracing::debug!(
        entries = entries.len(),
        points = points.len(),
        date_ticks = date_ticks.len(),
        value_ticks = value_ticks.len(),
        %slot,
        "built series"
    );

    Ok(BuiltSeries {
        reference_time: reference,
        points,
        date_ticks,
        value_ticks,
        min_value,
        max_value,
        axis_min,
        axis_max,
        last_offset,
    })
}

/// Milliseconds from `reference` to `at`.
pub fn offset_millis(reference: DateTime<Utc>, at: DateTime<Utc>) -> i64 {
    (at - reference).num_milliseconds()
}

/// Parses a raw field value. Missing, non-numeric and non-finite values
/// yield `None`.
fn parse_value(raw: Option<&str>) -> Option<f64> {
    raw?.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Running min/max over parsed values.
///
/// The first value seeds both bounds. After that a value only reaches the
/// maximum check when it is not below the current minimum (legacy
/// strict-else tracking, preserved as observed).
#[derive(Debug, Default)]
struct ValueBounds {
    bounds: Option<(f64, f64)>,
}

impl ValueBounds {
    fn track(&mut self, value: f64) {
        let Some((min, max)) = self.bounds.as_mut() else {
            self.bounds = Some((value, value));
            return;
        };
        if value < *min {
            *min = value;
        } else if value > *max {
            *max = value;
        }
    }

    fn get(&self) -> (f64, f64) {
        self.bounds.unwrap_or((0.0, 0.0))
    }
}

/// Computes the value axis range and its ticks.
///
/// The minimum is floored to the interval and the maximum is floored then
/// raised by one interval, so there is always headroom above the data.
/// Every step is emitted, however many the range needs.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)] // steps is a finite, non-negative whole number here
fn value_axis(min: f64, max: f64, interval: f64) -> Result<(f64, f64, Vec<ValueTick>)> {
    let axis_min = min - min.rem_euclid(interval);
    let axis_max = max - max.rem_euclid(interval) + interval;

    let steps = ((axis_max - axis_min) / interval).round();
    if !steps.is_finite() {
        return Err(ChartError::InvalidConfig {
            reason: format!(
                "value tick interval {interval} cannot span {axis_min}..{axis_max} in finite steps"
            ),
        }
        .into());
    }

    let decimals = decimal_places(interval);
    let ticks = (0..=steps as usize)
        .map(|i| {
            let value = axis_min + i as f64 * interval;
            ValueTick {
                value,
                label: format!("{value:.decimals$}"),
            }
        })
        .collect();

    Ok((axis_min, axis_max, ticks))
}

/// Number of decimals needed to print multiples of `interval` (at most 6).
fn decimal_places(interval: f64) -> usize {
    let text = interval.to_string();
    text.split_once('.')
        .map_or(0, |(_, fraction)| fraction.len().min(6))
}
