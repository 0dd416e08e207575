//! Line chart data built from a channel field feed.
//!
//! [`build_line_chart`] combines the [series builder](crate::series) and the
//! [viewport calculator](crate::viewport) into a single renderer-agnostic
//! [`LineChart`]. [`LineChartLoader`] adds the fetch step in front of it: one
//! request to a [`FeedSource`], one completed chart.
//!
//! # Example
//!
//! ```rust,no_run
//! # #[cfg(feature = "client")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use thingfeed::chart::{ChartConfig, LineChartLoader};
//! use thingfeed::client::{ClientConfig, ThingSpeakClient};
//! use thingfeed::query::FeedQuery;
//!
//! let client = ThingSpeakClient::new(ClientConfig::default())?;
//! let loader = LineChartLoader::new(client, ChartConfig::default().with_value_tick_interval(5.0));
//!
//! let chart = loader.load(9, 1, &FeedQuery::new().with_results(200)).await?;
//! println!("{}: {} points", chart.title, chart.points.len());
//! # Ok(())
//! # }
//! ```

use std::future::Future;

use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, FixedOffset, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{ChartError, Result};
use crate::model::{ChannelFeed, FieldSlot};
use crate::query::FeedQuery;
use crate::series::{DateTick, Point, ValueTick, build_series};
use crate::viewport::{Viewport, compute_viewports};

/// Default date axis label format.
pub const DEFAULT_DATE_LABEL_FORMAT: &str = "%H:%M";

/// Default date axis name.
pub const DEFAULT_X_AXIS_NAME: &str = "Date";

/// Default line color.
pub const DEFAULT_LINE_COLOR: &str = "#FF4444";

/// Default axis label color.
pub const DEFAULT_AXIS_COLOR: &str = "#DFDFDF";

/// Presentation settings for a line chart.
///
/// Deserializes from JSON with every key optional, so a config file only
/// needs the settings it changes:
///
/// ```rust
/// use thingfeed::chart::ChartConfig;
///
/// let config: ChartConfig = serde_json::from_str(r#"{"value_tick_interval": 2.5}"#).unwrap();
/// assert_eq!(config.value_tick_interval, 2.5);
/// assert_eq!(config.date_tick_interval_minutes, 10);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChartConfig {
    /// strftime pattern for date axis labels.
    pub date_label_format: String,
    /// Minutes between date axis labels.
    pub date_tick_interval_minutes: u32,
    /// Step between value axis labels.
    pub value_tick_interval: f64,
    /// UTC offset, in minutes, used when formatting date labels.
    pub label_utc_offset_minutes: i32,
    /// Start of the default viewport.
    pub chart_start: Option<DateTime<Utc>>,
    /// End of the default viewport.
    pub chart_end: Option<DateTime<Utc>>,
    /// Name of the date axis.
    pub x_axis_name: String,
    /// Name of the value axis; the field's title when unset.
    pub y_axis_name: Option<String>,
    /// Draw the line as a cubic spline.
    pub spline: bool,
    /// Fill the area under the line.
    pub filled: bool,
    /// Line color as `#RRGGBB`.
    pub line_color: String,
    /// Axis label color as `#RRGGBB`.
    pub axis_color: String,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            date_label_format: DEFAULT_DATE_LABEL_FORMAT.to_string(),
            date_tick_interval_minutes: 10,
            value_tick_interval: 10.0,
            label_utc_offset_minutes: 0,
            chart_start: None,
            chart_end: None,
            x_axis_name: DEFAULT_X_AXIS_NAME.to_string(),
            y_axis_name: None,
            spline: false,
            filled: false,
            line_color: DEFAULT_LINE_COLOR.to_string(),
            axis_color: DEFAULT_AXIS_COLOR.to_string(),
        }
    }
}

impl ChartConfig {
    /// Sets the strftime pattern for date labels.
    #[must_use]
    pub fn with_date_label_format(mut self, format: impl Into<String>) -> Self {
        self.date_label_format = format.into();
        self
    }

    /// Sets the minutes between date labels.
    #[must_use]
    pub fn with_date_tick_interval_minutes(mut self, minutes: u32) -> Self {
        self.date_tick_interval_minutes = minutes;
        self
    }

    /// Sets the step between value labels.
    #[must_use]
    pub fn with_value_tick_interval(mut self, interval: f64) -> Self {
        self.value_tick_interval = interval;
        self
    }

    /// Sets the UTC offset for date labels.
    #[must_use]
    pub fn with_label_utc_offset_minutes(mut self, minutes: i32) -> Self {
        self.label_utc_offset_minutes = minutes;
        self
    }

    /// Sets the start of the default viewport.
    #[must_use]
    pub fn with_chart_start(mut self, start: DateTime<Utc>) -> Self {
        self.chart_start = Some(start);
        self
    }

    /// Sets the end of the default viewport.
    #[must_use]
    pub fn with_chart_end(mut self, end: DateTime<Utc>) -> Self {
        self.chart_end = Some(end);
        self
    }

    /// Sets the date axis name.
    #[must_use]
    pub fn with_x_axis_name(mut self, name: impl Into<String>) -> Self {
        self.x_axis_name = name.into();
        self
    }

    /// Sets the value axis name.
    #[must_use]
    pub fn with_y_axis_name(mut self, name: impl Into<String>) -> Self {
        self.y_axis_name = Some(name.into());
        self
    }

    /// Draws the line as a cubic spline.
    #[must_use]
    pub fn with_spline(mut self, spline: bool) -> Self {
        self.spline = spline;
        self
    }

    /// Fills the area under the line.
    #[must_use]
    pub fn with_filled(mut self, filled: bool) -> Self {
        self.filled = filled;
        self
    }

    /// Sets the line color (`#RRGGBB`).
    #[must_use]
    pub fn with_line_color(mut self, color: impl Into<String>) -> Self {
        self.line_color = color.into();
        self
    }

    /// Sets the axis label color (`#RRGGBB`).
    #[must_use]
    pub fn with_axis_color(mut self, color: impl Into<String>) -> Self {
        self.axis_color = color.into();
        self
    }

    /// Checks every setting the transform depends on.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidConfig`] if the date tick interval is
    /// zero, the value tick interval is not a positive finite number, the
    /// UTC offset is a day or more, the label format is not valid strftime,
    /// or a color is not `#RRGGBB`.
    pub fn validate(&self) -> std::result::Result<(), ChartError> {
        if self.date_tick_interval_minutes == 0 {
            return Err(invalid("date tick interval must be at least 1 minute"));
        }
        if !(self.value_tick_interval.is_finite() && self.value_tick_interval > 0.0) {
            return Err(invalid(format!(
                "value tick interval must be positive, got {}",
                self.value_tick_interval
            )));
        }
        self.label_offset()?;
        if StrftimeItems::new(&self.date_label_format).any(|item| matches!(item, Item::Error)) {
            return Err(invalid(format!(
                "date label format '{}' is not a valid strftime pattern",
                self.date_label_format
            )));
        }
        for (name, color) in [("line", &self.line_color), ("axis", &self.axis_color)] {
            if !is_hex_color(color) {
                return Err(invalid(format!(
                    "{name} color '{color}' is not of the form #RRGGBB"
                )));
            }
        }
        Ok(())
    }

    /// Returns the offset date labels are rendered in.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidConfig`] if the offset is not within ±24h.
    pub fn label_offset(&self) -> std::result::Result<FixedOffset, ChartError> {
        self.label_utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .ok_or_else(|| {
                invalid(format!(
                    "label UTC offset of {} minutes is out of range",
                    self.label_utc_offset_minutes
                ))
            })
    }

    /// Formats a whole-second Unix timestamp as a date label.
    ///
    /// Returns `None` when the timestamp or offset cannot be represented.
    pub fn format_date_label(&self, unix_secs: i64) -> Option<String> {
        let offset = self.label_offset().ok()?;
        let at = DateTime::from_timestamp(unix_secs, 0)?.with_timezone(&offset);
        Some(at.format(&self.date_label_format).to_string())
    }
}

fn is_hex_color(color: &str) -> bool {
    color
        .strip_prefix('#')
        .is_some_and(|hex| hex.len() == 6 && hex.bytes().all(|b| b.is_ascii_hexdigit()))
}

fn invalid(reason: impl Into<String>) -> ChartError {
    ChartError::InvalidConfig {
        reason: reason.into(),
    }
}

/// Line drawing settings passed through to the renderer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LineStyle {
    /// Draw as a cubic spline.
    pub spline: bool,
    /// Fill the area under the line.
    pub filled: bool,
    /// Line color as `#RRGGBB`.
    pub line_color: String,
    /// Axis label color as `#RRGGBB`.
    pub axis_color: String,
}

/// A named axis with its ticks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Axis<T> {
    /// Axis title.
    pub name: String,
    /// Tick positions and labels.
    pub ticks: Vec<T>,
}

/// Everything a renderer needs to draw one field of a channel.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LineChart {
    /// The channel the data came from.
    pub channel_id: u64,
    /// The charted field.
    pub field: FieldSlot,
    /// Chart title: the field's display name.
    pub title: String,
    /// When offset 0 occurred.
    pub reference_time: DateTime<Utc>,
    /// The plotted points.
    pub points: Vec<Point>,
    /// Line drawing flags.
    pub style: LineStyle,
    /// Horizontal (date) axis.
    pub date_axis: Axis<DateTick>,
    /// Vertical (value) axis.
    pub value_axis: Axis<ValueTick>,
    /// Smallest tracked value.
    pub min_value: f64,
    /// Largest tracked value.
    pub max_value: f64,
    /// Bounds covering all data.
    pub max_viewport: Viewport,
    /// Bounds the chart opens with.
    pub default_viewport: Viewport,
}

/// Builds line chart data for one field of an already fetched feed.
///
/// The title is the channel's display name for the field, or `fieldN` when
/// the channel does not name it.
///
/// # Errors
///
/// Returns [`ChartError::InvalidField`], [`ChartError::EmptyFeed`] or
/// [`ChartError::InvalidConfig`] as described in [`build_series`].
pub fn build_line_chart(
    channel_id: u64,
    field: u32,
    feed: &ChannelFeed,
    config: &ChartConfig,
) -> Result<LineChart> {
    let slot = FieldSlot::new(field)?;
    let built = build_series(&feed.feeds, field, config)?;

    let title = feed
        .channel
        .field_name(slot)
        .map_or_else(|| slot.to_string(), str::to_string);

    let (max_viewport, default_viewport) = compute_viewports(
        built.axis_min,
        built.axis_max,
        config.value_tick_interval,
        &feed.feeds,
        built.last_offset,
        config.chart_start,
        config.chart_end,
    );

    Ok(LineChart {
        channel_id,
        field: slot,
        reference_time: built.reference_time,
        points: built.points,
        style: LineStyle {
            spline: config.spline,
            filled: config.filled,
            line_color: config.line_color.clone(),
            axis_color: config.axis_color.clone(),
        },
        date_axis: Axis {
            name: config.x_axis_name.clone(),
            ticks: built.date_ticks,
        },
        value_axis: Axis {
            name: config.y_axis_name.clone().unwrap_or_else(|| title.clone()),
            ticks: built.value_ticks,
        },
        title,
        min_value: built.min_value,
        max_value: built.max_value,
        max_viewport,
        default_viewport,
    })
}

/// Anything that can fetch a channel's field feed.
///
/// Each call is one request with one completion. Concurrent calls are
/// independent futures with no ordering or coalescing between them.
pub trait FeedSource {
    /// Fetches channel metadata and the entries of one field.
    fn fetch_field_feed(
        &self,
        channel_id: u64,
        field: FieldSlot,
        query: &FeedQuery,
    ) -> impl Future<Output = Result<ChannelFeed>> + Send;
}

/// Fetches a field feed and turns it into a [`LineChart`].
#[derive(Debug, Clone)]
pub struct LineChartLoader<S> {
    source: S,
    config: ChartConfig,
}

impl<S: FeedSource> LineChartLoader<S> {
    /// Creates a loader over `source` with the given chart settings.
    pub fn new(source: S, config: ChartConfig) -> Self {
        Self { source, config }
    }

    /// Returns the chart settings.
    pub fn config(&self) -> &ChartConfig {
        &self.config
    }

    /// Returns the underlying feed source.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetches one field of a channel and builds its chart.
    ///
    /// The field and chart settings are checked before any request is made.
    ///
    /// # Errors
    ///
    /// Returns chart errors as [`build_line_chart`] does, plus whatever the
    /// feed source reports for a failed fetch.
    pub async fn load(&self, channel_id: u64, field: u32, query: &FeedQuery) -> Result<LineChart> {
        let slot = FieldSlot::new(field)?;
        self.config.validate()?;

        tracing::debug!(channel_id, %slot, "loading chart data");
        let feed = self.source.fetch_field_feed(channel_id, slot, query).await?;

        build_line_chart(channel_id, field, &feed, &self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThingFeedError;
    use crate::model::{Channel, Feed};
    use chrono::TimeZone;

    fn feed_with(values: &[(i64, &str)]) -> ChannelFeed {
        let field = FieldSlot::new(1).unwrap();
        ChannelFeed {
            channel: Channel {
                id: 42,
                field1: Some("Temperature".to_string()),
                ..Channel::default()
            },
            feeds: values
                .iter()
                .map(|&(secs, v)| {
                    Feed::new(0, Utc.timestamp_opt(secs, 0).unwrap()).with_field(field, v)
                })
                .collect(),
        }
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(ChartConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_settings() {
        let cases = [
            ChartConfig::default().with_date_tick_interval_minutes(0),
            ChartConfig::default().with_value_tick_interval(0.0),
            ChartConfig::default().with_value_tick_interval(-1.0),
            ChartConfig::default().with_value_tick_interval(f64::NAN),
            ChartConfig::default().with_label_utc_offset_minutes(24 * 60),
            ChartConfig::default().with_date_label_format("%H:%Q"),
            ChartConfig::default().with_line_color("red"),
            ChartConfig::default().with_axis_color("#12345"),
            ChartConfig::default().with_axis_color("#GG0000"),
        ];
        for config in cases {
            assert!(
                matches!(config.validate(), Err(ChartError::InvalidConfig { .. })),
                "{config:?} should be rejected"
            );
        }
    }

    #[test]
    fn test_format_date_label_with_offset() {
        let config = ChartConfig::default().with_label_utc_offset_minutes(8 * 60);
        // 2015-03-01 00:10:00 UTC
        let secs = Utc.with_ymd_and_hms(2015, 3, 1, 0, 10, 0).unwrap().timestamp();
        assert_eq!(config.format_date_label(secs).as_deref(), Some("08:10"));

        let config = config.with_date_label_format("%d/%m %H:%M");
        assert_eq!(config.format_date_label(secs).as_deref(), Some("01/03 08:10"));
    }

    #[test]
    fn test_config_deserializes_partial_json() {
        let json = r#"{"date_tick_interval_minutes": 5, "spline": true, "chart_start": "2015-03-01T00:00:00Z"}"#;
        let config: ChartConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.date_tick_interval_minutes, 5);
        assert!(config.spline);
        assert!(config.chart_start.is_some());
        assert_eq!(config.date_label_format, DEFAULT_DATE_LABEL_FORMAT);
        assert_eq!(config.x_axis_name, DEFAULT_X_AXIS_NAME);
    }

    #[test]
    fn test_build_line_chart_titles_and_axes() {
        let feed = feed_with(&[(0, "5"), (10, "x"), (20, "15")]);
        let chart = build_line_chart(42, 1, &feed, &ChartConfig::default()).unwrap();

        assert_eq!(chart.title, "Temperature");
        assert_eq!(chart.value_axis.name, "Temperature");
        assert_eq!(chart.date_axis.name, "Date");
        assert_eq!(chart.points.len(), 2);
        assert_eq!(chart.max_viewport.right, 20_000);
        assert_eq!(chart.max_viewport.top, 22.5);
        assert_eq!(chart.default_viewport, chart.max_viewport);
        assert_eq!(chart.reference_time.timestamp(), 0);
    }

    #[test]
    fn test_build_line_chart_unnamed_field_and_axis_override() {
        let mut feed = feed_with(&[(0, "1")]);
        feed.channel.field1 = None;
        let config = ChartConfig::default()
            .with_y_axis_name("°C")
            .with_x_axis_name("Time")
            .with_filled(true);

        let chart = build_line_chart(42, 1, &feed, &config).unwrap();
        assert_eq!(chart.title, "field1");
        assert_eq!(chart.value_axis.name, "°C");
        assert_eq!(chart.date_axis.name, "Time");
        assert!(chart.style.filled);
        assert!(!chart.style.spline);
        assert_eq!(chart.style.line_color, DEFAULT_LINE_COLOR);
        assert_eq!(chart.style.axis_color, DEFAULT_AXIS_COLOR);
    }

    #[test]
    fn test_build_line_chart_passes_colors_through() {
        let feed = feed_with(&[(0, "1")]);
        let config = ChartConfig::default()
            .with_line_color("#00aa00")
            .with_axis_color("#333333");
        assert!(config.validate().is_ok());

        let chart = build_line_chart(42, 1, &feed, &config).unwrap();
        assert_eq!(chart.style.line_color, "#00aa00");
        assert_eq!(chart.style.axis_color, "#333333");
    }

    #[test]
    fn test_build_line_chart_errors() {
        let feed = feed_with(&[]);
        assert!(matches!(
            build_line_chart(42, 1, &feed, &ChartConfig::default()),
            Err(ThingFeedError::Chart(ChartError::EmptyFeed))
        ));
        assert!(matches!(
            build_line_chart(42, 9, &feed, &ChartConfig::default()),
            Err(ThingFeedError::Chart(ChartError::InvalidField { field: 9 }))
        ));
    }

    #[test]
    fn test_chart_serializes_to_json() {
        let feed = feed_with(&[(0, "5"), (20, "15")]);
        let chart = build_line_chart(42, 1, &feed, &ChartConfig::default()).unwrap();
        let json = serde_json::to_value(&chart).unwrap();
        assert_eq!(json["field"], 1);
        assert_eq!(json["points"][1]["offset"], 20_000);
        assert_eq!(json["value_axis"]["ticks"][2]["label"], "20");
    }
}
