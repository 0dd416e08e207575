//! # thingfeed
//!
//! ThingSpeak IoT REST client and feed-to-line-chart transform.
//!
//! thingfeed fetches channel metadata, feeds, entries and status updates from
//! a ThingSpeak server, manages TalkBack command queues, and turns one field
//! of a feed into renderer-agnostic line chart data: time-offset points,
//! labelled axis ticks and viewport rectangles.
//!
//! **Status**: This crate is in early development. The API is not yet stable.
//!
//! ## Key Properties
//!
//! - One request, one future: no retries, caching or response coalescing
//! - The chart transform is pure and runs without the network
//! - Unparseable field values are skipped, never fatal
//! - Configuration is immutable value objects built with `with_*` methods
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! # #[cfg(feature = "client")]
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! use thingfeed::{ChartConfig, ClientConfig, FeedQuery, LineChartLoader, ThingSpeakClient};
//!
//! let client = ThingSpeakClient::new(ClientConfig::default())?;
//!
//! // Raw entries
//! let feed = client.channel_feed(9, &FeedQuery::new().with_results(20)).await?;
//! println!("{} entries from {:?}", feed.feeds.len(), feed.channel.name);
//!
//! // Chart data for field 1
//! let loader = LineChartLoader::new(client, ChartConfig::default());
//! let chart = loader.load(9, 1, &FeedQuery::new()).await?;
//! for point in &chart.points {
//!     println!("{}ms: {}", point.offset, point.value);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! - [`ThingSpeakClient`] — Async HTTP client for channel, feed and status endpoints
//! - [`TalkBack`] — Handle on one TalkBack command queue
//! - [`LineChartLoader`] — Fetches a field feed and builds its [`LineChart`]
//! - [`build_line_chart`] — The pure transform, for feeds already in hand
//! - [`ChartConfig`] — Label formats, tick intervals and viewport dates
//!
//! ## Modules
//!
//! For lower-level access, the individual modules are also public:
//!
//! - [`client`] — HTTP client and its configuration
//! - [`talkback`] — TalkBack command queue operations
//! - [`query`] — Feed and channel listing parameters
//! - [`model`] — Channel, feed and command records
//! - [`chart`] — Chart configuration, assembly and loading
//! - [`series`] — Points, value bounds and axis ticks
//! - [`viewport`] — Maximum and default viewports
//! - [`error`] — Error types
//!
//! ## Features
//!
//! - `client` (default) — the HTTP client and TalkBack support. Without it the
//!   crate is the data model and chart transform only.

pub mod chart;
#[cfg(feature = "client")]
pub mod client;
pub mod error;
pub mod model;
pub mod query;
pub mod series;
#[cfg(feature = "client")]
pub mod talkback;
pub mod viewport;

// Re-export primary API types at crate root for convenience.
pub use chart::{ChartConfig, FeedSource, LineChart, LineChartLoader, build_line_chart};
#[cfg(feature = "client")]
pub use client::{ClientConfig, ThingSpeakClient};
pub use error::{Result, ThingFeedError};
pub use model::{Channel, ChannelFeed, Feed, FieldSlot};
pub use query::{FeedQuery, Timescale};
pub use series::{BuiltSeries, build_series};
#[cfg(feature = "client")]
pub use talkback::TalkBack;
pub use viewport::Viewport;
