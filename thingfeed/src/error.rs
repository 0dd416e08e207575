//! Error types for the thingfeed ThingSpeak client and chart transform.

use thiserror::Error;

/// The main error type for all thingfeed operations.
///
/// Each variant wraps the error enum of one concern: building charts,
/// validating request parameters, talking to the REST API, and managing
/// TalkBack command queues.
#[derive(Error, Debug)]
pub enum ThingFeedError {
    /// Error while turning a feed into chart data.
    #[error("chart error: {0}")]
    Chart(#[from] ChartError),

    /// Error in request parameters, detected before anything is sent.
    #[error("query error: {0}")]
    Query(#[from] QueryError),

    /// Error during an HTTP exchange with the ThingSpeak API.
    #[cfg(feature = "client")]
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// Error specific to TalkBack command queue operations.
    #[cfg(feature = "client")]
    #[error("talkback error: {0}")]
    TalkBack(#[from] TalkBackError),
}

/// Errors that can occur while building line chart data from a feed.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ChartError {
    /// The feed contained no entries.
    #[error("feed contains no entries")]
    EmptyFeed,

    /// The field slot is outside `1..=8`.
    #[error("invalid field slot {field}: must be between 1 and 8")]
    InvalidField {
        /// The rejected field slot.
        field: u32,
    },

    /// The chart configuration cannot be used.
    #[error("invalid chart configuration: {reason}")]
    InvalidConfig {
        /// Description of what is wrong with the configuration.
        reason: String,
    },
}

/// Errors in request parameters.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// The timescale is not one accepted by the API.
    #[error("invalid timescale {value}: expected 10, 15, 20, 30, 60, 240, 720, 1440 or 9999 (daily)")]
    InvalidTimescale {
        /// The rejected timescale value.
        value: u32,
    },

    /// The timescale name could not be parsed.
    #[error("unrecognised timescale '{value}'")]
    UnknownTimescale {
        /// The rejected input.
        value: String,
    },

    /// The requested date range ends before it starts.
    #[error("invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// The configured start date.
        start: String,
        /// The configured end date.
        end: String,
    },
}

/// Errors that can occur while talking to the ThingSpeak REST API.
#[cfg(feature = "client")]
#[derive(Error, Debug)]
pub enum ClientError {
    /// Failed to create the HTTP client.
    #[error("failed to create HTTP client: {source}")]
    ClientCreate {
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// The configured base URL or a derived endpoint is not a valid URL.
    #[error("invalid URL '{url}': {reason}")]
    InvalidUrl {
        /// The rejected URL.
        url: String,
        /// Why it was rejected.
        reason: String,
    },

    /// The HTTP request could not be completed.
    #[error("HTTP request to {endpoint} failed: {source}")]
    RequestFailed {
        /// The endpoint path that was requested.
        endpoint: String,
        /// The underlying reqwest error.
        #[source]
        source: reqwest::Error,
    },

    /// Server returned a non-2xx status.
    #[error("server returned status {status} for {endpoint}: {body}")]
    HttpStatus {
        /// The endpoint path that was requested.
        endpoint: String,
        /// The HTTP status code.
        status: u16,
        /// The response body text.
        body: String,
    },

    /// The response body could not be decoded into the expected model.
    #[error("failed to decode response from {endpoint}: {source}")]
    Decode {
        /// The endpoint path that was requested.
        endpoint: String,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },
}

/// Errors specific to TalkBack command queue operations.
#[cfg(feature = "client")]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TalkBackError {
    /// The command string exceeds the API's length limit.
    #[error("command is {length} characters long (max {max})")]
    CommandTooLong {
        /// Length of the rejected command in characters.
        length: usize,
        /// The maximum allowed length.
        max: usize,
    },

    /// No queued command has the given command string.
    #[error("no command matching '{command}' in talkback {talkback_id}")]
    CommandNotFound {
        /// The TalkBack that was searched.
        talkback_id: u64,
        /// The command string that was looked up.
        command: String,
    },
}

/// Type alias for `Result<T, ThingFeedError>`.
pub type Result<T> = std::result::Result<T, ThingFeedError>;
