//! Request parameters for ThingSpeak feed queries.
//!
//! A [`FeedQuery`] is an immutable value describing which entries to fetch
//! from a channel: the read key for private channels, how many entries, the
//! date window, the timezone the API should report timestamps in, and an
//! optional timescale for server-side thinning.
//!
//! The API accepts two different parameter sets. Feed endpoints
//! (`feeds.json`, `fields/{n}.json`) take the full set produced by
//! [`FeedQuery::feed_params`]; single-entry and status endpoints only take the
//! key and timezone, produced by [`FeedQuery::entry_params`].
//!
//! # Example
//!
//! ```rust
//! use thingfeed::query::{FeedQuery, Timescale};
//!
//! let query = FeedQuery::new()
//!     .with_api_key("XXXXXXXXXXXXXXXX")
//!     .with_results(500)
//!     .with_timescale(Timescale::Minutes60);
//!
//! let params = query.feed_params();
//! assert!(params.contains(&("results", "500".to_string())));
//! assert!(params.contains(&("timescale", "60".to_string())));
//! ```

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::QueryError;

/// Number of entries requested when no count is configured.
pub const DEFAULT_RESULTS: u32 = 100;

/// Date format the API expects for `start` and `end`.
pub const REQUEST_DATE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Server-side thinning: return the first value in each window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Timescale {
    /// 10 minutes.
    Minutes10,
    /// 15 minutes.
    Minutes15,
    /// 20 minutes.
    Minutes20,
    /// 30 minutes.
    Minutes30,
    /// 1 hour.
    Minutes60,
    /// 4 hours.
    Minutes240,
    /// 12 hours.
    Minutes720,
    /// 24 hours.
    Minutes1440,
    /// Calendar days.
    Daily,
}

impl Timescale {
    /// Legacy numeric code for [`Timescale::Daily`].
    pub const DAILY_CODE: u32 = 9999;

    /// Converts a window length in minutes (or `9999` for daily).
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidTimescale`] for any other value.
    pub fn from_minutes(minutes: u32) -> Result<Self, QueryError> {
        match minutes {
            10 => Ok(Self::Minutes10),
            15 => Ok(Self::Minutes15),
            20 => Ok(Self::Minutes20),
            30 => Ok(Self::Minutes30),
            60 => Ok(Self::Minutes60),
            240 => Ok(Self::Minutes240),
            720 => Ok(Self::Minutes720),
            1440 => Ok(Self::Minutes1440),
            Self::DAILY_CODE => Ok(Self::Daily),
            value => Err(QueryError::InvalidTimescale { value }),
        }
    }

    /// Returns the value sent as the `timescale` query parameter.
    pub fn as_param(self) -> &'static str {
        match self {
            Self::Minutes10 => "10",
            Self::Minutes15 => "15",
            Self::Minutes20 => "20",
            Self::Minutes30 => "30",
            Self::Minutes60 => "60",
            Self::Minutes240 => "240",
            Self::Minutes720 => "720",
            Self::Minutes1440 => "1440",
            Self::Daily => "daily",
        }
    }
}

impl TryFrom<u32> for Timescale {
    type Error = QueryError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::from_minutes(value)
    }
}

impl FromStr for Timescale {
    type Err = QueryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("daily") {
            return Ok(Self::Daily);
        }
        let minutes: u32 = s.parse().map_err(|_| QueryError::UnknownTimescale {
            value: s.to_string(),
        })?;
        Self::from_minutes(minutes)
    }
}

impl fmt::Display for Timescale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_param())
    }
}

/// Options for fetching entries from a channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedQuery {
    /// Read API key, required for private channels.
    pub api_key: Option<String>,
    /// Number of entries to retrieve (the API caps this at 8000).
    pub results: u32,
    /// Number of 24-hour periods before now to include.
    pub days: Option<u32>,
    /// Earliest entry date.
    pub start: Option<DateTime<Utc>>,
    /// Latest entry date.
    pub end: Option<DateTime<Utc>>,
    /// IANA timezone identifier for returned timestamps.
    pub timezone: Option<String>,
    /// Server-side thinning window.
    pub timescale: Option<Timescale>,
}

impl Default for FeedQuery {
    fn default() -> Self {
        Self::new()
    }
}

impl FeedQuery {
    /// Creates a query for the latest [`DEFAULT_RESULTS`] entries of a public channel.
    pub fn new() -> Self {
        Self {
            api_key: None,
            results: DEFAULT_RESULTS,
            days: None,
            start: None,
            end: None,
            timezone: None,
            timescale: None,
        }
    }

    /// Sets the read API key.
    #[must_use]
    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Sets the number of entries to retrieve.
    #[must_use]
    pub fn with_results(mut self, results: u32) -> Self {
        self.results = results;
        self
    }

    /// Limits entries to the last `days` 24-hour periods.
    #[must_use]
    pub fn with_days(mut self, days: u32) -> Self {
        self.days = Some(days);
        self
    }

    /// Sets the earliest entry date.
    #[must_use]
    pub fn with_start(mut self, start: DateTime<Utc>) -> Self {
        self.start = Some(start);
        self
    }

    /// Sets the latest entry date.
    #[must_use]
    pub fn with_end(mut self, end: DateTime<Utc>) -> Self {
        self.end = Some(end);
        self
    }

    /// Sets the timezone the API reports timestamps in.
    #[must_use]
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = Some(timezone.into());
        self
    }

    /// Sets the server-side thinning window.
    #[must_use]
    pub fn with_timescale(mut self, timescale: Timescale) -> Self {
        self.timescale = Some(timescale);
        self
    }

    /// Checks that the date window is not inverted.
    ///
    /// # Errors
    ///
    /// Returns [`QueryError::InvalidDateRange`] if `start` is after `end`.
    pub fn validate(&self) -> Result<(), QueryError> {
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start > end
        {
            return Err(QueryError::InvalidDateRange {
                start: start.to_rfc3339(),
                end: end.to_rfc3339(),
            });
        }
        Ok(())
    }

    /// Parameters for feed endpoints (`feeds.json`, `fields/{n}.json`).
    pub fn feed_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(7);

        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        params.push(("results", self.results.to_string()));
        if let Some(days) = self.days {
            params.push(("days", days.to_string()));
        }
        if let Some(start) = self.start {
            params.push(("start", format_request_date(start)));
        }
        if let Some(end) = self.end {
            params.push(("end", format_request_date(end)));
        }
        if let Some(timezone) = &self.timezone {
            params.push(("timezone", timezone.clone()));
        }
        if let Some(timescale) = self.timescale {
            params.push(("timescale", timescale.as_param().to_string()));
        }

        params
    }

    /// Parameters for single-entry and status endpoints.
    pub fn entry_params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::with_capacity(2);

        if let Some(key) = &self.api_key {
            params.push(("api_key", key.clone()));
        }
        if let Some(timezone) = &self.timezone {
            params.push(("timezone", timezone.clone()));
        }

        params
    }
}

/// Filters for the public channel listing. Every filter is optional.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PublicChannelQuery {
    /// Page number.
    pub page: Option<u32>,
    /// Only channels with this tag.
    pub tag: Option<String>,
    /// Only channels owned by this user.
    pub username: Option<String>,
    /// Latitude of the search center.
    pub latitude: Option<f64>,
    /// Longitude of the search center.
    pub longitude: Option<f64>,
    /// Search radius in kilometers.
    pub distance: Option<f64>,
}

impl PublicChannelQuery {
    /// Creates an unfiltered query.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the page number.
    #[must_use]
    pub fn with_page(mut self, page: u32) -> Self {
        self.page = Some(page);
        self
    }

    /// Filters by tag.
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = Some(tag.into());
        self
    }

    /// Filters by owner.
    #[must_use]
    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Filters by distance from a point.
    #[must_use]
    pub fn with_location(mut self, latitude: f64, longitude: f64, distance: f64) -> Self {
        self.latitude = Some(latitude);
        self.longitude = Some(longitude);
        self.distance = Some(distance);
        self
    }

    /// Query parameters for `channels/public.json`.
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = Vec::new();
        if let Some(page) = self.page {
            params.push(("page", page.to_string()));
        }
        if let Some(tag) = &self.tag {
            params.push(("tag", tag.clone()));
        }
        if let Some(username) = &self.username {
            params.push(("username", username.clone()));
        }
        if let Some(latitude) = self.latitude {
            params.push(("latitude", latitude.to_string()));
        }
        if let Some(longitude) = self.longitude {
            params.push(("longitude", longitude.to_string()));
        }
        if let Some(distance) = self.distance {
            params.push(("distance", distance.to_string()));
        }
        params
    }
}

/// Formats a date the way the `start` and `end` parameters expect.
pub fn format_request_date(date: DateTime<Utc>) -> String {
    date.format(REQUEST_DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn param<'a>(params: &'a [(&'static str, String)], key: &str) -> Option<&'a str> {
        params
            .iter()
            .find(|(k, _)| *k == key)
            .map(|(_, v)| v.as_str())
    }

    #[test]
    fn test_timescale_codes() {
        for minutes in [10, 15, 20, 30, 60, 240, 720, 1440] {
            let timescale = Timescale::from_minutes(minutes).unwrap();
            assert_eq!(timescale.as_param(), minutes.to_string());
        }
        assert_eq!(Timescale::from_minutes(9999).unwrap(), Timescale::Daily);
        assert_eq!(Timescale::Daily.as_param(), "daily");
    }

    #[test]
    fn test_timescale_rejects_unknown() {
        assert_eq!(
            Timescale::try_from(45).unwrap_err(),
            QueryError::InvalidTimescale { value: 45 }
        );
        assert!(matches!(
            "hourly".parse::<Timescale>(),
            Err(QueryError::UnknownTimescale { .. })
        ));
        assert_eq!("Daily".parse::<Timescale>().unwrap(), Timescale::Daily);
        assert_eq!("240".parse::<Timescale>().unwrap(), Timescale::Minutes240);
    }

    #[test]
    fn test_default_feed_params() {
        let params = FeedQuery::new().feed_params();
        assert_eq!(params, vec![("results", "100".to_string())]);
        assert!(FeedQuery::new().entry_params().is_empty());
    }

    #[test]
    fn test_full_feed_params() {
        let start = Utc.with_ymd_and_hms(2015, 3, 1, 8, 0, 0).unwrap();
        let end = Utc.with_ymd_and_hms(2015, 3, 2, 20, 30, 5).unwrap();
        let query = FeedQuery::new()
            .with_api_key("KEY")
            .with_results(20)
            .with_days(2)
            .with_start(start)
            .with_end(end)
            .with_timezone("Asia/Hong_Kong")
            .with_timescale(Timescale::Daily);

        let params = query.feed_params();
        assert_eq!(params.len(), 7);
        assert_eq!(param(&params, "api_key"), Some("KEY"));
        assert_eq!(param(&params, "results"), Some("20"));
        assert_eq!(param(&params, "days"), Some("2"));
        assert_eq!(param(&params, "start"), Some("2015-03-01 08:00:00"));
        assert_eq!(param(&params, "end"), Some("2015-03-02 20:30:05"));
        assert_eq!(param(&params, "timezone"), Some("Asia/Hong_Kong"));
        assert_eq!(param(&params, "timescale"), Some("daily"));
    }

    #[test]
    fn test_entry_params_only_key_and_timezone() {
        let query = FeedQuery::new()
            .with_api_key("KEY")
            .with_results(20)
            .with_days(2)
            .with_timezone("Europe/London");

        let params = query.entry_params();
        assert_eq!(
            params,
            vec![
                ("api_key", "KEY".to_string()),
                ("timezone", "Europe/London".to_string()),
            ]
        );
    }

    #[test]
    fn test_validate_date_range() {
        let early = Utc.with_ymd_and_hms(2015, 3, 1, 0, 0, 0).unwrap();
        let late = Utc.with_ymd_and_hms(2015, 3, 2, 0, 0, 0).unwrap();

        assert!(FeedQuery::new().with_start(early).with_end(late).validate().is_ok());
        assert!(matches!(
            FeedQuery::new().with_start(late).with_end(early).validate(),
            Err(QueryError::InvalidDateRange { .. })
        ));
    }

    #[test]
    fn test_public_channel_params() {
        let params = PublicChannelQuery::new()
            .with_page(2)
            .with_tag("weather")
            .with_location(22.3, 114.2, 5.0)
            .params();

        assert_eq!(param(&params, "page"), Some("2"));
        assert_eq!(param(&params, "tag"), Some("weather"));
        assert_eq!(param(&params, "username"), None);
        assert_eq!(param(&params, "latitude"), Some("22.3"));
        assert_eq!(param(&params, "distance"), Some("5"));
    }
}
