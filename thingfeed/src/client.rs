//! HTTP client for the ThingSpeak REST API.
//!
//! Every operation is one request and one typed result. There is no retry,
//! caching or request coalescing: two concurrent calls are two independent
//! futures that complete in whatever order the server answers.
//!
//! This module is only available when the `client` feature is enabled.
//!
//! # Example
//!
//! ```rust,no_run
//! use thingfeed::client::{ClientConfig, ThingSpeakClient};
//! use thingfeed::query::FeedQuery;
//!
//! # async fn run() -> Result<(), Box<dyn std::error::Error>> {
//! let client = ThingSpeakClient::new(ClientConfig::default())?;
//!
//! let feed = client.channel_feed(9, &FeedQuery::new().with_results(10)).await?;
//! for entry in &feed.feeds {
//!     println!("{} {:?}", entry.created_at, entry.field1);
//! }
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

use reqwest::Method;
use serde::de::DeserializeOwned;

use crate::chart::FeedSource;
use crate::error::{ClientError, Result};
use crate::model::{Channel, ChannelFeed, Feed, FieldSlot, PublicChannels, StatusUpdates};
use crate::query::{FeedQuery, PublicChannelQuery};

/// Public ThingSpeak API endpoint.
pub const DEFAULT_BASE_URL: &str = "https://api.thingspeak.com";

/// Configuration for a [`ThingSpeakClient`].
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.thingspeak.com`.
    pub base_url: String,
    /// HTTP timeout per request.
    pub timeout: Duration,
    /// Extra HTTP headers sent with every request.
    pub headers: Vec<(String, String)>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl ClientConfig {
    /// Creates a config for the given API root with a 30s timeout.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            timeout: Duration::from_secs(30),
            headers: Vec::new(),
        }
    }

    /// Adds an HTTP header sent with every request.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the HTTP timeout.
    #[must_use]
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// Client for channel, feed and status endpoints.
///
/// Cheap to clone; clones share the connection pool.
#[derive(Debug, Clone)]
pub struct ThingSpeakClient {
    http: reqwest::Client,
    base_url: String,
    headers: Vec<(String, String)>,
}

impl ThingSpeakClient {
    /// Creates a client.
    ///
    /// # Errors
    ///
    /// Returns [`ClientError::InvalidUrl`] if `base_url` does not parse and
    /// [`ClientError::ClientCreate`] if the HTTP client cannot be built.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let base_url = config.base_url.trim_end_matches('/').to_string();
        reqwest::Url::parse(&base_url).map_err(|e| ClientError::InvalidUrl {
            url: config.base_url.clone(),
            reason: e.to_string(),
        })?;

        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("thingfeed/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ClientError::ClientCreate { source: e })?;

        Ok(Self {
            http,
            base_url,
            headers: config.headers,
        })
    }

    /// Returns the API root this client talks to.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Retrieves entries of a channel (`GET /channels/{id}/feeds.json`).
    ///
    /// # Errors
    ///
    /// Returns a query error for an inverted date range, or a client error
    /// if the request fails, the server rejects it, or the body does not decode.
    pub async fn channel_feed(&self, channel_id: u64, query: &FeedQuery) -> Result<ChannelFeed> {
        query.validate()?;
        self.get(&format!("/channels/{channel_id}/feeds.json"), &query.feed_params())
            .await
    }

    /// Retrieves the most recent entry (`GET /channels/{id}/feeds/last.json`).
    ///
    /// Only the API key and timezone of `query` are sent.
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails, the server rejects it,
    /// or the body does not decode.
    pub async fn last_entry(&self, channel_id: u64, query: &FeedQuery) -> Result<Feed> {
        self.get(
            &format!("/channels/{channel_id}/feeds/last.json"),
            &query.entry_params(),
        )
        .await
    }

    /// Retrieves one entry by ID (`GET /channels/{id}/feeds/{entry}.json`).
    ///
    /// Only the API key and timezone of `query` are sent.
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails, the server rejects it,
    /// or the body does not decode.
    pub async fn entry(&self, channel_id: u64, entry_id: u64, query: &FeedQuery) -> Result<Feed> {
        self.get(
            &format!("/channels/{channel_id}/feeds/{entry_id}.json"),
            &query.entry_params(),
        )
        .await
    }

    /// Retrieves entries of one field (`GET /channels/{id}/fields/{field}.json`).
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidField`](crate::error::ChartError::InvalidField)
    /// before any request if `field` is outside `1..=8`, a query error for an
    /// inverted date range, or a client error as for [`Self::channel_feed`].
    pub async fn field_feed(
        &self,
        channel_id: u64,
        field: u32,
        query: &FeedQuery,
    ) -> Result<ChannelFeed> {
        let slot = FieldSlot::new(field)?;
        query.validate()?;
        self.get(
            &format!("/channels/{channel_id}/fields/{}.json", slot.get()),
            &query.feed_params(),
        )
        .await
    }

    /// Retrieves status updates (`GET /channels/{id}/status.json`).
    ///
    /// Only the API key and timezone of `query` are sent.
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails, the server rejects it,
    /// or the body does not decode.
    pub async fn status_updates(&self, channel_id: u64, query: &FeedQuery) -> Result<StatusUpdates> {
        self.get(
            &format!("/channels/{channel_id}/status.json"),
            &query.entry_params(),
        )
        .await
    }

    /// Lists public channels (`GET /channels/public.json`).
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails, the server rejects it,
    /// or the body does not decode.
    pub async fn public_channels(&self, query: &PublicChannelQuery) -> Result<PublicChannels> {
        self.get("/channels/public.json", &query.params()).await
    }

    /// Lists the channels of the account owning `api_key` (`GET /channels.json`).
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails, the server rejects it,
    /// or the body does not decode.
    pub async fn my_channels(&self, api_key: &str) -> Result<Vec<Channel>> {
        self.get("/channels.json", &[("api_key", api_key.to_string())])
            .await
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &[(&str, String)]) -> Result<T> {
        self.send(Method::GET, path, params).await
    }

    /// Sends one request and decodes the JSON body.
    ///
    /// `params` are sent as the query string for every method, which is how
    /// the API takes arguments on POST, PUT and DELETE as well.
    pub(crate) async fn send<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, String)],
    ) -> Result<T> {
        let url = format!("{}{path}", self.base_url);

        // Parameters are not logged: they may carry API keys.
        tracing::debug!(%method, path, "sending request");

        let mut request = self.http.request(method, &url).query(params);
        for (name, value) in &self.headers {
            request = request.header(name, value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| ClientError::RequestFailed {
                endpoint: path.to_string(),
                source: e,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::warn!(path, status = status.as_u16(), "request rejected");
            return Err(ClientError::HttpStatus {
                endpoint: path.to_string(),
                status: status.as_u16(),
                body,
            }
            .into());
        }

        let body = response
            .text()
            .await
            .map_err(|e| ClientError::RequestFailed {
                endpoint: path.to_string(),
                source: e,
            })?;

        serde_json::from_str(&body)
            .map_err(|e| {
                ClientError::Decode {
                    endpoint: path.to_string(),
                    source: e,
                }
            })
            .map_err(Into::into)
    }
}

impl FeedSource for ThingSpeakClient {
    async fn fetch_field_feed(
        &self,
        channel_id: u64,
        field: FieldSlot,
        query: &FeedQuery,
    ) -> Result<ChannelFeed> {
        self.field_feed(channel_id, field.get(), query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ThingFeedError;
    use crate::error::ChartError;

    #[test]
    fn test_config_builder() {
        let config = ClientConfig::new("http://example.com")
            .with_header("X-Test", "1")
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.base_url, "http://example.com");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.headers, vec![("X-Test".to_string(), "1".to_string())]);
    }

    #[test]
    fn test_default_config() {
        let config = ClientConfig::default();
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(config.headers.is_empty());
    }

    #[test]
    fn test_trailing_slash_trimmed() {
        let client = ThingSpeakClient::new(ClientConfig::new("http://localhost:3000/")).unwrap();
        assert_eq!(client.base_url(), "http://localhost:3000");
    }

    #[test]
    fn test_invalid_base_url() {
        let result = ThingSpeakClient::new(ClientConfig::new("not a url"));
        assert!(matches!(
            result,
            Err(ThingFeedError::Client(ClientError::InvalidUrl { .. }))
        ));
    }

    #[tokio::test]
    async fn test_field_feed_rejects_slot_before_request() {
        // Nothing listens on this port; a request would fail differently.
        let client = ThingSpeakClient::new(ClientConfig::new("http://127.0.0.1:9")).unwrap();
        let result = client.field_feed(1, 0, &FeedQuery::new()).await;
        assert!(matches!(
            result,
            Err(ThingFeedError::Chart(ChartError::InvalidField { field: 0 }))
        ));
    }
}
