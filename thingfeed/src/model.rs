//! Response models for the ThingSpeak REST API.
//!
//! Field names follow the API's snake_case JSON keys, so the structs derive
//! `Deserialize` without renames. Optional keys missing from a response are
//! defaulted rather than rejected: the API omits most channel metadata
//! outside the "list channels" endpoints.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::ChartError;

/// Number of data fields a ThingSpeak channel carries.
pub const FIELD_COUNT: u32 = 8;

/// A validated 1-based field index (`1..=8`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct FieldSlot(u32);

impl FieldSlot {
    /// Creates a field slot, rejecting anything outside `1..=8`.
    ///
    /// # Errors
    ///
    /// Returns [`ChartError::InvalidField`] if `field` is 0 or greater than 8.
    pub fn new(field: u32) -> Result<Self, ChartError> {
        if (1..=FIELD_COUNT).contains(&field) {
            Ok(Self(field))
        } else {
            Err(ChartError::InvalidField { field })
        }
    }

    /// Returns the 1-based slot number.
    pub fn get(self) -> u32 {
        self.0
    }

    fn index(self) -> usize {
        (self.0 - 1) as usize
    }
}

impl TryFrom<u32> for FieldSlot {
    type Error = ChartError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl fmt::Display for FieldSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "field{}", self.0)
    }
}

/// Basic information about a ThingSpeak channel.
///
/// `ranking`, `tags` and `username` are only present in the public and
/// "my channels" listings; `metadata` and `api_keys` only in the latter.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Channel {
    /// Channel ID.
    pub id: u64,
    /// Channel name.
    pub name: Option<String>,
    /// Channel description.
    pub description: Option<String>,
    /// Latitude in degrees.
    #[serde(deserialize_with = "lenient_text")]
    pub latitude: Option<String>,
    /// Longitude in degrees.
    #[serde(deserialize_with = "lenient_text")]
    pub longitude: Option<String>,
    /// Elevation in meters.
    #[serde(deserialize_with = "lenient_text")]
    pub elevation: Option<String>,
    /// Display name of field 1.
    pub field1: Option<String>,
    /// Display name of field 2.
    pub field2: Option<String>,
    /// Display name of field 3.
    pub field3: Option<String>,
    /// Display name of field 4.
    pub field4: Option<String>,
    /// Display name of field 5.
    pub field5: Option<String>,
    /// Display name of field 6.
    pub field6: Option<String>,
    /// Display name of field 7.
    pub field7: Option<String>,
    /// Display name of field 8.
    pub field8: Option<String>,
    /// When the channel was created.
    pub created_at: Option<DateTime<Utc>>,
    /// When the channel was last updated.
    pub updated_at: Option<DateTime<Utc>>,
    /// ID of the most recent feed entry.
    pub last_entry_id: Option<u64>,
    /// Channel ranking.
    pub ranking: Option<u32>,
    /// Free-form channel metadata.
    pub metadata: Option<String>,
    /// Tags attached to the channel.
    pub tags: Vec<Tag>,
    /// Owner of the channel.
    pub username: Option<String>,
    /// API keys of the channel.
    pub api_keys: Vec<ApiKey>,
}

impl Channel {
    /// Returns the display names of all eight fields, field 1 first.
    pub fn field_names(&self) -> [Option<&str>; 8] {
        [
            self.field1.as_deref(),
            self.field2.as_deref(),
            self.field3.as_deref(),
            self.field4.as_deref(),
            self.field5.as_deref(),
            self.field6.as_deref(),
            self.field7.as_deref(),
            self.field8.as_deref(),
        ]
    }

    /// Returns the display name of one field.
    pub fn field_name(&self, slot: FieldSlot) -> Option<&str> {
        self.field_names()[slot.index()]
    }
}

/// A channel API key.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiKey {
    /// The key itself.
    pub api_key: String,
    /// `true` for a write key, `false` for a read key.
    pub write_flag: bool,
}

/// A channel tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Tag {
    /// Tag ID.
    pub id: u64,
    /// Tag name.
    pub name: String,
}

/// One entry of a channel feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feed {
    /// When the entry was written.
    pub created_at: DateTime<Utc>,
    /// Sequential entry ID within the channel.
    #[serde(default)]
    pub entry_id: u64,
    /// Value of field 1.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field1: Option<String>,
    /// Value of field 2.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field2: Option<String>,
    /// Value of field 3.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field3: Option<String>,
    /// Value of field 4.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field4: Option<String>,
    /// Value of field 5.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field5: Option<String>,
    /// Value of field 6.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field6: Option<String>,
    /// Value of field 7.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field7: Option<String>,
    /// Value of field 8.
    #[serde(default, deserialize_with = "lenient_text")]
    pub field8: Option<String>,
}

impl Feed {
    /// Creates an entry with no field values.
    pub fn new(entry_id: u64, created_at: DateTime<Utc>) -> Self {
        Self {
            created_at,
            entry_id,
            field1: None,
            field2: None,
            field3: None,
            field4: None,
            field5: None,
            field6: None,
            field7: None,
            field8: None,
        }
    }

    /// Sets the value of one field.
    #[must_use]
    pub fn with_field(mut self, slot: FieldSlot, value: impl Into<String>) -> Self {
        *self.field_mut(slot) = Some(value.into());
        self
    }

    /// Returns the values of all eight fields, field 1 first.
    pub fn fields(&self) -> [Option<&str>; 8] {
        [
            self.field1.as_deref(),
            self.field2.as_deref(),
            self.field3.as_deref(),
            self.field4.as_deref(),
            self.field5.as_deref(),
            self.field6.as_deref(),
            self.field7.as_deref(),
            self.field8.as_deref(),
        ]
    }

    /// Returns the value of one field.
    pub fn field(&self, slot: FieldSlot) -> Option<&str> {
        self.fields()[slot.index()]
    }

    fn field_mut(&mut self, slot: FieldSlot) -> &mut Option<String> {
        match slot.get() {
            1 => &mut self.field1,
            2 => &mut self.field2,
            3 => &mut self.field3,
            4 => &mut self.field4,
            5 => &mut self.field5,
            6 => &mut self.field6,
            7 => &mut self.field7,
            _ => &mut self.field8,
        }
    }
}

/// A channel together with some of its feed entries.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelFeed {
    /// The channel the entries belong to.
    pub channel: Channel,
    /// Feed entries, oldest first.
    pub feeds: Vec<Feed>,
}

/// One entry of a channel's status feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusFeed {
    /// When the status was written.
    pub created_at: DateTime<Utc>,
    /// Sequential entry ID within the channel.
    #[serde(default)]
    pub entry_id: u64,
    /// The status message.
    #[serde(default)]
    pub status: Option<String>,
}

/// Status updates of a channel.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StatusUpdates {
    /// The channel the statuses belong to.
    pub channel: Channel,
    /// Status entries, oldest first.
    pub feeds: Vec<StatusFeed>,
}

/// Paging information for the public channel listing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Pagination {
    /// The page returned.
    pub current_page: u32,
    /// Channels per page.
    pub per_page: u32,
    /// Total matching channels.
    pub total_entries: u64,
}

/// One page of public channels.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PublicChannels {
    /// Paging information, when the API includes it.
    pub pagination: Option<Pagination>,
    /// The channels on this page.
    pub channels: Vec<Channel>,
}

/// A command in a TalkBack queue.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TalkBackCommand {
    /// Command ID.
    pub id: u64,
    /// The command text sent to the device.
    pub command_string: String,
    /// Queue position; absent once the command has been executed.
    #[serde(default)]
    pub position: Option<u32>,
    /// When the command was queued.
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// When the command was executed.
    #[serde(default)]
    pub executed_at: Option<DateTime<Utc>>,
}

/// Accepts strings, numbers and booleans as text. Feed values are strings on
/// the wire, but channels written through some gateways report numbers.
fn lenient_text<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => None,
        Some(serde_json::Value::String(s)) => Some(s),
        Some(other) => Some(other.to_string()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn slot(n: u32) -> FieldSlot {
        FieldSlot::new(n).unwrap()
    }

    #[test]
    fn test_field_slot_bounds() {
        assert!(FieldSlot::new(1).is_ok());
        assert!(FieldSlot::new(8).is_ok());
        assert_eq!(
            FieldSlot::new(0).unwrap_err(),
            ChartError::InvalidField { field: 0 }
        );
        assert_eq!(
            FieldSlot::try_from(9).unwrap_err(),
            ChartError::InvalidField { field: 9 }
        );
        assert_eq!(slot(3).to_string(), "field3");
    }

    #[test]
    fn test_decode_channel_feed() {
        let json = r#"{
            "channel": {
                "id": 9,
                "name": "my_house",
                "description": "Netduino Plus connected to sensors around the house",
                "latitude": "40.44",
                "longitude": "-79.996",
                "field1": "Light",
                "field2": "Outside Temperature",
                "created_at": "2010-12-13T20:20:06Z",
                "updated_at": "2014-02-26T12:43:04Z",
                "last_entry_id": 6060625
            },
            "feeds": [
                {"created_at": "2014-02-26T12:42:49Z", "entry_id": 6060624, "field1": "188", "field2": "25.902335456475583"},
                {"created_at": "2014-02-26T12:43:04Z", "entry_id": 6060625, "field1": "164", "field2": null}
            ]
        }"#;

        let feed: ChannelFeed = serde_json::from_str(json).unwrap();
        assert_eq!(feed.channel.id, 9);
        assert_eq!(feed.channel.field_name(slot(1)), Some("Light"));
        assert_eq!(feed.channel.field_name(slot(3)), None);
        assert_eq!(feed.channel.last_entry_id, Some(6_060_625));
        assert!(feed.channel.tags.is_empty());

        assert_eq!(feed.feeds.len(), 2);
        assert_eq!(feed.feeds[0].field(slot(2)), Some("25.902335456475583"));
        assert_eq!(feed.feeds[1].field(slot(2)), None);
        assert_eq!(feed.feeds[1].entry_id, 6_060_625);
    }

    #[test]
    fn test_decode_timezone_offsets_to_utc() {
        let json = r#"{"created_at": "2014-02-26T20:42:49+08:00", "entry_id": 1, "field1": "1"}"#;
        let entry: Feed = serde_json::from_str(json).unwrap();
        assert_eq!(entry.created_at.to_rfc3339(), "2014-02-26T12:42:49+00:00");
    }

    #[test]
    fn test_numeric_field_values_kept_as_text() {
        let json = r#"{"created_at": "2014-02-26T12:42:49Z", "entry_id": 1, "field1": 21.5, "field2": 3}"#;
        let entry: Feed = serde_json::from_str(json).unwrap();
        assert_eq!(entry.field(slot(1)), Some("21.5"));
        assert_eq!(entry.field(slot(2)), Some("3"));
    }

    #[test]
    fn test_decode_my_channels_listing() {
        let json = r#"[{
            "id": 4,
            "name": "Channel A",
            "ranking": 40,
            "metadata": "",
            "username": "hans",
            "tags": [{"id": 9, "name": "temp"}],
            "api_keys": [{"api_key": "XXXXXXXXXXXXXXXX", "write_flag": true}],
            "latitude": 0.0
        }]"#;

        let channels: Vec<Channel> = serde_json::from_str(json).unwrap();
        assert_eq!(channels[0].ranking, Some(40));
        assert_eq!(channels[0].tags[0].name, "temp");
        assert!(channels[0].api_keys[0].write_flag);
        assert_eq!(channels[0].latitude.as_deref(), Some("0.0"));
    }

    #[test]
    fn test_decode_talkback_command() {
        let json = r#"{"id": 2, "command_string": "OPENDOOR", "position": null,
            "executed_at": "2014-03-11T17:40:10Z", "created_at": "2014-03-11T17:30:02Z"}"#;
        let command: TalkBackCommand = serde_json::from_str(json).unwrap();
        assert_eq!(command.command_string, "OPENDOOR");
        assert_eq!(command.position, None);
        assert!(command.executed_at.is_some());
    }

    #[test]
    fn test_with_field_sets_slot() {
        let entry = Feed::new(1, DateTime::<Utc>::UNIX_EPOCH)
            .with_field(slot(8), "4.5")
            .with_field(slot(1), "x");
        assert_eq!(entry.fields()[7], Some("4.5"));
        assert_eq!(entry.field(slot(1)), Some("x"));
        assert_eq!(entry.field(slot(2)), None);
    }
}
