//! TalkBack command queues.
//!
//! A TalkBack is a server-side queue of command strings that a device polls
//! and executes. [`TalkBack`] wraps the queue's CRUD endpoints. Each call is
//! one request; nothing is cached between calls.
//!
//! This module is only available when the `client` feature is enabled.

use reqwest::Method;

use crate::client::ThingSpeakClient;
use crate::error::{Result, TalkBackError};
use crate::model::TalkBackCommand;

/// Longest command string the API accepts, in characters.
pub const MAX_COMMAND_LENGTH: usize = 255;

/// Handle on one TalkBack queue.
#[derive(Debug, Clone)]
pub struct TalkBack {
    client: ThingSpeakClient,
    talkback_id: u64,
    api_key: String,
}

impl TalkBack {
    /// Creates a handle for the queue `talkback_id`, authenticated by `api_key`.
    pub fn new(client: ThingSpeakClient, talkback_id: u64, api_key: impl Into<String>) -> Self {
        Self {
            client,
            talkback_id,
            api_key: api_key.into(),
        }
    }

    /// Returns the queue ID.
    pub fn talkback_id(&self) -> u64 {
        self.talkback_id
    }

    /// Queues a command, optionally at a given position.
    ///
    /// # Errors
    ///
    /// Returns [`TalkBackError::CommandTooLong`] before any request if the
    /// command exceeds [`MAX_COMMAND_LENGTH`], or a client error.
    pub async fn add_command(&self, command: &str, position: Option<u32>) -> Result<TalkBackCommand> {
        let params = self.command_params(command, position)?;
        self.client
            .send(Method::POST, &self.commands_path(".json"), &params)
            .await
    }

    /// Retrieves one command.
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails or the command does not exist.
    pub async fn command(&self, command_id: u64) -> Result<TalkBackCommand> {
        self.client
            .send(
                Method::GET,
                &self.commands_path(&format!("/{command_id}.json")),
                &self.key_params(),
            )
            .await
    }

    /// Replaces the text and position of a command.
    ///
    /// # Errors
    ///
    /// Returns [`TalkBackError::CommandTooLong`] before any request if the
    /// command exceeds [`MAX_COMMAND_LENGTH`], or a client error.
    pub async fn update_command(
        &self,
        command_id: u64,
        command: &str,
        position: Option<u32>,
    ) -> Result<TalkBackCommand> {
        let params = self.command_params(command, position)?;
        self.client
            .send(
                Method::PUT,
                &self.commands_path(&format!("/{command_id}.json")),
                &params,
            )
            .await
    }

    /// Moves the first queued command whose text equals `command`.
    ///
    /// Lists the queue to find the command ID, then updates it.
    ///
    /// # Errors
    ///
    /// Returns [`TalkBackError::CommandNotFound`] if no command matches, or
    /// any error from listing or updating.
    pub async fn update_command_by_string(
        &self,
        command: &str,
        position: Option<u32>,
    ) -> Result<TalkBackCommand> {
        let commands = self.list_commands().await?;
        let Some(existing) = commands.iter().find(|c| c.command_string == command) else {
            return Err(TalkBackError::CommandNotFound {
                talkback_id: self.talkback_id,
                command: command.to_string(),
            }
            .into());
        };
        self.update_command(existing.id, command, position).await
    }

    /// Pops and returns the next command in the queue.
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails or the body does not decode.
    pub async fn execute_next(&self) -> Result<TalkBackCommand> {
        self.client
            .send(
                Method::POST,
                &self.commands_path("/execute.json"),
                &self.key_params(),
            )
            .await
    }

    /// Retrieves the most recently executed command.
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails or the body does not decode.
    pub async fn last_executed(&self) -> Result<TalkBackCommand> {
        self.client
            .send(
                Method::GET,
                &self.commands_path("/last.json"),
                &self.key_params(),
            )
            .await
    }

    /// Deletes one command and returns it.
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails or the command does not exist.
    pub async fn delete_command(&self, command_id: u64) -> Result<TalkBackCommand> {
        self.client
            .send(
                Method::DELETE,
                &self.commands_path(&format!("/{command_id}.json")),
                &self.key_params(),
            )
            .await
    }

    /// Lists every command in the queue.
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails or the body does not decode.
    pub async fn list_commands(&self) -> Result<Vec<TalkBackCommand>> {
        self.client
            .send(Method::GET, &self.commands_path(".json"), &self.key_params())
            .await
    }

    /// Deletes every command and returns what the server reports as remaining
    /// (empty on success).
    ///
    /// # Errors
    ///
    /// Returns a client error if the request fails or the body does not decode.
    pub async fn delete_all_commands(&self) -> Result<Vec<TalkBackCommand>> {
        let remaining: Vec<TalkBackCommand> = self
            .client
            .send(Method::DELETE, &self.commands_path(".json"), &self.key_params())
            .await?;
        if !remaining.is_empty() {
            tracing::warn!(
                talkback_id = self.talkback_id,
                remaining = remaining.len(),
                "commands left after delete all"
            );
        }
        Ok(remaining)
    }

    fn commands_path(&self, suffix: &str) -> String {
        format!("/talkbacks/{}/commands{suffix}", self.talkback_id)
    }

    fn key_params(&self) -> Vec<(&'static str, String)> {
        vec![("api_key", self.api_key.clone())]
    }

    fn command_params(
        &self,
        command: &str,
        position: Option<u32>,
    ) -> std::result::Result<Vec<(&'static str, String)>, TalkBackError> {
        let length = command.chars().count();
        if length > MAX_COMMAND_LENGTH {
            return Err(TalkBackError::CommandTooLong {
                length,
                max: MAX_COMMAND_LENGTH,
            });
        }

        let mut params = self.key_params();
        params.push(("command_string", command.to_string()));
        if let Some(position) = position {
            params.push(("position", position.to_string()));
        }
        Ok(params)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::ClientConfig;

    fn talkback() -> TalkBack {
        let client = ThingSpeakClient::new(ClientConfig::new("http://127.0.0.1:9")).unwrap();
        TalkBack::new(client, 77, "TBKEY")
    }

    #[test]
    fn test_paths() {
        let tb = talkback();
        assert_eq!(tb.commands_path(".json"), "/talkbacks/77/commands.json");
        assert_eq!(tb.commands_path("/12.json"), "/talkbacks/77/commands/12.json");
        assert_eq!(tb.talkback_id(), 77);
    }

    #[test]
    fn test_command_params() {
        let tb = talkback();
        let params = tb.command_params("OPENDOOR", Some(3)).unwrap();
        assert_eq!(
            params,
            vec![
                ("api_key", "TBKEY".to_string()),
                ("command_string", "OPENDOOR".to_string()),
                ("position", "3".to_string()),
            ]
        );

        let params = tb.command_params("OPENDOOR", None).unwrap();
        assert_eq!(params.len(), 2);
    }

    #[test]
    fn test_command_length_counts_characters() {
        let tb = talkback();
        assert!(tb.command_params(&"é".repeat(MAX_COMMAND_LENGTH), None).is_ok());
        assert_eq!(
            tb.command_params(&"a".repeat(MAX_COMMAND_LENGTH + 1), None)
                .unwrap_err(),
            TalkBackError::CommandTooLong {
                length: 256,
                max: 255
            }
        );
    }
}
