//! Upstash Redis REST client

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::store::{KvOp, KvStore};
use crate::error::{BotError, Result};

/// One command reply from the REST API
#[derive(Debug, Deserialize)]
struct CommandReply {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<String>,
}

impl CommandReply {
    fn into_result(self) -> Result<Value> {
        match self.error {
            Some(error) => Err(BotError::Store(error)),
            None => Ok(self.result),
        }
    }
}

/// Store backed by Upstash Redis over HTTPS
#[derive(Debug, Clone)]
pub struct UpstashStore {
    base_url: String,
    token: String,
    client: reqwest::Client,
}

impl UpstashStore {
    pub fn new(base_url: &str, token: &str) -> Self {
        Self::with_client(base_url, token, reqwest::Client::new())
    }

    pub fn with_client(base_url: &str, token: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            client,
        }
    }

    /// Run a single command
    async fn command(&self, command: Vec<String>) -> Result<Value> {
        debug!("Upstash command: {}", command.first().map(String::as_str).unwrap_or(""));

        let response = self.client
            .post(&self.base_url)
            .bearer_auth(&self.token)
            .json(&command)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        let reply: CommandReply = serde_json::from_str(&body).map_err(|_| {
            BotError::Store(format!("unexpected Upstash response {}: {}", status, body))
        })?;
        reply.into_result()
    }

    /// Run commands inside MULTI/EXEC
    async fn multi_exec(&self, commands: Vec<Vec<String>>) -> Result<Vec<Value>> {
        debug!("Upstash transaction with {} commands", commands.len());

        let response = self.client
            .post(format!("{}/multi-exec", self.base_url))
            .bearer_auth(&self.token)
            .json(&commands)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        parse_multi_exec(status, &body)
    }
}

fn parse_multi_exec(status: reqwest::StatusCode, body: &str) -> Result<Vec<Value>> {
    let value: Value = serde_json::from_str(body).map_err(|_| {
        BotError::Store(format!("unexpected Upstash response {}: {}", status, body))
    })?;

    // a rejected transaction comes back as a single error object
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return Err(BotError::Store(error.to_string()));
    }

    let replies: Vec<CommandReply> = serde_json::from_value(value)?;
    replies.into_iter().map(CommandReply::into_result).collect()
}

/// HGETALL replies with a flat `[field, value, field, value, ...]` array
fn parse_hash(value: Value) -> Result<HashMap<String, String>> {
    match value {
        Value::Null => Ok(HashMap::new()),
        Value::Array(items) => {
            if items.len() % 2 != 0 {
                return Err(BotError::Store("HGETALL returned an odd number of items".into()));
            }
            let mut map = HashMap::with_capacity(items.len() / 2);
            let mut iter = items.into_iter();
            while let (Some(field), Some(value)) = (iter.next(), iter.next()) {
                map.insert(scalar_to_string(field)?, scalar_to_string(value)?);
            }
            Ok(map)
        }
        other => Err(BotError::Store(format!("HGETALL returned {}", other))),
    }
}

fn parse_members(value: Value) -> Result<Vec<String>> {
    match value {
        Value::Null => Ok(Vec::new()),
        Value::Array(items) => items.into_iter().map(scalar_to_string).collect(),
        other => Err(BotError::Store(format!("SMEMBERS returned {}", other))),
    }
}

fn scalar_to_string(value: Value) -> Result<String> {
    match value {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(BotError::Store(format!("expected a string, got {}", other))),
    }
}

#[async_trait]
impl KvStore for UpstashStore {
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let value = self.command(vec!["HGETALL".to_string(), key.to_string()]).await?;
        parse_hash(value)
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let value = self.command(vec!["SMEMBERS".to_string(), key.to_string()]).await?;
        parse_members(value)
    }

    async fn transaction(&self, ops: Vec<KvOp>) -> Result<()> {
        match ops.len() {
            0 => Ok(()),
            1 => self.command(ops[0].to_command()).await.map(|_| ()),
            _ => {
                let commands = ops.iter().map(KvOp::to_command).collect();
                self.multi_exec(commands).await.map(|_| ())
            }
        }
    }
}
