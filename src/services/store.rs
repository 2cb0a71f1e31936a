//! Key-value store interface holding timer records and the active set

use std::collections::HashMap;

use async_trait::async_trait;

use crate::error::Result;

/// A single write against the store
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KvOp {
    /// Delete a key of any type
    Del { key: String },
    /// Merge fields into a hash, creating it if needed
    HSet { key: String, fields: Vec<(String, String)> },
    /// Add a member to a set
    SAdd { key: String, member: String },
    /// Remove a member from a set
    SRem { key: String, member: String },
}

impl KvOp {
    pub fn del(key: impl Into<String>) -> Self {
        KvOp::Del { key: key.into() }
    }

    pub fn hset(key: impl Into<String>, fields: Vec<(String, String)>) -> Self {
        KvOp::HSet { key: key.into(), fields }
    }

    pub fn sadd(key: impl Into<String>, member: impl Into<String>) -> Self {
        KvOp::SAdd { key: key.into(), member: member.into() }
    }

    pub fn srem(key: impl Into<String>, member: impl Into<String>) -> Self {
        KvOp::SRem { key: key.into(), member: member.into() }
    }

    /// Redis command form, e.g. `["SADD", "timers:agents", "1555"]`
    pub fn to_command(&self) -> Vec<String> {
        match self {
            KvOp::Del { key } => vec!["DEL".to_string(), key.clone()],
            KvOp::HSet { key, fields } => {
                let mut cmd = Vec::with_capacity(2 + fields.len() * 2);
                cmd.push("HSET".to_string());
                cmd.push(key.clone());
                for (field, value) in fields {
                    cmd.push(field.clone());
                    cmd.push(value.clone());
                }
                cmd
            }
            KvOp::SAdd { key, member } => vec!["SADD".to_string(), key.clone(), member.clone()],
            KvOp::SRem { key, member } => vec!["SREM".to_string(), key.clone(), member.clone()],
        }
    }
}

/// Storage backend for timer state.
///
/// `transaction` applies every op or none of them, so a record update and its
/// set membership change are never observed apart.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// All fields of a hash; empty when the key does not exist
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>>;

    /// All members of a set; empty when the key does not exist
    async fn smembers(&self, key: &str) -> Result<Vec<String>>;

    /// Apply the ops atomically, in order
    async fn transaction(&self, ops: Vec<KvOp>) -> Result<()>;

    async fn hset(&self, key: &str, fields: Vec<(String, String)>) -> Result<()> {
        self.transaction(vec![KvOp::hset(key, fields)]).await
    }
}
