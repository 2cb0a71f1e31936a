//! In-process store used for local runs and tests

use std::collections::{BTreeSet, HashMap};

use async_trait::async_trait;
use tokio::sync::Mutex;

use super::store::{KvOp, KvStore};
use crate::error::Result;

#[derive(Debug, Default)]
struct Inner {
    hashes: HashMap<String, HashMap<String, String>>,
    sets: HashMap<String, BTreeSet<String>>,
}

impl Inner {
    fn apply(&mut self, op: KvOp) {
        match op {
            KvOp::Del { key } => {
                self.hashes.remove(&key);
                self.sets.remove(&key);
            }
            KvOp::HSet { key, fields } => {
                self.hashes.entry(key).or_default().extend(fields);
            }
            KvOp::SAdd { key, member } => {
                self.sets.entry(key).or_default().insert(member);
            }
            KvOp::SRem { key, member } => {
                if let Some(set) = self.sets.get_mut(&key) {
                    set.remove(&member);
                    if set.is_empty() {
                        self.sets.remove(&key);
                    }
                }
            }
        }
    }
}

/// Store backed by a mutex-guarded map. State is lost on restart.
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: Mutex<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn hgetall(&self, key: &str) -> Result<HashMap<String, String>> {
        let inner = self.inner.lock().await;
        Ok(inner.hashes.get(key).cloned().unwrap_or_default())
    }

    async fn smembers(&self, key: &str) -> Result<Vec<String>> {
        let inner = self.inner.lock().await;
        Ok(inner
            .sets
            .get(key)
            .map(|set| set.iter().cloned().collect())
            .unwrap_or_default())
    }

    async fn transaction(&self, ops: Vec<KvOp>) -> Result<()> {
        let mut inner = self.inner.lock().await;
        for op in ops {
            inner.apply(op);
        }
        Ok(())
    }
}
