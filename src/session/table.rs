//! Sharded session table.
//!
//! Lookups from many boundary tasks only contend with writers on the same
//! shard. Each shard is a short-held `RwLock` around a map of `Arc<Session>`;
//! the session's own lock is never taken while a shard lock is held.

use std::hash::{Hash, Hasher};
use std::sync::Arc;

use hashbrown::HashMap;
use parking_lot::RwLock;
use rustc_hash::FxHasher;

use crate::config::ConfigError;
use crate::session::handle::Session;
use crate::session::id::SessionId;

/// Session errors
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(String),
    #[error("Session already exists: {0}")]
    AlreadyExists(SessionId),
    #[error("Session limit reached")]
    AtCapacity,
    #[error("Invalid configuration: {0}")]
    Config(#[from] ConfigError),
}

type Shard = RwLock<HashMap<SessionId, Arc<Session>>>;

pub struct SessionTable {
    shards: Box<[Shard]>,
}

impl SessionTable {
    pub fn new(shard_count: usize) -> Self {
        let shards = (0..shard_count.max(1))
            .map(|_| RwLock::new(HashMap::new()))
            .collect();
        Self { shards }
    }

    fn shard(&self, id: &str) -> &Shard {
        let mut hasher = FxHasher::default();
        id.hash(&mut hasher);
        &self.shards[hasher.finish() as usize % self.shards.len()]
    }

    /// Insert a new session; an existing one under the same id is kept
    pub fn insert(&self, session: Arc<Session>) -> Result<(), SessionError> {
        let mut shard = self.shard(session.id().as_str()).write();
        if shard.contains_key(session.id()) {
            return Err(SessionError::AlreadyExists(session.id().clone()));
        }
        shard.insert(session.id().clone(), session);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<Arc<Session>> {
        self.shard(id).read().get(id).cloned()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.shard(id).read().contains_key(id)
    }

    pub fn remove(&self, id: &str) -> Option<Arc<Session>> {
        self.shard(id).write().remove(id)
    }

    /// Remove `id` only if it still maps to `session`.
    ///
    /// An expiring task must not evict a newer session that reused its id.
    pub fn remove_if(&self, id: &str, session: &Arc<Session>) -> bool {
        let mut shard = self.shard(id).write();
        match shard.get(id) {
            Some(current) if Arc::ptr_eq(current, session) => {
                shard.remove(id);
                true
            }
            _ => false,
        }
    }

    pub fn len(&self) -> usize {
        self.shards.iter().map(|s| s.read().len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.shards.iter().all(|s| s.read().is_empty())
    }

    /// Point-in-time copy of every session handle
    pub fn sessions(&self) -> Vec<Arc<Session>> {
        let mut out = Vec::with_capacity(self.len());
        for shard in self.shards.iter() {
            out.extend(shard.read().values().cloned());
        }
        out
    }

    /// Empty the table, returning everything that was in it
    pub fn drain(&self) -> Vec<Arc<Session>> {
        let mut out = Vec::new();
        for shard in self.shards.iter() {
            out.extend(shard.write().drain().map(|(_, s)| s));
        }
        out
    }

    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }
}
