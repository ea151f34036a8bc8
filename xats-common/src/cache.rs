// xats-common/src/cache.rs
// Caller-supplied caching of resolved references. Nothing in the workspace
// holds a process-wide cache; resolvers receive one of these explicitly.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

use tracing::debug;

use crate::model::ResolvedReference;

/// Default lifetime of an in-memory entry.
pub const DEFAULT_TTL: Duration = Duration::from_secs(10 * 60);

pub trait ResolutionCache: Send + Sync {
    fn get(&self, key: &str) -> Option<ResolvedReference>;
    fn put(&self, key: &str, value: &ResolvedReference);
}

/// In-memory cache whose entries expire after a fixed TTL.
pub struct MemoryResolutionCache {
    ttl: Duration,
    entries: Mutex<HashMap<String, (Instant, ResolvedReference)>>,
}

impl MemoryResolutionCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: Mutex::new(HashMap::new()),
        }
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops every entry.
    pub fn clear(&self) {
        self.lock().clear();
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, (Instant, ResolvedReference)>> {
        self.entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for MemoryResolutionCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl ResolutionCache for MemoryResolutionCache {
    fn get(&self, key: &str) -> Option<ResolvedReference> {
        let mut entries = self.lock();
        match entries.get(key) {
            Some((stored, value)) if stored.elapsed() <= self.ttl => Some(value.clone()),
            Some(_) => {
                debug!("Cache entry for '{}' expired", key);
                entries.remove(key);
                None
            }
            None => None,
        }
    }

    fn put(&self, key: &str, value: &ResolvedReference) {
        debug!("Caching resolution for '{}'", key);
        self.lock()
            .insert(key.to_string(), (Instant::now(), value.clone()));
    }
}
