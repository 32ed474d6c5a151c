//! Short-lived cache of completion results.
//!
//! Keyed by (file, line, typed prefix, language). The executor consults it
//! before dispatching a service call; hits travel the normal reply path and
//! still pass the staleness filter. Entries expire quickly: the cache only
//! absorbs bursts of identical queries, it is not a persistence layer.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

use crate::service::{CompletionQuery, CompletionSet};

/// Maximum number of cache entries.
const MAX_CACHE_ENTRIES: usize = 32;

/// Default entry lifetime.
const DEFAULT_TTL: Duration = Duration::from_secs(2);

/// Cache key for one query shape.
#[derive(Debug, Clone, Hash, PartialEq, Eq)]
pub struct CacheKey {
    path: Option<PathBuf>,
    line: usize,
    prefix: String,
    language: String,
}

impl CacheKey {
    /// Creates a key.
    #[must_use]
    pub fn new(
        path: Option<PathBuf>,
        line: usize,
        prefix: impl Into<String>,
        language: impl Into<String>,
    ) -> Self {
        Self {
            path,
            line,
            prefix: prefix.into(),
            language: language.into(),
        }
    }

    /// Derives the key for a query.
    #[must_use]
    pub fn for_query(query: &CompletionQuery) -> Self {
        Self::new(
            query.path.clone(),
            query.line,
            query.prefix.clone(),
            query.language.clone(),
        )
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    set: CompletionSet,
    created_at: Instant,
}

/// TTL + capacity bounded result cache.
#[derive(Debug)]
pub struct ResultCache {
    entries: HashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    ttl: Duration,
}

impl ResultCache {
    /// Creates a cache with default capacity and TTL.
    #[must_use]
    pub fn new() -> Self {
        Self::with_limits(MAX_CACHE_ENTRIES, DEFAULT_TTL)
    }

    /// Creates a cache with explicit limits.
    #[must_use]
    pub fn with_limits(max_entries: usize, ttl: Duration) -> Self {
        Self {
            entries: HashMap::with_capacity(max_entries.max(1)),
            max_entries: max_entries.max(1),
            ttl,
        }
    }

    /// Returns a fresh cached result, if any.
    #[must_use]
    pub fn get(&self, key: &CacheKey) -> Option<&CompletionSet> {
        self.entries
            .get(key)
            .filter(|entry| entry.created_at.elapsed() <= self.ttl)
            .map(|entry| &entry.set)
    }

    /// Stores a result, evicting expired and oldest entries at capacity.
    pub fn insert(&mut self, key: CacheKey, set: CompletionSet) {
        if self.entries.len() >= self.max_entries {
            self.evict();
        }
        self.entries.insert(
            key,
            CacheEntry {
                set,
                created_at: Instant::now(),
            },
        );
    }

    fn evict(&mut self) {
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.created_at.elapsed() <= ttl);

        while self.entries.len() >= self.max_entries {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|(_, entry)| entry.created_at)
                .map(|(key, _)| key.clone());
            match oldest {
                Some(key) => {
                    self.entries.remove(&key);
                }
                None => break,
            }
        }
    }

    /// Drops every entry.
    pub fn clear(&mut self) {
        self.entries.clear();
    }

    /// Drops entries for one file. Called after a commit mutates it.
    pub fn invalidate_file(&mut self, path: &Path) {
        self.entries.retain(|key, _| key.path.as_deref() != Some(path));
    }

    /// Returns the number of live entries (including expired, until evicted).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for ResultCache {
    fn default() -> Self {
        Self::new()
    }
}
