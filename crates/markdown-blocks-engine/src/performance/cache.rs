//! Memoized parse results.
//!
//! Keyed cheaply by a hash of the first 1,000 characters plus the byte
//! length. Two documents sharing that prefix and length collide on the key;
//! with `verify_full_content` on, each entry also carries a hash of the whole
//! text and a mismatch counts as a miss.

use std::hash::{DefaultHasher, Hash, Hasher};
use std::num::NonZeroUsize;
use std::time::{Duration, Instant};

use lru::LruCache;

use crate::blocks::BlockTree;
use crate::identity::djb2;

const KEY_PREFIX_CHARS: usize = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CacheOptions {
    /// Entries kept; the least recently used goes first. Zero disables caching.
    pub capacity: usize,
    pub ttl: Duration,
    pub verify_full_content: bool,
}

impl Default for CacheOptions {
    fn default() -> Self {
        Self {
            capacity: 32,
            ttl: Duration::from_secs(5 * 60),
            verify_full_content: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CacheKey {
    prefix_hash: u32,
    len: usize,
}

impl CacheKey {
    pub fn of(text: &str) -> Self {
        let end = text
            .char_indices()
            .nth(KEY_PREFIX_CHARS)
            .map_or(text.len(), |(i, _)| i);
        Self {
            prefix_hash: djb2(text[..end].as_bytes()),
            len: text.len(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: u64,
    pub misses: u64,
    pub entries: usize,
}

#[derive(Debug)]
struct Entry {
    tree: BlockTree,
    full_hash: u64,
    inserted: Instant,
}

#[derive(Debug)]
pub struct ParseCache {
    options: CacheOptions,
    /// `None` when the capacity is zero.
    entries: Option<LruCache<CacheKey, Entry>>,
    hits: u64,
    misses: u64,
}

impl ParseCache {
    pub fn new(options: CacheOptions) -> Self {
        Self {
            options,
            entries: NonZeroUsize::new(options.capacity).map(LruCache::new),
            hits: 0,
            misses: 0,
        }
    }

    pub fn options(&self) -> &CacheOptions {
        &self.options
    }

    pub fn get(&mut self, text: &str) -> Option<BlockTree> {
        self.get_at(text, Instant::now())
    }

    pub fn insert(&mut self, text: &str, tree: BlockTree) {
        self.insert_at(text, tree, Instant::now());
    }

    fn get_at(&mut self, text: &str, now: Instant) -> Option<BlockTree> {
        let key = CacheKey::of(text);
        let found = self
            .entries
            .as_mut()
            .and_then(|entries| entries.get(&key))
            .map(|e| (e.tree.clone(), e.full_hash, e.inserted));
        let Some((tree, hash, inserted)) = found else {
            self.misses += 1;
            return None;
        };

        if now.saturating_duration_since(inserted) > self.options.ttl {
            if let Some(entries) = self.entries.as_mut() {
                entries.pop(&key);
            }
            self.misses += 1;
            return None;
        }
        if self.options.verify_full_content && hash != full_hash(text) {
            log::debug!("cache key collision for a {} byte document", text.len());
            self.misses += 1;
            return None;
        }

        self.hits += 1;
        Some(tree)
    }

    fn insert_at(&mut self, text: &str, tree: BlockTree, now: Instant) {
        let ttl = self.options.ttl;
        let Some(entries) = self.entries.as_mut() else {
            return;
        };

        let expired: Vec<CacheKey> = entries
            .iter()
            .filter(|(_, e)| now.saturating_duration_since(e.inserted) > ttl)
            .map(|(k, _)| *k)
            .collect();
        for key in expired {
            entries.pop(&key);
        }

        // a full cache drops its least recently used entry
        entries.put(
            CacheKey::of(text),
            Entry {
                tree,
                full_hash: full_hash(text),
                inserted: now,
            },
        );
    }

    pub fn clear(&mut self) {
        if let Some(entries) = self.entries.as_mut() {
            entries.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.entries.as_ref().map_or(0, LruCache::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.len(),
        }
    }
}

fn full_hash(text: &str) -> u64 {
    let mut hasher = DefaultHasher::new();
    text.hash(&mut hasher);
    hasher.finish()
}
