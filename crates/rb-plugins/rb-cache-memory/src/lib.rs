//! # rb-cache-memory
//!
//! In-process implementation of `FeedCache`.
//! Entries expire after a fixed TTL and are dropped wholesale on `invalidate`.
//! Each entry remembers the generation it was built in; entries from an older
//! generation are never served, even if a late `set` slipped them in after
//! the map was cleared.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use dashmap::DashMap;
use rb_core::models::PostView;
use rb_core::pagination::{Page, PageRequest};
use rb_core::traits::FeedCache;

/// Default lifetime of a cached global feed page.
pub const DEFAULT_TTL: Duration = Duration::from_secs(20);

struct Entry {
    stored_at: Instant,
    generation: u64,
    page: Page<PostView>,
}

pub struct MemoryFeedCache {
    ttl: Duration,
    generation: AtomicU64,
    entries: DashMap<PageRequest, Entry>,
}

impl MemoryFeedCache {
    pub fn new(ttl: Duration) -> Self {
        Self { ttl, generation: AtomicU64::new(0), entries: DashMap::new() }
    }

    fn is_live(&self, entry: &Entry) -> bool {
        entry.generation == self.generation.load(Ordering::Acquire)
            && entry.stored_at.elapsed() < self.ttl
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl Default for MemoryFeedCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL)
    }
}

impl FeedCache for MemoryFeedCache {
    fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }

    fn get(&self, page: PageRequest) -> Option<Page<PostView>> {
        let hit = self
            .entries
            .get(&page)
            .filter(|entry| self.is_live(entry))
            .map(|entry| entry.page.clone());

        if hit.is_none() {
            // Drop the dead entry, if any, so the map does not grow with stale pages.
            self.entries.remove_if(&page, |_, entry| !self.is_live(entry));
        }
        hit
    }

    fn set(&self, page: PageRequest, value: Page<PostView>, generation: u64) -> bool {
        if generation != self.generation() {
            return false;
        }
        self.entries.insert(page, Entry { stored_at: Instant::now(), generation, page: value });
        true
    }

    fn invalidate(&self) {
        // Bump first: anything inserted after this point with an older
        // generation is already dead.
        let generation = self.generation.fetch_add(1, Ordering::AcqRel) + 1;
        let dropped = self.entries.len();
        self.entries.clear();
        tracing::debug!(dropped, generation, "global feed cache invalidated");
    }
}
