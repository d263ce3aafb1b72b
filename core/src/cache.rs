//! The keyed record cache.
//!
//! Each cache key (a date, a parent id) holds one ordered record set plus a
//! freshness marker. The cache exists so a single-row save is a point
//! update against the entry rather than a refetch of the whole set: commit
//! reconciles through [`RecordCache::upsert`] and delete through
//! [`RecordCache::remove`], and neither ever goes back to the network.
//!
//! An entry is either fully populated or explicitly stale; there is no
//! partially-merged state. Soft invalidation keeps the records around so a
//! view can keep showing last-known values while a refetch is in flight.

use crate::{CacheKey, Record, RecordId, Timestamp, DRAFT_ID};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// One cached record set.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CacheEntry {
    records: Vec<Record>,
    /// When the entry was populated (milliseconds since epoch)
    fetched_at: Timestamp,
    /// Explicitly marked stale by a soft invalidation
    stale: bool,
}

impl CacheEntry {
    fn new(records: Vec<Record>, fetched_at: Timestamp) -> Self {
        Self {
            records,
            fetched_at,
            stale: false,
        }
    }

    /// The ordered records.
    pub fn records(&self) -> &[Record] {
        &self.records
    }

    /// When the entry was populated.
    pub fn fetched_at(&self) -> Timestamp {
        self.fetched_at
    }

    /// Whether the entry has been soft-invalidated.
    pub fn is_stale(&self) -> bool {
        self.stale
    }

    /// Number of records in the entry.
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Whether the entry holds no records.
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

/// Result of a cache read. A miss is a normal signal, not an error; the
/// caller fetches from its record source and populates.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Lookup<'a> {
    Hit(&'a CacheEntry),
    Miss,
}

impl<'a> Lookup<'a> {
    /// The entry, if this is a hit.
    pub fn hit(self) -> Option<&'a CacheEntry> {
        match self {
            Lookup::Hit(entry) => Some(entry),
            Lookup::Miss => None,
        }
    }

    /// Whether this is a miss.
    pub fn is_miss(self) -> bool {
        matches!(self, Lookup::Miss)
    }
}

/// Where an inserted record lands in its entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum InsertPosition {
    /// Prepend (newest first, the common grid policy)
    Start,
    /// Append
    End,
}

/// Outcome of an upsert. `NoEntry` is a no-op worth logging, not a failure:
/// a concurrent invalidation may have cleared the entry already.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// Record id was new; inserted at the requested position
    Inserted,
    /// Record id matched; replaced in place, position preserved
    Replaced,
    /// Key has no entry; nothing done
    NoEntry,
    /// Drafts never enter the cache; nothing done
    RejectedDraft,
}

/// Outcome of a point removal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RemoveOutcome {
    Removed,
    /// Key present but id not found
    NotFound,
    /// Key has no entry
    NoEntry,
}

/// In-memory store of record sets keyed by cache key.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecordCache {
    entries: HashMap<CacheKey, CacheEntry>,
    /// Optional freshness window in milliseconds; `None` means entries only
    /// go stale through explicit invalidation
    ttl: Option<u64>,
}

impl RecordCache {
    /// Create a cache whose entries stay fresh until invalidated.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a cache whose entries also expire `ttl_ms` after population.
    pub fn with_ttl(ttl_ms: u64) -> Self {
        Self {
            entries: HashMap::new(),
            ttl: Some(ttl_ms),
        }
    }

    /// Read an entry. Returns a hit only while the entry is fresh: present,
    /// not soft-invalidated, and inside the TTL window when one is set.
    /// Never errors; [`Lookup::Miss`] is the only failure signal.
    pub fn get(&self, key: &str, now: Timestamp) -> Lookup<'_> {
        match self.entries.get(key) {
            Some(entry) if !entry.stale && self.within_ttl(entry, now) => Lookup::Hit(entry),
            _ => Lookup::Miss,
        }
    }

    fn within_ttl(&self, entry: &CacheEntry, now: Timestamp) -> bool {
        match self.ttl {
            Some(ttl) => now.saturating_sub(entry.fetched_at) <= ttl,
            None => true,
        }
    }

    /// Last-known records for a key, fresh or stale. Supports showing
    /// existing values while a refetch is in flight.
    pub fn last_known(&self, key: &str) -> Option<&[Record]> {
        self.entries.get(key).map(|e| e.records.as_slice())
    }

    /// Replace an entry wholesale and reset its freshness.
    pub fn populate(&mut self, key: impl Into<CacheKey>, records: Vec<Record>, now: Timestamp) {
        self.entries.insert(key.into(), CacheEntry::new(records, now));
    }

    /// Mark an entry stale without deleting it. Returns whether an entry
    /// was present.
    pub fn invalidate_soft(&mut self, key: &str) -> bool {
        match self.entries.get_mut(key) {
            Some(entry) => {
                entry.stale = true;
                true
            }
            None => false,
        }
    }

    /// Remove an entry entirely. Returns whether an entry was present.
    pub fn invalidate_hard(&mut self, key: &str) -> bool {
        self.entries.remove(key).is_some()
    }

    /// Point-reconcile one persisted record into an entry: replace in place
    /// when the id already exists (position preserved), insert at `position`
    /// otherwise. Never triggers a refetch and never touches freshness.
    pub fn upsert(&mut self, key: &str, record: Record, position: InsertPosition) -> UpsertOutcome {
        if record.id == DRAFT_ID {
            return UpsertOutcome::RejectedDraft;
        }
        let Some(entry) = self.entries.get_mut(key) else {
            return UpsertOutcome::NoEntry;
        };

        if let Some(slot) = entry.records.iter_mut().find(|r| r.id == record.id) {
            *slot = record;
            return UpsertOutcome::Replaced;
        }

        match position {
            InsertPosition::Start => entry.records.insert(0, record),
            InsertPosition::End => entry.records.push(record),
        }
        UpsertOutcome::Inserted
    }

    /// Delete a single record from an entry after a successful remote
    /// delete.
    pub fn remove(&mut self, key: &str, id: RecordId) -> RemoveOutcome {
        let Some(entry) = self.entries.get_mut(key) else {
            return RemoveOutcome::NoEntry;
        };
        let before = entry.records.len();
        entry.records.retain(|r| r.id != id);
        if entry.records.len() < before {
            RemoveOutcome::Removed
        } else {
            RemoveOutcome::NotFound
        }
    }

    /// Number of keyed entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
