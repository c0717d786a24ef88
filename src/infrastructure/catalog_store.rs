//! In-memory catalog store
//!
//! Rows live in a `BTreeMap` keyed by [`EntryKey`], so a bucket is a
//! contiguous key range. Suggestions are an append-only list.

use std::collections::{BTreeMap, HashSet};
use std::ops::Bound;

use anyhow::Result;
use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use crate::domain::{CatalogEntry, CatalogStore, EntryKey, SuggestionRecord};

#[derive(Debug, Default)]
pub struct InMemoryCatalogStore {
    entries: RwLock<BTreeMap<EntryKey, CatalogEntry>>,
    suggestions: RwLock<Vec<SuggestionRecord>>,
}

impl InMemoryCatalogStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-seeded with `entries`
    pub fn with_entries(entries: impl IntoIterator<Item = CatalogEntry>) -> Self {
        let map = entries.into_iter().map(|e| (e.key(), e)).collect();
        Self {
            entries: RwLock::new(map),
            suggestions: RwLock::default(),
        }
    }

    /// Rows of one storage bucket, in key order
    pub async fn entries_in_bucket(&self, bucket: u16) -> Vec<CatalogEntry> {
        let range_start = Bound::Included(EntryKey::bucket_start(bucket));
        let range_end = match bucket.checked_add(1) {
            Some(next) => Bound::Excluded(EntryKey::bucket_start(next)),
            None => Bound::Unbounded,
        };

        self.entries
            .read()
            .await
            .range((range_start, range_end))
            .map(|(_, entry)| entry.clone())
            .collect()
    }

    pub async fn get(&self, id: u64) -> Option<CatalogEntry> {
        self.entries
            .read()
            .await
            .values()
            .find(|entry| entry.id == id)
            .cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn suggestions(&self) -> Vec<SuggestionRecord> {
        self.suggestions.read().await.clone()
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalogStore {
    /// Every catalog row, in key order
    async fn get_measured_entries(&self) -> Result<Vec<CatalogEntry>> {
        Ok(self.entries.read().await.values().cloned().collect())
    }

    /// Upsert by internal id; a row whose classification changed moves key
    async fn replace_entries(&self, entries: Vec<CatalogEntry>) -> Result<()> {
        let ids: HashSet<u64> = entries.iter().map(|e| e.id).collect();
        let mut map = self.entries.write().await;
        map.retain(|key, _| !ids.contains(&key.id));
        for entry in entries {
            map.insert(entry.key(), entry);
        }
        debug!("Replaced {} catalog rows ({} total)", ids.len(), map.len());
        Ok(())
    }

    async fn insert_suggestion(&self, suggestion: SuggestionRecord) -> Result<()> {
        self.suggestions.write().await.push(suggestion);
        Ok(())
    }
}
