//! Composite storage key for catalog entries
//!
//! Entries are sharded into a fixed number of buckets by hashing the internal
//! id. The key orders as (bucket, category, classification, id), so a sorted
//! map keyed by it can be scanned by bucket or bucket+category prefix.

use serde::{Deserialize, Serialize};

use super::catalog_entry::{CatalogEntry, Classification};

pub const BUCKET_COUNT: u16 = 16;

/// Category prefix shared by all catalog rows
pub const CATEGORY_PREFIX: &str = "ttb";

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct EntryKey {
    pub bucket: u16,
    pub category: String,
    pub classification: Classification,
    pub id: u64,
}

impl EntryKey {
    pub fn for_entry(entry: &CatalogEntry) -> Self {
        Self {
            bucket: Self::bucket_for(entry.id),
            category: CATEGORY_PREFIX.to_string(),
            classification: entry.classification,
            id: entry.id,
        }
    }

    pub fn bucket_for(id: u64) -> u16 {
        let hash = blake3::hash(&id.to_le_bytes());
        let mut head = [0u8; 8];
        head.copy_from_slice(&hash.as_bytes()[..8]);
        (u64::from_le_bytes(head) % u64::from(BUCKET_COUNT)) as u16
    }

    /// Smallest possible key in `bucket`, for range scans
    pub fn bucket_start(bucket: u16) -> Self {
        Self {
            bucket,
            category: String::new(),
            classification: Classification::Game,
            id: 0,
        }
    }
}

impl std::fmt::Display for EntryKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:02}/{}/{}/{}",
            self.bucket, self.category, self.classification, self.id
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bucket_is_stable_and_in_range() {
        for id in [0u64, 1, 400, 620, 1_000_000] {
            let bucket = EntryKey::bucket_for(id);
            assert!(bucket < BUCKET_COUNT);
            assert_eq!(bucket, EntryKey::bucket_for(id));
        }
    }

    #[test]
    fn test_key_display_and_ordering() {
        let entry = CatalogEntry::new(400, "Portal").with_classification(Classification::Game);
        let key = entry.key();
        assert!(key.to_string().ends_with("/ttb/game/400"));
        assert!(EntryKey::bucket_start(key.bucket) <= key);
        assert!(key < EntryKey::bucket_start(key.bucket + 1));
    }
}
