use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    /// Source flags the title as having no finite completion time
    Endless,
}

/// Side record queued for human review; never changes the entry itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuggestionRecord {
    pub external_id: i64,
    pub entry_id: u64,
    pub entry_name: String,
    pub kind: SuggestionKind,
    pub created_at: DateTime<Utc>,
}

impl SuggestionRecord {
    pub fn endless(external_id: i64, entry_id: u64, entry_name: &str) -> Self {
        Self {
            external_id,
            entry_id,
            entry_name: entry_name.to_string(),
            kind: SuggestionKind::Endless,
            created_at: Utc::now(),
        }
    }
}
