use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::entry_key::EntryKey;

/// External id of an entry that has not been matched to a source record.
pub const NOT_FOUND_ID: i64 = -1;

/// Genre sentinel for unclassified titles and the statistics fallback bucket.
pub const UNKNOWN_GENRE: &str = "Unknown";

/// Content classification of a catalog entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Classification {
    /// Primary content (a full game)
    Game,
    /// Expansion content
    Dlc,
    Mod,
    #[default]
    Unclassified,
}

impl Classification {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Game => "game",
            Self::Dlc => "dlc",
            Self::Mod => "mod",
            Self::Unclassified => "unclassified",
        }
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One duration tier: minutes plus whether the value came from imputation.
///
/// A zero value is always imputed; [`DurationTier::scraped`] enforces that.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurationTier {
    pub minutes: u32,
    pub imputed: bool,
}

impl DurationTier {
    pub const fn unknown() -> Self {
        Self { minutes: 0, imputed: true }
    }

    /// Tier taken from a scraped page; zero means "not on the page".
    pub const fn scraped(minutes: u32) -> Self {
        Self { minutes, imputed: minutes == 0 }
    }

    pub const fn imputed(minutes: u32) -> Self {
        Self { minutes, imputed: true }
    }

    pub const fn is_measured(&self) -> bool {
        !self.imputed && self.minutes > 0
    }
}

impl Default for DurationTier {
    fn default() -> Self {
        Self::unknown()
    }
}

/// A cataloged title and its time-to-beat record
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    /// Internal id, stable from discovery onwards
    pub id: u64,
    /// Source record id; [`NOT_FOUND_ID`] while unresolved
    pub external_id: i64,
    pub name: String,
    /// Name as returned by the source, may differ from `name`
    pub external_name: Option<String>,
    pub genres: Vec<String>,
    /// `None` is the "unknown date" sentinel
    pub release_date: Option<NaiveDate>,
    pub classification: Classification,
    pub main: DurationTier,
    pub extras: DurationTier,
    pub completionist: DurationTier,
}

impl CatalogEntry {
    /// Freshly discovered entry: unresolved, all tiers zero and imputed.
    pub fn new(id: u64, name: impl Into<String>) -> Self {
        Self {
            id,
            external_id: NOT_FOUND_ID,
            name: name.into(),
            external_name: None,
            genres: vec![UNKNOWN_GENRE.to_string()],
            release_date: None,
            classification: Classification::Unclassified,
            main: DurationTier::unknown(),
            extras: DurationTier::unknown(),
            completionist: DurationTier::unknown(),
        }
    }

    pub fn with_genres<I, S>(mut self, genres: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.genres = genres.into_iter().map(Into::into).collect();
        if self.genres.is_empty() {
            self.genres.push(UNKNOWN_GENRE.to_string());
        }
        self
    }

    pub const fn with_classification(mut self, classification: Classification) -> Self {
        self.classification = classification;
        self
    }

    pub const fn is_resolved(&self) -> bool {
        self.external_id != NOT_FOUND_ID
    }

    /// All three tiers scraped with positive values
    pub const fn is_fully_measured(&self) -> bool {
        self.main.is_measured() && self.extras.is_measured() && self.completionist.is_measured()
    }

    pub const fn is_fully_imputed(&self) -> bool {
        self.main.imputed && self.extras.imputed && self.completionist.imputed
    }

    /// Replace all three tiers with freshly scraped minutes.
    pub const fn set_scraped_tiers(&mut self, main: u32, extras: u32, completionist: u32) {
        self.main = DurationTier::scraped(main);
        self.extras = DurationTier::scraped(extras);
        self.completionist = DurationTier::scraped(completionist);
    }

    /// `0 < main <= extras <= completionist`
    pub const fn tiers_ordered(&self) -> bool {
        self.main.minutes > 0
            && self.main.minutes <= self.extras.minutes
            && self.extras.minutes <= self.completionist.minutes
    }

    /// Genre used when nothing more specific applies
    pub fn primary_genre(&self) -> &str {
        self.genres.first().map_or(UNKNOWN_GENRE, String::as_str)
    }

    pub fn bucket(&self) -> u16 {
        EntryKey::bucket_for(self.id)
    }

    pub fn key(&self) -> EntryKey {
        EntryKey::for_entry(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entry_is_unresolved_and_imputed() {
        let entry = CatalogEntry::new(620, "Portal 2");
        assert_eq!(entry.external_id, NOT_FOUND_ID);
        assert!(!entry.is_resolved());
        assert!(entry.is_fully_imputed());
        assert_eq!(entry.genres, vec![UNKNOWN_GENRE.to_string()]);
        assert!(entry.release_date.is_none());
    }

    #[test]
    fn test_scraped_zero_is_imputed() {
        let mut entry = CatalogEntry::new(1, "Spiral Knights");
        entry.set_scraped_tiers(0, 0, 0);
        assert!(entry.is_fully_imputed());

        entry.set_scraped_tiers(300, 0, 900);
        assert!(entry.main.is_measured());
        assert!(entry.extras.imputed);
        assert!(!entry.completionist.imputed);
    }

    #[test]
    fn test_empty_genres_fall_back_to_unknown() {
        let entry = CatalogEntry::new(1, "x").with_genres(Vec::<String>::new());
        assert_eq!(entry.primary_genre(), UNKNOWN_GENRE);
    }
}
