//! Genre statistics and tier imputation
//!
//! Statistics are rebuilt from scratch on every pass out of the entries whose
//! three tiers were all scraped. Each measured entry feeds one bucket per
//! genre it lists plus the `Unknown` bucket of its classification, which is
//! the fallback for genres nobody has measured yet.
//!
//! Imputation is all-or-nothing: every entry that needs a statistic gets one
//! before any entry is changed.

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::domain::{CatalogEntry, Classification, DurationTier, ImputationError, UNKNOWN_GENRE};

/// Aggregate of one (genre, classification) bucket
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GenreStatistic {
    pub sample_size: usize,
    pub mean_main: f64,
    pub mean_extras: f64,
    pub mean_completionist: f64,
    /// `mean_extras / mean_main`, at least 1
    pub main_to_extras: f64,
    /// `mean_completionist / mean_extras`, at least 1
    pub extras_to_completionist: f64,
    /// Where extras sits between main and completionist, in `[0, 1]`
    pub extras_placement: f64,
}

impl GenreStatistic {
    fn from_sums(sample_size: usize, sums: [f64; 3]) -> Self {
        let n = sample_size as f64;
        let [main, extras, completionist] = sums.map(|sum| sum / n);

        let span = completionist - main;
        let extras_placement = if span > 0.0 {
            ((extras - main) / span).clamp(0.0, 1.0)
        } else {
            0.0
        };

        Self {
            sample_size,
            mean_main: main,
            mean_extras: extras,
            mean_completionist: completionist,
            main_to_extras: (extras / main).max(1.0),
            extras_to_completionist: (completionist / extras).max(1.0),
            extras_placement,
        }
    }

    /// Fill the imputed tiers of `entry` from its measured ones
    fn fill(&self, entry: &mut CatalogEntry) {
        let measured = |tier: DurationTier| (!tier.imputed).then_some(f64::from(tier.minutes));
        let (main, extras, completionist) = (
            measured(entry.main),
            measured(entry.extras),
            measured(entry.completionist),
        );

        let (main, extras, completionist) = match (main, extras, completionist) {
            (None, None, None) => (self.mean_main, self.mean_extras, self.mean_completionist),
            (Some(m), None, None) => {
                let e = m * self.main_to_extras;
                (m, e, e * self.extras_to_completionist)
            }
            (None, Some(e), None) => (e / self.main_to_extras, e, e * self.extras_to_completionist),
            (None, None, Some(c)) => {
                let e = c / self.extras_to_completionist;
                (e / self.main_to_extras, e, c)
            }
            (Some(m), Some(e), None) => (m, e, e * self.extras_to_completionist),
            (Some(m), None, Some(c)) => (m, m + self.extras_placement * (c - m), c),
            (None, Some(e), Some(c)) => (e / self.main_to_extras, e, c),
            (Some(m), Some(e), Some(c)) => (m, e, c),
        };

        for (tier, value) in [
            (&mut entry.main, main),
            (&mut entry.extras, extras),
            (&mut entry.completionist, completionist),
        ] {
            if tier.imputed {
                *tier = DurationTier::imputed(to_minutes(value));
            }
        }
    }
}

fn to_minutes(value: f64) -> u32 {
    value.round().clamp(1.0, f64::from(u32::MAX)) as u32
}

/// Statistics for one imputation pass
#[derive(Debug, Clone, Default)]
pub struct GenreStatistics {
    buckets: HashMap<(String, Classification), GenreStatistic>,
}

impl GenreStatistics {
    /// Rebuild from the fully measured entries in `entries`
    pub fn recompute(entries: &[CatalogEntry]) -> Self {
        let mut sums: HashMap<(String, Classification), (usize, [f64; 3])> = HashMap::new();

        for entry in entries.iter().filter(|e| e.is_fully_measured()) {
            let tiers = [
                f64::from(entry.main.minutes),
                f64::from(entry.extras.minutes),
                f64::from(entry.completionist.minutes),
            ];
            let genres: HashSet<&str> = entry
                .genres
                .iter()
                .map(String::as_str)
                .chain(std::iter::once(UNKNOWN_GENRE))
                .collect();

            for genre in genres {
                let (count, bucket) = sums
                    .entry((genre.to_string(), entry.classification))
                    .or_insert((0, [0.0; 3]));
                *count += 1;
                for (sum, value) in bucket.iter_mut().zip(tiers) {
                    *sum += value;
                }
            }
        }

        let buckets = sums
            .into_iter()
            .map(|(key, (count, totals))| (key, GenreStatistic::from_sums(count, totals)))
            .collect();
        Self { buckets }
    }

    pub fn get(&self, genre: &str, classification: Classification) -> Option<&GenreStatistic> {
        self.buckets.get(&(genre.to_string(), classification))
    }

    /// First of the entry's genres with a statistic, else the `Unknown` bucket
    pub fn lookup(&self, entry: &CatalogEntry) -> Result<&GenreStatistic, ImputationError> {
        entry
            .genres
            .iter()
            .find_map(|genre| self.get(genre, entry.classification))
            .or_else(|| self.get(UNKNOWN_GENRE, entry.classification))
            .ok_or_else(|| ImputationError::MissingStatistic {
                entry_id: entry.id,
                genre: entry.primary_genre().to_string(),
                classification: entry.classification,
            })
    }

    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

/// What one imputation pass did
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImputationSummary {
    pub statistics: usize,
    pub fully_imputed: usize,
    pub partially_imputed: usize,
    /// Entries whose tiers had to be raised to restore ordering
    pub reordered: usize,
}

pub struct ImputationEngine;

impl ImputationEngine {
    /// Recompute statistics over `entries`, then impute them
    pub fn run(entries: &mut [CatalogEntry]) -> Result<ImputationSummary, ImputationError> {
        let statistics = GenreStatistics::recompute(entries);
        debug!("Recomputed {} genre statistics", statistics.len());
        Self::impute(entries, &statistics)
    }

    /// Fill every imputed tier and enforce `main <= extras <= completionist`
    pub fn impute(
        entries: &mut [CatalogEntry],
        statistics: &GenreStatistics,
    ) -> Result<ImputationSummary, ImputationError> {
        let plan = entries
            .iter()
            .enumerate()
            .filter(|(_, entry)| !entry.is_fully_measured())
            .map(|(index, entry)| statistics.lookup(entry).map(|stat| (index, *stat)))
            .collect::<Result<Vec<_>, _>>()?;

        let mut summary = ImputationSummary {
            statistics: statistics.len(),
            ..ImputationSummary::default()
        };

        for (index, statistic) in plan {
            let entry = &mut entries[index];
            if entry.is_fully_imputed() {
                summary.fully_imputed += 1;
            } else {
                summary.partially_imputed += 1;
            }
            statistic.fill(entry);
        }

        for entry in entries.iter_mut() {
            if enforce_ordering(entry) {
                summary.reordered += 1;
            }
        }

        info!(
            "📊 Imputation complete: {} full, {} partial, {} reordered ({} statistics)",
            summary.fully_imputed, summary.partially_imputed, summary.reordered, summary.statistics
        );
        Ok(summary)
    }
}

/// Raise extras to main and completionist to extras; true if a measured tier moved
fn enforce_ordering(entry: &mut CatalogEntry) -> bool {
    let mut raised_measured = false;

    if entry.extras.minutes < entry.main.minutes {
        raised_measured |= !entry.extras.imputed;
        entry.extras.minutes = entry.main.minutes;
    }
    if entry.completionist.minutes < entry.extras.minutes {
        raised_measured |= !entry.completionist.imputed;
        entry.completionist.minutes = entry.extras.minutes;
    }

    if raised_measured {
        warn!(
            "⚠️ Entry {} ('{}') had measured tiers out of order, raised to {}/{}/{}",
            entry.id, entry.name, entry.main.minutes, entry.extras.minutes, entry.completionist.minutes
        );
    }
    raised_measured
}
