// src/aggregators/index.rs

use std::collections::{BTreeMap, BTreeSet, HashMap};

use crate::config::UNKNOWN_ASSEMBLY;
use crate::matching::{best_match, normalize_assembly_name};
use crate::models::MatchInfo;

/// Accumulates one entry per canonical key while a collection is scanned.
#[derive(Debug)]
pub struct IndexBuilder<E> {
    entries: HashMap<String, E>,
    spellings: HashMap<String, HashMap<String, u64>>,
    records: usize,
}

impl<E: Default> Default for IndexBuilder<E> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
            spellings: HashMap::new(),
            records: 0,
        }
    }
}

impl<E: Default> IndexBuilder<E> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers one source row under the key of `raw` and returns its entry for the
    /// caller to accumulate into. Rows without a usable name land under the sentinel.
    pub fn record(&mut self, raw: Option<&str>) -> &mut E {
        let trimmed = raw.map(str::trim).unwrap_or_default();
        let mut key = normalize_assembly_name(trimmed);
        let spelling = if key.is_empty() {
            key = normalize_assembly_name(UNKNOWN_ASSEMBLY);
            UNKNOWN_ASSEMBLY
        } else {
            trimmed
        };

        self.records += 1;
        *self
            .spellings
            .entry(key.clone())
            .or_default()
            .entry(spelling.to_string())
            .or_insert(0) += 1;
        self.entries.entry(key).or_default()
    }

    pub fn record_count(&self) -> usize {
        self.records
    }

    pub fn finish(self) -> KeyIndex<E> {
        self.finish_with(())
    }

    /// Freezes the index together with a dataset-wide summary computed during the scan.
    pub fn finish_with<S>(self, summary: S) -> KeyIndex<E, S> {
        let mut spellings = self.spellings;
        let entries = self
            .entries
            .into_iter()
            .map(|(key, entry)| {
                let representative = spellings
                    .remove(&key)
                    .and_then(most_frequent)
                    .unwrap_or_else(|| key.clone());
                (
                    key,
                    IndexedEntry {
                        representative,
                        entry,
                    },
                )
            })
            .collect();

        KeyIndex {
            entries,
            records: self.records,
            summary,
        }
    }
}

/// Highest count wins; equal counts go to the lexicographically smallest spelling.
fn most_frequent(names: HashMap<String, u64>) -> Option<String> {
    names
        .into_iter()
        .max_by(|(a_name, a_count), (b_name, b_count)| {
            a_count.cmp(b_count).then_with(|| b_name.cmp(a_name))
        })
        .map(|(name, _)| name)
}

#[derive(Debug, Clone)]
pub struct IndexedEntry<E> {
    pub representative: String,
    pub entry: E,
}

/// Immutable key index for one dataset. Keys iterate in sorted order.
#[derive(Debug, Clone)]
pub struct KeyIndex<E, S = ()> {
    entries: BTreeMap<String, IndexedEntry<E>>,
    records: usize,
    summary: S,
}

/// Outcome of resolving a query against a [`KeyIndex`]. `entry` is `None` when unmatched.
#[derive(Debug)]
pub struct Resolution<'a, E> {
    pub info: MatchInfo,
    pub entry: Option<&'a E>,
}

impl<E, S> KeyIndex<E, S> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Number of source rows folded into the index.
    pub fn record_count(&self) -> usize {
        self.records
    }

    pub fn summary(&self) -> &S {
        &self.summary
    }

    pub fn get(&self, key: &str) -> Option<&IndexedEntry<E>> {
        self.entries.get(key)
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn resolve(&self, candidates: &BTreeSet<String>) -> Resolution<'_, E> {
        let best = best_match(self.keys(), candidates);
        let confidence = best.confidence();

        match best.key.and_then(|key| self.entries.get(key)) {
            Some(indexed) if confidence.is_match() => Resolution {
                info: MatchInfo {
                    matched_key: Some(indexed.representative.clone()),
                    confidence,
                    score: best.reported_score(),
                },
                entry: Some(&indexed.entry),
            },
            _ => Resolution {
                info: MatchInfo::unmatched(best.score),
                entry: None,
            },
        }
    }
}
