// src/matching/matcher.rs

use std::collections::BTreeSet;

use super::similarity::jaro_winkler;
use crate::models::MatchConfidence;

/// Best known key for a candidate set. `score` is -1 when there were no known keys.
#[derive(Debug, Clone, PartialEq)]
pub struct BestMatch<'a> {
    pub key: Option<&'a str>,
    pub score: f64,
}

impl BestMatch<'_> {
    pub fn confidence(&self) -> MatchConfidence {
        match self.key {
            Some(_) => MatchConfidence::from_score(self.score),
            None => MatchConfidence::Unmatched,
        }
    }

    /// Score as reported to callers, never negative.
    pub fn reported_score(&self) -> f64 {
        self.score.max(0.0)
    }
}

/// Picks the known key closest to any candidate.
///
/// A known key that is itself a candidate wins immediately with score 1.0. Otherwise every
/// (known, candidate) pair is scored and the highest score wins; only a strictly higher score
/// replaces the current best, so ties go to whichever key the iterator yields first.
pub fn best_match<'a, I>(known_keys: I, candidates: &BTreeSet<String>) -> BestMatch<'a>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut best = BestMatch {
        key: None,
        score: -1.0,
    };

    for known in known_keys {
        if candidates.contains(known) {
            return BestMatch {
                key: Some(known),
                score: 1.0,
            };
        }
        for candidate in candidates {
            let score = jaro_winkler(known, candidate);
            if score > best.score {
                best = BestMatch {
                    key: Some(known),
                    score,
                };
            }
        }
    }

    best
}
