// src/matching/similarity.rs

use crate::config::{WINKLER_MAX_PREFIX, WINKLER_SCALING_FACTOR};

/// Jaro similarity over Unicode scalar values.
///
/// Matching is greedy left to right: each character of `a` claims the first unclaimed
/// equal character of `b` inside the window, which fixes the transposition count.
pub fn jaro(a: &str, b: &str) -> f64 {
    if a == b {
        return if a.is_empty() { 0.0 } else { 1.0 };
    }
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    jaro_chars(&a, &b)
}

fn jaro_chars(a: &[char], b: &[char]) -> f64 {
    let (a_len, b_len) = (a.len(), b.len());
    if a_len == 0 || b_len == 0 {
        return 0.0;
    }

    // floor(max/2) - 1, clamped at zero for one- and two-character strings
    let window = (a_len.max(b_len) / 2).saturating_sub(1);
    let mut a_matched = vec![false; a_len];
    let mut b_matched = vec![false; b_len];

    let mut matches = 0usize;
    for i in 0..a_len {
        let start = i.saturating_sub(window);
        let end = (i + window + 1).min(b_len);
        for j in start..end {
            if b_matched[j] || a[i] != b[j] {
                continue;
            }
            a_matched[i] = true;
            b_matched[j] = true;
            matches += 1;
            break;
        }
    }
    if matches == 0 {
        return 0.0;
    }

    let mut k = 0usize;
    let mut half_transpositions = 0usize;
    for i in 0..a_len {
        if !a_matched[i] {
            continue;
        }
        while !b_matched[k] {
            k += 1;
        }
        if a[i] != b[k] {
            half_transpositions += 1;
        }
        k += 1;
    }

    let m = matches as f64;
    let t = half_transpositions as f64 / 2.0;
    (m / a_len as f64 + m / b_len as f64 + (m - t) / m) / 3.0
}

/// Jaro-Winkler similarity in `[0, 1]`.
///
/// Identical non-empty strings score 1 and an empty side scores 0. The Winkler boost adds
/// `0.1 * p * (1 - jaro)` where `p` is the shared prefix length capped at four characters.
pub fn jaro_winkler(a: &str, b: &str) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    if a == b {
        return 1.0;
    }

    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let jaro = jaro_chars(&a, &b);
    if jaro == 0.0 {
        return 0.0;
    }

    let prefix = a
        .iter()
        .zip(b.iter())
        .take(WINKLER_MAX_PREFIX)
        .take_while(|(x, y)| x == y)
        .count();

    jaro + prefix as f64 * WINKLER_SCALING_FACTOR * (1.0 - jaro)
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPS: f64 = 1e-9;

    #[test]
    fn identical_strings_score_one() {
        for s in ["a", "ara", "danapur", "patna sahib", "बांकीपुर"] {
            assert_eq!(jaro_winkler(s, s), 1.0);
        }
    }

    #[test]
    fn empty_side_scores_zero() {
        assert_eq!(jaro_winkler("", ""), 0.0);
        assert_eq!(jaro_winkler("", "ara"), 0.0);
        assert_eq!(jaro_winkler("ara", ""), 0.0);
    }

    #[test]
    fn no_common_characters_scores_zero() {
        assert_eq!(jaro_winkler("abc", "xyz"), 0.0);
        // single characters have a zero-width window
        assert_eq!(jaro_winkler("a", "b"), 0.0);
    }

    #[test]
    fn classic_reference_values() {
        assert!((jaro("martha", "marhta") - 0.944_444_444_4).abs() < 1e-6);
        assert!((jaro_winkler("martha", "marhta") - 0.961_111_111_1).abs() < 1e-6);
        assert!((jaro_winkler("dwayne", "duane") - 0.84).abs() < 1e-6);
        assert!((jaro_winkler("dixon", "dicksonx") - 0.813_333_333_3).abs() < 1e-6);
    }

    #[test]
    fn one_letter_typo_clears_low_threshold() {
        // six matches, one transposition, shared prefix "d"
        let score = jaro_winkler("danapur", "dinapur");
        assert!((score - 0.864_285_714_3).abs() < 1e-6, "score {}", score);
        assert!(score >= crate::config::LOW_CONFIDENCE_THRESHOLD);
    }

    #[test]
    fn similarity_is_symmetric() {
        let words = [
            "danapur", "dinapur", "bikram", "gaya", "gaya town", "martha", "marhta",
            "ab", "ba", "abcabc", "cbacba", "patna sahib", "patnasahib",
        ];
        for a in words {
            for b in words {
                assert!(
                    (jaro_winkler(a, b) - jaro_winkler(b, a)).abs() < EPS,
                    "{} / {}",
                    a,
                    b
                );
            }
        }
    }

    #[test]
    fn scores_stay_in_unit_interval() {
        let words = ["a", "aa", "aaa", "ab", "abc", "bca", "danapur", "d"];
        for a in words {
            for b in words {
                let s = jaro_winkler(a, b);
                assert!((0.0..=1.0).contains(&s), "{} / {} -> {}", a, b, s);
            }
        }
    }

    #[test]
    fn jaro_core_agrees_with_reference_crate() {
        let pairs = [
            ("martha", "marhta"),
            ("dixon", "dicksonx"),
            ("danapur", "dinapur"),
            ("bikram", "bikramganj"),
            ("patna sahib", "patnasahib"),
        ];
        for (a, b) in pairs {
            assert!(
                (jaro(a, b) - strsim::jaro(a, b)).abs() < EPS,
                "{} / {}",
                a,
                b
            );
        }
    }
}
