// src/matching/normalize.rs

use once_cell::sync::Lazy;
use regex::Regex;
use unicode_normalization::UnicodeNormalization;

// Reservation-category annotations appended to constituency names
static CATEGORY_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\((sc|st|general)\)").expect("category suffix pattern is valid")
});

static BRACKETS_AND_PUNCTUATION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[()\[\]{}.,]").expect("punctuation pattern is valid"));

static DASHES_AND_UNDERSCORES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[-_]+").expect("separator pattern is valid"));

/// Canonicalizes a raw assembly name into a comparison key.
///
/// The steps run in a fixed order because each one relies on the separators the
/// previous one leaves behind:
/// 1. canonical decomposition with combining marks dropped
/// 2. lowercasing
/// 3. typographic quotes and dashes folded to `'` and `-`
/// 4. `(sc)`, `(st)` and `(general)` removed
/// 5. remaining brackets, dots and commas turned into spaces
/// 6. hyphen and underscore runs turned into spaces
/// 7. whitespace collapsed and trimmed
pub fn normalize_assembly_name(raw: &str) -> String {
    let stripped: String = raw
        .trim()
        .nfd()
        .filter(|c| !is_stripped_mark(*c))
        .collect();

    let folded: String = stripped
        .to_lowercase()
        .chars()
        .map(|c| match c {
            '\u{2019}' | '\u{2018}' | '`' => '\'',
            '\u{2013}' | '\u{2014}' => '-',
            other => other,
        })
        .collect();

    let without_suffix = CATEGORY_SUFFIX.replace_all(&folded, "");
    let spaced = BRACKETS_AND_PUNCTUATION.replace_all(&without_suffix, " ");
    let separated = DASHES_AND_UNDERSCORES.replace_all(&spaced, " ");

    separated.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Same as [`normalize_assembly_name`] but for an absent name.
pub fn normalize_opt(raw: Option<&str>) -> String {
    raw.map(normalize_assembly_name).unwrap_or_default()
}

// Combining Diacritical Marks block
fn is_stripped_mark(c: char) -> bool {
    ('\u{0300}'..='\u{036f}').contains(&c)
}
