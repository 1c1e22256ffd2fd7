// src/matching/variants.rs

use anyhow::{Context, Result};
use log::{debug, info};
use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::normalize::normalize_assembly_name;

/// Spacing variants of an already-normalized key: as-is, squashed, and hyphen-joined.
pub fn key_variants(key: &str) -> BTreeSet<String> {
    let tokens: Vec<&str> = key.split_whitespace().collect();
    let mut variants = BTreeSet::new();
    variants.insert(key.to_string());
    variants.insert(tokens.concat());
    variants.insert(tokens.join("-"));
    variants
}

/// Curated alternate spellings keyed by canonical key. Read-only once built.
#[derive(Debug, Clone, Default)]
pub struct AliasTable {
    aliases: HashMap<String, Vec<String>>,
}

impl AliasTable {
    pub fn empty() -> Self {
        Self::default()
    }

    /// Builds a table from `(name, aliases)` pairs. Names are normalized so callers may
    /// key the table by any raw spelling; aliases for colliding keys are appended in order.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, Vec<V>)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut aliases: HashMap<String, Vec<String>> = HashMap::new();
        for (name, list) in pairs {
            let key = normalize_assembly_name(name.as_ref());
            if key.is_empty() {
                continue;
            }
            aliases
                .entry(key)
                .or_default()
                .extend(list.into_iter().map(Into::into));
        }
        Self { aliases }
    }

    /// Parses a JSON object of the form `{ "ara": ["Arrah", "Aarah"] }`.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let raw: HashMap<String, Vec<String>> =
            serde_json::from_str(json).context("Alias table is not a JSON object of string lists")?;
        Ok(Self::from_pairs(raw))
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read alias table {}", path.display()))?;
        let table = Self::from_json_str(&json)
            .with_context(|| format!("Failed to parse alias table {}", path.display()))?;
        info!(
            "Loaded {} alias entries from {}",
            table.len(),
            path.display()
        );
        Ok(table)
    }

    /// Loads from `path` when one is configured, otherwise returns an empty table.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(p) => Self::from_path(p),
            None => {
                info!("No alias table configured; matching on spelling variants only");
                Ok(Self::empty())
            }
        }
    }

    pub fn len(&self) -> usize {
        self.aliases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.aliases.is_empty()
    }

    /// Raw alias spellings for the canonical key of `raw`, or an empty slice.
    pub fn aliases_for(&self, raw: &str) -> &[String] {
        let key = normalize_assembly_name(raw);
        self.aliases.get(&key).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Every key worth trying for `raw`: its own spacing variants plus those of each alias.
pub fn candidate_keys(raw: &str, aliases: &AliasTable) -> BTreeSet<String> {
    let base = normalize_assembly_name(raw);
    let mut candidates = key_variants(&base);
    for alias in aliases.aliases_for(raw) {
        candidates.extend(key_variants(&normalize_assembly_name(alias)));
    }
    debug!(
        "Generated {} candidate keys for '{}'",
        candidates.len(),
        raw
    );
    candidates
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn variants_cover_spacing_forms() {
        assert_eq!(
            key_variants("danapur cantt"),
            set(&["danapur cantt", "danapurcantt", "danapur-cantt"])
        );
        assert_eq!(key_variants("ara"), set(&["ara"]));
        assert_eq!(key_variants(""), set(&[""]));
    }

    #[test]
    fn alias_lookup_normalizes_the_query() {
        let table = AliasTable::from_pairs(vec![("Ara", vec!["Arrah", "Aarah"])]);
        assert_eq!(table.aliases_for("ARA (SC)"), ["Arrah", "Aarah"]);
        assert!(table.aliases_for("Gaya").is_empty());
    }

    #[test]
    fn candidate_keys_include_alias_variants() {
        let table = AliasTable::from_json_str(r#"{"ara": ["Arrah Town"]}"#).unwrap();
        let keys = candidate_keys("Ara (SC)", &table);
        assert_eq!(keys, set(&["ara", "arrah town", "arrahtown", "arrah-town"]));
    }

    #[test]
    fn candidate_keys_always_contain_the_normalized_name() {
        let table = AliasTable::from_pairs(vec![("Bikram", vec!["Vikram"])]);
        for name in ["Bikram", "Danapur Cantt.", "  Gaya Town (SC) ", "", "Bānkīpur"] {
            let keys = candidate_keys(name, &table);
            assert!(keys.contains(&normalize_assembly_name(name)), "{:?}", name);
        }
    }

    #[test]
    fn malformed_alias_json_is_an_error() {
        assert!(AliasTable::from_json_str(r#"["ara"]"#).is_err());
        assert!(AliasTable::load(None).unwrap().is_empty());
    }
}
