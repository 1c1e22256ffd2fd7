// src/matching/mod.rs
pub mod matcher;
pub mod normalize;
pub mod similarity;
pub mod variants;

pub use matcher::{best_match, BestMatch};
pub use normalize::normalize_assembly_name;
pub use similarity::jaro_winkler;
pub use variants::{candidate_keys, key_variants, AliasTable};
