// src/lib.rs
pub mod aggregators;
pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod matching;
pub mod models;
pub mod snapshot;
pub mod sources;

// Re-export common types for easier access
pub use aggregators::{Aggregator, Dataset, KeyIndex};
pub use config::EngineConfig;
pub use engine::{AssemblyReport, Engine};
pub use error::SourceError;
pub use matching::{best_match, candidate_keys, jaro_winkler, normalize_assembly_name, AliasTable};
pub use models::{Document, MatchConfidence, MatchInfo};
pub use snapshot::{CombinedMetrics, SnapshotBuilder};
pub use sources::{CollectionReader, DetailFetcher, MemoryStore};

pub use db::PgPool;
