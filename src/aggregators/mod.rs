// src/aggregators/mod.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::OnceCell;

use crate::matching::{candidate_keys, AliasTable};
use crate::models::MatchInfo;
use crate::sources::{self, CollectionReader};

pub mod complaints;
pub mod conversions;
pub mod index;
pub mod punches;
pub mod slp_training;
pub mod training;
pub mod whatsapp;

pub use complaints::{ComplaintMetrics, Complaints};
pub use conversions::{ConversionMetrics, Conversions};
pub use index::{IndexBuilder, KeyIndex, Resolution};
pub use punches::{PunchMetrics, Punches, TopMember};
pub use slp_training::{SlpTraining, SlpTrainingMetrics};
pub use training::{Training, TrainingMetrics};
pub use whatsapp::{WhatsappGroups, WhatsappMetrics, WhatsappOverall};

/// One source collection: how to fold it into a key index and how to report a resolved entry.
#[async_trait]
pub trait Dataset: Send + Sync + 'static {
    type Entry: Default + Send + Sync;
    /// Dataset-wide figures computed once during the build; `()` when a dataset has none.
    type Summary: Send + Sync;
    type Metrics: Send;

    /// Label used in logs and timeout errors.
    fn name(&self) -> &'static str;

    async fn build(
        &self,
        reader: &dyn CollectionReader,
    ) -> Result<KeyIndex<Self::Entry, Self::Summary>>;

    /// `entry` is `None` for unmatched queries; the per-assembly part must then be the zero shape.
    fn report(
        &self,
        entry: Option<&Self::Entry>,
        summary: &Self::Summary,
        info: MatchInfo,
    ) -> Self::Metrics;
}

/// Lazily built, read-only key index over one dataset.
///
/// The first query triggers the bulk read; concurrent first callers wait on the same build.
/// A failed build leaves the cell empty so the next query reads the source again.
pub struct Aggregator<D: Dataset> {
    dataset: D,
    reader: Arc<dyn CollectionReader>,
    aliases: Arc<AliasTable>,
    io_timeout: Duration,
    index: OnceCell<KeyIndex<D::Entry, D::Summary>>,
}

pub type ConversionAggregator = Aggregator<Conversions>;
pub type PunchAggregator = Aggregator<Punches>;
pub type ComplaintAggregator = Aggregator<Complaints>;
pub type TrainingAggregator = Aggregator<Training>;
pub type SlpTrainingAggregator = Aggregator<SlpTraining>;
pub type WhatsappAggregator = Aggregator<WhatsappGroups>;

impl<D: Dataset> Aggregator<D> {
    pub fn new(
        dataset: D,
        reader: Arc<dyn CollectionReader>,
        aliases: Arc<AliasTable>,
        io_timeout: Duration,
    ) -> Self {
        Self {
            dataset,
            reader,
            aliases,
            io_timeout,
            index: OnceCell::new(),
        }
    }

    async fn index(&self) -> Result<&KeyIndex<D::Entry, D::Summary>> {
        self.index
            .get_or_try_init(|| async {
                let name = self.dataset.name();
                let start = Instant::now();
                info!("Building {} index...", name);

                let index = sources::bounded(
                    self.io_timeout,
                    name,
                    self.dataset.build(self.reader.as_ref()),
                )
                .await
                .with_context(|| format!("Failed to build {} index", name))?;

                info!(
                    "Built {} index: {} records under {} keys in {:.2?}",
                    name,
                    index.record_count(),
                    index.len(),
                    start.elapsed()
                );
                Ok::<_, anyhow::Error>(index)
            })
            .await
    }

    /// Resolves `name` against the dataset and returns its metrics, or the zero shape when
    /// no key clears the low-confidence threshold. Errors only when the index cannot be built.
    pub async fn metrics_for_assembly(&self, name: &str) -> Result<D::Metrics> {
        let index = self.index().await?;
        let candidates = candidate_keys(name, &self.aliases);
        let Resolution { info, entry } = index.resolve(&candidates);
        debug!(
            "{}: '{}' -> {:?} ({}, {:.4})",
            self.dataset.name(),
            name,
            info.matched_key,
            info.confidence.as_str(),
            info.score
        );
        Ok(self.dataset.report(entry, index.summary(), info))
    }

    pub fn is_loaded(&self) -> bool {
        self.index.initialized()
    }

    /// Number of canonical keys, once the index has been built.
    pub fn key_count(&self) -> Option<usize> {
        self.index.get().map(|index| index.len())
    }

    pub fn dataset(&self) -> &D {
        &self.dataset
    }
}
