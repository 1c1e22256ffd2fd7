// src/aggregators/slp_training.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{Dataset, IndexBuilder, KeyIndex};
use crate::models::{MatchInfo, SlpStatus, SlpTrainingRecord};
use crate::sources::CollectionReader;

pub const SLP_TRAINING_COLLECTION: &str = "slp_training";

#[derive(Debug, Clone, Copy, Default)]
pub struct SlpTraining;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SlpTally {
    pub total: u64,
    pub trained: u64,
    pub pending: u64,
    pub in_progress: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SlpTrainingMetrics {
    pub total_slps: u64,
    pub trained_count: u64,
    pub pending_count: u64,
    pub in_progress_count: u64,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
}

#[async_trait]
impl Dataset for SlpTraining {
    type Entry = SlpTally;
    type Summary = ();
    type Metrics = SlpTrainingMetrics;

    fn name(&self) -> &'static str {
        SLP_TRAINING_COLLECTION
    }

    async fn build(&self, reader: &dyn CollectionReader) -> Result<KeyIndex<SlpTally>> {
        let docs = reader
            .read_all(SLP_TRAINING_COLLECTION)
            .await
            .context("Failed to read SLP training records")?;

        let mut builder = IndexBuilder::<SlpTally>::new();
        for doc in &docs {
            let record: SlpTrainingRecord = doc.decode();
            let tally = builder.record(record.assembly.as_deref());
            tally.total += 1;
            match SlpStatus::parse(record.status.as_deref()) {
                SlpStatus::Trained => tally.trained += 1,
                SlpStatus::Pending => tally.pending += 1,
                SlpStatus::InProgress => tally.in_progress += 1,
                SlpStatus::Other => {}
            }
        }
        Ok(builder.finish())
    }

    fn report(
        &self,
        entry: Option<&SlpTally>,
        _summary: &(),
        info: MatchInfo,
    ) -> SlpTrainingMetrics {
        let tally = entry.copied().unwrap_or_default();
        SlpTrainingMetrics {
            total_slps: tally.total,
            trained_count: tally.trained,
            pending_count: tally.pending,
            in_progress_count: tally.in_progress,
            match_info: info,
        }
    }
}
