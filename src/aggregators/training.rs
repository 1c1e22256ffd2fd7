// src/aggregators/training.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{Dataset, IndexBuilder, KeyIndex};
use crate::models::{MatchInfo, TrainingRecord};
use crate::sources::CollectionReader;

pub const TRAINING_COLLECTION: &str = "training";
pub const WTM_FORM: &str = "wtm";
pub const SHAKTI_FORM: &str = "shakti-data";

/// Training sessions per assembly, split by programme and merged into one key index.
#[derive(Debug, Clone, Copy, Default)]
pub struct Training;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct SessionTally {
    pub sessions: u64,
    pub attendees: u64,
}

impl SessionTally {
    fn add(&mut self, record: &TrainingRecord) {
        self.sessions += 1;
        self.attendees += record.total_attendees();
    }

    fn combined(self, other: SessionTally) -> SessionTally {
        SessionTally {
            sessions: self.sessions + other.sessions,
            attendees: self.attendees + other.attendees,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct TrainingTally {
    pub wtm: SessionTally,
    pub shakti: SessionTally,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TrainingMetrics {
    pub wtm: SessionTally,
    pub shakti: SessionTally,
    pub totals: SessionTally,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
}

#[async_trait]
impl Dataset for Training {
    type Entry = TrainingTally;
    type Summary = ();
    type Metrics = TrainingMetrics;

    fn name(&self) -> &'static str {
        TRAINING_COLLECTION
    }

    async fn build(&self, reader: &dyn CollectionReader) -> Result<KeyIndex<TrainingTally>> {
        let (wtm, shakti) = futures::try_join!(
            reader.read_where(TRAINING_COLLECTION, "form_type", WTM_FORM),
            reader.read_where(TRAINING_COLLECTION, "form_type", SHAKTI_FORM),
        )
        .context("Failed to read training records")?;

        let mut builder = IndexBuilder::<TrainingTally>::new();
        for doc in &wtm {
            let record: TrainingRecord = doc.decode();
            builder.record(record.assembly.as_deref()).wtm.add(&record);
        }
        for doc in &shakti {
            let record: TrainingRecord = doc.decode();
            builder.record(record.assembly.as_deref()).shakti.add(&record);
        }
        Ok(builder.finish())
    }

    fn report(
        &self,
        entry: Option<&TrainingTally>,
        _summary: &(),
        info: MatchInfo,
    ) -> TrainingMetrics {
        let tally = entry.cloned().unwrap_or_default();
        TrainingMetrics {
            wtm: tally.wtm,
            shakti: tally.shakti,
            totals: tally.wtm.combined(tally.shakti),
            match_info: info,
        }
    }
}
