// src/engine.rs

use anyhow::Result;
use log::{info, warn};
use serde::Serialize;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::aggregators::{
    Aggregator, ComplaintAggregator, ComplaintMetrics, Complaints, ConversionAggregator,
    ConversionMetrics, Conversions, Dataset, PunchAggregator, PunchMetrics, Punches, SlpTraining,
    SlpTrainingAggregator, SlpTrainingMetrics, Training, TrainingAggregator, TrainingMetrics,
    WhatsappAggregator, WhatsappGroups, WhatsappMetrics,
};
use crate::config::EngineConfig;
use crate::matching::AliasTable;
use crate::snapshot::{CombinedMetrics, SnapshotBuilder};
use crate::sources::{CollectionReader, DetailFetcher};

/// Every dataset's view of one assembly. A dataset whose index could not be built is `None`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssemblyReport {
    pub assembly: String,
    pub conversions: Option<ConversionMetrics>,
    pub punches: Option<PunchMetrics>,
    pub complaints: Option<ComplaintMetrics>,
    pub training: Option<TrainingMetrics>,
    pub slp_training: Option<SlpTrainingMetrics>,
    pub whatsapp: Option<WhatsappMetrics>,
    pub snapshot: CombinedMetrics,
}

/// Owns one aggregator per dataset plus the snapshot builder over the shared ones.
pub struct Engine {
    pub conversions: Arc<ConversionAggregator>,
    pub punches: Arc<PunchAggregator>,
    pub complaints: Arc<ComplaintAggregator>,
    pub training: Arc<TrainingAggregator>,
    pub slp_training: Arc<SlpTrainingAggregator>,
    pub whatsapp: Arc<WhatsappAggregator>,
    pub snapshots: SnapshotBuilder,
}

fn ok_or_log<T>(dataset: &str, name: &str, result: Result<T>) -> Option<T> {
    match result {
        Ok(metrics) => Some(metrics),
        Err(e) => {
            warn!("{} metrics for '{}' failed: {:#}", dataset, name, e);
            None
        }
    }
}

fn aggregator<D: Dataset>(
    dataset: D,
    reader: &Arc<dyn CollectionReader>,
    aliases: &Arc<AliasTable>,
    timeout: Duration,
) -> Arc<Aggregator<D>> {
    Arc::new(Aggregator::new(dataset, reader.clone(), aliases.clone(), timeout))
}

impl Engine {
    pub fn new(
        reader: Arc<dyn CollectionReader>,
        details: Arc<dyn DetailFetcher>,
        aliases: AliasTable,
        config: &EngineConfig,
    ) -> Self {
        let aliases = Arc::new(aliases);
        let timeout = config.io_timeout;

        let conversions = aggregator(Conversions, &reader, &aliases, timeout);
        let punches = aggregator(Punches::from_config(config), &reader, &aliases, timeout);
        let complaints = aggregator(Complaints, &reader, &aliases, timeout);
        let training = aggregator(Training, &reader, &aliases, timeout);
        let slp_training = aggregator(SlpTraining, &reader, &aliases, timeout);
        let whatsapp = aggregator(WhatsappGroups, &reader, &aliases, timeout);

        let snapshots = SnapshotBuilder::new(
            whatsapp.clone(),
            training.clone(),
            complaints.clone(),
            slp_training.clone(),
            details,
            timeout,
            config.snapshot_ttl,
        );

        info!(
            "Engine ready: {} alias entries, io timeout {:?}, snapshot ttl {:?}",
            aliases.len(),
            timeout,
            config.snapshot_ttl
        );

        Self {
            conversions,
            punches,
            complaints,
            training,
            slp_training,
            whatsapp,
            snapshots,
        }
    }

    /// Queries every dataset concurrently, then the combined snapshot.
    pub async fn assembly_report(&self, name: &str) -> AssemblyReport {
        let start = Instant::now();
        let (conversions, punches, complaints, training, slp_training, whatsapp) = tokio::join!(
            self.conversions.metrics_for_assembly(name),
            self.punches.metrics_for_assembly(name),
            self.complaints.metrics_for_assembly(name),
            self.training.metrics_for_assembly(name),
            self.slp_training.metrics_for_assembly(name),
            self.whatsapp.metrics_for_assembly(name),
        );
        let snapshot = self.snapshots.snapshot_for(name).await;

        let report = AssemblyReport {
            assembly: name.to_string(),
            conversions: ok_or_log("Conversion", name, conversions),
            punches: ok_or_log("Punch", name, punches),
            complaints: ok_or_log("Complaint", name, complaints),
            training: ok_or_log("Training", name, training),
            slp_training: ok_or_log("SLP training", name, slp_training),
            whatsapp: ok_or_log("WhatsApp", name, whatsapp),
            snapshot,
        };
        info!("Report for '{}' assembled in {:.2?}", name, start.elapsed());
        report
    }
}
