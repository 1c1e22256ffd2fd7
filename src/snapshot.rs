// src/snapshot.rs

use anyhow::{Context, Result};
use log::{debug, info, warn};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

use crate::aggregators::{
    ComplaintAggregator, SlpTrainingAggregator, TrainingAggregator, WhatsappAggregator,
};
use crate::sources::{self, DetailFetcher, DetailFilter, DetailKind, Level};

pub const WTM_VERTICAL: &str = "wtm";
pub const SHAKTI_VERTICAL: &str = "shakti-abhiyaan";

/// Compact per-assembly summary across several datasets. Every field is zero when its
/// source failed or did not match.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CombinedMetrics {
    pub nukkad_meetings: u64,
    pub whatsapp_groups: u64,
    pub training_sessions: u64,
    pub manifesto_complaints: u64,
    pub slp_training: u64,
}

#[derive(Debug, Clone, Copy)]
struct CachedSnapshot {
    data: CombinedMetrics,
    computed_at: Instant,
}

/// Spellings sent to the detail fetch, which matches names exactly.
pub fn assembly_variations(name: &str) -> Vec<String> {
    let mut variations: Vec<String> = Vec::with_capacity(6);
    for candidate in [
        name.to_string(),
        name.to_lowercase(),
        name.to_uppercase(),
        format!("{} (SC)", name),
        format!("{} (ST)", name),
        format!("{} (General)", name),
    ] {
        if !variations.contains(&candidate) {
            variations.push(candidate);
        }
    }
    variations
}

fn fold_metric(label: &str, name: &str, result: Result<u64>) -> u64 {
    match result {
        Ok(value) => value,
        Err(e) => {
            warn!("{} for '{}' unavailable, reporting 0: {:#}", label, name, e);
            0
        }
    }
}

pub struct SnapshotBuilder {
    whatsapp: Arc<WhatsappAggregator>,
    training: Arc<TrainingAggregator>,
    complaints: Arc<ComplaintAggregator>,
    slp_training: Arc<SlpTrainingAggregator>,
    details: Arc<dyn DetailFetcher>,
    io_timeout: Duration,
    ttl: Duration,
    cache: Mutex<HashMap<String, CachedSnapshot>>,
}

impl SnapshotBuilder {
    pub fn new(
        whatsapp: Arc<WhatsappAggregator>,
        training: Arc<TrainingAggregator>,
        complaints: Arc<ComplaintAggregator>,
        slp_training: Arc<SlpTrainingAggregator>,
        details: Arc<dyn DetailFetcher>,
        io_timeout: Duration,
        ttl: Duration,
    ) -> Self {
        Self {
            whatsapp,
            training,
            complaints,
            slp_training,
            details,
            io_timeout,
            ttl,
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Returns the cached summary for `name` when it is younger than the TTL, otherwise
    /// recomputes it. Never fails: unavailable metrics are reported as 0.
    pub async fn snapshot_for(&self, name: &str) -> CombinedMetrics {
        let key = name.trim().to_string();

        if let Some(cached) = self.cache.lock().await.get(&key) {
            if cached.computed_at.elapsed() < self.ttl {
                debug!("Snapshot cache hit for '{}'", key);
                return cached.data;
            }
        }

        let start = Instant::now();
        let data = self.compute(&key).await;
        info!("Computed snapshot for '{}' in {:.2?}: {:?}", key, start.elapsed(), data);

        // concurrent refreshes of the same key may both land here; last write wins
        self.cache.lock().await.insert(
            key,
            CachedSnapshot {
                data,
                computed_at: Instant::now(),
            },
        );
        data
    }

    /// Drops every cached snapshot.
    pub async fn clear(&self) {
        self.cache.lock().await.clear();
    }

    pub async fn cached_len(&self) -> usize {
        self.cache.lock().await.len()
    }

    async fn compute(&self, name: &str) -> CombinedMetrics {
        let (whatsapp, training, complaints, slp_training, nukkad) = tokio::join!(
            async {
                let m = self.whatsapp.metrics_for_assembly(name).await?;
                Ok::<_, anyhow::Error>(m.groups_in_assembly)
            },
            async {
                let m = self.training.metrics_for_assembly(name).await?;
                Ok::<_, anyhow::Error>(m.totals.sessions)
            },
            async {
                let m = self.complaints.metrics_for_assembly(name).await?;
                Ok::<_, anyhow::Error>(m.total_complaints)
            },
            async {
                let m = self.slp_training.metrics_for_assembly(name).await?;
                Ok::<_, anyhow::Error>(m.total_slps)
            },
            self.nukkad_meetings(name),
        );

        CombinedMetrics {
            nukkad_meetings: nukkad,
            whatsapp_groups: fold_metric("WhatsApp groups", name, whatsapp),
            training_sessions: fold_metric("Training sessions", name, training),
            manifesto_complaints: fold_metric("Manifesto complaints", name, complaints),
            slp_training: fold_metric("SLP training", name, slp_training),
        }
    }

    /// WTM AC + WTM SLP + Shakti AC meetings. Each fetch is folded on its own so one failing
    /// family does not hide the others. Records matching several spellings are not deduplicated.
    async fn nukkad_meetings(&self, name: &str) -> u64 {
        let assemblies = assembly_variations(name);
        let filter = |vertical: Option<&str>| DetailFilter {
            level: Level::Assembly,
            assemblies: assemblies.clone(),
            vertical: vertical.map(str::to_string),
        };
        let wtm_ac_filter = filter(Some(WTM_VERTICAL));
        let wtm_slp_filter = filter(None);
        let shakti_ac_filter = filter(Some(SHAKTI_VERTICAL));

        let (wtm_ac, wtm_slp, shakti_ac) = tokio::join!(
            self.count_details(DetailKind::AcNukkad, &wtm_ac_filter),
            self.count_details(DetailKind::SlpNukkad, &wtm_slp_filter),
            self.count_details(DetailKind::AcNukkad, &shakti_ac_filter),
        );

        fold_metric("WTM AC nukkad meetings", name, wtm_ac)
            + fold_metric("WTM SLP nukkad meetings", name, wtm_slp)
            + fold_metric("Shakti AC nukkad meetings", name, shakti_ac)
    }

    async fn count_details(&self, kind: DetailKind, filter: &DetailFilter) -> Result<u64> {
        let records = sources::bounded(
            self.io_timeout,
            kind.collection(),
            self.details.fetch_detailed(kind, filter),
        )
        .await
        .with_context(|| format!("Detail fetch from {} failed", kind.collection()))?;
        Ok(records.len() as u64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn variations_cover_case_and_category_suffixes() {
        assert_eq!(
            assembly_variations("Ara"),
            vec!["Ara", "ara", "ARA", "Ara (SC)", "Ara (ST)", "Ara (General)"]
        );
    }

    #[test]
    fn duplicate_variations_are_dropped() {
        let v = assembly_variations("123");
        assert_eq!(v, vec!["123", "123 (SC)", "123 (ST)", "123 (General)"]);
    }

    #[test]
    fn failed_metrics_fold_to_zero() {
        assert_eq!(fold_metric("x", "Ara", Ok(4)), 4);
        assert_eq!(fold_metric("x", "Ara", Err(anyhow::anyhow!("down"))), 0);
    }
}
