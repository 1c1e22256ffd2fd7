// src/aggregators/complaints.rs

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::join_all;
use log::{info, warn};
use serde::Serialize;
use std::collections::HashMap;
use uuid::Uuid;

use super::{Dataset, IndexBuilder, KeyIndex};
use crate::models::{ComplaintRecord, Document, MatchInfo};
use crate::sources::CollectionReader;

pub const COMPLAINTS_COLLECTION: &str = "manifesto-complaints";
pub const AC_MANIFESTO_FORM: &str = "ac-manifesto";

// Current and legacy names of the form discriminator
pub const FORM_TYPE_FIELDS: [&str; 3] = ["form_type", "from_type", "formType"];

/// AC-level manifesto complaints per assembly.
#[derive(Debug, Clone, Copy, Default)]
pub struct Complaints;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComplaintMetrics {
    pub total_complaints: u64,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
}

/// Merges query results unique by document id. Documents without an id are always kept.
fn merge_unique(batches: Vec<Vec<Document>>) -> Vec<Document> {
    let mut merged: HashMap<String, Document> = HashMap::new();
    for doc in batches.into_iter().flatten() {
        let id = doc
            .id
            .clone()
            .unwrap_or_else(|| Uuid::new_v4().to_string());
        merged.entry(id).or_insert(doc);
    }
    merged.into_values().collect()
}

#[async_trait]
impl Dataset for Complaints {
    type Entry = u64;
    type Summary = ();
    type Metrics = ComplaintMetrics;

    fn name(&self) -> &'static str {
        COMPLAINTS_COLLECTION
    }

    async fn build(&self, reader: &dyn CollectionReader) -> Result<KeyIndex<u64>> {
        let queries: Vec<_> = FORM_TYPE_FIELDS
            .iter()
            .map(|&field| reader.read_where(COMPLAINTS_COLLECTION, field, AC_MANIFESTO_FORM))
            .collect();
        let results = join_all(queries).await;

        let mut batches = Vec::new();
        let mut failures = Vec::new();
        for (field, result) in FORM_TYPE_FIELDS.iter().zip(results) {
            match result {
                Ok(docs) => {
                    info!("{} documents with {} = {}", docs.len(), field, AC_MANIFESTO_FORM);
                    batches.push(docs);
                }
                Err(e) => {
                    warn!("Complaint query on '{}' failed: {:#}", field, e);
                    failures.push(e);
                }
            }
        }
        if batches.is_empty() {
            let detail = failures
                .iter()
                .map(|e| format!("{:#}", e))
                .collect::<Vec<_>>()
                .join("; ");
            return Err(anyhow!("Every complaint query failed: {}", detail));
        }

        let mut builder = IndexBuilder::<u64>::new();
        for doc in merge_unique(batches) {
            let record: ComplaintRecord = doc.decode();
            *builder.record(record.ac_name.as_deref()) += 1;
        }
        Ok(builder.finish())
    }

    fn report(
        &self,
        entry: Option<&u64>,
        _summary: &(),
        info: MatchInfo,
    ) -> ComplaintMetrics {
        ComplaintMetrics {
            total_complaints: entry.copied().unwrap_or(0),
            match_info: info,
        }
    }
}
