// src/aggregators/conversions.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;

use super::{Dataset, IndexBuilder, KeyIndex};
use crate::models::{CallCenterDocument, MatchInfo};
use crate::sources::CollectionReader;

pub const CALL_CENTER_COLLECTION: &str = "call-center-external";

/// Converted call-center contacts per assembly. Each `convertedList` row counts once.
#[derive(Debug, Clone, Copy, Default)]
pub struct Conversions;

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ConversionMetrics {
    pub conversions: u64,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
}

#[async_trait]
impl Dataset for Conversions {
    type Entry = u64;
    type Summary = ();
    type Metrics = ConversionMetrics;

    fn name(&self) -> &'static str {
        CALL_CENTER_COLLECTION
    }

    async fn build(&self, reader: &dyn CollectionReader) -> Result<KeyIndex<u64>> {
        let docs = reader
            .read_all(CALL_CENTER_COLLECTION)
            .await
            .context("Failed to read call-center documents")?;

        let mut builder = IndexBuilder::<u64>::new();
        for doc in &docs {
            let record: CallCenterDocument = doc.decode();
            let rows = record.summary.map(|s| s.converted_list).unwrap_or_default();
            for row in rows {
                *builder.record(row.ac_name.as_deref()) += 1;
            }
        }
        Ok(builder.finish())
    }

    fn report(
        &self,
        entry: Option<&u64>,
        _summary: &(),
        info: MatchInfo,
    ) -> ConversionMetrics {
        ConversionMetrics {
            conversions: entry.copied().unwrap_or(0),
            match_info: info,
        }
    }
}
