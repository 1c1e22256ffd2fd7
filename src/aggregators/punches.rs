// src/aggregators/punches.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use log::debug;
use serde::Serialize;
use std::collections::HashMap;

use super::{Dataset, IndexBuilder, KeyIndex};
use crate::config::EngineConfig;
use crate::models::{MatchInfo, PunchRecord};
use crate::sources::CollectionReader;

pub const PUNCHES_COLLECTION: &str = "ggy_slp_data";

/// Door-to-door punch totals per assembly, restricted to an inclusive date window.
#[derive(Debug, Clone, Copy)]
pub struct Punches {
    start: NaiveDate,
    end: NaiveDate,
}

#[derive(Debug, Clone, Default)]
pub struct MemberTally {
    pub name: String,
    pub total_punches: u64,
}

#[derive(Debug, Clone, Default)]
pub struct PunchTally {
    pub total_punches: u64,
    pub unique_punches: u64,
    /// Keyed by member id, falling back to member name.
    pub members: HashMap<String, MemberTally>,
}

impl PunchTally {
    /// Member with the most punches; ties go to the lexicographically smallest name.
    pub fn top_member(&self) -> Option<TopMember> {
        self.members
            .values()
            .max_by(|a, b| {
                a.total_punches
                    .cmp(&b.total_punches)
                    .then_with(|| b.name.cmp(&a.name))
            })
            .map(|m| TopMember {
                name: m.name.clone(),
                total_punches: m.total_punches,
            })
    }
}

#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TopMember {
    pub name: String,
    pub total_punches: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PunchMetrics {
    pub total_punches: u64,
    pub unique_punches: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub top_member: Option<TopMember>,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
}

impl Punches {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        let (start, end) = config.punches_window();
        Self::new(start, end)
    }

    /// Records without a parseable `YYYY-MM-DD` date are kept.
    fn in_window(&self, date: Option<&str>) -> bool {
        match date.map(|d| NaiveDate::parse_from_str(d.trim(), "%Y-%m-%d")) {
            Some(Ok(day)) => self.start <= day && day <= self.end,
            _ => true,
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

#[async_trait]
impl Dataset for Punches {
    type Entry = PunchTally;
    type Summary = ();
    type Metrics = PunchMetrics;

    fn name(&self) -> &'static str {
        PUNCHES_COLLECTION
    }

    async fn build(&self, reader: &dyn CollectionReader) -> Result<KeyIndex<PunchTally>> {
        let docs = reader
            .read_all(PUNCHES_COLLECTION)
            .await
            .context("Failed to read punch records")?;

        let mut builder = IndexBuilder::<PunchTally>::new();
        let mut skipped = 0usize;
        for doc in &docs {
            let record: PunchRecord = doc.decode();
            if !self.in_window(record.date.as_deref()) {
                skipped += 1;
                continue;
            }

            let tally = builder.record(record.assembly.as_deref());
            tally.total_punches += record.total_punches;
            tally.unique_punches += record.unique_punches;

            let id = non_blank(record.slp_id.as_deref());
            let name = non_blank(record.slp_name.as_deref());
            if let Some(member_key) = id.or(name) {
                let member = tally
                    .members
                    .entry(member_key.to_string())
                    .or_insert_with(|| MemberTally {
                        name: name.unwrap_or(member_key).to_string(),
                        total_punches: 0,
                    });
                member.total_punches += record.total_punches;
            }
        }
        if skipped > 0 {
            debug!(
                "Skipped {} punch records outside {}..{}",
                skipped, self.start, self.end
            );
        }
        Ok(builder.finish())
    }

    fn report(
        &self,
        entry: Option<&PunchTally>,
        _summary: &(),
        info: MatchInfo,
    ) -> PunchMetrics {
        match entry {
            Some(tally) => PunchMetrics {
                total_punches: tally.total_punches,
                unique_punches: tally.unique_punches,
                top_member: tally.top_member(),
                match_info: info,
            },
            None => PunchMetrics {
                total_punches: 0,
                unique_punches: 0,
                top_member: None,
                match_info: info,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sources::MemoryStore;
    use serde_json::json;

    fn window() -> Punches {
        Punches::new(
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
        )
    }

    #[tokio::test]
    async fn sums_punches_and_picks_top_member() {
        let store = MemoryStore::new().with_collection(
            PUNCHES_COLLECTION,
            vec![
                json!({"assembly": "Ara", "slpId": "s1", "slpName": "Ravi", "totalPunches": 10, "uniquePunches": 7, "date": "2024-03-01"}),
                json!({"assembly": "Ara", "slpId": "s1", "slpName": "Ravi", "totalPunches": 5, "uniquePunches": 5, "date": "2024-03-02"}),
                json!({"assembly": "ARA", "slpId": "s2", "slpName": "Anil", "totalPunches": "12", "uniquePunches": 3, "date": "2024-03-02"}),
                json!({"assembly": "Ara", "slpId": "s3", "slpName": "Bina", "totalPunches": 100, "date": "2023-12-31"}),
            ],
        );
        let punches = window();
        let index = punches.build(&store).await.unwrap();
        let tally = &index.get("ara").unwrap().entry;
        assert_eq!(tally.total_punches, 27);
        assert_eq!(tally.unique_punches, 15);
        assert_eq!(
            tally.top_member(),
            Some(TopMember {
                name: "Ravi".to_string(),
                total_punches: 15
            })
        );
    }

    #[test]
    fn undated_records_stay_in_window() {
        let punches = window();
        assert!(punches.in_window(None));
        assert!(punches.in_window(Some("yesterday")));
        assert!(punches.in_window(Some("2024-12-31")));
        assert!(!punches.in_window(Some("2025-01-01")));
    }

    #[test]
    fn top_member_ties_go_to_smallest_name() {
        let mut tally = PunchTally::default();
        for (id, name) in [("s9", "Meena"), ("s1", "Kavita")] {
            tally.members.insert(
                id.to_string(),
                MemberTally {
                    name: name.to_string(),
                    total_punches: 8,
                },
            );
        }
        assert_eq!(tally.top_member().unwrap().name, "Kavita");
    }

    #[test]
    fn unmatched_report_has_no_top_member() {
        let metrics = window().report(None, &(), MatchInfo::unmatched(-1.0));
        assert_eq!(metrics.total_punches, 0);
        assert!(metrics.top_member.is_none());
    }
}
