// src/models.rs

use log::warn;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::config::{
    HIGH_CONFIDENCE_THRESHOLD, LOW_CONFIDENCE_THRESHOLD, MEDIUM_CONFIDENCE_THRESHOLD,
};

//------------------------------------------------------------------------------
// MATCH RESULTS
//------------------------------------------------------------------------------

/// Coarse bucket derived from a similarity score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchConfidence {
    High,
    Medium,
    Low,
    Unmatched,
}

impl MatchConfidence {
    /// Total partition of the score line: NaN and anything below the low threshold is unmatched.
    pub fn from_score(score: f64) -> Self {
        if score >= HIGH_CONFIDENCE_THRESHOLD {
            MatchConfidence::High
        } else if score >= MEDIUM_CONFIDENCE_THRESHOLD {
            MatchConfidence::Medium
        } else if score >= LOW_CONFIDENCE_THRESHOLD {
            MatchConfidence::Low
        } else {
            MatchConfidence::Unmatched
        }
    }

    pub fn is_match(&self) -> bool {
        !matches!(self, MatchConfidence::Unmatched)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            MatchConfidence::High => "high",
            MatchConfidence::Medium => "medium",
            MatchConfidence::Low => "low",
            MatchConfidence::Unmatched => "unmatched",
        }
    }
}

/// How a queried name was resolved against one dataset.
///
/// `matched_key` carries the dataset's representative raw spelling, not the canonical key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchInfo {
    pub matched_key: Option<String>,
    pub confidence: MatchConfidence,
    pub score: f64,
}

impl MatchInfo {
    pub fn unmatched(score: f64) -> Self {
        Self {
            matched_key: None,
            confidence: MatchConfidence::Unmatched,
            score: score.max(0.0),
        }
    }
}

//------------------------------------------------------------------------------
// SOURCE DOCUMENTS
//------------------------------------------------------------------------------

/// One record of a document collection, as handed over by a collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    #[serde(default)]
    pub id: Option<String>,
    pub data: Value,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Value) -> Self {
        Self {
            id: Some(id.into()),
            data,
        }
    }

    /// Decodes the payload into a typed record. Payloads that are not even shaped like the
    /// record fall back to the record's default so the row is still counted.
    pub fn decode<T: DeserializeOwned + Default>(&self) -> T {
        match T::deserialize(&self.data) {
            Ok(record) => record,
            Err(e) => {
                warn!(
                    "Undecodable document {}: {}. Counting it with default fields.",
                    self.id.as_deref().unwrap_or("<no id>"),
                    e
                );
                T::default()
            }
        }
    }
}

//------------------------------------------------------------------------------
// LENIENT FIELD DECODERS
//------------------------------------------------------------------------------

/// Accepts strings and numbers; anything else becomes `None`.
pub fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    })
}

/// Accepts non-negative numbers and strings with a leading run of digits ("120 members").
pub fn lenient_count<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f.trunc() as u64)
            })
            .unwrap_or(0),
        Some(Value::String(s)) => leading_digits(&s),
        _ => 0,
    })
}

/// Accepts an array of rows; a non-array becomes empty and an unreadable row becomes a default row.
pub fn lenient_rows<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned + Default,
{
    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::Array(items)) => items
            .iter()
            .map(|item| T::deserialize(item).unwrap_or_default())
            .collect(),
        _ => Vec::new(),
    })
}

fn leading_digits(s: &str) -> u64 {
    let digits: String = s
        .trim_start()
        .chars()
        .take_while(|c| c.is_ascii_digit())
        .collect();
    digits.parse().unwrap_or(0)
}

//------------------------------------------------------------------------------
// TYPED RECORDS
//------------------------------------------------------------------------------

/// `call-center-external` document; only the converted list matters here.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallCenterDocument {
    #[serde(default)]
    pub summary: Option<CallCenterSummary>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallCenterSummary {
    #[serde(rename = "convertedList", default, deserialize_with = "lenient_rows")]
    pub converted_list: Vec<ConvertedRow>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ConvertedRow {
    #[serde(rename = "acName", default, deserialize_with = "lenient_string")]
    pub ac_name: Option<String>,
}

/// Per-member door-to-door punch tally for one day.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PunchRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub assembly: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub slp_id: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub slp_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub total_punches: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub unique_punches: u64,
    #[serde(default, deserialize_with = "lenient_string")]
    pub date: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ComplaintRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub ac_name: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrainingRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub assembly: Option<String>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub attendees: u64,
    #[serde(default, deserialize_with = "lenient_count")]
    pub attendees_other_than_club: u64,
}

impl TrainingRecord {
    pub fn total_attendees(&self) -> u64 {
        self.attendees + self.attendees_other_than_club
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlpStatus {
    Trained,
    Pending,
    InProgress,
    Other,
}

impl SlpStatus {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(|s| s.trim()) {
            Some("trained") => SlpStatus::Trained,
            Some("pending") => SlpStatus::Pending,
            Some("in-progress") => SlpStatus::InProgress,
            _ => SlpStatus::Other,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SlpTrainingRecord {
    #[serde(default, deserialize_with = "lenient_string")]
    pub assembly: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub status: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WhatsappGroupRecord {
    #[serde(rename = "Assembly", default, deserialize_with = "lenient_string")]
    pub assembly: Option<String>,
    #[serde(rename = "Group Members", default, deserialize_with = "lenient_count")]
    pub group_members: u64,
}
