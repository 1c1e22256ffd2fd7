// src/aggregators/whatsapp.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use std::collections::HashSet;

use super::{Dataset, IndexBuilder, KeyIndex};
use crate::models::{MatchInfo, WhatsappGroupRecord};
use crate::sources::CollectionReader;

pub const WHATSAPP_COLLECTION: &str = "whatsapp_data";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    Shakti,
    Wtm,
    Public,
}

impl GroupKind {
    pub const ALL: [GroupKind; 3] = [GroupKind::Shakti, GroupKind::Wtm, GroupKind::Public];

    pub fn form_type(&self) -> &'static str {
        match self {
            GroupKind::Shakti => "shakti",
            GroupKind::Wtm => "wtm",
            GroupKind::Public => "public",
        }
    }
}

/// WhatsApp groups and their members per assembly, by group kind and combined.
#[derive(Debug, Clone, Copy, Default)]
pub struct WhatsappGroups;

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct GroupTally {
    pub groups: u64,
    pub members: u64,
}

impl GroupTally {
    fn add(&mut self, members: u64) {
        self.groups += 1;
        self.members += members;
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
pub struct GroupsByKind {
    pub shakti: GroupTally,
    pub wtm: GroupTally,
    pub public: GroupTally,
}

impl GroupsByKind {
    fn tally_mut(&mut self, kind: GroupKind) -> &mut GroupTally {
        match kind {
            GroupKind::Shakti => &mut self.shakti,
            GroupKind::Wtm => &mut self.wtm,
            GroupKind::Public => &mut self.public,
        }
    }

    pub fn combined(&self) -> GroupTally {
        GroupTally {
            groups: self.shakti.groups + self.wtm.groups + self.public.groups,
            members: self.shakti.members + self.wtm.members + self.public.members,
        }
    }
}

/// Totals over the whole collection, independent of the queried assembly.
#[derive(Debug, Clone, Copy, Default, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct WhatsappOverall {
    pub total_groups: u64,
    pub total_members: u64,
    /// Distinct non-empty `Assembly` values as written in the source.
    pub total_assemblies: u64,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WhatsappMetrics {
    pub groups_in_assembly: u64,
    pub members_in_assembly: u64,
    pub by_type: GroupsByKind,
    pub overall: WhatsappOverall,
    #[serde(rename = "match")]
    pub match_info: MatchInfo,
}

#[async_trait]
impl Dataset for WhatsappGroups {
    type Entry = GroupsByKind;
    type Summary = WhatsappOverall;
    type Metrics = WhatsappMetrics;

    fn name(&self) -> &'static str {
        WHATSAPP_COLLECTION
    }

    async fn build(
        &self,
        reader: &dyn CollectionReader,
    ) -> Result<KeyIndex<GroupsByKind, WhatsappOverall>> {
        let (shakti, wtm, public) = futures::try_join!(
            reader.read_where(WHATSAPP_COLLECTION, "form_type", GroupKind::Shakti.form_type()),
            reader.read_where(WHATSAPP_COLLECTION, "form_type", GroupKind::Wtm.form_type()),
            reader.read_where(WHATSAPP_COLLECTION, "form_type", GroupKind::Public.form_type()),
        )
        .context("Failed to read WhatsApp groups")?;

        let mut builder = IndexBuilder::<GroupsByKind>::new();
        let mut overall = WhatsappOverall::default();
        let mut assemblies = HashSet::new();
        for (kind, docs) in GroupKind::ALL.into_iter().zip([shakti, wtm, public]) {
            for doc in &docs {
                let record: WhatsappGroupRecord = doc.decode();
                overall.total_groups += 1;
                overall.total_members += record.group_members;
                if let Some(name) = record.assembly.as_deref().filter(|name| !name.is_empty()) {
                    assemblies.insert(name.to_string());
                }
                builder
                    .record(record.assembly.as_deref())
                    .tally_mut(kind)
                    .add(record.group_members);
            }
        }
        overall.total_assemblies = assemblies.len() as u64;
        Ok(builder.finish_with(overall))
    }

    fn report(
        &self,
        entry: Option<&GroupsByKind>,
        overall: &WhatsappOverall,
        info: MatchInfo,
    ) -> WhatsappMetrics {
        let by_type = entry.copied().unwrap_or_default();
        let combined = by_type.combined();
        WhatsappMetrics {
            groups_in_assembly: combined.groups,
            members_in_assembly: combined.members,
            by_type,
            overall: *overall,
            match_info: info,
        }
    }
}
