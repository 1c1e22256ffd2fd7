// src/sources.rs

use anyhow::{Context, Result};
use async_trait::async_trait;
use log::{debug, info};
use serde_json::Value;
use std::collections::HashMap;
use std::future::Future;
use std::path::Path;
use std::time::Duration;

use crate::error::SourceError;
use crate::models::Document;

/// Read-only access to named document collections.
#[async_trait]
pub trait CollectionReader: Send + Sync {
    /// Every document of `collection`. An unknown collection is empty, not an error.
    async fn read_all(&self, collection: &str) -> Result<Vec<Document>>;

    /// Documents of `collection` whose top-level `field` equals `equals`.
    async fn read_where(&self, collection: &str, field: &str, equals: &str)
    -> Result<Vec<Document>>;
}

/// Meeting families served by the hierarchical detail fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DetailKind {
    AcNukkad,
    SlpNukkad,
}

impl DetailKind {
    pub fn collection(&self) -> &'static str {
        match self {
            DetailKind::AcNukkad => "nukkad-ac",
            DetailKind::SlpNukkad => "nukkad-slp",
        }
    }
}

/// Scope of a detail fetch. Only assembly-level scopes are queried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Assembly,
}

impl Level {
    /// Document field holding the scope name at this level.
    pub fn field(&self) -> &'static str {
        match self {
            Level::Assembly => "assembly",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct DetailFilter {
    pub level: Level,
    /// Exact spellings to match; the fetch does no fuzzy matching of its own.
    pub assemblies: Vec<String>,
    pub vertical: Option<String>,
}

/// Hierarchical record fetch; the length of the returned list is the metric.
#[async_trait]
pub trait DetailFetcher: Send + Sync {
    async fn fetch_detailed(&self, kind: DetailKind, filter: &DetailFilter) -> Result<Vec<Document>>;
}

/// Runs a collaborator future under an I/O timeout.
pub async fn bounded<T, F>(timeout: Duration, what: &str, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match tokio::time::timeout(timeout, fut).await {
        Ok(result) => result,
        Err(_) => Err(SourceError::Timeout {
            what: what.to_string(),
            secs: timeout.as_secs(),
        }
        .into()),
    }
}

fn field_str<'a>(data: &'a Value, field: &str) -> Option<&'a str> {
    data.get(field).and_then(Value::as_str)
}

/// In-process document store, loadable from a JSON dump of the form
/// `{ "collection": [ { "id": "...", ...fields } ] }`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    collections: HashMap<String, Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, collection: &str, document: Document) {
        self.collections
            .entry(collection.to_string())
            .or_default()
            .push(document);
    }

    /// Adds raw payloads, numbering ids `<collection>-<n>` in insertion order.
    pub fn with_collection(mut self, collection: &str, payloads: Vec<Value>) -> Self {
        for payload in payloads {
            let n = self.collections.get(collection).map_or(0, Vec::len);
            self.insert(collection, Document::new(format!("{}-{}", collection, n), payload));
        }
        self
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        let root: Value = serde_json::from_str(json).context("Fixture is not valid JSON")?;
        let Value::Object(map) = root else {
            return Err(SourceError::Fixture("top level must be an object".to_string()).into());
        };

        let mut store = Self::new();
        for (collection, docs) in map {
            let Value::Array(items) = docs else {
                return Err(SourceError::Fixture(format!(
                    "collection '{}' must be an array",
                    collection
                ))
                .into());
            };
            for (n, mut item) in items.into_iter().enumerate() {
                let id = item
                    .as_object_mut()
                    .and_then(|obj| obj.remove("id"))
                    .and_then(|v| v.as_str().map(str::to_string))
                    .unwrap_or_else(|| format!("{}-{}", collection, n));
                store.insert(&collection, Document::new(id, item));
            }
        }
        Ok(store)
    }

    pub fn from_path(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read fixture {}", path.display()))?;
        let store = Self::from_json_str(&json)
            .with_context(|| format!("Failed to load fixture {}", path.display()))?;
        info!(
            "Loaded {} collections from fixture {}",
            store.collections.len(),
            path.display()
        );
        Ok(store)
    }

    fn documents(&self, collection: &str) -> &[Document] {
        self.collections
            .get(collection)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[async_trait]
impl CollectionReader for MemoryStore {
    async fn read_all(&self, collection: &str) -> Result<Vec<Document>> {
        let docs = self.documents(collection).to_vec();
        debug!("MemoryStore: {} documents in {}", docs.len(), collection);
        Ok(docs)
    }

    async fn read_where(
        &self,
        collection: &str,
        field: &str,
        equals: &str,
    ) -> Result<Vec<Document>> {
        Ok(self
            .documents(collection)
            .iter()
            .filter(|doc| field_str(&doc.data, field) == Some(equals))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl DetailFetcher for MemoryStore {
    async fn fetch_detailed(&self, kind: DetailKind, filter: &DetailFilter) -> Result<Vec<Document>> {
        let scope_field = filter.level.field();
        Ok(self
            .documents(kind.collection())
            .iter()
            .filter(|doc| {
                field_str(&doc.data, scope_field)
                    .is_some_and(|name| filter.assemblies.iter().any(|a| a == name))
            })
            .filter(|doc| match &filter.vertical {
                Some(vertical) => field_str(&doc.data, "vertical") == Some(vertical.as_str()),
                None => true,
            })
            .cloned()
            .collect())
    }
}
