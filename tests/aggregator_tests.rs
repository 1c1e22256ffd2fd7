// tests/aggregator_tests.rs

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use futures::future::join_all;
use serde_json::json;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use assembly_metrics_lib::aggregators::{
    Aggregator, Complaints, Dataset, IndexBuilder, KeyIndex, SlpTraining,
};
use assembly_metrics_lib::{
    AliasTable, CollectionReader, Document, MatchConfidence, MatchInfo, MemoryStore, SourceError,
};

const SCENARIO_COLLECTION: &str = "scenario";
const TIMEOUT: Duration = Duration::from_secs(5);

// Sums the numeric field `x` per assembly
struct SummedX;

#[derive(Debug, PartialEq)]
struct SummedMetrics {
    x: u64,
    info: MatchInfo,
}

#[async_trait]
impl Dataset for SummedX {
    type Entry = u64;
    type Summary = ();
    type Metrics = SummedMetrics;

    fn name(&self) -> &'static str {
        SCENARIO_COLLECTION
    }

    async fn build(&self, reader: &dyn CollectionReader) -> Result<KeyIndex<u64>> {
        let mut builder = IndexBuilder::<u64>::new();
        for doc in reader.read_all(SCENARIO_COLLECTION).await? {
            let name = doc.data.get("assembly").and_then(|v| v.as_str());
            let x = doc.data.get("x").and_then(|v| v.as_u64()).unwrap_or(0);
            *builder.record(name) += x;
        }
        Ok(builder.finish())
    }

    fn report(&self, entry: Option<&u64>, _summary: &(), info: MatchInfo) -> SummedMetrics {
        SummedMetrics {
            x: entry.copied().unwrap_or(0),
            info,
        }
    }
}

// Test double around an in-memory store: counts reads, can fail or stall them
struct MockReader {
    store: MemoryStore,
    reads: AtomicUsize,
    failures_left: AtomicUsize,
    delay: Duration,
}

impl MockReader {
    fn new(store: MemoryStore) -> Self {
        Self {
            store,
            reads: AtomicUsize::new(0),
            failures_left: AtomicUsize::new(0),
            delay: Duration::ZERO,
        }
    }

    fn failing_first(self, failures: usize) -> Self {
        self.failures_left.store(failures, Ordering::SeqCst);
        self
    }

    fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    fn reads(&self) -> usize {
        self.reads.load(Ordering::SeqCst)
    }

    async fn before_read(&self) -> Result<()> {
        self.reads.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        let failed = self
            .failures_left
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if failed {
            return Err(SourceError::Unavailable {
                what: "mock".to_string(),
                reason: "connection refused".to_string(),
            }
            .into());
        }
        Ok(())
    }
}

#[async_trait]
impl CollectionReader for MockReader {
    async fn read_all(&self, collection: &str) -> Result<Vec<Document>> {
        self.before_read().await?;
        self.store.read_all(collection).await
    }

    async fn read_where(
        &self,
        collection: &str,
        field: &str,
        equals: &str,
    ) -> Result<Vec<Document>> {
        self.before_read().await?;
        self.store.read_where(collection, field, equals).await
    }
}

fn scenario_store() -> MemoryStore {
    MemoryStore::new().with_collection(
        SCENARIO_COLLECTION,
        vec![
            json!({"assembly": "Danapur", "x": 1}),
            json!({"assembly": "danapur ", "x": 1}),
            json!({"assembly": "Bikram", "x": 1}),
        ],
    )
}

fn summed(reader: Arc<dyn CollectionReader>) -> Aggregator<SummedX> {
    Aggregator::new(SummedX, reader, Arc::new(AliasTable::empty()), TIMEOUT)
}

#[tokio::test]
async fn test_exact_typo_and_unrelated_queries() -> Result<()> {
    let aggregator = summed(Arc::new(scenario_store()));

    let exact = aggregator.metrics_for_assembly("Danapur").await?;
    assert_eq!(exact.x, 2);
    assert_eq!(exact.info.confidence, MatchConfidence::High);
    assert_eq!(exact.info.matched_key.as_deref(), Some("Danapur"));
    assert_eq!(exact.info.score, 1.0);

    let typo = aggregator.metrics_for_assembly("Dinapur").await?;
    assert!(typo.info.confidence.is_match(), "{:?}", typo.info);
    assert_eq!(typo.info.matched_key.as_deref(), Some("Danapur"));
    assert_eq!(typo.x, 2);

    let unrelated = aggregator.metrics_for_assembly("Gaya").await?;
    assert_eq!(unrelated.info.confidence, MatchConfidence::Unmatched);
    assert_eq!(unrelated.info.matched_key, None);
    assert_eq!(unrelated.x, 0);
    assert!(unrelated.info.score >= 0.0);

    assert_eq!(aggregator.key_count(), Some(2));
    Ok(())
}

#[tokio::test]
async fn test_concurrent_first_queries_share_one_build() -> Result<()> {
    let reader = Arc::new(MockReader::new(scenario_store()).with_delay(Duration::from_millis(50)));
    let aggregator = Arc::new(summed(reader.clone()));
    assert!(!aggregator.is_loaded());

    let queries = (0..8).map(|i| {
        let aggregator = aggregator.clone();
        async move {
            let name = if i % 2 == 0 { "Danapur" } else { "Bikram" };
            aggregator.metrics_for_assembly(name).await
        }
    });
    for result in join_all(queries).await {
        result?;
    }

    assert_eq!(reader.reads(), 1);
    assert!(aggregator.is_loaded());

    aggregator.metrics_for_assembly("Gaya").await?;
    assert_eq!(reader.reads(), 1);
    Ok(())
}

#[tokio::test]
async fn test_failed_build_is_retried() -> Result<()> {
    let reader = Arc::new(MockReader::new(scenario_store()).failing_first(1));
    let aggregator = summed(reader.clone());

    let err = aggregator
        .metrics_for_assembly("Danapur")
        .await
        .expect_err("first build should fail");
    assert!(err
        .chain()
        .any(|cause| cause.downcast_ref::<SourceError>().is_some()));
    assert!(!aggregator.is_loaded());
    assert_eq!(aggregator.key_count(), None);

    let metrics = aggregator.metrics_for_assembly("Danapur").await?;
    assert_eq!(metrics.x, 2);
    assert_eq!(reader.reads(), 2);
    assert!(aggregator.is_loaded());
    Ok(())
}

#[tokio::test]
async fn test_slow_source_times_out() -> Result<()> {
    let reader = Arc::new(MockReader::new(scenario_store()).with_delay(Duration::from_secs(5)));
    let aggregator = Aggregator::new(
        SummedX,
        reader,
        Arc::new(AliasTable::empty()),
        Duration::from_millis(20),
    );

    let err = aggregator
        .metrics_for_assembly("Danapur")
        .await
        .expect_err("build should time out");
    let timed_out = err.chain().any(|cause| {
        matches!(
            cause.downcast_ref::<SourceError>(),
            Some(SourceError::Timeout { .. })
        )
    });
    assert!(timed_out, "{:#}", err);
    assert!(!aggregator.is_loaded());
    Ok(())
}

#[tokio::test]
async fn test_empty_collection_is_unmatched() -> Result<()> {
    let aggregator = Aggregator::new(
        SlpTraining,
        Arc::new(MemoryStore::new()),
        Arc::new(AliasTable::empty()),
        TIMEOUT,
    );
    let metrics = aggregator.metrics_for_assembly("Ara").await?;
    assert_eq!(metrics.total_slps, 0);
    assert_eq!(metrics.match_info.confidence, MatchConfidence::Unmatched);
    assert_eq!(metrics.match_info.score, 0.0);
    assert_eq!(aggregator.key_count(), Some(0));
    Ok(())
}

#[tokio::test]
async fn test_alias_table_bridges_spellings() -> Result<()> {
    let store = MemoryStore::new().with_collection(
        SCENARIO_COLLECTION,
        vec![json!({"assembly": "Arrah", "x": 4}), json!({"assembly": "Gaya", "x": 1})],
    );
    let aliases = AliasTable::from_pairs(vec![("Ara", vec!["Arrah"])]);
    let aggregator = Aggregator::new(SummedX, Arc::new(store), Arc::new(aliases), TIMEOUT);

    let metrics = aggregator.metrics_for_assembly("Ara (SC)").await?;
    assert_eq!(metrics.x, 4);
    assert_eq!(metrics.info.score, 1.0);
    assert_eq!(metrics.info.matched_key.as_deref(), Some("Arrah"));
    Ok(())
}

#[tokio::test]
async fn test_complaints_survive_partial_query_failure() -> Result<()> {
    let store = MemoryStore::new().with_collection(
        "manifesto-complaints",
        vec![
            json!({"form_type": "ac-manifesto", "ac_name": "Bikram"}),
            json!({"formType": "ac-manifesto", "ac_name": "Bikram"}),
        ],
    );
    // one of the three discriminator queries fails
    let reader = Arc::new(MockReader::new(store).failing_first(1));
    let aggregator = Aggregator::new(
        Complaints,
        reader.clone(),
        Arc::new(AliasTable::empty()),
        TIMEOUT,
    );

    let metrics = aggregator.metrics_for_assembly("Bikram").await?;
    assert_eq!(reader.reads(), 3);
    assert!(metrics.total_complaints >= 1);
    assert!(aggregator.is_loaded());
    Ok(())
}

#[tokio::test]
async fn test_complaints_fail_when_every_query_fails() {
    let reader = Arc::new(MockReader::new(MemoryStore::new()).failing_first(3));
    let aggregator = Aggregator::new(
        Complaints,
        reader,
        Arc::new(AliasTable::empty()),
        TIMEOUT,
    );
    let result = aggregator.metrics_for_assembly("Bikram").await;
    assert!(result.is_err());
    assert!(!aggregator.is_loaded());
}

#[tokio::test]
async fn test_dataset_errors_propagate_from_build() {
    struct Broken;

    #[async_trait]
    impl Dataset for Broken {
        type Entry = u64;
        type Summary = ();
        type Metrics = u64;

        fn name(&self) -> &'static str {
            "broken"
        }

        async fn build(&self, _reader: &dyn CollectionReader) -> Result<KeyIndex<u64>> {
            Err(anyhow!("schema mismatch"))
        }

        fn report(&self, entry: Option<&u64>, _summary: &(), _info: MatchInfo) -> u64 {
            entry.copied().unwrap_or(0)
        }
    }

    let aggregator = Aggregator::new(
        Broken,
        Arc::new(MemoryStore::new()),
        Arc::new(AliasTable::empty()),
        TIMEOUT,
    );
    let err = aggregator.metrics_for_assembly("Ara").await.unwrap_err();
    assert!(format!("{:#}", err).contains("schema mismatch"));
}
