// src/main.rs
use anyhow::{Context, Result};
use clap::Parser;
use log::info;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use assembly_metrics_lib::{
    db::{self, PgDocumentStore},
    AliasTable, CollectionReader, DetailFetcher, Engine, EngineConfig, MemoryStore,
};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// JSON dump of collections to read instead of PostgreSQL
    #[arg(long)]
    fixtures: Option<PathBuf>,

    /// Assembly names to resolve
    #[arg(required = true)]
    assemblies: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    env_logger::init_from_env(env_logger::Env::default().default_filter_or("info"));

    match dotenv::dotenv() {
        Ok(path) => info!("Loaded environment variables from {}", path.display()),
        Err(_) => info!("No .env file found, using environment variables from system"),
    }

    let args = Args::parse();
    let config = EngineConfig::from_env();
    let aliases = AliasTable::load(config.alias_table_path.as_deref())?;

    let (reader, details): (Arc<dyn CollectionReader>, Arc<dyn DetailFetcher>) =
        match &args.fixtures {
            Some(path) => {
                let store = Arc::new(MemoryStore::from_path(path)?);
                (store.clone() as Arc<dyn CollectionReader>, store as Arc<dyn DetailFetcher>)
            }
            None => {
                let pool = db::connect()
                    .await
                    .context("Failed to connect to database")?;
                let store = Arc::new(PgDocumentStore::new(pool));
                (store.clone() as Arc<dyn CollectionReader>, store as Arc<dyn DetailFetcher>)
            }
        };

    let engine = Engine::new(reader, details, aliases, &config);
    let start = Instant::now();
    for name in &args.assemblies {
        let report = engine.assembly_report(name).await;
        println!(
            "{}",
            serde_json::to_string_pretty(&report).context("Failed to serialize report")?
        );
    }
    info!(
        "Resolved {} assemblies in {:.2?}",
        args.assemblies.len(),
        start.elapsed()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn args_take_fixtures_and_names() {
        Args::command().debug_assert();

        let args = Args::try_parse_from(["assembly_metrics", "--fixtures", "dump.json", "Ara", "Gaya"])
            .unwrap();
        assert_eq!(args.fixtures, Some(PathBuf::from("dump.json")));
        assert_eq!(args.assemblies, vec!["Ara", "Gaya"]);
    }

    #[test]
    fn args_reject_missing_names_and_unknown_flags() {
        assert!(Args::try_parse_from(["assembly_metrics"]).is_err());
        assert!(Args::try_parse_from(["assembly_metrics", "--fixtures"]).is_err());
        assert!(Args::try_parse_from(["assembly_metrics", "--verbose", "Ara"]).is_err());
    }
}
