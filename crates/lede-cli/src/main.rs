use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::{DateTime, TimeDelta, Utc};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use lede_client::{JsonFileStore, ReqwestTransport};
use lede_core::cache::CACHE_KEY_PREFIX;
use lede_core::traits::KeyValueStore;
use lede_core::{
    Coordinator, DocumentId, FetchOutcome, LedeConfig, MemoryStore, ResultCache, StreamingFetcher,
};

#[derive(Parser)]
#[command(name = "lede", version, about = "Fetch the lead paragraph of encyclopedia articles")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the title and summary of one or more documents
    Summary {
        /// Document identifiers (e.g. "Alan_Turing") or article URLs
        #[arg(required = true)]
        targets: Vec<String>,

        /// Print one JSON object per line instead of plain text
        #[arg(long, default_value_t = false)]
        json: bool,

        /// Skip the cache file entirely
        #[arg(long, default_value_t = false)]
        no_cache: bool,

        /// Cache file location
        #[arg(long, env = "LEDE_CACHE_FILE", default_value = "lede-cache.json")]
        cache_file: PathBuf,
    },

    /// Inspect or clear the cache file
    Cache {
        #[command(subcommand)]
        action: CacheAction,

        /// Cache file location
        #[arg(long, env = "LEDE_CACHE_FILE", default_value = "lede-cache.json", global = true)]
        cache_file: PathBuf,
    },
}

#[derive(Subcommand)]
enum CacheAction {
    /// List cached documents with their age
    List,
    /// Delete the cache file
    Clear,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env if present
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("lede=info".parse()?))
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = LedeConfig::from_env().context("Invalid configuration")?;

    match cli.command {
        Commands::Summary {
            targets,
            json,
            no_cache,
            cache_file,
        } => {
            let transport = ReqwestTransport::new().context("Failed to create HTTP client")?;
            let fetcher = StreamingFetcher::new(transport, config.fetcher.clone());

            let failed = if no_cache {
                let cache = ResultCache::new(MemoryStore::new(), config.cache_ttl);
                cmd_summary(Coordinator::new(fetcher, cache), &targets, json).await?
            } else {
                let cache = ResultCache::new(JsonFileStore::new(cache_file), config.cache_ttl);
                cmd_summary(Coordinator::new(fetcher, cache), &targets, json).await?
            };

            if failed > 0 {
                anyhow::bail!("{failed} of {} documents could not be summarized", targets.len());
            }
        }
        Commands::Cache { action, cache_file } => {
            let store = JsonFileStore::new(cache_file);
            match action {
                CacheAction::List => cmd_cache_list(&store, &config).await?,
                CacheAction::Clear => {
                    let removed = store
                        .clear()
                        .await
                        .map_err(|e| anyhow::anyhow!(e))?;
                    println!("Removed {removed} cached entries from {}", store.path().display());
                }
            }
        }
    }

    Ok(())
}

/// Accept either a bare identifier or an article URL.
fn parse_target(target: &str) -> Result<DocumentId> {
    let id = if target.starts_with("http://") || target.starts_with("https://") {
        DocumentId::from_article_url(target)
    } else {
        DocumentId::new(target)
    };
    id.with_context(|| format!("'{target}' is not a usable document"))
}

/// Resolve every target concurrently and print results in argument order.
/// Returns the number of targets that produced no summary.
async fn cmd_summary<S: KeyValueStore>(
    coordinator: Coordinator<ReqwestTransport, S>,
    targets: &[String],
    json: bool,
) -> Result<usize> {
    let coordinator = &coordinator;
    let lookups = targets.iter().map(|target| {
        async move {
            let id = parse_target(target)?;
            let outcome = coordinator.resolve(&id).await;
            Ok::<_, anyhow::Error>((id, outcome))
        }
    });
    let results = futures::future::join_all(lookups).await;

    let mut failed = 0;
    for (target, result) in targets.iter().zip(results) {
        match result {
            Ok((id, outcome)) => {
                if !outcome.is_success() {
                    failed += 1;
                }
                print_outcome(&id, &outcome, json)?;
            }
            Err(e) => {
                failed += 1;
                tracing::error!(%target, "{e:#}");
            }
        }
    }

    Ok(failed)
}

fn print_outcome(id: &DocumentId, outcome: &FetchOutcome, json: bool) -> Result<()> {
    match (outcome, json) {
        (FetchOutcome::Success(result), true) => {
            let line = serde_json::json!({
                "ok": true,
                "id": id,
                "title": result.title,
                "summary": result.summary,
            });
            println!("{}", serde_json::to_string(&line)?);
        }
        (FetchOutcome::Failure(reason), true) => {
            let line = serde_json::json!({
                "ok": false,
                "id": id,
                "title": id.readable_title(),
                "summary": null,
                "reason": reason.to_string(),
            });
            println!("{}", serde_json::to_string(&line)?);
        }
        (FetchOutcome::Success(result), false) => {
            println!("{}\n{}\n", result.title, result.summary);
        }
        (FetchOutcome::Failure(reason), false) => {
            tracing::warn!(%id, %reason, "No summary for {}", id.readable_title());
        }
    }
    Ok(())
}

async fn cmd_cache_list(store: &JsonFileStore, config: &LedeConfig) -> Result<()> {
    let entries = store.entries().await.map_err(|e| anyhow::anyhow!(e))?;
    let ttl = TimeDelta::from_std(config.cache_ttl).unwrap_or(TimeDelta::MAX);
    let now = Utc::now();

    let cached: Vec<_> = entries
        .iter()
        .filter_map(|(key, value)| Some((key.strip_prefix(CACHE_KEY_PREFIX)?, value)))
        .collect();

    if cached.is_empty() {
        println!("No cached summaries in {}", store.path().display());
        return Ok(());
    }

    println!("Cached summaries in {}:\n", store.path().display());

    for (id, value) in &cached {
        let title = value["data"]["title"].as_str().unwrap_or("?");
        let fetched_at = value["ts"].as_i64().and_then(DateTime::from_timestamp_millis);

        match fetched_at {
            Some(fetched_at) => {
                let age = now - fetched_at;
                let status = if age >= ttl { "stale" } else { "fresh" };
                println!(
                    "  [{status}] {id} ({title}) fetched {} ({} min ago)",
                    fetched_at.format("%Y-%m-%d %H:%M:%S UTC"),
                    age.num_minutes(),
                );
            }
            None => println!("  [invalid] {id}"),
        }
    }

    println!("\nTotal: {} entries", cached.len());

    Ok(())
}
