//! Data selector compiler CLI.
//!
//! Usage:
//!   dataselector compile request.json [more.json ...] [--metadata metadata.yml]
//!   dataselector check-db

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use dataselector::metadata::CachedMetadataStore;
use dataselector::{
    Config, MetadataStore, MySqlMetadataStore, SelectorCompiler, SelectorRequest,
    StaticMetadataStore, db,
};

/// Command line arguments.
#[derive(Parser, Debug)]
#[command(author, version, about = "Compile data selector requests into SQL", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Compile selector requests (JSON files, `-` for stdin) and print the SQL.
    Compile {
        /// Request files.
        #[arg(required = true)]
        requests: Vec<PathBuf>,

        /// Static metadata file (YAML or JSON) instead of the MySQL store.
        #[arg(long)]
        metadata: Option<PathBuf>,

        /// Per-lookup metadata deadline in milliseconds (overrides METADATA_TIMEOUT_MS).
        #[arg(long)]
        timeout_ms: Option<u64>,
    },

    /// Check that the MySQL metadata store is reachable.
    CheckDb,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing();

    let cli = Cli::parse();
    let mut config = Config::from_env().context("failed to load configuration")?;

    match cli.command {
        Command::Compile {
            requests,
            metadata,
            timeout_ms,
        } => {
            if let Some(ms) = timeout_ms {
                config.metadata_timeout = Duration::from_millis(ms);
            }
            let store = build_store(&config, metadata.as_deref()).await?;
            let compiler = SelectorCompiler::new(store).with_timeout(config.metadata_timeout);

            for path in &requests {
                let json = read_request(path).await?;
                let request = SelectorRequest::from_json(&json)
                    .with_context(|| format!("failed to parse request {}", path.display()))?;
                let sql = compiler
                    .compile(&request)
                    .await
                    .with_context(|| format!("failed to compile request {}", path.display()))?;

                if sql.is_empty() {
                    info!(request = %path.display(), "nothing to query");
                } else {
                    println!("{sql};\n");
                }
            }
        }
        Command::CheckDb => {
            let pool = db::create_pool(&config).await?;
            if !db::check_health(&pool).await {
                bail!("metadata database is not healthy");
            }
            info!("metadata database is reachable");
        }
    }

    Ok(())
}

/// Metadata store for this run, wrapped in the cross-request cache when enabled.
async fn build_store(config: &Config, metadata: Option<&Path>) -> Result<Arc<dyn MetadataStore>> {
    match metadata {
        Some(path) => {
            let store = StaticMetadataStore::load(path)
                .await
                .with_context(|| format!("failed to load metadata from {}", path.display()))?;
            info!(path = %path.display(), "using static metadata");
            Ok(with_cache(store, config.metadata_cache_ttl))
        }
        None => {
            let pool = db::create_pool(config).await?;
            info!("using MySQL metadata store");
            Ok(with_cache(
                MySqlMetadataStore::new(pool),
                config.metadata_cache_ttl,
            ))
        }
    }
}

fn with_cache<S: MetadataStore + 'static>(store: S, ttl: Duration) -> Arc<dyn MetadataStore> {
    if ttl.is_zero() {
        Arc::new(store)
    } else {
        Arc::new(CachedMetadataStore::new(store, ttl))
    }
}

async fn read_request(path: &Path) -> Result<String> {
    if path == Path::new("-") {
        let mut json = String::new();
        tokio::io::stdin()
            .read_to_string(&mut json)
            .await
            .context("failed to read request from stdin")?;
        return Ok(json);
    }
    tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))
}

fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info,sqlx=warn"));

    // Logs go to stderr so stdout carries only SQL.
    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
