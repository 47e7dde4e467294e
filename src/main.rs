use clap::{Parser, Subcommand, ValueEnum};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

use novel_cache::types::info_key;
use novel_cache::{
    BlobStore, BlobValue, CacheClient, CacheError, ConfigError, KvTransport, NovelCache, Settings,
    Transport, TransportError, WriteOutcome,
};

const DEFAULT_CONFIG: &str = "novel-cache.toml";

#[derive(Error, Debug)]
pub enum AppError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("KV transport error: {0}")]
    Transport(#[from] TransportError),

    #[error("Cache error: {0}")]
    Cache(#[from] CacheError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Write of '{key}' was not stored: {outcome}")]
    Write { key: String, outcome: String },

    #[error("Could not delete '{0}'")]
    Delete(String),

    #[error("Could not invalidate the {0} cache")]
    Invalidate(&'static str),

    #[error("Either a value or --file must be given")]
    MissingValue,
}

/// Application cache that can be invalidated from the command line.
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum Target {
    /// The full novel catalog.
    Novels,
    /// Featured novel categories.
    Featured,
    /// Ranking lists and their legacy mirror.
    Rankings,
}

impl Target {
    fn name(self) -> &'static str {
        match self {
            Target::Novels => "novels",
            Target::Featured => "featured",
            Target::Rankings => "rankings",
        }
    }
}

#[derive(Parser)]
#[command(name = "novel-cache")]
#[command(about = "Inspect and manage the chunked novel cache")]
struct Cli {
    /// Configuration file (defaults to novel-cache.toml if present)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// KV store URL; overrides `[transport] url`
    #[arg(long, global = true, env = "NOVEL_CACHE_KV_URL")]
    kv_url: Option<String>,

    /// KV store bearer token; overrides `[transport] token`
    #[arg(long, global = true, env = "NOVEL_CACHE_KV_TOKEN", hide_env_values = true)]
    kv_token: Option<String>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, global = true, default_value = "warn")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the connectivity probe against the store
    Ping,

    /// Print a cached value, reassembling chunks
    Get {
        /// Logical key
        key: String,
    },

    /// Store a value, chunking it if needed
    Set {
        /// Logical key
        key: String,

        /// Value; parsed as JSON, stored as text otherwise
        #[arg(conflicts_with = "file")]
        value: Option<String>,

        /// Read the value from a file
        #[arg(short, long)]
        file: Option<PathBuf>,

        /// Store the value as text even if it parses as JSON
        #[arg(long)]
        text: bool,

        /// Seconds until expiry
        #[arg(long, default_value_t = 3600)]
        ttl: u64,
    },

    /// Delete a value and every chunk it owns
    Delete {
        /// Logical key
        key: String,
    },

    /// Print the chunk info record of a key
    Info {
        /// Logical key
        key: String,
    },

    /// Drop one of the application caches
    Invalidate {
        #[arg(value_enum)]
        target: Target,
    },
}

fn load_settings(cli: &Cli) -> Result<Settings, AppError> {
    let mut settings = match &cli.config {
        Some(path) => Settings::from_file(path)?,
        None if Path::new(DEFAULT_CONFIG).exists() => Settings::from_file(DEFAULT_CONFIG)?,
        None => Settings::default(),
    };
    if let Some(url) = &cli.kv_url {
        settings.transport.url = Some(url.clone());
    }
    if let Some(token) = &cli.kv_token {
        settings.transport.token = Some(token.clone());
    }
    Ok(settings)
}

fn init_logging(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<(), AppError> {
    let cli = Cli::parse();
    init_logging(&cli.log_level);

    let settings = load_settings(&cli)?;
    let transport = Transport::from_config(&settings.transport)?;
    if !transport.is_configured() {
        eprintln!("warning: no KV store configured (set [transport] url and token)");
    }
    let client = CacheClient::new(transport, settings.cache);

    match cli.command {
        Commands::Ping => {
            client.check_health().await?;
            println!("ok");
            Ok(())
        }
        Commands::Get { key } => {
            let blobs = BlobStore::new(client);
            match blobs.read_blob(&key).await? {
                Some(BlobValue::Json(value)) => {
                    println!("{}", serde_json::to_string_pretty(&value)?);
                }
                Some(BlobValue::Text(text)) => {
                    println!("{}", text);
                }
                None => {
                    eprintln!("Key '{}' not cached", key);
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Set {
            key,
            value,
            file,
            text,
            ttl,
        } => {
            let raw = match (value, file) {
                (Some(v), _) => v,
                (None, Some(f)) => std::fs::read_to_string(f)?,
                (None, None) => return Err(AppError::MissingValue),
            };
            let value = if text {
                BlobValue::Text(raw)
            } else {
                BlobValue::decode(raw)
            };

            let blobs = BlobStore::new(client);
            match blobs.set_blob(&key, &value, Duration::from_secs(ttl)).await {
                WriteOutcome::Stored => {
                    println!("Stored '{}'", key);
                    Ok(())
                }
                outcome => Err(AppError::Write {
                    key,
                    outcome: outcome.as_str().to_string(),
                }),
            }
        }
        Commands::Delete { key } => {
            let blobs = BlobStore::new(client);
            if !blobs.delete_blob(&key).await {
                return Err(AppError::Delete(key));
            }
            println!("Deleted '{}'", key);
            Ok(())
        }
        Commands::Info { key } => {
            client.check_health().await?;
            match client.transport().get(&info_key(&key)).await? {
                Some(raw) => {
                    let info: serde_json::Value = serde_json::from_str(&raw)?;
                    println!("{}", serde_json::to_string_pretty(&info)?);
                }
                None => {
                    eprintln!("Key '{}' has no info record (direct or absent)", key);
                    std::process::exit(1);
                }
            }
            Ok(())
        }
        Commands::Invalidate { target } => {
            let cache = NovelCache::new(client);
            let done = match target {
                Target::Novels => cache.invalidate_novel_cache().await,
                Target::Featured => cache.invalidate_featured_novels_cache().await,
                Target::Rankings => cache.invalidate_ranking_cache().await,
            };
            if !done {
                return Err(AppError::Invalidate(target.name()));
            }
            println!("Invalidated {} cache", target.name());
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_flag_overrides_config() -> anyhow::Result<()> {
        let cli = Cli::try_parse_from(["novel-cache", "--kv-token", "t0k", "ping"])?;
        let settings = load_settings(&cli)?;
        assert_eq!(settings.transport.token.as_deref(), Some("t0k"));
        Ok(())
    }

    #[test]
    fn set_requires_a_value_source() {
        let cli = Cli::try_parse_from(["novel-cache", "set", "k", "v", "--file", "x.json"]);
        assert!(cli.is_err());
    }
}
