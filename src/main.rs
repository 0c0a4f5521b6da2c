use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use solrdoc::http::{router, AppState};
use solrdoc_admin::{MemoryRecordSource, MemoryRecordStore};
use solrdoc_core::config::Config;
use solrdoc_core::{MemoryBackend, Schema, SearchBackend};

#[derive(Parser)]
#[command(name = "solrdoc", about = "Solr document projection and index bookkeeping")]
struct Cli {
    /// Write debug logs to /tmp/solrdoc-debug.log (tail -f to inspect).
    #[arg(long, global = true)]
    debug: bool,

    /// Config file to use instead of ~/.config/solrdoc/config.toml.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Project raw engine hits (a JSON array) into API dictionaries.
    Project {
        #[arg(long)]
        schema: PathBuf,
        #[arg(long)]
        rows: PathBuf,
        /// Comma separated field allowlist.
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,
        /// Apply the allowlist to nested children too.
        #[arg(long)]
        inherit: bool,
    },
    /// Print the parent/nested-child filter for a dotted path.
    Nested {
        path: String,
        /// Values to match; none gives the existence form.
        values: Vec<String>,
    },
    /// Serve the fetch endpoint and admin actions over an in-memory engine.
    Serve {
        #[arg(long)]
        schema: PathBuf,
        /// JSON records to index, keyed by model label.
        #[arg(long)]
        records: Option<PathBuf>,
        #[arg(long)]
        bind: Option<String>,
    },
}

fn init_logging(debug: bool) -> anyhow::Result<()> {
    if debug {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open("/tmp/solrdoc-debug.log")?;
        tracing_subscriber::fmt()
            .with_writer(std::sync::Mutex::new(file))
            .with_ansi(false)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("debug")),
            )
            .init();
        tracing::info!("solrdoc debug log started, tail -f /tmp/solrdoc-debug.log");
    } else {
        tracing_subscriber::fmt()
            .with_writer(std::io::stderr)
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_env("RUST_LOG")
                    .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("warn")),
            )
            .init();
    }
    Ok(())
}

fn load_config(path: Option<&Path>) -> Config {
    let loaded = match path {
        Some(path) => Config::load_from(path),
        None => Config::load(),
    };
    loaded.unwrap_or_else(|err| {
        tracing::warn!(%err, "falling back to default config");
        Config::defaults()
    })
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_logging(cli.debug)?;
    let config = load_config(cli.config.as_deref());

    match cli.command {
        Command::Project {
            schema,
            rows,
            fields,
            inherit,
        } => {
            let registry = Schema::load(&schema)?.into_registry()?;
            let file = std::fs::File::open(&rows).with_context(|| format!("opening {}", rows.display()))?;
            let hits = serde_json::from_reader(std::io::BufReader::new(file))?;
            let inherit = inherit || config.projection.fields_inheritance;
            let projected = solrdoc::project_hits(&registry, hits, &fields, inherit)?;
            println!("{}", serde_json::to_string_pretty(&projected)?);
        }
        Command::Nested { path, values } => {
            println!("{}", solrdoc::nested_fragment(&path, values)?);
        }
        Command::Serve {
            schema,
            records,
            bind,
        } => {
            let registry = Schema::load(&schema)?.into_registry()?;
            let source = match records {
                Some(path) => MemoryRecordSource::from_json_file(&path)?,
                None => MemoryRecordSource::new(),
            };
            let backend: Arc<dyn SearchBackend> =
                Arc::new(MemoryBackend::new(&config.engine.alias, config.engine.batch_size));
            let state = Arc::new(AppState {
                registry,
                backends: vec![backend],
                source: Arc::new(source),
                store: Arc::new(MemoryRecordStore::new()),
                redirect_to: config.server.redirect_to.clone(),
            });
            let bind = bind.unwrap_or_else(|| config.server.bind.clone());

            tokio::runtime::Runtime::new()?.block_on(async move {
                let listener = tokio::net::TcpListener::bind(&bind).await?;
                tracing::info!(%bind, "serving");
                axum::serve(listener, router(state)).await?;
                Ok::<_, anyhow::Error>(())
            })?;
        }
    }
    Ok(())
}
