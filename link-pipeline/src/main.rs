use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use link_pipeline::{Pipeline, PipelineConfig, SourceScope};
use std::path::PathBuf;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "link-pipeline")]
#[command(about = "Ingest links, extract their content and summarize it")]
struct Cli {
    /// Directory holding the link lists and the artifacts/ tree
    #[arg(long, default_value = ".")]
    root: PathBuf,

    /// Log filter used when RUST_LOG is not set
    #[arg(long, default_value = "info")]
    log_level: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run ingestion, extraction and summarization once
    Run {
        #[arg(long, value_enum, default_value_t = ScopeArg::Both)]
        scope: ScopeArg,

        /// Items extracted or summarized at once
        #[arg(long, default_value_t = 1)]
        concurrency: usize,
    },

    /// List the links the next run would process
    Pending {
        #[arg(long, value_enum, default_value_t = ScopeArg::Both)]
        scope: ScopeArg,
    },

    /// Create the artifact directories and empty link lists
    Init,
}

#[derive(Clone, Copy, ValueEnum)]
enum ScopeArg {
    Manual,
    Monitoring,
    Both,
}

impl From<ScopeArg> for SourceScope {
    fn from(scope: ScopeArg) -> Self {
        match scope {
            ScopeArg::Manual => SourceScope::Manual,
            ScopeArg::Monitoring => SourceScope::Monitored,
            ScopeArg::Both => SourceScope::Both,
        }
    }
}

fn init_tracing(default_level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    let cli = Cli::parse();
    init_tracing(&cli.log_level);

    match cli.command {
        Commands::Init => {
            let pipeline = Pipeline::builder(PipelineConfig::new(&cli.root)).build()?;
            pipeline.init().context("failed to initialise pipeline root")?;
            info!("Initialised {}", cli.root.display());
        }
        Commands::Pending { scope } => {
            let config = PipelineConfig::new(&cli.root).with_scope(scope.into());
            let pipeline = Pipeline::builder(config).build()?;
            let items = pipeline.pending().await.context("link ingestion failed")?;
            println!("{}", serde_json::to_string_pretty(&items)?);
        }
        Commands::Run { scope, concurrency } => {
            let config = PipelineConfig::new(&cli.root)
                .with_scope(scope.into())
                .with_concurrency(concurrency);
            let pipeline = Pipeline::builder(config).build()?;

            let cancel = pipeline.cancellation_token();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    warn!("Interrupt received, finishing in-flight items");
                    cancel.cancel();
                }
            });

            let report = pipeline.run().await.map_err(|e| {
                error!("Pipeline run failed: {}", e);
                e
            })?;
            println!("{}", serde_json::to_string_pretty(&report)?);
        }
    }

    Ok(())
}
