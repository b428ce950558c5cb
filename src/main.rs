use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use asset_lister::app::ports::SystemClock;
use asset_lister::config::Config;
use asset_lister::infra::{credentials, OpenSeaMarketplace, Wallet, WebDriverClient};
use asset_lister::logging;
use asset_lister::observability::metrics;
use asset_lister::pipeline::checkpoint::CheckpointStore;
use asset_lister::pipeline::engine::dry_run;
use asset_lister::pipeline::ingestion::SourceFile;
use asset_lister::pipeline::processing::normalize::Normalizer;
use asset_lister::pipeline::retry::RetryPolicy;
use asset_lister::pipeline::{ActionSet, RunReport, Stage, StagePlan, WorkflowEngine};

#[derive(Parser)]
#[command(name = "asset_lister")]
#[command(about = "Upload, verify, sell and remove NFT listings in resumable batches")]
#[command(version = "0.1.0")]
struct Cli {
    /// Configuration file (defaults to lister.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the requested stages against the marketplace
    Run {
        /// Source file (.json, .csv or .xlsx)
        #[arg(long)]
        file: PathBuf,
        /// Stages to run (comma-separated): upload, verify-upload, sell, verify-sale, remove
        #[arg(long, value_enum, value_delimiter = ',', required = true)]
        actions: Vec<Stage>,
        #[arg(long, value_enum)]
        wallet: Wallet,
    },
    /// Check the file and every record without opening a browser
    Validate {
        #[arg(long)]
        file: PathBuf,
        #[arg(long, value_enum, value_delimiter = ',', required = true)]
        actions: Vec<Stage>,
    },
    /// Show how far each stage has progressed for a source file
    Status {
        #[arg(long)]
        file: PathBuf,
    },
}

async fn run(
    config: &Config,
    file: PathBuf,
    actions: Vec<Stage>,
    wallet: Wallet,
) -> anyhow::Result<RunReport> {
    // Configuration problems surface before any browser starts
    let plan = StagePlan::resolve(ActionSet::new(actions)?, &file)?;
    let source = SourceFile::open(&plan.source)?;
    let credentials = credentials::resolve(wallet, &config.driver.assets_dir)?;

    let extension = wallet.extension_path(&config.driver.assets_dir);
    let driver = WebDriverClient::connect(&config.driver, Some(&extension))
        .await
        .context("could not start the browser session")?;
    let marketplace = OpenSeaMarketplace::new(driver, wallet, &config.marketplace, &config.driver);

    let mut engine = WorkflowEngine::new(plan, Box::new(marketplace), config.workflow.clone())?;
    println!("🔐 Logging in with {}...", wallet.display_name());
    engine
        .login(&credentials, &RetryPolicy::from_config(&config.login))
        .await?;

    let report = engine.run_source(&source).await;
    if let Err(e) = engine.shutdown().await {
        warn!(error = %e, "Browser session did not close cleanly");
    }
    Ok(report?)
}

fn validate(config: &Config, file: PathBuf, actions: Vec<Stage>) -> anyhow::Result<RunReport> {
    let plan = StagePlan::resolve(ActionSet::new(actions)?, &file)?;
    let source = SourceFile::open(&plan.source)?;
    Ok(dry_run(
        &plan,
        &source,
        &config.workflow,
        &SystemClock,
        &Normalizer::new(),
    )?)
}

fn status(file: PathBuf) -> anyhow::Result<()> {
    let plan = StagePlan::inspect(&file)?;
    let total = SourceFile::open(&file).map(|s| s.len()).ok();
    println!("\n📊 Checkpoint status for {}", file.display());
    if let Some(total) = total {
        println!("   Records in source: {}", total);
    }
    for entry in CheckpointStore::status(&plan)? {
        if entry.exists {
            println!(
                "   {}: {} done ({})",
                entry.stage,
                entry.completed,
                entry.path.display()
            );
        } else {
            println!("   {}: not started", entry.stage);
        }
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv::dotenv().ok();
    logging::init_logging();

    let cli = Cli::parse();
    let config = Config::load(cli.config.as_deref())?;

    if let Err(e) = metrics::init(config.metrics.listen_addr.as_deref()) {
        warn!("Metrics disabled: {}", e);
    }

    let run_id = Uuid::new_v4();
    let span = info_span!("run", run_id = %run_id);

    match cli.command {
        Commands::Run {
            file,
            actions,
            wallet,
        } => {
            println!("🚀 Starting run {} on {}", run_id, file.display());
            match run(&config, file, actions, wallet).instrument(span).await {
                Ok(report) => {
                    report.print_summary();
                    info!(failures = report.failures.len(), "Run completed");
                    if let Some(snapshot) = metrics::render() {
                        debug!(%snapshot, "Final metrics");
                    }
                    println!("\n✅ All done! Your NFTs have been taken care of.");
                }
                Err(e) => {
                    error!("Run failed: {:#}", e);
                    println!("❌ Run failed: {:#}", e);
                    return Err(e);
                }
            }
        }
        Commands::Validate { file, actions } => {
            let _entered = span.enter();
            println!("🔎 Validating {}", file.display());
            let report = validate(&config, file, actions)?;
            report.print_summary();
            if report.has_failures() {
                anyhow::bail!("{} record(s) would fail", report.failures.len());
            }
            println!("\n✅ Every record passed validation");
        }
        Commands::Status { file } => {
            let _entered = span.enter();
            status(file)?;
        }
    }
    Ok(())
}
