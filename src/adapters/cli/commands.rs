//! CLI command definitions and handlers

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing_subscriber::{fmt, EnvFilter};

use crate::adapters::execution::PaperExecutor;
use crate::adapters::market_data::JupiterPriceSource;
use crate::adapters::solana::RpcTransactionSource;
use crate::application::Orchestrator;
use crate::config::{load_config, Config};
use crate::domain::{EventTopic, PipelineEvent};
use crate::ports::{ExecutionPort, MarketDataPort, TransactionSource};

/// Copy-trading monitor for tracked Solana wallets
#[derive(Debug, Parser)]
#[command(name = "mirrorbot", version, about)]
pub struct CliApp {
    /// Log at info level
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Log at debug level
    #[arg(short, long, global = true)]
    pub debug: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start the monitoring and decision pipeline
    Run(RunCmd),
    /// Load and validate a config file, then print a summary
    Validate(ValidateCmd),
}

#[derive(Debug, Args)]
pub struct RunCmd {
    /// Path to config.toml
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Force paper fills regardless of the config setting
    #[arg(long)]
    pub paper: bool,
}

#[derive(Debug, Args)]
pub struct ValidateCmd {
    /// Path to config.toml
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Emit the summary as JSON
    #[arg(long)]
    pub json: bool,
}

/// Machine-readable output of `validate --json`
#[derive(Debug, serde::Serialize)]
struct ValidationSummary {
    wallets: Vec<String>,
    poll_interval_ms: u64,
    signature_limit: usize,
    dedup_capacity: usize,
    copy_trade_pct: f64,
    min_mirror_lamports: u64,
    max_mirror_lamports: u64,
    rules: Vec<String>,
}

/// Execute the parsed CLI command
pub async fn execute(app: CliApp) -> Result<()> {
    match app.command {
        Command::Run(cmd) => run_command(cmd, app.verbose, app.debug).await,
        Command::Validate(cmd) => validate_command(cmd),
    }
}

/// Flag precedence: --debug, --verbose, then RUST_LOG, then the config level
fn init_logging(config: &Config, verbose: bool, debug: bool) {
    let filter = if debug {
        EnvFilter::new("debug")
    } else if verbose {
        EnvFilter::new("info")
    } else {
        EnvFilter::try_from_default_env()
            .unwrap_or_else(|_| EnvFilter::new(config.logging.level.clone()))
    };
    fmt().with_env_filter(filter).init();
}

async fn run_command(cmd: RunCmd, verbose: bool, debug: bool) -> Result<()> {
    let config = load_config(&cmd.config).context("Failed to load configuration")?;
    init_logging(&config, verbose, debug);

    let paper = cmd.paper || config.trading.paper;
    if !paper {
        tracing::warn!("live execution is not wired up; falling back to paper fills");
    }
    tracing::warn!("PAPER MODE - simulated fills only");

    let source: Arc<dyn TransactionSource> = Arc::new(RpcTransactionSource::new(
        config.solana.get_rpc_url(),
        &config.solana.commitment,
    ));
    let market_data: Arc<dyn MarketDataPort> = Arc::new(
        JupiterPriceSource::new(config.market.api_url.clone())
            .context("Failed to build market data client")?,
    );
    let paper_executor = Arc::new(PaperExecutor::new());
    let executor: Arc<dyn ExecutionPort> = Arc::clone(&paper_executor) as Arc<dyn ExecutionPort>;

    let orchestrator = Orchestrator::build(&config, source, market_data, executor)
        .await
        .context("Failed to build pipeline")?;

    // Simulated fills track the live quote stream
    let price_feed = Arc::clone(&paper_executor);
    orchestrator
        .dispatcher()
        .subscribe_fn(EventTopic::PriceUpdate, "paper-price-feed", move |event| {
            if let PipelineEvent::PriceUpdate {
                token_address,
                price,
                ..
            } = event
            {
                price_feed.update_price(token_address, *price);
            }
            Ok(())
        })
        .await;

    tracing::info!(
        wallets = config.tracking.wallets.len(),
        rules = config.rules.len(),
        rpc = %config.solana.get_rpc_url(),
        "starting mirrorbot"
    );
    orchestrator.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("shutdown signal received");
    orchestrator.stop().await;

    Ok(())
}

fn validate_command(cmd: ValidateCmd) -> Result<()> {
    let config = load_config(&cmd.config).context("Config validation failed")?;
    let rules = config.compiled_rules()?;

    if cmd.json {
        let summary = ValidationSummary {
            wallets: config.tracking.wallets.clone(),
            poll_interval_ms: config.monitor.poll_interval_ms,
            signature_limit: config.monitor.signature_limit,
            dedup_capacity: config.monitor.dedup_capacity,
            copy_trade_pct: config.trading.copy_trade_pct,
            min_mirror_lamports: config.trading.min_mirror_lamports,
            max_mirror_lamports: config.trading.max_mirror_lamports,
            rules: rules.iter().map(|r| r.name.clone()).collect(),
        };
        println!("{}", serde_json::to_string_pretty(&summary)?);
        return Ok(());
    }

    println!("Config OK: {}", cmd.config.display());
    println!("  tracked wallets : {}", config.tracking.wallets.len());
    for wallet in &config.tracking.wallets {
        println!("    {wallet}");
    }
    println!("  poll interval   : {}ms", config.monitor.poll_interval_ms);
    println!("  signature limit : {}", config.monitor.signature_limit);
    println!("  dedup capacity  : {}", config.monitor.dedup_capacity);
    println!(
        "  mirror sizing   : {:.0}% of observed, {}-{} lamports",
        config.trading.copy_trade_pct * 100.0,
        config.trading.min_mirror_lamports,
        config.trading.max_mirror_lamports
    );
    println!("  exit rules      : {}", rules.len());
    for rule in &rules {
        println!(
            "    [{}] {} -> {:?} ({} conditions)",
            rule.priority,
            rule.name,
            rule.action,
            rule.conditions.len()
        );
    }
    Ok(())
}
