//! Mirrorbot - Solana Wallet Copy-Trading Pipeline

use anyhow::Result;
use clap::Parser;

use mirrorbot::adapters::cli::{self, CliApp};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists (secrets go here, not in config.toml)
    dotenvy::dotenv().ok();

    let app = CliApp::parse();
    cli::execute(app).await
}
