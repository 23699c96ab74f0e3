//! Configuration Loader
//!
//! Loads and validates configuration from TOML files matching config.toml
//! structure. Validation failures are fatal at startup - a bot running with
//! a half-understood config is worse than one that refuses to start.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

use crate::domain::dedup::DEFAULT_CAPACITY;
use crate::domain::rule::{compile_rules, Rule, RuleError, RuleSpec};

/// Main configuration structure matching config.toml
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub tracking: TrackingSection,
    #[serde(default)]
    pub monitor: MonitorSection,
    #[serde(default)]
    pub market: MarketSection,
    pub trading: TradingSection,
    pub solana: SolanaSection,
    pub logging: LoggingSection,
    /// Exit rules, evaluated in priority order
    #[serde(default, rename = "rules")]
    pub rules: Vec<RuleSpec>,
}

/// Wallets to follow
#[derive(Debug, Clone, Deserialize)]
pub struct TrackingSection {
    /// Base58 wallet addresses to mirror
    pub wallets: Vec<String>,
}

/// Polling and dedup tuning
#[derive(Debug, Clone, Deserialize)]
pub struct MonitorSection {
    /// Delay between signature polls per wallet, milliseconds
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Backoff after an RPC error, milliseconds
    #[serde(default = "default_error_backoff_ms")]
    pub error_backoff_ms: u64,
    /// Signatures fetched per poll
    #[serde(default = "default_signature_limit")]
    pub signature_limit: usize,
    /// Processed-signature cache size
    #[serde(default = "default_dedup_capacity")]
    pub dedup_capacity: usize,
}

fn default_poll_interval_ms() -> u64 {
    400
}

fn default_error_backoff_ms() -> u64 {
    3_000
}

fn default_signature_limit() -> usize {
    20
}

fn default_dedup_capacity() -> usize {
    DEFAULT_CAPACITY
}

impl Default for MonitorSection {
    fn default() -> Self {
        Self {
            poll_interval_ms: default_poll_interval_ms(),
            error_backoff_ms: default_error_backoff_ms(),
            signature_limit: default_signature_limit(),
            dedup_capacity: default_dedup_capacity(),
        }
    }
}

impl MonitorSection {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn error_backoff(&self) -> Duration {
        Duration::from_millis(self.error_backoff_ms)
    }
}

/// Quote polling for held tokens
#[derive(Debug, Clone, Deserialize)]
pub struct MarketSection {
    /// Price API base URL
    #[serde(default = "default_price_api_url")]
    pub api_url: String,
    /// Delay between quote sweeps, milliseconds
    #[serde(default = "default_price_poll_interval_ms")]
    pub price_poll_interval_ms: u64,
    /// Volume samples kept per token for the spike baseline
    #[serde(default = "default_volume_window")]
    pub volume_window: usize,
    /// Current/baseline volume ratio that counts as a spike
    #[serde(default = "default_volume_spike_ratio")]
    pub volume_spike_ratio: f64,
}

fn default_price_api_url() -> String {
    crate::adapters::market_data::jupiter::DEFAULT_PRICE_API_URL.to_string()
}

fn default_price_poll_interval_ms() -> u64 {
    2_000
}

fn default_volume_window() -> usize {
    20
}

fn default_volume_spike_ratio() -> f64 {
    3.0
}

impl Default for MarketSection {
    fn default() -> Self {
        Self {
            api_url: default_price_api_url(),
            price_poll_interval_ms: default_price_poll_interval_ms(),
            volume_window: default_volume_window(),
            volume_spike_ratio: default_volume_spike_ratio(),
        }
    }
}

impl MarketSection {
    pub fn price_poll_interval(&self) -> Duration {
        Duration::from_millis(self.price_poll_interval_ms)
    }
}

/// Mirror sizing and execution mode
#[derive(Debug, Clone, Deserialize)]
pub struct TradingSection {
    /// Fraction of an observed buy to mirror (0.85 = 85%)
    pub copy_trade_pct: f64,
    /// Smallest mirrored entry, lamports
    pub min_mirror_lamports: u64,
    /// Largest mirrored entry, lamports
    pub max_mirror_lamports: u64,
    /// Exit our position when the tracked wallet sells
    #[serde(default = "default_true")]
    pub mirror_sells: bool,
    /// Enter when a tracked wallet launches a token
    #[serde(default)]
    pub enter_on_create: bool,
    /// Paper mode: log fills instead of sending transactions
    #[serde(default = "default_true")]
    pub paper: bool,
}

fn default_true() -> bool {
    true
}

/// Solana RPC configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct SolanaSection {
    /// RPC endpoint (use private RPC for production)
    pub rpc_url: String,
    /// Commitment level: "processed", "confirmed", "finalized"
    pub commitment: String,
}

impl SolanaSection {
    /// Get RPC URL with environment variable override
    /// Checks SOLANA_RPC_URL env var first, falls back to config value
    pub fn get_rpc_url(&self) -> String {
        std::env::var("SOLANA_RPC_URL").unwrap_or_else(|_| self.rpc_url.clone())
    }
}

/// Logging configuration section
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSection {
    /// Log level: "trace", "debug", "info", "warn", "error"
    pub level: String,
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Invalid rule: {0}")]
    RuleError(#[from] RuleError),
    #[error("Validation failed: {0}")]
    ValidationError(String),
}

/// Load configuration from a TOML file
pub fn load_config<P: AsRef<Path>>(path: P) -> Result<Config, ConfigError> {
    let content = std::fs::read_to_string(path)?;
    let config: Config = toml::from_str(&content)?;
    config.validate()?;
    Ok(config)
}

impl Config {
    /// Validate all configuration parameters
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tracking.wallets.is_empty() {
            return Err(ConfigError::ValidationError(
                "tracking.wallets cannot be empty".to_string(),
            ));
        }

        for wallet in &self.tracking.wallets {
            match bs58::decode(wallet).into_vec() {
                Ok(bytes) if bytes.len() == 32 => {}
                _ => {
                    return Err(ConfigError::ValidationError(format!(
                        "not a valid base58 wallet address: {wallet}"
                    )))
                }
            }
        }

        if self.monitor.poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "poll_interval_ms must be > 0".to_string(),
            ));
        }

        if self.monitor.signature_limit == 0 || self.monitor.signature_limit > 1000 {
            return Err(ConfigError::ValidationError(format!(
                "signature_limit must be 1-1000, got {}",
                self.monitor.signature_limit
            )));
        }

        if self.monitor.dedup_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "dedup_capacity must be > 0".to_string(),
            ));
        }

        if self.market.price_poll_interval_ms == 0 {
            return Err(ConfigError::ValidationError(
                "price_poll_interval_ms must be > 0".to_string(),
            ));
        }

        if self.market.volume_window < 2 {
            return Err(ConfigError::ValidationError(format!(
                "volume_window must be at least 2, got {}",
                self.market.volume_window
            )));
        }

        if self.market.volume_spike_ratio <= 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "volume_spike_ratio must exceed 1.0, got {}",
                self.market.volume_spike_ratio
            )));
        }

        if self.trading.copy_trade_pct <= 0.0 || self.trading.copy_trade_pct > 1.0 {
            return Err(ConfigError::ValidationError(format!(
                "copy_trade_pct must be in (0, 1], got {}",
                self.trading.copy_trade_pct
            )));
        }

        if self.trading.min_mirror_lamports > self.trading.max_mirror_lamports {
            return Err(ConfigError::ValidationError(format!(
                "min_mirror_lamports {} exceeds max_mirror_lamports {}",
                self.trading.min_mirror_lamports, self.trading.max_mirror_lamports
            )));
        }

        if self.solana.rpc_url.is_empty() {
            return Err(ConfigError::ValidationError(
                "rpc_url cannot be empty".to_string(),
            ));
        }

        match self.solana.commitment.as_str() {
            "processed" | "confirmed" | "finalized" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "commitment must be processed/confirmed/finalized, got {other}"
                )))
            }
        }

        // Rules must compile; compiled output is rebuilt by the caller
        compile_rules(&self.rules)?;

        Ok(())
    }

    /// Compile the configured exit rules, sorted by priority
    pub fn compiled_rules(&self) -> Result<Vec<Rule>, ConfigError> {
        Ok(compile_rules(&self.rules)?)
    }
}

impl From<&Config> for crate::engine::EngineConfig {
    fn from(config: &Config) -> Self {
        Self {
            copy_trade_pct: config.trading.copy_trade_pct,
            min_mirror_lamports: config.trading.min_mirror_lamports,
            max_mirror_lamports: config.trading.max_mirror_lamports,
            mirror_sells: config.trading.mirror_sells,
            enter_on_create: config.trading.enter_on_create,
        }
    }
}

impl From<&Config> for crate::monitor::MonitorConfig {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.monitor.poll_interval(),
            error_backoff: config.monitor.error_backoff(),
            signature_limit: config.monitor.signature_limit,
        }
    }
}

impl From<&Config> for crate::monitor::PriceTrackerConfig {
    fn from(config: &Config) -> Self {
        Self {
            poll_interval: config.market.price_poll_interval(),
            volume_window: config.market.volume_window,
            volume_spike_ratio: config.market.volume_spike_ratio,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const TRACKED_WALLET: &str = "DfMxre4cKmvogbLrPigxmibVTTQDuzjdXojWzjCXXhzj";

    fn create_valid_config() -> String {
        format!(
            r#"
[tracking]
wallets = ["{TRACKED_WALLET}"]

[monitor]
poll_interval_ms = 400
error_backoff_ms = 3000
signature_limit = 20
dedup_capacity = 10000

[trading]
copy_trade_pct = 0.85
min_mirror_lamports = 1000000
max_mirror_lamports = 1000000000
mirror_sells = true
paper = true

[solana]
rpc_url = "https://api.mainnet-beta.solana.com"
commitment = "confirmed"

[logging]
level = "info"

[[rules]]
name = "fast-exit"
priority = 1
action = "exit_full"
[rules.conditions]
price_gain_pct = ">= 15"
hold_time_secs = "<= 5"

[[rules]]
name = "timeout"
priority = 3
action = "exit_full"
[rules.conditions]
hold_time_secs = ">= 16"
price_gain_pct = "< 2"
"#
        )
    }

    fn write_config(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_load_valid_config() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.tracking.wallets.len(), 1);
        assert_eq!(config.monitor.signature_limit, 20);
        assert_eq!(config.trading.copy_trade_pct, 0.85);
        assert_eq!(config.rules.len(), 2);

        let rules = config.compiled_rules().unwrap();
        assert_eq!(rules[0].name, "fast-exit");
        assert_eq!(rules[1].name, "timeout");
    }

    #[test]
    fn test_load_missing_file() {
        let result = load_config("/nonexistent/path/config.toml");
        assert!(matches!(result.unwrap_err(), ConfigError::IoError(_)));
    }

    #[test]
    fn test_monitor_section_defaults() {
        let minimal = format!(
            r#"
[tracking]
wallets = ["{TRACKED_WALLET}"]

[trading]
copy_trade_pct = 0.85
min_mirror_lamports = 1000000
max_mirror_lamports = 1000000000

[solana]
rpc_url = "https://api.mainnet-beta.solana.com"
commitment = "confirmed"

[logging]
level = "info"
"#
        );
        let file = write_config(&minimal);
        let config = load_config(file.path()).unwrap();

        assert_eq!(config.monitor.poll_interval_ms, 400);
        assert_eq!(config.monitor.dedup_capacity, DEFAULT_CAPACITY);
        assert!(config.trading.mirror_sells);
        assert!(config.trading.paper);
        assert!(config.rules.is_empty());
        // Market section is optional with sane polling defaults
        assert_eq!(config.market.price_poll_interval_ms, 2_000);
        assert_eq!(config.market.volume_window, 20);
        assert_eq!(config.market.volume_spike_ratio, 3.0);
    }

    #[test]
    fn test_market_section_overrides_and_validation() {
        let with_market = format!(
            "{}\n[market]\nprice_poll_interval_ms = 500\nvolume_spike_ratio = 2.5\n",
            create_valid_config()
        );
        let file = write_config(&with_market);
        let config = load_config(file.path()).unwrap();
        assert_eq!(config.market.price_poll_interval_ms, 500);
        assert_eq!(config.market.volume_spike_ratio, 2.5);
        assert_eq!(config.market.volume_window, 20);

        let tracker: crate::monitor::PriceTrackerConfig = (&config).into();
        assert_eq!(tracker.poll_interval, Duration::from_millis(500));

        let bad_ratio = format!(
            "{}\n[market]\nvolume_spike_ratio = 0.5\n",
            create_valid_config()
        );
        let file = write_config(&bad_ratio);
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_empty_wallets_rejected() {
        let invalid = create_valid_config().replace(
            &format!("wallets = [\"{TRACKED_WALLET}\"]"),
            "wallets = []",
        );
        let file = write_config(&invalid);
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_malformed_wallet_rejected() {
        let invalid =
            create_valid_config().replace(TRACKED_WALLET, "not-a-real-address");
        let file = write_config(&invalid);
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_copy_pct_out_of_range() {
        let invalid = create_valid_config().replace("copy_trade_pct = 0.85", "copy_trade_pct = 1.5");
        let file = write_config(&invalid);
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_invalid_commitment() {
        let invalid =
            create_valid_config().replace("commitment = \"confirmed\"", "commitment = \"instant\"");
        let file = write_config(&invalid);
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::ValidationError(_)
        ));
    }

    #[test]
    fn test_bad_rule_rejected_at_load() {
        let invalid = create_valid_config().replace("action = \"exit_full\"", "action = \"moon\"");
        let file = write_config(&invalid);
        assert!(matches!(
            load_config(file.path()).unwrap_err(),
            ConfigError::RuleError(_)
        ));
    }

    #[test]
    fn test_rpc_url_env_override() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();
        // No env var set in tests: falls back to config value
        if std::env::var("SOLANA_RPC_URL").is_err() {
            assert_eq!(
                config.solana.get_rpc_url(),
                "https://api.mainnet-beta.solana.com"
            );
        }
    }

    #[test]
    fn test_engine_config_conversion() {
        let file = write_config(&create_valid_config());
        let config = load_config(file.path()).unwrap();
        let engine: crate::engine::EngineConfig = (&config).into();
        assert_eq!(engine.copy_trade_pct, 0.85);
        assert_eq!(engine.max_mirror_lamports, 1_000_000_000);
        assert!(engine.mirror_sells);
    }
}
