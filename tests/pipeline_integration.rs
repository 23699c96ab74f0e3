//! End-to-end pipeline tests
//!
//! Drive the assembled pipeline (monitor -> classifier -> dispatcher ->
//! rule engine -> execution) with scripted transactions and verify what
//! comes out the other side. Deterministic: no network, mock ports only.

use std::sync::Arc;
use std::time::Duration;

use mirrorbot::application::Orchestrator;
use mirrorbot::config::Config;
use mirrorbot::domain::event::PipelineEvent;
use mirrorbot::domain::venues::{
    PUMP_BUY_DISCRIMINATOR, PUMP_FUN_PROGRAM, PUMP_SELL_DISCRIMINATOR,
};
use mirrorbot::ports::mocks::{MockExecution, MockMarketData, MockTransactionSource};
use mirrorbot::ports::{
    ExecutionPort, MarketDataPort, RawInstruction, RawTransaction, TransactionSource,
};

const TRACKED_WALLET: &str = "DfMxre4cKmvogbLrPigxmibVTTQDuzjdXojWzjCXXhzj";
const MINT: &str = "GvQx3QJbYcVpfPzPhaYnCQvXYJx2DyvTJ4BzNbZyv111";

fn test_config() -> Config {
    toml::from_str(&format!(
        r#"
[tracking]
wallets = ["{TRACKED_WALLET}"]

[monitor]
poll_interval_ms = 10
error_backoff_ms = 10
signature_limit = 20
dedup_capacity = 1000

[market]
price_poll_interval_ms = 10

[trading]
copy_trade_pct = 0.85
min_mirror_lamports = 1000000
max_mirror_lamports = 1000000000
mirror_sells = true

[solana]
rpc_url = "http://localhost:8899"
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
"#
    ))
    .unwrap()
}

fn pump_transaction(signature: &str, discriminator: [u8; 8], spent_lamports: i64) -> RawTransaction {
    let mut data = discriminator.to_vec();
    data.extend_from_slice(&[0u8; 16]);
    let pre = 10_000_000_000i64;
    RawTransaction {
        signature: signature.to_string(),
        success: true,
        account_keys: vec![TRACKED_WALLET.to_string()],
        instructions: vec![RawInstruction {
            program_id: PUMP_FUN_PROGRAM.to_string(),
            accounts: vec!["global".into(), "fee".into(), MINT.into()],
            data: bs58::encode(data).into_string(),
        }],
        log_messages: Vec::new(),
        pre_balances: vec![pre as u64],
        post_balances: vec![(pre - spent_lamports) as u64],
        block_time: Some(1_700_000_000),
    }
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(100)).await;
}

#[tokio::test]
async fn test_tracked_buy_flows_to_mirrored_position() {
    let source = Arc::new(MockTransactionSource::new());
    let executor = Arc::new(MockExecution::new().with_fill_price(0.0001));

    source.push_signature(TRACKED_WALLET, "sig-buy", 100);
    source.insert_transaction(pump_transaction("sig-buy", PUMP_BUY_DISCRIMINATOR, 100_000_000));

    let orchestrator = Orchestrator::build(
        &test_config(),
        Arc::clone(&source) as Arc<dyn TransactionSource>,
        Arc::new(MockMarketData::new()) as Arc<dyn MarketDataPort>,
        Arc::clone(&executor) as Arc<dyn ExecutionPort>,
    )
    .await
    .unwrap();

    orchestrator.start().await;
    settle().await;
    orchestrator.stop().await;

    // The observed 0.1 SOL buy was mirrored at 85% and filled at the mock
    // price: 0.085 SOL / 0.0001 = 850 tokens
    let executed = executor.executed();
    assert_eq!(executed.len(), 1);
    assert!((executed[0].size - 85_000_000.0).abs() < 1e-6);
    assert_eq!(executed[0].token_address, MINT);

    let position = orchestrator.engine().position(MINT).unwrap();
    assert!((position.quantity - 850.0).abs() < 1e-6);
    assert_eq!(orchestrator.stats().buys_detected, 1);
}

#[tokio::test]
async fn test_price_spike_exits_the_open_position() {
    let source = Arc::new(MockTransactionSource::new());
    let executor = Arc::new(MockExecution::new().with_fill_price(0.0001));

    source.push_signature(TRACKED_WALLET, "sig-buy", 100);
    source.insert_transaction(pump_transaction("sig-buy", PUMP_BUY_DISCRIMINATOR, 100_000_000));

    let orchestrator = Orchestrator::build(
        &test_config(),
        Arc::clone(&source) as Arc<dyn TransactionSource>,
        Arc::new(MockMarketData::new()) as Arc<dyn MarketDataPort>,
        Arc::clone(&executor) as Arc<dyn ExecutionPort>,
    )
    .await
    .unwrap();

    orchestrator.start().await;
    settle().await;

    // +20% within the fast-exit window closes the whole position
    orchestrator
        .dispatcher()
        .publish(&PipelineEvent::PriceUpdate {
            token_address: MINT.to_string(),
            price: 0.00012,
            pct_change: 20.0,
        })
        .await;
    orchestrator.stop().await;

    let executed = executor.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[1].triggering_rule, "fast-exit");
    assert!(orchestrator.engine().position(MINT).is_none());
}

#[tokio::test]
async fn test_quote_stream_exits_position_without_manual_publish() {
    let source = Arc::new(MockTransactionSource::new());
    let executor = Arc::new(MockExecution::new().with_fill_price(0.0001));
    let market = Arc::new(MockMarketData::new());

    source.push_signature(TRACKED_WALLET, "sig-buy", 100);
    source.insert_transaction(pump_transaction("sig-buy", PUMP_BUY_DISCRIMINATOR, 100_000_000));

    let orchestrator = Orchestrator::build(
        &test_config(),
        Arc::clone(&source) as Arc<dyn TransactionSource>,
        Arc::clone(&market) as Arc<dyn MarketDataPort>,
        Arc::clone(&executor) as Arc<dyn ExecutionPort>,
    )
    .await
    .unwrap();

    orchestrator.start().await;
    settle().await;
    assert!(orchestrator.engine().position(MINT).is_some());

    // The price tracker's own sweep picks up a +20% quote and fires the
    // fast-exit rule; nothing publishes price updates by hand here
    market.set_quote(MINT, 0.00012, None);
    settle().await;
    orchestrator.stop().await;

    let executed = executor.executed();
    assert_eq!(executed.len(), 2);
    assert_eq!(executed[1].triggering_rule, "fast-exit");
    assert!(orchestrator.engine().position(MINT).is_none());
    assert!(market.quote_calls().contains(&MINT.to_string()));
}

#[tokio::test]
async fn test_tracked_sell_mirrors_exit() {
    let source = Arc::new(MockTransactionSource::new());
    let executor = Arc::new(MockExecution::new().with_fill_price(0.0001));

    source.push_signature(TRACKED_WALLET, "sig-buy", 100);
    source.insert_transaction(pump_transaction("sig-buy", PUMP_BUY_DISCRIMINATOR, 100_000_000));

    let orchestrator = Orchestrator::build(
        &test_config(),
        Arc::clone(&source) as Arc<dyn TransactionSource>,
        Arc::new(MockMarketData::new()) as Arc<dyn MarketDataPort>,
        Arc::clone(&executor) as Arc<dyn ExecutionPort>,
    )
    .await
    .unwrap();

    orchestrator.start().await;
    settle().await;
    assert!(orchestrator.engine().position(MINT).is_some());

    // The tracked wallet sells; we follow
    source.push_signature(TRACKED_WALLET, "sig-sell", 101);
    source.insert_transaction(pump_transaction(
        "sig-sell",
        PUMP_SELL_DISCRIMINATOR,
        -90_000_000,
    ));
    settle().await;
    orchestrator.stop().await;

    assert_eq!(orchestrator.stats().sells_detected, 1);
    assert!(orchestrator.engine().position(MINT).is_none());
}

#[tokio::test]
async fn test_dedup_survives_monitor_restart() {
    let source = Arc::new(MockTransactionSource::new());
    let executor = Arc::new(MockExecution::new().with_fill_price(0.0001));

    source.push_signature(TRACKED_WALLET, "sig-buy", 100);
    source.insert_transaction(pump_transaction("sig-buy", PUMP_BUY_DISCRIMINATOR, 100_000_000));

    let orchestrator = Orchestrator::build(
        &test_config(),
        Arc::clone(&source) as Arc<dyn TransactionSource>,
        Arc::new(MockMarketData::new()) as Arc<dyn MarketDataPort>,
        Arc::clone(&executor) as Arc<dyn ExecutionPort>,
    )
    .await
    .unwrap();

    orchestrator.start().await;
    settle().await;
    orchestrator.monitor().stop().await;

    // Restart: the same signature is still in the source's recent list but
    // must not produce a second entry
    orchestrator.monitor().start().await;
    settle().await;
    orchestrator.stop().await;

    assert_eq!(executor.executed().len(), 1);
    assert_eq!(orchestrator.stats().buys_detected, 1);
}

#[tokio::test]
async fn test_failed_transactions_are_ignored() {
    let source = Arc::new(MockTransactionSource::new());
    let executor = Arc::new(MockExecution::new().with_fill_price(0.0001));

    source.push_signature(TRACKED_WALLET, "sig-failed", 100);
    let mut tx = pump_transaction("sig-failed", PUMP_BUY_DISCRIMINATOR, 100_000_000);
    tx.success = false;
    source.insert_transaction(tx);

    let orchestrator = Orchestrator::build(
        &test_config(),
        Arc::clone(&source) as Arc<dyn TransactionSource>,
        Arc::new(MockMarketData::new()) as Arc<dyn MarketDataPort>,
        Arc::clone(&executor) as Arc<dyn ExecutionPort>,
    )
    .await
    .unwrap();

    orchestrator.start().await;
    settle().await;
    orchestrator.stop().await;

    assert!(executor.executed().is_empty());
    assert_eq!(orchestrator.stats().buys_detected, 0);
}
