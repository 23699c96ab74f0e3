//! Rule Engine
//!
//! Consumes detected wallet events and price/volume signals, holds the live
//! position book, and produces trade decisions. Entry: a tracked Buy or
//! Create is itself the entry signal, mirrored at a configured fraction of
//! the observed size and clamped to a size band. Exit: rules are evaluated
//! in priority order on every price or volume update for a held token; the
//! first rule whose every condition holds wins.
//!
//! All mutable state sits behind one mutex, so concurrently delivered
//! events apply atomically and in delivery order.

use std::collections::HashMap;
use std::sync::Mutex;

use tracing::{debug, info};

use crate::domain::event::{DecisionAction, DetectedEvent, EventKind, TradeDecision};
use crate::domain::position::{Position, PositionBook, PositionError, SellOutcome};
use crate::domain::rule::{ExitMetrics, Rule, RuleAction};

/// Rule name used for mirrored entries (not a configured exit rule)
pub const ENTRY_RULE_COPY: &str = "copy-entry";
/// Rule name used for entries triggered by a token launch
pub const ENTRY_RULE_LAUNCH: &str = "launch-entry";
/// Rule name used when mirroring a tracked wallet's own exit
pub const EXIT_RULE_MIRROR: &str = "mirror-sell";

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Fraction of the observed buy size to mirror
    pub copy_trade_pct: f64,
    /// Floor for mirrored entries, lamports (venue minimums)
    pub min_mirror_lamports: u64,
    /// Cap for mirrored entries, lamports (risk bound independent of the
    /// observed size)
    pub max_mirror_lamports: u64,
    /// Mirror a tracked wallet's sell by exiting our own position
    pub mirror_sells: bool,
    /// Enter on Create events, not just Buys
    pub enter_on_create: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            copy_trade_pct: 0.85,
            min_mirror_lamports: 1_000_000,        // 0.001 SOL
            max_mirror_lamports: 1_000_000_000,    // 1 SOL
            mirror_sells: true,
            enter_on_create: false,
        }
    }
}

#[derive(Debug, Default)]
struct EngineState {
    book: PositionBook,
    last_price: HashMap<String, f64>,
    volume_ratio: HashMap<String, f64>,
    realized_pnl: f64,
}

pub struct RuleEngine {
    /// Sorted ascending by priority at construction, stable on ties
    rules: Vec<Rule>,
    config: EngineConfig,
    state: Mutex<EngineState>,
}

impl RuleEngine {
    /// `rules` must already be compiled; they are sorted here so callers
    /// can pass them in declaration order.
    pub fn new(mut rules: Vec<Rule>, config: EngineConfig) -> Self {
        rules.sort_by_key(|r| r.priority);
        Self {
            rules,
            config,
            state: Mutex::new(EngineState::default()),
        }
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// React to a detected wallet event. Buys (and optionally Creates) from
    /// tracked wallets become Enter decisions; Sells become a full Exit of
    /// any held position when sell mirroring is on.
    pub fn on_event(&self, event: &DetectedEvent) -> Option<TradeDecision> {
        match event.kind {
            EventKind::Buy => Some(self.entry_decision(event, ENTRY_RULE_COPY)),
            EventKind::Create if self.config.enter_on_create => {
                Some(self.entry_decision(event, ENTRY_RULE_LAUNCH))
            }
            EventKind::Create => None,
            EventKind::Sell => self.mirror_sell_decision(event),
        }
    }

    /// React to a price update for a token. Updates the cached price and
    /// evaluates exit rules when we hold the token.
    pub fn on_price_update(
        &self,
        token_address: &str,
        price: f64,
        pct_change: f64,
    ) -> Option<TradeDecision> {
        let mut state = self.state.lock().unwrap();
        state.last_price.insert(token_address.to_string(), price);
        debug!(token = token_address, price, pct_change, "price update");
        Self::evaluate_exit(&self.rules, &state, token_address)
    }

    /// React to a volume spike (ratio of current volume to baseline)
    pub fn on_volume_spike(&self, token_address: &str, ratio: f64) -> Option<TradeDecision> {
        let mut state = self.state.lock().unwrap();
        state
            .volume_ratio
            .insert(token_address.to_string(), ratio);
        debug!(token = token_address, ratio, "volume spike");
        Self::evaluate_exit(&self.rules, &state, token_address)
    }

    /// Apply a confirmed buy fill to the position book
    pub fn record_buy(
        &self,
        token_address: &str,
        quantity: f64,
        price: f64,
    ) -> Result<(), PositionError> {
        let mut state = self.state.lock().unwrap();
        state.last_price.insert(token_address.to_string(), price);
        let position = state.book.record_buy(token_address, quantity, price)?;
        info!(
            token = token_address,
            quantity = position.quantity,
            avg_entry = position.avg_entry_price,
            "position updated on buy"
        );
        Ok(())
    }

    /// Apply a confirmed sell fill; returns realized PnL and remainder
    pub fn record_sell(
        &self,
        token_address: &str,
        quantity: f64,
        price: f64,
    ) -> Result<SellOutcome, PositionError> {
        let mut state = self.state.lock().unwrap();
        let outcome = state.book.record_sell(token_address, quantity, price)?;
        state.realized_pnl += outcome.realized_pnl;
        info!(
            token = token_address,
            pnl = outcome.realized_pnl,
            remaining = outcome.remaining_quantity,
            "position updated on sell"
        );
        Ok(outcome)
    }

    pub fn position(&self, token_address: &str) -> Option<Position> {
        self.state.lock().unwrap().book.get(token_address).cloned()
    }

    pub fn open_position_count(&self) -> usize {
        self.state.lock().unwrap().book.len()
    }

    /// Token mints with an open position, for the price tracker's poll set
    pub fn open_tokens(&self) -> Vec<String> {
        self.state
            .lock()
            .unwrap()
            .book
            .open_positions()
            .map(|p| p.token_address.clone())
            .collect()
    }

    pub fn realized_pnl(&self) -> f64 {
        self.state.lock().unwrap().realized_pnl
    }

    fn entry_decision(&self, event: &DetectedEvent, rule_name: &str) -> TradeDecision {
        // Unknown observed size mirrors at the floor
        let observed = event.amount_lamports;
        let scaled = if observed == 0 {
            self.config.min_mirror_lamports as f64
        } else {
            observed as f64 * self.config.copy_trade_pct
        };
        let size = scaled.clamp(
            self.config.min_mirror_lamports as f64,
            self.config.max_mirror_lamports as f64,
        );

        info!(
            token = %event.token_address,
            observed_lamports = observed,
            mirror_lamports = size,
            rule = rule_name,
            "entry decision"
        );
        TradeDecision {
            action: DecisionAction::Enter,
            token_address: event.token_address.clone(),
            size,
            triggering_rule: rule_name.to_string(),
        }
    }

    fn mirror_sell_decision(&self, event: &DetectedEvent) -> Option<TradeDecision> {
        if !self.config.mirror_sells {
            return None;
        }
        let state = self.state.lock().unwrap();
        let position = state.book.get(&event.token_address)?;
        info!(
            token = %event.token_address,
            quantity = position.quantity,
            "tracked wallet sold, mirroring exit"
        );
        Some(TradeDecision {
            action: DecisionAction::Exit,
            token_address: event.token_address.clone(),
            size: position.quantity,
            triggering_rule: EXIT_RULE_MIRROR.to_string(),
        })
    }

    /// First matching rule in priority order wins; no match, no decision.
    fn evaluate_exit(
        rules: &[Rule],
        state: &EngineState,
        token_address: &str,
    ) -> Option<TradeDecision> {
        let position = state.book.get(token_address)?;
        let price = *state.last_price.get(token_address)?;

        let metrics = ExitMetrics {
            price_gain_pct: position.gain_pct(price),
            hold_time_secs: position.hold_time_secs(),
            volume_ratio: state
                .volume_ratio
                .get(token_address)
                .copied()
                .unwrap_or(1.0),
        };

        let rule = rules.iter().find(|r| r.matches(&metrics))?;

        let size = match rule.action {
            RuleAction::ExitFull => position.quantity,
            RuleAction::ExitHalf => position.quantity / 2.0,
        };

        info!(
            token = token_address,
            rule = %rule.name,
            gain_pct = metrics.price_gain_pct,
            held_secs = metrics.hold_time_secs,
            "exit rule fired"
        );
        Some(TradeDecision {
            action: DecisionAction::Exit,
            token_address: token_address.to_string(),
            size,
            triggering_rule: rule.name.clone(),
        })
    }

    /// Test support: pretend a position was opened `secs` ago
    #[cfg(test)]
    fn backdate_position(&self, token_address: &str, secs: f64) {
        self.state
            .lock()
            .unwrap()
            .book
            .backdate(token_address, secs);
    }
}
