//! Position Bookkeeping
//!
//! Per-token position records owned by the rule engine. A buy opens or
//! grows a position with a quantity-weighted average entry price; a sell
//! reduces quantity and realizes PnL; the position is removed when quantity
//! reaches zero.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PositionError {
    #[error("No open position for token {0}")]
    NotFound(String),
    #[error("Invalid quantity: {0}")]
    InvalidQuantity(f64),
    #[error("Invalid price: {0}")]
    InvalidPrice(f64),
    #[error("Sell quantity {requested} exceeds held quantity {held}")]
    Oversell { requested: f64, held: f64 },
}

/// Currently held quantity and cost basis for one token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Position {
    pub token_address: String,
    pub quantity: f64,
    pub avg_entry_price: f64,
    pub opened_at: DateTime<Utc>,
}

impl Position {
    fn new(token_address: String, quantity: f64, price: f64) -> Self {
        Self {
            token_address,
            quantity,
            avg_entry_price: price,
            opened_at: Utc::now(),
        }
    }

    /// Seconds since the position was opened
    pub fn hold_time_secs(&self) -> f64 {
        (Utc::now() - self.opened_at).num_milliseconds() as f64 / 1000.0
    }

    /// Percent gain of `price` over the average entry price
    pub fn gain_pct(&self, price: f64) -> f64 {
        if self.avg_entry_price <= 0.0 {
            return 0.0;
        }
        (price - self.avg_entry_price) / self.avg_entry_price * 100.0
    }
}

/// Result of a sell applied to the book
#[derive(Debug, Clone, Copy)]
pub struct SellOutcome {
    pub realized_pnl: f64,
    pub remaining_quantity: f64,
}

/// All open positions, keyed by token mint
#[derive(Debug, Default)]
pub struct PositionBook {
    positions: HashMap<String, Position>,
}

impl PositionBook {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, token_address: &str) -> Option<&Position> {
        self.positions.get(token_address)
    }

    pub fn len(&self) -> usize {
        self.positions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.positions.is_empty()
    }

    pub fn open_positions(&self) -> impl Iterator<Item = &Position> {
        self.positions.values()
    }

    /// Apply a buy fill. Opens the position on first buy, otherwise folds the
    /// fill into a quantity-weighted average entry price.
    pub fn record_buy(
        &mut self,
        token_address: &str,
        quantity: f64,
        price: f64,
    ) -> Result<&Position, PositionError> {
        if quantity <= 0.0 {
            return Err(PositionError::InvalidQuantity(quantity));
        }
        if price <= 0.0 {
            return Err(PositionError::InvalidPrice(price));
        }

        let position = self
            .positions
            .entry(token_address.to_string())
            .and_modify(|p| {
                let total = p.quantity + quantity;
                p.avg_entry_price = (p.quantity * p.avg_entry_price + quantity * price) / total;
                p.quantity = total;
            })
            .or_insert_with(|| Position::new(token_address.to_string(), quantity, price));

        Ok(position)
    }

    /// Apply a sell fill. Realized PnL is (exit - avg entry) * sold quantity;
    /// the position is dropped when fully sold.
    pub fn record_sell(
        &mut self,
        token_address: &str,
        quantity: f64,
        price: f64,
    ) -> Result<SellOutcome, PositionError> {
        if quantity <= 0.0 {
            return Err(PositionError::InvalidQuantity(quantity));
        }
        if price <= 0.0 {
            return Err(PositionError::InvalidPrice(price));
        }

        let position = self
            .positions
            .get_mut(token_address)
            .ok_or_else(|| PositionError::NotFound(token_address.to_string()))?;

        if quantity > position.quantity + f64::EPSILON {
            return Err(PositionError::Oversell {
                requested: quantity,
                held: position.quantity,
            });
        }

        let realized_pnl = (price - position.avg_entry_price) * quantity;
        position.quantity -= quantity;
        let remaining = position.quantity;

        if remaining <= f64::EPSILON {
            self.positions.remove(token_address);
            return Ok(SellOutcome {
                realized_pnl,
                remaining_quantity: 0.0,
            });
        }

        Ok(SellOutcome {
            realized_pnl,
            remaining_quantity: remaining,
        })
    }

    /// Test support: shift a position's open time into the past so
    /// hold-time rules can be exercised without sleeping.
    #[cfg(test)]
    pub(crate) fn backdate(&mut self, token_address: &str, secs: f64) {
        if let Some(position) = self.positions.get_mut(token_address) {
            position.opened_at =
                Utc::now() - chrono::Duration::milliseconds((secs * 1000.0) as i64);
        }
    }
}
