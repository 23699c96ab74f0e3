//! Transaction Classifier
//!
//! Stateless mapping from a raw transaction record to at most one
//! `DetectedEvent`. Decode failures always degrade to "no match" - the
//! caller never sees an error from here.
//!
//! Matching order per transaction:
//! 1. instruction discriminator against the venue table (first matching
//!    instruction in message order wins)
//! 2. venue log keywords
//! 3. native balance delta heuristic on the tracked wallet

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use tracing::debug;

use crate::domain::event::{DetectedEvent, EventKind, UNKNOWN_TOKEN};
use crate::domain::venues::{
    Venue, PUMP_BUY_DISCRIMINATOR, PUMP_CREATE_DISCRIMINATOR, PUMP_SELL_DISCRIMINATOR,
};
use crate::ports::transaction_source::{RawInstruction, RawTransaction};

/// Balance changes smaller than this are treated as fee noise, not trades
const FEE_NOISE_LAMPORTS: i64 = 100_000; // 0.0001 SOL

/// Classify a transaction observed on `tracked_wallet`. Returns None when no
/// operation type can be determined; missing token/amount fields degrade to
/// sentinel values instead of suppressing the event.
pub fn classify(tx: &RawTransaction, tracked_wallet: &str) -> Option<DetectedEvent> {
    if !tx.success {
        debug!(signature = %tx.signature, "skipping failed transaction");
        return None;
    }

    // Pass 1: instruction-level discriminator match, message order
    for instruction in &tx.instructions {
        let Some(venue) = Venue::from_program_id(&instruction.program_id) else {
            continue;
        };
        if let Some(kind) = match_discriminator(venue, instruction) {
            return Some(build_event(tx, tracked_wallet, venue, kind, Some(instruction)));
        }
    }

    // Passes 2 and 3 need at least one venue instruction to anchor on
    let (venue, instruction) = tx.instructions.iter().find_map(|ix| {
        Venue::from_program_id(&ix.program_id).map(|venue| (venue, ix))
    })?;

    if let Some(kind) = match_log_keywords(tx, venue) {
        return Some(build_event(tx, tracked_wallet, venue, kind, Some(instruction)));
    }

    if let Some(kind) = balance_delta_heuristic(tx, tracked_wallet) {
        return Some(build_event(tx, tracked_wallet, venue, kind, Some(instruction)));
    }

    debug!(
        signature = %tx.signature,
        venue = %venue,
        "venue transaction with undeterminable operation"
    );
    None
}

/// Interpret the first 8 bytes of instruction data as a discriminator.
/// Only pump.fun publishes stable discriminators we match on; DEX routers
/// fall through to the log/balance fallbacks.
fn match_discriminator(venue: Venue, instruction: &RawInstruction) -> Option<EventKind> {
    if venue != Venue::PumpFun {
        return None;
    }
    let payload = decode_instruction_data(&instruction.data)?;
    let discriminator: [u8; 8] = payload.get(..8)?.try_into().ok()?;
    match discriminator {
        PUMP_BUY_DISCRIMINATOR => Some(EventKind::Buy),
        PUMP_SELL_DISCRIMINATOR => Some(EventKind::Sell),
        PUMP_CREATE_DISCRIMINATOR => Some(EventKind::Create),
        _ => None,
    }
}

/// Instruction payloads usually arrive base58 encoded; some sources hand
/// back base64. Try both, degrade to None.
fn decode_instruction_data(data: &str) -> Option<Vec<u8>> {
    if data.is_empty() {
        return None;
    }
    bs58::decode(data)
        .into_vec()
        .ok()
        .or_else(|| BASE64.decode(data).ok())
}

fn match_log_keywords(tx: &RawTransaction, venue: Venue) -> Option<EventKind> {
    if tx.log_messages.is_empty() {
        return None;
    }
    let joined = tx.log_messages.join(" ").to_lowercase();

    if venue.sell_keywords().iter().any(|k| joined.contains(k)) {
        return Some(EventKind::Sell);
    }
    if venue.create_keywords().iter().any(|k| joined.contains(k)) {
        return Some(EventKind::Create);
    }
    if venue.buy_keywords().iter().any(|k| joined.contains(k)) {
        // Swap keywords are directionless on DEX venues; resolve the side
        // from the wallet's native balance movement when we can
        if venue != Venue::PumpFun {
            if let Some(kind) = balance_delta_heuristic_any(tx) {
                return Some(kind);
            }
        }
        return Some(EventKind::Buy);
    }
    None
}

fn balance_delta_heuristic(tx: &RawTransaction, tracked_wallet: &str) -> Option<EventKind> {
    let delta = tx.native_balance_delta(tracked_wallet)?;
    if delta < -FEE_NOISE_LAMPORTS {
        Some(EventKind::Buy)
    } else if delta > FEE_NOISE_LAMPORTS {
        Some(EventKind::Sell)
    } else {
        None
    }
}

/// Same heuristic, applied to the fee payer (first account) when the caller
/// has no tracked-wallet anchor. Used for swap direction resolution only.
fn balance_delta_heuristic_any(tx: &RawTransaction) -> Option<EventKind> {
    let payer = tx.account_keys.first()?;
    balance_delta_heuristic(tx, payer)
}

fn build_event(
    tx: &RawTransaction,
    tracked_wallet: &str,
    venue: Venue,
    kind: EventKind,
    instruction: Option<&RawInstruction>,
) -> DetectedEvent {
    let token_address = instruction
        .and_then(|ix| extract_token(venue, kind, ix))
        .unwrap_or_else(|| UNKNOWN_TOKEN.to_string());

    let amount_lamports = tx
        .native_balance_delta(tracked_wallet)
        .map(|delta| delta.unsigned_abs())
        .unwrap_or(0);

    DetectedEvent::new(
        kind,
        tracked_wallet,
        token_address,
        amount_lamports,
        venue,
        tx.signature.clone(),
    )
}

/// Best-effort token mint extraction from the instruction account list.
/// Account layouts are venue specific; anything unrecognized stays unknown.
fn extract_token(venue: Venue, kind: EventKind, instruction: &RawInstruction) -> Option<String> {
    match venue {
        Venue::PumpFun => {
            // pump.fun IDL: create has the mint first, buy/sell carry it
            // after global and fee_recipient
            let index = match kind {
                EventKind::Create => 0,
                EventKind::Buy | EventKind::Sell => 2,
            };
            instruction.accounts.get(index).cloned()
        }
        _ => None,
    }
}
