//! Known Venue Programs
//!
//! Constants for the trading venues we classify against: the pump.fun launch
//! program and the major DEX routers. Each venue pairs a program address with
//! the instruction discriminators and log keywords used by the classifier.

use serde::{Deserialize, Serialize};

/// pump.fun bonding curve program
pub const PUMP_FUN_PROGRAM: &str = "6EF8rrecthR5Dkzon8Nwu78hRvfCKubJ14M5uBEwF6P";
/// Raydium AMM v4
pub const RAYDIUM_AMM_PROGRAM: &str = "675kPX9MHTjS2zt1qfr1NYHuzeLXfQM9H24wFSUt1Mp8";
/// Jupiter Aggregator v6
pub const JUPITER_V6_PROGRAM: &str = "JUP6LkbZbjS1jKKwapdHNy74zcZ3tLUZoi5QNyVTaV4";
/// Orca Whirlpool
pub const ORCA_WHIRLPOOL_PROGRAM: &str = "whirLbMiicVdio4qvUfM5KAg6Ct8VwpYzGff3uctyCc";
/// Meteora DLMM
pub const METEORA_DLMM_PROGRAM: &str = "LBUZKhRxPF3XUpBCjp4YzTKgLccjZhTSDM9YuVaPwxo";

/// pump.fun instruction discriminators (first 8 bytes of instruction data)
pub const PUMP_BUY_DISCRIMINATOR: [u8; 8] = [102, 6, 61, 18, 1, 218, 235, 234];
pub const PUMP_SELL_DISCRIMINATOR: [u8; 8] = [51, 230, 133, 164, 1, 127, 131, 173];
pub const PUMP_CREATE_DISCRIMINATOR: [u8; 8] = [181, 157, 89, 67, 143, 182, 52, 72];

/// On-chain trading venue identified by a fixed program address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Venue {
    PumpFun,
    Raydium,
    Jupiter,
    Orca,
    Meteora,
}

impl Venue {
    /// Look up a venue by program id string. Returns None for programs we
    /// do not classify against (system programs, unknown contracts).
    pub fn from_program_id(program_id: &str) -> Option<Self> {
        match program_id {
            PUMP_FUN_PROGRAM => Some(Venue::PumpFun),
            RAYDIUM_AMM_PROGRAM => Some(Venue::Raydium),
            JUPITER_V6_PROGRAM => Some(Venue::Jupiter),
            ORCA_WHIRLPOOL_PROGRAM => Some(Venue::Orca),
            METEORA_DLMM_PROGRAM => Some(Venue::Meteora),
            _ => None,
        }
    }

    pub fn program_id(&self) -> &'static str {
        match self {
            Venue::PumpFun => PUMP_FUN_PROGRAM,
            Venue::Raydium => RAYDIUM_AMM_PROGRAM,
            Venue::Jupiter => JUPITER_V6_PROGRAM,
            Venue::Orca => ORCA_WHIRLPOOL_PROGRAM,
            Venue::Meteora => METEORA_DLMM_PROGRAM,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            Venue::PumpFun => "Pump.fun",
            Venue::Raydium => "Raydium",
            Venue::Jupiter => "Jupiter",
            Venue::Orca => "Orca",
            Venue::Meteora => "Meteora",
        }
    }

    /// Log keywords that identify a buy on this venue when instruction data
    /// is not decodable. Matched case-insensitively against joined log text.
    pub fn buy_keywords(&self) -> &'static [&'static str] {
        match self {
            Venue::PumpFun => &["instruction: buy"],
            _ => &["instruction: swap", "swap executed", "swapevent"],
        }
    }

    pub fn sell_keywords(&self) -> &'static [&'static str] {
        match self {
            Venue::PumpFun => &["instruction: sell"],
            _ => &[],
        }
    }

    pub fn create_keywords(&self) -> &'static [&'static str] {
        match self {
            Venue::PumpFun => &["instruction: create", "instruction: initialize"],
            _ => &[],
        }
    }
}

impl std::fmt::Display for Venue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
