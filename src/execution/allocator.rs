use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use thiserror::Error;

use super::scanner::ScannedInstrument;
use crate::models::{Blacklist, Watchlist};

/// Capital allocation and trade sizing parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TradingConfig {
    /// Quote balance that is never traded
    pub minimum_balance: f64,
    /// A per-trade size at or below this aborts the cycle
    pub min_trade_notional: f64,
    /// Per-trade size cap
    pub max_trade_notional: f64,
    /// The watchlist intersection must be larger than this
    pub min_candidates: usize,
    /// Maximum positions opened per cycle
    pub max_slots: usize,
    /// Symbols with this many recent entries are not bought again
    pub max_open_per_symbol: u32,
    pub take_profit_multiplier: f64,
    /// Age after which a recent trade stops counting toward the blacklist
    pub blacklist_window_minutes: i64,
}

impl Default for TradingConfig {
    fn default() -> Self {
        Self {
            minimum_balance: 20.0,
            min_trade_notional: 10.0,
            max_trade_notional: 10.0,
            min_candidates: 30,
            max_slots: 4,
            max_open_per_symbol: 2,
            take_profit_multiplier: 1.02,
            blacklist_window_minutes: 480,
        }
    }
}

#[derive(Debug, Error, PartialEq)]
pub enum AllocationRejection {
    #[error("free balance {balance} does not exceed the minimum {minimum}")]
    InsufficientBalance { balance: f64, minimum: f64 },
    #[error("{got} watchlist candidates, need more than {need}")]
    TooFewCandidates { got: usize, need: usize },
    #[error("per-trade size {size:.4} does not exceed the floor {floor}")]
    TradeSizeTooSmall { size: f64, floor: f64 },
}

/// A bullish instrument that was also on the previous watchlist
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub symbol: String,
    pub tick_precision: u32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AllocationPlan {
    /// Sorted by symbol
    pub candidates: Vec<Candidate>,
    /// Number of trades to attempt this cycle
    pub divider: usize,
    /// Quote amount spent per trade
    pub notional: f64,
}

impl AllocationPlan {
    /// The first `divider` candidates that are not blacklisted and can have
    /// their sell price rounded
    pub fn slots<'a>(
        &'a self,
        blacklist: &'a Blacklist,
        max_open_per_symbol: u32,
    ) -> impl Iterator<Item = &'a Candidate> + 'a {
        self.candidates
            .iter()
            .filter(move |c| {
                if blacklist.count(&c.symbol) >= max_open_per_symbol {
                    tracing::debug!(symbol = %c.symbol, "Skipping: blacklisted");
                    return false;
                }
                if c.tick_precision == 0 {
                    tracing::debug!(symbol = %c.symbol, "Skipping: no tick precision");
                    return false;
                }
                true
            })
            .take(self.divider)
    }
}

/// Slots opened for `count` candidates
pub fn divider_for(count: usize, max_slots: usize) -> usize {
    if count >= max_slots {
        max_slots
    } else if count == 1 {
        2
    } else {
        count
    }
}

/// Decide whether this cycle trades, on what, and how much per trade
pub fn allocate(
    balance: f64,
    watchlist: &Watchlist,
    bullish: &HashMap<String, ScannedInstrument>,
    config: &TradingConfig,
) -> Result<AllocationPlan, AllocationRejection> {
    if balance <= config.minimum_balance {
        return Err(AllocationRejection::InsufficientBalance {
            balance,
            minimum: config.minimum_balance,
        });
    }

    let candidates: Vec<Candidate> = watchlist
        .symbols
        .iter()
        .collect::<BTreeSet<_>>()
        .into_iter()
        .filter_map(|symbol| {
            bullish.get(symbol).map(|scanned| Candidate {
                symbol: symbol.clone(),
                tick_precision: scanned.features.tick_precision,
            })
        })
        .collect();

    if candidates.is_empty() || candidates.len() <= config.min_candidates {
        return Err(AllocationRejection::TooFewCandidates {
            got: candidates.len(),
            need: config.min_candidates,
        });
    }

    let divider = divider_for(candidates.len(), config.max_slots).max(1);
    let per_trade = (balance - config.minimum_balance) / divider as f64;
    if per_trade <= config.min_trade_notional {
        return Err(AllocationRejection::TradeSizeTooSmall {
            size: per_trade,
            floor: config.min_trade_notional,
        });
    }
    let notional = per_trade.min(config.max_trade_notional);

    tracing::info!(
        "Allocating {} candidates: divider {}, {:.2} per trade",
        candidates.len(),
        divider,
        notional
    );

    Ok(AllocationPlan {
        candidates,
        divider,
        notional,
    })
}
