//! # analyzer — classic floor-trader pivot levels
//!
//! ```text
//! pivot = (high + low + close) / 3
//! R1    = 2·pivot − low
//! S1    = 2·pivot − high
//! vol % = (high − low) / low × 100
//! ```

use crate::models::MarketRow;

/// Next-session reference levels derived from one session's range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TechnicalLevels {
    pub pivot: f64,
    pub resistance1: f64,
    pub support1: f64,
    pub volatility_pct: f64,
}

/// Computes pivot levels for `row`.
///
/// Returns `None` when the levels are undefined: `low <= 0`, `high < low`,
/// `close` outside `[low, high]`, or any input is not finite. The caller skips
/// such rows.
pub fn analyze(row: &MarketRow) -> Option<TechnicalLevels> {
    compute_levels(row.high, row.low, row.close)
}

pub fn compute_levels(high: f64, low: f64, close: f64) -> Option<TechnicalLevels> {
    if !(high.is_finite() && low.is_finite() && close.is_finite()) {
        return None;
    }
    if low <= 0.0 || high < low || close < low || close > high {
        return None;
    }

    let pivot = (high + low + close) / 3.0;

    Some(TechnicalLevels {
        pivot,
        resistance1: 2.0 * pivot - low,
        support1: 2.0 * pivot - high,
        volatility_pct: (high - low) / low * 100.0,
    })
}

// ─── Tests ────────────────────────────────────────────────────────────────────
