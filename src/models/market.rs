//! # models::market
//!
//! Defines [`MarketRow`], one instrument's end-of-day record from the daily
//! bhavcopy, and [`LivePrice`], the intraday quote fetched for comparison.

use chrono::{DateTime, Utc};

/// A single traded instrument for one session, as published in the bhavcopy.
///
/// Rows are immutable once parsed; every later stage borrows them.
#[derive(Debug, Clone, PartialEq)]
pub struct MarketRow {
    /// Exchange ticker, e.g. `"SBIN"`.
    pub symbol: String,

    /// Trading series (`"EQ"`, `"BE"`, ...). Absent in reports without a
    /// SERIES column.
    pub series: Option<String>,

    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,

    /// Close of the session before the one this row describes.
    pub previous_close: f64,

    /// Total traded quantity, when the report carries it.
    pub volume: Option<f64>,
}

impl MarketRow {
    /// Session change versus `previous_close`, in percent.
    /// `None` when the previous close is not a usable divisor.
    pub fn change_pct(&self) -> Option<f64> {
        (self.previous_close > 0.0)
            .then(|| (self.close - self.previous_close) / self.previous_close * 100.0)
    }
}

/// Current traded price of a symbol, fetched once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct LivePrice {
    pub symbol: String,
    pub current_price: f64,
    pub fetched_at: DateTime<Utc>,
}

impl LivePrice {
    /// Absolute and percentage move from `reference` to the live price.
    pub fn change_from(&self, reference: f64) -> (f64, f64) {
        let change = self.current_price - reference;
        let pct = if reference != 0.0 { change / reference * 100.0 } else { 0.0 };
        (change, pct)
    }
}
