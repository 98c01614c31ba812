//! # prompt — build the model prompt for one symbol
//!
//! The model must answer with a JSON object that
//! [`predictor::parse_ai_response`](crate::predictor::parse_ai_response)
//! can read directly.

use chrono::NaiveDate;

use crate::{analyzer::TechnicalLevels, models::MarketRow};

/// Human-readable technical summary for one row. Also printed to the console.
pub fn stock_context(row: &MarketRow, levels: &TechnicalLevels, session: NaiveDate) -> String {
    let volume = row
        .volume
        .map(|v| format!("{v:.0}"))
        .unwrap_or_else(|| "N/A".to_string());
    let change = row
        .change_pct()
        .map(|p| format!("{:+.2} ({p:+.2}%)", row.close - row.previous_close))
        .unwrap_or_else(|| "N/A".to_string());

    format!(
        "Stock: {symbol}
Session: {session}
--------------------------------
OHLC Data:
Open: {open:.2}
High: {high:.2}
Low: {low:.2}
Close: {close:.2}
Previous Close: {prev:.2}
Change: {change}
Volume: {volume}
--------------------------------
Technical Analysis (Pivot Points for next session):
Pivot Point: {pivot:.2}
Resistance (R1): {r1:.2}
Support (S1): {s1:.2}
Volatility: {vol:.2}%
--------------------------------",
        symbol = row.symbol,
        open = row.open,
        high = row.high,
        low = row.low,
        close = row.close,
        prev = row.previous_close,
        pivot = levels.pivot,
        r1 = levels.resistance1,
        s1 = levels.support1,
        vol = levels.volatility_pct,
    )
}

/// Full prompt: technical context, optional market backdrop, JSON contract.
pub fn build_prompt(symbol: &str, context: &str, market_context: &str) -> String {
    let backdrop = if market_context.trim().is_empty() {
        String::new()
    } else {
        format!("\n## Market Backdrop\n{}\n", market_context.trim())
    };

    format!(r#"You are a stock market expert analyzing {symbol} on the NSE.
Based on the technical data below, predict the closing price for the next session.

{context}
{backdrop}
## Your Task
1. Analyze the trend (Bullish/Bearish).
2. Predict the next session's closing price.
3. Give a confidence score (1-10).

**CRITICAL**: Respond with ONLY a valid JSON object. No markdown, no code fences.

## Required JSON Format
{{
  "sentiment": "Bullish" | "Bearish",
  "predicted_price": <number>,
  "confidence": <number 1-10>,
  "reason": "<short explanation max 120 chars>"
}}

Respond with JSON only:"#)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyzer::analyze;

    fn make_row() -> MarketRow {
        MarketRow {
            symbol: "ABC".to_string(),
            series: Some("EQ".to_string()),
            open: 995.0,
            high: 1020.0,
            low: 980.0,
            close: 1000.0,
            previous_close: 990.0,
            volume: Some(1234.0),
        }
    }

    #[test]
    fn test_context_carries_levels() {
        let row = make_row();
        let levels = analyze(&row).unwrap();
        let ctx = stock_context(&row, &levels, NaiveDate::from_ymd_opt(2025, 12, 1).unwrap());
        assert!(ctx.contains("Stock: ABC"));
        assert!(ctx.contains("Session: 2025-12-01"));
        assert!(ctx.contains("Pivot Point: 1000.00"));
        assert!(ctx.contains("Resistance (R1): 1020.00"));
        assert!(ctx.contains("Support (S1): 980.00"));
        assert!(ctx.contains("Change: +10.00 (+1.01%)"));
        assert!(ctx.contains("Volume: 1234"));
    }

    #[test]
    fn test_prompt_demands_json() {
        let prompt = build_prompt("ABC", "ctx", "");
        assert!(prompt.contains("\"predicted_price\""));
        assert!(prompt.contains("\"sentiment\""));
        assert!(prompt.contains("\"confidence\""));
        assert!(!prompt.contains("Market Backdrop"));
    }

    #[test]
    fn test_prompt_includes_backdrop() {
        let prompt = build_prompt("ABC", "ctx", "  RBI held rates today.  ");
        assert!(prompt.contains("## Market Backdrop\nRBI held rates today.\n"));
    }
}
