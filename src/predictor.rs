//! # predictor — AI prediction with a pivot-point fallback
//!
//! ```text
//! AttemptAi ──ok + valid JSON──▶ Prediction { source: Ai }
//!     │
//!     └─ disabled / error / timeout / malformed ──▶ pivot_fallback()
//! ```
//!
//! The fallback is pure arithmetic and cannot fail, so [`predict`] always
//! returns a [`Prediction`].

use serde::Deserialize;
use tracing::{info, warn};

use crate::ai::ModelClient;
use crate::analyzer::TechnicalLevels;
use crate::error::PredictError;
use crate::models::{Prediction, PredictionSource, Sentiment};
use crate::prompt::build_prompt;

pub const FALLBACK_REASONING: &str =
    "Pivot point levels: (H+L+C)/3 with R1/S1; direction from previous close vs pivot";

/// Inputs for one symbol.
#[derive(Debug, Clone, Copy)]
pub struct PredictRequest<'a> {
    pub symbol: &'a str,
    pub levels: &'a TechnicalLevels,
    pub previous_close: f64,
    /// Technical summary from [`crate::prompt::stock_context`].
    pub context: &'a str,
    /// Free-text market backdrop.
    pub market_context: &'a str,
}

/// Asks the model, falling back to the pivot rule on any failure.
pub async fn predict(
    client: &dyn ModelClient,
    timeout: std::time::Duration,
    req: PredictRequest<'_>,
) -> Prediction {
    match attempt_ai(client, timeout, &req).await {
        Ok(prediction) => {
            info!(
                symbol     = req.symbol,
                sentiment  = %prediction.sentiment,
                target     = prediction.target_price,
                confidence = ?prediction.confidence,
                "🤖 AI prediction received"
            );
            prediction
        }
        Err(PredictError::Disabled) => pivot_fallback(req.levels, req.previous_close),
        Err(e) => {
            warn!(symbol = req.symbol, error = %e, "⚠️ AI unavailable, using pivot fallback");
            pivot_fallback(req.levels, req.previous_close)
        }
    }
}

async fn attempt_ai(
    client: &dyn ModelClient,
    timeout: std::time::Duration,
    req: &PredictRequest<'_>,
) -> Result<Prediction, PredictError> {
    if !client.is_enabled() {
        return Err(PredictError::Disabled);
    }

    let prompt = build_prompt(req.symbol, req.context, req.market_context);
    let text = tokio::time::timeout(timeout, client.complete(&prompt))
        .await
        .map_err(|_| PredictError::Timeout(timeout))??;

    parse_ai_response(&text, req.levels)
}

// ─── Fallback ─────────────────────────────────────────────────────────────────

/// Deterministic prediction from pivot levels alone.
///
/// Bullish when `previous_close` is above the pivot: target R1, stop S1.
/// Otherwise Bearish: target S1, stop R1.
pub fn pivot_fallback(levels: &TechnicalLevels, previous_close: f64) -> Prediction {
    let (sentiment, target_price, stop_loss) = if previous_close > levels.pivot {
        (Sentiment::Bullish, levels.resistance1, levels.support1)
    } else {
        (Sentiment::Bearish, levels.support1, levels.resistance1)
    };

    Prediction {
        target_price,
        stop_loss,
        sentiment,
        confidence: None,
        reasoning: FALLBACK_REASONING.to_string(),
        source: PredictionSource::PivotFallback,
    }
}

// ─── Response Parsing ─────────────────────────────────────────────────────────

/// Shape the prompt asks for. Aliases cover the usual model paraphrases.
#[derive(Debug, Deserialize)]
struct AiPredictionJson {
    sentiment: String,
    #[serde(alias = "target_price", alias = "target")]
    predicted_price: f64,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default, alias = "reasoning")]
    reason: String,
}

/// Reads the model's answer into a [`Prediction`].
///
/// Tolerates markdown fences and prose around the JSON object. The stop loss
/// is the pivot level opposite the model's direction.
pub fn parse_ai_response(text: &str, levels: &TechnicalLevels) -> Result<Prediction, PredictError> {
    let json = extract_json(text)
        .ok_or_else(|| PredictError::Malformed(format!("no JSON object in: {}", preview(text))))?;

    let parsed: AiPredictionJson = serde_json::from_str(json)
        .map_err(|e| PredictError::Malformed(format!("{e}: {}", preview(json))))?;

    let sentiment = Sentiment::parse(&parsed.sentiment)
        .ok_or_else(|| PredictError::Malformed(format!("unknown sentiment '{}'", parsed.sentiment)))?;

    if !parsed.predicted_price.is_finite() || parsed.predicted_price <= 0.0 {
        return Err(PredictError::Malformed(format!(
            "predicted_price out of range: {}",
            parsed.predicted_price
        )));
    }

    let stop_loss = match sentiment {
        Sentiment::Bearish => levels.resistance1,
        Sentiment::Bullish | Sentiment::Neutral => levels.support1,
    };

    let reasoning = match parsed.reason.trim() {
        "" => "Based on technical analysis".to_string(),
        r => r.to_string(),
    };

    Ok(Prediction {
        target_price: parsed.predicted_price,
        stop_loss,
        sentiment,
        confidence: parsed
            .confidence
            .filter(|c| c.is_finite())
            .map(|c| c.round().clamp(1.0, 10.0) as u8),
        reasoning,
        source: PredictionSource::Ai,
    })
}

/// Outermost `{ ... }` span, after stripping code fences.
fn extract_json(text: &str) -> Option<&str> {
    let text = strip_markdown(text);
    let start = text.find('{')?;
    let end = text.rfind('}')?;
    (end > start).then(|| &text[start..=end])
}

/// Removes ```json ... ``` or ``` ... ``` wrappers.
fn strip_markdown(text: &str) -> &str {
    let text = text.trim();
    let inner = text
        .strip_prefix("```json")
        .or_else(|| text.strip_prefix("```"))
        .unwrap_or(text);
    inner.trim_end_matches("```").trim()
}

fn preview(text: &str) -> String {
    text.chars().take(120).collect()
}

// ─── Tests ────────────────────────────────────────────────────────────────────
