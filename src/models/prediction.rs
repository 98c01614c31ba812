//! # models::prediction
//!
//! Defines [`Prediction`] — the next-session plan for one symbol, produced
//! either by the remote model or by the pivot-point fallback rule.

use std::fmt;

// ─── Sentiment ────────────────────────────────────────────────────────────────

/// Directional bias attached to a prediction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Sentiment {
    Bullish,
    Bearish,
    /// Only the model may answer Neutral; the fallback always picks a side.
    Neutral,
}

impl Sentiment {
    /// Lenient parse of a model-supplied label. Unknown labels yield `None`.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "bullish" | "bull" | "buy" => Some(Sentiment::Bullish),
            "bearish" | "bear" | "sell" => Some(Sentiment::Bearish),
            "neutral" | "sideways" => Some(Sentiment::Neutral),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Sentiment::Bullish => "Bullish",
            Sentiment::Bearish => "Bearish",
            Sentiment::Neutral => "Neutral",
        }
    }
}

impl fmt::Display for Sentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Source ───────────────────────────────────────────────────────────────────

/// Which branch of the predictor produced the result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PredictionSource {
    Ai,
    PivotFallback,
}

impl PredictionSource {
    pub fn as_str(&self) -> &'static str {
        match self {
            PredictionSource::Ai => "ai",
            PredictionSource::PivotFallback => "pivot-fallback",
        }
    }
}

impl fmt::Display for PredictionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ─── Prediction ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub target_price: f64,
    pub stop_loss: f64,
    pub sentiment: Sentiment,
    /// Model confidence on a 1–10 scale. Never set by the fallback.
    pub confidence: Option<u8>,
    pub reasoning: String,
    pub source: PredictionSource,
}

impl Prediction {
    pub fn is_fallback(&self) -> bool {
        self.source == PredictionSource::PivotFallback
    }
}
