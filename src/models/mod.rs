//! Domain models shared by every pipeline stage.

pub mod market;
pub mod prediction;

pub use market::{LivePrice, MarketRow};
pub use prediction::{Prediction, PredictionSource, Sentiment};
