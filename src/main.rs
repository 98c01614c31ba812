//! # bhavscan — daily bhavcopy scanner
//!
//! ## Flow
//! ```text
//! 1. Load the bhavcopy for the report date (local file → cache → download)
//! 2. Parse rows, keep closes inside [PRICE_MIN, PRICE_MAX], take top N
//! 3. Per row: pivot / R1 / S1 → AI prediction (or pivot fallback) → live price
//! 4. Print the summary and save ai_stock_predictions_<timestamp>.csv
//! ```
//!
//! A failed download is the only fatal error; everything after it recovers
//! per row.

use anyhow::Context;
use tracing::{info, warn};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod ai;
mod analyzer;
mod bhavcopy;
mod config;
mod error;
mod live;
mod models;
mod pipeline;
mod predictor;
mod prompt;
mod reporter;
mod selector;

use ai::AiClient;
use config::Config;
use live::{NseQuoteClient, QuoteSource};
use pipeline::Pipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env()
            .add_directive("bhavscan=info".parse()?)
            .add_directive("reqwest=warn".parse()?))
        .init();

    let config = Config::from_env().context("Failed to load config")?;
    let client = reqwest::Client::new();

    info!(
        date     = %config.report_date,
        min      = config.selection.price_min,
        max      = config.selection.price_max,
        top_n    = config.selection.top_n,
        provider = %config.ai.provider,
        model    = %config.ai.model,
        "bhavscan started"
    );

    // anyhow prints the chain once on exit
    let report_text = bhavcopy::load_report(&client, &config)
        .await
        .context("Could not load bhavcopy, aborting")?;

    let model = AiClient::new(client, config.ai.clone());

    let quotes = if config.live_price_enabled {
        match NseQuoteClient::new(&config.live_price_base_url) {
            Ok(q) => Some(q),
            Err(e) => {
                let error = format!("{e:#}");
                warn!(%error, "Live prices disabled");
                None
            }
        }
    } else {
        None
    };

    Pipeline::new(&config, &model, quotes.as_ref().map(|q| q as &dyn QuoteSource))
        .run(&report_text)
        .await?;

    Ok(())
}
