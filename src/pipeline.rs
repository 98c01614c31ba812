//! # pipeline — one run, start to finish
//!
//! ```text
//! report text ─▶ parse ─▶ select top-N ─▶ for each row (sequential):
//!                                           analyze ─▶ predict ─▶ live price
//!                                        ─▶ console summary + CSV
//! ```
//!
//! Downloading the report happens before this (see `main`); it is the only
//! step allowed to abort a run. Everything here either recovers per row or
//! fails only on writing the output file.

use std::path::PathBuf;

use chrono::Local;
use tracing::{info, warn};
use uuid::Uuid;

use crate::ai::ModelClient;
use crate::analyzer::analyze;
use crate::bhavcopy::parse_report;
use crate::config::Config;
use crate::live::QuoteSource;
use crate::models::MarketRow;
use crate::predictor::{predict, PredictRequest};
use crate::prompt::stock_context;
use crate::reporter::{self, ReportRow};
use crate::selector::select;

/// Counts reported at the end of a run.
#[derive(Debug, Clone)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub parsed_rows: usize,
    pub skipped_rows: usize,
    pub selected: usize,
    pub rows: Vec<ReportRow>,
    pub output_path: PathBuf,
}

impl RunSummary {
    pub fn ai_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.prediction.is_fallback()).count()
    }

    pub fn fallback_count(&self) -> usize {
        self.rows.iter().filter(|r| r.prediction.is_fallback()).count()
    }
}

pub struct Pipeline<'a> {
    config: &'a Config,
    model: &'a dyn ModelClient,
    /// `None` when live-price comparison is turned off.
    quotes: Option<&'a dyn QuoteSource>,
}

impl<'a> Pipeline<'a> {
    pub fn new(config: &'a Config, model: &'a dyn ModelClient, quotes: Option<&'a dyn QuoteSource>) -> Self {
        Self { config, model, quotes }
    }

    /// Runs every stage after the download and writes the result CSV.
    pub async fn run(&self, report_text: &str) -> anyhow::Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let report = parse_report(report_text)?;

        info!(
            %run_id,
            rows    = report.rows.len(),
            skipped = report.skipped,
            "Report loaded"
        );

        let selected = select(&report.rows, &self.config.selection);
        info!(
            %run_id,
            selected = selected.len(),
            min      = self.config.selection.price_min,
            max      = self.config.selection.price_max,
            top_n    = self.config.selection.top_n,
            "Stocks selected"
        );

        reporter::print_banner("AI-POWERED STOCK ANALYSIS");

        let mut rows = Vec::with_capacity(selected.len());
        for row in &selected {
            if let Some(done) = self.process_row(row).await {
                rows.push(done);
            }
        }

        reporter::print_banner("SUMMARY - NEXT SESSION PREDICTIONS (AI + PIVOTS)");
        print!("{}", reporter::summary_table(&rows));

        let output_path = reporter::write_csv(&self.config.output_dir, &rows, Local::now())?;
        println!("\n✅ Results saved to: {}", output_path.display());

        let summary = RunSummary {
            run_id,
            parsed_rows: report.rows.len(),
            skipped_rows: report.skipped,
            selected: selected.len(),
            rows,
            output_path,
        };

        info!(
            %run_id,
            parsed    = summary.parsed_rows,
            skipped   = summary.skipped_rows,
            selected  = summary.selected,
            processed = summary.rows.len(),
            ai        = summary.ai_count(),
            fallback  = summary.fallback_count(),
            output    = %summary.output_path.display(),
            "Run complete"
        );

        Ok(summary)
    }

    /// One row through analyze → predict → live price. `None` when the
    /// row's levels are undefined.
    async fn process_row(&self, row: &MarketRow) -> Option<ReportRow> {
        let Some(levels) = analyze(row) else {
            warn!(
                symbol = %row.symbol,
                high   = row.high,
                low    = row.low,
                "Skipping row: pivot levels undefined"
            );
            return None;
        };

        let context = stock_context(row, &levels, self.config.report_date);

        let prediction = predict(
            self.model,
            self.config.ai.timeout,
            PredictRequest {
                symbol: &row.symbol,
                levels: &levels,
                previous_close: row.previous_close,
                context: &context,
                market_context: &self.config.ai.market_context,
            },
        )
        .await;

        let live = match self.quotes {
            Some(quotes) => match quotes.live_price(&row.symbol).await {
                Ok(live) => Some(live),
                Err(e) => {
                    let error = format!("{e:#}");
                    warn!(symbol = %row.symbol, %error, "Could not fetch live price");
                    None
                }
            },
            None => None,
        };

        let done = ReportRow::new(row, levels, prediction, live);
        reporter::print_row(&context, &done);
        Some(done)
    }
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{LivePrice, PredictionSource, Sentiment};
    use async_trait::async_trait;
    use chrono::Utc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct CannedModel {
        answer: &'static str,
        calls: AtomicUsize,
    }

    impl CannedModel {
        fn new(answer: &'static str) -> Self {
            Self { answer, calls: AtomicUsize::new(0) }
        }
    }

    #[async_trait]
    impl ModelClient for CannedModel {
        async fn complete(&self, _prompt: &str) -> anyhow::Result<String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.answer.to_string())
        }
    }

    /// Fixed quote for every symbol except `DOWN`, which always fails.
    struct FakeQuotes;

    #[async_trait]
    impl QuoteSource for FakeQuotes {
        async fn live_price(&self, symbol: &str) -> anyhow::Result<LivePrice> {
            if symbol == "DOWN" {
                anyhow::bail!("quote service unavailable");
            }
            Ok(LivePrice { symbol: symbol.to_string(), current_price: 1001.0, fetched_at: Utc::now() })
        }
    }

    fn make_config() -> Config {
        Config {
            output_dir: std::env::temp_dir().join(format!("bhavscan-pipeline-{}", Uuid::new_v4())),
            ..Config::default()
        }
    }

    const REPORT: &str = "\
SYMBOL, SERIES, PREV_CLOSE, OPEN_PRICE, HIGH_PRICE, LOW_PRICE, CLOSE_PRICE, TTL_TRD_QNTY
ABC, EQ, 1010.00, 995.00, 1020.00, 980.00, 1000.00, 5000
DOWN, EQ, 990.00, 1000.00, 1030.00, 1000.00, 1020.00, 100
CHEAP, EQ, 100.00, 100.00, 101.00, 99.00, 100.00, 10
ZERO, EQ, 900.00, 990.00, 1040.00, 0.00, 1040.00, 10
BROKEN, EQ, x, 1.00, 1.00, 1.00, 1.00, 1
";

    #[tokio::test]
    async fn test_empty_report_writes_header_only_file() {
        let config = make_config();
        let model = CannedModel::new("{}");
        let summary = Pipeline::new(&config, &model, Some(&FakeQuotes)).run("").await.unwrap();

        assert_eq!(summary.selected, 0);
        assert!(summary.rows.is_empty());
        let text = std::fs::read_to_string(&summary.output_path).unwrap();
        assert_eq!(text.lines().count(), 1);
        assert!(text.starts_with("Symbol,Close,Target,StopLoss,Sentiment,Reasoning,Source"));
        assert_eq!(model.calls.load(Ordering::SeqCst), 0);

        std::fs::remove_dir_all(&config.output_dir).ok();
    }

    #[tokio::test]
    async fn test_malformed_ai_response_falls_back_per_row() {
        let config = make_config();
        let model = CannedModel::new("Honestly, nobody knows.");
        let summary = Pipeline::new(&config, &model, Some(&FakeQuotes)).run(REPORT).await.unwrap();

        assert_eq!(summary.parsed_rows, 4);
        assert_eq!(summary.skipped_rows, 1);
        // ZERO is selected but has undefined levels
        assert_eq!(summary.selected, 3);
        let symbols: Vec<&str> = summary.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["DOWN", "ABC"]);

        assert_eq!(summary.fallback_count(), 2);
        assert_eq!(model.calls.load(Ordering::SeqCst), 2);

        // ABC: prev close 1010 > pivot 1000 → Bullish, target R1
        let abc = &summary.rows[1];
        assert_eq!(abc.prediction.source, PredictionSource::PivotFallback);
        assert_eq!(abc.prediction.sentiment, Sentiment::Bullish);
        assert!((abc.prediction.target_price - 1020.0).abs() < 1e-9);
        assert!(abc.live.is_some());

        // DOWN: quote failure is recovered
        assert!(summary.rows[0].live.is_none());

        let text = std::fs::read_to_string(&summary.output_path).unwrap();
        assert_eq!(text.lines().count(), 3);

        std::fs::remove_dir_all(&config.output_dir).ok();
    }

    #[tokio::test]
    async fn test_valid_ai_response_is_used() {
        let config = make_config();
        let model = CannedModel::new(r#"{"sentiment":"Bearish","predicted_price":995.0,"confidence":8,"reason":"fading"}"#);
        let summary = Pipeline::new(&config, &model, None).run(REPORT).await.unwrap();

        assert_eq!(summary.ai_count(), 2);
        assert!(summary.rows.iter().all(|r| r.live.is_none()));
        let abc = &summary.rows[1];
        assert_eq!(abc.prediction.target_price, 995.0);
        assert_eq!(abc.prediction.confidence, Some(8));

        std::fs::remove_dir_all(&config.output_dir).ok();
    }

    #[tokio::test]
    async fn test_missing_column_aborts() {
        let config = make_config();
        let model = CannedModel::new("{}");
        let result = Pipeline::new(&config, &model, None)
            .run("SYMBOL,OPEN\nA,1\n")
            .await;
        assert!(result.is_err());
    }
}
