//! # reporter — console summary and the result CSV

use std::path::{Path, PathBuf};

use anyhow::Context;
use chrono::{DateTime, Local};

use crate::analyzer::TechnicalLevels;
use crate::models::{LivePrice, MarketRow, Prediction};

/// Output columns. The first seven are the stable contract; later ones are
/// optional extras left empty when unknown.
pub const CSV_HEADERS: [&str; 9] = [
    "Symbol", "Close", "Target", "StopLoss", "Sentiment", "Reasoning", "Source", "LivePrice", "Confidence",
];

/// One output line: a selected row and what the pipeline concluded about it.
#[derive(Debug, Clone)]
pub struct ReportRow {
    pub symbol: String,
    pub close: f64,
    pub levels: TechnicalLevels,
    pub prediction: Prediction,
    pub live: Option<LivePrice>,
}

impl ReportRow {
    pub fn new(row: &MarketRow, levels: TechnicalLevels, prediction: Prediction, live: Option<LivePrice>) -> Self {
        Self {
            symbol: row.symbol.clone(),
            close: row.close,
            levels,
            prediction,
            live,
        }
    }

    fn record(&self) -> [String; 9] {
        [
            self.symbol.clone(),
            format!("{:.2}", self.close),
            format!("{:.2}", self.prediction.target_price),
            format!("{:.2}", self.prediction.stop_loss),
            self.prediction.sentiment.to_string(),
            self.prediction.reasoning.clone(),
            self.prediction.source.to_string(),
            self.live
                .as_ref()
                .map(|l| format!("{:.2}", l.current_price))
                .unwrap_or_default(),
            self.prediction
                .confidence
                .map(|c| c.to_string())
                .unwrap_or_default(),
        ]
    }
}

/// `ai_stock_predictions_YYYYMMDD_HHMMSS.csv`
pub fn output_file_name(at: DateTime<Local>) -> String {
    format!("ai_stock_predictions_{}.csv", at.format("%Y%m%d_%H%M%S"))
}

/// Writes all rows under `dir`. The header is written even for zero rows.
pub fn write_csv(dir: &Path, rows: &[ReportRow], at: DateTime<Local>) -> anyhow::Result<PathBuf> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create output dir {}", dir.display()))?;
    let path = dir.join(output_file_name(at));

    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(&path)
        .with_context(|| format!("Failed to create {}", path.display()))?;

    writer.write_record(CSV_HEADERS)?;
    for row in rows {
        writer.write_record(row.record())?;
    }
    writer.flush()?;

    Ok(path)
}

// ─── Console ──────────────────────────────────────────────────────────────────

const RULE: &str = "================================================================================";

pub fn print_banner(title: &str) {
    println!("\n{RULE}\n{title}\n{RULE}");
}

/// Per-symbol block printed as each row finishes.
pub fn print_row(context: &str, row: &ReportRow) {
    let p = &row.prediction;

    println!("\n{RULE}\nAnalyzing: {}\n{RULE}", row.symbol);
    println!("{context}");

    if p.is_fallback() {
        println!("\n⚠️ Using Technical Pivot Points:");
        println!("   Sentiment: {}", p.sentiment);
        println!("   Target Price: ₹{:.2}", p.target_price);
        println!("   Stop Loss: ₹{:.2}", p.stop_loss);
    } else {
        let confidence = p
            .confidence
            .map(|c| format!(" (Confidence: {c}/10)"))
            .unwrap_or_default();
        println!("\n✨ AI Analysis:");
        println!("   Sentiment: {}{confidence}", p.sentiment);
        println!("   Predicted Target: ₹{:.2}", p.target_price);
        println!("   Stop Loss: ₹{:.2}", p.stop_loss);
        println!("   Reasoning: {}", p.reasoning);
    }

    match &row.live {
        Some(live) => {
            let (change, pct) = live.change_from(row.close);
            println!("\n📊 Live price:");
            println!("   Report Close: ₹{:.2}", row.close);
            println!("   Live Price: ₹{:.2}", live.current_price);
            println!("   Change: ₹{change:.2} ({pct:+.2}%)");
        }
        None => println!("\n📊 Live price unavailable"),
    }
}

/// Final table of every processed row.
pub fn summary_table(rows: &[ReportRow]) -> String {
    let mut out = format!(
        "{:<14} {:>10} {:>10} {:>10} {:>10} {:>10} {:<9} {:<15}\n",
        "Symbol", "Close", "Live", "Pivot", "Target", "StopLoss", "Sentiment", "Source"
    );
    for row in rows {
        let live = row
            .live
            .as_ref()
            .map(|l| format!("{:.2}", l.current_price))
            .unwrap_or_else(|| "-".to_string());
        out.push_str(&format!(
            "{:<14} {:>10.2} {:>10} {:>10.2} {:>10.2} {:>10.2} {:<9} {:<15}\n",
            row.symbol,
            row.close,
            live,
            row.levels.pivot,
            row.prediction.target_price,
            row.prediction.stop_loss,
            row.prediction.sentiment.as_str(),
            row.prediction.source.as_str(),
        ));
    }
    out
}

// ─── Tests ────────────────────────────────────────────────────────────────────
