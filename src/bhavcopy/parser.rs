//! # bhavcopy::parser
//!
//! Turns bhavcopy CSV text into [`MarketRow`]s.
//!
//! Both NSE layouts are accepted: the legacy `cm…bhav.csv` (OPEN, HIGH, LOW,
//! CLOSE, PREVCLOSE, TOTTRDQTY) and `sec_bhavdata_full` (OPEN_PRICE,
//! HIGH_PRICE, ..., PREV_CLOSE, TTL_TRD_QNTY). The full layout pads headers
//! and values with spaces, so everything is trimmed.

use tracing::{debug, warn};

use crate::error::{ReportError, RowError};
use crate::models::MarketRow;

// ─── Column Mapping ───────────────────────────────────────────────────────────

const SYMBOL: &[&str] = &["SYMBOL"];
const SERIES: &[&str] = &["SERIES"];
const OPEN: &[&str] = &["OPEN", "OPEN_PRICE"];
const HIGH: &[&str] = &["HIGH", "HIGH_PRICE"];
const LOW: &[&str] = &["LOW", "LOW_PRICE"];
const CLOSE: &[&str] = &["CLOSE", "CLOSE_PRICE"];
const PREV_CLOSE: &[&str] = &["PREVCLOSE", "PREV_CLOSE"];
const VOLUME: &[&str] = &["TOTTRDQTY", "TTL_TRD_QNTY"];

/// Header positions resolved once per report.
#[derive(Debug)]
struct Columns {
    symbol: usize,
    series: Option<usize>,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    prev_close: usize,
    volume: Option<usize>,
}

impl Columns {
    fn resolve(headers: &csv::StringRecord) -> Result<Self, ReportError> {
        let find = |aliases: &[&str]| {
            headers
                .iter()
                .position(|h| aliases.iter().any(|a| h.trim().eq_ignore_ascii_case(a)))
        };
        let require = |aliases: &'static [&'static str]| {
            find(aliases).ok_or(ReportError::MissingColumn(aliases[0]))
        };

        Ok(Self {
            symbol: require(SYMBOL)?,
            series: find(SERIES),
            open: require(OPEN)?,
            high: require(HIGH)?,
            low: require(LOW)?,
            close: require(CLOSE)?,
            prev_close: require(PREV_CLOSE)?,
            volume: find(VOLUME),
        })
    }

    fn row(&self, record: &csv::StringRecord) -> Result<MarketRow, RowError> {
        let symbol = text(record, self.symbol, "SYMBOL")?;
        // A blank cell stays `Some("")` so a series filter still rejects it.
        let series = self
            .series
            .map(|i| record.get(i).unwrap_or("").trim().to_string());
        let volume = match self.volume {
            Some(i) => number(record, i, "VOLUME").ok(),
            None => None,
        };

        Ok(MarketRow {
            symbol,
            series,
            open: number(record, self.open, "OPEN")?,
            high: number(record, self.high, "HIGH")?,
            low: number(record, self.low, "LOW")?,
            close: number(record, self.close, "CLOSE")?,
            previous_close: number(record, self.prev_close, "PREVCLOSE")?,
            volume,
        })
    }
}

fn text(record: &csv::StringRecord, idx: usize, field: &'static str) -> Result<String, RowError> {
    record
        .get(idx)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .ok_or(RowError::MissingField(field))
}

fn number(record: &csv::StringRecord, idx: usize, field: &'static str) -> Result<f64, RowError> {
    let raw = text(record, idx, field)?;
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or(RowError::NotNumeric { field, value: raw })
}

// ─── Parse ────────────────────────────────────────────────────────────────────

/// Rows that parsed cleanly plus a count of the ones that did not.
#[derive(Debug, Default)]
pub struct ParsedReport {
    pub rows: Vec<MarketRow>,
    pub skipped: usize,
}

/// Parses a whole report.
///
/// Blank input yields an empty report. A header missing a required column is
/// an error; individual bad rows are logged and skipped.
pub fn parse_report(text: &str) -> Result<ParsedReport, ReportError> {
    if text.trim().is_empty() {
        debug!("Report is empty");
        return Ok(ParsedReport::default());
    }

    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes());

    let columns = Columns::resolve(reader.headers()?)?;
    let mut report = ParsedReport::default();

    for (idx, record) in reader.records().enumerate() {
        // +2: header is line 1, records are 0-based
        let line = idx + 2;
        let record = match record {
            Ok(r) => r,
            Err(e) => {
                warn!(line, error = %e, "Skipping unreadable report row");
                report.skipped += 1;
                continue;
            }
        };
        match columns.row(&record) {
            Ok(row) => report.rows.push(row),
            Err(e) => {
                warn!(line, error = %e, "Skipping malformed report row");
                report.skipped += 1;
            }
        }
    }

    debug!(rows = report.rows.len(), skipped = report.skipped, "Report parsed");
    Ok(report)
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    const FULL_LAYOUT: &str = "\
SYMBOL, SERIES, DATE1, PREV_CLOSE, OPEN_PRICE, HIGH_PRICE, LOW_PRICE, LAST_PRICE, CLOSE_PRICE, AVG_PRICE, TTL_TRD_QNTY
ABC, EQ, 01-Dec-2025, 990.00, 995.00, 1020.00, 980.00, 1001.00, 1000.00, 999.10, 123456
XYZ, BE, 01-Dec-2025, 205.50, 206.00, 210.00, 200.00, 204.00, 204.25, 205.00, 789
";

    const LEGACY_LAYOUT: &str = "\
SYMBOL,SERIES,OPEN,HIGH,LOW,CLOSE,LAST,PREVCLOSE,TOTTRDQTY
ABC,EQ,995,1020,980,1000,1001,990,123456
";

    #[test]
    fn test_full_layout() {
        let report = parse_report(FULL_LAYOUT).unwrap();
        assert_eq!(report.skipped, 0);
        assert_eq!(report.rows.len(), 2);

        let abc = &report.rows[0];
        assert_eq!(abc.symbol, "ABC");
        assert_eq!(abc.series.as_deref(), Some("EQ"));
        assert_eq!(abc.open, 995.0);
        assert_eq!(abc.high, 1020.0);
        assert_eq!(abc.low, 980.0);
        assert_eq!(abc.close, 1000.0);
        assert_eq!(abc.previous_close, 990.0);
        assert_eq!(abc.volume, Some(123456.0));
    }

    #[test]
    fn test_legacy_layout() {
        let report = parse_report(LEGACY_LAYOUT).unwrap();
        assert_eq!(report.rows.len(), 1);
        assert_eq!(report.rows[0].close, 1000.0);
        assert_eq!(report.rows[0].previous_close, 990.0);
    }

    #[test]
    fn test_empty_report() {
        let report = parse_report("").unwrap();
        assert!(report.rows.is_empty());
        assert_eq!(report.skipped, 0);
        assert!(parse_report("  \n\n").unwrap().rows.is_empty());
    }

    #[test]
    fn test_header_only_report() {
        let report = parse_report("SYMBOL,OPEN,HIGH,LOW,CLOSE,PREVCLOSE\n").unwrap();
        assert!(report.rows.is_empty());
    }

    #[test]
    fn test_bad_rows_are_skipped() {
        let text = "\
SYMBOL,OPEN,HIGH,LOW,CLOSE,PREVCLOSE
GOOD,1,2,1,2,1
NONUM,1,2,abc,2,1
,1,2,1,2,1
SHORT,1,2
DASH,1,2,1,-,1
ALSOGOOD,3,4,3,4,3
";
        let report = parse_report(text).unwrap();
        let symbols: Vec<&str> = report.rows.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["GOOD", "ALSOGOOD"]);
        assert_eq!(report.skipped, 4);
    }

    #[test]
    fn test_blank_series_is_kept_as_empty() {
        let text = "\
SYMBOL,SERIES,OPEN,HIGH,LOW,CLOSE,PREVCLOSE
ABC,,995,1020,980,1000,990
";
        let report = parse_report(text).unwrap();
        assert_eq!(report.rows[0].series.as_deref(), Some(""));

        let no_column = parse_report("SYMBOL,OPEN,HIGH,LOW,CLOSE,PREVCLOSE\nABC,1,2,1,2,1\n").unwrap();
        assert_eq!(no_column.rows[0].series, None);
    }

    #[test]
    fn test_missing_column_is_fatal() {
        let err = parse_report("SYMBOL,OPEN,HIGH,LOW,PREVCLOSE\nA,1,2,1,1\n").unwrap_err();
        assert!(matches!(err, ReportError::MissingColumn("CLOSE")));
    }

    #[test]
    fn test_row_error_reports_field() {
        let headers = csv::StringRecord::from(vec!["SYMBOL", "OPEN", "HIGH", "LOW", "CLOSE", "PREVCLOSE"]);
        let columns = Columns::resolve(&headers).unwrap();
        let record = csv::StringRecord::from(vec!["A", "1", "2", "x", "2", "1"]);
        assert_eq!(
            columns.row(&record).unwrap_err(),
            RowError::NotNumeric { field: "LOW", value: "x".to_string() }
        );
    }
}
