//! # selector — pick the top-N rows inside a closing-price window

use crate::config::SelectionConfig;
use crate::models::MarketRow;

/// Rows with `close` in `[price_min, price_max]` (and matching series, if
/// configured), highest close first, at most `top_n` of them.
///
/// Ties keep report order. An empty result is a normal outcome.
pub fn select<'a>(rows: &'a [MarketRow], cfg: &SelectionConfig) -> Vec<&'a MarketRow> {
    let mut picked: Vec<&MarketRow> = rows
        .iter()
        .filter(|r| r.close >= cfg.price_min && r.close <= cfg.price_max)
        .filter(|r| match (&cfg.series, &r.series) {
            (None, _) => true,
            // A blank cell never matches.
            (Some(want), Some(have)) => want.eq_ignore_ascii_case(have),
            // Report without a SERIES column: nothing to filter on.
            (Some(_), None) => true,
        })
        .collect();

    picked.sort_by(|a, b| b.close.total_cmp(&a.close));
    picked.truncate(cfg.top_n);
    picked
}

// ─── Tests ────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn make_row(symbol: &str, series: &str, close: f64) -> MarketRow {
        MarketRow {
            symbol: symbol.to_string(),
            series: Some(series.to_string()),
            open: close,
            high: close + 10.0,
            low: close - 10.0,
            close,
            previous_close: close,
            volume: None,
        }
    }

    fn make_config() -> SelectionConfig {
        SelectionConfig {
            price_min: 950.0,
            price_max: 1050.0,
            top_n: 5,
            series: Some("EQ".to_string()),
        }
    }

    #[test]
    fn test_filters_sorts_and_truncates() {
        let rows = vec![
            make_row("A", "EQ", 949.99),
            make_row("B", "EQ", 950.0),
            make_row("C", "EQ", 1000.0),
            make_row("D", "EQ", 1050.0),
            make_row("E", "EQ", 1050.01),
            make_row("F", "EQ", 1010.0),
            make_row("G", "EQ", 990.0),
            make_row("H", "EQ", 970.0),
            make_row("I", "EQ", 960.0),
        ];
        let picked = select(&rows, &make_config());
        let symbols: Vec<&str> = picked.iter().map(|r| r.symbol.as_str()).collect();
        assert_eq!(symbols, vec!["D", "F", "C", "G", "H"]);

        let cfg = make_config();
        assert!(picked.len() <= cfg.top_n);
        assert!(picked.iter().all(|r| r.close >= cfg.price_min && r.close <= cfg.price_max));
        assert!(picked.windows(2).all(|w| w[0].close >= w[1].close));
    }

    #[test]
    fn test_bounds_are_inclusive() {
        let rows = vec![make_row("LO", "EQ", 950.0), make_row("HI", "EQ", 1050.0)];
        assert_eq!(select(&rows, &make_config()).len(), 2);
    }

    #[test]
    fn test_series_filter() {
        let rows = vec![make_row("EQ1", "EQ", 1000.0), make_row("BE1", "BE", 1001.0)];
        let picked = select(&rows, &make_config());
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].symbol, "EQ1");

        let mut any_series = make_config();
        any_series.series = None;
        assert_eq!(select(&rows, &any_series).len(), 2);
    }

    #[test]
    fn test_blank_series_is_filtered_out() {
        let rows = vec![make_row("BLANK", "", 1000.0), make_row("EQ1", "EQ", 990.0)];
        let picked = select(&rows, &make_config());
        assert_eq!(picked.len(), 1);
        assert_eq!(picked[0].symbol, "EQ1");

        let mut any_series = make_config();
        any_series.series = None;
        assert_eq!(select(&rows, &any_series).len(), 2);

        let mut no_column = make_row("NOCOL", "EQ", 1000.0);
        no_column.series = None;
        assert_eq!(select(&[no_column], &make_config()).len(), 1);
    }

    #[test]
    fn test_empty_selection_is_ok() {
        let rows = vec![make_row("X", "EQ", 10.0)];
        assert!(select(&rows, &make_config()).is_empty());
        assert!(select(&[], &make_config()).is_empty());
    }

    #[test]
    fn test_ties_keep_report_order() {
        let rows = vec![make_row("FIRST", "EQ", 1000.0), make_row("SECOND", "EQ", 1000.0)];
        let picked = select(&rows, &make_config());
        assert_eq!(picked[0].symbol, "FIRST");
        assert_eq!(picked[1].symbol, "SECOND");
    }
}
