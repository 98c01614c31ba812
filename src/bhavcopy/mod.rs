//! Daily bhavcopy: download/cache and CSV parsing.

pub mod fetcher;
pub mod parser;

pub use fetcher::load_report;
pub use parser::parse_report;
