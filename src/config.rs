//! # config — run configuration from environment variables
//!
//! Every tunable the pipeline uses lives here and is passed down explicitly;
//! no stage reads the environment on its own.

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use chrono::{Datelike, Local, NaiveDate, Weekday};

pub const DEFAULT_REPORT_URL_PATTERN: &str =
    "https://archives.nseindia.com/products/content/sec_bhavdata_full_{date}.csv";
pub const DEFAULT_LIVE_PRICE_BASE_URL: &str = "https://www.nseindia.com";

/// Remote model backends the predictor can call.
#[derive(Debug, Clone, PartialEq)]
pub enum AiProvider {
    /// Anthropic Messages API
    Claude,
    /// OpenAI Chat Completions
    OpenAi,
    /// Text-generation server taking `{inputs, parameters}` (TGI / vLLM style)
    Endpoint,
    /// No model; every row uses the pivot fallback
    Disabled,
}

impl AiProvider {
    pub fn default_model(&self) -> &'static str {
        match self {
            AiProvider::Claude => "claude-3-5-sonnet-20241022",
            AiProvider::OpenAi => "gpt-4o",
            AiProvider::Endpoint => "gpt-oss-20b-vllm",
            AiProvider::Disabled => "",
        }
    }
}

impl std::fmt::Display for AiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AiProvider::Claude => write!(f, "claude"),
            AiProvider::OpenAi => write!(f, "openai"),
            AiProvider::Endpoint => write!(f, "endpoint"),
            AiProvider::Disabled => write!(f, "none"),
        }
    }
}

/// Closing-price window and count used by the selector.
#[derive(Debug, Clone, PartialEq)]
pub struct SelectionConfig {
    pub price_min: f64,
    pub price_max: f64,
    pub top_n: usize,
    /// Keep only this series (e.g. `"EQ"`); `None` keeps every series.
    pub series: Option<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            price_min: 950.0,
            price_max: 1050.0,
            top_n: 5,
            series: Some("EQ".to_string()),
        }
    }
}

#[derive(Debug, Clone)]
pub struct AiConfig {
    pub provider: AiProvider,
    pub api_key: Option<String>,
    pub model: String,
    pub endpoint_url: Option<String>,
    pub timeout: Duration,
    /// Free-text market backdrop appended to every prompt.
    pub market_context: String,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            provider: AiProvider::Disabled,
            api_key: None,
            model: String::new(),
            endpoint_url: None,
            timeout: Duration::from_secs(30),
            market_context: String::new(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Config {
    /// Archive URL with a `{date}` placeholder (DDMMYYYY).
    pub report_url_pattern: String,
    pub report_date: NaiveDate,
    /// Local report file; skips download when set.
    pub report_file: Option<PathBuf>,
    /// Where downloaded reports are cached and looked up.
    pub cache_dir: PathBuf,
    pub selection: SelectionConfig,
    pub ai: AiConfig,
    pub live_price_enabled: bool,
    pub live_price_base_url: String,
    pub output_dir: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            report_url_pattern: DEFAULT_REPORT_URL_PATTERN.to_string(),
            report_date: previous_weekday(Local::now().date_naive()),
            report_file: None,
            cache_dir: PathBuf::from("."),
            selection: SelectionConfig::default(),
            ai: AiConfig::default(),
            live_price_enabled: true,
            live_price_base_url: DEFAULT_LIVE_PRICE_BASE_URL.to_string(),
            output_dir: PathBuf::from("."),
        }
    }
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key → value source.
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let var = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let mut config = Config::default();

        if let Some(pattern) = var("REPORT_URL_PATTERN") {
            if !pattern.contains("{date}") {
                bail!("REPORT_URL_PATTERN must contain a {{date}} placeholder");
            }
            config.report_url_pattern = pattern;
        }
        if let Some(date) = var("REPORT_DATE") {
            config.report_date = NaiveDate::parse_from_str(&date, "%Y-%m-%d")
                .with_context(|| format!("REPORT_DATE must be YYYY-MM-DD, got '{date}'"))?;
        }
        config.report_file = var("REPORT_FILE").map(PathBuf::from);
        if let Some(dir) = var("CACHE_DIR") {
            config.cache_dir = PathBuf::from(dir);
        }
        if let Some(dir) = var("OUTPUT_DIR") {
            config.output_dir = PathBuf::from(dir);
        }

        // ── Selection ─────────────────────────────────────────────────────────
        if let Some(v) = var("PRICE_MIN") {
            config.selection.price_min = v.parse().context("PRICE_MIN must be a number")?;
        }
        if let Some(v) = var("PRICE_MAX") {
            config.selection.price_max = v.parse().context("PRICE_MAX must be a number")?;
        }
        if !config.selection.price_min.is_finite() || !config.selection.price_max.is_finite() {
            bail!("PRICE_MIN and PRICE_MAX must be finite numbers");
        }
        if config.selection.price_min > config.selection.price_max {
            bail!(
                "PRICE_MIN ({}) is greater than PRICE_MAX ({})",
                config.selection.price_min,
                config.selection.price_max
            );
        }
        if let Some(v) = var("TOP_N") {
            config.selection.top_n = v.parse().context("TOP_N must be a non-negative integer")?;
        }
        if let Some(series) = lookup("SERIES") {
            let series = series.trim().to_uppercase();
            config.selection.series = (!series.is_empty()).then_some(series);
        }

        // ── AI ────────────────────────────────────────────────────────────────
        let provider = match var("AI_PROVIDER")
            .unwrap_or_else(|| "none".to_string())
            .to_lowercase()
            .as_str()
        {
            "claude" => AiProvider::Claude,
            "openai" => AiProvider::OpenAi,
            "endpoint" => AiProvider::Endpoint,
            "none" | "off" => AiProvider::Disabled,
            other => bail!("Unknown AI_PROVIDER: '{other}'. Use 'claude', 'openai', 'endpoint' or 'none'"),
        };
        let api_key = var("AI_API_KEY");
        let endpoint_url = var("AI_ENDPOINT_URL");
        match provider {
            AiProvider::Claude | AiProvider::OpenAi if api_key.is_none() => {
                bail!("AI_API_KEY environment variable is required for AI_PROVIDER={provider}")
            }
            AiProvider::Endpoint if endpoint_url.is_none() => {
                bail!("AI_ENDPOINT_URL environment variable is required for AI_PROVIDER=endpoint")
            }
            _ => {}
        }
        let timeout_secs: u64 = var("AI_TIMEOUT_SECS")
            .unwrap_or_else(|| "30".to_string())
            .parse()
            .context("AI_TIMEOUT_SECS must be a number")?;

        config.ai = AiConfig {
            model: var("AI_MODEL").unwrap_or_else(|| provider.default_model().to_string()),
            provider,
            api_key,
            endpoint_url,
            timeout: Duration::from_secs(timeout_secs),
            market_context: var("MARKET_CONTEXT").unwrap_or_default(),
        };

        // ── Live price ────────────────────────────────────────────────────────
        if let Some(v) = var("LIVE_PRICE_ENABLED") {
            config.live_price_enabled = !matches!(v.to_lowercase().as_str(), "0" | "false" | "no" | "off");
        }
        if let Some(url) = var("LIVE_PRICE_BASE_URL") {
            config.live_price_base_url = url.trim_end_matches('/').to_string();
        }

        Ok(config)
    }

    /// Archive URL for the configured report date.
    pub fn report_url(&self) -> String {
        self.report_url_pattern
            .replace("{date}", &self.report_date.format("%d%m%Y").to_string())
    }
}

/// Most recent Monday–Friday strictly before `today`.
/// Exchange holidays are not known here; a missing report fails the download.
pub fn previous_weekday(today: NaiveDate) -> NaiveDate {
    let mut day = today.pred_opt().unwrap_or(today);
    while matches!(day.weekday(), Weekday::Sat | Weekday::Sun) {
        day = day.pred_opt().unwrap_or(day);
    }
    day
}

// ─── Tests ────────────────────────────────────────────────────────────────────
