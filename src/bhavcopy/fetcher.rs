//! # bhavcopy::fetcher
//!
//! Obtains the report text for the configured date.
//!
//! ## Sources, in order
//! 1. `REPORT_FILE` — a local file, no network
//! 2. Cache — `<cache_dir>/<archive file name>` from an earlier run
//! 3. Archive download — saved to the cache once it looks like a report

use std::path::{Path, PathBuf};
use std::time::Duration;

use tracing::{info, warn};

use crate::config::Config;
use crate::error::ReportError;

/// NSE rejects requests without a browser-like agent.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0 Safari/537.36";
pub const ACCEPT_LANGUAGE: &str = "en-US,en;q=0.9";

const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Returns the raw report text. Any failure here is fatal to the run.
pub async fn load_report(client: &reqwest::Client, config: &Config) -> Result<String, ReportError> {
    if let Some(path) = &config.report_file {
        info!(path = %path.display(), "Using local report file");
        return read_lossy(path).await;
    }

    let url = config.report_url();
    let cached = cache_path(&config.cache_dir, &url);

    if tokio::fs::try_exists(&cached).await.unwrap_or(false) {
        info!(path = %cached.display(), "Using cached report");
        return read_lossy(&cached).await;
    }

    info!(date = %config.report_date, url = %url, "Downloading bhavcopy...");
    let body = download(client, &url).await?;

    if body.iter().all(u8::is_ascii_whitespace) {
        warn!(url = %url, "Archive returned an empty report; not caching it");
        return Ok(String::new());
    }
    if !looks_like_report(&body) {
        return Err(ReportError::NotAReport { url });
    }

    store_report(&cached, &body).await?;
    info!(path = %cached.display(), bytes = body.len(), "Report downloaded");

    Ok(String::from_utf8_lossy(&body).into_owned())
}

/// True when the first non-blank line is a header naming a SYMBOL column.
/// Error pages served with a 200 fail this.
pub fn looks_like_report(body: &[u8]) -> bool {
    String::from_utf8_lossy(body)
        .lines()
        .map(|l| l.trim_start_matches('\u{feff}').trim())
        .find(|l| !l.is_empty())
        .is_some_and(|header| {
            header
                .split(',')
                .any(|col| col.trim().eq_ignore_ascii_case("SYMBOL"))
        })
}

/// Writes to `<path>.part` and renames into place, so a partial write is
/// never picked up as the cache.
async fn store_report(path: &Path, body: &[u8]) -> Result<(), ReportError> {
    if let Some(dir) = path.parent() {
        tokio::fs::create_dir_all(dir).await?;
    }
    let part = part_path(path);
    tokio::fs::write(&part, body).await?;
    tokio::fs::rename(&part, path).await?;
    Ok(())
}

fn part_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_owned();
    name.push(".part");
    PathBuf::from(name)
}

async fn download(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, ReportError> {
    let resp = client
        .get(url)
        .header(reqwest::header::USER_AGENT, BROWSER_USER_AGENT)
        .header(reqwest::header::ACCEPT_LANGUAGE, ACCEPT_LANGUAGE)
        .timeout(DOWNLOAD_TIMEOUT)
        .send()
        .await?;

    if !resp.status().is_success() {
        return Err(ReportError::Status {
            status: resp.status(),
            url: url.to_string(),
        });
    }

    Ok(resp.bytes().await?.to_vec())
}

/// Cache location: the archive's own file name inside `cache_dir`.
pub fn cache_path(cache_dir: &Path, url: &str) -> PathBuf {
    let name = url
        .rsplit('/')
        .next()
        .and_then(|s| s.split('?').next())
        .filter(|s| !s.is_empty())
        .unwrap_or("bhavcopy.csv");
    cache_dir.join(name)
}

async fn read_lossy(path: &Path) -> Result<String, ReportError> {
    let bytes = tokio::fs::read(path).await?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ─── Tests ────────────────────────────────────────────────────────────────────
