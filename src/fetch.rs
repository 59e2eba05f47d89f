//! Description fetching.
//!
//! Full video descriptions come from `yt-dlp`, one bounded call per video.
//! A failed or empty fetch is never fatal: callers fall back to the summary
//! already in the index.

use anyhow::Result;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::FetchConfig;
use crate::process::run_tool;

/// Timeout for the `--version` availability check.
const VERSION_TIMEOUT: Duration = Duration::from_secs(5);

#[async_trait]
pub trait DescriptionFetcher: Send + Sync {
    /// Description for the video at `url`; `None` when the tool has nothing.
    async fn fetch_description(&self, url: &str) -> Result<Option<String>>;
}

pub struct YtDlpFetcher {
    program: String,
    timeout: Duration,
}

impl YtDlpFetcher {
    pub fn new(config: &FetchConfig) -> Self {
        Self {
            program: config.program.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    /// Version string reported by the tool, or an error if it cannot run.
    pub async fn check_available(&self) -> Result<String> {
        let version = run_tool(&self.program, &["--version".to_string()], VERSION_TIMEOUT).await?;
        Ok(version)
    }
}

#[async_trait]
impl DescriptionFetcher for YtDlpFetcher {
    async fn fetch_description(&self, url: &str) -> Result<Option<String>> {
        let args: Vec<String> = ["--skip-download", "--no-warnings", "--print", "description", url]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let out = run_tool(&self.program, &args, self.timeout).await?;
        Ok(if out.is_empty() { None } else { Some(out) })
    }
}

/// Fetcher answering from a fixed table, keyed by URL.
///
/// URLs not in the table yield `None`; URLs registered with
/// [`CannedFetcher::failing`] yield an error.
#[derive(Debug, Default)]
pub struct CannedFetcher {
    answers: HashMap<String, Option<String>>,
    calls: Mutex<Vec<String>>,
}

impl CannedFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, url: &str, description: &str) -> Self {
        self.answers.insert(url.to_string(), Some(description.to_string()));
        self
    }

    pub fn failing(mut self, url: &str) -> Self {
        self.answers.insert(url.to_string(), None);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

#[async_trait]
impl DescriptionFetcher for CannedFetcher {
    async fn fetch_description(&self, url: &str) -> Result<Option<String>> {
        self.calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(url.to_string());
        match self.answers.get(url) {
            Some(Some(text)) => Ok(Some(text.clone())),
            Some(None) => anyhow::bail!("fetch failed for {}", url),
            None => Ok(None),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn canned_answers() {
        let fetcher = CannedFetcher::new()
            .with("https://a", "Long text")
            .failing("https://b");
        assert_eq!(
            fetcher.fetch_description("https://a").await.unwrap().as_deref(),
            Some("Long text")
        );
        assert!(fetcher.fetch_description("https://b").await.is_err());
        assert_eq!(fetcher.fetch_description("https://c").await.unwrap(), None);
        assert_eq!(fetcher.calls(), vec!["https://a", "https://b", "https://c"]);
    }

    #[tokio::test]
    async fn missing_program_is_unavailable() {
        let fetcher = YtDlpFetcher::new(&FetchConfig {
            program: "tubeflow-no-such-yt-dlp".into(),
            timeout_secs: 1,
        });
        assert!(fetcher.check_available().await.is_err());
        assert!(fetcher.fetch_description("https://x").await.is_err());
    }
}
