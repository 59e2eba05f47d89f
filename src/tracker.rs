//! Issue tracker capability.
//!
//! The reconciler and the roadmap command talk to GitHub Issues through the
//! [`IssueTracker`] trait. [`GhTracker`] drives the `gh` CLI;
//! [`MemoryTracker`] is a deterministic in-memory stand-in that records
//! every call, used by tests.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Mutex;
use std::time::Duration;

use crate::config::TrackerConfig;
use crate::process::{run_tool, ToolError};

/// An issue as returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Issue {
    pub number: u64,
    pub title: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IssueState {
    Open,
    Closed,
    All,
}

impl IssueState {
    pub fn as_str(&self) -> &'static str {
        match self {
            IssueState::Open => "open",
            IssueState::Closed => "closed",
            IssueState::All => "all",
        }
    }
}

/// The operations consumed from an issue tracker.
///
/// Every call is best-effort from the caller's point of view: errors are
/// recorded against the record being processed and never abort a batch.
#[async_trait]
pub trait IssueTracker: Send + Sync {
    /// Names of every label defined on the repository.
    async fn list_labels(&self) -> Result<Vec<String>>;

    async fn create_label(&self, name: &str, color: &str, description: &str) -> Result<()>;

    /// Issues whose title contains `title_substring`, in tracker order.
    async fn search_issues(
        &self,
        title_substring: &str,
        state: IssueState,
        limit: usize,
    ) -> Result<Vec<Issue>>;

    /// Create an issue and return its number.
    async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Result<u64>;

    async fn close_issue(&self, number: u64, comment: &str) -> Result<()>;
}

// ═══════════════════════════════════════════════════════════════════════
// gh CLI
// ═══════════════════════════════════════════════════════════════════════

/// [`IssueTracker`] backed by the GitHub CLI.
pub struct GhTracker {
    program: String,
    repo: String,
    timeout: Duration,
}

#[derive(Deserialize)]
struct LabelRow {
    name: String,
}

impl GhTracker {
    pub fn new(config: &TrackerConfig, repo: impl Into<String>) -> Self {
        Self {
            program: config.program.clone(),
            repo: repo.into(),
            timeout: Duration::from_secs(config.timeout_secs),
        }
    }

    async fn gh(&self, args: Vec<String>) -> Result<String, ToolError> {
        run_tool(&self.program, &args, self.timeout).await
    }

    fn parse<T: for<'de> Deserialize<'de>>(&self, stdout: &str) -> Result<T, ToolError> {
        serde_json::from_str(stdout).map_err(|e| ToolError::Parse {
            program: self.program.clone(),
            detail: e.to_string(),
        })
    }
}

fn args(parts: &[&str]) -> Vec<String> {
    parts.iter().map(|s| s.to_string()).collect()
}

/// Issue number from the URL `gh issue create` prints.
fn issue_number_from_url(url: &str) -> Option<u64> {
    url.trim().trim_end_matches('/').rsplit('/').next()?.parse().ok()
}

#[async_trait]
impl IssueTracker for GhTracker {
    async fn list_labels(&self) -> Result<Vec<String>> {
        let out = self
            .gh(args(&[
                "label", "list", "--repo", &self.repo, "--json", "name", "--limit", "500",
            ]))
            .await?;
        let rows: Vec<LabelRow> = self.parse(&out)?;
        Ok(rows.into_iter().map(|r| r.name).collect())
    }

    async fn create_label(&self, name: &str, color: &str, description: &str) -> Result<()> {
        let mut a = args(&["label", "create", name, "--repo", &self.repo, "--color", color]);
        if !description.is_empty() {
            a.extend(args(&["--description", description]));
        }
        self.gh(a)
            .await
            .with_context(|| format!("creating label '{}'", name))?;
        Ok(())
    }

    async fn search_issues(
        &self,
        title_substring: &str,
        state: IssueState,
        limit: usize,
    ) -> Result<Vec<Issue>> {
        let search = format!("\"{}\" in:title", title_substring);
        let limit = limit.to_string();
        let out = self
            .gh(args(&[
                "issue",
                "list",
                "--repo",
                &self.repo,
                "--search",
                &search,
                "--json",
                "number,title",
                "--state",
                state.as_str(),
                "--limit",
                &limit,
            ]))
            .await?;
        Ok(self.parse(&out)?)
    }

    async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Result<u64> {
        let mut a = args(&[
            "issue", "create", "--repo", &self.repo, "--title", title, "--body", body,
        ]);
        for label in labels {
            a.push("--label".to_string());
            a.push(label.clone());
        }
        let out = self.gh(a).await?;
        let number = issue_number_from_url(&out).ok_or_else(|| ToolError::Parse {
            program: self.program.clone(),
            detail: format!("no issue number in '{}'", out),
        })?;
        Ok(number)
    }

    async fn close_issue(&self, number: u64, comment: &str) -> Result<()> {
        let number = number.to_string();
        self.gh(args(&[
            "issue", "close", &number, "--repo", &self.repo, "--comment", comment,
        ]))
        .await?;
        Ok(())
    }
}

// ═══════════════════════════════════════════════════════════════════════
// In-memory tracker
// ═══════════════════════════════════════════════════════════════════════

/// An issue held by [`MemoryTracker`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemoryIssue {
    pub number: u64,
    pub title: String,
    pub body: String,
    pub labels: Vec<String>,
    pub open: bool,
    pub close_comment: Option<String>,
}

#[derive(Debug, Default)]
struct MemoryState {
    labels: Vec<String>,
    issues: Vec<MemoryIssue>,
    calls: Vec<String>,
    fail_search: bool,
    fail_close: bool,
}

/// Deterministic tracker kept in memory.
///
/// Searches ignore the query text and return every issue in the requested
/// state, in creation order, so callers' own matching rules decide.
#[derive(Debug, Default)]
pub struct MemoryTracker {
    state: Mutex<MemoryState>,
}

impl MemoryTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed an open issue, numbered in insertion order from 1.
    pub fn with_open_issue(self, title: &str) -> Self {
        {
            let mut s = self.lock();
            let number = s.issues.len() as u64 + 1;
            s.issues.push(MemoryIssue {
                number,
                title: title.to_string(),
                body: String::new(),
                labels: Vec::new(),
                open: true,
                close_comment: None,
            });
        }
        self
    }

    pub fn with_label(self, name: &str) -> Self {
        self.lock().labels.push(name.to_string());
        self
    }

    /// Make every search fail, as a tracker outage would.
    pub fn failing_search(self) -> Self {
        self.lock().fail_search = true;
        self
    }

    pub fn failing_close(self) -> Self {
        self.lock().fail_close = true;
        self
    }

    pub fn issues(&self) -> Vec<MemoryIssue> {
        self.lock().issues.clone()
    }

    pub fn labels(&self) -> Vec<String> {
        self.lock().labels.clone()
    }

    /// Calls received, as `operation:argument` strings.
    pub fn calls(&self) -> Vec<String> {
        self.lock().calls.clone()
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, MemoryState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[async_trait]
impl IssueTracker for MemoryTracker {
    async fn list_labels(&self) -> Result<Vec<String>> {
        let mut s = self.lock();
        s.calls.push("list_labels".to_string());
        Ok(s.labels.clone())
    }

    async fn create_label(&self, name: &str, _color: &str, _description: &str) -> Result<()> {
        let mut s = self.lock();
        s.calls.push(format!("create_label:{}", name));
        if !s.labels.iter().any(|l| l == name) {
            s.labels.push(name.to_string());
        }
        Ok(())
    }

    async fn search_issues(
        &self,
        title_substring: &str,
        state: IssueState,
        limit: usize,
    ) -> Result<Vec<Issue>> {
        let mut s = self.lock();
        s.calls.push(format!("search_issues:{}", title_substring));
        if s.fail_search {
            anyhow::bail!("search unavailable");
        }
        Ok(s.issues
            .iter()
            .filter(|i| match state {
                IssueState::Open => i.open,
                IssueState::Closed => !i.open,
                IssueState::All => true,
            })
            .take(limit)
            .map(|i| Issue {
                number: i.number,
                title: i.title.clone(),
            })
            .collect())
    }

    async fn create_issue(&self, title: &str, body: &str, labels: &[String]) -> Result<u64> {
        let mut s = self.lock();
        s.calls.push(format!("create_issue:{}", title));
        let number = s.issues.len() as u64 + 1;
        s.issues.push(MemoryIssue {
            number,
            title: title.to_string(),
            body: body.to_string(),
            labels: labels.to_vec(),
            open: true,
            close_comment: None,
        });
        Ok(number)
    }

    async fn close_issue(&self, number: u64, comment: &str) -> Result<()> {
        let mut s = self.lock();
        s.calls.push(format!("close_issue:{}", number));
        if s.fail_close {
            anyhow::bail!("close rejected");
        }
        match s.issues.iter_mut().find(|i| i.number == number) {
            Some(issue) => {
                issue.open = false;
                issue.close_comment = Some(comment.to_string());
                Ok(())
            }
            None => anyhow::bail!("no issue #{}", number),
        }
    }
}
