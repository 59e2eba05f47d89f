//! Full-description fetching.
//!
//! The canonical index only carries short summaries. `tubeflow describe`
//! asks `yt-dlp` for each video's full description and writes a copy of
//! the index with summaries replaced, leaving the canonical file untouched.
//! `generate` prefers that copy when it exists.

use anyhow::{Context, Result};
use std::path::PathBuf;
use tubeflow_core::models::VideoIndex;
use tubeflow_core::slug::clean_title;

use crate::config::Config;
use crate::fetch::{DescriptionFetcher, YtDlpFetcher};
use crate::progress::{ProgressEvent, ProgressMode, ProgressReporter};
use crate::reconcile::load_index;

/// A summary longer than this is assumed to already be a full description.
pub const FULL_DESCRIPTION_MIN_CHARS: usize = 500;

pub struct DescribeOptions {
    pub index_path: Option<PathBuf>,
    pub output: Option<PathBuf>,
    /// Process only the first N videos; 0 means all.
    pub limit: usize,
    pub skip_existing: bool,
    pub progress: ProgressMode,
}

#[derive(Debug, Default, PartialEq, Eq)]
pub struct DescribeReport {
    pub updated: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Replace summaries in place with fetched descriptions.
///
/// A failed or empty fetch keeps the existing summary and counts as failed.
pub async fn describe_index(
    index: &mut VideoIndex,
    fetcher: &dyn DescriptionFetcher,
    limit: usize,
    skip_existing: bool,
    progress: &dyn ProgressReporter,
) -> DescribeReport {
    let mut report = DescribeReport::default();
    let take = if limit == 0 { index.videos.len() } else { limit.min(index.videos.len()) };
    let total = take as u64;

    for (i, video) in index.videos.iter_mut().take(take).enumerate() {
        progress.report(ProgressEvent::Processing {
            stage: "describe".to_string(),
            n: i as u64 + 1,
            total,
            title: clean_title(&video.title),
        });

        if skip_existing && video.summary_text().chars().count() > FULL_DESCRIPTION_MIN_CHARS {
            report.skipped += 1;
            continue;
        }

        match fetcher.fetch_description(&video.url).await {
            Ok(Some(description)) => {
                video.summary = Some(description);
                report.updated += 1;
            }
            Ok(None) => {
                tracing::warn!("empty description for {}; keeping summary", video.video_id);
                report.failed += 1;
            }
            Err(e) => {
                tracing::warn!("fetch failed for {}: {:#}; keeping summary", video.video_id, e);
                report.failed += 1;
            }
        }
    }

    report
}

pub async fn run_describe(config: &Config, opts: DescribeOptions) -> Result<()> {
    let fetcher = YtDlpFetcher::new(&config.fetch);
    let version = fetcher.check_available().await.with_context(|| {
        format!(
            "'{}' is not installed or not on PATH (install with `pip install yt-dlp`)",
            config.fetch.program
        )
    })?;
    tracing::debug!("using {} {}", config.fetch.program, version);

    let index_path = config.resolve_index_path(opts.index_path.as_deref())?;
    let output = opts
        .output
        .unwrap_or_else(|| config.repo_path(&config.paths.full_index));

    println!("describe {}", index_path.display());
    let mut index = load_index(&index_path)?;
    let total = index.videos.len();
    if opts.limit > 0 && opts.limit < total {
        println!("  processing {} of {} videos (limited)", opts.limit, total);
    } else {
        println!("  found: {} videos", total);
    }

    let reporter = opts.progress.reporter();
    let report = describe_index(
        &mut index,
        &fetcher,
        opts.limit,
        opts.skip_existing,
        reporter.as_ref(),
    )
    .await;

    if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&index)?;
    std::fs::write(&output, json + "\n")
        .with_context(|| format!("Failed to write {}", output.display()))?;

    println!("  updated: {}", report.updated);
    println!("  skipped: {}", report.skipped);
    println!("  failed: {}", report.failed);
    println!("  output: {}", output.display());
    println!("ok");
    Ok(())
}
