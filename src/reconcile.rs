//! Sync orchestration.
//!
//! One run moves through `LOAD → DIFF → (CLASSIFY → MATERIALIZE →
//! CROSS-CLOSE per new video) → FINALIZE`:
//!
//! 1. **Load** the canonical index and `VIDEOS.md`. Either one missing
//!    aborts the run before anything is written.
//! 2. **Diff** against the ids found in existing video documents
//!    ([`crate::scanner`]). Only videos without a document are new.
//! 3. For each new video, strictly in index order:
//!    classify it, write its document, insert its row into the flat table
//!    (primary category) and into every matched category section, then
//!    close the first open roadmap issue whose title it covers.
//! 4. **Finalize** once: running count, year range, `VIDEOS.md` write, and
//!    the "Latest Video" block plus count in `README.md`.
//!
//! Tool and per-file failures are recorded on the video's outcome and the
//! batch continues. Dry-run performs load, diff, and classification only.

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tubeflow_core::classify::{classify, CategoryMap};
use tubeflow_core::document::{
    insert_row_after_anchor, insert_row_in_section, is_linked_row, is_table_separator,
    line_terminated, update_scalar_field, upsert_block,
};
use tubeflow_core::matching::{first_match, search_terms};
use tubeflow_core::models::{VideoIndex, VideoRecord};
use tubeflow_core::render;
use tubeflow_core::slug::{clean_title, slug_for, unique_slug};

use crate::config::Config;
use crate::fetch::{DescriptionFetcher, YtDlpFetcher};
use crate::progress::{ProgressEvent, ProgressMode, ProgressReporter};
use crate::scanner::scan_documents;
use crate::tracker::{GhTracker, IssueState, IssueTracker};

/// Open issues considered per video when looking for one to close.
const CLOSE_SEARCH_LIMIT: usize = 10;

/// Read and parse the canonical index.
pub fn load_index(path: &Path) -> Result<VideoIndex> {
    if !path.exists() {
        bail!("Video index not found at {}", path.display());
    }
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read video index: {}", path.display()))?;
    VideoIndex::from_json(&text)
        .with_context(|| format!("Failed to parse video index: {}", path.display()))
}

/// Paths and switches for one run.
#[derive(Debug, Clone)]
pub struct SyncSettings {
    pub index_path: PathBuf,
    /// Filesystem directory holding `{year}/{slug}/README.md`.
    pub videos_dir: PathBuf,
    /// Prefix used in links written to `VIDEOS.md` and `README.md`.
    pub link_prefix: String,
    pub videos_md: PathBuf,
    pub readme: PathBuf,
    pub dry_run: bool,
    /// Process at most this many new videos.
    pub limit: Option<usize>,
}

impl SyncSettings {
    pub fn from_config(
        config: &Config,
        index_path: PathBuf,
        dry_run: bool,
        limit: Option<usize>,
    ) -> Self {
        Self {
            index_path,
            videos_dir: config.videos_dir(),
            link_prefix: config.paths.videos_dir.clone(),
            videos_md: config.repo_path(&config.paths.videos_md),
            readme: config.repo_path(&config.paths.readme),
            dry_run,
            limit,
        }
    }
}

/// What happened to one new video.
#[derive(Debug, Clone, Serialize)]
pub struct RecordOutcome {
    pub video_id: String,
    pub title: String,
    pub year: i32,
    pub slug: String,
    /// Link to the document, relative to the repository root.
    pub path: String,
    pub primary: String,
    pub categories: Vec<String>,
    /// The document was written (always false in dry-run).
    pub written: bool,
    pub closed_issue: Option<u64>,
    pub errors: Vec<String>,
}

/// Result of one run. Never persisted.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SyncReport {
    pub dry_run: bool,
    /// Distinct videos in the index.
    pub total: usize,
    pub already_synced: usize,
    /// Videos synced (or that would be, in dry-run).
    pub synced: usize,
    /// Duplicate ids ignored.
    pub skipped: usize,
    /// New videos left for a later run by `--limit`.
    pub deferred: usize,
    /// Videos with at least one recorded error.
    pub failed: usize,
    pub issues_closed: Vec<u64>,
    pub videos: Vec<RecordOutcome>,
}

pub struct Reconciler<'a> {
    settings: SyncSettings,
    categories: CategoryMap,
    fetcher: &'a dyn DescriptionFetcher,
    tracker: Option<&'a dyn IssueTracker>,
    progress: &'a dyn ProgressReporter,
}

impl<'a> Reconciler<'a> {
    pub fn new(
        settings: SyncSettings,
        categories: CategoryMap,
        fetcher: &'a dyn DescriptionFetcher,
        progress: &'a dyn ProgressReporter,
    ) -> Self {
        Self {
            settings,
            categories,
            fetcher,
            tracker: None,
            progress,
        }
    }

    /// Close matching roadmap issues through `tracker`. Without one, the
    /// cross-close step is skipped.
    pub fn with_tracker(mut self, tracker: &'a dyn IssueTracker) -> Self {
        self.tracker = Some(tracker);
        self
    }

    pub async fn run(&self) -> Result<SyncReport> {
        let s = &self.settings;

        // LOAD
        let mut index = load_index(&s.index_path)?;
        if !s.videos_md.exists() {
            bail!(
                "{} not found. Run from the video repository root or set paths.videos_md",
                s.videos_md.display()
            );
        }
        let mut videos_md = std::fs::read_to_string(&s.videos_md)
            .with_context(|| format!("Failed to read {}", s.videos_md.display()))?;

        if !index.is_newest_first() {
            tracing::warn!("video index is not ordered newest-first; sorting by date");
            index.sort_newest_first();
        }
        let records = dedup(&index.videos);
        let year_range = index.year_range();

        let mut report = SyncReport {
            dry_run: s.dry_run,
            total: records.len(),
            skipped: index.videos.len() - records.len(),
            ..Default::default()
        };

        // DIFF
        self.progress.report(ProgressEvent::Scanning {
            stage: "sync".to_string(),
        });
        let existing = scan_documents(&s.videos_dir)?;
        report.already_synced = records
            .iter()
            .filter(|r| existing.contains_key(&r.video_id))
            .count();

        let mut new: Vec<&VideoRecord> = records
            .iter()
            .copied()
            .filter(|r| !existing.contains_key(&r.video_id))
            .collect();
        if let Some(limit) = s.limit {
            if new.len() > limit {
                report.deferred = new.len() - limit;
                new.truncate(limit);
            }
        }

        if new.is_empty() {
            return Ok(report);
        }

        let mut claimed: HashSet<String> = HashSet::new();
        let total = new.len() as u64;
        for (i, record) in new.iter().enumerate() {
            self.progress.report(ProgressEvent::Processing {
                stage: "sync".to_string(),
                n: i as u64 + 1,
                total,
                title: clean_title(&record.title),
            });

            let outcome = self.sync_record(record, &mut videos_md, &mut claimed).await;
            if outcome.written || s.dry_run {
                report.synced += 1;
            }
            if !outcome.errors.is_empty() {
                report.failed += 1;
            }
            if let Some(n) = outcome.closed_issue {
                report.issues_closed.push(n);
            }
            report.videos.push(outcome);
        }

        // FINALIZE
        let written = report.videos.iter().filter(|o| o.written).count();
        if s.dry_run || written == 0 {
            return Ok(report);
        }

        let unmaterialized = report.deferred + (report.videos.len() - written);
        let count = records.len() - unmaterialized;
        videos_md = update_scalar_field(
            &videos_md,
            &Regex::new(render::VIDEO_COUNT_PATTERN)?,
            &render::video_count_field(count),
        );
        if let Some((min, max)) = year_range {
            videos_md = update_scalar_field(
                &videos_md,
                &Regex::new(render::YEAR_RANGE_PATTERN)?,
                &render::year_range_field(min, max),
            );
        }
        std::fs::write(&s.videos_md, &videos_md)
            .with_context(|| format!("Failed to write {}", s.videos_md.display()))?;

        // The newest video that has a document.
        let latest = records.iter().find_map(|r| {
            if let Some(dir) = existing.get(&r.video_id) {
                return Some((*r, format!("{}/{}", s.link_prefix.trim_end_matches('/'), dir)));
            }
            report
                .videos
                .iter()
                .find(|o| o.written && o.video_id == r.video_id)
                .map(|o| (*r, o.path.clone()))
        });
        if let Some((record, link)) = latest {
            self.update_readme(record, &link, count)?;
        }

        Ok(report)
    }

    async fn sync_record(
        &self,
        record: &VideoRecord,
        videos_md: &mut String,
        claimed: &mut HashSet<String>,
    ) -> RecordOutcome {
        let s = &self.settings;
        let title = clean_title(&record.title);
        let classification = classify(&record.title, record.summary_text(), &self.categories);

        let year = record.year();
        let slug = unique_slug(record, |slug| {
            let rel = format!("{}/{}", year, slug);
            claimed.contains(&rel) || s.videos_dir.join(&rel).join("README.md").exists()
        });
        if slug != slug_for(record) {
            tracing::warn!(
                "slug '{}' already used by another video; using '{}' for {}",
                slug_for(record),
                slug,
                record.video_id
            );
        }
        claimed.insert(format!("{}/{}", year, slug));

        let link = render::video_link(&s.link_prefix, year, &slug);
        let mut outcome = RecordOutcome {
            video_id: record.video_id.clone(),
            title: title.clone(),
            year,
            slug: slug.clone(),
            path: link.clone(),
            primary: classification.primary.clone(),
            categories: classification.matched.clone(),
            written: false,
            closed_issue: None,
            errors: Vec::new(),
        };

        if s.dry_run {
            return outcome;
        }

        // MATERIALIZE
        let description = match self.fetcher.fetch_description(&record.url).await {
            Ok(Some(text)) => text,
            Ok(None) => {
                tracing::warn!("no description for {}; using summary", record.video_id);
                record.summary_text().to_string()
            }
            Err(e) => {
                tracing::warn!(
                    "description fetch failed for {}: {:#}; using summary",
                    record.video_id,
                    e
                );
                outcome.errors.push(format!("fetch: {:#}", e));
                record.summary_text().to_string()
            }
        };

        let dir = s.videos_dir.join(year.to_string()).join(&slug);
        let body = render::video_readme(record, &description);
        let written = std::fs::create_dir_all(&dir)
            .and_then(|_| std::fs::write(dir.join("README.md"), body));
        if let Err(e) = written {
            tracing::warn!("failed to write document for {}: {}", record.video_id, e);
            outcome.errors.push(format!("write {}: {}", dir.display(), e));
            return outcome;
        }
        outcome.written = true;

        let row = render::index_row(record, &link, &classification.primary);
        let row = line_terminated(videos_md, row);
        let updated = insert_row_after_anchor(videos_md, is_table_separator, is_linked_row, &row);
        if updated == *videos_md {
            tracing::debug!("no video table found for {}", record.video_id);
        }
        *videos_md = updated;

        let row = line_terminated(videos_md, render::section_row(record, &link));
        for category in &classification.matched {
            let header = self.categories.section_for(category);
            let updated = insert_row_in_section(videos_md, header, is_table_separator, &row);
            if updated == *videos_md {
                tracing::debug!("no table under '{}' for {}", header, record.video_id);
            }
            *videos_md = updated;
        }

        // CROSS-CLOSE
        if let Some(tracker) = self.tracker {
            match close_matching_issue(tracker, &title, &record.url).await {
                Ok(closed) => outcome.closed_issue = closed,
                Err(e) => {
                    tracing::warn!("issue close failed for {}: {:#}", record.video_id, e);
                    outcome.errors.push(format!("tracker: {:#}", e));
                }
            }
        }

        outcome
    }

    fn update_readme(&self, latest: &VideoRecord, link: &str, count: usize) -> Result<()> {
        let path = &self.settings.readme;
        if !path.exists() {
            return Ok(());
        }
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read {}", path.display()))?;

        let content = update_scalar_field(
            &content,
            &Regex::new(render::BROWSE_COUNT_PATTERN)?,
            &render::browse_count_field(count),
        );
        let content = upsert_block(
            &content,
            render::LATEST_MARKER,
            &Regex::new(render::LATEST_BLOCK_PATTERN)?,
            render::LIBRARY_HEADING,
            &render::latest_block(latest, link),
        );

        std::fs::write(path, content).with_context(|| format!("Failed to write {}", path.display()))
    }
}

/// Close the first open issue covered by `title`. Returns its number.
pub async fn close_matching_issue(
    tracker: &dyn IssueTracker,
    title: &str,
    url: &str,
) -> Result<Option<u64>> {
    let issues = tracker
        .search_issues(&search_terms(title), IssueState::Open, CLOSE_SEARCH_LIMIT)
        .await?;
    let Some(issue) = first_match(title, &issues, |i| i.title.as_str()) else {
        return Ok(None);
    };
    tracker
        .close_issue(issue.number, &format!("Published! Watch here: {}", url))
        .await?;
    Ok(Some(issue.number))
}

/// First occurrence of each id, in order.
fn dedup(videos: &[VideoRecord]) -> Vec<&VideoRecord> {
    let mut seen = HashSet::new();
    videos
        .iter()
        .filter(|r| {
            let first = seen.insert(r.video_id.as_str());
            if !first {
                tracing::warn!("duplicate video id '{}' ignored", r.video_id);
            }
            first
        })
        .collect()
}

// ═══════════════════════════════════════════════════════════════════════
// `tubeflow sync`
// ═══════════════════════════════════════════════════════════════════════

pub struct SyncOptions {
    pub dry_run: bool,
    pub index_path: Option<PathBuf>,
    pub limit: Option<usize>,
    pub json: bool,
    pub progress: ProgressMode,
}

pub async fn run_sync(config: &Config, opts: SyncOptions) -> Result<()> {
    let index_path = config.resolve_index_path(opts.index_path.as_deref())?;
    let settings = SyncSettings::from_config(config, index_path, opts.dry_run, opts.limit);
    let categories = config.category_map()?;

    let tracker = if opts.dry_run {
        None
    } else {
        Some(GhTracker::new(&config.tracker, config.resolve_repo()?))
    };
    let fetcher = YtDlpFetcher::new(&config.fetch);
    let reporter = opts.progress.reporter();

    if !opts.json {
        println!("sync {}", settings.index_path.display());
        if opts.dry_run {
            println!("  [dry-run] no changes will be made");
        }
    }

    let mut reconciler = Reconciler::new(settings, categories, &fetcher, reporter.as_ref());
    if let Some(tracker) = &tracker {
        reconciler = reconciler.with_tracker(tracker);
    }
    let report = reconciler.run().await?;

    if opts.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print_report(&report);
    }
    Ok(())
}

fn print_report(report: &SyncReport) {
    if report.videos.is_empty() {
        println!("  No new videos to sync ({} already synced)", report.already_synced);
        return;
    }
    for v in &report.videos {
        println!("  {} [{}]", v.title, v.categories.join(", "));
        println!("    path: {}", v.path);
        if let Some(n) = v.closed_issue {
            println!("    closed issue: #{}", n);
        }
        for e in &v.errors {
            println!("    error: {}", e);
        }
    }
    let verb = if report.dry_run { "would sync" } else { "synced" };
    println!("  {}: {}", verb, report.synced);
    println!("  already synced: {}", report.already_synced);
    if report.skipped > 0 {
        println!("  duplicates skipped: {}", report.skipped);
    }
    if report.deferred > 0 {
        println!("  deferred by --limit: {}", report.deferred);
    }
    println!("  failed: {}", report.failed);
    if !report.issues_closed.is_empty() {
        let closed: Vec<String> = report
            .issues_closed
            .iter()
            .map(|n| format!("#{}", n))
            .collect();
        println!("  closed issues: {}", closed.join(", "));
    }
    if report.dry_run {
        println!("Run without --dry-run to apply changes.");
    } else {
        println!("ok");
    }
}
