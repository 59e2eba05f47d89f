//! Bulk generation of video documents.
//!
//! Writes `{output}/{year}/{slug}/README.md` for every video in the index,
//! using each video's summary as its description. Unlike `sync`, this
//! overwrites existing documents and leaves `VIDEOS.md` alone; it is the
//! bootstrap for a fresh library or a rebuild after `tubeflow describe`.
//! Two videos whose title slugs collide within a year get distinct
//! directories, the later one suffixed with its id, as in `sync`.

use anyhow::{Context, Result};
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use tubeflow_core::models::VideoIndex;
use tubeflow_core::render::video_readme;
use tubeflow_core::slug::{slug_for, unique_slug};

use crate::config::Config;
use crate::reconcile::load_index;

pub struct GenerateOptions {
    pub output_dir: Option<PathBuf>,
    pub index_path: Option<PathBuf>,
    /// Read the description-enriched index when it exists.
    pub prefer_full: bool,
    pub dry_run: bool,
}

#[derive(Debug, Default)]
pub struct GenerateReport {
    pub documents: Vec<PathBuf>,
    pub per_year: BTreeMap<i32, usize>,
}

/// Write (or, in dry-run, list) one document per distinct video id.
pub fn generate_documents(
    index: &VideoIndex,
    output_dir: &Path,
    dry_run: bool,
) -> Result<GenerateReport> {
    let mut report = GenerateReport::default();
    let mut seen = HashSet::new();
    let mut claimed: HashSet<String> = HashSet::new();

    for video in &index.videos {
        if !seen.insert(video.video_id.as_str()) {
            tracing::warn!("duplicate video id '{}' ignored", video.video_id);
            continue;
        }

        let year = video.year();
        let slug = unique_slug(video, |slug| claimed.contains(&format!("{}/{}", year, slug)));
        if slug != slug_for(video) {
            tracing::warn!("slug collision in {}; using '{}' for {}", year, slug, video.video_id);
        }
        claimed.insert(format!("{}/{}", year, slug));

        let dir = output_dir.join(year.to_string()).join(&slug);
        let path = dir.join("README.md");

        if !dry_run {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("Failed to create {}", dir.display()))?;
            std::fs::write(&path, video_readme(video, video.summary_text()))
                .with_context(|| format!("Failed to write {}", path.display()))?;
        }

        *report.per_year.entry(year).or_insert(0) += 1;
        report.documents.push(path);
    }

    Ok(report)
}

pub fn run_generate(config: &Config, opts: GenerateOptions) -> Result<()> {
    let full = config.repo_path(&config.paths.full_index);
    let source = if opts.prefer_full && full.exists() {
        full
    } else {
        config.resolve_index_path(opts.index_path.as_deref())?
    };
    let output_dir = opts.output_dir.unwrap_or_else(|| config.videos_dir());

    println!("generate {}", source.display());
    let index = load_index(&source)?;
    println!("  found: {} videos", index.videos.len());
    if opts.dry_run {
        println!("  [dry-run] no files will be written");
    }

    let report = generate_documents(&index, &output_dir, opts.dry_run)?;

    if opts.dry_run {
        for path in &report.documents {
            println!("  would create: {}", path.display());
        }
    }
    let verb = if opts.dry_run { "would generate" } else { "generated" };
    println!("  {}: {} documents", verb, report.documents.len());
    for (year, count) in &report.per_year {
        println!("    {}: {} videos", year, count);
    }
    if !opts.dry_run {
        println!("  output: {}", output_dir.display());
        println!("ok");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn index() -> VideoIndex {
        VideoIndex::from_json(
            r#"{"videos": [
                {"video_id": "a1", "title": "Proxmox Backup Server", "date": "2024-02-01",
                 "summary": "pbs", "url": "https://www.youtube.com/watch?v=a1"},
                {"video_id": "b2", "title": "🎉🎉", "date": "2023-12-31",
                 "url": "https://www.youtube.com/watch?v=b2"},
                {"video_id": "a1", "title": "Proxmox Backup Server (dup)", "date": "2024-02-01",
                 "url": "https://www.youtube.com/watch?v=a1"}
            ]}"#,
        )
        .unwrap()
    }

    #[test]
    fn writes_year_slug_layout() {
        let tmp = TempDir::new().unwrap();
        let report = generate_documents(&index(), tmp.path(), false).unwrap();

        assert_eq!(report.documents.len(), 2);
        assert_eq!(report.per_year.get(&2024), Some(&1));
        assert_eq!(report.per_year.get(&2023), Some(&1));

        let doc = std::fs::read_to_string(tmp.path().join("2024/proxmox-backup-server/README.md"))
            .unwrap();
        assert!(doc.ends_with("## Description\n\npbs\n"));
        // Emoji-only title falls back to the id.
        assert!(tmp.path().join("2023/b2/README.md").exists());
        // Generated documents are recognised by the scanner.
        let ids = crate::scanner::existing_ids(tmp.path()).unwrap();
        assert!(ids.contains("a1") && ids.contains("b2"));
    }

    #[test]
    fn shared_titles_get_distinct_documents() {
        let index = VideoIndex::from_json(
            r#"{"videos": [
                {"video_id": "new1", "title": "Backup Basics", "date": "2024-05-01",
                 "summary": "newer", "url": "https://www.youtube.com/watch?v=new1"},
                {"video_id": "Old_2", "title": "Backup Basics", "date": "2024-02-01",
                 "summary": "older", "url": "https://www.youtube.com/watch?v=Old_2"},
                {"video_id": "c3", "title": "Backup Basics", "date": "2023-02-01",
                 "url": "https://www.youtube.com/watch?v=c3"}
            ]}"#,
        )
        .unwrap();
        let tmp = TempDir::new().unwrap();
        let report = generate_documents(&index, tmp.path(), false).unwrap();
        assert_eq!(report.documents.len(), 3);

        let read = |rel: &str| std::fs::read_to_string(tmp.path().join(rel)).unwrap();
        assert!(read("2024/backup-basics/README.md").ends_with("newer\n"));
        assert!(read("2024/backup-basics-old-2/README.md").ends_with("older\n"));
        // Different year, no collision.
        assert!(tmp.path().join("2023/backup-basics/README.md").exists());

        let docs = crate::scanner::scan_documents(tmp.path()).unwrap();
        assert_eq!(docs["Old_2"], "2024/backup-basics-old-2");

        // A rebuild lands in the same places.
        let again = generate_documents(&index, tmp.path(), false).unwrap();
        assert_eq!(again.documents, report.documents);
    }

    #[test]
    fn dry_run_writes_nothing() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("videos");
        let report = generate_documents(&index(), &out, true).unwrap();
        assert_eq!(report.documents.len(), 2);
        assert!(!out.exists());
    }
}
