//! Already-synced detection.
//!
//! The set of synced video ids is re-derived from disk on every run: each
//! generated `{year}/{slug}/README.md` embeds a `video-id` marker, and that
//! marker is the only watermark. There is no separate cursor file.
//! Documents written before the marker existed are recognised by their
//! `watch?v=` link.

use anyhow::Result;
use globset::{GlobBuilder, GlobMatcher};
use regex::Regex;
use std::collections::{HashMap, HashSet};
use std::path::Path;
use tubeflow_core::render::VIDEO_ID_MARKER_PATTERN;
use walkdir::WalkDir;

/// Two-level layout under the videos directory.
pub const DOCUMENT_GLOB: &str = "*/*/README.md";

/// Fallback back-reference for documents without a marker.
pub const WATCH_ID_PATTERN: &str = r"watch\?v=([A-Za-z0-9_-]+)";

/// Ids of every video that already has a generated document under `root`.
///
/// A missing root is an empty set. Documents without a marker or watch URL,
/// or that cannot be read, are skipped.
pub fn existing_ids(root: &Path) -> Result<HashSet<String>> {
    Ok(scan_documents(root)?.into_keys().collect())
}

/// Map of video id to the `{year}/{slug}` directory of its document,
/// relative to `root`. When two documents carry the same id the first in
/// path order wins.
pub fn scan_documents(root: &Path) -> Result<HashMap<String, String>> {
    let mut ids = HashMap::new();
    if !root.exists() {
        return Ok(ids);
    }

    let matcher = document_matcher()?;
    let marker_re = Regex::new(VIDEO_ID_MARKER_PATTERN)?;
    let watch_re = Regex::new(WATCH_ID_PATTERN)?;

    for entry in WalkDir::new(root)
        .min_depth(3)
        .max_depth(3)
        .sort_by_file_name()
    {
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::debug!("skipping unreadable entry: {}", e);
                continue;
            }
        };
        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path.strip_prefix(root).unwrap_or(path);
        let rel_str = relative.to_string_lossy().replace('\\', "/");
        if !matcher.is_match(&rel_str) {
            continue;
        }

        let body = match std::fs::read_to_string(path) {
            Ok(body) => body,
            Err(e) => {
                tracing::debug!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let caps = marker_re
            .captures(&body)
            .or_else(|| watch_re.captures(&body));
        match caps {
            Some(caps) => {
                let dir = rel_str.trim_end_matches("/README.md").to_string();
                ids.entry(caps[1].to_string()).or_insert(dir);
            }
            None => tracing::debug!("no video id in {}", rel_str),
        }
    }

    Ok(ids)
}

fn document_matcher() -> Result<GlobMatcher> {
    Ok(GlobBuilder::new(DOCUMENT_GLOB)
        .literal_separator(true)
        .build()?
        .compile_matcher())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(root: &Path, rel: &str, body: &str) {
        let path = root.join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(path, body).unwrap();
    }

    #[test]
    fn missing_root_is_empty() {
        let tmp = TempDir::new().unwrap();
        let ids = existing_ids(&tmp.path().join("nope")).unwrap();
        assert!(ids.is_empty());
    }

    #[test]
    fn collects_ids_from_two_level_documents() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "2024/nextcloud-pi/README.md",
            "# Nextcloud\n\n[Watch on YouTube](https://www.youtube.com/watch?v=abc_12-3)\n",
        );
        write(
            root,
            "2023/old/README.md",
            "[x](https://youtube.com/watch?v=zzz999&t=10)",
        );
        // no back-reference
        write(root, "2023/hand-written/README.md", "# Notes only\n");
        // wrong depth
        write(root, "README.md", "https://youtube.com/watch?v=toplevel");
        write(root, "2024/a/b/README.md", "https://youtube.com/watch?v=toodeep");
        // wrong file name
        write(root, "2024/other/NOTES.md", "https://youtube.com/watch?v=notes");

        let ids = existing_ids(root).unwrap();
        let mut ids: Vec<_> = ids.into_iter().collect();
        ids.sort();
        assert_eq!(ids, vec!["abc_12-3", "zzz999"]);

        let docs = scan_documents(root).unwrap();
        assert_eq!(docs["abc_12-3"], "2024/nextcloud-pi");
        assert_eq!(docs["zzz999"], "2023/old");
    }

    #[test]
    fn marker_wins_over_watch_url() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path();
        write(
            root,
            "2024/short-link/README.md",
            "# Short\n\n<!-- video-id: ep 12/b -->\n\n[Watch](https://youtu.be/ep12)\n",
        );
        write(
            root,
            "2024/both/README.md",
            "<!-- video-id: real01 -->\n[x](https://www.youtube.com/watch?v=other)\n",
        );

        let docs = scan_documents(root).unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(docs["ep 12/b"], "2024/short-link");
        assert_eq!(docs["real01"], "2024/both");
    }
}
