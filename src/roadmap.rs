//! Roadmap publishing.
//!
//! `roadmap.json` lists planned videos. `tubeflow roadmap` makes sure the
//! voting repository has the labels it needs, opens one issue per planned
//! video (skipping titles that already have an issue), and renders
//! `ROADMAP.md` with links to those issues. When a video is later
//! published, `tubeflow sync` closes its issue.

use anyhow::{Context, Result};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tubeflow_core::models::{RoadmapData, RoadmapItem};

use crate::config::Config;
use crate::tracker::{GhTracker, IssueState, IssueTracker};

/// Issues examined when checking whether a title already has one.
const EXISTING_SEARCH_LIMIT: usize = 100;

const SUGGEST_LINK: &str = "../../issues/new?template=video-suggestion.yml";

pub fn load_roadmap(path: &Path) -> Result<RoadmapData> {
    let text = std::fs::read_to_string(path)
        .with_context(|| {
            format!(
                "Failed to read roadmap: {} (run from the repository root)",
                path.display()
            )
        })?;
    serde_json::from_str(&text)
        .with_context(|| format!("Failed to parse roadmap: {}", path.display()))
}

/// A label the repository should have.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LabelSpec {
    pub name: String,
    pub color: String,
    pub description: String,
}

/// Category labels, complexity labels, then `series` and `video-suggestion`.
/// Names are unique; the first definition wins.
pub fn required_labels(data: &RoadmapData) -> Vec<LabelSpec> {
    let mut labels = Vec::new();
    for c in &data.categories {
        labels.push(LabelSpec {
            name: c.label.clone(),
            color: c.color.clone(),
            description: c.name.clone(),
        });
    }
    for c in &data.complexity_labels {
        labels.push(LabelSpec {
            name: c.id.clone(),
            color: c.color.clone(),
            description: format!("{} difficulty", c.name),
        });
    }
    labels.push(LabelSpec {
        name: "series".to_string(),
        color: "ffc107".to_string(),
        description: "Multi-part series".to_string(),
    });
    labels.push(LabelSpec {
        name: "video-suggestion".to_string(),
        color: "a2eeef".to_string(),
        description: "Community video suggestion".to_string(),
    });

    let mut seen = HashSet::new();
    labels.retain(|l| seen.insert(l.name.clone()));
    labels
}

/// Labels attached to the issue for `item`.
pub fn issue_labels(item: &RoadmapItem, data: &RoadmapData) -> Vec<String> {
    let mut labels = Vec::new();
    if let Some(category) = item
        .category
        .as_deref()
        .and_then(|id| data.categories.iter().find(|c| c.id == id))
    {
        labels.push(category.label.clone());
    }
    if let Some(complexity) = item.complexity.as_deref().filter(|c| !c.is_empty()) {
        labels.push(complexity.to_string());
    }
    if item.series {
        labels.push("series".to_string());
    }
    labels
}

pub fn issue_body(item: &RoadmapItem) -> String {
    let mut parts = Vec::new();
    if let Some(notes) = item.notes.as_deref().filter(|n| !n.is_empty()) {
        parts.push(format!("**Notes:** {}", notes));
    }
    if let Some(info) = item.series_info.as_deref().filter(|n| !n.is_empty()) {
        parts.push(format!("**Series:** {}", info));
    }
    parts.push(String::new());
    parts.push("---".to_string());
    parts.push(String::new());
    parts.push("Vote with :+1: to help prioritize this video!".to_string());
    parts.push(String::new());
    parts.push("_This issue was auto-generated from the video roadmap._".to_string());
    parts.join("\n")
}

#[derive(Debug, Default)]
pub struct RoadmapReport {
    pub labels_created: usize,
    pub labels_failed: usize,
    pub created: usize,
    pub existing: usize,
    pub failed: usize,
    /// Roadmap item id to issue number.
    pub issue_numbers: HashMap<String, u64>,
}

/// Create missing labels and issues. Failures are counted, never fatal.
pub async fn publish_roadmap(
    data: &RoadmapData,
    tracker: &dyn IssueTracker,
    rate_limit: Duration,
) -> RoadmapReport {
    let mut report = RoadmapReport::default();

    let existing_labels: HashSet<String> = match tracker.list_labels().await {
        Ok(labels) => labels.into_iter().collect(),
        Err(e) => {
            tracing::warn!("could not list labels: {:#}", e);
            HashSet::new()
        }
    };
    for label in required_labels(data) {
        if existing_labels.contains(&label.name) {
            tracing::debug!("label '{}' already exists", label.name);
            continue;
        }
        match tracker
            .create_label(&label.name, &label.color, &label.description)
            .await
        {
            Ok(()) => report.labels_created += 1,
            Err(e) => {
                tracing::warn!("failed to create label '{}': {:#}", label.name, e);
                report.labels_failed += 1;
            }
        }
    }

    for item in &data.videos {
        let found = tracker
            .search_issues(&item.title, IssueState::All, EXISTING_SEARCH_LIMIT)
            .await;
        match found {
            Ok(issues) => {
                if let Some(issue) = issues.iter().find(|i| i.title == item.title) {
                    report.existing += 1;
                    report.issue_numbers.insert(item.id.clone(), issue.number);
                    continue;
                }
            }
            Err(e) => {
                // Creating blind could duplicate an existing issue.
                tracing::warn!("issue lookup failed for '{}': {:#}", item.title, e);
                report.failed += 1;
                continue;
            }
        }

        match tracker
            .create_issue(&item.title, &issue_body(item), &issue_labels(item, data))
            .await
        {
            Ok(number) => {
                report.created += 1;
                report.issue_numbers.insert(item.id.clone(), number);
            }
            Err(e) => {
                tracing::warn!("failed to create issue '{}': {:#}", item.title, e);
                report.failed += 1;
            }
        }
        if !rate_limit.is_zero() {
            tokio::time::sleep(rate_limit).await;
        }
    }

    report
}

/// Uppercase the first character and lowercase the rest.
fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Markdown heading anchor for a category name.
fn anchor(name: &str) -> String {
    name.to_lowercase().replace(' ', "-").replace('&', "")
}

/// Render `ROADMAP.md`. Items link to their issue when one is known.
pub fn render_roadmap(
    data: &RoadmapData,
    issue_numbers: &HashMap<String, u64>,
    channel_handle: &str,
    last_updated: &str,
) -> String {
    // Group by category in order of first appearance.
    let mut order: Vec<&str> = Vec::new();
    let mut groups: HashMap<&str, Vec<&RoadmapItem>> = HashMap::new();
    for item in &data.videos {
        let cat = item.category.as_deref().unwrap_or("misc");
        if !groups.contains_key(cat) {
            order.push(cat);
        }
        groups.entry(cat).or_default().push(item);
    }
    let category_name = |id: &str| {
        data.categories
            .iter()
            .find(|c| c.id == id)
            .map(|c| c.name.as_str())
    };

    let series = data.videos.iter().filter(|v| v.series).count();
    let complexity = |level: &str| {
        data.videos
            .iter()
            .filter(|v| v.complexity.as_deref() == Some(level))
            .count()
    };

    let mut lines: Vec<String> = vec![
        "# Video Roadmap".into(),
        String::new(),
        format!(
            "Upcoming video ideas for the [{h}](https://youtube.com/{h}) channel.",
            h = channel_handle
        ),
        String::new(),
        "## How to Vote".into(),
        String::new(),
        "1. Click on any video topic below".into(),
        "2. Give it a :+1: reaction".into(),
        "3. Most voted topics get prioritized!".into(),
        String::new(),
        format!("Want to suggest a new topic? [Open a suggestion]({})", SUGGEST_LINK),
        String::new(),
        "---".into(),
        String::new(),
        "## Overview".into(),
        String::new(),
        format!(
            "**{} video ideas** across {} categories",
            data.videos.len(),
            data.categories.len()
        ),
        String::new(),
        "| Difficulty | Count |".into(),
        "|------------|-------|".into(),
        format!("| Beginner | {} |", complexity("beginner")),
        format!("| Intermediate | {} |", complexity("intermediate")),
        format!("| Advanced | {} |", complexity("advanced")),
        String::new(),
        format!("*{} multi-part series included*", series),
        String::new(),
        "---".into(),
        String::new(),
        "## Categories".into(),
        String::new(),
    ];

    for cat in &order {
        if let Some(name) = category_name(cat) {
            lines.push(format!("- [{}](#{}) ({})", name, anchor(name), groups[cat].len()));
        }
    }
    lines.extend(["".into(), "---".into(), "".into()]);

    for cat in &order {
        let Some(name) = category_name(cat) else {
            continue;
        };
        lines.push(format!("## {}", name));
        lines.push(String::new());
        lines.push("| Video | Difficulty | Vote |".into());
        lines.push("|-------|------------|------|".into());
        for item in &groups[cat] {
            let badge = if item.series { " *(series)*" } else { "" };
            let difficulty = capitalize(item.complexity.as_deref().unwrap_or(""));
            let row = match issue_numbers.get(&item.id) {
                Some(n) => format!(
                    "| [{}](../../issues/{}){} | {} | [Vote](../../issues/{}) |",
                    item.title, n, badge, difficulty, n
                ),
                None => format!("| {}{} | {} | - |", item.title, badge, difficulty),
            };
            lines.push(row);
        }
        lines.push(String::new());
    }

    lines.extend([
        "---".into(),
        String::new(),
        format!("*Last updated: {}*", last_updated),
        String::new(),
        format!(
            "*[Video Library](VIDEOS.md) | [Suggest Topic]({}) | [Project Board](../../projects)*",
            SUGGEST_LINK
        ),
        String::new(),
    ]);

    lines.join("\n")
}

pub struct RoadmapOptions {
    pub roadmap: Option<PathBuf>,
    pub dry_run: bool,
}

pub async fn run_roadmap(config: &Config, opts: RoadmapOptions) -> Result<()> {
    let path = opts
        .roadmap
        .unwrap_or_else(|| config.repo_path(&config.paths.roadmap));
    let data = load_roadmap(&path)?;

    println!("roadmap {}", path.display());
    println!("  found: {} video ideas", data.videos.len());

    let report = if opts.dry_run {
        println!("  [dry-run] no labels or issues will be created");
        for label in required_labels(&data) {
            println!("  would ensure label: {} (#{})", label.name, label.color);
        }
        for item in &data.videos {
            println!("  would create issue (unless it exists): {}", item.title);
        }
        RoadmapReport::default()
    } else {
        let repo = config.resolve_repo()?;
        println!("  repository: {}", repo);
        let tracker = GhTracker::new(&config.tracker, repo);
        publish_roadmap(&data, &tracker, Duration::from_millis(config.tracker.rate_limit_ms)).await
    };

    let handle = config
        .channel
        .handle
        .clone()
        .unwrap_or_else(|| "@yourchannel".to_string());
    let last_updated = data
        .last_updated
        .clone()
        .unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
    let markdown = render_roadmap(&data, &report.issue_numbers, &handle, &last_updated);

    let out = config.repo_path(&config.paths.roadmap_md);
    if opts.dry_run {
        println!(
            "  would write {} ({} lines)",
            out.display(),
            markdown.lines().count()
        );
        println!("Run without --dry-run to create issues.");
        return Ok(());
    }

    std::fs::write(&out, markdown).with_context(|| format!("Failed to write {}", out.display()))?;
    println!("  labels created: {}", report.labels_created);
    if report.labels_failed > 0 {
        println!("  labels failed: {}", report.labels_failed);
    }
    println!("  issues created: {}", report.created);
    println!("  issues existing: {}", report.existing);
    println!("  issues failed: {}", report.failed);
    println!("  generated: {}", out.display());
    println!("ok");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tracker::MemoryTracker;

    fn data() -> RoadmapData {
        serde_json::from_str(
            r#"{
                "categories": [
                    {"id": "net", "name": "Networking & VPN", "label": "networking", "color": "0e8a16"},
                    {"id": 2, "name": "Home Automation", "label": "automation", "color": "1d76db"}
                ],
                "complexityLabels": [
                    {"id": "beginner", "name": "Beginner", "color": "c2e0c6"},
                    {"id": "advanced", "name": "Advanced", "color": "d93f0b"}
                ],
                "videos": [
                    {"id": 1, "title": "WireGuard from scratch", "category": "net",
                     "complexity": "beginner", "notes": "Cover key rotation"},
                    {"id": 2, "title": "Home Assistant deep dive", "category": 2,
                     "complexity": "advanced", "series": true, "seriesInfo": "Part 1 of 3"},
                    {"id": 3, "title": "Tailscale ACLs", "category": "net"},
                    {"id": 4, "title": "Mystery topic", "category": "unknown"}
                ],
                "lastUpdated": "2024-04-01"
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn labels_and_body() {
        let d = data();
        let names: Vec<_> = required_labels(&d).into_iter().map(|l| l.name).collect();
        assert_eq!(
            names,
            vec!["networking", "automation", "beginner", "advanced", "series", "video-suggestion"]
        );
        assert_eq!(required_labels(&d)[2].description, "Beginner difficulty");

        assert_eq!(issue_labels(&d.videos[1], &d), vec!["automation", "advanced", "series"]);
        assert!(issue_labels(&d.videos[3], &d).is_empty());

        let body = issue_body(&d.videos[1]);
        assert!(body.starts_with("**Series:** Part 1 of 3\n\n---\n"));
        assert!(body.ends_with("_This issue was auto-generated from the video roadmap._"));
    }

    #[tokio::test]
    async fn creates_only_missing_labels_and_issues() {
        let d = data();
        let tracker = MemoryTracker::new()
            .with_label("networking")
            .with_open_issue("Tailscale ACLs");

        let report = publish_roadmap(&d, &tracker, Duration::ZERO).await;
        assert_eq!(report.labels_created, 5);
        assert_eq!(report.existing, 1);
        assert_eq!(report.created, 3);
        assert_eq!(report.failed, 0);
        assert_eq!(report.issue_numbers["3"], 1);
        assert_eq!(report.issue_numbers["1"], 2);

        let issues = tracker.issues();
        assert_eq!(issues[1].title, "WireGuard from scratch");
        assert_eq!(issues[1].labels, vec!["networking", "beginner"]);
        assert!(issues[1].body.contains("**Notes:** Cover key rotation"));
        assert_eq!(tracker.calls().iter().filter(|c| *c == "list_labels").count(), 1);

        // Second run finds everything.
        let again = publish_roadmap(&d, &tracker, Duration::ZERO).await;
        assert_eq!((again.created, again.existing, again.labels_created), (0, 4, 0));
    }

    #[tokio::test]
    async fn lookup_failure_skips_creation() {
        let d = data();
        let tracker = MemoryTracker::new().failing_search();
        let report = publish_roadmap(&d, &tracker, Duration::ZERO).await;
        assert_eq!(report.failed, 4);
        assert!(tracker.issues().is_empty());
    }

    #[test]
    fn renders_roadmap_markdown() {
        let d = data();
        let numbers = HashMap::from([("1".to_string(), 7u64)]);
        let md = render_roadmap(&d, &numbers, "@homelab", "2024-04-01");

        assert!(md.starts_with("# Video Roadmap\n\nUpcoming video ideas for the [@homelab](https://youtube.com/@homelab) channel.\n"));
        assert!(md.contains("**4 video ideas** across 2 categories"));
        assert!(md.contains("| Beginner | 1 |\n| Intermediate | 0 |\n| Advanced | 1 |"));
        assert!(md.contains("*1 multi-part series included*"));
        assert!(md.contains("- [Networking & VPN](#networking--vpn) (2)\n- [Home Automation](#home-automation) (1)\n"));
        assert!(md.contains(
            "| [WireGuard from scratch](../../issues/7) | Beginner | [Vote](../../issues/7) |"
        ));
        assert!(md.contains("| Home Assistant deep dive *(series)* | Advanced | - |"));
        assert!(md.contains("| Tailscale ACLs |  | - |"));
        assert!(!md.contains("Mystery topic"));
        assert!(md.ends_with("*Last updated: 2024-04-01*\n\n*[Video Library](VIDEOS.md) | [Suggest Topic](../../issues/new?template=video-suggestion.yml) | [Project Board](../../projects)*\n"));
    }
}
