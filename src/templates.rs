//! `{{VARIABLE}}` placeholder substitution.
//!
//! Agent prompts, command files, and issue templates ship with placeholders
//! such as `{{CHANNEL_NAME}}`. `tubeflow templates` fills them in place from
//! the configuration. A variable with no configured value is rewritten to
//! `{{CONFIGURE_<NAME>}}` so it stays greppable and is not re-substituted
//! with an empty string.

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Config;

/// Directories, relative to the base directory, that hold templates.
pub const TEMPLATE_DIRS: &[&str] = &[
    ".claude/agents",
    ".claude/commands",
    ".claude/skills",
    "templates",
];

const TEMPLATE_GLOBS: &[&str] = &["*.md", "*.yaml", "*.yml", "*.json"];

/// Placeholder name to dotted configuration path.
pub const VARIABLE_MAP: &[(&str, &str)] = &[
    ("CHANNEL_NAME", "channel.name"),
    ("CHANNEL_HANDLE", "channel.handle"),
    ("CHANNEL_TAGLINE", "channel.tagline"),
    ("VOICE_STYLE_FILE", "voice.style_file"),
    ("CHANNEL_OVERVIEW_FILE", "voice.channel_overview_file"),
    ("YOUTUBE_ROOT", "structure.youtube_root"),
    ("SOCIAL_ROOT", "structure.social_root"),
    ("TEMPLATES_ROOT", "structure.templates_root"),
    ("DISCORD_URL", "links.discord"),
    ("BUSINESS_URL", "links.business"),
    ("GITHUB_ORG", "links.github_org"),
    ("VOTING_REPO", "links.voting_repo"),
    ("DOCKER_REPO", "links.docker_repo"),
    ("LINKEDIN_URL", "links.linkedin"),
    ("FACEBOOK_URL", "links.facebook"),
    ("TWITTER_URL", "links.twitter"),
    ("REVIEWS_URL", "links.reviews"),
    ("FEATURED_VIDEO_URL", "links.featured_video"),
    ("FEATURED_VIDEO_TITLE", "links.featured_video_title"),
    ("ABOUT_COMPANY", "about.company_name"),
    ("ABOUT_ESTABLISHED", "about.established"),
    ("ABOUT_LOCATION", "about.location"),
    ("ABOUT_TAGLINE", "about.tagline"),
    ("APPLICATION_URL", "about.application_url"),
];

/// Fields whose absence is reported before processing.
pub const REQUIRED_FIELDS: &[(&str, &str)] = &[
    ("channel.name", "Channel name"),
    ("channel.handle", "Channel handle"),
    ("links.discord", "Discord URL"),
    ("links.business", "Business URL"),
    ("links.github_org", "GitHub org URL"),
];

/// A placeholder and the text that replaces it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replacement {
    pub variable: &'static str,
    pub value: String,
    pub configured: bool,
}

fn configured(config: &Config, path: &str) -> Option<String> {
    config.lookup(path).filter(|v| !v.is_empty())
}

pub fn missing_required(config: &Config) -> Vec<String> {
    REQUIRED_FIELDS
        .iter()
        .filter(|(path, _)| configured(config, path).is_none())
        .map(|(path, name)| format!("Missing required field: {} ({})", name, path))
        .collect()
}

pub fn build_replacements(config: &Config) -> Vec<Replacement> {
    VARIABLE_MAP
        .iter()
        .map(|&(variable, path)| match configured(config, path) {
            Some(value) => Replacement {
                variable,
                value,
                configured: true,
            },
            None => Replacement {
                variable,
                value: format!("{{{{CONFIGURE_{}}}}}", variable),
                configured: false,
            },
        })
        .collect()
}

pub fn substitute(content: &str, replacements: &[Replacement]) -> String {
    let mut out = content.to_string();
    for r in replacements {
        let placeholder = format!("{{{{{}}}}}", r.variable);
        if out.contains(&placeholder) {
            out = out.replace(&placeholder, &r.value);
        }
    }
    out
}

fn build_globset(patterns: &[&str]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(builder.build()?)
}

/// Template files under each of [`TEMPLATE_DIRS`], sorted by path.
pub fn find_template_files(base_dir: &Path) -> Result<Vec<PathBuf>> {
    let include = build_globset(TEMPLATE_GLOBS)?;
    let mut files = Vec::new();

    for dir in TEMPLATE_DIRS {
        let root = base_dir.join(dir);
        if !root.exists() {
            continue;
        }
        for entry in WalkDir::new(&root) {
            let entry = entry?;
            if entry.file_type().is_file() && include.is_match(entry.file_name()) {
                files.push(entry.into_path());
            }
        }
    }

    files.sort();
    Ok(files)
}

pub struct TemplateOptions {
    pub base_dir: PathBuf,
    pub dry_run: bool,
    pub verbose: bool,
}

pub fn run_templates(config: &Config, opts: TemplateOptions) -> Result<()> {
    for warning in missing_required(config) {
        tracing::warn!("{}", warning);
    }

    let replacements = build_replacements(config);
    if opts.verbose {
        println!("variables:");
        for r in replacements.iter().filter(|r| r.configured) {
            let shown: String = r.value.chars().take(50).collect();
            let ellipsis = if r.value.chars().count() > 50 { "..." } else { "" };
            println!("  {}: {}{}", r.variable, shown, ellipsis);
        }
    }

    println!("templates {}", opts.base_dir.display());
    let files = find_template_files(&opts.base_dir)?;
    if files.is_empty() {
        println!("  no template files found");
        return Ok(());
    }

    let mut updated = 0;
    for path in &files {
        let original = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) => {
                tracing::warn!("skipping {}: {}", path.display(), e);
                continue;
            }
        };
        let processed = substitute(&original, &replacements);
        if processed == original {
            continue;
        }
        updated += 1;
        if opts.dry_run {
            println!("  would update: {}", path.display());
        } else {
            std::fs::write(path, processed)
                .with_context(|| format!("Failed to write {}", path.display()))?;
            println!("  updated: {}", path.display());
        }
    }

    println!("  processed: {} files, updated {}", files.len(), updated);
    if opts.dry_run {
        println!("  [dry-run] no files were changed");
    } else {
        println!("ok");
    }
    Ok(())
}
