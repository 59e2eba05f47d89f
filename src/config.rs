//! TOML configuration.
//!
//! Loaded once in `main` and passed by reference to every command. Every
//! section has defaults, so an empty file is a valid configuration for a
//! repository laid out the conventional way.
//!
//! ```toml
//! [paths]
//! repo_root = "."
//! index = "~/obsidian/03-YouTube/youtube-index.json"
//!
//! [github]
//! repo = "example/videos"
//!
//! [categories]
//! fallback = "Tools"
//!
//! [[categories.entries]]
//! name = "Docker"
//! section = "## Docker & Containers"
//! keywords = ["docker", "compose"]
//!
//! [[categories.entries]]
//! name = "Tools"
//! section = "## Tools"
//! keywords = []
//! ```

use anyhow::{bail, Context, Result};
use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use tubeflow_core::classify::{Category, CategoryMap};

/// Name of the canonical source file looked for during discovery.
pub const INDEX_FILE_NAME: &str = "youtube-index.json";

#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub paths: PathsConfig,
    #[serde(default)]
    pub structure: StructureConfig,
    #[serde(default)]
    pub github: GithubConfig,
    #[serde(default)]
    pub tracker: TrackerConfig,
    #[serde(default)]
    pub fetch: FetchConfig,
    #[serde(default)]
    pub categories: CategoriesConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub links: LinksConfig,
    /// The whole file, for dotted-path lookups by template substitution.
    #[serde(skip)]
    pub raw: toml::Table,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PathsConfig {
    #[serde(default = "default_repo_root")]
    pub repo_root: PathBuf,
    /// Canonical `youtube-index.json`. Discovered when unset.
    #[serde(default)]
    pub index: Option<PathBuf>,
    /// Index copy enriched with full descriptions.
    #[serde(default = "default_full_index")]
    pub full_index: PathBuf,
    /// Directory of generated video documents; also the link prefix.
    #[serde(default = "default_videos_dir")]
    pub videos_dir: String,
    #[serde(default = "default_videos_md")]
    pub videos_md: PathBuf,
    #[serde(default = "default_readme")]
    pub readme: PathBuf,
    #[serde(default = "default_roadmap")]
    pub roadmap: PathBuf,
    #[serde(default = "default_roadmap_md")]
    pub roadmap_md: PathBuf,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            repo_root: default_repo_root(),
            index: None,
            full_index: default_full_index(),
            videos_dir: default_videos_dir(),
            videos_md: default_videos_md(),
            readme: default_readme(),
            roadmap: default_roadmap(),
            roadmap_md: default_roadmap_md(),
        }
    }
}

fn default_repo_root() -> PathBuf {
    PathBuf::from(".")
}
fn default_full_index() -> PathBuf {
    PathBuf::from(".claude/scripts/videos-full.json")
}
fn default_videos_dir() -> String {
    "videos".to_string()
}
fn default_videos_md() -> PathBuf {
    PathBuf::from("VIDEOS.md")
}
fn default_readme() -> PathBuf {
    PathBuf::from("README.md")
}
fn default_roadmap() -> PathBuf {
    PathBuf::from("roadmap.json")
}
fn default_roadmap_md() -> PathBuf {
    PathBuf::from("ROADMAP.md")
}

#[derive(Debug, Deserialize, Clone)]
pub struct StructureConfig {
    #[serde(default = "default_youtube_root")]
    pub youtube_root: String,
}

impl Default for StructureConfig {
    fn default() -> Self {
        Self {
            youtube_root: default_youtube_root(),
        }
    }
}

fn default_youtube_root() -> String {
    "03-YouTube".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct GithubConfig {
    /// `owner/name`.
    #[serde(default)]
    pub repo: Option<String>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct TrackerConfig {
    #[serde(default = "default_tracker_program")]
    pub program: String,
    #[serde(default = "default_tracker_timeout_secs")]
    pub timeout_secs: u64,
    /// Pause between issue creations.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
}

impl Default for TrackerConfig {
    fn default() -> Self {
        Self {
            program: default_tracker_program(),
            timeout_secs: default_tracker_timeout_secs(),
            rate_limit_ms: default_rate_limit_ms(),
        }
    }
}

fn default_tracker_program() -> String {
    "gh".to_string()
}
fn default_tracker_timeout_secs() -> u64 {
    60
}
fn default_rate_limit_ms() -> u64 {
    300
}

#[derive(Debug, Deserialize, Clone)]
pub struct FetchConfig {
    #[serde(default = "default_fetch_program")]
    pub program: String,
    #[serde(default = "default_fetch_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            program: default_fetch_program(),
            timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

fn default_fetch_program() -> String {
    "yt-dlp".to_string()
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Deserialize, Clone)]
pub struct CategoriesConfig {
    #[serde(default = "default_fallback_category")]
    pub fallback: String,
    /// Ordered by priority. Empty means the built-in map.
    #[serde(default)]
    pub entries: Vec<Category>,
}

impl Default for CategoriesConfig {
    fn default() -> Self {
        Self {
            fallback: default_fallback_category(),
            entries: Vec::new(),
        }
    }
}

fn default_fallback_category() -> String {
    "Tools".to_string()
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct ChannelConfig {
    #[serde(default)]
    pub handle: Option<String>,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct LinksConfig {
    #[serde(default)]
    pub voting_repo: Option<String>,
}

impl Config {
    /// Resolve a repository-relative path against `paths.repo_root`.
    pub fn repo_path(&self, relative: &Path) -> PathBuf {
        self.paths.repo_root.join(relative)
    }

    pub fn videos_dir(&self) -> PathBuf {
        self.repo_path(Path::new(&self.paths.videos_dir))
    }

    pub fn category_map(&self) -> Result<CategoryMap> {
        if self.categories.entries.is_empty() {
            return Ok(CategoryMap::builtin());
        }
        CategoryMap::new(
            self.categories.entries.clone(),
            self.categories.fallback.clone(),
        )
        .context("Invalid [categories] configuration")
    }

    /// Locate the canonical index: `--index-path`, then
    /// `YOUTUBE_INDEX_PATH`, then `paths.index`, then the usual vault
    /// locations.
    pub fn resolve_index_path(&self, cli: Option<&Path>) -> Result<PathBuf> {
        let env = std::env::var("YOUTUBE_INDEX_PATH").ok().filter(|v| !v.is_empty());
        self.resolve_index_path_with(cli, env.as_deref())
    }

    fn resolve_index_path_with(&self, cli: Option<&Path>, env: Option<&str>) -> Result<PathBuf> {
        if let Some(path) = cli {
            return Ok(expand_tilde(path));
        }
        if let Some(path) = env {
            return Ok(expand_tilde(Path::new(path)));
        }
        if let Some(path) = &self.paths.index {
            return Ok(self.repo_path(&expand_tilde(path)));
        }

        let candidates = self.index_candidates();
        match candidates.iter().find(|p| p.exists()) {
            Some(found) => Ok(found.clone()),
            None => bail!(
                "Cannot find {}. Set YOUTUBE_INDEX_PATH, configure paths.index, or pass --index-path \
                 (looked in: {})",
                INDEX_FILE_NAME,
                candidates
                    .iter()
                    .map(|p| p.display().to_string())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }

    fn index_candidates(&self) -> Vec<PathBuf> {
        let root = &self.structure.youtube_root;
        let mut candidates = Vec::new();
        if let Some(home) = dirs::home_dir() {
            candidates.push(home.join("obsidian").join(root).join(INDEX_FILE_NAME));
            candidates.push(home.join("vault").join(root).join(INDEX_FILE_NAME));
        }
        candidates.push(self.paths.repo_root.join("..").join(root).join(INDEX_FILE_NAME));
        candidates
    }

    /// The `owner/name` of the issue repository: `GITHUB_REPO`, then
    /// `github.repo`, then the repository named by `links.voting_repo`.
    pub fn resolve_repo(&self) -> Result<String> {
        let env = std::env::var("GITHUB_REPO").ok().filter(|v| !v.is_empty());
        self.resolve_repo_with(env)
    }

    fn resolve_repo_with(&self, env: Option<String>) -> Result<String> {
        if let Some(repo) = env.or_else(|| self.github.repo.clone()) {
            return Ok(repo);
        }
        if let Some(url) = &self.links.voting_repo {
            let re = Regex::new(r"github\.com/([^/]+/[^/]+)")?;
            if let Some(caps) = re.captures(url) {
                return Ok(caps[1].trim_end_matches('/').trim_end_matches(".git").to_string());
            }
        }
        bail!("No GitHub repo configured. Set GITHUB_REPO, github.repo, or links.voting_repo")
    }

    /// Look up a scalar by dotted path (`channel.name`) in the raw file.
    pub fn lookup(&self, dotted: &str) -> Option<String> {
        let mut parts = dotted.split('.');
        let mut value = self.raw.get(parts.next()?)?;
        for key in parts {
            value = value.as_table()?.get(key)?;
        }
        match value {
            toml::Value::String(s) => Some(s.clone()),
            toml::Value::Table(_) | toml::Value::Array(_) => None,
            other => Some(other.to_string()),
        }
    }
}

fn expand_tilde(path: &Path) -> PathBuf {
    match path.strip_prefix("~") {
        Ok(rest) => match dirs::home_dir() {
            Some(home) => home.join(rest),
            None => path.to_path_buf(),
        },
        Err(_) => path.to_path_buf(),
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let mut config: Config =
        toml::from_str(content).with_context(|| "Failed to parse config file")?;
    config.raw = content
        .parse::<toml::Table>()
        .with_context(|| "Failed to parse config file")?;

    // Validate categories
    config.category_map()?;

    // Validate external tools
    if config.tracker.timeout_secs == 0 {
        bail!("tracker.timeout_secs must be > 0");
    }
    if config.fetch.timeout_secs == 0 {
        bail!("fetch.timeout_secs must be > 0");
    }

    if let Some(repo) = &config.github.repo {
        if repo.split('/').filter(|p| !p.is_empty()).count() != 2 {
            bail!("github.repo must look like 'owner/name', got '{}'", repo);
        }
    }

    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_uses_defaults() {
        let config = parse_config("").unwrap();
        assert_eq!(config.paths.videos_dir, "videos");
        assert_eq!(config.paths.videos_md, PathBuf::from("VIDEOS.md"));
        assert_eq!(config.fetch.timeout_secs, 30);
        assert_eq!(config.tracker.program, "gh");
        let map = config.category_map().unwrap();
        assert_eq!(map.fallback(), "Tools");
        assert_eq!(map.entries().len(), 9);
    }

    #[test]
    fn category_entries_keep_file_order() {
        let config = parse_config(
            r###"
[categories]
fallback = "Misc"

[[categories.entries]]
name = "VPN"
section = "## VPN"
keywords = ["WireGuard"]

[[categories.entries]]
name = "Docker"
section = "## Docker"
keywords = ["docker"]

[[categories.entries]]
name = "Misc"
section = "## Misc"
"###,
        )
        .unwrap();
        let map = config.category_map().unwrap();
        let names: Vec<_> = map.entries().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["VPN", "Docker", "Misc"]);
        assert_eq!(map.entries()[0].keywords, vec!["wireguard"]);
    }

    #[test]
    fn unknown_fallback_is_rejected() {
        let err = parse_config(
            r###"
[categories]
fallback = "Nope"

[[categories.entries]]
name = "VPN"
section = "## VPN"
keywords = ["vpn"]
"###,
        )
        .unwrap_err();
        assert!(format!("{:#}", err).contains("Nope"));
    }

    #[test]
    fn malformed_repo_is_rejected() {
        assert!(parse_config("[github]\nrepo = \"just-a-name\"\n").is_err());
    }

    #[test]
    fn repo_resolution_precedence() {
        let config = parse_config(
            "[links]\nvoting_repo = \"https://github.com/acme/video-ideas/\"\n",
        )
        .unwrap();
        assert_eq!(config.resolve_repo_with(None).unwrap(), "acme/video-ideas");
        assert_eq!(
            config.resolve_repo_with(Some("env/repo".into())).unwrap(),
            "env/repo"
        );

        let config = parse_config("[github]\nrepo = \"cfg/repo\"\n").unwrap();
        assert_eq!(config.resolve_repo_with(None).unwrap(), "cfg/repo");

        assert!(parse_config("").unwrap().resolve_repo_with(None).is_err());
    }

    #[test]
    fn index_path_precedence() {
        let config =
            parse_config("[paths]\nrepo_root = \"/srv/videos\"\nindex = \"data/index.json\"\n")
                .unwrap();
        assert_eq!(
            config
                .resolve_index_path_with(
                    Some(Path::new("/cli/index.json")),
                    Some("/env/index.json")
                )
                .unwrap(),
            PathBuf::from("/cli/index.json")
        );
        assert_eq!(
            config.resolve_index_path_with(None, Some("/env/index.json")).unwrap(),
            PathBuf::from("/env/index.json")
        );
        assert_eq!(
            config.resolve_index_path_with(None, None).unwrap(),
            PathBuf::from("/srv/videos/data/index.json")
        );
    }

    #[test]
    fn dotted_lookup_reads_raw_values() {
        let config = parse_config(
            "[channel]\nname = \"Homelab Hour\"\n\n[about]\nestablished = 2015\n",
        )
        .unwrap();
        assert_eq!(config.lookup("channel.name").as_deref(), Some("Homelab Hour"));
        assert_eq!(config.lookup("about.established").as_deref(), Some("2015"));
        assert_eq!(config.lookup("about.missing"), None);
        assert_eq!(config.lookup("channel"), None);
    }
}
