//! # TubeFlow CLI (`tubeflow`)
//!
//! Keeps a public video-library repository in step with a channel's
//! published-video index.
//!
//! ## Usage
//!
//! ```bash
//! tubeflow --config ./tubeflow.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tubeflow sync` | Add documents and index rows for newly published videos, close their roadmap issues |
//! | `tubeflow generate` | (Re)write every video document from the index |
//! | `tubeflow describe` | Fetch full descriptions into a copy of the index |
//! | `tubeflow roadmap` | Create labels and voting issues from `roadmap.json`, render `ROADMAP.md` |
//! | `tubeflow templates` | Fill `{{VARIABLE}}` placeholders from the configuration |
//!
//! ## Examples
//!
//! ```bash
//! # Preview what a sync would add
//! tubeflow sync --dry-run --index-path ~/obsidian/03-YouTube/youtube-index.json
//!
//! # Sync at most five new videos, machine-readable report
//! tubeflow sync --limit 5 --json
//!
//! # Bootstrap a new library with full descriptions
//! tubeflow describe --skip-existing && tubeflow generate
//! ```

use anyhow::bail;
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

use tubeflow::config::{self, Config};
use tubeflow::describe::{self, DescribeOptions};
use tubeflow::generate::{self, GenerateOptions};
use tubeflow::progress::ProgressMode;
use tubeflow::reconcile::{self, SyncOptions};
use tubeflow::roadmap::{self, RoadmapOptions};
use tubeflow::templates::{self, TemplateOptions};

const DEFAULT_CONFIG: &str = "./tubeflow.toml";

/// TubeFlow: sync a channel's published videos into a markdown library.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/tubeflow.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "tubeflow",
    about = "TubeFlow: keep a video library repository in sync with a channel's published videos",
    version
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./tubeflow.toml`; built-in defaults apply when that
    /// file does not exist.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sync newly published videos into the library.
    ///
    /// Finds videos in the index without a document, writes their
    /// documents, inserts rows into VIDEOS.md, closes matching roadmap
    /// issues, and refreshes counts and the latest-video block.
    Sync {
        /// Preview changes without writing files or calling the tracker.
        #[arg(long)]
        dry_run: bool,

        /// Path to youtube-index.json (overrides YOUTUBE_INDEX_PATH and config).
        #[arg(long)]
        index_path: Option<PathBuf>,

        /// Process at most this many new videos.
        #[arg(long)]
        limit: Option<usize>,

        /// Print the run report as JSON on stdout.
        #[arg(long)]
        json: bool,

        /// Progress on stderr: `off`, `human`, or `json`. Defaults to human on a TTY.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Generate a document for every video in the index.
    Generate {
        /// Output directory (defaults to paths.videos_dir).
        #[arg(long)]
        output_dir: Option<PathBuf>,

        /// Path to youtube-index.json.
        #[arg(long)]
        index_path: Option<PathBuf>,

        /// Read the canonical index even when the full-description copy exists.
        #[arg(long)]
        no_prefer_full: bool,

        /// List documents without writing them.
        #[arg(long)]
        dry_run: bool,
    },

    /// Fetch full video descriptions with yt-dlp.
    Describe {
        /// Path to youtube-index.json.
        #[arg(long)]
        index_path: Option<PathBuf>,

        /// Output file (defaults to paths.full_index).
        #[arg(long)]
        output: Option<PathBuf>,

        /// Process only the first N videos (0 = all).
        #[arg(long, default_value_t = 0)]
        limit: usize,

        /// Skip videos whose summary already looks like a full description.
        #[arg(long)]
        skip_existing: bool,

        /// Progress on stderr: `off`, `human`, or `json`.
        #[arg(long)]
        progress: Option<String>,
    },

    /// Publish the roadmap as labels and voting issues and render ROADMAP.md.
    Roadmap {
        /// Path to roadmap.json (defaults to paths.roadmap).
        #[arg(long)]
        roadmap: Option<PathBuf>,

        /// Preview without creating labels, issues, or ROADMAP.md.
        #[arg(long)]
        dry_run: bool,
    },

    /// Replace `{{VARIABLE}}` placeholders in template files.
    Templates {
        /// Directory containing `.claude/` and `templates/` (defaults to the current directory).
        base_dir: Option<PathBuf>,

        /// Show which files would change without writing them.
        #[arg(long)]
        dry_run: bool,

        /// Print the configured variable values.
        #[arg(short, long)]
        verbose: bool,
    },
}

fn load(path: Option<&Path>) -> anyhow::Result<Config> {
    match path {
        Some(path) => config::load_config(path),
        None if Path::new(DEFAULT_CONFIG).exists() => {
            config::load_config(Path::new(DEFAULT_CONFIG))
        }
        None => {
            tracing::debug!("{} not found; using built-in defaults", DEFAULT_CONFIG);
            Ok(Config::default())
        }
    }
}

fn progress_mode(flag: Option<&str>) -> anyhow::Result<ProgressMode> {
    match flag {
        None => Ok(ProgressMode::default_for_tty()),
        Some(value) => match ProgressMode::parse(value) {
            Some(mode) => Ok(mode),
            None => bail!("Invalid --progress '{}'. Use off, human, or json", value),
        },
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    let cli = Cli::parse();
    let cfg = load(cli.config.as_deref())?;

    match cli.command {
        Commands::Sync {
            dry_run,
            index_path,
            limit,
            json,
            progress,
        } => {
            let progress = if json && progress.is_none() {
                ProgressMode::Off
            } else {
                progress_mode(progress.as_deref())?
            };
            reconcile::run_sync(
                &cfg,
                SyncOptions {
                    dry_run,
                    index_path,
                    limit,
                    json,
                    progress,
                },
            )
            .await?;
        }
        Commands::Generate {
            output_dir,
            index_path,
            no_prefer_full,
            dry_run,
        } => {
            generate::run_generate(
                &cfg,
                GenerateOptions {
                    output_dir,
                    index_path,
                    prefer_full: !no_prefer_full,
                    dry_run,
                },
            )?;
        }
        Commands::Describe {
            index_path,
            output,
            limit,
            skip_existing,
            progress,
        } => {
            describe::run_describe(
                &cfg,
                DescribeOptions {
                    index_path,
                    output,
                    limit,
                    skip_existing,
                    progress: progress_mode(progress.as_deref())?,
                },
            )
            .await?;
        }
        Commands::Roadmap { roadmap, dry_run } => {
            roadmap::run_roadmap(&cfg, RoadmapOptions { roadmap, dry_run }).await?;
        }
        Commands::Templates {
            base_dir,
            dry_run,
            verbose,
        } => {
            templates::run_templates(
                &cfg,
                TemplateOptions {
                    base_dir: base_dir.unwrap_or_else(|| PathBuf::from(".")),
                    dry_run,
                    verbose,
                },
            )?;
        }
    }

    Ok(())
}
