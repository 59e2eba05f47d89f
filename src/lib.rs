//! # TubeFlow
//!
//! Keeps a public video-library repository consistent with a channel's
//! canonical list of published videos, without reprocessing videos that are
//! already synced or disturbing hand-edited markdown.
//!
//! ## Architecture
//!
//! ```text
//! youtube-index.json ──▶ scanner (diff) ──▶ classify ──▶ document edits ──▶ report
//!                           ▲                                  │
//!                  videos/{year}/{slug}/README.md ◀────────────┤
//!                                                              ▼
//!                                          issue tracker (close roadmap issue)
//! ```
//!
//! Pure logic (slugs, classification, line-stream document edits, issue
//! matching, rendered text) lives in the `tubeflow-core` crate. This crate
//! adds configuration, filesystem and subprocess I/O, and the commands.
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration and path/repo resolution |
//! | [`process`] | Bounded external-tool invocation |
//! | [`tracker`] | Issue tracker trait, `gh` implementation, in-memory fake |
//! | [`fetch`] | Description fetcher trait, `yt-dlp` implementation, canned fake |
//! | [`scanner`] | Already-synced detection from generated documents |
//! | [`reconcile`] | The sync run |
//! | [`progress`] | Progress reporting on stderr |
//! | [`generate`] | Bulk document generation |
//! | [`describe`] | Full-description fetching |
//! | [`roadmap`] | Roadmap labels, issues, and `ROADMAP.md` |
//! | [`templates`] | Placeholder substitution |

pub mod config;
pub mod describe;
pub mod fetch;
pub mod generate;
pub mod process;
pub mod progress;
pub mod reconcile;
pub mod roadmap;
pub mod scanner;
pub mod templates;
pub mod tracker;
