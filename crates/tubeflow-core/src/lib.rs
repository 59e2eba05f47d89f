//! # TubeFlow Core
//!
//! Pure logic for TubeFlow: video record models, slug and title
//! normalization, keyword classification, and the line-oriented markdown
//! transducer that inserts rows into hand-maintained documents.
//!
//! This crate performs no filesystem, process, or network I/O. Everything
//! here is a function of its inputs, which keeps the reconciliation rules
//! testable in isolation from the `tubeflow` CLI.

pub mod classify;
pub mod document;
pub mod matching;
pub mod models;
pub mod render;
pub mod slug;
