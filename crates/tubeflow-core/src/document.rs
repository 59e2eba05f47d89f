//! Anchor-based edits to hand-maintained markdown documents.
//!
//! `VIDEOS.md` and `README.md` are edited by humans between runs, so they
//! are never parsed into a model and re-rendered. Instead every edit is a
//! single pass over the lines that copies them through verbatim and emits
//! one extra line at a recognised anchor. Lines are split and re-joined on
//! `\n` only, so line endings, trailing newlines, and all unrelated content
//! come out byte-identical.
//!
//! None of these functions deduplicate. Callers must exclude videos that
//! already have a document before inserting their rows.
//!
//! When no anchor is found the input is returned unchanged. That is an
//! expected outcome for a drifted document, not an error.

use regex::{NoExpand, Regex};

/// Prefix of a markdown table header/body separator row.
pub const TABLE_SEPARATOR_PREFIX: &str = "|-------";

/// Prefix of a table row whose first cell is a link, i.e. a video row.
pub const LINKED_ROW_PREFIX: &str = "| [";

pub fn is_table_separator(line: &str) -> bool {
    line.starts_with(TABLE_SEPARATOR_PREFIX)
}

pub fn is_linked_row(line: &str) -> bool {
    line.starts_with(LINKED_ROW_PREFIX)
}

pub fn is_section_header(line: &str) -> bool {
    line.starts_with("## ")
}

/// `row` with a trailing `\r` when `document` uses CRLF line endings, so an
/// inserted row matches the lines around it.
pub fn line_terminated(document: &str, row: String) -> String {
    if document.contains("\r\n") {
        row + "\r"
    } else {
        row
    }
}

/// Insert `row` directly after the first line accepted by `anchor` whose
/// following line is accepted by `is_content`.
///
/// Requiring content after the anchor keeps an empty table (or a separator
/// at the end of the document) from capturing the insertion. At most one
/// row is inserted.
pub fn insert_row_after_anchor<A, C>(
    document: &str,
    anchor: A,
    is_content: C,
    row: &str,
) -> String
where
    A: Fn(&str) -> bool,
    C: Fn(&str) -> bool,
{
    let lines: Vec<&str> = document.split('\n').collect();
    let mut out: Vec<&str> = Vec::with_capacity(lines.len() + 1);
    let mut inserted = false;

    for (i, &line) in lines.iter().enumerate() {
        out.push(line);
        if !inserted && anchor(line) && lines.get(i + 1).is_some_and(|&next| is_content(next)) {
            out.push(row);
            inserted = true;
        }
    }

    out.join("\n")
}

/// Progress of a [`SectionScope`] through a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScopeState {
    /// The target header has not been seen (or its section ended without
    /// an anchor).
    Searching,
    /// Inside the target section, waiting for its anchor.
    InSection,
    /// The row has been placed; nothing else may change.
    Inserted,
}

/// Line-stream state machine that finds the first anchor *inside* a named
/// section.
///
/// Category sections all share the same table separator, so an anchor only
/// counts after the target header and before the next `## ` header. Leaving
/// the section resets the scope, which keeps a header without a table from
/// leaking its row into the following section.
pub struct SectionScope<'a, F> {
    header: &'a str,
    is_anchor: F,
    state: ScopeState,
}

impl<'a, F> SectionScope<'a, F>
where
    F: Fn(&str) -> bool,
{
    /// `header` is compared against each line with surrounding whitespace
    /// trimmed.
    pub fn new(header: &'a str, is_anchor: F) -> Self {
        Self {
            header: header.trim(),
            is_anchor,
            state: ScopeState::Searching,
        }
    }

    pub fn state(&self) -> ScopeState {
        self.state
    }

    /// Feed the next line. Returns `true` when the new row belongs
    /// immediately after this line; that happens at most once.
    pub fn feed(&mut self, line: &str) -> bool {
        match self.state {
            ScopeState::Inserted => false,
            _ if line.trim() == self.header => {
                self.state = ScopeState::InSection;
                false
            }
            ScopeState::InSection if (self.is_anchor)(line) => {
                self.state = ScopeState::Inserted;
                true
            }
            ScopeState::InSection if is_section_header(line) => {
                self.state = ScopeState::Searching;
                false
            }
            _ => false,
        }
    }
}

/// Insert `row` after the first anchor line inside the section introduced by
/// `section_header`. Unlike [`insert_row_after_anchor`], an empty table in
/// the section still receives the row.
pub fn insert_row_in_section<F>(
    document: &str,
    section_header: &str,
    is_anchor: F,
    row: &str,
) -> String
where
    F: Fn(&str) -> bool,
{
    let mut scope = SectionScope::new(section_header, is_anchor);
    let mut out: Vec<&str> = Vec::new();

    for line in document.split('\n') {
        out.push(line);
        if scope.feed(line) {
            out.push(row);
        }
    }

    out.join("\n")
}

/// Replace every match of `pattern` with the literal `replacement`.
///
/// Meant for fields that occur once (a running count, a year range);
/// repeated occurrences are all rewritten.
pub fn update_scalar_field(document: &str, pattern: &Regex, replacement: &str) -> String {
    pattern
        .replace_all(document, NoExpand(replacement))
        .into_owned()
}

/// Replace a generated block, or create it on first use.
///
/// If `marker` occurs in the document, the first match of `block_pattern`
/// is replaced with `block`. Otherwise the first occurrence of
/// `insert_at` is replaced with `block`, so `block` should end with the
/// `insert_at` text to keep it.
pub fn upsert_block(
    document: &str,
    marker: &str,
    block_pattern: &Regex,
    insert_at: &str,
    block: &str,
) -> String {
    if document.contains(marker) {
        block_pattern.replace(document, NoExpand(block)).into_owned()
    } else {
        document.replacen(insert_at, block, 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const INDEX: &str = "\
# Video Library

**2 videos** | **2023 - 2024**

## All Videos

| Title | Year | Category |
|-------|------|----------|
| [Old One](videos/2024/old-one) | 2024 | Docker |
| [Older](videos/2023/older) | 2023 | Tools |

## Docker & Containers

| Title | Year |
|-------|------|
| [Old One](videos/2024/old-one) | 2024 |

## Backup Solutions

| Title | Year |
|-------|------|

## Tools

| Title | Year |
|-------|------|
| [Older](videos/2023/older) | 2023 |
";

    fn lines_of(doc: &str) -> Vec<&str> {
        doc.split('\n').collect()
    }

    /// Lines strictly between `header` and the next `## ` header.
    fn section_body<'a>(doc: &'a str, header: &str) -> Vec<&'a str> {
        lines_of(doc)
            .into_iter()
            .skip_while(|l| l.trim() != header)
            .skip(1)
            .take_while(|l| !l.starts_with("## "))
            .collect()
    }

    #[test]
    fn table_row_becomes_first_content_line() {
        let doc = "| Title | Year | Category |\n|-------|------|----------|\n| [A](videos/2024/a) | 2024 | Tools |";
        let row = "| [New](videos/2024/new) | 2024 | Docker |";
        let out = insert_row_after_anchor(doc, is_table_separator, is_linked_row, row);
        assert_eq!(
            lines_of(&out),
            vec![
                "| Title | Year | Category |",
                "|-------|------|----------|",
                row,
                "| [A](videos/2024/a) | 2024 | Tools |",
            ]
        );
    }

    #[test]
    fn table_insert_only_touches_first_populated_table() {
        let row = "| [New](videos/2025/new) | 2025 | VPN |";
        let out = insert_row_after_anchor(INDEX, is_table_separator, is_linked_row, row);
        assert_eq!(out.matches(row).count(), 1);
        assert_eq!(out.len(), INDEX.len() + row.len() + 1);
        assert_eq!(section_body(&out, "## Docker & Containers"), section_body(INDEX, "## Docker & Containers"));
        assert_eq!(section_body(&out, "## Tools"), section_body(INDEX, "## Tools"));
    }

    #[test]
    fn table_insert_skips_empty_table() {
        let doc = "| A | B |\n|-------|---|\n\n| Title | Year |\n|-------|------|\n| [x](y) | 2020 |";
        let out = insert_row_after_anchor(doc, is_table_separator, is_linked_row, "| [n](m) | 2021 |");
        let lines = lines_of(&out);
        assert_eq!(lines[1], "|-------|---|");
        assert_eq!(lines[2], "");
        assert_eq!(lines[5], "| [n](m) | 2021 |");
    }

    #[test]
    fn no_anchor_returns_document_unchanged() {
        let doc = "# Nothing here\n\nJust prose.\n";
        let out = insert_row_after_anchor(doc, is_table_separator, is_linked_row, "| [x](y) |");
        assert_eq!(out, doc);
        let out = insert_row_in_section(doc, "## Docker & Containers", is_table_separator, "| [x](y) |");
        assert_eq!(out, doc);
    }

    #[test]
    fn section_insert_is_scoped_to_its_section() {
        let row = "| [Borg](videos/2025/borg) | 2025 |";
        let out = insert_row_in_section(INDEX, "## Backup Solutions", is_table_separator, row);

        assert_eq!(
            section_body(&out, "## Backup Solutions"),
            vec!["", "| Title | Year |", "|-------|------|", row, ""]
        );
        for other in ["## All Videos", "## Docker & Containers", "## Tools"] {
            assert_eq!(section_body(&out, other), section_body(INDEX, other), "{} changed", other);
        }
    }

    #[test]
    fn header_without_table_does_not_bleed_into_next_section() {
        let doc = "## Security & Authentication\n\nComing soon.\n\n## VPN & Zero Trust\n\n| Title | Year |\n|-------|------|\n| [wg](v) | 2024 |";
        let out = insert_row_in_section(doc, "## Security & Authentication", is_table_separator, "| [new](n) | 2025 |");
        assert_eq!(out, doc);
    }

    #[test]
    fn every_section_can_be_targeted_independently() {
        let headers = ["## Docker & Containers", "## Backup Solutions", "## Tools"];
        for (k, target) in headers.iter().enumerate() {
            let row = format!("| [Row {}](videos/2025/row-{}) | 2025 |", k, k);
            let out = insert_row_in_section(INDEX, target, is_table_separator, &row);
            assert_eq!(out.matches(&row).count(), 1);
            for other in headers.iter().filter(|h| *h != target) {
                assert_eq!(section_body(&out, other), section_body(INDEX, other));
            }
            // The flat table is never the target of a section insert.
            assert_eq!(section_body(&out, "## All Videos"), section_body(INDEX, "## All Videos"));
        }
    }

    #[test]
    fn successive_inserts_stack_newest_processed_on_top() {
        let first = insert_row_in_section(INDEX, "## Tools", is_table_separator, "| [First](a) | 2025 |");
        let second = insert_row_in_section(&first, "## Tools", is_table_separator, "| [Second](b) | 2025 |");
        let body = section_body(&second, "## Tools");
        assert_eq!(body[3], "| [Second](b) | 2025 |");
        assert_eq!(body[4], "| [First](a) | 2025 |");
        assert_eq!(body[5], "| [Older](videos/2023/older) | 2023 |");
    }

    #[test]
    fn section_scope_state_machine() {
        let mut scope = SectionScope::new("## Tools", is_table_separator);
        assert!(!scope.feed("|-------|------|"));
        assert_eq!(scope.state(), ScopeState::Searching);
        assert!(!scope.feed("## Tools  "));
        assert_eq!(scope.state(), ScopeState::InSection);
        assert!(!scope.feed("| Title | Year |"));
        assert!(scope.feed("|-------|------|"));
        assert_eq!(scope.state(), ScopeState::Inserted);
        assert!(!scope.feed("## Tools"));
        assert!(!scope.feed("|-------|------|"));
    }

    #[test]
    fn rows_follow_the_document_line_ending() {
        let row = "| [x](y) | 2025 |".to_string();
        assert_eq!(line_terminated("a\nb\n", row.clone()), "| [x](y) | 2025 |");
        assert_eq!(line_terminated("a\r\nb\r\n", row), "| [x](y) | 2025 |\r");
    }

    #[test]
    fn trailing_newline_and_crlf_survive() {
        let doc = "## Tools\r\n| Title | Year |\r\n|-------|------|\r\n";
        let out = insert_row_in_section(doc, "## Tools", is_table_separator, "| [x](y) | 2025 |\r");
        assert_eq!(out, "## Tools\r\n| Title | Year |\r\n|-------|------|\r\n| [x](y) | 2025 |\r\n");
    }

    #[test]
    fn scalar_fields_are_rewritten() {
        let count = Regex::new(r"\*\*\d+ videos\*\*").unwrap();
        let years = Regex::new(r"\*\*\d{4} - \d{4}\*\*").unwrap();
        let out = update_scalar_field(INDEX, &count, "**3 videos**");
        let out = update_scalar_field(&out, &years, "**2022 - 2025**");
        assert!(out.contains("**3 videos** | **2022 - 2025**"));
        assert_eq!(out.len(), INDEX.len());
    }

    #[test]
    fn scalar_replacement_is_literal() {
        let re = Regex::new(r"Total: \d+").unwrap();
        assert_eq!(update_scalar_field("Total: 4", &re, "Total: $1"), "Total: $1");
    }

    #[test]
    fn upsert_block_replaces_or_inserts() {
        let pattern = Regex::new(r"(?s)## Latest.*?---\s*\n\n## Library").unwrap();
        let block = "## Latest\n\nnew\n\n---\n\n## Library";

        let fresh = "# Home\n\n## Library\n\nrest\n";
        assert_eq!(
            upsert_block(fresh, "## Latest", &pattern, "## Library", block),
            "# Home\n\n## Latest\n\nnew\n\n---\n\n## Library\n\nrest\n"
        );

        let existing = "# Home\n\n## Latest\n\nold\n\n---\n\n## Library\n\nrest\n";
        assert_eq!(
            upsert_block(existing, "## Latest", &pattern, "## Library", block),
            "# Home\n\n## Latest\n\nnew\n\n---\n\n## Library\n\nrest\n"
        );
    }
}
