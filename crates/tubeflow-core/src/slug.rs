//! Title normalization.
//!
//! [`slugify`] produces the directory name of a generated video document and
//! the link target written into index rows, so it must be stable across
//! runs: the same title always yields the same slug.

use chrono::NaiveDate;

use crate::models::VideoRecord;

/// Upper bound on slug length, in bytes (slugs are ASCII).
pub const MAX_SLUG_LEN: usize = 60;

/// Punctuation kept by [`clean_title`] in addition to word characters and
/// whitespace.
const DISPLAY_PUNCTUATION: &str = "-|:&'\"()[],.!?/";

/// Convert a free-form title into a filesystem- and URL-safe slug.
///
/// Only ASCII letters and digits survive. Runs of whitespace, underscores,
/// and hyphens become a single hyphen; any other character is dropped
/// without separating the words around it. Slugs longer than
/// [`MAX_SLUG_LEN`] are cut back to the last hyphen inside the limit.
///
/// Never fails; a title with no ASCII alphanumerics yields `""`.
pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len().min(MAX_SLUG_LEN * 2));
    let mut pending_hyphen = false;

    for c in title.chars() {
        if c.is_ascii_alphanumeric() {
            if pending_hyphen && !slug.is_empty() {
                slug.push('-');
            }
            pending_hyphen = false;
            slug.push(c.to_ascii_lowercase());
        } else if c == '-' || c == '_' || c.is_whitespace() {
            pending_hyphen = true;
        }
    }

    if slug.len() > MAX_SLUG_LEN {
        let head = &slug[..MAX_SLUG_LEN];
        let cut = head.rfind('-').unwrap_or(MAX_SLUG_LEN);
        slug.truncate(cut);
    }

    slug
}

/// Slug for a record's document directory, falling back to the video id
/// when the title has no usable characters.
pub fn slug_for(record: &VideoRecord) -> String {
    let slug = slugify(&record.title);
    if !slug.is_empty() {
        return slug;
    }
    let slug = slugify(&record.video_id);
    if slug.is_empty() {
        "video".to_string()
    } else {
        slug
    }
}

/// [`slug_for`], or that slug suffixed with `-<slugified id>` when `taken`
/// reports it as already used in the record's year.
pub fn unique_slug<F>(record: &VideoRecord, taken: F) -> String
where
    F: Fn(&str) -> bool,
{
    let slug = slug_for(record);
    if taken(&slug) {
        format!("{}-{}", slug, slugify(&record.video_id))
    } else {
        slug
    }
}

/// Strip emoji and other decoration from a title for display.
///
/// Keeps word characters (any script), whitespace, and common punctuation;
/// collapses whitespace runs to one space and trims. Case is untouched.
pub fn clean_title(title: &str) -> String {
    let kept: String = title
        .chars()
        .filter(|c| {
            c.is_alphanumeric()
                || *c == '_'
                || c.is_whitespace()
                || DISPLAY_PUNCTUATION.contains(*c)
        })
        .collect();
    kept.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Lowercase word set of a title, as used for issue matching.
pub fn word_set(text: &str) -> std::collections::HashSet<String> {
    text.split(|c: char| !(c.is_alphanumeric() || c == '_'))
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect()
}

/// `March 2, 2024` style date for document headers.
pub fn format_date(date: NaiveDate) -> String {
    date.format("%B %-d, %Y").to_string()
}
