//! Matching published videos to open roadmap issues.
//!
//! The rule is asymmetric: an issue matches when at least half of *its*
//! words appear in the video title. Short issue titles ("Immich setup")
//! match generously, while long generic ones need real overlap.

use crate::slug::word_set;

/// Fraction of issue-title words that must appear in the video title.
pub const MIN_ISSUE_COVERAGE: f64 = 0.5;

/// Maximum number of characters of the cleaned title used as a search query.
pub const SEARCH_TERM_CHARS: usize = 40;

/// Search query for a video: the leading characters of its cleaned title.
pub fn search_terms(clean_title: &str) -> String {
    clean_title.chars().take(SEARCH_TERM_CHARS).collect()
}

/// Fraction of the issue title's words present in the video title, or
/// `None` when the issue title has no words.
pub fn issue_coverage(video_title: &str, issue_title: &str) -> Option<f64> {
    let issue_words = word_set(issue_title);
    if issue_words.is_empty() {
        return None;
    }
    let title_words = word_set(video_title);
    let overlap = issue_words.intersection(&title_words).count();
    Some(overlap as f64 / issue_words.len() as f64)
}

pub fn issue_matches(video_title: &str, issue_title: &str) -> bool {
    issue_coverage(video_title, issue_title).is_some_and(|c| c >= MIN_ISSUE_COVERAGE)
}

/// First candidate, in the given order, whose title matches.
pub fn first_match<'a, T, F>(video_title: &str, candidates: &'a [T], title_of: F) -> Option<&'a T>
where
    F: Fn(&T) -> &str,
{
    candidates
        .iter()
        .find(|c| issue_matches(video_title, title_of(*c)))
}
