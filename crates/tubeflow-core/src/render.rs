//! Text of generated documents and of the rows inserted into `VIDEOS.md`.

use crate::models::VideoRecord;
use crate::slug::{clean_title, format_date};

/// Section heading that starts the "latest video" block in `README.md`.
pub const LATEST_MARKER: &str = "## Latest Video";

/// Heading that follows the latest-video block.
pub const LIBRARY_HEADING: &str = "## Video Library";

/// Everything from [`LATEST_MARKER`] up to and including [`LIBRARY_HEADING`].
pub const LATEST_BLOCK_PATTERN: &str = r"(?s)## Latest Video.*?---\s*\n\n## Video Library";

/// Running count in `VIDEOS.md`, e.g. `**42 videos**`.
pub const VIDEO_COUNT_PATTERN: &str = r"\*\*\d+ videos\*\*";

/// Year range in `VIDEOS.md`, e.g. `**2022 - 2024**`.
pub const YEAR_RANGE_PATTERN: &str = r"\*\*\d{4} - \d{4}\*\*";

/// Running count in `README.md`.
pub const BROWSE_COUNT_PATTERN: &str = r"Browse \d+ Published Videos";

/// Hidden back-reference carrying the video id verbatim.
pub const VIDEO_ID_MARKER_PATTERN: &str = r"<!-- video-id: (.+?) -->";

pub fn video_id_marker(video_id: &str) -> String {
    format!("<!-- video-id: {} -->", video_id)
}

pub fn video_count_field(count: usize) -> String {
    format!("**{} videos**", count)
}

pub fn year_range_field(min_year: i32, max_year: i32) -> String {
    format!("**{} - {}**", min_year, max_year)
}

pub fn browse_count_field(count: usize) -> String {
    format!("Browse {} Published Videos", count)
}

/// Relative link from the repository root to a video's directory.
pub fn video_link(videos_dir: &str, year: i32, slug: &str) -> String {
    format!("{}/{}/{}", videos_dir.trim_end_matches('/'), year, slug)
}

/// Row for the flat "All Videos" table: title, year, primary category.
pub fn index_row(record: &VideoRecord, link: &str, category: &str) -> String {
    format!(
        "| [{}]({}) | {} | {} |",
        clean_title(&record.title),
        link,
        record.year(),
        category
    )
}

/// Row for a per-category section table: title, year.
pub fn section_row(record: &VideoRecord, link: &str) -> String {
    format!("| [{}]({}) | {} |", clean_title(&record.title), link, record.year())
}

/// Body of `videos/{year}/{slug}/README.md`.
///
/// The [`video_id_marker`] line is how later runs recognise the video as
/// already synced, whatever form its URL takes.
pub fn video_readme(record: &VideoRecord, description: &str) -> String {
    format!(
        "# {title}\n\
         \n\
         {marker}\n\
         \n\
         [![Watch on YouTube](https://img.youtube.com/vi/{id}/maxresdefault.jpg)]({url})\n\
         \n\
         **Published:** {date}\n\
         \n\
         [Watch on YouTube]({url})\n\
         \n\
         ---\n\
         \n\
         ## Description\n\
         \n\
         {description}\n",
        title = clean_title(&record.title),
        marker = video_id_marker(&record.video_id),
        id = record.video_id,
        url = record.url,
        date = format_date(record.date),
        description = description,
    )
}

/// Latest-video block for `README.md`, ending with [`LIBRARY_HEADING`].
pub fn latest_block(record: &VideoRecord, link: &str) -> String {
    let title = clean_title(&record.title);
    format!(
        "{marker}\n\
         \n\
         [![{title}](https://img.youtube.com/vi/{id}/mqdefault.jpg)]({url})\n\
         \n\
         **[{title}]({link})** - [Watch on YouTube]({url})\n\
         \n\
         ---\n\
         \n\
         {library}",
        marker = LATEST_MARKER,
        title = title,
        id = record.video_id,
        url = record.url,
        link = link,
        library = LIBRARY_HEADING,
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use regex::Regex;

    fn record() -> VideoRecord {
        serde_json::from_str(
            r#"{"video_id": "abc123", "title": "🔥 Self-Hosting Nextcloud on a Raspberry Pi",
                "date": "2024-03-02", "summary": "nextcloud setup guide",
                "url": "https://example/watch?v=abc123"}"#,
        )
        .unwrap()
    }

    #[test]
    fn rows_use_clean_title() {
        let link = video_link("videos/", 2024, "self-hosting-nextcloud-on-a-raspberry-pi");
        assert_eq!(link, "videos/2024/self-hosting-nextcloud-on-a-raspberry-pi");
        assert_eq!(
            index_row(&record(), &link, "Self-Hosting"),
            "| [Self-Hosting Nextcloud on a Raspberry Pi](videos/2024/self-hosting-nextcloud-on-a-raspberry-pi) | 2024 | Self-Hosting |"
        );
        assert_eq!(
            section_row(&record(), &link),
            "| [Self-Hosting Nextcloud on a Raspberry Pi](videos/2024/self-hosting-nextcloud-on-a-raspberry-pi) | 2024 |"
        );
    }

    #[test]
    fn readme_embeds_watch_url_and_date() {
        let body = video_readme(&record(), "Full description.");
        assert!(body.starts_with("# Self-Hosting Nextcloud on a Raspberry Pi\n\n"));
        assert!(body.contains("[Watch on YouTube](https://example/watch?v=abc123)"));
        assert!(body.contains("**Published:** March 2, 2024"));
        assert!(body.ends_with("## Description\n\nFull description.\n"));
    }

    #[test]
    fn readme_marker_carries_the_raw_id() {
        let mut record = record();
        record.video_id = "ep 12/b".to_string();
        record.url = "https://youtu.be/ep12".to_string();
        let body = video_readme(&record, "");
        let re = Regex::new(VIDEO_ID_MARKER_PATTERN).unwrap();
        assert_eq!(&re.captures(&body).unwrap()[1], "ep 12/b");
    }

    #[test]
    fn latest_block_matches_its_own_pattern() {
        let block = latest_block(&record(), "videos/2024/x");
        let re = Regex::new(LATEST_BLOCK_PATTERN).unwrap();
        assert!(re.is_match(&block));
        assert!(block.ends_with(LIBRARY_HEADING));
    }

    #[test]
    fn scalar_fields_match_their_patterns() {
        assert!(Regex::new(VIDEO_COUNT_PATTERN).unwrap().is_match(&video_count_field(12)));
        assert!(Regex::new(YEAR_RANGE_PATTERN).unwrap().is_match(&year_range_field(2022, 2025)));
        assert!(Regex::new(BROWSE_COUNT_PATTERN).unwrap().is_match(&browse_count_field(7)));
    }
}
