//! Data models shared by every TubeFlow command.
//!
//! [`VideoIndex`] is the canonical source of truth (`youtube-index.json`).
//! Unknown fields survive a read/write cycle so that commands which rewrite
//! the index (e.g. description fetching) never drop data they don't model.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};

/// One published video. Identity is `video_id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VideoRecord {
    pub video_id: String,
    pub title: String,
    /// Publish date, ISO `YYYY-MM-DD` on the wire.
    pub date: NaiveDate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    pub url: String,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VideoRecord {
    pub fn year(&self) -> i32 {
        self.date.year()
    }

    /// Summary text, empty when the source has none.
    pub fn summary_text(&self) -> &str {
        self.summary.as_deref().unwrap_or("")
    }
}

/// The canonical video list, expected newest-first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VideoIndex {
    pub videos: Vec<VideoRecord>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl VideoIndex {
    pub fn from_json(text: &str) -> serde_json::Result<Self> {
        serde_json::from_str(text)
    }

    /// True when every record is dated no later than the one before it.
    pub fn is_newest_first(&self) -> bool {
        self.videos.windows(2).all(|w| w[0].date >= w[1].date)
    }

    /// Stable sort by date, newest first. Records sharing a date keep
    /// their source order.
    pub fn sort_newest_first(&mut self) {
        self.videos.sort_by(|a, b| b.date.cmp(&a.date));
    }

    /// `(min_year, max_year)` over all records, `None` for an empty index.
    pub fn year_range(&self) -> Option<(i32, i32)> {
        let min = self.videos.iter().map(VideoRecord::year).min()?;
        let max = self.videos.iter().map(VideoRecord::year).max()?;
        Some((min, max))
    }
}

// ── Roadmap ──────────────────────────────────────────────────────────

/// Planned videos published as voteable issues (`roadmap.json`).
#[derive(Debug, Clone, Deserialize)]
pub struct RoadmapData {
    pub categories: Vec<RoadmapCategory>,
    #[serde(rename = "complexityLabels", default)]
    pub complexity_labels: Vec<ComplexityLabel>,
    pub videos: Vec<RoadmapItem>,
    #[serde(rename = "lastUpdated", default)]
    pub last_updated: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoadmapCategory {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub name: String,
    pub label: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ComplexityLabel {
    pub id: String,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoadmapItem {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    pub title: String,
    /// Id of a [`RoadmapCategory`], written as a string or a number.
    #[serde(default, deserialize_with = "optional_string_or_number")]
    pub category: Option<String>,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub series: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(rename = "seriesInfo", default)]
    pub series_info: Option<String>,
}

fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::String(s) => Ok(s),
        Value::Number(n) => Ok(n.to_string()),
        other => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}

fn optional_string_or_number<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<Value>::deserialize(deserializer)? {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s)),
        Some(Value::Number(n)) => Ok(Some(n.to_string())),
        Some(other) => Err(serde::de::Error::custom(format!(
            "expected string or number id, got {}",
            other
        ))),
    }
}
