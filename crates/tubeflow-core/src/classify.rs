//! Keyword classification of videos into library categories.
//!
//! A [`CategoryMap`] is an *ordered* list of categories. Order is priority:
//! the first category whose keywords match becomes the primary category,
//! so precedence is tuned by reordering configuration rather than by
//! counting hits.

use serde::{Deserialize, Serialize};

/// One library category and the markdown section it owns in `VIDEOS.md`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub name: String,
    /// Section header line, e.g. `## Docker & Containers`.
    pub section: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

impl Category {
    pub fn new(name: &str, section: &str, keywords: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            section: section.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CategoryMapError {
    #[error("category map is empty")]
    Empty,
    #[error("duplicate category name: '{0}'")]
    Duplicate(String),
    #[error("fallback category '{0}' is not one of the configured categories")]
    UnknownFallback(String),
}

/// Ordered category → keywords mapping plus the catch-all category.
#[derive(Debug, Clone)]
pub struct CategoryMap {
    entries: Vec<Category>,
    fallback: String,
}

impl CategoryMap {
    /// Build a map, lowercasing keywords. The fallback must name one of the
    /// entries.
    pub fn new(
        entries: Vec<Category>,
        fallback: impl Into<String>,
    ) -> Result<Self, CategoryMapError> {
        let fallback = fallback.into();
        if entries.is_empty() {
            return Err(CategoryMapError::Empty);
        }
        for (i, entry) in entries.iter().enumerate() {
            if entries[..i].iter().any(|e| e.name == entry.name) {
                return Err(CategoryMapError::Duplicate(entry.name.clone()));
            }
        }
        if !entries.iter().any(|e| e.name == fallback) {
            return Err(CategoryMapError::UnknownFallback(fallback));
        }

        let entries = entries
            .into_iter()
            .map(|mut e| {
                e.keywords = e
                    .keywords
                    .iter()
                    .map(|k| k.to_lowercase())
                    .filter(|k| !k.is_empty())
                    .collect();
                e
            })
            .collect();

        Ok(Self { entries, fallback })
    }

    /// The stock homelab/self-hosting categories.
    pub fn builtin() -> Self {
        let entries = vec![
            Category::new(
                "Self-Hosting",
                "## Self-Hosting",
                &["self-host", "nextcloud", "immich", "home server", "homelab"],
            ),
            Category::new(
                "Security",
                "## Security & Authentication",
                &["authentik", "security", "2fa", "password", "firewall", "ssh"],
            ),
            Category::new(
                "VPN",
                "## VPN & Zero Trust",
                &["vpn", "wireguard", "tailscale", "zero trust", "tunnel"],
            ),
            Category::new(
                "Docker",
                "## Docker & Containers",
                &["docker", "container", "compose", "kubernetes", "k8s"],
            ),
            Category::new(
                "Backup",
                "## Backup Solutions",
                &["backup", "borg", "restic", "migration", "restore"],
            ),
            Category::new(
                "Automation",
                "## Automation",
                &["automation", "ansible", "n8n", "automate", "workflow"],
            ),
            Category::new(
                "Monitoring",
                "## Monitoring & Analytics",
                &["monitoring", "uptime", "analytics", "observability", "logs"],
            ),
            Category::new(
                "AI",
                "## AI & Machine Learning",
                &["ai", "llm", "openwebui", "ollama", "machine learning"],
            ),
            Category::new("Tools", "## Tools", &[]),
        ];
        Self {
            entries,
            fallback: "Tools".to_string(),
        }
    }

    pub fn entries(&self) -> &[Category] {
        &self.entries
    }

    pub fn fallback(&self) -> &str {
        &self.fallback
    }

    /// Section header for a category; unknown names resolve to the
    /// fallback category's section.
    pub fn section_for(&self, name: &str) -> &str {
        self.entries
            .iter()
            .find(|e| e.name == name)
            .or_else(|| self.entries.iter().find(|e| e.name == self.fallback))
            .map(|e| e.section.as_str())
            .unwrap_or("## Tools")
    }
}

/// Result of classifying one video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Classification {
    /// Used for the flat "All Videos" table.
    pub primary: String,
    /// Every matching category in map order; each gets a section row.
    pub matched: Vec<String>,
}

/// Classify a video by substring keyword match over `title + " " + summary`.
///
/// With no match both `primary` and `matched` resolve to the fallback.
pub fn classify(title: &str, summary: &str, map: &CategoryMap) -> Classification {
    let text = format!("{} {}", title, summary).to_lowercase();

    let matched: Vec<String> = map
        .entries
        .iter()
        .filter(|c| c.keywords.iter().any(|kw| text.contains(kw.as_str())))
        .map(|c| c.name.clone())
        .collect();

    match matched.first() {
        Some(primary) => Classification {
            primary: primary.clone(),
            matched,
        },
        None => Classification {
            primary: map.fallback.clone(),
            matched: vec![map.fallback.clone()],
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_map() -> CategoryMap {
        CategoryMap::new(
            vec![
                Category::new("Self-Hosting", "## Self-Hosting", &["nextcloud"]),
                Category::new("Tools", "## Tools", &[]),
            ],
            "Tools",
        )
        .unwrap()
    }

    #[test]
    fn single_match_is_primary() {
        let c = classify(
            "Self-Hosting Nextcloud on a Raspberry Pi",
            "nextcloud setup guide",
            &small_map(),
        );
        assert_eq!(c.primary, "Self-Hosting");
        assert_eq!(c.matched, vec!["Self-Hosting"]);
    }

    #[test]
    fn no_match_resolves_to_fallback() {
        let c = classify("Terminal tricks", "", &small_map());
        assert_eq!(c.primary, "Tools");
        assert_eq!(c.matched, vec!["Tools"]);
    }

    #[test]
    fn primary_follows_map_order_not_hit_count() {
        // Three Docker keywords, one Security keyword: Security is earlier.
        let c = classify(
            "Docker Compose on Kubernetes",
            "hardening ssh access",
            &CategoryMap::builtin(),
        );
        assert_eq!(c.primary, "Security");
        assert_eq!(c.matched, vec!["Security", "Docker"]);
    }

    #[test]
    fn matched_list_preserves_map_order() {
        let c = classify(
            "Restic backups of my Nextcloud over WireGuard",
            "",
            &CategoryMap::builtin(),
        );
        assert_eq!(c.matched, vec!["Self-Hosting", "VPN", "Backup"]);
        assert_eq!(c.primary, "Self-Hosting");
    }

    #[test]
    fn keywords_are_case_insensitive() {
        let map = CategoryMap::new(
            vec![
                Category::new("VPN", "## VPN", &["WireGuard"]),
                Category::new("Tools", "## Tools", &[]),
            ],
            "Tools",
        )
        .unwrap();
        assert_eq!(classify("wireguard in 5 minutes", "", &map).primary, "VPN");
    }

    #[test]
    fn fallback_must_be_an_entry() {
        let err = CategoryMap::new(
            vec![Category::new("VPN", "## VPN", &["vpn"])],
            "Tools",
        )
        .unwrap_err();
        assert_eq!(err, CategoryMapError::UnknownFallback("Tools".into()));
    }

    #[test]
    fn duplicate_names_are_rejected() {
        let err = CategoryMap::new(
            vec![
                Category::new("VPN", "## VPN", &["vpn"]),
                Category::new("VPN", "## VPN 2", &["tunnel"]),
            ],
            "VPN",
        )
        .unwrap_err();
        assert_eq!(err, CategoryMapError::Duplicate("VPN".into()));
    }

    #[test]
    fn section_lookup_falls_back() {
        let map = CategoryMap::builtin();
        assert_eq!(map.section_for("Docker"), "## Docker & Containers");
        assert_eq!(map.section_for("Nonexistent"), "## Tools");
    }
}
