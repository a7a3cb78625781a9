use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// An editable text block on the public site
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SiteContent {
    pub key: String,
    pub value: String,
    pub label: String,
    pub last_updated: Option<DateTime<Utc>>,
}

pub struct ContentDefault {
    pub key: &'static str,
    pub label: &'static str,
    pub value: &'static str,
}

pub const DEFAULT_CONTENT: &[ContentDefault] = &[
    ContentDefault {
        key: "hero_tagline",
        label: "Hero Tagline",
        value: "Nature, apples, and quiet moments in the Åland archipelago",
    },
    ContentDefault {
        key: "about_text",
        label: "About Öfvergårds",
        value: "Öfvergårds is a small family-run farm nestled in the beautiful Åland archipelago, between Sweden and Finland. Here, life follows the rhythm of the seasons.\n\nWe grow apples, tend to our land, and welcome visitors who seek a slower pace, a chance to reconnect with nature and experience authentic island life.",
    },
    ContentDefault {
        key: "light_in_dark_text",
        label: "Light in the Dark Description",
        value: "While most visitors come in summer, we believe there's something magical about the quieter months. When the days grow shorter and the world slows down, Åland reveals a different kind of beauty.\n\nLight in the Dark is our invitation to experience the low season: cozy gatherings, candlelit evenings, and the peacefulness that comes from truly stepping away.",
    },
    ContentDefault {
        key: "cta_text",
        label: "Call to Action Text",
        value: "When you adopt an apple tree at Öfvergårds, you're not just getting apples. You're joining our farm family and supporting sustainable, small-scale agriculture.",
    },
    ContentDefault {
        key: "experience_nourish",
        label: "Nourished by Nature Description",
        value: "Forest walks, foraging sessions, and farm-to-table meals. Let the island's natural abundance restore you.",
    },
];

pub fn default_for(key: &str) -> Option<&'static ContentDefault> {
    DEFAULT_CONTENT.iter().find(|c| c.key == key)
}

pub fn is_known_key(key: &str) -> bool {
    default_for(key).is_some()
}

/// Merges stored rows over the defaults; every known key appears exactly once.
pub fn merge_with_defaults(stored: Vec<SiteContent>) -> Vec<SiteContent> {
    DEFAULT_CONTENT
        .iter()
        .map(|default| {
            stored
                .iter()
                .find(|row| row.key == default.key)
                .cloned()
                .unwrap_or_else(|| SiteContent {
                    key: default.key.to_string(),
                    value: default.value.to_string(),
                    label: default.label.to_string(),
                    last_updated: None,
                })
        })
        .collect()
}

/// A news item for adopters' "my tree" page
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct OrchardUpdate {
    pub title: &'static str,
    pub date: &'static str,
    pub text: &'static str,
}

/// Newest first.
pub const ORCHARD_UPDATES: &[OrchardUpdate] = &[
    OrchardUpdate {
        title: "Winter Pruning Complete",
        date: "January 10, 2026",
        text: "The orchard is resting under a blanket of frost. We've finished pruning the apple trees this week, careful cuts to help them grow strong and healthy come spring.",
    },
    OrchardUpdate {
        title: "First Snow of the Season",
        date: "December 15, 2025",
        text: "Åland woke up to its first real snowfall today. The trees are dormant now, storing energy for the busy months ahead.",
    },
    OrchardUpdate {
        title: "Harvest Season Wrapped Up",
        date: "October 28, 2025",
        text: "This year's apples were crisp and sweet. Your adopted trees contributed to over 200 bottles of fresh-pressed juice.",
    },
    OrchardUpdate {
        title: "Apple Picking Has Begun",
        date: "September 15, 2025",
        text: "The Amorosa and Discovery apples are ready. We're picking by hand, making sure only the best fruit makes it to the press.",
    },
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_prefers_stored_rows() {
        let stored = vec![SiteContent {
            key: "cta_text".to_string(),
            value: "Adopt today".to_string(),
            label: "Call to Action Text".to_string(),
            last_updated: Some(Utc::now()),
        }];

        let merged = merge_with_defaults(stored);
        assert_eq!(merged.len(), DEFAULT_CONTENT.len());

        let cta = merged.iter().find(|c| c.key == "cta_text").unwrap();
        assert_eq!(cta.value, "Adopt today");

        let hero = merged.iter().find(|c| c.key == "hero_tagline").unwrap();
        assert!(hero.last_updated.is_none());
    }

    #[test]
    fn test_known_keys() {
        assert!(is_known_key("about_text"));
        assert!(!is_known_key("footer"));
    }
}
