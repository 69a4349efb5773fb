//! Property records attached to one object.
//!
//! # Invariants
//! - Every record carries the owning `icalobject_id`; storage cascades
//!   deletes from the owner.
//! - Category names are trimmed and compared case-insensitively.

use super::ical_object::ICalObjectId;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

static HASHTAG_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)#(\w+)").expect("valid hashtag regex"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    pub id: i64,
    pub icalobject_id: ICalObjectId,
    pub text: String,
}

impl Category {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            id: 0,
            icalobject_id: 0,
            text: text.into(),
        }
    }

    /// Collects `#hashtag` words from free text as categories.
    ///
    /// Order of first appearance is kept; duplicates (ignoring ASCII case)
    /// are dropped.
    pub fn extract_hashtags_from_text(text: &str) -> Vec<Category> {
        let mut seen = HashSet::new();
        HASHTAG_RE
            .captures_iter(text)
            .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
            .filter(|tag| seen.insert(tag.to_ascii_lowercase()))
            .map(Category::new)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: i64,
    pub icalobject_id: ICalObjectId,
    /// Calendar user address, usually `mailto:`.
    pub caladdress: String,
    pub cn: Option<String>,
    pub role: Option<String>,
    pub partstat: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Comment {
    pub id: i64,
    pub icalobject_id: ICalObjectId,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Organizer {
    pub id: i64,
    pub icalobject_id: ICalObjectId,
    pub caladdress: String,
    pub cn: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Resource {
    pub id: i64,
    pub icalobject_id: ICalObjectId,
    pub text: String,
    pub reltype: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attachment {
    pub id: i64,
    pub icalobject_id: ICalObjectId,
    pub uri: Option<String>,
    pub filename: Option<String>,
    pub fmttype: Option<String>,
}

impl Attachment {
    pub fn from_uri(uri: impl Into<String>) -> Self {
        Self {
            id: 0,
            icalobject_id: 0,
            uri: Some(uri.into()),
            filename: None,
            fmttype: None,
        }
    }
}

/// Relation kind between two objects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RelType {
    Parent,
    Child,
    Sibling,
}

impl RelType {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Parent => "PARENT",
            Self::Child => "CHILD",
            Self::Sibling => "SIBLING",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "PARENT" => Some(Self::Parent),
            "CHILD" => Some(Self::Child),
            "SIBLING" => Some(Self::Sibling),
            _ => None,
        }
    }
}

/// Typed edge from `icalobject_id` to `linked_icalobject_id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relatedto {
    pub id: i64,
    pub icalobject_id: ICalObjectId,
    pub linked_icalobject_id: ICalObjectId,
    pub reltype: RelType,
    /// Uid of the linked object.
    pub text: String,
}

#[cfg(test)]
mod tests {
    use super::Category;

    #[test]
    fn hashtags_keep_order_and_drop_duplicates() {
        let tags = Category::extract_hashtags_from_text("#work call Bob #Home #work");
        let names: Vec<_> = tags.iter().map(|tag| tag.text.as_str()).collect();
        assert_eq!(names, vec!["work", "Home"]);
    }

    #[test]
    fn hashtags_ignore_url_fragments() {
        let tags = Category::extract_hashtags_from_text("see https://example.com/#anchor");
        assert!(tags.is_empty());
    }
}
