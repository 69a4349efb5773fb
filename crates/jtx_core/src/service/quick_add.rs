//! Quick-add text parsing and entry composition.
//!
//! # Responsibility
//! - Split free text into summary, description, url and hashtag categories.
//! - Build a ready-to-store entry for the selected module and collection.
//!
//! # Invariants
//! - The summary comes from the first line only, without hashtags or the url.
//! - Categories keep first-appearance order and are deduplicated.

use crate::config::TodoDefaults;
use crate::model::ical_object::{ICalObject, Module};
use crate::model::property::{Attachment, Category};
use crate::repo::ical_repo::NewEntry;
use once_cell::sync::Lazy;
use regex::Regex;

static URL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"https?://[^\s<>]+").expect("valid url regex"));
static HASHTAG_TOKEN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:^|\s)#\w+").expect("valid hashtag token regex"));
static WHITESPACE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").expect("valid ws regex"));

/// Structured fields extracted from quick-add text.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ParsedQuickAdd {
    pub summary: Option<String>,
    pub description: Option<String>,
    pub url: Option<String>,
    pub categories: Vec<Category>,
}

/// Parses free text typed or dictated into the quick-add field.
pub fn parse_quick_add(text: &str) -> ParsedQuickAdd {
    let text = text.trim();
    if text.is_empty() {
        return ParsedQuickAdd::default();
    }

    let url = URL_RE.find(text).map(|m| m.as_str().to_string());
    let (first_line, rest) = match text.split_once('\n') {
        Some((first, rest)) => (first, Some(rest)),
        None => (text, None),
    };

    let mut summary_source = first_line.to_string();
    if let Some(url) = url.as_deref() {
        summary_source = summary_source.replace(url, " ");
    }
    let without_tags = HASHTAG_TOKEN_RE.replace_all(&summary_source, " ");
    let summary = WHITESPACE_RE.replace_all(&without_tags, " ").trim().to_string();

    let description = rest
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string);

    ParsedQuickAdd {
        summary: (!summary.is_empty()).then_some(summary),
        description,
        url,
        categories: Category::extract_hashtags_from_text(text),
    }
}

/// Builds the entry saved by quick-add.
///
/// Returns `None` for blank text.
pub fn compose_entry(
    module: Module,
    collection_id: i64,
    text: &str,
    attachment: Option<Attachment>,
    todo_defaults: TodoDefaults,
    now_ms: i64,
) -> Option<NewEntry> {
    if text.trim().is_empty() {
        return None;
    }

    let parsed = parse_quick_add(text);
    let mut object = ICalObject::for_module(module, now_ms);
    object.apply_todo_defaults(todo_defaults.start_in_days, todo_defaults.due_in_days);
    object.collection_id = collection_id;
    object.summary = parsed.summary;
    object.description = parsed.description;
    object.url = parsed.url;

    Some(NewEntry {
        object,
        categories: parsed.categories,
        attachment,
    })
}
