//! Raw CMS entries to normalized posts

use chrono::{DateTime, Utc};

use super::raw::v1::{RawContentBlock, RawEntry};
use super::{Banner, ContentBlock, Paragraph, Post, PostSummary};

/// Normalize an entry into its list-view shape
pub fn normalize_summary(entry: &RawEntry) -> PostSummary {
    PostSummary {
        uid: entry_uid(entry),
        first_publication_date: parse_timestamp(entry.first_publication_date.as_deref()),
        title: required(&entry.data.title, "title", entry),
        subtitle: entry.data.subtitle.clone().unwrap_or_default(),
        author: required(&entry.data.author, "author", entry),
    }
}

/// Normalize an entry into its detail-view shape
pub fn normalize_post(entry: &RawEntry) -> Post {
    let summary = normalize_summary(entry);
    let banner = entry
        .data
        .banner
        .url
        .as_ref()
        .filter(|url| !url.trim().is_empty())
        .map(|url| Banner { url: url.clone() });

    Post {
        uid: summary.uid,
        first_publication_date: summary.first_publication_date,
        last_publication_date: parse_timestamp(entry.last_publication_date.as_deref()),
        title: summary.title,
        subtitle: summary.subtitle,
        author: summary.author,
        banner,
        content: entry.data.content.iter().map(normalize_block).collect(),
    }
}

fn normalize_block(block: &RawContentBlock) -> ContentBlock {
    ContentBlock {
        heading: block.heading.clone().unwrap_or_default(),
        body: block
            .body
            .iter()
            .map(|p| Paragraph {
                text: p.text.clone().unwrap_or_default(),
            })
            .collect(),
    }
}

/// The entry's uid, or its document id when the type has no uid field
fn entry_uid(entry: &RawEntry) -> String {
    entry
        .uid
        .clone()
        .or_else(|| entry.id.clone())
        .unwrap_or_default()
}

fn required(value: &Option<String>, field: &str, entry: &RawEntry) -> String {
    match value {
        Some(v) => v.clone(),
        None => {
            tracing::warn!(
                "Entry {:?} has no usable `{}`, using an empty string",
                entry.uid.as_deref().or(entry.id.as_deref()).unwrap_or("?"),
                field
            );
            String::new()
        }
    }
}

/// Parse a CMS timestamp, accepting both `+00:00` and `+0000` offsets
pub fn parse_timestamp(value: Option<&str>) -> Option<DateTime<Utc>> {
    let value = value?.trim();
    if value.is_empty() {
        return None;
    }
    let parsed = DateTime::parse_from_rfc3339(value)
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%z"))
        .or_else(|_| DateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f%z"));
    match parsed {
        Ok(date) => Some(date.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!("Ignoring unparseable timestamp {:?}: {}", value, e);
            None
        }
    }
}
