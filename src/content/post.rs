//! Normalized post models

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Reading speed used for reading-time estimates
pub const WORDS_PER_MINUTE: usize = 200;

/// A post as shown in the list view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostSummary {
    /// Stable identifier assigned by the CMS
    pub uid: String,

    /// First publication date, absent if never published
    pub first_publication_date: Option<DateTime<Utc>>,

    pub title: String,
    pub subtitle: String,
    pub author: String,
}

/// A post as shown in the detail view
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Post {
    pub uid: String,
    pub first_publication_date: Option<DateTime<Utc>>,
    pub last_publication_date: Option<DateTime<Utc>>,
    pub title: String,
    pub subtitle: String,
    pub author: String,

    /// Cover image
    pub banner: Option<Banner>,

    /// Article blocks in reading order
    pub content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Banner {
    pub url: String,
}

/// A section of an article: a heading followed by paragraphs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContentBlock {
    pub heading: String,
    pub body: Vec<Paragraph>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Paragraph {
    pub text: String,
}

impl Post {
    /// Total words across every heading and paragraph
    pub fn word_count(&self) -> usize {
        word_count(&self.content)
    }

    /// Estimated reading time in minutes
    pub fn reading_time(&self) -> usize {
        reading_time(&self.content)
    }
}

/// Count whitespace-separated words in every heading and paragraph
pub fn word_count(content: &[ContentBlock]) -> usize {
    content
        .iter()
        .map(|block| {
            block.heading.split_whitespace().count()
                + block
                    .body
                    .iter()
                    .map(|p| p.text.split_whitespace().count())
                    .sum::<usize>()
        })
        .sum()
}

/// Minutes needed to read `content` at [`WORDS_PER_MINUTE`]
///
/// Computed as `ceil(words / 200)`. Empty content reads in zero minutes.
/// Content with at least one block reads in at least one minute, even when
/// its blocks hold no words.
pub fn reading_time(content: &[ContentBlock]) -> usize {
    if content.is_empty() {
        return 0;
    }
    word_count(content).div_ceil(WORDS_PER_MINUTE).max(1)
}
