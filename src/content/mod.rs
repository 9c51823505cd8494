//! Content module - raw CMS schema, normalized posts, and the normalizer

mod normalize;
mod post;
pub mod raw;

pub use normalize::{normalize_post, normalize_summary, parse_timestamp};
pub use post::{
    reading_time, word_count, Banner, ContentBlock, Paragraph, Post, PostSummary,
    WORDS_PER_MINUTE,
};
pub use raw::v1::{ApiResponse, RawEntry};
pub use raw::SCHEMA_VERSION;
