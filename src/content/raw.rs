//! Raw CMS payloads
//!
//! This is the only place that knows the CMS wire shape. Every field is
//! optional and tolerant of the wrong JSON type, so a single malformed entry
//! deserializes to empty fields instead of failing the whole page.

/// Version of the raw schema understood by the normalizer
pub const SCHEMA_VERSION: u32 = 1;

pub mod v1 {
    use serde::{Deserialize, Deserializer};
    use serde_json::Value;

    /// A page of documents, as returned by a type query or a next-page URL
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct ApiResponse {
        #[serde(deserialize_with = "lenient_u64")]
        pub page: Option<u64>,
        #[serde(deserialize_with = "lenient_u64")]
        pub results_per_page: Option<u64>,
        #[serde(deserialize_with = "lenient_u64")]
        pub results_size: Option<u64>,
        #[serde(deserialize_with = "lenient_u64")]
        pub total_pages: Option<u64>,
        #[serde(deserialize_with = "lenient_string")]
        pub next_page: Option<String>,
        #[serde(deserialize_with = "lenient_vec")]
        pub results: Vec<RawEntry>,
    }

    /// One document
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct RawEntry {
        #[serde(deserialize_with = "lenient_string")]
        pub id: Option<String>,
        #[serde(deserialize_with = "lenient_string")]
        pub uid: Option<String>,
        #[serde(rename = "type", deserialize_with = "lenient_string")]
        pub doc_type: Option<String>,
        #[serde(deserialize_with = "lenient_string")]
        pub first_publication_date: Option<String>,
        #[serde(deserialize_with = "lenient_string")]
        pub last_publication_date: Option<String>,
        #[serde(deserialize_with = "lenient_struct")]
        pub data: RawPostData,
    }

    /// The `data` object of a post document
    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct RawPostData {
        #[serde(deserialize_with = "lenient_string")]
        pub title: Option<String>,
        #[serde(deserialize_with = "lenient_string")]
        pub subtitle: Option<String>,
        #[serde(deserialize_with = "lenient_string")]
        pub author: Option<String>,
        #[serde(deserialize_with = "lenient_struct")]
        pub banner: RawBanner,
        #[serde(deserialize_with = "lenient_vec")]
        pub content: Vec<RawContentBlock>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct RawBanner {
        #[serde(deserialize_with = "lenient_string")]
        pub url: Option<String>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct RawContentBlock {
        #[serde(deserialize_with = "lenient_string")]
        pub heading: Option<String>,
        #[serde(deserialize_with = "lenient_vec")]
        pub body: Vec<RawParagraph>,
    }

    #[derive(Debug, Clone, Default, Deserialize)]
    #[serde(default)]
    pub struct RawParagraph {
        #[serde(deserialize_with = "lenient_string")]
        pub text: Option<String>,
    }

    fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::String(s) => Some(s),
            _ => None,
        })
    }

    fn lenient_u64<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
    where
        D: Deserializer<'de>,
    {
        Ok(Value::deserialize(deserializer)?.as_u64())
    }

    fn lenient_struct<'de, D, T>(deserializer: D) -> Result<T, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned + Default,
    {
        let value = Value::deserialize(deserializer)?;
        Ok(serde_json::from_value(value).unwrap_or_default())
    }

    /// Non-array values become empty; array items that are not objects are dropped
    fn lenient_vec<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
    where
        D: Deserializer<'de>,
        T: serde::de::DeserializeOwned,
    {
        Ok(match Value::deserialize(deserializer)? {
            Value::Array(items) => items
                .into_iter()
                .filter(Value::is_object)
                .filter_map(|item| serde_json::from_value(item).ok())
                .collect(),
            _ => Vec::new(),
        })
    }
}
