//! Prismic REST API v2 client

use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::time::Duration;

use super::{ContentClient, QueryOptions};
use crate::config::CmsConfig;
use crate::content::{ApiResponse, RawEntry};
use crate::error::{Error, Result};

/// Content client for a Prismic repository
#[derive(Clone)]
pub struct PrismicClient {
    endpoint: Url,
    access_token: Option<String>,
    timeout: Duration,
    client: reqwest::Client,
}

/// The subset of the API entry document we need
#[derive(Debug, Deserialize)]
struct ApiEntry {
    #[serde(default)]
    refs: Vec<ApiRef>,
}

#[derive(Debug, Deserialize)]
struct ApiRef {
    #[serde(rename = "ref")]
    reference: String,
    #[serde(rename = "isMasterRef", default)]
    is_master: bool,
}

impl PrismicClient {
    /// Create a client for an API entry point
    pub fn new(endpoint: &str, access_token: Option<String>, timeout: Duration) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| Error::InvalidUrl {
            url: endpoint.to_string(),
            reason: e.to_string(),
        })?;
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("spacetraveling/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            endpoint,
            access_token: access_token.filter(|t| !t.trim().is_empty()),
            timeout,
            client,
        })
    }

    /// Create a client from the `cms` section of the site config
    pub fn from_config(config: &CmsConfig) -> Result<Self> {
        Self::new(
            &config.endpoint,
            config.access_token.clone(),
            config.timeout(),
        )
    }

    /// Resolve a possibly relative next-page pointer against the endpoint
    pub fn resolve(&self, url: &str) -> Result<Url> {
        let mut resolved = self.endpoint.join(url).map_err(|e| Error::InvalidUrl {
            url: url.to_string(),
            reason: e.to_string(),
        })?;
        if let Some(token) = &self.access_token {
            if !resolved.query_pairs().any(|(k, _)| k == "access_token") {
                resolved.query_pairs_mut().append_pair("access_token", token);
            }
        }
        Ok(resolved)
    }

    fn search_url(&self) -> Result<Url> {
        let url = format!(
            "{}/documents/search",
            self.endpoint.as_str().trim_end_matches('/')
        );
        Url::parse(&url).map_err(|e| Error::InvalidUrl {
            url,
            reason: e.to_string(),
        })
    }

    /// Look up the master ref every query must be pinned to
    async fn master_ref(&self) -> Result<String> {
        let mut url = self.endpoint.clone();
        if let Some(token) = &self.access_token {
            url.query_pairs_mut().append_pair("access_token", token);
        }
        let entry: ApiEntry = self.get_json(url).await?;
        entry
            .refs
            .into_iter()
            .find(|r| r.is_master)
            .map(|r| r.reference)
            .ok_or_else(|| Error::InvalidUrl {
                url: self.endpoint.to_string(),
                reason: "API entry point has no master ref".to_string(),
            })
    }

    async fn search(&self, query: &str, options: &QueryOptions) -> Result<ApiResponse> {
        let master_ref = self.master_ref().await?;
        let mut url = self.search_url()?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("ref", &master_ref);
            pairs.append_pair("q", query);
            if !options.fetch.is_empty() {
                pairs.append_pair("fetch", &options.fetch.join(","));
            }
            if let Some(page_size) = options.page_size {
                pairs.append_pair("pageSize", &page_size.to_string());
            }
            if let Some(token) = &self.access_token {
                pairs.append_pair("access_token", token);
            }
        }
        self.get_json(url).await
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T> {
        let url_str = url.to_string();
        tracing::debug!("GET {}", url_str);

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| Error::from_reqwest(&url_str, self.timeout, e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::Status {
                url: url_str,
                status,
            });
        }

        let body = response
            .text()
            .await
            .map_err(|e| Error::from_reqwest(&url_str, self.timeout, e))?;
        serde_json::from_str(&body).map_err(|source| Error::Decode {
            url: url_str,
            source,
        })
    }
}

/// Prismic predicate matching a string field exactly
fn at(path: &str, value: &str) -> String {
    let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
    format!(r#"[[at({}, "{}")]]"#, path, escaped)
}

#[async_trait]
impl ContentClient for PrismicClient {
    async fn get_by_type(&self, doc_type: &str, options: &QueryOptions) -> Result<ApiResponse> {
        self.search(&at("document.type", doc_type), options).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawEntry> {
        let query = at(&format!("my.{}.uid", doc_type), uid);
        let response = self
            .search(&query, &QueryOptions::new().page_size(1))
            .await?;
        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| Error::NotFound {
                doc_type: doc_type.to_string(),
                uid: uid.to_string(),
            })
    }

    async fn get_page(&self, url: &str) -> Result<ApiResponse> {
        let url = self.resolve(url)?;
        self.get_json(url).await
    }
}
