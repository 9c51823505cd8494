//! Headless CMS access
//!
//! The rest of the crate only talks to the CMS through [`ContentClient`], so
//! generation, pagination and the preview server can run against any backend
//! that returns the v1 raw schema.

mod prismic;

use async_trait::async_trait;
use std::sync::Arc;

pub use prismic::PrismicClient;

use crate::content::{ApiResponse, RawEntry};
use crate::error::Result;

/// Options for a type query
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryOptions {
    /// Field whitelist, e.g. `post.title`; empty means every field
    pub fetch: Vec<String>,
    pub page_size: Option<usize>,
}

impl QueryOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fetch<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fetch = fields.into_iter().map(Into::into).collect();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.page_size = Some(page_size);
        self
    }
}

/// A source of CMS documents
#[async_trait]
pub trait ContentClient: Send + Sync {
    /// First page of documents of a type
    async fn get_by_type(&self, doc_type: &str, options: &QueryOptions) -> Result<ApiResponse>;

    /// A single document by uid, or [`crate::Error::NotFound`]
    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawEntry>;

    /// The page behind a next-page pointer
    async fn get_page(&self, url: &str) -> Result<ApiResponse>;
}

#[async_trait]
impl<C: ContentClient + ?Sized> ContentClient for Arc<C> {
    async fn get_by_type(&self, doc_type: &str, options: &QueryOptions) -> Result<ApiResponse> {
        (**self).get_by_type(doc_type, options).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawEntry> {
        (**self).get_by_uid(doc_type, uid).await
    }

    async fn get_page(&self, url: &str) -> Result<ApiResponse> {
        (**self).get_page(url).await
    }
}

#[async_trait]
impl<C: ContentClient + ?Sized> ContentClient for &C {
    async fn get_by_type(&self, doc_type: &str, options: &QueryOptions) -> Result<ApiResponse> {
        (**self).get_by_type(doc_type, options).await
    }

    async fn get_by_uid(&self, doc_type: &str, uid: &str) -> Result<RawEntry> {
        (**self).get_by_uid(doc_type, uid).await
    }

    async fn get_page(&self, url: &str) -> Result<ApiResponse> {
        (**self).get_page(url).await
    }
}
