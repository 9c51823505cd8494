//! Built-in site templates using the Tera template engine
//!
//! Templates are embedded in the binary and registered under `.html` names,
//! so Tera autoescapes every interpolated value. Only links built by the url
//! helpers (`site.root`, `post.path`, `list.next_link`) are marked `safe`.

use anyhow::Result;
use serde::Serialize;
use std::collections::HashMap;
use tera::{Context, Tera};

use crate::config::SiteConfig;
use crate::content::{ContentBlock, Post, PostSummary};
use crate::helpers::{date_xml, post_path, url_for, DateFormatter};
use crate::i18n::Locale;
use crate::pagination::PostPagination;

/// Seconds the fallback page waits before reloading
const FALLBACK_REFRESH: u64 = 2;

/// Template renderer with the embedded site theme
pub struct TemplateRenderer {
    tera: Tera,
    site: SiteData,
    strings: HashMap<String, String>,
}

impl TemplateRenderer {
    /// Create a new renderer with all templates loaded
    pub fn new(config: &SiteConfig, locale: &Locale) -> Result<Self> {
        let mut tera = Tera::default();
        tera.autoescape_on(vec![".html"]);

        tera.add_raw_templates(vec![
            ("layout.html", include_str!("site/layout.html")),
            ("index.html", include_str!("site/index.html")),
            ("post.html", include_str!("site/post.html")),
            ("fallback.html", include_str!("site/fallback.html")),
            ("not_found.html", include_str!("site/not_found.html")),
            ("error.html", include_str!("site/error.html")),
            (
                "partials/header.html",
                include_str!("site/partials/header.html"),
            ),
        ])?;

        Ok(Self {
            tera,
            site: SiteData {
                title: config.title.clone(),
                description: config.description.clone(),
                root: url_for(config, ""),
                language: locale.tag.clone(),
            },
            strings: locale.strings().clone(),
        })
    }

    /// Render a template with given context
    pub fn render(&self, template_name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(template_name, context)?)
    }

    fn base_context(&self) -> Context {
        let mut context = Context::new();
        context.insert("site", &self.site);
        context.insert("t", &self.strings);
        context
    }

    /// Render an accumulated list page
    pub fn render_list(&self, list: &ListPageData) -> Result<String> {
        let mut context = self.base_context();
        context.insert("list", list);
        self.render("index.html", &context)
    }

    /// Render a post detail page
    pub fn render_post(&self, post: &PostPageData) -> Result<String> {
        let mut context = self.base_context();
        context.insert("post", post);
        self.render("post.html", &context)
    }

    /// Page shown while a detail page is being generated
    pub fn render_fallback(&self) -> Result<String> {
        let mut context = self.base_context();
        context.insert("refresh", &FALLBACK_REFRESH);
        self.render("fallback.html", &context)
    }

    pub fn render_not_found(&self) -> Result<String> {
        self.render("not_found.html", &self.base_context())
    }

    pub fn render_error(&self) -> Result<String> {
        self.render("error.html", &self.base_context())
    }
}

/// Data structures for template context

#[derive(Debug, Clone, Serialize)]
pub struct SiteData {
    pub title: String,
    pub description: String,
    pub root: String,
    pub language: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct PostCardData {
    pub uid: String,
    pub path: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
}

impl PostCardData {
    pub fn new(config: &SiteConfig, post: &PostSummary, dates: &DateFormatter) -> Self {
        Self {
            uid: post.uid.clone(),
            path: url_for(config, &post_path(&post.uid)),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: dates.format_opt(post.first_publication_date.as_ref()),
            datetime: post.first_publication_date.as_ref().map(date_xml),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ListPageData {
    pub page: usize,
    pub posts: Vec<PostCardData>,
    /// Link to the next accumulated page, absent once the list is exhausted
    pub next_link: Option<String>,
}

impl ListPageData {
    pub fn new(
        config: &SiteConfig,
        page: usize,
        pagination: &PostPagination,
        next_link: Option<String>,
        dates: &DateFormatter,
    ) -> Self {
        Self {
            page,
            posts: pagination
                .results
                .iter()
                .map(|p| PostCardData::new(config, p, dates))
                .collect(),
            next_link: next_link.filter(|_| pagination.has_more()),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PostPageData {
    pub uid: String,
    pub title: String,
    pub subtitle: String,
    pub author: String,
    pub date: Option<String>,
    pub datetime: Option<String>,
    pub banner: Option<String>,
    pub reading_time: usize,
    pub content: Vec<ContentBlock>,
}

impl PostPageData {
    pub fn new(post: &Post, dates: &DateFormatter) -> Self {
        Self {
            uid: post.uid.clone(),
            title: post.title.clone(),
            subtitle: post.subtitle.clone(),
            author: post.author.clone(),
            date: dates.format_opt(post.first_publication_date.as_ref()),
            datetime: post.first_publication_date.as_ref().map(date_xml),
            banner: post.banner.as_ref().map(|b| b.url.clone()),
            reading_time: post.reading_time(),
            content: post.content.clone(),
        }
    }
}
