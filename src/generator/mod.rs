//! Generator module - fetches posts from the CMS and writes static HTML

use anyhow::Result;
use std::fs;
use std::path::{Component, Path, PathBuf};

use crate::cms::{ContentClient, QueryOptions};
use crate::content::{normalize_post, Post};
use crate::helpers::{
    encode_segment, is_valid_uid, list_path, post_path, url_for, DateFormatter,
};
use crate::pagination::{LoadOutcome, PaginationController, PostPagination};
use crate::templates::{ListPageData, PostPageData, TemplateRenderer};
use crate::SpaceTraveling;

/// What a full generation produced
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerateReport {
    pub list_pages: usize,
    pub posts: usize,
    /// Uids listed by the CMS whose detail fetch came back not found
    pub skipped: Vec<String>,
}

/// Static site generator
pub struct Generator<C> {
    site: SpaceTraveling,
    client: C,
    renderer: TemplateRenderer,
    dates: DateFormatter,
}

impl<C: ContentClient> Generator<C> {
    /// Create a new generator
    pub fn new(site: &SpaceTraveling, client: C) -> Result<Self> {
        let renderer = TemplateRenderer::new(&site.config, &site.locale)?;
        let dates = site.date_formatter()?;

        Ok(Self {
            site: site.clone(),
            client,
            renderer,
            dates,
        })
    }

    pub fn renderer(&self) -> &TemplateRenderer {
        &self.renderer
    }

    pub fn public_dir(&self) -> &Path {
        &self.site.public_dir
    }

    /// Generate the entire site
    pub async fn generate(&self) -> Result<GenerateReport> {
        fs::create_dir_all(&self.site.public_dir)?;

        let mut report = GenerateReport::default();

        let pagination = self.generate_list_pages(&mut report).await?;

        for summary in &pagination.results {
            match self.generate_post(&summary.uid).await {
                Ok(_) => report.posts += 1,
                Err(e) if is_not_found(&e) => {
                    tracing::warn!("Post {:?} disappeared before it was rendered", summary.uid);
                    report.skipped.push(summary.uid.clone());
                }
                Err(e) => return Err(e),
            }
        }

        self.generate_not_found_page()?;

        Ok(report)
    }

    /// Fetch the first list page
    pub async fn first_page(&self) -> Result<PostPagination> {
        let cms = &self.site.config.cms;
        let options = QueryOptions::new()
            .fetch(cms.fetch.iter().cloned())
            .page_size(cms.page_size);
        let response = self
            .client
            .get_by_type(&cms.document_type, &options)
            .await?;
        Ok(PostPagination::from_response(&response))
    }

    /// A controller seeded with the first list page
    pub async fn controller(&self) -> Result<PaginationController<&C>> {
        let initial = self.first_page().await?;
        Ok(PaginationController::new(&self.client, initial)
            .with_timeout(self.site.config.cms.timeout()))
    }

    /// Write `index.html` and one `page/<n>/index.html` per load-more step
    ///
    /// Page n holds everything loaded after n-1 load-more actions, so the
    /// load-more link on page n-1 leads to the same list with the next page
    /// appended.
    async fn generate_list_pages(&self, report: &mut GenerateReport) -> Result<PostPagination> {
        let controller = self.controller().await?;
        let mut page = 1;

        loop {
            let state = controller.snapshot();
            self.write_list_page(page, &state)?;
            report.list_pages += 1;

            if !state.has_more() {
                break;
            }
            match controller.load_more().await? {
                LoadOutcome::Loaded { .. } => page += 1,
                outcome => {
                    tracing::debug!("Stopping list generation: {:?}", outcome);
                    break;
                }
            }
        }

        tracing::info!(
            "Listed {} posts across {} pages",
            controller.len(),
            report.list_pages
        );
        Ok(controller.snapshot())
    }

    fn write_list_page(&self, page: usize, pagination: &PostPagination) -> Result<()> {
        let next_link = Some(url_for(&self.site.config, &list_path(page + 1)));
        let data = ListPageData::new(&self.site.config, page, pagination, next_link, &self.dates);
        let html = self.renderer.render_list(&data)?;
        let output_path = self.site.public_dir.join(list_path(page)).join("index.html");
        write_file(&output_path, &html)
    }

    /// Fetch one post and write its detail page
    pub async fn generate_post(&self, uid: &str) -> Result<PathBuf> {
        let output_path = self.post_file(uid)?;
        let post = self.fetch_post(uid).await?;
        let html = self.renderer.render_post(&PostPageData::new(&post, &self.dates))?;
        write_file(&output_path, &html)?;
        Ok(output_path)
    }

    /// Fetch and normalize one post
    pub async fn fetch_post(&self, uid: &str) -> Result<Post> {
        let entry = self
            .client
            .get_by_uid(&self.site.config.cms.document_type, uid)
            .await?;
        Ok(normalize_post(&entry))
    }

    /// Delete a detail page whose post no longer exists
    pub fn remove_post(&self, uid: &str) -> Result<()> {
        let output_path = self.post_file(uid)?;
        if output_path.exists() {
            fs::remove_file(&output_path)?;
            tracing::info!("Deleted: {:?}", output_path);
        }
        Ok(())
    }

    /// Location of a post's detail page under the public directory
    pub fn post_file(&self, uid: &str) -> Result<PathBuf> {
        let segment = encode_segment(uid);
        let mut components = Path::new(&segment).components();
        let single = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !is_valid_uid(uid) || !single {
            anyhow::bail!("Refusing to map uid {:?} outside the post directory", uid);
        }
        Ok(self.site.public_dir.join(post_path(uid)).join("index.html"))
    }

    fn generate_not_found_page(&self) -> Result<()> {
        let html = self.renderer.render_not_found()?;
        write_file(&self.site.public_dir.join("404.html"), &html)
    }
}

/// Whether an application error wraps [`crate::Error::NotFound`]
pub fn is_not_found(err: &anyhow::Error) -> bool {
    err.downcast_ref::<crate::Error>()
        .is_some_and(crate::Error::is_not_found)
}

fn write_file(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .map_err(|e| anyhow::anyhow!("Failed to create dir {:?}: {}", parent, e))?;
    }
    fs::write(path, contents).map_err(|e| anyhow::anyhow!("Failed to write {:?}: {}", path, e))?;
    tracing::debug!("Generated: {:?}", path);
    Ok(())
}
