//! List posts by driving load-more from the first page

use anyhow::Result;
use std::io::Write;

use crate::cms::ContentClient;
use crate::generator::Generator;
use crate::SpaceTraveling;

/// Print post summaries, loading at most `pages` pages (all when `None`)
pub async fn run(site: &SpaceTraveling, pages: Option<usize>) -> Result<()> {
    let client = site.client()?;
    let stdout = std::io::stdout();
    run_with_client(site, client, pages, &mut stdout.lock()).await
}

pub async fn run_with_client<C: ContentClient, W: Write>(
    site: &SpaceTraveling,
    client: C,
    pages: Option<usize>,
    out: &mut W,
) -> Result<()> {
    let generator = Generator::new(site, client)?;
    let dates = site.date_formatter()?;
    let controller = generator.controller().await?;

    let extra_pages = pages.map(|n| n.saturating_sub(1));
    let loads = controller.load_all(extra_pages).await?;
    tracing::debug!("Loaded {} additional pages", loads);

    let state = controller.snapshot();
    writeln!(out, "Posts ({}):", state.results.len())?;
    for post in &state.results {
        let date = dates
            .format_opt(post.first_publication_date.as_ref())
            .unwrap_or_else(|| site.locale.get("unpublished"));
        writeln!(
            out,
            "  {} - {} ({}) [{}]",
            date, post.title, post.author, post.uid
        )?;
    }
    if state.has_more() {
        writeln!(out, "  ... more posts available")?;
    }

    Ok(())
}
