//! Generate static files

use anyhow::Result;

use crate::cms::ContentClient;
use crate::generator::{GenerateReport, Generator};
use crate::SpaceTraveling;

/// Generate the static site from the configured CMS
pub async fn run(site: &SpaceTraveling) -> Result<GenerateReport> {
    let client = site.client()?;
    run_with_client(site, client).await
}

/// Generate the static site from any content client
pub async fn run_with_client<C: ContentClient>(
    site: &SpaceTraveling,
    client: C,
) -> Result<GenerateReport> {
    let start = std::time::Instant::now();

    let generator = Generator::new(site, client)?;
    let report = generator.generate().await?;

    if !report.skipped.is_empty() {
        tracing::warn!(
            "Skipped {} posts that no longer exist: {}",
            report.skipped.len(),
            report.skipped.join(", ")
        );
    }

    let duration = start.elapsed();
    tracing::info!(
        "Generated {} list pages and {} posts in {:.2}s",
        report.list_pages,
        report.posts,
        duration.as_secs_f64()
    );

    Ok(report)
}
