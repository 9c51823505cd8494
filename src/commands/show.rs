//! Print a single post

use anyhow::Result;
use std::io::Write;

use crate::cms::ContentClient;
use crate::generator::{is_not_found, Generator};
use crate::SpaceTraveling;

/// Print a post with its date and reading time
pub async fn run(site: &SpaceTraveling, uid: &str) -> Result<()> {
    let client = site.client()?;
    let stdout = std::io::stdout();
    run_with_client(site, client, uid, &mut stdout.lock()).await
}

pub async fn run_with_client<C: ContentClient, W: Write>(
    site: &SpaceTraveling,
    client: C,
    uid: &str,
    out: &mut W,
) -> Result<()> {
    let generator = Generator::new(site, client)?;
    let dates = site.date_formatter()?;

    let post = match generator.fetch_post(uid).await {
        Ok(post) => post,
        Err(e) if is_not_found(&e) => {
            anyhow::bail!("{}: {}", site.locale.get("not_found"), uid);
        }
        Err(e) => return Err(e),
    };

    let date = dates
        .format_opt(post.first_publication_date.as_ref())
        .unwrap_or_else(|| site.locale.get("unpublished"));

    writeln!(out, "{}", post.title)?;
    if !post.subtitle.is_empty() {
        writeln!(out, "{}", post.subtitle)?;
    }
    writeln!(
        out,
        "{} | {} | {} {}",
        date,
        post.author,
        post.reading_time(),
        site.locale.get("minutes")
    )?;
    if let Some(banner) = &post.banner {
        writeln!(out, "{}", banner.url)?;
    }
    for block in &post.content {
        writeln!(out)?;
        writeln!(out, "## {}", block.heading)?;
        for paragraph in &block.body {
            writeln!(out, "{}", paragraph.text)?;
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::tests::{site, MemoryCms};

    #[tokio::test]
    async fn test_show_post() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        let mut out = Vec::new();
        run_with_client(&site, MemoryCms::with_posts(&["a"]), "a", &mut out)
            .await
            .unwrap();

        let out = String::from_utf8(out).unwrap();
        assert_eq!(
            out,
            "Post a\nsub\n25 mar 2021 | Author | 1 min\nhttps://images.test/a.png\n\n## Intro one\ntwo three four\n"
        );
    }

    #[tokio::test]
    async fn test_show_missing_post() {
        let dir = tempfile::tempdir().unwrap();
        let site = site(dir.path());
        let mut out = Vec::new();
        let err = run_with_client(&site, MemoryCms::default(), "ghost", &mut out)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Post não encontrado: ghost");
        assert!(out.is_empty());
    }
}
