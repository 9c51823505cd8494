//! Initialize a new site

use anyhow::Result;
use std::fs;
use std::path::Path;

/// Default `_config.yml` written by `init`
const CONFIG_TEMPLATE: &str = r#"# spacetraveling configuration

# Site
title: spacetraveling
description: ''
url: http://localhost:4000
root: /

# Locale
language: pt-BR
timezone: UTC
date_format: DD MMM YYYY
# i18n_dir: languages

# Output
public_dir: public

# Seconds before a served post page is regenerated
revalidate: 1800

# Headless CMS
cms:
  endpoint: https://your-repository.cdn.prismic.io/api/v2
  # access_token may also come from SPACETRAVELING_CMS_TOKEN
  access_token:
  document_type: post
  page_size: 1
  timeout: 10
  fetch:
    - post.title
    - post.subtitle
    - post.author
"#;

/// Initialize a new site in the given directory
pub fn init_site(target_dir: &Path) -> Result<()> {
    fs::create_dir_all(target_dir)?;

    let config_path = target_dir.join("_config.yml");
    if config_path.exists() {
        anyhow::bail!("{:?} already exists", config_path);
    }
    fs::write(&config_path, CONFIG_TEMPLATE)?;
    tracing::debug!("Wrote {:?}", config_path);

    Ok(())
}
