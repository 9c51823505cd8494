//! spacetraveling: a static blog generator backed by a headless CMS
//!
//! Posts are fetched from a Prismic-compatible API, normalized into stable
//! records, paginated with an append-only load-more controller and rendered
//! with built-in Tera templates.

pub mod cms;
pub mod commands;
pub mod config;
pub mod content;
pub mod error;
pub mod generator;
pub mod helpers;
pub mod i18n;
pub mod pagination;
pub mod server;
pub mod templates;

pub use error::{Error, Result};

use std::path::{Path, PathBuf};

/// The main site application
#[derive(Clone)]
pub struct SpaceTraveling {
    /// Site configuration
    pub config: config::SiteConfig,
    /// Locale resolved from `language` and `i18n_dir`
    pub locale: i18n::Locale,
    /// Base directory
    pub base_dir: PathBuf,
    /// Public (output) directory
    pub public_dir: PathBuf,
}

impl SpaceTraveling {
    /// Create a new instance from a directory
    pub fn new<P: AsRef<Path>>(base_dir: P) -> anyhow::Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let config_path = base_dir.join("_config.yml");

        let config = if config_path.exists() {
            config::SiteConfig::load(&config_path)?
        } else {
            let mut config = config::SiteConfig::default();
            config.apply_env();
            config
        };

        Self::with_config(base_dir, config)
    }

    /// Create an instance from an already-loaded configuration
    pub fn with_config(base_dir: PathBuf, config: config::SiteConfig) -> anyhow::Result<Self> {
        let mut i18n = i18n::I18n::new(&config.language);
        if let Some(dir) = &config.i18n_dir {
            i18n.load_languages(base_dir.join(dir))?;
        }
        let locale = i18n.locale();
        let public_dir = base_dir.join(&config.public_dir);

        Ok(Self {
            config,
            locale,
            base_dir,
            public_dir,
        })
    }

    /// A content client for the configured CMS
    pub fn client(&self) -> Result<cms::PrismicClient> {
        cms::PrismicClient::from_config(&self.config.cms)
    }

    /// Date formatter for the configured format, locale and timezone
    pub fn date_formatter(&self) -> anyhow::Result<helpers::DateFormatter> {
        Ok(helpers::DateFormatter::new(
            &self.config.date_format,
            self.locale.clone(),
            self.config.tz()?,
        ))
    }

    /// Clean the public directory
    pub fn clean(&self) -> anyhow::Result<()> {
        commands::clean::run(self)
    }
}
