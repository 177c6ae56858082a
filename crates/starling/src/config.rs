use std::path::Path;
use std::{fs, io};

use chrono_tz::Tz;
use serde::Deserialize;
use thiserror::Error;

use crate::analytics::SiteId;
use crate::content::{Locale, DEFAULT_ARTICLES_PER_PAGE};

/// The configuration for a site.
#[derive(Debug, Clone)]
pub struct SiteConfig {
    /// The base URL of the site, used to build canonical article URLs.
    pub base_url: String,

    /// The site whose analytics settings apply to rendered pages.
    pub site_id: SiteId,

    /// The number of articles per listing page.
    pub articles_per_page: usize,

    /// The language used when an index does not say otherwise.
    pub default_language: Locale,

    /// The timezone publish dates are displayed in.
    pub timezone: Tz,
}

impl SiteConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            site_id: SiteId::default(),
            articles_per_page: DEFAULT_ARTICLES_PER_PAGE,
            default_language: Locale::new("en"),
            timezone: Tz::UTC,
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;

        Self::parse(&contents)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let raw: RawSiteConfig = toml::from_str(text)?;

        raw.try_into()
    }
}

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(#[from] io::Error),

    #[error("invalid config: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid base URL '{base_url}': {source}")]
    InvalidBaseUrl {
        base_url: String,
        source: url::ParseError,
    },

    #[error("articles_per_page must be greater than zero")]
    InvalidPageSize,

    #[error("unknown timezone '{0}'")]
    UnknownTimezone(String),
}

#[derive(Debug, Deserialize)]
struct RawSiteConfig {
    base_url: String,
    #[serde(default)]
    site_id: SiteId,
    #[serde(default = "default_articles_per_page")]
    articles_per_page: usize,
    #[serde(default = "default_language")]
    default_language: Locale,
    #[serde(default = "default_timezone")]
    timezone: String,
}

fn default_articles_per_page() -> usize {
    DEFAULT_ARTICLES_PER_PAGE
}

fn default_language() -> Locale {
    Locale::new("en")
}

fn default_timezone() -> String {
    "UTC".to_string()
}

impl TryFrom<RawSiteConfig> for SiteConfig {
    type Error = ConfigError;

    fn try_from(raw: RawSiteConfig) -> Result<Self, Self::Error> {
        url::Url::parse(&raw.base_url).map_err(|source| ConfigError::InvalidBaseUrl {
            base_url: raw.base_url.clone(),
            source,
        })?;

        if raw.articles_per_page == 0 {
            return Err(ConfigError::InvalidPageSize);
        }

        let timezone = raw
            .timezone
            .parse::<Tz>()
            .map_err(|_| ConfigError::UnknownTimezone(raw.timezone.clone()))?;

        Ok(Self {
            base_url: raw.base_url,
            site_id: raw.site_id,
            articles_per_page: raw.articles_per_page,
            default_language: raw.default_language,
            timezone,
        })
    }
}
