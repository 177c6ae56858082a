//! Conditional injection of third-party tracking code.
//!
//! Each site has at most one [`AnalyticsSettings`] record. Whether its tracking
//! code is emitted for a given page is decided by [`AnalyticsSettings::should_include`].
//! The template helpers in this module never fail: a missing record or a storage
//! error simply yields no tracking code.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::content::PageId;
use crate::storage::SiteSettingsStore;

/// The identity of a site in a multi-site installation.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SiteId(String);

impl SiteId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SiteId {
    fn default() -> Self {
        Self("default".to_string())
    }
}

impl fmt::Display for SiteId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How the explicit page lists of an [`AnalyticsSettings`] gate inclusion.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "&'static str")]
pub enum InclusionMode {
    /// Include tracking code on every page.
    #[default]
    All,

    /// Include tracking code only on the listed pages.
    Specific,

    /// Include tracking code on every page except the listed ones.
    Exclude,

    /// A mode this version does not understand. Never includes.
    Unknown,
}

impl InclusionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::All => "all",
            Self::Specific => "specific",
            Self::Exclude => "exclude",
            Self::Unknown => "unknown",
        }
    }
}

impl From<String> for InclusionMode {
    fn from(value: String) -> Self {
        match value.as_str() {
            "all" => Self::All,
            "specific" => Self::Specific,
            "exclude" => Self::Exclude,
            _ => Self::Unknown,
        }
    }
}

impl From<InclusionMode> for &'static str {
    fn from(value: InclusionMode) -> Self {
        value.as_str()
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct AnalyticsSettings {
    pub site: SiteId,
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub head_tracking_code: String,
    #[serde(default)]
    pub body_tracking_code: String,
    #[serde(default)]
    pub inclusion_mode: InclusionMode,
    #[serde(default)]
    pub included_pages: HashSet<PageId>,
    #[serde(default)]
    pub excluded_pages: HashSet<PageId>,
}

impl AnalyticsSettings {
    /// Returns disabled settings for the given site.
    pub fn new(site: SiteId) -> Self {
        Self {
            site,
            enabled: false,
            head_tracking_code: String::new(),
            body_tracking_code: String::new(),
            inclusion_mode: InclusionMode::default(),
            included_pages: HashSet::new(),
            excluded_pages: HashSet::new(),
        }
    }

    /// Returns whether tracking code should be emitted on the given page.
    pub fn should_include(&self, page: PageId) -> bool {
        if !self.enabled {
            return false;
        }

        match self.inclusion_mode {
            InclusionMode::All => true,
            InclusionMode::Specific => self.included_pages.contains(&page),
            InclusionMode::Exclude => !self.excluded_pages.contains(&page),
            InclusionMode::Unknown => false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Placement {
    Head,
    Body,
}

/// Returns the tracking code for the `<head>` of the given page, or an empty
/// string when none applies.
pub fn analytics_head(
    store: &impl SiteSettingsStore,
    site: Option<&SiteId>,
    page: Option<PageId>,
) -> String {
    tracking_code(store, site, page, Placement::Head)
}

/// Returns the tracking code for the end of the `<body>` of the given page, or an
/// empty string when none applies.
pub fn analytics_body(
    store: &impl SiteSettingsStore,
    site: Option<&SiteId>,
    page: Option<PageId>,
) -> String {
    tracking_code(store, site, page, Placement::Body)
}

fn tracking_code(
    store: &impl SiteSettingsStore,
    site: Option<&SiteId>,
    page: Option<PageId>,
    placement: Placement,
) -> String {
    let (Some(site), Some(page)) = (site, page) else {
        return String::new();
    };

    let settings = match store.analytics_settings(site) {
        Ok(Some(settings)) => settings,
        Ok(None) => return String::new(),
        Err(err) => {
            warn!(%site, %page, error = %err, "failed to load analytics settings");
            return String::new();
        }
    };

    if !settings.should_include(page) {
        return String::new();
    }

    match placement {
        Placement::Head => settings.head_tracking_code,
        Placement::Body => settings.body_tracking_code,
    }
}

/// Splices the tracking code for the given page into a rendered HTML document,
/// before `</head>` and `</body>` respectively.
///
/// The tracking code is inserted verbatim. Documents missing either closing tag
/// are left alone at that position.
pub fn inject_analytics(
    html: &str,
    store: &impl SiteSettingsStore,
    site: Option<&SiteId>,
    page: Option<PageId>,
) -> String {
    let head = analytics_head(store, site, page);
    let body = analytics_body(store, site, page);

    let html = insert_before(html, "</head>", &head);
    insert_before(&html, "</body>", &body)
}

fn insert_before(html: &str, closing_tag: &str, code: &str) -> String {
    if code.is_empty() {
        return html.to_string();
    }

    match html.rfind(closing_tag) {
        Some(position) => {
            let mut spliced = String::with_capacity(html.len() + code.len());
            spliced.push_str(&html[..position]);
            spliced.push_str(code);
            spliced.push_str(&html[position..]);
            spliced
        }
        None => html.to_string(),
    }
}
