use serde::{Deserialize, Serialize};

use crate::content::{Locale, PageId};

/// The number of articles shown per listing page when neither the index nor the
/// site configures one.
pub const DEFAULT_ARTICLES_PER_PAGE: usize = 10;

/// A page that lists its child articles and routes category URLs below itself.
#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct ArticleIndex {
    pub id: PageId,
    pub title: String,
    url_path: String,
    pub locale: Locale,
    #[serde(default)]
    pub articles_per_page: Option<usize>,
    /// The name of a custom template to render category listings with.
    #[serde(default)]
    pub category_index_template: Option<String>,
}

impl ArticleIndex {
    pub fn new(id: PageId, title: impl Into<String>, url_path: &str, locale: Locale) -> Self {
        Self {
            id,
            title: title.into(),
            url_path: normalize_url_path(url_path),
            locale,
            articles_per_page: None,
            category_index_template: None,
        }
    }

    /// Returns the path of this index, always with leading and trailing slashes.
    pub fn url_path(&self) -> &str {
        &self.url_path
    }

    /// Returns the path segments of a request below this index, or `None` if the
    /// request path is not below this index.
    pub fn remaining_segments(&self, request_path: &str) -> Option<Vec<String>> {
        let request_path = normalize_url_path(request_path);
        let remaining = request_path.strip_prefix(&self.url_path)?;

        Some(
            remaining
                .split('/')
                .filter(|segment| !segment.is_empty())
                .map(str::to_string)
                .collect(),
        )
    }

    /// Returns the listing page size for this index.
    pub fn articles_per_page(&self, site_default: usize) -> usize {
        self.articles_per_page
            .filter(|per_page| *per_page > 0)
            .unwrap_or(site_default)
    }

    pub(crate) fn normalize(mut self) -> Self {
        self.url_path = normalize_url_path(&self.url_path);
        self
    }
}

fn normalize_url_path(path: &str) -> String {
    let path = path.trim_matches('/');
    if path.is_empty() {
        "/".to_string()
    } else {
        format!("/{path}/")
    }
}
