use std::str::FromStr;

use url::Url;

/// An absolute URL for a piece of content.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct Permalink(Url);

impl Permalink {
    pub fn from_path(base_url: &str, path: &str) -> Result<Self, url::ParseError> {
        let suffix = if path.ends_with('/') || path.is_empty() {
            ""
        } else {
            "/"
        };
        let base_url = base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');

        Ok(Self(Url::from_str(&format!("{base_url}/{path}{suffix}"))?))
    }

    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }

    pub fn path(&self) -> &str {
        self.0.path()
    }
}

/// Inserts `category_slug` into `path` immediately before the last segment equal
/// to `article_slug`.
///
/// Any locale prefix stays in front of the inserted segment. The path is returned
/// unchanged when the category slug is already in place or when the article slug
/// does not appear in it.
pub fn insert_category_slug(path: &str, article_slug: &str, category_slug: &str) -> String {
    let mut segments = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .collect::<Vec<_>>();

    let Some(position) = segments.iter().rposition(|segment| *segment == article_slug) else {
        return path.to_string();
    };

    if position > 0 && segments[position - 1] == category_slug {
        return path.to_string();
    }

    segments.insert(position, category_slug);

    let suffix = if path.ends_with('/') { "/" } else { "" };
    format!("/{}{suffix}", segments.join("/"))
}
