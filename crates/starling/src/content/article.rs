use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::content::{ArticleIndex, Category, CategoryId, Locale};
use crate::permalink::insert_category_slug;

/// The identity of a page in the page tree.
///
/// Article indexes and articles share this identifier space, which is also what
/// analytics inclusion lists refer to.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageId(pub u64);

impl fmt::Display for PageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, PartialEq, Eq, Clone, Serialize, Deserialize)]
pub struct Article {
    pub id: PageId,
    /// The article index this article is a direct child of.
    pub parent: PageId,
    pub title: String,
    pub slug: String,
    pub locale: Locale,
    #[serde(default = "default_live")]
    pub live: bool,
    #[serde(default)]
    pub first_published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub category: Option<CategoryId>,
    #[serde(default)]
    pub body: String,
}

fn default_live() -> bool {
    true
}

impl Article {
    /// Returns the path of this article below the given index, with the
    /// category slug inserted before the article's own slug when the article
    /// is categorized.
    ///
    /// Only the part below the index is considered when inserting the category
    /// slug, so an index path ending in the category slug still gets it.
    pub fn url_path(&self, index: &ArticleIndex, category: Option<&Category>) -> String {
        let tail = format!("{}/", self.slug);
        let tail = match category {
            Some(category) => insert_category_slug(&tail, &self.slug, &category.slug),
            None => tail,
        };

        format!("{}{}", index.url_path(), tail.trim_start_matches('/'))
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use crate::content::TranslationKey;

    use super::*;

    fn make_index() -> ArticleIndex {
        ArticleIndex::new(PageId(1), "Articles", "/en/articles", Locale::new("en"))
    }

    fn make_article(category: Option<CategoryId>) -> Article {
        Article {
            id: PageId(10),
            parent: PageId(1),
            title: "Hello, world".to_string(),
            slug: "hello-world".to_string(),
            locale: Locale::new("en"),
            live: true,
            first_published_at: None,
            category,
            body: String::new(),
        }
    }

    #[test]
    fn test_url_path_without_category() {
        let article = make_article(None);

        assert_eq!(
            article.url_path(&make_index(), None),
            "/en/articles/hello-world/"
        );
    }

    #[test]
    fn test_url_path_with_category() {
        let category = Category {
            id: CategoryId(3),
            name: "News".to_string(),
            slug: "news".to_string(),
            description: String::new(),
            locale: Locale::new("en"),
            translation_key: TranslationKey("news".to_string()),
        };
        let article = make_article(Some(category.id));

        assert_eq!(
            article.url_path(&make_index(), Some(&category)),
            "/en/articles/news/hello-world/"
        );
    }

    #[test]
    fn test_url_path_when_index_ends_with_category_slug() {
        let index = ArticleIndex::new(PageId(1), "News", "/en/news/", Locale::new("en"));
        let category = Category {
            id: CategoryId(3),
            name: "News".to_string(),
            slug: "news".to_string(),
            description: String::new(),
            locale: Locale::new("en"),
            translation_key: TranslationKey("news".to_string()),
        };
        let article = make_article(Some(category.id));

        assert_eq!(
            article.url_path(&index, Some(&category)),
            "/en/news/news/hello-world/"
        );
    }
}
