use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use thiserror::Error;

use crate::analytics::{AnalyticsSettings, SiteId};
use crate::content::{
    sort_articles_by_publish_date, Article, ArticleIndex, ArticleIndexes, Articles, Categories,
    Category, CategoryId, Locale, NewCategory, PageId, TranslationKey,
};
use crate::permalink::Permalink;

/// Read access to categories and articles.
///
/// Lookups that find nothing return `Ok(None)`; errors are reserved for failures
/// of the store itself. Article lookups only ever see live articles.
pub trait ContentStore {
    type Error: std::error::Error;

    fn find_category(&self, slug: &str, locale: &Locale) -> Result<Option<Category>, Self::Error>;

    fn get_category(&self, id: CategoryId) -> Result<Option<Category>, Self::Error>;

    /// Returns the categories of the given locale, ordered by name.
    fn list_categories(&self, locale: &Locale) -> Result<Vec<Category>, Self::Error>;

    /// Returns the live article below `parent` with the given slug.
    fn find_article(
        &self,
        parent: PageId,
        slug: &str,
        locale: &Locale,
    ) -> Result<Option<Article>, Self::Error>;

    /// Returns the live article below `parent` with the given slug, filed under
    /// `category`.
    fn find_article_in_category(
        &self,
        parent: PageId,
        slug: &str,
        category: CategoryId,
        locale: &Locale,
    ) -> Result<Option<Article>, Self::Error>;

    /// Returns the live articles below `parent`, most recently published first.
    fn list_articles(
        &self,
        parent: PageId,
        locale: &Locale,
        category: Option<CategoryId>,
    ) -> Result<Vec<Article>, Self::Error>;

    /// Returns the absolute URL an article is served at.
    fn canonical_url(&self, article: &Article) -> Result<String, Self::Error>;
}

/// Read access to per-site settings.
pub trait SiteSettingsStore {
    type Error: std::error::Error;

    fn analytics_settings(&self, site: &SiteId) -> Result<Option<AnalyticsSettings>, Self::Error>;
}

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("poisoned")]
    Poisoned,

    #[error("a '{locale}' translation of category '{translation_key}' already exists")]
    DuplicateTranslation {
        translation_key: TranslationKey,
        locale: Locale,
    },

    #[error("a category with slug '{slug}' already exists in '{locale}'")]
    DuplicateSlug { slug: String, locale: Locale },

    #[error("cannot derive a slug from category name '{name}'")]
    EmptySlug { name: String },

    #[error("analytics settings already exist for site '{0}'")]
    DuplicateSettings(SiteId),

    #[error("page {0} already exists")]
    DuplicatePage(PageId),

    #[error("unknown category: {0}")]
    UnknownCategory(CategoryId),

    #[error("unknown article index: {0}")]
    UnknownIndex(PageId),

    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
}

#[derive(Debug, Default)]
struct State {
    indexes: ArticleIndexes,
    categories: Categories,
    articles: Articles,
    analytics: HashMap<SiteId, AnalyticsSettings>,
    last_category_id: u64,
    last_translation_key: u64,
}

/// A thread-safe, in-memory content and settings store.
#[derive(Debug, Clone)]
pub struct InMemoryStorage {
    base_url: String,
    state: Arc<RwLock<State>>,
}

impl InMemoryStorage {
    /// Returns a new, empty [`InMemoryStorage`] that builds canonical URLs below
    /// `base_url`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            state: Arc::new(RwLock::new(State::default())),
        }
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, State>, StorageError> {
        self.state.read().map_err(|_| StorageError::Poisoned)
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, State>, StorageError> {
        self.state.write().map_err(|_| StorageError::Poisoned)
    }

    /// Adds the given [`ArticleIndex`] to the store.
    pub fn add_index(&self, index: ArticleIndex) -> Result<(), StorageError> {
        let mut state = self.write()?;

        if state.indexes.contains_key(&index.id) || state.articles.contains_key(&index.id) {
            return Err(StorageError::DuplicatePage(index.id));
        }

        state.indexes.insert(index.id, index.normalize());

        Ok(())
    }

    pub fn get_index(&self, id: PageId) -> Result<Option<ArticleIndex>, StorageError> {
        Ok(self.read()?.indexes.get(&id).cloned())
    }

    pub fn list_indexes(&self) -> Result<Vec<ArticleIndex>, StorageError> {
        Ok(self.read()?.indexes.values().cloned().collect())
    }

    /// Adds the given [`Article`] to the store.
    ///
    /// The article's parent must be a known index and its category, if any, a
    /// known category.
    pub fn add_article(&self, article: Article) -> Result<(), StorageError> {
        let mut state = self.write()?;

        if state.indexes.contains_key(&article.id) || state.articles.contains_key(&article.id) {
            return Err(StorageError::DuplicatePage(article.id));
        }

        if !state.indexes.contains_key(&article.parent) {
            return Err(StorageError::UnknownIndex(article.parent));
        }

        if let Some(category) = article.category {
            if !state.categories.contains_key(&category) {
                return Err(StorageError::UnknownCategory(category));
            }
        }

        state.articles.insert(article.id, article);

        Ok(())
    }

    /// Saves a new category, returning the stored [`Category`].
    ///
    /// The slug is resolved in order of preference from:
    /// 1. the slug supplied on the category;
    /// 2. the slug of an existing variant in another locale of the same
    ///    translation group;
    /// 3. the slugified name.
    pub fn save_category(&self, category: NewCategory) -> Result<Category, StorageError> {
        let mut state = self.write()?;

        let translated_slug = match (&category.translation_key, category.explicit_slug()) {
            (Some(translation_key), None) => state
                .categories
                .values()
                .find(|existing| {
                    existing.translation_key == *translation_key
                        && existing.locale != category.locale
                })
                .map(|existing| existing.slug.clone()),
            _ => None,
        };

        let slug = category
            .explicit_slug()
            .map(str::to_string)
            .or(translated_slug)
            .unwrap_or_else(|| category.slugified_name());

        if slug.is_empty() {
            return Err(StorageError::EmptySlug {
                name: category.name,
            });
        }

        let translation_key = match category.translation_key {
            Some(translation_key) => {
                let is_taken = state.categories.values().any(|existing| {
                    existing.translation_key == translation_key
                        && existing.locale == category.locale
                });
                if is_taken {
                    return Err(StorageError::DuplicateTranslation {
                        translation_key,
                        locale: category.locale,
                    });
                }

                translation_key
            }
            None => state.next_translation_key(),
        };

        let slug_is_taken = state
            .categories
            .values()
            .any(|existing| existing.slug == slug && existing.locale == category.locale);
        if slug_is_taken {
            return Err(StorageError::DuplicateSlug {
                slug,
                locale: category.locale,
            });
        }

        state.last_category_id += 1;
        let saved = Category {
            id: CategoryId(state.last_category_id),
            name: category.name,
            slug,
            description: category.description,
            locale: category.locale,
            translation_key,
        };

        state.categories.insert(saved.id, saved.clone());

        Ok(saved)
    }

    /// Saves the analytics settings of a site that has none yet.
    pub fn save_analytics_settings(&self, settings: AnalyticsSettings) -> Result<(), StorageError> {
        let mut state = self.write()?;

        if state.analytics.contains_key(&settings.site) {
            return Err(StorageError::DuplicateSettings(settings.site));
        }

        state.analytics.insert(settings.site.clone(), settings);

        Ok(())
    }

    /// Replaces the analytics settings of a site, creating them if necessary.
    pub fn update_analytics_settings(
        &self,
        settings: AnalyticsSettings,
    ) -> Result<(), StorageError> {
        self.write()?
            .analytics
            .insert(settings.site.clone(), settings);

        Ok(())
    }
}

impl State {
    fn next_translation_key(&mut self) -> TranslationKey {
        loop {
            self.last_translation_key += 1;
            let candidate = TranslationKey(format!("category-{}", self.last_translation_key));

            let is_taken = self
                .categories
                .values()
                .any(|existing| existing.translation_key == candidate);
            if !is_taken {
                return candidate;
            }
        }
    }

    fn live_children<'a>(
        &'a self,
        parent: PageId,
        locale: &'a Locale,
    ) -> impl Iterator<Item = &'a Article> + 'a {
        self.articles.values().filter(move |article| {
            article.live && article.parent == parent && article.locale == *locale
        })
    }
}

impl ContentStore for InMemoryStorage {
    type Error = StorageError;

    fn find_category(&self, slug: &str, locale: &Locale) -> Result<Option<Category>, Self::Error> {
        Ok(self
            .read()?
            .categories
            .values()
            .find(|category| category.slug == slug && category.locale == *locale)
            .cloned())
    }

    fn get_category(&self, id: CategoryId) -> Result<Option<Category>, Self::Error> {
        Ok(self.read()?.categories.get(&id).cloned())
    }

    fn list_categories(&self, locale: &Locale) -> Result<Vec<Category>, Self::Error> {
        let mut categories = self
            .read()?
            .categories
            .values()
            .filter(|category| category.locale == *locale)
            .cloned()
            .collect::<Vec<_>>();

        categories.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        Ok(categories)
    }

    fn find_article(
        &self,
        parent: PageId,
        slug: &str,
        locale: &Locale,
    ) -> Result<Option<Article>, Self::Error> {
        Ok(self
            .read()?
            .live_children(parent, locale)
            .find(|article| article.slug == slug)
            .cloned())
    }

    fn find_article_in_category(
        &self,
        parent: PageId,
        slug: &str,
        category: CategoryId,
        locale: &Locale,
    ) -> Result<Option<Article>, Self::Error> {
        Ok(self
            .read()?
            .live_children(parent, locale)
            .find(|article| article.slug == slug && article.category == Some(category))
            .cloned())
    }

    fn list_articles(
        &self,
        parent: PageId,
        locale: &Locale,
        category: Option<CategoryId>,
    ) -> Result<Vec<Article>, Self::Error> {
        let articles = self
            .read()?
            .live_children(parent, locale)
            .filter(|article| category.is_none() || article.category == category)
            .cloned()
            .collect();

        Ok(sort_articles_by_publish_date(articles))
    }

    fn canonical_url(&self, article: &Article) -> Result<String, Self::Error> {
        let state = self.read()?;

        let index = state
            .indexes
            .get(&article.parent)
            .ok_or(StorageError::UnknownIndex(article.parent))?;
        let category = match article.category {
            Some(id) => Some(
                state
                    .categories
                    .get(&id)
                    .ok_or(StorageError::UnknownCategory(id))?,
            ),
            None => None,
        };

        let permalink = Permalink::from_path(&self.base_url, &article.url_path(index, category))?;

        Ok(permalink.as_str().to_string())
    }
}

impl SiteSettingsStore for InMemoryStorage {
    type Error = StorageError;

    fn analytics_settings(&self, site: &SiteId) -> Result<Option<AnalyticsSettings>, Self::Error> {
        Ok(self.read()?.analytics.get(site).cloned())
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use super::*;

    fn en() -> Locale {
        Locale::new("en")
    }

    fn make_storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new("https://example.com");
        storage
            .add_index(ArticleIndex::new(PageId(1), "Articles", "/en/articles/", en()))
            .unwrap();
        storage
    }

    fn make_article(id: u64, slug: &str, category: Option<CategoryId>, day: u32) -> Article {
        Article {
            id: PageId(id),
            parent: PageId(1),
            title: slug.to_string(),
            slug: slug.to_string(),
            locale: en(),
            live: true,
            first_published_at: Utc.with_ymd_and_hms(2024, 3, day, 9, 0, 0).single(),
            category,
            body: String::new(),
        }
    }

    #[test]
    fn test_slug_is_derived_from_name() {
        let storage = make_storage();

        let category = storage
            .save_category(NewCategory::new("Open Source", en()))
            .unwrap();

        assert_eq!(category.slug, "open-source");
    }

    #[test]
    fn test_translation_preserves_slug() {
        let storage = make_storage();

        let english = storage
            .save_category(NewCategory::new("Technology", en()).with_slug("tech"))
            .unwrap();
        let japanese = storage
            .save_category(NewCategory {
                name: "技術".to_string(),
                ..english.translate_to(Locale::new("ja"))
            })
            .unwrap();

        assert_eq!(japanese.slug, "tech");
        assert_eq!(japanese.translation_key, english.translation_key);
    }

    #[test]
    fn test_explicit_slug_wins_over_translation_slug() {
        let storage = make_storage();

        let english = storage
            .save_category(NewCategory::new("Technology", en()))
            .unwrap();
        let french = storage
            .save_category(english.translate_to(Locale::new("fr")).with_slug("technologie"))
            .unwrap();

        assert_eq!(french.slug, "technologie");
    }

    #[test]
    fn test_duplicate_translation_is_rejected() {
        let storage = make_storage();

        let english = storage
            .save_category(NewCategory::new("Technology", en()))
            .unwrap();
        let result = storage.save_category(english.translate_to(en()));

        assert!(matches!(
            result,
            Err(StorageError::DuplicateTranslation { .. })
        ));
    }

    #[test]
    fn test_duplicate_slug_in_locale_is_rejected() {
        let storage = make_storage();

        storage
            .save_category(NewCategory::new("News", en()))
            .unwrap();
        let result = storage.save_category(NewCategory::new("news", en()));

        assert!(matches!(result, Err(StorageError::DuplicateSlug { .. })));
    }

    #[test]
    fn test_same_slug_in_other_locale_is_allowed() {
        let storage = make_storage();

        storage
            .save_category(NewCategory::new("News", en()))
            .unwrap();

        assert!(storage
            .save_category(NewCategory::new("News", Locale::new("de")))
            .is_ok());
    }

    #[test]
    fn test_unsluggable_name_is_rejected() {
        let storage = make_storage();

        let result = storage.save_category(NewCategory::new("!!!", en()));

        assert!(matches!(result, Err(StorageError::EmptySlug { .. })));
    }

    #[test]
    fn test_list_categories_is_ordered_by_name() {
        let storage = make_storage();

        for name in ["Travel", "Food", "Music"] {
            storage.save_category(NewCategory::new(name, en())).unwrap();
        }
        storage
            .save_category(NewCategory::new("Art", Locale::new("fr")))
            .unwrap();

        let names = storage
            .list_categories(&en())
            .unwrap()
            .into_iter()
            .map(|category| category.name)
            .collect::<Vec<_>>();

        assert_eq!(names, vec!["Food", "Music", "Travel"]);
    }

    #[test]
    fn test_find_article_ignores_drafts_and_other_locales() {
        let storage = make_storage();

        let mut draft = make_article(10, "draft", None, 1);
        draft.live = false;
        storage.add_article(draft).unwrap();

        let mut french = make_article(11, "bonjour", None, 1);
        french.locale = Locale::new("fr");
        storage.add_article(french).unwrap();

        assert_eq!(storage.find_article(PageId(1), "draft", &en()).unwrap(), None);
        assert_eq!(storage.find_article(PageId(1), "bonjour", &en()).unwrap(), None);
        assert!(storage
            .find_article(PageId(1), "bonjour", &Locale::new("fr"))
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_find_article_in_category() {
        let storage = make_storage();
        let news = storage.save_category(NewCategory::new("News", en())).unwrap();
        let sports = storage
            .save_category(NewCategory::new("Sports", en()))
            .unwrap();
        storage
            .add_article(make_article(10, "match-report", Some(sports.id), 1))
            .unwrap();

        assert_eq!(
            storage
                .find_article_in_category(PageId(1), "match-report", news.id, &en())
                .unwrap(),
            None
        );
        assert!(storage
            .find_article_in_category(PageId(1), "match-report", sports.id, &en())
            .unwrap()
            .is_some());
    }

    #[test]
    fn test_list_articles_filters_and_orders() {
        let storage = make_storage();
        let news = storage.save_category(NewCategory::new("News", en())).unwrap();

        storage
            .add_article(make_article(10, "first", Some(news.id), 1))
            .unwrap();
        storage
            .add_article(make_article(11, "second", None, 2))
            .unwrap();
        storage
            .add_article(make_article(12, "third", Some(news.id), 3))
            .unwrap();
        storage
            .add_article(make_article(13, "also-third", Some(news.id), 3))
            .unwrap();

        let slugs = |articles: Vec<Article>| {
            articles
                .into_iter()
                .map(|article| article.slug)
                .collect::<Vec<_>>()
        };

        assert_eq!(
            slugs(storage.list_articles(PageId(1), &en(), Some(news.id)).unwrap()),
            vec!["also-third", "third", "first"]
        );
        assert_eq!(
            slugs(storage.list_articles(PageId(1), &en(), None).unwrap()),
            vec!["also-third", "third", "second", "first"]
        );
    }

    #[test]
    fn test_add_article_validates_references() {
        let storage = make_storage();

        let mut orphan = make_article(10, "orphan", None, 1);
        orphan.parent = PageId(99);
        assert!(matches!(
            storage.add_article(orphan),
            Err(StorageError::UnknownIndex(PageId(99)))
        ));

        assert!(matches!(
            storage.add_article(make_article(11, "lost", Some(CategoryId(42)), 1)),
            Err(StorageError::UnknownCategory(CategoryId(42)))
        ));

        assert!(matches!(
            storage.add_article(make_article(1, "clash", None, 1)),
            Err(StorageError::DuplicatePage(PageId(1)))
        ));
    }

    #[test]
    fn test_canonical_url() {
        let storage = make_storage();
        let news = storage.save_category(NewCategory::new("News", en())).unwrap();

        let categorized = make_article(10, "hello", Some(news.id), 1);
        let uncategorized = make_article(11, "goodbye", None, 1);

        assert_eq!(
            storage.canonical_url(&categorized).unwrap(),
            "https://example.com/en/articles/news/hello/"
        );
        assert_eq!(
            storage.canonical_url(&uncategorized).unwrap(),
            "https://example.com/en/articles/goodbye/"
        );
    }

    #[test]
    fn test_one_analytics_settings_per_site() {
        let storage = make_storage();

        storage
            .save_analytics_settings(AnalyticsSettings::new(SiteId::default()))
            .unwrap();
        let result = storage.save_analytics_settings(AnalyticsSettings::new(SiteId::default()));

        assert!(matches!(result, Err(StorageError::DuplicateSettings(_))));
    }

    #[test]
    fn test_update_analytics_settings() {
        let storage = make_storage();
        let site = SiteId::default();

        let mut settings = AnalyticsSettings::new(site.clone());
        storage.save_analytics_settings(settings.clone()).unwrap();

        settings.enabled = true;
        storage.update_analytics_settings(settings).unwrap();

        assert_eq!(
            storage.analytics_settings(&site).unwrap().map(|s| s.enabled),
            Some(true)
        );
    }
}
