//! Translation of request paths below an [`ArticleIndex`] into route results.
//!
//! # Dispatch order
//! For an index, the first matching rule wins:
//! 1. `[slug]` naming a live, categorized child article: redirect to the
//!    article's canonical URL.
//! 2. `[slug]` naming a category: the category listing.
//! 3. Any [`SubRoute`] registered on the index, in registration order.
//! 4. `[slug, ..]` naming a live child article: the article's own resolver with
//!    the remaining path. This is how uncategorized articles are served at their
//!    flat URLs.
//! 5. `[category, article]` naming a category and a live child article filed
//!    under it: delegate to the article's own resolver with an empty path.
//!
//! Lookups that find nothing fall through to the next rule. Storage failures
//! abort dispatch.

use thiserror::Error;
use tracing::debug;

use crate::content::{Article, ArticleIndex, Locale};
use crate::storage::ContentStore;

/// The outcome of resolving a path.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum RouteResult {
    /// The path names a category; its articles should be listed.
    CategoryMatch { slug: String },

    /// The path is a legacy URL of an article that now lives below a category.
    ArticleRedirect { target_url: String },

    /// The path names an article, which resolved the remaining path itself.
    DelegatedArticleRoute(Article),

    /// The path was claimed by a [`SubRoute`].
    SubRouteMatch { name: String, params: Vec<String> },

    /// No rule matched.
    Unmatched,
}

#[derive(Error, Debug, PartialEq, Eq)]
pub enum RoutingError {
    #[error("no route matched")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),
}

fn storage_error(err: impl std::error::Error) -> RoutingError {
    RoutingError::Storage(err.to_string())
}

/// Something that can resolve the path segments below itself.
pub trait RouteResolver<S: ContentStore> {
    fn resolve(
        &self,
        store: &S,
        path: &[String],
        locale: &Locale,
    ) -> Result<RouteResult, RoutingError>;
}

/// An additional route on an article index (e.g. tag pages).
///
/// Returning [`RouteResult::Unmatched`] or [`RoutingError::NotFound`] lets
/// dispatch continue with the next rule.
pub trait SubRoute<S: ContentStore>: Send + Sync {
    fn resolve(
        &self,
        index: &ArticleIndex,
        store: &S,
        path: &[String],
        locale: &Locale,
    ) -> Result<RouteResult, RoutingError>;
}

/// Articles have no routes below themselves.
impl<S: ContentStore> RouteResolver<S> for Article {
    fn resolve(
        &self,
        _store: &S,
        path: &[String],
        _locale: &Locale,
    ) -> Result<RouteResult, RoutingError> {
        if path.is_empty() {
            Ok(RouteResult::DelegatedArticleRoute(self.clone()))
        } else {
            Ok(RouteResult::Unmatched)
        }
    }
}

/// The category-aware resolver of an [`ArticleIndex`].
pub struct CategoryRouter<S> {
    index: ArticleIndex,
    sub_routes: Vec<Box<dyn SubRoute<S>>>,
}

impl<S: ContentStore> CategoryRouter<S> {
    pub fn new(index: ArticleIndex) -> Self {
        Self {
            index: index.normalize(),
            sub_routes: Vec::new(),
        }
    }

    pub fn index(&self) -> &ArticleIndex {
        &self.index
    }

    pub fn add_sub_route(&mut self, sub_route: impl SubRoute<S> + 'static) {
        self.sub_routes.push(Box::new(sub_route));
    }

    pub fn with_sub_route(mut self, sub_route: impl SubRoute<S> + 'static) -> Self {
        self.add_sub_route(sub_route);
        self
    }

    fn resolve_single_segment(
        &self,
        store: &S,
        slug: &str,
        locale: &Locale,
    ) -> Result<RouteResult, RoutingError> {
        let article = store
            .find_article(self.index.id, slug, locale)
            .map_err(storage_error)?;

        if let Some(article) = article.filter(|article| article.category.is_some()) {
            let target_url = store.canonical_url(&article).map_err(storage_error)?;
            debug!(slug, %target_url, "redirecting categorized article");
            return Ok(RouteResult::ArticleRedirect { target_url });
        }

        if store
            .find_category(slug, locale)
            .map_err(storage_error)?
            .is_some()
        {
            debug!(slug, "matched category listing");
            return Ok(RouteResult::CategoryMatch {
                slug: slug.to_string(),
            });
        }

        Ok(RouteResult::Unmatched)
    }

    fn resolve_sub_routes(
        &self,
        store: &S,
        path: &[String],
        locale: &Locale,
    ) -> Result<RouteResult, RoutingError> {
        for sub_route in &self.sub_routes {
            match sub_route.resolve(&self.index, store, path, locale) {
                Ok(RouteResult::Unmatched) | Err(RoutingError::NotFound) => continue,
                result => return result,
            }
        }

        Ok(RouteResult::Unmatched)
    }

    fn resolve_child_page(
        &self,
        store: &S,
        path: &[String],
        locale: &Locale,
    ) -> Result<RouteResult, RoutingError> {
        let [slug, rest @ ..] = path else {
            return Ok(RouteResult::Unmatched);
        };

        match store
            .find_article(self.index.id, slug, locale)
            .map_err(storage_error)?
        {
            Some(article) => {
                debug!(slug, "routing into child article");
                RouteResolver::<S>::resolve(&article, store, rest, locale)
            }
            None => Ok(RouteResult::Unmatched),
        }
    }

    fn resolve_category_article(
        &self,
        store: &S,
        category_slug: &str,
        article_slug: &str,
        locale: &Locale,
    ) -> Result<RouteResult, RoutingError> {
        let Some(category) = store
            .find_category(category_slug, locale)
            .map_err(storage_error)?
        else {
            return Ok(RouteResult::Unmatched);
        };

        let Some(article) = store
            .find_article_in_category(self.index.id, article_slug, category.id, locale)
            .map_err(storage_error)?
        else {
            return Ok(RouteResult::Unmatched);
        };

        debug!(category_slug, article_slug, "delegating to article");
        RouteResolver::<S>::resolve(&article, store, &[], locale)
    }
}

impl<S: ContentStore> RouteResolver<S> for CategoryRouter<S> {
    fn resolve(
        &self,
        store: &S,
        path: &[String],
        locale: &Locale,
    ) -> Result<RouteResult, RoutingError> {
        if let [slug] = path {
            let result = self.resolve_single_segment(store, slug, locale)?;
            if result != RouteResult::Unmatched {
                return Ok(result);
            }
        }

        let result = self.resolve_sub_routes(store, path, locale)?;
        if result != RouteResult::Unmatched {
            return Ok(result);
        }

        let result = self.resolve_child_page(store, path, locale)?;
        if result != RouteResult::Unmatched {
            return Ok(result);
        }

        if let [category_slug, article_slug] = path {
            return self.resolve_category_article(store, category_slug, article_slug, locale);
        }

        Ok(RouteResult::Unmatched)
    }
}

/// Splits a request path into its non-empty segments.
pub fn path_segments(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|segment| !segment.is_empty())
        .map(str::to_string)
        .collect()
}

/// Resolves `path` with the given resolver, reporting an unmatched path as
/// [`RoutingError::NotFound`].
pub fn dispatch<S, R>(
    resolver: &R,
    store: &S,
    path: &[String],
    locale: &Locale,
) -> Result<RouteResult, RoutingError>
where
    S: ContentStore,
    R: RouteResolver<S> + ?Sized,
{
    match resolver.resolve(store, path, locale)? {
        RouteResult::Unmatched => {
            debug!(?path, %locale, "no route matched");
            Err(RoutingError::NotFound)
        }
        result => Ok(result),
    }
}

/// A [`SubRoute`] matching a fixed pattern such as `tags/<tag>`.
///
/// Literal segments must match exactly; `<name>` segments match any single
/// segment and are captured, in order, into [`RouteResult::SubRouteMatch`].
#[derive(Debug, Clone)]
pub struct PatternRoute {
    name: String,
    segments: Vec<PatternSegment>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum PatternSegment {
    Literal(String),
    Capture,
}

impl PatternRoute {
    pub fn new(name: impl Into<String>, pattern: &str) -> Self {
        let segments = pattern
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(|segment| {
                if segment.starts_with('<') && segment.ends_with('>') {
                    PatternSegment::Capture
                } else {
                    PatternSegment::Literal(segment.to_string())
                }
            })
            .collect();

        Self {
            name: name.into(),
            segments,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn match_path(&self, path: &[String]) -> Option<Vec<String>> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, component) in self.segments.iter().zip(path) {
            match segment {
                PatternSegment::Literal(literal) if literal == component => {}
                PatternSegment::Literal(_) => return None,
                PatternSegment::Capture => params.push(component.clone()),
            }
        }

        Some(params)
    }
}

impl<S: ContentStore> SubRoute<S> for PatternRoute {
    fn resolve(
        &self,
        _index: &ArticleIndex,
        _store: &S,
        path: &[String],
        _locale: &Locale,
    ) -> Result<RouteResult, RoutingError> {
        match self.match_path(path) {
            Some(params) => Ok(RouteResult::SubRouteMatch {
                name: self.name.clone(),
                params,
            }),
            None => Ok(RouteResult::Unmatched),
        }
    }
}
