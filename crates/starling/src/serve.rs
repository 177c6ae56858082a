use http_body_util::combinators::BoxBody;
use http_body_util::{BodyExt, Empty, Full};
use hyper::body::Bytes;
use hyper::{header, Response, StatusCode};
use thiserror::Error;
use tracing::debug;

use crate::analytics::inject_analytics;
use crate::content::{Article, ArticleIndex, Category, Locale, PageId};
use crate::pagination::Paginator;
use crate::render::{
    ArticleToRender, BaseRenderContext, RenderArticleContext, RenderListingContext,
    RenderSubRouteContext, Templates,
};
use crate::routing::RouteResult;
use crate::storage::{ContentStore, SiteSettingsStore};
use crate::SiteConfig;

pub type ResponseBody = BoxBody<Bytes, hyper::Error>;

#[derive(Error, Debug)]
pub enum ServeError {
    #[error("not found")]
    NotFound,

    #[error("storage error: {0}")]
    Storage(String),

    #[error("HTTP error: {0}")]
    Http(#[from] hyper::http::Error),
}

fn storage_error(err: impl std::error::Error) -> ServeError {
    ServeError::Storage(err.to_string())
}

pub(crate) fn empty() -> ResponseBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed()
}

pub(crate) fn full<T: Into<Bytes>>(chunk: T) -> ResponseBody {
    Full::new(chunk.into())
        .map_err(|never| match never {})
        .boxed()
}

/// Returns an empty response with the given status.
pub fn status_response(status: StatusCode) -> Response<ResponseBody> {
    let mut response = Response::new(empty());
    *response.status_mut() = status;
    response
}

fn html_response(html: String) -> Result<Response<ResponseBody>, ServeError> {
    Ok(Response::builder()
        .header(header::CONTENT_TYPE, "text/html; charset=utf-8")
        .status(StatusCode::OK)
        .body(full(html))?)
}

fn permanent_redirect(target_url: &str) -> Result<Response<ResponseBody>, ServeError> {
    Ok(Response::builder()
        .header(header::LOCATION, target_url)
        .status(StatusCode::MOVED_PERMANENTLY)
        .body(empty())?)
}

/// Everything needed to render the pages of one article index.
pub struct ServeContext<'a, S> {
    pub config: &'a SiteConfig,
    pub store: &'a S,
    pub templates: &'a Templates,
    pub index: &'a ArticleIndex,
    pub locale: &'a Locale,
}

impl<'a, S> ServeContext<'a, S>
where
    S: ContentStore + SiteSettingsStore,
{
    fn categories(&self) -> Result<Vec<Category>, ServeError> {
        self.store
            .list_categories(self.locale)
            .map_err(storage_error)
    }

    fn base<'b>(&self, categories: &'b [Category]) -> BaseRenderContext<'b>
    where
        'a: 'b,
    {
        BaseRenderContext {
            config: self.config,
            index: self.index,
            locale: self.locale,
            categories,
        }
    }

    fn finish(&self, html: String, page: PageId) -> Result<Response<ResponseBody>, ServeError> {
        let html = inject_analytics(&html, self.store, Some(&self.config.site_id), Some(page));

        html_response(html)
    }

    fn category_of(&self, article: &Article) -> Result<Option<Category>, ServeError> {
        match article.category {
            Some(id) => self.store.get_category(id).map_err(storage_error),
            None => Ok(None),
        }
    }

    fn render_listing(
        &self,
        category: Option<&Category>,
        page_param: Option<&str>,
    ) -> Result<Response<ResponseBody>, ServeError> {
        let articles = self
            .store
            .list_articles(self.index.id, self.locale, category.map(|category| category.id))
            .map_err(storage_error)?;

        let urls = articles
            .iter()
            .map(|article| self.store.canonical_url(article).map_err(storage_error))
            .collect::<Result<Vec<_>, _>>()?;

        let per_page = self.index.articles_per_page(self.config.articles_per_page);
        let page = Paginator::new(per_page).page(
            articles.iter().zip(urls).collect::<Vec<_>>(),
            page_param,
        );

        let categories = self.categories()?;
        let ctx = RenderListingContext {
            base: self.base(&categories),
            category,
            articles: page.map(|(article, url)| ArticleToRender::from_article(article, url)),
        };

        let template = self
            .templates
            .listing_template(category.and(self.index.category_index_template.as_deref()));
        let html = template(&ctx);

        self.finish(html, self.index.id)
    }
}

/// Renders the listing of every live article below the index.
pub fn serve_index<S>(
    ctx: &ServeContext<S>,
    page_param: Option<&str>,
) -> Result<Response<ResponseBody>, ServeError>
where
    S: ContentStore + SiteSettingsStore,
{
    ctx.render_listing(None, page_param)
}

/// Turns a route result into a response.
///
/// A category that vanished between routing and serving, and an unmatched
/// route, are reported as [`ServeError::NotFound`].
pub fn serve<S>(
    ctx: &ServeContext<S>,
    route: RouteResult,
    page_param: Option<&str>,
) -> Result<Response<ResponseBody>, ServeError>
where
    S: ContentStore + SiteSettingsStore,
{
    match route {
        RouteResult::ArticleRedirect { target_url } => permanent_redirect(&target_url),
        RouteResult::CategoryMatch { slug } => {
            let category = ctx
                .store
                .find_category(&slug, ctx.locale)
                .map_err(storage_error)?
                .ok_or_else(|| {
                    debug!(%slug, "category disappeared before serving");
                    ServeError::NotFound
                })?;

            ctx.render_listing(Some(&category), page_param)
        }
        RouteResult::DelegatedArticleRoute(article) => {
            let category = ctx.category_of(&article)?;
            let url = ctx.store.canonical_url(&article).map_err(storage_error)?;
            let categories = ctx.categories()?;

            let render_ctx = RenderArticleContext {
                base: ctx.base(&categories),
                category: category.as_ref(),
                article: ArticleToRender::from_article(&article, url),
            };
            let html = ctx.templates.article_template()(&render_ctx);

            ctx.finish(html, article.id)
        }
        RouteResult::SubRouteMatch { name, params } => {
            let template = ctx
                .templates
                .sub_route_template(&name)
                .ok_or(ServeError::NotFound)?;
            let categories = ctx.categories()?;

            let render_ctx = RenderSubRouteContext {
                base: ctx.base(&categories),
                route_name: &name,
                params: &params,
            };
            let html = template(&render_ctx);

            ctx.finish(html, ctx.index.id)
        }
        RouteResult::Unmatched => Err(ServeError::NotFound),
    }
}

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use pretty_assertions::assert_eq;

    use crate::analytics::{AnalyticsSettings, SiteId};
    use crate::content::NewCategory;
    use crate::storage::InMemoryStorage;

    use super::*;

    fn en() -> Locale {
        Locale::new("en")
    }

    fn make_index() -> ArticleIndex {
        let mut index = ArticleIndex::new(PageId(1), "Articles", "/en/articles/", en());
        index.articles_per_page = Some(2);
        index
    }

    fn make_storage() -> InMemoryStorage {
        let storage = InMemoryStorage::new("https://example.com");
        storage.add_index(make_index()).unwrap();

        let news = storage.save_category(NewCategory::new("News", en())).unwrap();
        for day in 1..=5 {
            storage
                .add_article(Article {
                    id: PageId(10 + day as u64),
                    parent: PageId(1),
                    title: format!("Day {day}"),
                    slug: format!("day-{day}"),
                    locale: en(),
                    live: true,
                    first_published_at: Utc.with_ymd_and_hms(2024, 5, day, 8, 0, 0).single(),
                    category: Some(news.id),
                    body: String::new(),
                })
                .unwrap();
        }

        storage
    }

    async fn body_text(response: Response<ResponseBody>) -> String {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        String::from_utf8(bytes.to_vec()).unwrap()
    }

    fn listing_titles(html: &str) -> Vec<String> {
        (1..=5)
            .rev()
            .map(|day| format!("Day {day}"))
            .filter(|title| html.contains(&format!(">{title}</a>")))
            .collect()
    }

    #[tokio::test]
    async fn test_redirect() {
        let storage = make_storage();
        let config = SiteConfig::new("https://example.com");
        let templates = Templates::default();
        let index = make_index();
        let ctx = ServeContext {
            config: &config,
            store: &storage,
            templates: &templates,
            index: &index,
            locale: &index.locale,
        };

        let response = serve(
            &ctx,
            RouteResult::ArticleRedirect {
                target_url: "https://example.com/en/articles/news/day-1/".to_string(),
            },
            None,
        )
        .unwrap();

        assert_eq!(response.status(), StatusCode::MOVED_PERMANENTLY);
        assert_eq!(
            response.headers()[header::LOCATION],
            "https://example.com/en/articles/news/day-1/"
        );
    }

    #[tokio::test]
    async fn test_category_listing_is_paginated_newest_first() {
        let storage = make_storage();
        let config = SiteConfig::new("https://example.com");
        let templates = Templates::default();
        let index = make_index();
        let ctx = ServeContext {
            config: &config,
            store: &storage,
            templates: &templates,
            index: &index,
            locale: &index.locale,
        };
        let route = || RouteResult::CategoryMatch {
            slug: "news".to_string(),
        };

        let first = body_text(serve(&ctx, route(), None).unwrap()).await;
        assert_eq!(listing_titles(&first), vec!["Day 5", "Day 4"]);

        let second = body_text(serve(&ctx, route(), Some("2")).unwrap()).await;
        assert_eq!(listing_titles(&second), vec!["Day 3", "Day 2"]);

        let invalid = body_text(serve(&ctx, route(), Some("abc")).unwrap()).await;
        assert_eq!(listing_titles(&invalid), vec!["Day 5", "Day 4"]);

        let beyond = body_text(serve(&ctx, route(), Some("999")).unwrap()).await;
        assert_eq!(listing_titles(&beyond), vec!["Day 1"]);
    }

    #[tokio::test]
    async fn test_vanished_category_is_not_found() {
        let storage = make_storage();
        let config = SiteConfig::new("https://example.com");
        let templates = Templates::default();
        let index = make_index();
        let ctx = ServeContext {
            config: &config,
            store: &storage,
            templates: &templates,
            index: &index,
            locale: &index.locale,
        };

        let result = serve(
            &ctx,
            RouteResult::CategoryMatch {
                slug: "gone".to_string(),
            },
            None,
        );

        assert!(matches!(result, Err(ServeError::NotFound)));
    }

    #[tokio::test]
    async fn test_custom_category_template() {
        let storage = make_storage();
        let config = SiteConfig::new("https://example.com");
        let templates = Templates::default().add_listing_template("compact", |ctx| {
            format!(
                "<html><head></head><body>{} ({})</body></html>",
                ctx.category.map(|category| category.name.as_str()).unwrap_or(""),
                ctx.articles.count
            )
        });
        let mut index = make_index();
        index.category_index_template = Some("compact".to_string());
        let ctx = ServeContext {
            config: &config,
            store: &storage,
            templates: &templates,
            index: &index,
            locale: &index.locale,
        };

        let response = serve(
            &ctx,
            RouteResult::CategoryMatch {
                slug: "news".to_string(),
            },
            None,
        )
        .unwrap();

        assert_eq!(
            body_text(response).await,
            "<html><head></head><body>News (5)</body></html>"
        );

        let index_listing = body_text(serve_index(&ctx, None).unwrap()).await;
        assert!(index_listing.contains("<h1>Articles</h1>"));
    }

    #[tokio::test]
    async fn test_article_page_includes_analytics() {
        let storage = make_storage();
        let mut settings = AnalyticsSettings::new(SiteId::default());
        settings.enabled = true;
        settings.head_tracking_code = "<script>track()</script>".to_string();
        storage.save_analytics_settings(settings).unwrap();

        let config = SiteConfig::new("https://example.com");
        let templates = Templates::default();
        let index = make_index();
        let ctx = ServeContext {
            config: &config,
            store: &storage,
            templates: &templates,
            index: &index,
            locale: &index.locale,
        };
        let article = storage
            .find_article(PageId(1), "day-3", &en())
            .unwrap()
            .unwrap();

        let response = serve(&ctx, RouteResult::DelegatedArticleRoute(article), None).unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let html = body_text(response).await;
        assert!(html.contains("<h1>Day 3</h1>"));
        assert!(html.contains("<script>track()</script></head>"));
    }

    #[tokio::test]
    async fn test_sub_route_without_template_is_not_found() {
        let storage = make_storage();
        let config = SiteConfig::new("https://example.com");
        let templates = Templates::default();
        let index = make_index();
        let ctx = ServeContext {
            config: &config,
            store: &storage,
            templates: &templates,
            index: &index,
            locale: &index.locale,
        };

        let result = serve(
            &ctx,
            RouteResult::SubRouteMatch {
                name: "tag".to_string(),
                params: vec!["rust".to_string()],
            },
            None,
        );

        assert!(matches!(result, Err(ServeError::NotFound)));
        assert!(matches!(
            serve(&ctx, RouteResult::Unmatched, None),
            Err(ServeError::NotFound)
        ));
    }
}
