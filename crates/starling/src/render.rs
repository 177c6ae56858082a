use std::collections::HashMap;
use std::ops::Deref;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use crate::content::{Article, ArticleIndex, Category, Locale};
use crate::date::format_date;
use crate::html::*;
use crate::pagination::Page;
use crate::SiteConfig;

#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub enum TemplateKey {
    Default,
    Custom(String),
}

pub type RenderListing = Arc<dyn Fn(&RenderListingContext) -> String + Send + Sync>;

pub type RenderArticle = Arc<dyn Fn(&RenderArticleContext) -> String + Send + Sync>;

pub type RenderSubRoute = Arc<dyn Fn(&RenderSubRouteContext) -> String + Send + Sync>;

/// The templates a site renders its pages with.
#[derive(Clone)]
pub struct Templates {
    pub(crate) listing: HashMap<TemplateKey, RenderListing>,
    pub(crate) article: RenderArticle,
    pub(crate) sub_routes: HashMap<String, RenderSubRoute>,
}

impl Default for Templates {
    fn default() -> Self {
        Self::new(default_listing_template, default_article_template)
    }
}

impl Templates {
    pub fn new(
        listing: impl Fn(&RenderListingContext) -> String + Send + Sync + 'static,
        article: impl Fn(&RenderArticleContext) -> String + Send + Sync + 'static,
    ) -> Self {
        Self {
            listing: HashMap::from_iter([(TemplateKey::Default, Arc::new(listing) as RenderListing)]),
            article: Arc::new(article),
            sub_routes: HashMap::new(),
        }
    }

    pub fn add_listing_template(
        mut self,
        name: impl Into<String>,
        template: impl Fn(&RenderListingContext) -> String + Send + Sync + 'static,
    ) -> Self {
        self.listing
            .insert(TemplateKey::Custom(name.into()), Arc::new(template));
        self
    }

    pub fn add_sub_route_template(
        mut self,
        route_name: impl Into<String>,
        template: impl Fn(&RenderSubRouteContext) -> String + Send + Sync + 'static,
    ) -> Self {
        self.sub_routes.insert(route_name.into(), Arc::new(template));
        self
    }

    /// Returns the listing template with the given name, falling back to the
    /// default listing template when no such template is registered.
    pub fn listing_template(&self, name: Option<&str>) -> &RenderListing {
        name.and_then(|name| self.listing.get(&TemplateKey::Custom(name.to_string())))
            .unwrap_or(&self.listing[&TemplateKey::Default])
    }

    pub fn article_template(&self) -> &RenderArticle {
        &self.article
    }

    pub fn sub_route_template(&self, route_name: &str) -> Option<&RenderSubRoute> {
        self.sub_routes.get(route_name)
    }
}

pub struct BaseRenderContext<'a> {
    pub(crate) config: &'a SiteConfig,
    pub index: &'a ArticleIndex,
    pub locale: &'a Locale,
    /// The categories of the current locale, ordered by name.
    pub categories: &'a [Category],
}

impl<'a> BaseRenderContext<'a> {
    pub fn base_url(&self) -> &'a str {
        &self.config.base_url
    }

    /// Formats a date in the site's timezone.
    pub fn format_date(&self, date: &DateTime<Utc>, format: &str) -> String {
        format_date(date, format, self.config.timezone)
    }

    /// Returns the path of the listing page for the given category.
    pub fn category_path(&self, category: &Category) -> String {
        format!("{}{}/", self.index.url_path(), category.slug)
    }
}

pub struct ArticleToRender<'a> {
    pub title: &'a str,
    pub slug: &'a str,
    pub url: String,
    pub first_published_at: Option<&'a DateTime<Utc>>,
    pub body: &'a str,
}

impl<'a> ArticleToRender<'a> {
    pub fn from_article(article: &'a Article, url: String) -> Self {
        Self {
            title: &article.title,
            slug: &article.slug,
            url,
            first_published_at: article.first_published_at.as_ref(),
            body: &article.body,
        }
    }
}

/// The context of an article listing: the index itself, or one of its categories.
pub struct RenderListingContext<'a> {
    pub(crate) base: BaseRenderContext<'a>,
    pub category: Option<&'a Category>,
    pub articles: Page<ArticleToRender<'a>>,
}

impl<'a> Deref for RenderListingContext<'a> {
    type Target = BaseRenderContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

pub struct RenderArticleContext<'a> {
    pub(crate) base: BaseRenderContext<'a>,
    pub category: Option<&'a Category>,
    pub article: ArticleToRender<'a>,
}

impl<'a> Deref for RenderArticleContext<'a> {
    type Target = BaseRenderContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

pub struct RenderSubRouteContext<'a> {
    pub(crate) base: BaseRenderContext<'a>,
    pub route_name: &'a str,
    pub params: &'a [String],
}

impl<'a> Deref for RenderSubRouteContext<'a> {
    type Target = BaseRenderContext<'a>;

    fn deref(&self) -> &Self::Target {
        &self.base
    }
}

fn layout(base: &BaseRenderContext, page_title: &str, content: HtmlElement) -> String {
    let categories = base.categories.iter().map(|category| {
        li().child(
            a().href(base.category_path(category))
                .text(&category.name),
        )
    });

    let document = html()
        .lang(base.locale.language_code())
        .child(
            head()
                .child(meta().attr("charset", "utf-8"))
                .child(title().text(page_title)),
        )
        .child(
            body()
                .child(
                    nav().child(
                        a().href(base.index.url_path())
                            .text(&base.index.title),
                    )
                    .child(ul().class("categories").children(categories)),
                )
                .child(content),
        );

    match document.render_to_string() {
        Ok(rendered) => format!("<!DOCTYPE html>\n{rendered}"),
        Err(_) => String::new(),
    }
}

fn published_at(base: &BaseRenderContext, article: &ArticleToRender) -> Option<HtmlElement> {
    article.first_published_at.map(|date| {
        time()
            .attr("datetime", date.to_rfc3339())
            .text(base.format_date(date, "%B %-d, %Y"))
    })
}

pub fn default_listing_template(ctx: &RenderListingContext) -> String {
    let heading = match ctx.category {
        Some(category) => category.name.as_str(),
        None => ctx.index.title.as_str(),
    };

    let articles = ctx.articles.items.iter().map(|article| {
        li().class("article")
            .child(a().href(article.url.as_str()).text(article.title))
            .children(published_at(ctx, article))
    });

    let mut pager = nav().class("pagination");
    if let Some(previous) = ctx.articles.previous_page_number() {
        pager = pager.child(a().attr("rel", "prev").href(format!("?page={previous}")).text("Previous"));
    }
    pager = pager.child(span().text(format!(
        "Page {} of {}",
        ctx.articles.number, ctx.articles.num_pages
    )));
    if let Some(next) = ctx.articles.next_page_number() {
        pager = pager.child(a().attr("rel", "next").href(format!("?page={next}")).text("Next"));
    }

    let content = section()
        .class("listing")
        .child(h1().text(heading))
        .children(
            ctx.category
                .filter(|category| !category.description.is_empty())
                .map(|category| p().class("description").text(&category.description)),
        )
        .child(ul().class("articles").children(articles))
        .child(pager);

    layout(ctx, heading, content)
}

pub fn default_article_template(ctx: &RenderArticleContext) -> String {
    let content = article()
        .child(h1().text(ctx.article.title))
        .children(
            ctx.category
                .map(|category| a().class("category").href(ctx.category_path(category)).text(&category.name)),
        )
        .children(published_at(ctx, &ctx.article))
        .child(div().class("body").text(ctx.article.body));

    layout(ctx, ctx.article.title, content)
}
