use std::fs;
use std::net::SocketAddr;
use std::path::PathBuf;

use anyhow::{anyhow, Context, Result};
use chrono::{DateTime, Utc};
use clap::Parser;
use serde::Deserialize;
use starling::analytics::AnalyticsSettings;
use starling::content::{Article, ArticleIndex, Locale, NewCategory, PageId};
use starling::html::{a, body, h1, head, html, li, title, ul, HtmlElement};
use starling::render::Templates;
use starling::routing::{CategoryRouter, PatternRoute};
use starling::storage::{ContentStore, InMemoryStorage};
use starling::{Site, SiteConfig};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(about = "Serves a demo blog with category routing")]
struct Args {
    /// The site configuration file.
    #[arg(long, default_value = "demos/blog/content/site.toml")]
    config: PathBuf,

    /// The content fixture to load.
    #[arg(long, default_value = "demos/blog/content/content.toml")]
    content: PathBuf,

    #[arg(long, default_value_t = 3000)]
    port: u16,
}

#[derive(Deserialize)]
struct Fixture {
    #[serde(default)]
    indexes: Vec<FixtureIndex>,
    #[serde(default)]
    categories: Vec<NewCategory>,
    #[serde(default)]
    articles: Vec<FixtureArticle>,
    analytics: Option<AnalyticsSettings>,
}

#[derive(Deserialize)]
struct FixtureIndex {
    id: PageId,
    title: String,
    url_path: String,
    locale: Option<Locale>,
    articles_per_page: Option<usize>,
    /// The listing template used for category pages of this index.
    category_index_template: Option<String>,
}

#[derive(Deserialize)]
struct FixtureArticle {
    id: PageId,
    parent: PageId,
    title: String,
    slug: String,
    locale: Locale,
    #[serde(default = "default_live")]
    live: bool,
    first_published_at: Option<DateTime<Utc>>,
    /// The slug of the article's category, in the article's locale.
    category: Option<String>,
    #[serde(default)]
    body: String,
}

fn default_live() -> bool {
    true
}

fn load_fixture(
    config: &SiteConfig,
    storage: &InMemoryStorage,
    text: &str,
) -> Result<Vec<ArticleIndex>> {
    let fixture: Fixture = toml::from_str(text).context("invalid content fixture")?;

    let mut indexes = Vec::new();
    for raw in fixture.indexes {
        let locale = raw.locale.unwrap_or_else(|| config.default_language.clone());
        let mut index = ArticleIndex::new(raw.id, raw.title, &raw.url_path, locale);
        index.articles_per_page = raw.articles_per_page;
        index.category_index_template = raw.category_index_template;

        storage.add_index(index.clone())?;
        indexes.push(index);
    }

    for category in fixture.categories {
        let saved = storage.save_category(category)?;
        tracing::debug!(name = %saved.name, slug = %saved.slug, locale = %saved.locale, "saved category");
    }

    for raw in fixture.articles {
        let category = match raw.category {
            Some(slug) => Some(
                storage
                    .find_category(&slug, &raw.locale)?
                    .ok_or_else(|| anyhow!("unknown category '{slug}' for article '{}'", raw.slug))?
                    .id,
            ),
            None => None,
        };

        storage.add_article(Article {
            id: raw.id,
            parent: raw.parent,
            title: raw.title,
            slug: raw.slug,
            locale: raw.locale,
            live: raw.live,
            first_published_at: raw.first_published_at,
            category,
            body: raw.body,
        })?;
    }

    if let Some(analytics) = fixture.analytics {
        storage.save_analytics_settings(analytics)?;
    }

    Ok(indexes)
}

fn render_document(heading: &str, content: HtmlElement) -> String {
    let document = html()
        .child(head().child(title().text(heading)))
        .child(body().child(h1().text(heading)).child(content));

    match document.render_to_string() {
        Ok(rendered) => format!("<!DOCTYPE html>\n{rendered}"),
        Err(_) => String::new(),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,starling=debug".into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();

    let config = SiteConfig::from_path(&args.config)
        .with_context(|| format!("failed to load {}", args.config.display()))?;
    let storage = InMemoryStorage::new(config.base_url.clone());

    let text = fs::read_to_string(&args.content)
        .with_context(|| format!("failed to read {}", args.content.display()))?;
    let indexes = load_fixture(&config, &storage, &text)?;

    let templates = Templates::default()
        .add_listing_template("compact", |ctx| {
            let heading = ctx
                .category
                .map_or(ctx.index.title.as_str(), |category| category.name.as_str());
            let articles = ctx.articles.items.iter().map(|article| {
                li().child(a().href(article.url.as_str()).text(article.title))
            });

            render_document(heading, ul().children(articles))
        })
        .add_sub_route_template("tag", |ctx| {
            let heading = format!("Tagged: {}", ctx.params.join(", "));

            render_document(&heading, a().href(ctx.index.url_path()).text(&ctx.index.title))
        });

    let mut builder = Site::builder()
        .config(config)
        .storage(storage)
        .templates(templates);
    for index in indexes {
        let router = CategoryRouter::<InMemoryStorage>::new(index)
            .with_sub_route(PatternRoute::new("tag", "tags/<tag>"));
        builder = builder.add_router(router);
    }
    let site = builder.build();

    let addr = SocketAddr::from(([127, 0, 0, 1], args.port));
    site.serve(addr).await?;

    Ok(())
}
