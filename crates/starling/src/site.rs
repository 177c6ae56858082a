use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use thiserror::Error;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

use crate::content::ArticleIndex;
use crate::render::Templates;
use crate::routing::{dispatch, CategoryRouter, RoutingError, SubRoute};
use crate::serve::{serve, serve_index, status_response, ResponseBody, ServeContext, ServeError};
use crate::storage::{ContentStore, SiteSettingsStore};
use crate::SiteConfig;

#[derive(Error, Debug)]
pub enum ServeSiteError {
    #[error("async IO error: {0}")]
    AsyncIo(#[from] tokio::io::Error),
}

pub struct Site<S> {
    config: SiteConfig,
    store: S,
    templates: Templates,
    routers: Vec<CategoryRouter<S>>,
}

impl Site<()> {
    pub fn builder() -> SiteBuilder<()> {
        SiteBuilder::new()
    }
}

impl<S> Site<S>
where
    S: ContentStore + SiteSettingsStore,
{
    pub fn config(&self) -> &SiteConfig {
        &self.config
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Returns the router of the index the path belongs to, along with the path
    /// segments below that index.
    ///
    /// When indexes are nested, the deepest one wins.
    fn find_router(&self, path: &str) -> Option<(&CategoryRouter<S>, Vec<String>)> {
        self.routers
            .iter()
            .filter_map(|router| {
                router
                    .index()
                    .remaining_segments(path)
                    .map(|segments| (router, segments))
            })
            .max_by_key(|(router, _)| router.index().url_path().len())
    }

    /// Handles a GET request for the given path and raw query string.
    pub fn handle(&self, path: &str, query: Option<&str>) -> Response<ResponseBody> {
        let Some((router, segments)) = self.find_router(path) else {
            debug!(path, "no article index for path");
            return status_response(StatusCode::NOT_FOUND);
        };

        let index = router.index();
        let page_param = query.and_then(page_param);
        let ctx = ServeContext {
            config: &self.config,
            store: &self.store,
            templates: &self.templates,
            index,
            locale: &index.locale,
        };

        let result = if segments.is_empty() {
            serve_index(&ctx, page_param.as_deref())
        } else {
            match dispatch(router, &self.store, &segments, &index.locale) {
                Ok(route) => serve(&ctx, route, page_param.as_deref()),
                Err(RoutingError::NotFound) => Err(ServeError::NotFound),
                Err(RoutingError::Storage(err)) => Err(ServeError::Storage(err)),
            }
        };

        match result {
            Ok(response) => response,
            Err(ServeError::NotFound) => status_response(StatusCode::NOT_FOUND),
            Err(err) => {
                error!(path, error = %err, "failed to serve request");
                status_response(StatusCode::INTERNAL_SERVER_ERROR)
            }
        }
    }

    pub fn handle_request<B>(&self, req: &Request<B>) -> Response<ResponseBody> {
        match *req.method() {
            Method::GET | Method::HEAD => self.handle(req.uri().path(), req.uri().query()),
            _ => status_response(StatusCode::METHOD_NOT_ALLOWED),
        }
    }
}

impl<S> Site<S>
where
    S: ContentStore + SiteSettingsStore + Send + Sync + 'static,
{
    pub async fn serve(self, addr: SocketAddr) -> Result<(), ServeSiteError> {
        let listener = TcpListener::bind(addr).await?;
        info!(%addr, "serving site");

        let site = Arc::new(self);

        loop {
            let (stream, remote_addr) = listener.accept().await?;

            let io = TokioIo::new(stream);
            let site = site.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req: Request<hyper::body::Incoming>| {
                    let site = site.clone();
                    async move { Ok::<_, Infallible>(site.handle_request(&req)) }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!(%remote_addr, error = ?err, "error serving connection");
                }
            });
        }
    }
}

fn page_param(query: &str) -> Option<String> {
    url::form_urlencoded::parse(query.as_bytes())
        .find(|(key, _)| key == "page")
        .map(|(_, value)| value.into_owned())
}

pub struct SiteBuilder<T> {
    state: T,
}

impl SiteBuilder<()> {
    pub fn new() -> Self {
        Self { state: () }
    }

    pub fn config(self, config: SiteConfig) -> SiteBuilder<WithConfig> {
        SiteBuilder {
            state: WithConfig { config },
        }
    }
}

impl Default for SiteBuilder<()> {
    fn default() -> Self {
        Self::new()
    }
}

pub struct WithConfig {
    config: SiteConfig,
}

impl SiteBuilder<WithConfig> {
    pub fn storage<S>(self, store: S) -> SiteBuilder<WithStorage<S>>
    where
        S: ContentStore + SiteSettingsStore,
    {
        SiteBuilder {
            state: WithStorage {
                config: self.state.config,
                store,
                templates: Templates::default(),
                routers: Vec::new(),
            },
        }
    }
}

pub struct WithStorage<S> {
    config: SiteConfig,
    store: S,
    templates: Templates,
    routers: Vec<CategoryRouter<S>>,
}

impl<S> SiteBuilder<WithStorage<S>>
where
    S: ContentStore + SiteSettingsStore,
{
    pub fn templates(mut self, templates: Templates) -> Self {
        self.state.templates = templates;
        self
    }

    /// Serves the given index with category routing and no sub-routes.
    pub fn add_index(self, index: ArticleIndex) -> Self {
        self.add_router(CategoryRouter::new(index))
    }

    pub fn add_router(mut self, router: CategoryRouter<S>) -> Self {
        self.state.routers.push(router);
        self
    }

    /// Adds a sub-route to every index registered so far with the given id.
    pub fn add_sub_route<R>(mut self, index_id: crate::content::PageId, sub_route: R) -> Self
    where
        R: SubRoute<S> + Clone + 'static,
    {
        for router in &mut self.state.routers {
            if router.index().id == index_id {
                router.add_sub_route(sub_route.clone());
            }
        }
        self
    }

    pub fn build(self) -> Site<S> {
        Site {
            config: self.state.config,
            store: self.state.store,
            templates: self.state.templates,
            routers: self.state.routers,
        }
    }
}
