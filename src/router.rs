//! Radix-tree dispatch table.
//!
//! One table per HTTP method. Every entry is a [`Chain`]: the route's
//! middleware followed by its bound handler. The table is filled during
//! bootstrap and read-only afterwards.
//!
//! The method's radix tree finds a candidate in O(path-length). When routes
//! overlap (`/users/{id}` and `/users/new`), the earliest registration that
//! accepts the path is dispatched, so declaration order decides and not the
//! tree's static-before-param preference.
//!
//! A request that matches nothing gets a JSON 404 naming the method and the
//! URL the client sent.

use std::collections::HashMap;

use matchit::{InsertError, Router as MatchitRouter};
use tracing::warn;

use crate::error::{ConfigError, ErrorReporter, HttpError};
use crate::handler::BoxedHandler;
use crate::method::Method;
use crate::middleware::Chain;
use crate::request::Request;
use crate::response::Response;

/// A registered method + path pair, as listed by [`Router::routes`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RouteEntry {
    pub method: Method,
    pub path: String,
}

struct Route {
    path: String,
    pattern: MatchitRouter<()>,
    chain: Chain,
}

/// Routes of one method. `index` maps a pattern to its position in `routes`.
#[derive(Default)]
struct Table {
    index: MatchitRouter<usize>,
    routes: Vec<Route>,
}

impl Table {
    fn find(&self, path: &str) -> Option<(Chain, HashMap<String, String>)> {
        let end = match self.index.at(path) {
            Ok(hit) => *hit.value + 1,
            Err(_) => self.routes.len(),
        };
        self.routes[..end].iter().find_map(|route| {
            let matched = route.pattern.at(path).ok()?;
            let params = matched.params.iter()
                .map(|(k, v)| (k.to_owned(), v.to_owned()))
                .collect();
            Some((route.chain.clone(), params))
        })
    }
}

/// Checks that `path` is a well-formed route pattern.
pub(crate) fn compile(path: &str) -> Result<MatchitRouter<()>, ConfigError> {
    let mut pattern = MatchitRouter::new();
    pattern
        .insert(path, ())
        .map_err(|e| ConfigError::InvalidPath { path: path.to_owned(), reason: e.to_string() })?;
    Ok(pattern)
}

/// The application router.
///
/// Build it once at startup (usually through [`bootstrap`](crate::app::bootstrap)),
/// then hand it to [`Server::serve`](crate::Server::serve) or call
/// [`handle`](Router::handle) directly.
pub struct Router {
    tables: HashMap<Method, Table>,
    entries: Vec<RouteEntry>,
    reporter: ErrorReporter,
}

impl Router {
    pub fn new() -> Self {
        Self { tables: HashMap::new(), entries: Vec::new(), reporter: ErrorReporter::default() }
    }

    /// Sets how failures are rendered. Returns `self` for chaining.
    pub fn with_reporter(mut self, reporter: ErrorReporter) -> Self {
        self.reporter = reporter;
        self
    }

    pub fn reporter(&self) -> ErrorReporter {
        self.reporter
    }

    /// Adds `chain` under `method` + `path`.
    ///
    /// Path parameters use `{name}` syntax. When the pair is already taken
    /// the first registration stays in place, a warning is logged and
    /// `Ok(false)` is returned. A path that an earlier route already accepts
    /// is added but logged as shadowed.
    pub fn route(&mut self, method: Method, path: &str, chain: Chain) -> Result<bool, ConfigError> {
        let pattern = compile(path)?;
        let table = self.tables.entry(method).or_default();
        match table.index.insert(path, table.routes.len()) {
            Ok(()) => {}
            Err(InsertError::Conflict { with }) => {
                warn!(%method, %path, existing = %with, "route already registered; keeping the first one");
                return Ok(false);
            }
            Err(e) => return Err(ConfigError::InvalidPath { path: path.to_owned(), reason: e.to_string() }),
        }

        if let Some(earlier) = table.routes.iter().find(|r| r.pattern.at(path).is_ok()) {
            warn!(%method, %path, shadowed_by = %earlier.path, "route overlaps an earlier registration, which takes precedence");
        }
        table.routes.push(Route { path: path.to_owned(), pattern, chain });
        self.entries.push(RouteEntry { method, path: path.to_owned() });
        Ok(true)
    }

    /// Adds a handler that runs without middleware.
    pub fn on(&mut self, method: Method, path: &str, handler: BoxedHandler) -> Result<bool, ConfigError> {
        self.route(method, path, Chain::new(Vec::new(), handler))
    }

    /// Registered routes in registration order.
    pub fn routes(&self) -> &[RouteEntry] {
        &self.entries
    }

    /// Number of dispatch entries.
    pub fn route_count(&self) -> usize {
        self.entries.len()
    }

    /// Routes one request and produces its response. Never fails: unmatched
    /// requests and handler errors are rendered by the error reporter.
    pub async fn handle(&self, mut req: Request) -> Response {
        let url = req.original_url();
        let method = req.method().clone();

        let Some((chain, params)) = self.lookup(&method, req.path()) else {
            let err = HttpError::not_found(format!("Route {method} {url} not found"));
            return self.reporter.report(method.as_str(), &url, err);
        };

        req.set_params(params);
        match chain.run(req).await {
            Ok(resp) => resp,
            Err(e) => self.reporter.report(method.as_str(), &url, e),
        }
    }

    /// A trailing `/` is ignored when the exact path has no route.
    fn lookup(&self, method: &http::Method, path: &str) -> Option<(Chain, HashMap<String, String>)> {
        let table = self.tables.get(&Method::from_http(method)?)?;
        table.find(path).or_else(|| {
            if path.len() > 1 && path.ends_with('/') {
                table.find(path.trim_end_matches('/'))
            } else {
                None
            }
        })
    }
}

impl Default for Router {
    fn default() -> Self { Self::new() }
}
