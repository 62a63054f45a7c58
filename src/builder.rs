//! Mounting controllers onto the router.
//!
//! For each controller the builder creates one instance, looks up every
//! declared handler on it by name, and registers
//! `prefix + resolve_path(base, fragment)` with the route's middleware in
//! front of the handler.

use tracing::info;

use crate::controller::ControllerType;
use crate::error::ConfigError;
use crate::middleware::Chain;
use crate::registry::Registry;
use crate::router::{Router, compile};

pub const DEFAULT_PREFIX: &str = "/api";

pub struct RouterBuilder<'a> {
    registry: &'a Registry,
    router: &'a mut Router,
    prefix: String,
}

impl<'a> RouterBuilder<'a> {
    pub fn new(registry: &'a Registry, router: &'a mut Router) -> Self {
        Self { registry, router, prefix: DEFAULT_PREFIX.to_owned() }
    }

    /// Path every controller is mounted under. `""` or `"/"` mounts at the
    /// root.
    pub fn prefix(mut self, prefix: &str) -> Self {
        self.prefix = normalize(prefix);
        self
    }

    /// Registers every route of `controller` and returns how many were
    /// added. A route whose method + path is already taken is skipped and
    /// not counted.
    ///
    /// Fails if the controller was never declared, a route names a handler
    /// the controller does not have, or a resolved path is malformed. Every
    /// route is checked first, so nothing is registered in those cases.
    pub fn mount(&mut self, controller: &ControllerType) -> Result<usize, ConfigError> {
        let id = controller.id();
        let meta = self
            .registry
            .controller_metadata(id)
            .ok_or(ConfigError::UndeclaredController(id.name()))?;
        let routes = self.registry.routes(id);

        let instance = controller.instantiate();
        let mut planned = Vec::with_capacity(routes.len());
        for route in routes {
            let handler = instance.handler(&route.handler).ok_or_else(|| ConfigError::UnknownHandler {
                controller: id.name(),
                handler: route.handler.clone(),
            })?;
            let path = join(&self.prefix, &resolve_path(&meta.base_path, &route.path));
            compile(&path)?;
            planned.push((route.method, path, Chain::new(route.middlewares.clone(), handler)));
        }

        let mut added = 0;
        for (method, path, chain) in planned {
            if self.router.route(method, &path, chain)? {
                added += 1;
            }
        }

        info!(
            controller = controller.name(),
            base_path = %join(&self.prefix, &normalize(&meta.base_path)),
            routes = added,
            "registered controller"
        );
        Ok(added)
    }

    /// Mounts each controller in order and returns the total route count.
    pub fn mount_all<'c>(
        &mut self,
        controllers: impl IntoIterator<Item = &'c ControllerType>,
    ) -> Result<usize, ConfigError> {
        let mut total = 0;
        for controller in controllers {
            total += self.mount(controller)?;
        }
        Ok(total)
    }
}

// ── Path resolution ───────────────────────────────────────────────────────────

/// Combines a controller base path with a route fragment.
///
/// A root fragment (`""` or `"/"`) maps to the base path itself, and a root
/// base leaves the fragment alone. The result always has one leading `/`,
/// no repeated `/` and no trailing `/` unless it is the root.
///
/// ```rust
/// use pathwise::builder::resolve_path;
///
/// assert_eq!(resolve_path("/auth", "/login"), "/auth/login");
/// assert_eq!(resolve_path("auth/", ""), "/auth");
/// assert_eq!(resolve_path("/", "users//{id}"), "/users/{id}");
/// ```
pub fn resolve_path(base: &str, fragment: &str) -> String {
    let base = normalize(base);
    let fragment = normalize(fragment);
    if fragment == "/" {
        base
    } else if base == "/" {
        fragment
    } else {
        format!("{base}{fragment}")
    }
}

fn join(prefix: &str, path: &str) -> String {
    normalize(&format!("{prefix}/{path}"))
}

/// Collapses repeated separators, forces one leading `/` and drops a
/// trailing one. `:name` segments are rewritten to `{name}`.
fn normalize(path: &str) -> String {
    let mut out = String::with_capacity(path.len() + 1);
    for segment in path.split('/').filter(|s| !s.is_empty()) {
        out.push('/');
        match segment.strip_prefix(':') {
            Some(name) if !name.is_empty() => {
                out.push('{');
                out.push_str(name);
                out.push('}');
            }
            _ => out.push_str(segment),
        }
    }
    if out.is_empty() {
        out.push('/');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::{Controller, Methods};
    use crate::error::HttpError;
    use crate::request::Request;
    use bytes::Bytes;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn resolves_paths() {
        assert_eq!(resolve_path("/auth", "/login"), "/auth/login");
        assert_eq!(resolve_path("/auth", ""), "/auth");
        assert_eq!(resolve_path("/auth", "/"), "/auth");
        assert_eq!(resolve_path("auth", "login/"), "/auth/login");
        assert_eq!(resolve_path("/", "/login"), "/login");
        assert_eq!(resolve_path("/", "/"), "/");
        assert_eq!(resolve_path("//a//", "//b//c"), "/a/b/c");
        assert_eq!(resolve_path("/users", "/:id"), "/users/{id}");
    }

    #[test]
    fn prefix_joins_without_doubling() {
        assert_eq!(join("/api", "/auth/login"), "/api/auth/login");
        assert_eq!(join("/api", "/"), "/api");
        assert_eq!(join("/", "/x"), "/x");
    }

    static CREATED: AtomicUsize = AtomicUsize::new(0);

    struct Widgets {
        serial: usize,
    }

    impl Widgets {
        async fn list(self: Arc<Self>, _req: Request) -> Result<String, HttpError> {
            Ok(format!("list {}", self.serial))
        }
        async fn show(self: Arc<Self>, req: Request) -> Result<String, HttpError> {
            Ok(format!("show {} {}", self.serial, req.param("id").unwrap_or("?")))
        }
    }

    impl Controller for Widgets {
        fn create() -> Self {
            Widgets { serial: CREATED.fetch_add(1, Ordering::SeqCst) }
        }
        fn methods() -> Methods<Self> {
            Methods::new().method("list", Self::list).method("show", Self::show)
        }
    }

    fn get(uri: &str) -> Request {
        http::Request::get(uri).body(Bytes::new()).unwrap().into()
    }

    #[tokio::test]
    async fn one_instance_serves_every_route() {
        let mut registry = Registry::new();
        registry.declare_controller::<Widgets>("widgets");
        registry.declare_route::<Widgets>("list", "get", "", vec![]).unwrap();
        registry.declare_route::<Widgets>("show", "GET", ":id", vec![]).unwrap();

        let before = CREATED.load(Ordering::SeqCst);
        let mut router = Router::new();
        let count = RouterBuilder::new(&registry, &mut router)
            .mount(&ControllerType::of::<Widgets>())
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(CREATED.load(Ordering::SeqCst), before + 1);

        let list = router.handle(get("/api/widgets")).await;
        let show = router.handle(get("/api/widgets/9")).await;
        assert_eq!(list.body(), format!("list {before}").as_bytes());
        assert_eq!(show.body(), format!("show {before} 9").as_bytes());
    }

    struct Sparse;

    impl Controller for Sparse {
        fn create() -> Self { Sparse }
        fn methods() -> Methods<Self> { Methods::new() }
    }

    #[test]
    fn unknown_handler_fails_without_registering() {
        let mut registry = Registry::new();
        registry.declare_controller::<Sparse>("/sparse");
        registry.declare_route::<Sparse>("nothing", "GET", "/", vec![]).unwrap();

        let mut router = Router::new();
        let err = RouterBuilder::new(&registry, &mut router)
            .mount(&ControllerType::of::<Sparse>())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UnknownHandler { ref handler, .. } if handler == "nothing"));
        assert_eq!(router.route_count(), 0);
    }

    #[test]
    fn duplicate_routes_are_counted_once() {
        let mut registry = Registry::new();
        registry.declare_controller::<Widgets>("/dupes");
        registry.declare_route::<Widgets>("list", "GET", "/x", vec![]).unwrap();
        registry.declare_route::<Widgets>("show", "GET", "/x", vec![]).unwrap();

        let mut router = Router::new();
        let count = RouterBuilder::new(&registry, &mut router)
            .mount(&ControllerType::of::<Widgets>())
            .unwrap();
        assert_eq!(count, 1);
        assert_eq!(router.route_count(), 1);
    }

    #[test]
    fn malformed_path_fails_without_registering() {
        let mut registry = Registry::new();
        registry.declare_controller::<Widgets>("/broken");
        registry.declare_route::<Widgets>("list", "GET", "/ok", vec![]).unwrap();
        registry.declare_route::<Widgets>("show", "GET", "/{*rest}/tail", vec![]).unwrap();

        let mut router = Router::new();
        let err = RouterBuilder::new(&registry, &mut router)
            .mount(&ControllerType::of::<Widgets>())
            .unwrap_err();
        assert!(matches!(err, ConfigError::InvalidPath { .. }));
        assert_eq!(router.route_count(), 0);
    }

    #[test]
    fn undeclared_controller_is_rejected() {
        let registry = Registry::new();
        let mut router = Router::new();
        let err = RouterBuilder::new(&registry, &mut router)
            .mount(&ControllerType::of::<Sparse>())
            .unwrap_err();
        assert!(matches!(err, ConfigError::UndeclaredController(_)));
    }
}
