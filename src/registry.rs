//! Route metadata registry.
//!
//! Controllers declare their base path and routes here with plain function
//! calls. The registry is filled while modules load, then frozen behind an
//! `Arc` and only read while the router is built.

use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::warn;

use crate::controller::{Controller, ControllerId};
use crate::error::ConfigError;
use crate::method::Method;
use crate::middleware::BoxedMiddleware;

/// Declared once per controller type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ControllerMetadata {
    pub base_path: String,
}

/// One declared endpoint of a controller.
#[derive(Clone)]
pub struct RouteDescriptor {
    pub method: Method,
    pub path: String,
    pub handler: String,
    pub middlewares: Vec<BoxedMiddleware>,
}

impl fmt::Debug for RouteDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteDescriptor")
            .field("method", &self.method)
            .field("path", &self.path)
            .field("handler", &self.handler)
            .field("middlewares", &self.middlewares.len())
            .finish()
    }
}

// ── Documentation metadata ────────────────────────────────────────────────────

/// Descriptive metadata for one handler. Never consulted by routing or auth.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DocMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<String>,
    #[serde(default)]
    pub request: RequestDoc,
    /// Keyed by status code, e.g. `"200"`.
    #[serde(default)]
    pub responses: BTreeMap<String, ResponseDoc>,
}

/// JSON schemas describing the request.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct RequestDoc {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub body: Option<Value>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ResponseDoc {
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl DocMetadata {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn summary(mut self, summary: impl Into<String>) -> Self {
        self.summary = Some(summary.into());
        self
    }

    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    pub fn operation_id(mut self, id: impl Into<String>) -> Self {
        self.operation_id = Some(id.into());
        self
    }

    pub fn query(mut self, schema: Value) -> Self {
        self.request.query = Some(schema);
        self
    }

    pub fn params(mut self, schema: Value) -> Self {
        self.request.params = Some(schema);
        self
    }

    pub fn body(mut self, schema: Value) -> Self {
        self.request.body = Some(schema);
        self
    }

    pub fn response(mut self, status: u16, description: impl Into<String>) -> Self {
        self.responses.insert(
            status.to_string(),
            ResponseDoc { description: description.into(), schema: None },
        );
        self
    }

    pub fn response_with_schema(mut self, status: u16, description: impl Into<String>, schema: Value) -> Self {
        self.responses.insert(
            status.to_string(),
            ResponseDoc { description: description.into(), schema: Some(schema) },
        );
        self
    }
}

// ── Registry ──────────────────────────────────────────────────────────────────

/// Controller metadata, route descriptors and documentation, keyed by
/// controller identity.
#[derive(Default)]
pub struct Registry {
    controllers: HashMap<ControllerId, ControllerMetadata>,
    routes: HashMap<ControllerId, Vec<RouteDescriptor>>,
    docs: HashMap<(ControllerId, String), DocMetadata>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `base_path` for `C`. Declaring again replaces the previous
    /// base path; a differing value is logged as a warning.
    pub fn declare_controller<C: Controller>(&mut self, base_path: impl Into<String>) {
        self.set_controller(ControllerId::of::<C>(), ControllerMetadata { base_path: base_path.into() });
    }

    /// Appends a route to `C`'s list. `verb` is parsed case-insensitively;
    /// an unsupported verb is rejected here rather than at bootstrap.
    pub fn declare_route<C: Controller>(
        &mut self,
        handler: &str,
        verb: &str,
        path: &str,
        middlewares: Vec<BoxedMiddleware>,
    ) -> Result<(), ConfigError> {
        let method = verb.parse::<Method>()?;
        self.routes.entry(ControllerId::of::<C>()).or_default().push(RouteDescriptor {
            method,
            path: path.to_owned(),
            handler: handler.to_owned(),
            middlewares,
        });
        Ok(())
    }

    /// Attaches documentation to one of `C`'s handlers. Last write wins.
    pub fn document<C: Controller>(&mut self, handler: &str, doc: DocMetadata) {
        self.docs.insert((ControllerId::of::<C>(), handler.to_owned()), doc);
    }

    pub fn controller_metadata(&self, id: ControllerId) -> Option<&ControllerMetadata> {
        self.controllers.get(&id)
    }

    /// Declared routes in declaration order; empty when there are none.
    pub fn routes(&self, id: ControllerId) -> &[RouteDescriptor] {
        self.routes.get(&id).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn docs(&self, id: ControllerId, handler: &str) -> Option<&DocMetadata> {
        self.docs.get(&(id, handler.to_owned()))
    }

    pub fn is_declared(&self, id: ControllerId) -> bool {
        self.controllers.contains_key(&id)
    }

    /// Ends the declaration phase. The returned handle is read-only.
    pub fn freeze(self) -> Arc<Registry> {
        Arc::new(self)
    }

    /// Folds the declarations of one loaded module into this registry.
    pub(crate) fn merge(&mut self, other: Registry) {
        for (id, meta) in other.controllers {
            self.set_controller(id, meta);
        }
        for (id, routes) in other.routes {
            self.routes.entry(id).or_default().extend(routes);
        }
        self.docs.extend(other.docs);
    }

    fn set_controller(&mut self, id: ControllerId, meta: ControllerMetadata) {
        if let Some(previous) = self.controllers.get(&id) {
            if previous.base_path != meta.base_path {
                warn!(
                    controller = id.name(),
                    previous = %previous.base_path,
                    current = %meta.base_path,
                    "controller base path redeclared; last declaration wins"
                );
            }
        }
        self.controllers.insert(id, meta);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Methods;

    struct Users;

    impl Controller for Users {
        fn create() -> Self { Users }
        fn methods() -> Methods<Self> { Methods::new() }
    }

    #[test]
    fn routes_keep_declaration_order() {
        let mut registry = Registry::new();
        registry.declare_controller::<Users>("/users");
        registry.declare_route::<Users>("list", "get", "/", vec![]).unwrap();
        registry.declare_route::<Users>("create", "POST", "/", vec![]).unwrap();

        let id = ControllerId::of::<Users>();
        let routes = registry.routes(id);
        assert_eq!(routes.len(), 2);
        assert_eq!(routes[0].handler, "list");
        assert_eq!(routes[0].method, Method::Get);
        assert_eq!(routes[1].method, Method::Post);
    }

    #[test]
    fn routes_default_to_empty() {
        let registry = Registry::new();
        assert!(registry.routes(ControllerId::of::<Users>()).is_empty());
        assert!(registry.controller_metadata(ControllerId::of::<Users>()).is_none());
    }

    #[test]
    fn bad_verb_is_rejected_at_declaration() {
        let mut registry = Registry::new();
        let err = registry.declare_route::<Users>("list", "FETCH", "/", vec![]).unwrap_err();
        assert!(matches!(err, ConfigError::InvalidVerb(_)));
        assert!(registry.routes(ControllerId::of::<Users>()).is_empty());
    }

    #[test]
    fn redeclaration_last_write_wins() {
        let mut registry = Registry::new();
        registry.declare_controller::<Users>("/users");
        registry.declare_controller::<Users>("/people");
        let meta = registry.controller_metadata(ControllerId::of::<Users>()).unwrap();
        assert_eq!(meta.base_path, "/people");
    }

    #[test]
    fn merge_appends_routes() {
        let mut shared = Registry::new();
        shared.declare_route::<Users>("list", "GET", "/", vec![]).unwrap();

        let mut module = Registry::new();
        module.declare_controller::<Users>("/users");
        module.declare_route::<Users>("show", "GET", "/{id}", vec![]).unwrap();
        module.document::<Users>("show", DocMetadata::new().summary("Show a user"));
        shared.merge(module);

        let id = ControllerId::of::<Users>();
        assert!(shared.is_declared(id));
        assert_eq!(shared.routes(id).len(), 2);
        assert_eq!(shared.docs(id, "show").unwrap().summary.as_deref(), Some("Show a user"));
    }
}
