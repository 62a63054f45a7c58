//! Controllers and their handler records.
//!
//! A controller is a type grouping related handlers under one base path.
//! Instead of reflecting over methods, each controller lists its handlers
//! by name in a [`Methods`] table:
//!
//! ```rust
//! use std::sync::Arc;
//! use pathwise::{Controller, HttpError, Methods, Request};
//!
//! struct Greeter;
//!
//! impl Greeter {
//!     async fn hello(self: Arc<Self>, _req: Request) -> Result<&'static str, HttpError> {
//!         Ok("hello")
//!     }
//! }
//!
//! impl Controller for Greeter {
//!     fn create() -> Self { Greeter }
//!     fn methods() -> Methods<Self> {
//!         Methods::new().method("hello", Self::hello)
//!     }
//! }
//! ```
//!
//! Route descriptors refer to these names; the router builder binds every
//! named method to one shared instance.

use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::handler::{BoxedHandler, Handler};

/// A type that groups route handlers.
pub trait Controller: Send + Sync + Sized + 'static {
    /// Builds the instance every route of this controller is bound to.
    /// Called once per bootstrap.
    fn create() -> Self;

    /// The handler records, by name.
    fn methods() -> Methods<Self>;
}

// ── Identity ──────────────────────────────────────────────────────────────────

/// Stable identity of a controller type.
///
/// Equality and hashing use only the `TypeId`; the name is for logs. Two
/// controllers with the same short name in different modules stay distinct.
#[derive(Clone, Copy)]
pub struct ControllerId {
    type_id: TypeId,
    name: &'static str,
}

impl ControllerId {
    pub fn of<C: 'static>() -> Self {
        Self { type_id: TypeId::of::<C>(), name: std::any::type_name::<C>() }
    }

    /// Fully qualified type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Type name without its module path.
    pub fn short_name(&self) -> &'static str {
        self.name.rsplit("::").next().unwrap_or(self.name)
    }
}

impl PartialEq for ControllerId {
    fn eq(&self, other: &Self) -> bool {
        self.type_id == other.type_id
    }
}

impl Eq for ControllerId {}

impl Hash for ControllerId {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.type_id.hash(state);
    }
}

impl fmt::Debug for ControllerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

// ── Handler records ───────────────────────────────────────────────────────────

type Binder<C> = Box<dyn FnOnce(Arc<C>) -> BoxedHandler + Send>;

/// Named, not-yet-bound controller methods.
pub struct Methods<C> {
    entries: Vec<(&'static str, Binder<C>)>,
}

impl<C: Send + Sync + 'static> Methods<C> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    /// Adds a method under `name`. Returns `self` for chaining.
    pub fn method(mut self, name: &'static str, handler: impl Handler<C>) -> Self {
        self.entries.push((name, Box::new(move |instance| handler.bind(instance))));
        self
    }

    pub fn names(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.entries.iter().map(|(name, _)| *name)
    }

    /// Binds every method to `instance`. A repeated name keeps the last one.
    pub(crate) fn bind(self, instance: Arc<C>) -> HashMap<&'static str, BoxedHandler> {
        self.entries
            .into_iter()
            .map(|(name, binder)| (name, binder(Arc::clone(&instance))))
            .collect()
    }
}

impl<C: Send + Sync + 'static> Default for Methods<C> {
    fn default() -> Self { Self::new() }
}

// ── Erased controller type ────────────────────────────────────────────────────

/// A controller type with its generic parts erased, so discovery can hand
/// out a list of them.
#[derive(Clone, Copy)]
pub struct ControllerType {
    id: ControllerId,
    instantiate: fn() -> Instance,
}

impl ControllerType {
    pub fn of<C: Controller>() -> Self {
        Self { id: ControllerId::of::<C>(), instantiate: instantiate::<C> }
    }

    pub fn id(&self) -> ControllerId {
        self.id
    }

    pub fn name(&self) -> &'static str {
        self.id.short_name()
    }

    /// Creates the controller and binds its methods.
    pub(crate) fn instantiate(&self) -> Instance {
        (self.instantiate)()
    }
}

impl fmt::Debug for ControllerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ControllerType").field(&self.id).finish()
    }
}

impl PartialEq for ControllerType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ControllerType {}

/// One live controller and its bound handlers.
pub(crate) struct Instance {
    handlers: HashMap<&'static str, BoxedHandler>,
}

impl Instance {
    pub(crate) fn handler(&self, name: &str) -> Option<BoxedHandler> {
        self.handlers.get(name).cloned()
    }
}

fn instantiate<C: Controller>() -> Instance {
    let instance = Arc::new(C::create());
    Instance { handlers: C::methods().bind(instance) }
}
