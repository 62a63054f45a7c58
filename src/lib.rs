//! # pathwise
//!
//! Declarative controller routing for hyper services.
//!
//! Controllers state what they serve as data: a base path, and per handler
//! a verb, a path fragment and the middleware to run first. At startup the
//! controller modules are discovered, each controller is instantiated once,
//! and every route is mounted under `/api` in a radix-tree dispatch table.
//!
//! What pathwise does:
//!
//! - Route declaration into a [`Registry`], keyed by controller type
//! - Discovery of controller modules by glob pattern, tolerant of modules
//!   that fail to load
//! - Token authentication middleware (required, optional, role gate)
//! - One JSON error shape for 401, 403, 404 and 500
//!
//! ## Quick start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pathwise::discovery::{LoadResult, Manifest, ModuleScope};
//! use pathwise::{AppConfig, Controller, HttpError, Methods, Request, Server};
//!
//! struct Users;
//!
//! impl Users {
//!     async fn show(self: Arc<Self>, req: Request) -> Result<String, HttpError> {
//!         Ok(format!("user {}", req.param("id").unwrap_or("?")))
//!     }
//! }
//!
//! impl Controller for Users {
//!     fn create() -> Self { Users }
//!     fn methods() -> Methods<Self> { Methods::new().method("show", Self::show) }
//! }
//!
//! fn load(scope: &mut ModuleScope<'_>) -> LoadResult {
//!     scope.registry().declare_controller::<Users>("/users");
//!     scope.registry().declare_route::<Users>("show", "GET", "/{id}", vec![])?;
//!     scope.export::<Users>();
//!     Ok(())
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), pathwise::Error> {
//!     let config = AppConfig::from_env();
//!     let manifest = Manifest::new().module("modules/users/controllers/users_controller.rs", load);
//!     let app = pathwise::bootstrap(&config, &manifest)?;
//!     Server::bind(&config.bind_addr())?.serve(app.router).await
//! }
//! ```

mod handler;
mod method;
mod request;
mod response;

pub mod app;
pub mod builder;
pub mod config;
pub mod controller;
pub mod discovery;
pub mod error;
pub mod health;
pub mod middleware;
pub mod modules;
pub mod openapi;
pub mod registry;
pub mod router;
pub mod server;
pub mod token;

pub use app::{App, bootstrap};
pub use config::{AppConfig, Environment};
pub use controller::{Controller, ControllerId, ControllerType, Methods};
pub use error::{ConfigError, Error, ErrorReporter, HttpError, LoadError};
pub use handler::{BoxedHandler, Handler, handler_fn};
pub use method::Method;
pub use request::Request;
pub use response::{IntoResponse, Json, Response, ResponseBuilder};
pub use router::Router;
pub use server::Server;
