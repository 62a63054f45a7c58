//! Startup wiring: discovery, then mounting, then the fixed routes.
//!
//! Everything here runs once, before the server accepts a connection. A
//! configuration error stops startup; a module that fails to load does not.

use std::sync::Arc;
use std::time::Instant;

use http::Extensions;
use serde_json::Value;
use tracing::{info, warn};

use crate::builder::RouterBuilder;
use crate::config::AppConfig;
use crate::controller::ControllerType;
use crate::discovery::{Discovery, DiscoveryReport, Manifest};
use crate::error::{Error, ErrorReporter};
use crate::health;
use crate::middleware::auth::Authenticator;
use crate::openapi::{self, ApiInfo};
use crate::registry::Registry;
use crate::router::Router;
use crate::token::TokenService;

/// A fully built application, ready to serve.
pub struct App {
    pub router: Router,
    pub registry: Arc<Registry>,
    pub controllers: Vec<ControllerType>,
    pub report: DiscoveryReport,
    /// Routes declared by controllers; excludes the health check.
    pub route_count: usize,
    api_prefix: String,
}

impl App {
    /// OpenAPI document for every mounted controller.
    pub fn openapi(&self, info: &ApiInfo) -> Value {
        openapi::document(&self.registry, &self.controllers, &self.api_prefix, info)
    }
}

/// Builds the authenticator described by `config`.
pub fn authenticator(config: &AppConfig) -> Authenticator {
    let tokens = TokenService::new(config.jwt_secret.as_bytes(), config.jwt_lifetime);
    Authenticator::new(Arc::new(tokens)).with_cookie_name(config.auth_cookie.clone())
}

/// Discovers and mounts the controllers in `manifest`.
///
/// Loaders can read the [`Authenticator`] from their module context.
pub fn bootstrap(config: &AppConfig, manifest: &Manifest) -> Result<App, Error> {
    bootstrap_with(config, manifest, Extensions::new())
}

/// Like [`bootstrap`], with extra values for the module context.
pub fn bootstrap_with(config: &AppConfig, manifest: &Manifest, mut context: Extensions) -> Result<App, Error> {
    let started = Instant::now();
    if context.get::<Authenticator>().is_none() {
        context.insert(authenticator(config));
    }

    let discovery = Discovery::new(&config.controllers_root).with_patterns(config.controller_patterns.clone());
    let mut registry = Registry::new();
    let report = discovery.run(manifest, &mut registry, &context)?;
    if !report.failures.is_empty() {
        warn!(failed = report.failures.len(), "some controller modules failed to load");
    }
    let registry = registry.freeze();

    let reporter = ErrorReporter::new(config.environment.exposes_error_detail());
    let mut router = Router::new().with_reporter(reporter);
    let route_count = RouterBuilder::new(&registry, &mut router)
        .prefix(&config.api_prefix)
        .mount_all(&report.controllers)?;
    health::register(&mut router, config.app_version.clone())?;

    info!(
        controllers = report.controllers.len(),
        routes = route_count,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "bootstrap complete"
    );

    Ok(App {
        router,
        registry,
        controllers: report.controllers.clone(),
        report,
        route_count,
        api_prefix: config.api_prefix.clone(),
    })
}
