mod common;

use std::sync::Arc;

use anyhow::Result;
use http::StatusCode;
use pathwise::discovery::{LoadResult, Manifest, ModuleScope};
use pathwise::middleware::auth::{Authenticator, RequireRole};
use pathwise::{ConfigError, Controller, Error, HttpError, LoadError, Method, Methods, Request};

struct Reports;

impl Reports {
    async fn list(self: Arc<Self>, _req: Request) -> Result<&'static str, HttpError> {
        Ok("reports")
    }

    async fn purge(self: Arc<Self>, _req: Request) -> Result<&'static str, HttpError> {
        Ok("purged")
    }
}

impl Controller for Reports {
    fn create() -> Self { Reports }
    fn methods() -> Methods<Self> {
        Methods::new().method("list", Self::list).method("purge", Self::purge)
    }
}

fn load_reports(scope: &mut ModuleScope<'_>) -> LoadResult {
    let auth = scope.require::<Authenticator>()?.clone();
    let registry = scope.registry();
    registry.declare_controller::<Reports>("reports/");
    registry.declare_route::<Reports>("list", "GET", "/", vec![])?;
    registry.declare_route::<Reports>(
        "purge",
        "DELETE",
        "/",
        vec![auth.required(), RequireRole::new(["admin"]).boxed()],
    )?;
    scope.export::<Reports>();
    Ok(())
}

fn load_broken(scope: &mut ModuleScope<'_>) -> LoadResult {
    scope.registry().declare_controller::<Reports>("/hijacked");
    Err("database driver missing".into())
}

fn load_panicking(_scope: &mut ModuleScope<'_>) -> LoadResult {
    panic!("module initialisation failed")
}

fn manifest() -> Manifest {
    pathwise::modules::manifest()
        .module("modules/reports/controllers/reports_controller.rs", load_reports)
        .module("modules/billing/controllers/billing_controller.rs", load_broken)
        .module("shared/metrics/controllers/metrics.controller.rs", load_panicking)
        .module("modules/reports/services/report_service.rs", load_panicking)
}

#[tokio::test]
async fn broken_modules_do_not_take_down_siblings() -> Result<()> {
    let config = common::config(&[]);
    let app = pathwise::bootstrap(&config, &manifest())?;

    assert_eq!(app.report.files.len(), 4);
    assert_eq!(app.report.failures.len(), 2);
    assert!(app.report.failures.iter().any(|f| matches!(f, LoadError::Failed { .. })));
    assert!(app.report.failures.iter().any(|f| matches!(f, LoadError::Panicked { .. })));

    let names: Vec<_> = app.controllers.iter().map(|c| c.name()).collect();
    assert_eq!(names, ["AuthController", "Reports"]);

    // the failed module's redeclaration was discarded
    let resp = common::send(&app.router, "GET", "/api/reports", &[]).await;
    assert_eq!(resp.status_code(), StatusCode::OK);
    assert_eq!(resp.body(), b"reports");
    let hijacked = common::send(&app.router, "GET", "/api/hijacked", &[]).await;
    assert_eq!(hijacked.status_code(), StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn every_route_has_exactly_one_entry() -> Result<()> {
    let app = pathwise::bootstrap(&common::config(&[]), &manifest())?;

    assert_eq!(app.route_count, 6);
    // plus the health check
    assert_eq!(app.router.route_count(), 7);

    let mut seen = std::collections::HashSet::new();
    for route in app.router.routes() {
        assert!(seen.insert((route.method, route.path.clone())), "duplicate {route:?}");
    }
    assert!(seen.contains(&(Method::Get, "/api/auth/me".to_owned())));
    assert!(seen.contains(&(Method::Delete, "/api/reports".to_owned())));
    Ok(())
}

#[tokio::test]
async fn role_gate_runs_after_authentication() -> Result<()> {
    let config = common::config(&[]);
    let app = pathwise::bootstrap(&config, &manifest())?;

    let anonymous = common::send(&app.router, "DELETE", "/api/reports", &[]).await;
    assert_eq!(anonymous.status_code(), StatusCode::UNAUTHORIZED);

    let user = format!("Bearer {}", common::token(&config, "u1", "user")?);
    let forbidden = common::send(&app.router, "DELETE", "/api/reports", &[("authorization", &user)]).await;
    assert_eq!(forbidden.status_code(), StatusCode::FORBIDDEN);
    assert_eq!(common::json(&forbidden)["message"], "Insufficient permissions");

    let admin = format!("Bearer {}", common::token(&config, "a1", "admin")?);
    let allowed = common::send(&app.router, "DELETE", "/api/reports", &[("authorization", &admin)]).await;
    assert_eq!(allowed.status_code(), StatusCode::OK);
    assert_eq!(allowed.body(), b"purged");
    Ok(())
}

#[test]
fn unknown_handler_aborts_bootstrap() {
    fn load_typo(scope: &mut ModuleScope<'_>) -> LoadResult {
        scope.registry().declare_controller::<Reports>("/reports");
        scope.registry().declare_route::<Reports>("lsit", "GET", "/", vec![])?;
        scope.export::<Reports>();
        Ok(())
    }

    let manifest = Manifest::new().module("modules/reports/controllers/reports_controller.rs", load_typo);
    match pathwise::bootstrap(&common::config(&[]), &manifest) {
        Err(Error::Config(ConfigError::UnknownHandler { handler, .. })) => assert_eq!(handler, "lsit"),
        Err(other) => panic!("unexpected error: {other}"),
        Ok(_) => panic!("bootstrap accepted an unknown handler"),
    }
}

#[test]
fn custom_patterns_narrow_discovery() -> Result<()> {
    let config = common::config(&[("CONTROLLERS_GLOB", "modules/auth/**/*_controller.rs")]);
    let app = pathwise::bootstrap(&config, &manifest())?;
    assert_eq!(app.report.files.len(), 1);
    assert_eq!(app.route_count, 4);
    Ok(())
}
