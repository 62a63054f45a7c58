//! Liveness endpoint.
//!
//! `GET /health` answers `{"status": "ok", "version": "<app version>"}`. It
//! sits outside the API prefix and runs no middleware, so probes never need
//! a credential.

use serde::Serialize;

use crate::error::ConfigError;
use crate::handler::handler_fn;
use crate::method::Method;
use crate::response::Json;
use crate::router::Router;

pub const HEALTH_PATH: &str = "/health";

#[derive(Debug, Serialize)]
pub struct Health {
    pub status: &'static str,
    pub version: String,
}

/// Registers the liveness handler on `router`.
pub fn register(router: &mut Router, version: impl Into<String>) -> Result<(), ConfigError> {
    let version = version.into();
    router.on(
        Method::Get,
        HEALTH_PATH,
        handler_fn(move |_req| {
            let body = Health { status: "ok", version: version.clone() };
            async move { Json(body) }
        }),
    )?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::StatusCode;

    #[tokio::test]
    async fn reports_status_and_version() {
        let mut router = Router::new();
        register(&mut router, "9.9.9").unwrap();

        let req = http::Request::get("/health").body(Bytes::new()).unwrap().into();
        let resp = router.handle(req).await;
        assert_eq!(resp.status_code(), StatusCode::OK);

        let body: serde_json::Value = serde_json::from_slice(resp.body()).unwrap();
        assert_eq!(body, serde_json::json!({ "status": "ok", "version": "9.9.9" }));
    }
}
