#![allow(dead_code)]

use std::collections::HashMap;

use anyhow::{Context, Result};
use bytes::Bytes;
use pathwise::{App, AppConfig, Request, Response, Router, Server};
use tokio::net::TcpListener;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

pub const SECRET: &str = "integration-secret";

/// Test configuration; never reads the process environment.
pub fn config(extra: &[(&str, &str)]) -> AppConfig {
    let mut vars: HashMap<String, String> = HashMap::from([
        ("APP_ENV".to_owned(), "test".to_owned()),
        ("JWT_SECRET".to_owned(), SECRET.to_owned()),
        ("APP_VERSION".to_owned(), "0.0.0-test".to_owned()),
    ]);
    for (k, v) in extra {
        vars.insert((*k).to_owned(), (*v).to_owned());
    }
    AppConfig::from_lookup(|key| vars.get(key).cloned())
}

/// The demo application.
pub fn app() -> Result<App> {
    let config = config(&[]);
    Ok(pathwise::bootstrap(&config, &pathwise::modules::manifest())?)
}

pub fn token(config: &AppConfig, sub: &str, role: &str) -> Result<String> {
    let auth = pathwise::app::authenticator(config);
    Ok(auth.tokens().issue(sub, &format!("{sub}@example.com"), role)?)
}

pub fn request(method: &str, uri: &str, headers: &[(&str, &str)]) -> Request {
    let mut builder = http::Request::builder().method(method).uri(uri);
    for (k, v) in headers {
        builder = builder.header(*k, *v);
    }
    builder.body(Bytes::new()).expect("valid test request").into()
}

pub async fn send(router: &Router, method: &str, uri: &str, headers: &[(&str, &str)]) -> Response {
    router.handle(request(method, uri, headers)).await
}

pub fn json(resp: &Response) -> serde_json::Value {
    serde_json::from_slice(resp.body()).expect("JSON response body")
}

/// A server on an ephemeral port that stops when dropped.
pub struct TestServer {
    pub base_url: String,
    shutdown: Option<oneshot::Sender<()>>,
    handle: Option<JoinHandle<Result<(), pathwise::Error>>>,
}

impl TestServer {
    pub async fn start(router: Router) -> Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await.context("bind ephemeral port")?;
        let base_url = format!("http://{}", listener.local_addr()?);
        let (tx, rx) = oneshot::channel::<()>();
        let handle = tokio::spawn(Server::serve_with_shutdown(listener, router, async {
            let _ = rx.await;
        }));
        Ok(Self { base_url, shutdown: Some(tx), handle: Some(handle) })
    }

    pub async fn stop(mut self) -> Result<()> {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.await??;
        }
        Ok(())
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
    }
}
