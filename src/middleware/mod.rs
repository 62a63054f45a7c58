//! Middleware layer.
//!
//! A middleware is a pre-dispatch step: it may inspect or modify the
//! request, short-circuit it with an [`HttpError`], or let it continue.
//! Each route owns a [`Chain`]: its declared middleware in order, then the
//! bound handler. A step must finish before the next one starts.
//!
//! Built-in middleware:
//! - [`auth::RequireAuth`]: 401 unless a valid credential is present
//! - [`auth::OptionalAuth`]: attaches an identity when it can, never blocks
//! - [`auth::RequireRole`]: 403 unless the identity's role is allowed

use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use async_trait::async_trait;
use futures::FutureExt;

use crate::error::HttpError;
use crate::handler::{panic_message, BoxedHandler, HandlerResult};
use crate::request::Request;

pub mod auth;

/// A composable pre-dispatch step.
#[async_trait]
pub trait Middleware: Send + Sync + 'static {
    /// `Ok(())` passes control onward; `Err` ends the request.
    async fn handle(&self, req: &mut Request) -> Result<(), HttpError>;
}

/// Shared middleware, cloned into every route that declares it.
pub type BoxedMiddleware = Arc<dyn Middleware>;

/// Wraps a synchronous closure as middleware.
///
/// ```rust
/// use pathwise::middleware::from_fn;
///
/// let tag = from_fn(|req| {
///     req.extensions_mut().insert("tagged");
///     Ok(())
/// });
/// ```
pub fn from_fn<F>(f: F) -> BoxedMiddleware
where
    F: Fn(&mut Request) -> Result<(), HttpError> + Send + Sync + 'static,
{
    Arc::new(FnMiddleware(f))
}

struct FnMiddleware<F>(F);

#[async_trait]
impl<F> Middleware for FnMiddleware<F>
where
    F: Fn(&mut Request) -> Result<(), HttpError> + Send + Sync + 'static,
{
    async fn handle(&self, req: &mut Request) -> Result<(), HttpError> {
        (self.0)(req)
    }
}

// ── Chain ─────────────────────────────────────────────────────────────────────

/// Declared middleware followed by the bound handler.
#[derive(Clone)]
pub struct Chain {
    middlewares: Vec<BoxedMiddleware>,
    handler: BoxedHandler,
}

impl Chain {
    pub fn new(middlewares: Vec<BoxedMiddleware>, handler: BoxedHandler) -> Self {
        Self { middlewares, handler }
    }

    /// Number of middleware steps before the handler.
    pub fn middleware_count(&self) -> usize {
        self.middlewares.len()
    }

    /// Runs the chain in order. Failures and panics from any step come back
    /// as `Err`.
    pub async fn run(&self, req: Request) -> HandlerResult {
        let run = async move {
            let mut req = req;
            for middleware in &self.middlewares {
                middleware.handle(&mut req).await?;
            }
            self.handler.call(req).await
        };

        match AssertUnwindSafe(run).catch_unwind().await {
            Ok(result) => result,
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                Err(HttpError::Internal {
                    message: format!("middleware panicked: {message}"),
                    detail: Some(message),
                })
            }
        }
    }
}
