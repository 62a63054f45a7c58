//! Handler trait and type erasure.
//!
//! # How controller methods are stored
//!
//! The dispatch table holds handlers of *different* controller types in a
//! single tree, so each method is bound to its controller instance and
//! erased behind `dyn ErasedHandler`.
//!
//! The chain from user code to vtable call is:
//!
//! ```text
//! async fn me(self: Arc<Self>, req: Request) -> Result<…> { … }  ← user writes this
//!        ↓ Methods::new().method("me", Self::me)
//! Self::me.bind(Arc<Self>)                                       ← Handler blanket impl
//!        ↓
//! Arc::new(BoundMethod { instance, method })                     ← handler record
//!        ↓  stored as BoxedHandler = Arc<dyn ErasedHandler>
//! handler.call(req)  at request time                             ← one vtable dispatch
//! ```
//!
//! A bound method never lets a failure escape as a panic: an `Err` is
//! converted into [`HttpError`] and a panic inside the future is caught
//! and reported as an internal error.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::pin::Pin;
use std::sync::Arc;

use futures::FutureExt;

use crate::error::HttpError;
use crate::request::Request;
use crate::response::{IntoResponse, Response};

// ── Internal types ────────────────────────────────────────────────────────────

/// The outcome of the terminal step of a chain.
pub type HandlerResult = Result<Response, HttpError>;

/// A heap-allocated, type-erased future that resolves to a [`HandlerResult`].
pub type BoxFuture = Pin<Box<dyn Future<Output = HandlerResult> + Send + 'static>>;

/// Internal dispatch interface.
#[doc(hidden)]
pub trait ErasedHandler {
    fn call(&self, req: Request) -> BoxFuture;
}

/// A bound, type-erased handler shared across concurrent requests.
#[doc(hidden)]
pub type BoxedHandler = Arc<dyn ErasedHandler + Send + Sync + 'static>;

// ── Public Handler trait ──────────────────────────────────────────────────────

/// Implemented for every valid controller method.
///
/// You never implement this yourself. It is satisfied by any method of the
/// form:
///
/// ```text
/// async fn name(self: Arc<Self>, req: Request) -> Result<impl IntoResponse, impl Into<HttpError>>
/// ```
pub trait Handler<C>: private::Sealed<C> + Send + Sync + 'static {
    #[doc(hidden)]
    fn bind(self, instance: Arc<C>) -> BoxedHandler;
}

mod private {
    pub trait Sealed<C> {}
}

impl<C, F, Fut, R, E> private::Sealed<C> for F
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: IntoResponse + Send + 'static,
    E: Into<HttpError> + Send + 'static,
{
}

impl<C, F, Fut, R, E> Handler<C> for F
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: IntoResponse + Send + 'static,
    E: Into<HttpError> + Send + 'static,
{
    fn bind(self, instance: Arc<C>) -> BoxedHandler {
        Arc::new(BoundMethod { instance, method: self })
    }
}

// ── Concrete wrapper ──────────────────────────────────────────────────────────

/// `{instance, method}` pair: the method is always invoked on the one
/// instance it was bound to.
struct BoundMethod<C, F> {
    instance: Arc<C>,
    method: F,
}

impl<C, F, Fut, R, E> ErasedHandler for BoundMethod<C, F>
where
    C: Send + Sync + 'static,
    F: Fn(Arc<C>, Request) -> Fut + Send + Sync,
    Fut: Future<Output = Result<R, E>> + Send + 'static,
    R: IntoResponse + Send + 'static,
    E: Into<HttpError> + Send + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let instance = Arc::clone(&self.instance);
        let fut = match std::panic::catch_unwind(AssertUnwindSafe(|| (self.method)(instance, req))) {
            Ok(fut) => fut,
            Err(payload) => {
                let err = panicked(payload);
                return Box::pin(async move { Err(err) });
            }
        };

        Box::pin(async move {
            match AssertUnwindSafe(fut).catch_unwind().await {
                Ok(Ok(value)) => Ok(value.into_response()),
                Ok(Err(e)) => Err(e.into()),
                Err(payload) => Err(panicked(payload)),
            }
        })
    }
}

// ── Free functions ────────────────────────────────────────────────────────────

/// Wraps a plain `async fn(Request) -> impl IntoResponse` that belongs to no
/// controller, such as the health check.
pub fn handler_fn<F, Fut, R>(f: F) -> BoxedHandler
where
    F: Fn(Request) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    Arc::new(FnHandler(f))
}

struct FnHandler<F>(F);

impl<F, Fut, R> ErasedHandler for FnHandler<F>
where
    F: Fn(Request) -> Fut + Send + Sync,
    Fut: Future<Output = R> + Send + 'static,
    R: IntoResponse + 'static,
{
    fn call(&self, req: Request) -> BoxFuture {
        let fut = (self.0)(req);
        Box::pin(async move { Ok(fut.await.into_response()) })
    }
}

fn panicked(payload: Box<dyn Any + Send>) -> HttpError {
    let message = panic_message(payload.as_ref());
    HttpError::Internal {
        message: format!("handler panicked: {message}"),
        detail: Some(message),
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&'static str>() {
        (*s).to_owned()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_owned()
    }
}
