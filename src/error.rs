//! Error types.
//!
//! Three families, matching when they can happen:
//!
//! - [`ConfigError`]: a route table that cannot be built. Raised while
//!   declaring routes or mounting controllers; fatal at bootstrap.
//! - [`LoadError`]: one controller module failed to load. Logged and
//!   skipped; sibling modules still register.
//! - [`HttpError`]: a per-request failure (401, 403, 404, 500). Rendered
//!   into a JSON response by the [`ErrorReporter`] and confined to that
//!   request.
//!
//! [`Error`] wraps the infrastructure failures `bootstrap` and `serve` can
//! return.

use std::error::Error as StdError;
use std::path::PathBuf;

use http::StatusCode;
use serde_json::json;
use tracing::{debug, error};

use crate::response::Response;

/// The error type returned by pathwise's fallible bootstrap and serve
/// operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
}

/// A routing table that cannot be built correctly.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unsupported HTTP verb `{0}` (expected GET, POST, PUT, PATCH or DELETE)")]
    InvalidVerb(String),

    #[error("controller `{controller}` has no handler named `{handler}`")]
    UnknownHandler {
        controller: &'static str,
        handler: String,
    },

    #[error("controller `{0}` was never declared")]
    UndeclaredController(&'static str),

    #[error("invalid route `{path}`: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("invalid glob pattern `{pattern}`: {reason}")]
    InvalidPattern { pattern: String, reason: String },
}

/// A controller module that could not be loaded during discovery.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("failed to load {}: {source}", path.display())]
    Failed {
        path: PathBuf,
        #[source]
        source: Box<dyn StdError + Send + Sync>,
    },

    #[error("loader for {} panicked: {message}", path.display())]
    Panicked { path: PathBuf, message: String },
}

impl LoadError {
    pub fn path(&self) -> &PathBuf {
        match self {
            Self::Failed { path, .. } | Self::Panicked { path, .. } => path,
        }
    }
}

// ── Per-request failures ──────────────────────────────────────────────────────

/// A failure confined to one request.
///
/// Middleware and handlers return it; the router hands it to the
/// [`ErrorReporter`], which owns the wire format.
#[derive(Debug, thiserror::Error)]
pub enum HttpError {
    /// Missing, malformed, invalid or expired credential.
    #[error("{0}")]
    Unauthorized(String),

    /// Authenticated, but the identity lacks a required role.
    #[error("{0}")]
    Forbidden(String),

    #[error("{0}")]
    NotFound(String),

    /// Anything a handler raised that is not an HTTP-level decision.
    #[error("{message}")]
    Internal {
        message: String,
        detail: Option<String>,
    },
}

impl HttpError {
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized(message.into())
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::Forbidden(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    /// Wraps an arbitrary error, keeping its source chain as detail.
    pub fn internal(err: impl StdError) -> Self {
        Self::Internal {
            message: err.to_string(),
            detail: Some(error_chain(&err)),
        }
    }

    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::Unauthorized(_)  => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_)     => StatusCode::FORBIDDEN,
            Self::NotFound(_)      => StatusCode::NOT_FOUND,
            Self::Internal { .. }  => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Value of the `error` field in the response body.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Unauthorized(_)  => "Unauthorized",
            Self::Forbidden(_)     => "Forbidden",
            Self::NotFound(_)      => "Not Found",
            Self::Internal { .. }  => "Internal Server Error",
        }
    }
}

impl From<std::io::Error> for HttpError {
    fn from(err: std::io::Error) -> Self {
        Self::internal(err)
    }
}

impl From<serde_json::Error> for HttpError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(err)
    }
}

fn error_chain(err: &dyn StdError) -> String {
    let mut out = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        out.push_str("\n  caused by: ");
        out.push_str(&cause.to_string());
        source = cause.source();
    }
    out
}

// ── Centralised reporting ─────────────────────────────────────────────────────

const GENERIC_MESSAGE: &str = "An unexpected error occurred";

/// Turns every [`HttpError`] into a `{error, message}` JSON response.
///
/// In development mode internal failures keep their message and carry a
/// `stack` field; otherwise they collapse to a generic message.
#[derive(Clone, Copy, Debug, Default)]
pub struct ErrorReporter {
    expose_detail: bool,
}

impl ErrorReporter {
    pub fn new(expose_detail: bool) -> Self {
        Self { expose_detail }
    }

    pub fn development() -> Self {
        Self::new(true)
    }

    pub fn production() -> Self {
        Self::new(false)
    }

    pub fn exposes_detail(&self) -> bool {
        self.expose_detail
    }

    pub fn report(&self, method: &str, path: &str, err: HttpError) -> Response {
        let status = err.status_code();
        let body = match &err {
            HttpError::Internal { message, detail } => {
                error!(%method, %path, error = %message, "handler failed");
                if self.expose_detail {
                    json!({
                        "error": err.name(),
                        "message": message,
                        "stack": detail.as_deref().unwrap_or(message),
                    })
                } else {
                    json!({ "error": err.name(), "message": GENERIC_MESSAGE })
                }
            }
            other => {
                debug!(%method, %path, status = status.as_u16(), reason = %other, "request rejected");
                json!({ "error": other.name(), "message": other.to_string() })
            }
        };

        Response::builder().status(status).json(&body)
    }
}
