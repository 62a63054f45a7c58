//! Token authentication middleware.
//!
//! Every request moves through the same states:
//!
//! ```text
//! NoCredential ──► CredentialPresent ──► Valid   (identity attached)
//!                                   └──► Invalid (bad signature, expired, garbage)
//! ```
//!
//! | Middleware | NoCredential | Invalid | Valid |
//! |---|---|---|---|
//! | [`RequireAuth`] | 401 | 401 | attach, continue |
//! | [`OptionalAuth`] | continue | continue | attach, continue |
//!
//! [`RequireRole`] runs after `RequireAuth` and checks the attached
//! identity's role against an allow-list: no identity is 401, a role outside
//! the list is 403.

use std::sync::Arc;

use async_trait::async_trait;
use tracing::debug;

use super::{BoxedMiddleware, Middleware};
use crate::error::HttpError;
use crate::request::Request;
use crate::token::{AuthenticatedPrincipal, TokenError, TokenService};

/// Cookie checked before the `Authorization` header.
pub const AUTH_COOKIE_NAME: &str = "auth_token";

/// Result of inspecting a request for a credential.
#[derive(Debug)]
pub enum AuthOutcome {
    NoCredential,
    Valid(AuthenticatedPrincipal),
    Invalid(TokenError),
}

/// Returns the raw credential: the auth cookie if set, otherwise the token
/// of an `Authorization: Bearer <token>` header (scheme matched
/// case-insensitively, separated by exactly one space). Any other header
/// shape yields `None`.
pub fn extract_credential<'a>(req: &'a Request, cookie_name: &str) -> Option<&'a str> {
    if let Some(token) = req.cookie(cookie_name) {
        return Some(token);
    }

    let header = req.header("authorization")?;
    let mut parts = header.split(' ');
    match (parts.next(), parts.next(), parts.next()) {
        (Some(scheme), Some(token), None) if scheme.eq_ignore_ascii_case("bearer") && !token.is_empty() => {
            Some(token)
        }
        _ => None,
    }
}

/// Shared verification logic behind both authentication middlewares.
#[derive(Clone)]
pub struct Authenticator {
    tokens: Arc<TokenService>,
    cookie_name: String,
}

impl Authenticator {
    pub fn new(tokens: Arc<TokenService>) -> Self {
        Self { tokens, cookie_name: AUTH_COOKIE_NAME.to_owned() }
    }

    pub fn with_cookie_name(mut self, name: impl Into<String>) -> Self {
        self.cookie_name = name.into();
        self
    }

    pub fn tokens(&self) -> &Arc<TokenService> {
        &self.tokens
    }

    pub fn authenticate(&self, req: &Request) -> AuthOutcome {
        let Some(token) = extract_credential(req, &self.cookie_name) else {
            return AuthOutcome::NoCredential;
        };
        match self.tokens.verify(token) {
            Ok(claims) => AuthOutcome::Valid(claims.into()),
            Err(e) => AuthOutcome::Invalid(e),
        }
    }

    /// Middleware that rejects requests without a valid credential.
    pub fn required(&self) -> BoxedMiddleware {
        Arc::new(RequireAuth { auth: self.clone() })
    }

    /// Middleware that attaches an identity when possible and never rejects.
    pub fn optional(&self) -> BoxedMiddleware {
        Arc::new(OptionalAuth { auth: self.clone() })
    }
}

// ── Required ──────────────────────────────────────────────────────────────────

pub struct RequireAuth {
    auth: Authenticator,
}

#[async_trait]
impl Middleware for RequireAuth {
    async fn handle(&self, req: &mut Request) -> Result<(), HttpError> {
        match self.auth.authenticate(req) {
            AuthOutcome::Valid(principal) => {
                req.extensions_mut().insert(principal);
                Ok(())
            }
            AuthOutcome::NoCredential => Err(HttpError::unauthorized("Authentication token missing")),
            AuthOutcome::Invalid(e) => {
                debug!(path = %req.path(), error = %e, "rejecting request with invalid credential");
                Err(HttpError::unauthorized("Authentication failed"))
            }
        }
    }
}

// ── Optional ──────────────────────────────────────────────────────────────────

pub struct OptionalAuth {
    auth: Authenticator,
}

#[async_trait]
impl Middleware for OptionalAuth {
    async fn handle(&self, req: &mut Request) -> Result<(), HttpError> {
        if let AuthOutcome::Valid(principal) = self.auth.authenticate(req) {
            req.extensions_mut().insert(principal);
        }
        Ok(())
    }
}

// ── Role gate ─────────────────────────────────────────────────────────────────

/// Allows the request through only if the attached identity's role is in
/// the allow-list. Compose it after [`RequireAuth`].
pub struct RequireRole {
    allowed: Vec<String>,
}

impl RequireRole {
    pub fn new<I, S>(roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self { allowed: roles.into_iter().map(Into::into).collect() }
    }

    pub fn boxed(self) -> BoxedMiddleware {
        Arc::new(self)
    }
}

#[async_trait]
impl Middleware for RequireRole {
    async fn handle(&self, req: &mut Request) -> Result<(), HttpError> {
        let principal = req.principal().ok_or_else(|| HttpError::unauthorized("Unauthorized"))?;
        if self.allowed.iter().any(|role| *role == principal.role) {
            Ok(())
        } else {
            debug!(role = %principal.role, allowed = ?self.allowed, "role not permitted");
            Err(HttpError::forbidden("Insufficient permissions"))
        }
    }
}
