//! Incoming HTTP request type.

use std::collections::HashMap;

use bytes::Bytes;
use http::{Extensions, HeaderMap};

use crate::token::AuthenticatedPrincipal;

/// An incoming HTTP request with its body fully buffered.
///
/// Middleware may attach per-request values through
/// [`extensions_mut`](Request::extensions_mut); they live exactly as long as
/// the request.
#[derive(Debug)]
pub struct Request {
    pub(crate) method: http::Method,
    pub(crate) path: String,
    pub(crate) query: Option<String>,
    pub(crate) headers: HeaderMap,
    pub(crate) body: Bytes,
    pub(crate) params: HashMap<String, String>,
    pub(crate) extensions: Extensions,
}

impl Request {
    pub(crate) fn from_parts(parts: http::request::Parts, body: Bytes) -> Self {
        Self {
            path: parts.uri.path().to_owned(),
            query: parts.uri.query().map(str::to_owned),
            method: parts.method,
            headers: parts.headers,
            body,
            params: HashMap::new(),
            extensions: parts.extensions,
        }
    }

    pub fn method(&self) -> &http::Method { &self.method }
    pub fn path(&self) -> &str { &self.path }
    pub fn query(&self) -> Option<&str> { self.query.as_deref() }
    pub fn headers(&self) -> &HeaderMap { &self.headers }
    pub fn body(&self) -> &[u8] { &self.body }

    /// Path and query as the client sent them.
    pub fn original_url(&self) -> String {
        match &self.query {
            Some(q) => format!("{}?{q}", self.path),
            None => self.path.clone(),
        }
    }

    /// Case-insensitive header lookup. Values that are not visible ASCII
    /// are treated as absent.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Returns a named path parameter.
    ///
    /// For a route `/users/{id}`, `req.param("id")` on `/users/42` returns `Some("42")`.
    pub fn param(&self, key: &str) -> Option<&str> {
        self.params.get(key).map(String::as_str)
    }

    /// Returns the value of the named cookie, searching every `Cookie`
    /// header in order. Empty values count as absent.
    pub fn cookie(&self, name: &str) -> Option<&str> {
        self.headers
            .get_all(http::header::COOKIE)
            .iter()
            .filter_map(|v| v.to_str().ok())
            .flat_map(|line| line.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(k, _)| k.trim() == name)
            .map(|(_, v)| v.trim().trim_matches('"'))
            .filter(|v| !v.is_empty())
    }

    pub fn extensions(&self) -> &Extensions { &self.extensions }
    pub fn extensions_mut(&mut self) -> &mut Extensions { &mut self.extensions }

    /// Identity attached by the authentication middleware, if any.
    pub fn principal(&self) -> Option<&AuthenticatedPrincipal> {
        self.extensions.get::<AuthenticatedPrincipal>()
    }

    pub(crate) fn set_params(&mut self, params: HashMap<String, String>) {
        self.params = params;
    }
}

impl From<http::Request<Bytes>> for Request {
    fn from(req: http::Request<Bytes>) -> Self {
        let (parts, body) = req.into_parts();
        Self::from_parts(parts, body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(builder: http::request::Builder) -> Request {
        builder.body(Bytes::new()).unwrap().into()
    }

    #[test]
    fn finds_cookie_among_several() {
        let req = request(
            http::Request::get("/")
                .header("cookie", "theme=dark; auth_token=abc.def.ghi")
                .header("cookie", "other=1"),
        );
        assert_eq!(req.cookie("auth_token"), Some("abc.def.ghi"));
        assert_eq!(req.cookie("other"), Some("1"));
        assert_eq!(req.cookie("missing"), None);
    }

    #[test]
    fn empty_cookie_is_absent() {
        let req = request(http::Request::get("/").header("cookie", "auth_token="));
        assert_eq!(req.cookie("auth_token"), None);
    }

    #[test]
    fn keeps_query_in_original_url() {
        let req = request(http::Request::get("/api/x?page=2"));
        assert_eq!(req.path(), "/api/x");
        assert_eq!(req.original_url(), "/api/x?page=2");
    }
}
