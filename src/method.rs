//! HTTP method as a typed enum.
//!
//! Controllers may only declare the five verbs a JSON API needs. Anything
//! else is rejected when the route is declared, long before a request
//! arrives.

use std::fmt;
use std::str::FromStr;

use crate::error::ConfigError;

/// A verb a route may be declared with.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Ord, PartialOrd)]
pub enum Method {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl Method {
    /// Returns the uppercase wire representation (e.g. `"GET"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Get    => "GET",
            Self::Post   => "POST",
            Self::Put    => "PUT",
            Self::Patch  => "PATCH",
            Self::Delete => "DELETE",
        }
    }

    /// Lowercase form used as the operation key in OpenAPI documents.
    pub fn as_lower(self) -> &'static str {
        match self {
            Self::Get    => "get",
            Self::Post   => "post",
            Self::Put    => "put",
            Self::Patch  => "patch",
            Self::Delete => "delete",
        }
    }

    /// Maps a request method onto a declarable verb. `HEAD`, `OPTIONS` and
    /// extension methods have no counterpart and return `None`.
    pub fn from_http(method: &http::Method) -> Option<Self> {
        match *method {
            http::Method::GET    => Some(Self::Get),
            http::Method::POST   => Some(Self::Post),
            http::Method::PUT    => Some(Self::Put),
            http::Method::PATCH  => Some(Self::Patch),
            http::Method::DELETE => Some(Self::Delete),
            _                    => None,
        }
    }
}

/// Parses a verb case-insensitively (`"get"`, `"GET"` and `"Get"` are equal).
impl FromStr for Method {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "GET"    => Ok(Self::Get),
            "POST"   => Ok(Self::Post),
            "PUT"    => Ok(Self::Put),
            "PATCH"  => Ok(Self::Patch),
            "DELETE" => Ok(Self::Delete),
            _        => Err(ConfigError::InvalidVerb(s.to_owned())),
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
