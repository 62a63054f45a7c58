//! Application configuration.
//!
//! Everything comes from environment variables (a `.env` file is loaded
//! first when present). Unparsable values fall back to their default with a
//! warning.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::builder::DEFAULT_PREFIX;
use crate::discovery::DEFAULT_PATTERNS;
use crate::middleware::auth::AUTH_COOKIE_NAME;

pub const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Production,
    Test,
}

impl Environment {
    fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "production" | "prod" => Self::Production,
            "test" => Self::Test,
            _ => Self::Development,
        }
    }

    /// Internal error details are returned to clients only in development.
    pub fn exposes_error_detail(self) -> bool {
        self == Self::Development
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub host: String,
    pub port: u16,
    pub jwt_secret: String,
    pub jwt_lifetime: Duration,
    pub auth_cookie: String,
    pub api_prefix: String,
    pub controllers_root: PathBuf,
    pub controller_patterns: Vec<String>,
    pub app_version: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: Environment::Development,
            host: "0.0.0.0".to_owned(),
            port: 3000,
            jwt_secret: DEFAULT_JWT_SECRET.to_owned(),
            jwt_lifetime: Duration::from_secs(24 * 60 * 60),
            auth_cookie: AUTH_COOKIE_NAME.to_owned(),
            api_prefix: DEFAULT_PREFIX.to_owned(),
            controllers_root: PathBuf::from("src"),
            controller_patterns: DEFAULT_PATTERNS.iter().map(|p| (*p).to_owned()).collect(),
            app_version: env!("CARGO_PKG_VERSION").to_owned(),
        }
    }
}

impl AppConfig {
    /// Reads `.env` if present, then the process environment.
    pub fn from_env() -> Self {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(v) = lookup("APP_ENV").or_else(|| lookup("NODE_ENV")) {
            config.environment = Environment::parse(&v);
        }
        if let Some(v) = lookup("HOST") {
            config.host = v;
        }
        if let Some(v) = lookup("PORT") {
            match v.trim().parse() {
                Ok(port) => config.port = port,
                Err(_) => warn!(value = %v, "ignoring invalid PORT"),
            }
        }
        if let Some(v) = lookup("JWT_SECRET") {
            config.jwt_secret = v;
        }
        if let Some(v) = lookup("JWT_EXPIRES_IN") {
            match parse_lifetime(&v) {
                Some(lifetime) => config.jwt_lifetime = lifetime,
                None => warn!(value = %v, "ignoring invalid JWT_EXPIRES_IN"),
            }
        }
        if let Some(v) = lookup("AUTH_COOKIE_NAME") {
            config.auth_cookie = v;
        }
        if let Some(v) = lookup("API_PREFIX") {
            config.api_prefix = v;
        }
        if let Some(v) = lookup("CONTROLLERS_ROOT") {
            config.controllers_root = PathBuf::from(v);
        }
        if let Some(v) = lookup("CONTROLLERS_GLOB") {
            let patterns: Vec<String> = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_owned)
                .collect();
            if !patterns.is_empty() {
                config.controller_patterns = patterns;
            }
        }
        if let Some(v) = lookup("APP_VERSION") {
            config.app_version = v;
        }

        if config.environment == Environment::Production && config.jwt_secret == DEFAULT_JWT_SECRET {
            warn!("JWT_SECRET is unset in production; tokens are signed with the default secret");
        }

        config
    }

    /// `host:port`, as accepted by [`Server::bind`](crate::Server::bind).
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Parses `"90"`, `"90s"`, `"15m"`, `"24h"` or `"7d"`.
pub fn parse_lifetime(value: &str) -> Option<Duration> {
    let value = value.trim();
    let (digits, unit) = match value.find(|c: char| !c.is_ascii_digit()) {
        Some(i) => value.split_at(i),
        None => (value, "s"),
    };
    let n: u64 = digits.parse().ok()?;
    let secs = match unit {
        "s" => n,
        "m" => n.checked_mul(60)?,
        "h" => n.checked_mul(60 * 60)?,
        "d" => n.checked_mul(24 * 60 * 60)?,
        _ => return None,
    };
    Some(Duration::from_secs(secs))
}
