//! Controller discovery.
//!
//! Controller modules are compiled into the binary, so there is nothing to
//! import at runtime. Each module file contributes one [`ModuleEntry`] to a
//! [`Manifest`]: its path relative to the discovery root and a loader that
//! runs the module's declarations. [`Discovery`] matches the manifest against
//! glob patterns and loads every match in a fresh [`ModuleScope`].
//!
//! A loader that fails or panics is reported and skipped. Its scope is
//! thrown away, so a half-loaded module leaves nothing behind, and the rest
//! of the matched modules still load.

use std::collections::BTreeSet;
use std::error::Error as StdError;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};

use glob::{MatchOptions, Pattern};
use http::Extensions;
use tracing::{debug, error, info, warn};

use crate::controller::{Controller, ControllerType};
use crate::error::{ConfigError, LoadError};
use crate::handler::panic_message;
use crate::registry::Registry;

/// Patterns used when none are configured, relative to the discovery root.
pub const DEFAULT_PATTERNS: &[&str] = &[
    "modules/**/controllers/**/*_controller.rs",
    "modules/**/controllers/**/*.controller.rs",
    "shared/**/controllers/**/*_controller.rs",
    "shared/**/controllers/**/*.controller.rs",
];

const MATCH_OPTIONS: MatchOptions = MatchOptions {
    case_sensitive: true,
    require_literal_separator: true,
    require_literal_leading_dot: false,
};

pub type LoadResult = Result<(), Box<dyn StdError + Send + Sync>>;

/// Runs one module's declarations.
pub type Loader = fn(&mut ModuleScope<'_>) -> LoadResult;

// ── Manifest ──────────────────────────────────────────────────────────────────

#[derive(Clone, Copy)]
pub struct ModuleEntry {
    /// Relative to the discovery root, `/`-separated.
    pub path: &'static str,
    pub load: Loader,
}

impl fmt::Debug for ModuleEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ModuleEntry").field("path", &self.path).finish_non_exhaustive()
    }
}

/// Every controller module the binary was built with.
#[derive(Clone, Debug, Default)]
pub struct Manifest {
    entries: Vec<ModuleEntry>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn module(mut self, path: &'static str, load: Loader) -> Self {
        self.entries.push(ModuleEntry { path, load });
        self
    }

    pub fn entries(&self) -> &[ModuleEntry] {
        &self.entries
    }
}

// ── Module scope ──────────────────────────────────────────────────────────────

/// Everything one module declares while it loads.
pub struct ModuleScope<'a> {
    registry: Registry,
    exports: Vec<ControllerType>,
    context: &'a Extensions,
}

impl<'a> ModuleScope<'a> {
    fn new(context: &'a Extensions) -> Self {
        Self { registry: Registry::new(), exports: Vec::new(), context }
    }

    /// Declarations made here are merged into the shared registry only if
    /// the loader succeeds.
    pub fn registry(&mut self) -> &mut Registry {
        &mut self.registry
    }

    /// Makes `C` visible to discovery. Exports without a declared base path
    /// are ignored.
    pub fn export<C: Controller>(&mut self) {
        self.exports.push(ControllerType::of::<C>());
    }

    /// Shared values supplied by the application, e.g. the authenticator.
    pub fn context<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.context.get::<T>()
    }

    /// Like [`context`](Self::context), but a missing value is an error the
    /// loader can return with `?`.
    pub fn require<T: Send + Sync + 'static>(&self) -> Result<&T, MissingContext> {
        self.context().ok_or(MissingContext(std::any::type_name::<T>()))
    }
}

#[derive(Debug, thiserror::Error)]
#[error("module context has no value of type `{0}`")]
pub struct MissingContext(pub &'static str);

// ── Discovery ─────────────────────────────────────────────────────────────────

/// What a discovery pass found.
#[derive(Debug, Default)]
pub struct DiscoveryReport {
    /// Matched module paths, absolute, sorted, without duplicates.
    pub files: Vec<PathBuf>,
    /// Exported controllers that carry controller metadata, in load order.
    pub controllers: Vec<ControllerType>,
    pub failures: Vec<LoadError>,
}

pub struct Discovery {
    root: PathBuf,
    patterns: Vec<String>,
}

impl Discovery {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            patterns: DEFAULT_PATTERNS.iter().map(|p| (*p).to_owned()).collect(),
        }
    }

    /// Replaces the default patterns. An empty list keeps the defaults.
    pub fn with_patterns<I, S>(mut self, patterns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let patterns: Vec<String> = patterns.into_iter().map(Into::into).collect();
        if !patterns.is_empty() {
            self.patterns = patterns;
        }
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    /// Absolute paths of the manifest entries matching any pattern, sorted
    /// lexicographically with duplicates removed.
    pub fn expand(&self, manifest: &Manifest) -> Result<Vec<PathBuf>, ConfigError> {
        Ok(self.matching(manifest)?.into_iter().map(|(path, _)| path).collect())
    }

    /// Loads every matching module and merges what it declared into
    /// `registry`.
    ///
    /// Only an unparsable pattern fails the whole pass; module failures are
    /// collected in the report.
    pub fn run(
        &self,
        manifest: &Manifest,
        registry: &mut Registry,
        context: &Extensions,
    ) -> Result<DiscoveryReport, ConfigError> {
        let matched = self.matching(manifest)?;
        info!(
            root = %self.root.display(),
            count = matched.len(),
            files = ?matched.iter().map(|(p, _)| p.display().to_string()).collect::<Vec<_>>(),
            "discovered controller modules"
        );

        let mut report = DiscoveryReport::default();
        let mut exported = Vec::new();

        for (path, entry) in matched {
            match load_module(&path, entry, context) {
                Ok(scope) => {
                    debug!(path = %path.display(), exports = scope.exports.len(), "loaded controller module");
                    registry.merge(scope.registry);
                    exported.extend(scope.exports);
                }
                Err(e) => {
                    error!(path = %path.display(), error = %e, "failed to load controller module");
                    report.failures.push(e);
                }
            }
            report.files.push(path);
        }

        for controller in exported {
            if report.controllers.contains(&controller) {
                continue;
            }
            if registry.is_declared(controller.id()) {
                report.controllers.push(controller);
            } else {
                warn!(controller = controller.name(), "exported type has no base path; skipping");
            }
        }

        Ok(report)
    }

    fn matching(&self, manifest: &Manifest) -> Result<Vec<(PathBuf, ModuleEntry)>, ConfigError> {
        let patterns = self
            .patterns
            .iter()
            .map(|raw| {
                Pattern::new(raw).map_err(|e| ConfigError::InvalidPattern {
                    pattern: raw.clone(),
                    reason: e.to_string(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut seen = BTreeSet::new();
        let mut matched: Vec<(PathBuf, ModuleEntry)> = manifest
            .entries()
            .iter()
            .filter(|entry| {
                let relative = Path::new(entry.path);
                patterns.iter().any(|p| p.matches_path_with(relative, MATCH_OPTIONS))
            })
            .map(|entry| (self.root.join(entry.path), *entry))
            .filter(|(path, _)| seen.insert(path.clone()))
            .collect();

        matched.sort_by(|(a, _), (b, _)| a.cmp(b));
        Ok(matched)
    }
}

fn load_module<'a>(
    path: &Path,
    entry: ModuleEntry,
    context: &'a Extensions,
) -> Result<ModuleScope<'a>, LoadError> {
    let mut scope = ModuleScope::new(context);
    match std::panic::catch_unwind(AssertUnwindSafe(|| (entry.load)(&mut scope))) {
        Ok(Ok(())) => Ok(scope),
        Ok(Err(source)) => Err(LoadError::Failed { path: path.to_path_buf(), source }),
        Err(payload) => Err(LoadError::Panicked {
            path: path.to_path_buf(),
            message: panic_message(payload.as_ref()),
        }),
    }
}
