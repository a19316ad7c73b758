use crate::error::Result;
use crate::models::RouteMatch;
use std::collections::BTreeMap;
use std::path::Path;

/// Read-only view of process environment variables
///
/// Classification reads every variable through this trait so a test or a
/// host fixture can stand in for the real process environment.
pub trait EnvSource: Send + Sync {
    /// Value of `key`, or `None` when unset
    fn var(&self, key: &str) -> Option<String>;

    /// Value of `key` when set to something non-empty
    fn non_empty(&self, key: &str) -> Option<String> {
        self.var(key).filter(|v| !v.trim().is_empty())
    }
}

/// Read-only view of sentinel files on the host filesystem
pub trait FileProbe: Send + Sync {
    /// Whether `path` exists (file or directory)
    fn exists(&self, path: &Path) -> bool;

    /// Contents of `path` as UTF-8, or `None` when unreadable
    fn read_to_string(&self, path: &Path) -> Option<String>;
}

/// Parameterized path matching (`/users/:id`)
///
/// Consumers hold a `dyn RouteMatcher` so the built-in matcher can be
/// replaced by another implementation without touching call sites.
pub trait RouteMatcher: Send + Sync {
    /// Match `path` against `pattern`, extracting named parameters.
    /// Returns `Ok(None)` when the path does not match.
    fn match_path(&self, pattern: &str, path: &str) -> Result<Option<RouteMatch>>;

    /// Build a concrete path from `pattern` by substituting `params`
    fn compile_path(&self, pattern: &str, params: &BTreeMap<String, String>) -> Result<String>;
}

impl<T: EnvSource + ?Sized> EnvSource for &T {
    fn var(&self, key: &str) -> Option<String> {
        (**self).var(key)
    }
}

impl<T: FileProbe + ?Sized> FileProbe for &T {
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }

    fn read_to_string(&self, path: &Path) -> Option<String> {
        (**self).read_to_string(path)
    }
}
