use std::ffi::{OsStr, OsString};
use std::path::{Path, PathBuf};

use gb_core::{HOME_ENV, MODULE_PATH_ENV};
use tracing::debug;

use crate::HarnessError;

/// Process search-path variable rewritten by [`select_interpreter_home`].
pub const SEARCH_PATH_ENV: &str = "PATH";
/// Entries containing this text (any case) belong to an interpreter install.
pub const INTERPRETER_MARKER: &str = "rhai";

/// Drops every entry of `value` that mentions `marker` (case-insensitive) and
/// puts `home` first.
pub fn filter_search_path(
    value: &OsStr,
    marker: &str,
    home: &Path,
) -> Result<OsString, std::env::JoinPathsError> {
    let marker = marker.to_lowercase();
    let kept = std::env::split_paths(value)
        .filter(|entry| !entry.as_os_str().is_empty())
        .filter(|entry| {
            !entry
                .to_string_lossy()
                .to_lowercase()
                .contains(marker.as_str())
        });
    std::env::join_paths(std::iter::once(home.to_path_buf()).chain(kept))
}

/// Points the process at the interpreter installed under `path`.
///
/// Must run before the interpreter is initialized; the change lasts for the
/// rest of the process unless an [`EnvSnapshot`] restores it.
pub fn select_interpreter_home(path: impl AsRef<Path>) -> Result<(), HarnessError> {
    let path = path.as_ref();
    let current = std::env::var_os(SEARCH_PATH_ENV).unwrap_or_default();
    let rewritten = filter_search_path(&current, INTERPRETER_MARKER, path).map_err(|source| {
        HarnessError::SearchPath {
            variable: SEARCH_PATH_ENV.to_string(),
            source,
        }
    })?;
    std::env::set_var(SEARCH_PATH_ENV, rewritten);
    std::env::set_var(HOME_ENV, path);
    debug!(home = %path.display(), "selected interpreter home");
    Ok(())
}

/// Appends `path` to `RHAI_PATH`, creating it if absent. Duplicates are kept.
pub fn append_module_search_path(path: impl AsRef<Path>) -> Result<(), HarnessError> {
    let mut entries: Vec<PathBuf> = std::env::var_os(MODULE_PATH_ENV)
        .map(|value| {
            std::env::split_paths(&value)
                .filter(|entry| !entry.as_os_str().is_empty())
                .collect()
        })
        .unwrap_or_default();
    entries.push(path.as_ref().to_path_buf());
    let joined = std::env::join_paths(entries).map_err(|source| HarnessError::SearchPath {
        variable: MODULE_PATH_ENV.to_string(),
        source,
    })?;
    std::env::set_var(MODULE_PATH_ENV, joined);
    Ok(())
}

/// Captured environment variables, restored when the snapshot is dropped.
#[derive(Debug)]
pub struct EnvSnapshot {
    saved: Vec<(String, Option<OsString>)>,
}

impl EnvSnapshot {
    pub fn capture(keys: &[&str]) -> Self {
        Self {
            saved: keys
                .iter()
                .map(|key| (key.to_string(), std::env::var_os(key)))
                .collect(),
        }
    }
}

impl Drop for EnvSnapshot {
    fn drop(&mut self) {
        for (key, value) in self.saved.drain(..) {
            match value {
                Some(value) => std::env::set_var(&key, value),
                None => std::env::remove_var(&key),
            }
        }
    }
}
