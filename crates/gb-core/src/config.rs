use std::ffi::OsString;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Environment variable naming the interpreter home directory.
pub const HOME_ENV: &str = "RHAI_HOME";
/// Environment variable holding extra module search directories.
pub const MODULE_PATH_ENV: &str = "RHAI_PATH";

/// Resource limits applied to the embedded engine.
///
/// A zero `max_operations` means no limit, so a script that never terminates
/// blocks its caller.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineLimits {
    pub max_operations: u64,
    pub max_call_levels: usize,
    pub max_expr_depth: usize,
    pub max_function_expr_depth: usize,
    pub max_string_size: usize,
    pub max_array_size: usize,
    pub max_map_size: usize,
    pub max_modules: usize,
}

impl Default for EngineLimits {
    fn default() -> Self {
        Self {
            max_operations: 0,
            max_call_levels: 64,
            max_expr_depth: 64,
            max_function_expr_depth: 32,
            max_string_size: 1_000_000,
            max_array_size: 100_000,
            max_map_size: 100_000,
            max_modules: 64,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct InterpreterConfig {
    pub home: Option<PathBuf>,
    pub module_search_path: Vec<PathBuf>,
    pub strict_variables: bool,
    pub limits: EngineLimits,
}

impl InterpreterConfig {
    /// Builds a configuration from `RHAI_HOME` and `RHAI_PATH`.
    pub fn from_env() -> Self {
        Self::from_vars(std::env::var_os(HOME_ENV), std::env::var_os(MODULE_PATH_ENV))
    }

    pub fn from_vars(home: Option<OsString>, module_path: Option<OsString>) -> Self {
        let home = home.filter(|value| !value.is_empty()).map(PathBuf::from);
        let module_search_path = module_path
            .map(|value| {
                std::env::split_paths(&value)
                    .filter(|path| !path.as_os_str().is_empty())
                    .collect()
            })
            .unwrap_or_default();

        Self {
            home,
            module_search_path,
            ..Self::default()
        }
    }

    pub fn with_module_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.module_search_path.push(path.into());
        self
    }

    pub fn with_limits(mut self, limits: EngineLimits) -> Self {
        self.limits = limits;
        self
    }
}
