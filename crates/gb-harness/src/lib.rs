use std::path::Path;

use gb_core::BridgeError;
use gb_runtime::{load_module, Globals, ScriptScope};
use thiserror::Error;

mod env;
mod logger;
mod paths;

pub use env::{
    append_module_search_path, filter_search_path, select_interpreter_home, EnvSnapshot,
    INTERPRETER_MARKER, SEARCH_PATH_ENV,
};
pub use logger::{Logger, LoggerApi};
pub use paths::{executable_dir, host_dir, list_scripts, script_path, scripts_dir, SCRIPTS_DIR};

#[derive(Debug, Error)]
pub enum HarnessError {
    #[error("cannot rebuild {variable}: {source}")]
    SearchPath {
        variable: String,
        #[source]
        source: std::env::JoinPathsError,
    },
}

/// Loads `file` from the fixture directory into a new scope named `name`.
pub fn load_fixture(
    name: &str,
    file: impl AsRef<Path>,
    globals: Option<&Globals>,
) -> Result<ScriptScope, BridgeError> {
    load_module(name, script_path(file), globals)
}
