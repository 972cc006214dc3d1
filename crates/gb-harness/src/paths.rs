use std::path::{Path, PathBuf};

use gb_runtime::MODULE_EXTENSION;
use walkdir::WalkDir;

pub const SCRIPTS_DIR: &str = "scripts";

/// Directory of the harness crate. Fixture scripts live beneath it.
pub fn host_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
}

pub fn scripts_dir() -> PathBuf {
    host_dir().join(SCRIPTS_DIR)
}

/// Joins `file` onto the fixture directory. Existence is not checked.
pub fn script_path(file: impl AsRef<Path>) -> PathBuf {
    scripts_dir().join(file)
}

/// Directory holding the running binary, if the platform reports one.
pub fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

/// Every guest script under `dir`, sorted by path.
pub fn list_scripts(dir: &Path) -> Vec<PathBuf> {
    let mut scripts = WalkDir::new(dir)
        .follow_links(false)
        .into_iter()
        .filter_map(Result::ok)
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|extension| extension == MODULE_EXTENSION)
        })
        .collect::<Vec<_>>();
    scripts.sort();
    scripts
}
