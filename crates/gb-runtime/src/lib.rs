mod engine;
mod helpers;
mod host;
mod interpreter;
mod modules;
mod scope;

pub use host::HostApi;
pub use interpreter::{
    generation, initialize, initialize_from_env, initialize_with, is_initialized,
    module_search_path, shutdown, Gil, HOME_MODULES_DIR,
};
pub use modules::MODULE_EXTENSION;
pub use scope::{load_module, load_source, Globals, GuestFunction, ScriptScope};
