use std::cell::RefCell;
use std::path::PathBuf;
use std::sync::Arc;

use gb_core::{BridgeError, InterpreterConfig};
use once_cell::sync::Lazy;
use parking_lot::{ReentrantMutex, ReentrantMutexGuard};
use rhai::Engine;
use tracing::info;

use crate::engine::build_engine;
use crate::host::HostApi;

/// Subdirectory of the interpreter home searched for shared modules.
pub const HOME_MODULES_DIR: &str = "modules";

pub(crate) struct Runtime {
    pub(crate) engine: Engine,
    pub(crate) generation: u64,
    module_search_path: Vec<PathBuf>,
}

#[derive(Default)]
struct Slot {
    runtime: Option<Runtime>,
    generations: u64,
}

static SLOT: Lazy<ReentrantMutex<RefCell<Slot>>> =
    Lazy::new(|| ReentrantMutex::new(RefCell::new(Slot::default())));

/// Exclusive access to the interpreter.
///
/// Reentrant on the owning thread, so nested acquisitions inside one logical
/// operation never block. Released when dropped.
pub struct Gil {
    guard: ReentrantMutexGuard<'static, RefCell<Slot>>,
}

impl Gil {
    pub fn acquire() -> Self {
        Self { guard: SLOT.lock() }
    }

    pub fn is_initialized(&self) -> bool {
        self.guard
            .try_borrow()
            .map(|slot| slot.runtime.is_some())
            .unwrap_or(true)
    }

    pub(crate) fn with_runtime<R>(
        &self,
        f: impl FnOnce(&Runtime) -> Result<R, BridgeError>,
    ) -> Result<R, BridgeError> {
        let slot = self
            .guard
            .try_borrow()
            .map_err(|_| BridgeError::busy("run guest code while the interpreter is changing"))?;
        let runtime = slot.runtime.as_ref().ok_or(BridgeError::NotInitialized)?;
        f(runtime)
    }
}

/// Starts the interpreter with no extra host API.
pub fn initialize(config: InterpreterConfig) -> Result<(), BridgeError> {
    initialize_with(config, &[])
}

/// Starts the interpreter from `RHAI_HOME` / `RHAI_PATH`.
pub fn initialize_from_env() -> Result<(), BridgeError> {
    initialize(InterpreterConfig::from_env())
}

pub fn initialize_with(
    config: InterpreterConfig,
    apis: &[Arc<dyn HostApi>],
) -> Result<(), BridgeError> {
    let gil = Gil::acquire();
    // Host callbacks run with the slot borrowed; starting over from one is refused.
    let mut slot = gil
        .guard
        .try_borrow_mut()
        .map_err(|_| BridgeError::busy("initialize"))?;
    if slot.runtime.is_some() {
        return Err(BridgeError::AlreadyInitialized);
    }

    let mut module_search_path = config.module_search_path.clone();
    if let Some(home) = &config.home {
        module_search_path.push(home.join(HOME_MODULES_DIR));
    }

    slot.generations += 1;
    let generation = slot.generations;
    let engine = build_engine(&config, module_search_path.clone(), apis);
    info!(
        generation,
        home = ?config.home,
        module_search_path = ?module_search_path,
        "interpreter initialized"
    );

    slot.runtime = Some(Runtime {
        engine,
        generation,
        module_search_path,
    });
    Ok(())
}

/// Tears the interpreter down. Shared modules die with it and scopes created
/// under it become stale.
pub fn shutdown() -> Result<(), BridgeError> {
    let gil = Gil::acquire();
    let runtime = gil
        .guard
        .try_borrow_mut()
        .map_err(|_| BridgeError::busy("shut down"))?
        .runtime
        .take()
        .ok_or(BridgeError::NotInitialized)?;
    info!(generation = runtime.generation, "interpreter shut down");
    drop(runtime);
    Ok(())
}

pub fn is_initialized() -> bool {
    Gil::acquire().is_initialized()
}

/// Effective module search path: configured entries, then `<home>/modules`.
pub fn module_search_path() -> Result<Vec<PathBuf>, BridgeError> {
    let gil = Gil::acquire();
    gil.with_runtime(|runtime| Ok(runtime.module_search_path.clone()))
}

/// Counter identifying the live interpreter instance.
pub fn generation() -> Result<u64, BridgeError> {
    let gil = Gil::acquire();
    gil.with_runtime(|runtime| Ok(runtime.generation))
}
