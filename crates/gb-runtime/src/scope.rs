use std::collections::BTreeMap;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use gb_core::{BridgeError, GuestValue};
use parking_lot::Mutex;
use rhai::{CallFnOptions, Dynamic, Engine, EvalAltResult, Map, Scope, AST};
use tracing::debug;

use crate::helpers::rhai_bridge::{
    call_error, dynamic_to_guest, guest_to_dynamic, runtime_error, syntax_error, MAIN_FRAME,
};
use crate::interpreter::{Gil, Runtime};

/// Global bindings injected into a scope before its script runs.
pub type Globals = BTreeMap<String, GuestValue>;

/// Variables and compiled code of one loaded unit.
///
/// Guest functions see the variables through `this`; whatever they change on
/// `this` is copied back into the variables after the call returns, including
/// when it faults.
pub(crate) struct ScopeState {
    scope: Scope<'static>,
    ast: AST,
}

impl ScopeState {
    pub(crate) fn new(scope: Scope<'static>, ast: AST) -> Self {
        Self { scope, ast }
    }

    pub(crate) fn call_with_namespace(
        &mut self,
        engine: &Engine,
        name: &str,
        args: Vec<Dynamic>,
    ) -> Result<Dynamic, Box<EvalAltResult>> {
        let mut this = namespace_object(&self.scope);
        let options = CallFnOptions::new()
            .eval_ast(false)
            .rewind_scope(true)
            .bind_this_ptr(&mut this);
        let result =
            engine.call_fn_with_options::<Dynamic>(options, &mut self.scope, &self.ast, name, args);
        write_back_namespace(&mut self.scope, this);
        result
    }

    pub(crate) fn has_function(&self, name: &str) -> bool {
        self.ast.iter_functions().any(|function| function.name == name)
    }

    pub(crate) fn function_names(&self) -> Vec<String> {
        let mut names = Vec::new();
        for function in self.ast.iter_functions() {
            if !names.iter().any(|name| name == function.name) {
                names.push(function.name.to_string());
            }
        }
        names
    }
}

fn namespace_object(scope: &Scope<'static>) -> Dynamic {
    let mut map = Map::new();
    for (name, _, value) in scope.iter() {
        map.insert(name.into(), value);
    }
    Dynamic::from_map(map)
}

fn write_back_namespace(scope: &mut Scope<'static>, this: Dynamic) {
    let Some(map) = this.try_cast::<Map>() else {
        return;
    };
    for (name, value) in map {
        if scope.is_constant(name.as_str()).unwrap_or(false) {
            continue;
        }
        scope.set_or_push(name, value);
    }
}

struct ScopeInner {
    name: String,
    label: String,
    generation: u64,
    state: Mutex<ScopeState>,
}

/// Handle to an isolated namespace populated by one script.
///
/// Clones share the same namespace. A handle is only usable while the
/// interpreter that created it is alive.
#[derive(Clone)]
pub struct ScriptScope {
    inner: Arc<ScopeInner>,
}

impl std::fmt::Debug for ScriptScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScriptScope")
            .field("name", &self.inner.name)
            .field("label", &self.inner.label)
            .field("generation", &self.inner.generation)
            .finish()
    }
}

impl ScriptScope {
    pub fn name(&self) -> &str {
        &self.inner.name
    }

    pub fn source_label(&self) -> &str {
        &self.inner.label
    }

    pub fn get(&self, name: &str) -> Result<GuestValue, BridgeError> {
        self.with_state(|_, state| {
            state
                .scope
                .get(name)
                .cloned()
                .map(dynamic_to_guest)
                .ok_or_else(|| BridgeError::UnknownGlobal {
                    scope: self.inner.name.clone(),
                    name: name.to_string(),
                })
        })
    }

    pub fn set(&self, name: &str, value: impl Into<GuestValue>) -> Result<(), BridgeError> {
        let value = value.into();
        self.with_state(|_, state| {
            if state.scope.is_constant(name).unwrap_or(false) {
                return Err(BridgeError::ReadOnlyGlobal {
                    scope: self.inner.name.clone(),
                    name: name.to_string(),
                });
            }
            state
                .scope
                .set_or_push(name.to_string(), guest_to_dynamic(&value));
            Ok(())
        })
    }

    pub fn contains(&self, name: &str) -> Result<bool, BridgeError> {
        self.with_state(|_, state| Ok(state.scope.contains(name)))
    }

    pub fn global_names(&self) -> Result<Vec<String>, BridgeError> {
        self.with_state(|_, state| {
            let mut names: Vec<String> = Vec::new();
            for (name, _, _) in state.scope.iter() {
                if !names.iter().any(|known| known == name) {
                    names.push(name.to_string());
                }
            }
            Ok(names)
        })
    }

    pub fn has_function(&self, name: &str) -> Result<bool, BridgeError> {
        self.with_state(|_, state| Ok(state.has_function(name)))
    }

    pub fn function_names(&self) -> Result<Vec<String>, BridgeError> {
        self.with_state(|_, state| Ok(state.function_names()))
    }

    /// Calls a guest function defined by this scope's script.
    pub fn call(&self, name: &str, args: &[GuestValue]) -> Result<GuestValue, BridgeError> {
        let args = args.iter().map(guest_to_dynamic).collect::<Vec<_>>();
        self.with_state(|runtime, state| {
            debug!(scope = %self.inner.name, function = name, args = args.len(), "calling guest function");
            state
                .call_with_namespace(&runtime.engine, name, args)
                .map(dynamic_to_guest)
                .map_err(|error| call_error(&self.inner.label, name, &error))
        })
    }

    pub fn function(&self, name: &str) -> Result<GuestFunction, BridgeError> {
        if !self.has_function(name)? {
            return Err(BridgeError::Call {
                function: name.to_string(),
                message: format!("not defined in scope \"{}\"", self.inner.name),
            });
        }
        Ok(GuestFunction {
            scope: self.clone(),
            name: name.to_string(),
        })
    }

    fn with_state<R>(
        &self,
        f: impl FnOnce(&Runtime, &mut ScopeState) -> Result<R, BridgeError>,
    ) -> Result<R, BridgeError> {
        let gil = Gil::acquire();
        gil.with_runtime(|runtime| {
            if runtime.generation != self.inner.generation {
                return Err(BridgeError::StaleScope {
                    scope: self.inner.name.clone(),
                });
            }
            let mut state = self.inner.state.try_lock().ok_or_else(|| {
                BridgeError::busy(format!("re-enter scope \"{}\"", self.inner.name))
            })?;
            f(runtime, &mut state)
        })
    }
}

/// A guest function looked up by name, invocable like a host closure.
#[derive(Debug, Clone)]
pub struct GuestFunction {
    scope: ScriptScope,
    name: String,
}

impl GuestFunction {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn invoke(&self, args: &[GuestValue]) -> Result<GuestValue, BridgeError> {
        self.scope.call(&self.name, args)
    }
}

/// Creates a new scope named `name`, binds `globals`, then compiles and runs
/// the file at `path` in it. The file path is the unit's source label.
pub fn load_module(
    name: &str,
    path: impl AsRef<Path>,
    globals: Option<&Globals>,
) -> Result<ScriptScope, BridgeError> {
    let path = path.as_ref();
    let gil = Gil::acquire();
    gil.with_runtime(|runtime| {
        let scope = bind_globals(globals);
        let text = fs::read_to_string(path).map_err(|source| BridgeError::ReadScript {
            path: path.to_path_buf(),
            source,
        })?;
        compile_and_run(runtime, name, &path.display().to_string(), &text, scope)
    })
}

/// Same as [`load_module`] for in-memory source text.
pub fn load_source(
    name: &str,
    label: &str,
    text: &str,
    globals: Option<&Globals>,
) -> Result<ScriptScope, BridgeError> {
    let gil = Gil::acquire();
    gil.with_runtime(|runtime| compile_and_run(runtime, name, label, text, bind_globals(globals)))
}

fn bind_globals(globals: Option<&Globals>) -> Scope<'static> {
    let mut scope = Scope::new();
    for (name, value) in globals.into_iter().flatten() {
        scope.push_dynamic(name.clone(), guest_to_dynamic(value));
    }
    scope
}

fn compile_and_run(
    runtime: &Runtime,
    name: &str,
    label: &str,
    text: &str,
    mut scope: Scope<'static>,
) -> Result<ScriptScope, BridgeError> {
    debug!(scope = name, label, globals = scope.len(), "loading script scope");

    let mut ast = runtime
        .engine
        .compile_with_scope(&scope, text)
        .map_err(|error| syntax_error(label, &error))?;
    ast.set_source(label);

    runtime
        .engine
        .run_ast_with_scope(&mut scope, &ast)
        .map_err(|error| runtime_error(label, MAIN_FRAME, &error))?;

    Ok(ScriptScope {
        inner: Arc::new(ScopeInner {
            name: name.to_string(),
            label: label.to_string(),
            generation: runtime.generation,
            state: Mutex::new(ScopeState::new(scope, ast)),
        }),
    })
}
