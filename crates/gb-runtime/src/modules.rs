use std::any::TypeId;
use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use rhai::{
    Dynamic, Engine, EvalAltResult, FnAccess, FnNamespace, FuncRegistration, Module,
    ModuleResolver, NativeCallContext, Position, RhaiFunc, Scope, Shared,
};
use tracing::debug;

use crate::helpers::rhai_bridge::guest_fault;
use crate::scope::ScopeState;

pub const MODULE_EXTENSION: &str = "rhai";

/// Resolves `import "name"` against the module search path.
///
/// Each module file is loaded once per engine, whatever spelling imports it.
/// Its functions run against a single module-level state (reachable through
/// `this`), so every importer observes the same values.
pub(crate) struct SharedModuleResolver {
    search_path: Vec<PathBuf>,
    cache: Mutex<HashMap<PathBuf, Arc<Module>>>,
}

impl SharedModuleResolver {
    pub(crate) fn new(search_path: Vec<PathBuf>) -> Self {
        Self {
            search_path,
            cache: Mutex::new(HashMap::new()),
        }
    }

    fn locate(&self, name: &str) -> Option<PathBuf> {
        let file_name = if Path::new(name).extension().is_some() {
            PathBuf::from(name)
        } else {
            PathBuf::from(format!("{}.{}", name, MODULE_EXTENSION))
        };
        if file_name.is_absolute() {
            return file_name.is_file().then_some(file_name);
        }
        self.search_path
            .iter()
            .map(|dir| dir.join(&file_name))
            .find(|candidate| candidate.is_file())
    }
}

impl ModuleResolver for SharedModuleResolver {
    fn resolve(
        &self,
        engine: &Engine,
        _source: Option<&str>,
        path: &str,
        pos: Position,
    ) -> Result<Arc<Module>, Box<EvalAltResult>> {
        let file = self
            .locate(path)
            .ok_or_else(|| Box::new(EvalAltResult::ErrorModuleNotFound(path.to_string(), pos)))?;
        let key = fs::canonicalize(&file).unwrap_or_else(|_| file.clone());
        if let Some(module) = self.cache.lock().get(&key) {
            return Ok(Arc::clone(module));
        }

        let module = load_shared_module(engine, path, &file)
            .map_err(|error| Box::new(EvalAltResult::ErrorInModule(path.to_string(), error, pos)))?;

        // Loading runs guest code, which may import other modules, so the
        // cache is not held across it. The first instance stored wins.
        let module = Arc::clone(self.cache.lock().entry(key).or_insert(module));
        Ok(module)
    }
}

fn load_shared_module(
    engine: &Engine,
    name: &str,
    file: &Path,
) -> Result<Arc<Module>, Box<EvalAltResult>> {
    let label = file.display().to_string();
    debug!(module = name, file = %label, "loading shared module");

    let text = fs::read_to_string(file)
        .map_err(|error| guest_fault(format!("cannot read {}: {}", label, error), Position::NONE))?;
    let mut ast = engine
        .compile(&text)
        .map_err(|error| Box::new(EvalAltResult::ErrorParsing(*error.0, error.1)))?;
    ast.set_source(label.as_str());

    let mut scope = Scope::new();
    engine.run_ast_with_scope(&mut scope, &ast)?;

    let functions = ast
        .iter_functions()
        .filter(|function| !matches!(function.access, FnAccess::Private))
        .map(|function| (function.name.to_string(), function.params.len()))
        .collect::<Vec<_>>();

    let state = Arc::new(Mutex::new(ScopeState::new(scope, ast)));
    let mut module = Module::new();
    module.set_id(name);

    for (function, arity) in functions {
        let state = Arc::clone(&state);
        let module_name = name.to_string();
        let label = label.clone();
        let target = function.clone();
        let forward = move |context: Option<NativeCallContext>, args: &mut [&mut Dynamic]| {
            let Some(context) = context else {
                return Err(guest_fault(
                    format!("shared module function \"{}\" called without a context", target),
                    Position::NONE,
                ));
            };
            let args = args
                .iter_mut()
                .map(|arg| std::mem::take(&mut **arg))
                .collect::<Vec<_>>();
            let mut state = state.try_lock().ok_or_else(|| {
                guest_fault(
                    format!(
                        "shared module \"{}\" re-entered while \"{}\" was running",
                        module_name, target
                    ),
                    context.call_position(),
                )
            })?;
            state
                .call_with_namespace(context.engine(), &target, args)
                .map_err(|error| {
                    Box::new(EvalAltResult::ErrorInFunctionCall(
                        target.clone(),
                        label.clone(),
                        error,
                        context.call_position(),
                    ))
                })
        };
        FuncRegistration::new(function)
            .with_namespace(FnNamespace::Internal)
            .set_into_module_raw(
                &mut module,
                vec![TypeId::of::<Dynamic>(); arity],
                RhaiFunc::Pure {
                    func: Shared::new(forward),
                    has_context: true,
                    is_pure: true,
                    is_volatile: true,
                },
            );
    }

    Ok(Arc::new(module))
}

#[cfg(test)]
mod modules_tests {
    use super::*;

    use std::fs;

    #[test]
    fn locate_searches_directories_in_order() {
        let first = tempfile::tempdir().expect("temp dir");
        let second = tempfile::tempdir().expect("temp dir");
        fs::write(second.path().join("shared.rhai"), "let x = 1;").expect("write module");

        let resolver = SharedModuleResolver::new(vec![
            first.path().to_path_buf(),
            second.path().to_path_buf(),
        ]);
        assert_eq!(
            resolver.locate("shared"),
            Some(second.path().join("shared.rhai"))
        );
        assert_eq!(
            resolver.locate("shared.rhai"),
            Some(second.path().join("shared.rhai"))
        );
        assert_eq!(resolver.locate("missing"), None);

        fs::write(first.path().join("shared.rhai"), "let x = 2;").expect("write module");
        assert_eq!(
            resolver.locate("shared"),
            Some(first.path().join("shared.rhai"))
        );
    }

    #[test]
    fn resolved_modules_share_one_state() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("counter.rhai"),
            "let hits = 0;\nfn bump() { this.hits += 1; this.hits }\n",
        )
        .expect("write module");

        let mut engine = Engine::new();
        engine.set_module_resolver(SharedModuleResolver::new(vec![dir.path().to_path_buf()]));

        let first = engine
            .eval::<rhai::INT>("import \"counter\" as c; c::bump()")
            .expect("first import");
        let second = engine
            .eval::<rhai::INT>("import \"counter\" as other; other::bump()")
            .expect("second import");
        assert_eq!(first, 1);
        assert_eq!(second, 2);
    }

    #[test]
    fn import_spellings_of_one_file_share_an_instance() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("counter.rhai"),
            "let hits = 0;\nfn bump() { this.hits += 1; this.hits }\n",
        )
        .expect("write module");

        let mut engine = Engine::new();
        engine.set_module_resolver(SharedModuleResolver::new(vec![dir.path().to_path_buf()]));

        let bare = engine
            .eval::<rhai::INT>("import \"counter\" as c; c::bump()")
            .expect("bare name");
        let with_extension = engine
            .eval::<rhai::INT>("import \"counter.rhai\" as c; c::bump()")
            .expect("name with extension");
        let absolute = dir.path().join("counter.rhai");
        let absolute = engine
            .eval::<rhai::INT>(&format!(
                "import {:?} as c; c::bump()",
                absolute.display().to_string()
            ))
            .expect("absolute path");
        assert_eq!((bare, with_extension, absolute), (1, 2, 3));
    }

    #[test]
    fn faults_inside_module_functions_keep_the_module_frame() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("boomer.rhai"),
            "fn boom() { throw \"kaboom\"; }\n",
        )
        .expect("write module");

        let mut engine = Engine::new();
        engine.set_module_resolver(SharedModuleResolver::new(vec![dir.path().to_path_buf()]));

        let error = engine
            .eval::<rhai::INT>("import \"boomer\" as b; b::boom()")
            .expect_err("module function throws");
        match *error {
            EvalAltResult::ErrorInFunctionCall(function, source, inner, _) => {
                assert_eq!(function, "boom");
                assert!(source.ends_with("boomer.rhai"), "source was {source}");
                assert!(matches!(*inner, EvalAltResult::ErrorRuntime(..)));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn reentering_a_running_module_is_a_guest_fault() {
        let dir = tempfile::tempdir().expect("temp dir");
        fs::write(
            dir.path().join("looped.rhai"),
            "fn outer() { import \"looped\" as me; me::inner() }\nfn inner() { 1 }\n",
        )
        .expect("write module");

        let mut engine = Engine::new();
        engine.set_module_resolver(SharedModuleResolver::new(vec![dir.path().to_path_buf()]));

        let error = engine
            .eval::<rhai::INT>("import \"looped\" as m; m::outer()")
            .expect_err("re-entry should fail");
        assert!(error.to_string().contains("re-entered"));
        assert_eq!(
            engine
                .eval::<rhai::INT>("import \"looped\" as m; m::inner()")
                .expect("module still usable"),
            1
        );
    }

    #[test]
    fn missing_module_is_reported_by_name() {
        let engine = {
            let mut engine = Engine::new();
            engine.set_module_resolver(SharedModuleResolver::new(Vec::new()));
            engine
        };
        let error = engine
            .run("import \"nowhere\" as n;")
            .expect_err("module should be missing");
        assert!(error.to_string().contains("nowhere"));
    }
}
