use std::path::PathBuf;
use std::sync::Arc;

use gb_core::InterpreterConfig;
use rhai::Engine;
use tracing::{debug, info};

use crate::host::HostApi;
use crate::modules::SharedModuleResolver;

pub(crate) fn build_engine(
    config: &InterpreterConfig,
    module_search_path: Vec<PathBuf>,
    apis: &[Arc<dyn HostApi>],
) -> Engine {
    let mut engine = Engine::new();
    engine.set_strict_variables(config.strict_variables);
    engine.set_fail_on_invalid_map_property(true);

    let limits = &config.limits;
    engine.set_max_operations(limits.max_operations);
    engine.set_max_call_levels(limits.max_call_levels);
    engine.set_max_expr_depths(limits.max_expr_depth, limits.max_function_expr_depth);
    engine.set_max_string_size(limits.max_string_size);
    engine.set_max_array_size(limits.max_array_size);
    engine.set_max_map_size(limits.max_map_size);
    engine.set_max_modules(limits.max_modules);

    engine.set_module_resolver(SharedModuleResolver::new(module_search_path));

    engine.on_print(|text| info!(target: "guest", "{}", text));
    engine.on_debug(|text, source, position| {
        debug!(
            target: "guest",
            source = source.unwrap_or("<unknown>"),
            position = ?position,
            "{}",
            text
        )
    });

    for api in apis {
        api.register(&mut engine);
    }

    engine
}
