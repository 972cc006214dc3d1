use std::ffi::OsString;
use std::sync::Arc;

use clap::Parser;
use gb_core::{GuestValue, InterpreterConfig};
use gb_harness::{Logger, LoggerApi};
use gb_runtime::{initialize_with, load_module, shutdown, Globals, HostApi};
use tracing::{info, warn};

mod cli_args;
mod error_map;
mod json_value;

pub(crate) use cli_args::{Cli, Mode, RunArgs};
pub(crate) use error_map::{emit_error, map_cli_global_invalid, map_cli_json_invalid, CliError};
pub(crate) use json_value::{guest_to_json, json_to_guest};

const LOGGER_GLOBAL: &str = "Logger";

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => {
            let _ = error.print();
            return error.exit_code();
        }
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, CliError> {
    match cli.command {
        Mode::Run(args) => run_script(args),
    }
}

fn run_script(args: RunArgs) -> Result<i32, CliError> {
    let mut globals = args
        .global
        .iter()
        .map(|raw| parse_global(raw))
        .collect::<Result<Globals, _>>()?;
    let call_args = args
        .arg
        .iter()
        .map(|raw| parse_json(raw))
        .collect::<Result<Vec<_>, _>>()?;

    let logger = args.with_logger.then(Logger::new);
    let mut apis: Vec<Arc<dyn HostApi>> = Vec::new();
    if let Some(logger) = &logger {
        apis.push(Arc::new(LoggerApi));
        globals.insert(LOGGER_GLOBAL.to_string(), GuestValue::object(logger.clone()));
    }

    let config = args
        .module_path
        .iter()
        .fold(InterpreterConfig::from_env(), |config, path| {
            config.with_module_path(path)
        });
    initialize_with(config, &apis)?;

    let outcome = execute(&args, &globals, &call_args);
    if let Err(error) = shutdown() {
        warn!(%error, "interpreter shutdown failed");
    }
    let value = outcome?;

    println!("RESULT:OK");
    println!("VALUE_JSON:{}", guest_to_json(&value)?);
    if let Some(logger) = logger {
        println!(
            "LOGGER_JSON:{}",
            serde_json::Value::String(logger.last_message())
        );
    }
    Ok(0)
}

fn execute(
    args: &RunArgs,
    globals: &Globals,
    call_args: &[GuestValue],
) -> Result<GuestValue, CliError> {
    let name = args.name.clone().unwrap_or_else(|| {
        args.script
            .file_stem()
            .map(|stem| stem.to_string_lossy().to_string())
            .unwrap_or_else(|| "main".to_string())
    });
    let scope = load_module(&name, &args.script, Some(globals))?;
    info!(scope = %name, script = %args.script.display(), "script loaded");

    match &args.call {
        Some(function) => Ok(scope.call(function, call_args)?),
        None => Ok(GuestValue::Unit),
    }
}

fn parse_global(raw: &str) -> Result<(String, GuestValue), CliError> {
    let (name, value) = raw
        .split_once('=')
        .filter(|(name, _)| !name.trim().is_empty())
        .ok_or_else(|| map_cli_global_invalid(raw))?;
    Ok((name.trim().to_string(), parse_json(value)?))
}

fn parse_json(raw: &str) -> Result<GuestValue, CliError> {
    let value = serde_json::from_str(raw).map_err(map_cli_json_invalid)?;
    Ok(json_to_guest(value)?)
}
