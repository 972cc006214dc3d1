use std::collections::BTreeMap;

use gb_core::{BridgeError, GuestValue, HostObject, SourceLocation, TraceFrame};
use rhai::{Array, Blob, Dynamic, EvalAltResult, ImmutableString, Map, ParseError, Position, FLOAT, INT};

pub(crate) const MAIN_FRAME: &str = "<main>";

pub(crate) fn guest_to_dynamic(value: &GuestValue) -> Dynamic {
    match value {
        GuestValue::Unit => Dynamic::UNIT,
        GuestValue::Bool(value) => Dynamic::from_bool(*value),
        GuestValue::Int(value) => Dynamic::from_int(*value),
        GuestValue::Float(value) => Dynamic::from_float(*value),
        GuestValue::Str(value) => Dynamic::from(value.clone()),
        GuestValue::Seq(values) => {
            Dynamic::from_array(values.iter().map(guest_to_dynamic).collect::<Array>())
        }
        GuestValue::Map(values) => {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.as_str().into(), guest_to_dynamic(value));
            }
            Dynamic::from_map(map)
        }
        GuestValue::Object(object) => object.as_dynamic().clone(),
    }
}

pub(crate) fn dynamic_to_guest(value: Dynamic) -> GuestValue {
    let value = value.flatten();
    if value.is_unit() {
        return GuestValue::Unit;
    }
    if value.is::<bool>() {
        return GuestValue::Bool(value.cast::<bool>());
    }
    if value.is::<INT>() {
        return GuestValue::Int(value.cast::<INT>());
    }
    if value.is::<FLOAT>() {
        return GuestValue::Float(value.cast::<FLOAT>());
    }
    if value.is::<ImmutableString>() {
        return GuestValue::Str(value.cast::<ImmutableString>().to_string());
    }
    if value.is::<char>() {
        return GuestValue::Str(value.cast::<char>().to_string());
    }
    if value.is::<Array>() {
        return GuestValue::Seq(
            value
                .cast::<Array>()
                .into_iter()
                .map(dynamic_to_guest)
                .collect(),
        );
    }
    if value.is::<Blob>() {
        return GuestValue::Seq(
            value
                .cast::<Blob>()
                .into_iter()
                .map(|byte| GuestValue::Int(i64::from(byte)))
                .collect(),
        );
    }
    if value.is::<Map>() {
        let mut out = BTreeMap::new();
        for (key, value) in value.cast::<Map>() {
            out.insert(key.to_string(), dynamic_to_guest(value));
        }
        return GuestValue::Map(out);
    }

    GuestValue::Object(HostObject::from_dynamic(value))
}

pub(crate) fn location_of(position: Position) -> Option<SourceLocation> {
    position.line().map(|line| SourceLocation {
        line,
        column: position.position().unwrap_or(0),
    })
}

pub(crate) fn syntax_error(label: &str, error: &ParseError) -> BridgeError {
    BridgeError::Syntax {
        label: label.to_string(),
        location: location_of(error.position()).unwrap_or(SourceLocation { line: 0, column: 0 }),
        message: error.err_type().to_string(),
    }
}

/// Translates a guest fault raised while running `entry` from the unit labelled `label`.
pub(crate) fn runtime_error(label: &str, entry: &str, error: &EvalAltResult) -> BridgeError {
    let (trace, innermost) = collect_trace(label, entry, error);
    BridgeError::Runtime {
        label: label.to_string(),
        message: fault_message(innermost),
        trace,
    }
}

/// Like [`runtime_error`], but an unresolvable call at the host boundary
/// (unknown name, wrong arity, wrong argument types) becomes a call error.
pub(crate) fn call_error(label: &str, function: &str, error: &EvalAltResult) -> BridgeError {
    match error {
        EvalAltResult::ErrorFunctionNotFound(signature, _) => BridgeError::Call {
            function: function.to_string(),
            message: format!("no function matches {}", signature),
        },
        _ => runtime_error(label, function, error),
    }
}

fn collect_trace<'a>(
    label: &str,
    entry: &str,
    error: &'a EvalAltResult,
) -> (Vec<TraceFrame>, &'a EvalAltResult) {
    let mut frames = Vec::new();
    let mut current = error;

    loop {
        match current {
            EvalAltResult::ErrorInFunctionCall(function, source, inner, _) => {
                frames.push(TraceFrame {
                    function: function.clone(),
                    source: if source.is_empty() {
                        label.to_string()
                    } else {
                        source.clone()
                    },
                    location: location_of(inner.position()),
                });
                current = inner;
            }
            EvalAltResult::ErrorInModule(module, inner, _) => {
                frames.push(TraceFrame {
                    function: format!("<module {}>", module),
                    source: module.clone(),
                    location: location_of(inner.position()),
                });
                current = inner;
            }
            _ => break,
        }
    }

    if frames.first().map_or(true, |frame| frame.function != entry) {
        let location = if frames.is_empty() {
            location_of(current.position())
        } else {
            location_of(error.position())
        };
        frames.insert(
            0,
            TraceFrame {
                function: entry.to_string(),
                source: label.to_string(),
                location,
            },
        );
    }

    (frames, current)
}

fn fault_message(error: &EvalAltResult) -> String {
    match error {
        EvalAltResult::ErrorRuntime(value, _) => value.to_string(),
        _ => error.to_string(),
    }
}

pub(crate) fn guest_fault(message: impl Into<String>, position: Position) -> Box<EvalAltResult> {
    EvalAltResult::ErrorRuntime(Dynamic::from(message.into()), position).into()
}
