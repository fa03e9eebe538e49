//! Value classification and failure mapping between boa and the native surfaces

use boa_engine::error::JsNativeErrorKind;
use boa_engine::property::PropertyKey;
use boa_engine::{Context, JsError, JsString, JsValue, Source};
use msie_sys::{JsRtVariant, JsValueType};
use once_cell::sync::Lazy;
use regex::Regex;

/// Message of the `EvalError` raised when `eval` is disabled.
pub(crate) const EVAL_DISABLED_MESSAGE: &str = "eval is disabled in this runtime";

/// Message of the error left behind by a terminated script.
pub(crate) const TERMINATED_MESSAGE: &str = "Script execution was terminated";

const DISABLE_EVAL_PRELUDE: &str = r#"(function (global) {
    var message = "eval is disabled in this runtime";
    Object.defineProperty(global, "eval", {
        value: function eval() { throw new EvalError(message); },
        writable: true,
        configurable: true
    });
})(this);"#;

static POSITION: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"line (\d+), col(?:umn)? (\d+)").expect("position pattern is valid"));

pub(crate) fn key(name: &str) -> PropertyKey {
    PropertyKey::from(JsString::from(name))
}

pub(crate) fn string_value(text: &str) -> JsValue {
    JsValue::from(JsString::from(text))
}

pub(crate) fn disable_eval(engine: &mut Context) {
    if let Err(err) = engine.eval(Source::from_bytes(DISABLE_EVAL_PRELUDE)) {
        log::warn!(target: "msie::embedded", "failed to disable eval: {}", err);
    }
}

fn is_error(value: &JsValue, engine: &mut Context) -> bool {
    let constructor = match engine.global_object().get(key("Error"), engine) {
        Ok(constructor) => constructor,
        Err(_) => return false,
    };
    value.instance_of(&constructor, engine).unwrap_or(false)
}

/// Shape of a value as reported by `JsGetValueType`.
pub(crate) fn value_type(value: &JsValue, variant: JsRtVariant, engine: &mut Context) -> JsValueType {
    if value.is_undefined() {
        JsValueType::Undefined
    } else if value.is_null() {
        JsValueType::Null
    } else if value.is_boolean() {
        JsValueType::Boolean
    } else if value.is_number() {
        JsValueType::Number
    } else if value.is_string() {
        JsValueType::String
    } else if value.is_symbol() {
        match variant {
            JsRtVariant::Edge => JsValueType::Symbol,
            JsRtVariant::Ie => JsValueType::Object,
        }
    } else if value.is_callable() {
        JsValueType::Function
    } else if value.as_object().map(|object| object.is_array()).unwrap_or(false) {
        JsValueType::Array
    } else if is_error(value, engine) {
        JsValueType::Error
    } else {
        JsValueType::Object
    }
}

/// Property lookup that never propagates; missing or throwing reads give
/// `undefined`.
pub(crate) fn read_property(value: &JsValue, name: &str, engine: &mut Context) -> JsValue {
    match value.as_object() {
        Some(object) => object.get(key(name), engine).unwrap_or_default(),
        None => JsValue::undefined(),
    }
}

pub(crate) fn display(value: &JsValue, engine: &mut Context) -> String {
    match value.to_string(engine) {
        Ok(text) => text.to_std_string_escaped(),
        Err(_) => String::from("<unprintable exception>"),
    }
}

/// How a failed boa operation surfaces through the native contracts.
pub(crate) enum Failure {
    /// Thrown value
    Exception(JsValue),
    /// Compile error object
    Compile(JsValue),
    /// `eval` called while disabled
    EvalDisabled(JsValue),
    /// Engine limit exceeded; the runtime is no longer usable
    Fatal(String),
}

/// Classify an error raised while running script.
pub(crate) fn runtime_failure(err: JsError, engine: &mut Context) -> Failure {
    if err
        .as_native()
        .map(|native| matches!(native.kind, JsNativeErrorKind::RuntimeLimit))
        .unwrap_or(false)
    {
        return Failure::Fatal(err.to_string());
    }

    let thrown = err.to_opaque(engine);
    let message = read_property(&thrown, "message", engine);
    if message.as_string().map(|m| m.to_std_string_escaped() == EVAL_DISABLED_MESSAGE).unwrap_or(false) {
        Failure::EvalDisabled(thrown)
    } else {
        Failure::Exception(thrown)
    }
}

/// Zero-based position parsed from a parser diagnostic.
pub(crate) fn error_position(message: &str) -> Option<(u32, u32)> {
    let captures = POSITION.captures(message)?;
    let line: u32 = captures.get(1)?.as_str().parse().ok()?;
    let column: u32 = captures.get(2)?.as_str().parse().ok()?;
    Some((line.saturating_sub(1), column.saturating_sub(1)))
}

/// Build the compile error object, annotated the way Chakra annotates them
/// (`line`, `column`, `source`, `url`).
pub(crate) fn compile_failure(err: JsError, source: &str, url: &str, engine: &mut Context) -> Failure {
    let diagnostic = err.to_string();
    let error = err.to_opaque(engine);
    if let Some(object) = error.as_object() {
        if let Some((line, column)) = error_position(&diagnostic) {
            let text = source.lines().nth(line as usize).unwrap_or_default();
            let _ = object.set(key("line"), JsValue::from(line), false, engine);
            let _ = object.set(key("column"), JsValue::from(column), false, engine);
            let _ = object.set(key("source"), string_value(text), false, engine);
        }
        let _ = object.set(key("url"), string_value(url), false, engine);
    }
    Failure::Compile(error)
}

/// Parts of a thrown value a host reports.
#[derive(Debug, Clone, Default)]
pub(crate) struct ErrorDetails {
    pub name: Option<String>,
    pub message: String,
    pub line: u32,
    pub column: u32,
    pub source_line: Option<String>,
}

pub(crate) fn error_details(thrown: &JsValue, engine: &mut Context) -> ErrorDetails {
    if thrown.as_object().is_none() {
        return ErrorDetails {
            message: display(thrown, engine),
            ..ErrorDetails::default()
        };
    }

    let as_text = |value: JsValue| value.as_string().map(|s| s.to_std_string_escaped());
    let as_u32 = |value: JsValue| value.as_number().map(|n| n as u32).unwrap_or(0);

    let message = as_text(read_property(thrown, "message", engine)).unwrap_or_else(|| display(thrown, engine));
    ErrorDetails {
        name: as_text(read_property(thrown, "name", engine)),
        message,
        line: as_u32(read_property(thrown, "line", engine)),
        column: as_u32(read_property(thrown, "column", engine)),
        source_line: as_text(read_property(thrown, "source", engine)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_position() {
        assert_eq!(error_position("unexpected token at line 3, col 7"), Some((2, 6)));
        assert_eq!(error_position("no position here"), None);
    }

    #[test]
    fn test_value_types() {
        let mut engine = Context::default();
        let array = engine.eval(Source::from_bytes("[1, 2]")).unwrap();
        let function = engine.eval(Source::from_bytes("(function () {})")).unwrap();
        let error = engine.eval(Source::from_bytes("new TypeError('x')")).unwrap();
        let symbol = engine.eval(Source::from_bytes("Symbol('s')")).unwrap();

        assert_eq!(value_type(&array, JsRtVariant::Edge, &mut engine), JsValueType::Array);
        assert_eq!(value_type(&function, JsRtVariant::Edge, &mut engine), JsValueType::Function);
        assert_eq!(value_type(&error, JsRtVariant::Edge, &mut engine), JsValueType::Error);
        assert_eq!(value_type(&symbol, JsRtVariant::Edge, &mut engine), JsValueType::Symbol);
        assert_eq!(value_type(&symbol, JsRtVariant::Ie, &mut engine), JsValueType::Object);
        assert_eq!(value_type(&JsValue::from(2.5), JsRtVariant::Ie, &mut engine), JsValueType::Number);
    }

    #[test]
    fn test_eval_disabled_prelude() {
        let mut engine = Context::default();
        disable_eval(&mut engine);
        let err = engine.eval(Source::from_bytes("eval('1 + 1')")).unwrap_err();
        assert!(matches!(runtime_failure(err, &mut engine), Failure::EvalDisabled(_)));
    }

    #[test]
    fn test_error_details_of_thrown_string() {
        let mut engine = Context::default();
        let details = error_details(&string_value("boom"), &mut engine);
        assert_eq!(details.message, "boom");
        assert_eq!(details.name, None);
    }
}
