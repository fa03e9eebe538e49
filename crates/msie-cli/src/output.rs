//! Colored and JSON output for command results
//!
//! Respects the `NO_COLOR` environment variable and the `--color` flag.

use std::io::Write;

use msie_engine::{HostValue, JsEngineError, ScriptError};
use serde_json::{json, Value};
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

/// Resolve `ColorChoice` from the CLI flag and environment.
///
/// Priority: `NO_COLOR` env > `--color` flag > auto-detect TTY.
pub fn resolve_color_choice(flag: Option<&str>) -> ColorChoice {
    if std::env::var_os("NO_COLOR").is_some() {
        return ColorChoice::Never;
    }
    match flag {
        Some("always") => ColorChoice::Always,
        Some("never") => ColorChoice::Never,
        _ => ColorChoice::Auto,
    }
}

/// JSON form of a value: its type name plus the value itself.
///
/// `undefined` has no JSON counterpart and is written as `null`; the type
/// name tells the two apart. Non-finite doubles become their string form.
pub fn value_to_json(value: &HostValue) -> Value {
    let inner = match value {
        HostValue::Undefined | HostValue::Null => Value::Null,
        HostValue::Bool(value) => Value::Bool(*value),
        HostValue::Int(value) => json!(value),
        HostValue::Double(value) => serde_json::Number::from_f64(*value)
            .map(Value::Number)
            .unwrap_or_else(|| Value::String(value.to_string())),
        HostValue::String(value) => Value::String(value.clone()),
    };
    json!({ "type": value.type_name(), "value": inner })
}

pub fn script_error_to_json(error: &ScriptError) -> Value {
    json!({
        "category": format!("{:?}", error.category).to_lowercase(),
        "name": error.name,
        "message": error.message,
        "line": error.line,
        "column": error.column,
        "source": error.source_line,
    })
}

pub struct StyledOutput {
    stdout: StandardStream,
    stderr: StandardStream,
}

impl StyledOutput {
    pub fn new(choice: ColorChoice) -> Self {
        Self {
            stdout: StandardStream::stdout(choice),
            stderr: StandardStream::stderr(choice),
        }
    }

    fn write_label(stream: &mut StandardStream, text: &str, color: Color) {
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color)).set_bold(true);
        let _ = stream.set_color(&spec);
        let _ = write!(stream, "{}", text);
        let _ = stream.reset();
    }

    /// Print an evaluation result to stdout.
    pub fn value(&mut self, value: &HostValue, as_json: bool) {
        if as_json {
            let _ = writeln!(self.stdout, "{}", value_to_json(value));
            return;
        }
        let color = match value {
            HostValue::Undefined | HostValue::Null => Color::White,
            HostValue::Bool(_) => Color::Yellow,
            HostValue::Int(_) | HostValue::Double(_) => Color::Cyan,
            HostValue::String(_) => Color::Green,
        };
        let mut spec = ColorSpec::new();
        spec.set_fg(Some(color));
        let _ = self.stdout.set_color(&spec);
        let _ = writeln!(self.stdout, "{}", value);
        let _ = self.stdout.reset();
    }

    /// Green status line on stderr, so stdout stays machine-readable.
    pub fn success(&mut self, text: &str) {
        Self::write_label(&mut self.stderr, "ok", Color::Green);
        let _ = writeln!(self.stderr, ": {}", text);
    }

    /// Report a failed command on stderr, or as JSON on stdout.
    pub fn report_error(&mut self, err: &anyhow::Error, as_json: bool) {
        let script = err
            .downcast_ref::<JsEngineError>()
            .and_then(JsEngineError::as_script_error);

        if as_json {
            let error = match script {
                Some(script) => script_error_to_json(script),
                None => json!({ "message": format!("{:#}", err) }),
            };
            let _ = writeln!(self.stdout, "{}", json!({ "error": error }));
            return;
        }

        Self::write_label(&mut self.stderr, "error", Color::Red);
        let _ = writeln!(self.stderr, ": {:#}", err);
        if let Some(source_line) = script.and_then(|script| script.source_line.as_deref()) {
            let _ = writeln!(self.stderr, "  | {}", source_line);
            if let Some(column) = script.and_then(|script| script.column) {
                let pad = " ".repeat(column.saturating_sub(1) as usize);
                let _ = writeln!(self.stderr, "  | {}^", pad);
            }
        }
        if let Some(stack) = script.and_then(|script| script.stack.as_deref()) {
            let _ = writeln!(self.stderr, "{}", stack);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msie_engine::ScriptErrorCategory;

    #[test]
    fn test_value_json() {
        assert_eq!(value_to_json(&HostValue::Int(36)), json!({ "type": "int", "value": 36 }));
        assert_eq!(
            value_to_json(&HostValue::String("ab".to_string())),
            json!({ "type": "string", "value": "ab" })
        );
        assert_eq!(value_to_json(&HostValue::Undefined)["value"], Value::Null);
        assert_eq!(value_to_json(&HostValue::Double(f64::NAN))["value"], json!("NaN"));
    }

    #[test]
    fn test_script_error_json() {
        let mut error = ScriptError::new(ScriptErrorCategory::Compile, "Unexpected token");
        error.line = Some(1);
        let value = script_error_to_json(&error);
        assert_eq!(value["category"], json!("compile"));
        assert_eq!(value["line"], json!(1));
        assert_eq!(value["column"], Value::Null);
    }
}
