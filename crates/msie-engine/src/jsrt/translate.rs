//! JsRt status translation
//!
//! Every provider call goes through [`check`]. Script-category codes leave a
//! pending exception in the runtime; the translator reads and clears it and
//! builds the [`ScriptError`] from it before anything else can run.

use msie_sys::{ErrorCategory, JsErrorCode, JsRtApi, JsValueRef, JsValueType, Status};

use crate::error::{EngineFault, EngineResult, JsEngineError, ScriptError, ScriptErrorCategory, UsageError};

pub(crate) fn check<T>(api: &dyn JsRtApi, status: Status<T>) -> EngineResult<T> {
    status.map_err(|code| translate(api, code))
}

pub(crate) fn translate(api: &dyn JsRtApi, code: JsErrorCode) -> JsEngineError {
    match code.category() {
        ErrorCategory::Usage => UsageError::from_code(code).into(),
        ErrorCategory::Engine => EngineFault::OutOfMemory.into(),
        ErrorCategory::Fatal => match code {
            JsErrorCode::WrongRuntime => EngineFault::WrongRuntime.into(),
            _ => EngineFault::Fatal.into(),
        },
        ErrorCategory::Script => {
            let category = match code {
                JsErrorCode::ScriptCompile => ScriptErrorCategory::Compile,
                JsErrorCode::ScriptTerminated => ScriptErrorCategory::Terminated,
                JsErrorCode::ScriptEvalDisabled => ScriptErrorCategory::EvalDisabled,
                _ => ScriptErrorCategory::Runtime,
            };
            let error = pending_error(api, category);
            if category == ScriptErrorCategory::Terminated {
                JsEngineError::Terminated(error)
            } else {
                JsEngineError::Script(error)
            }
        }
        ErrorCategory::None => EngineFault::Unexpected(code.raw()).into(),
    }
}

fn default_message(category: ScriptErrorCategory) -> &'static str {
    match category {
        ScriptErrorCategory::Compile => "script failed to compile",
        ScriptErrorCategory::Runtime => "script threw an exception",
        ScriptErrorCategory::Terminated => "script execution was terminated",
        ScriptErrorCategory::EvalDisabled => "eval is disabled",
    }
}

/// Read the runtime's pending exception and clear the latch.
fn pending_error(api: &dyn JsRtApi, category: ScriptErrorCategory) -> ScriptError {
    let exception = match api.get_and_clear_exception() {
        Ok(exception) => exception,
        Err(code) => {
            log::debug!(target: "msie::jsrt", "no pending exception for {:?}: {}", category, code);
            return ScriptError::new(category, default_message(category));
        }
    };

    let reader = ExceptionReader { api, exception };
    let mut error = ScriptError::new(category, default_message(category));
    match api.value_type(exception) {
        Ok(JsValueType::Error) | Ok(JsValueType::Object) => {
            if let Some(message) = reader.text("message") {
                error.message = message;
            } else if let Some(text) = reader.display(exception) {
                error.message = text;
            }
            error.name = reader.text("name");
            error.line = reader.number("line").map(|line| line + 1);
            error.column = reader.number("column").map(|column| column + 1);
            error.source_line = reader.text("source").filter(|line| !line.is_empty());
            error.stack = reader.text("stack");
        }
        Ok(_) => {
            if let Some(text) = reader.display(exception) {
                error.message = text;
            }
        }
        Err(_) => {}
    }

    // Reading the exception may itself have thrown (a throwing getter).
    if category != ScriptErrorCategory::Terminated && api.has_exception() == Ok(true) {
        let _ = api.get_and_clear_exception();
    }
    error
}

struct ExceptionReader<'a> {
    api: &'a dyn JsRtApi,
    exception: JsValueRef,
}

impl ExceptionReader<'_> {
    fn property(&self, name: &str) -> Option<JsValueRef> {
        let id = self.api.property_id_from_name(name).ok()?;
        self.api.get_property(self.exception, id).ok()
    }

    fn display(&self, value: JsValueRef) -> Option<String> {
        let text = self.api.convert_value_to_string(value).ok()?;
        self.api.string_to_pointer(text).ok()
    }

    fn text(&self, name: &str) -> Option<String> {
        let value = self.property(name)?;
        match self.api.value_type(value).ok()? {
            JsValueType::String => self.api.string_to_pointer(value).ok(),
            JsValueType::Undefined | JsValueType::Null => None,
            _ => self.display(value),
        }
    }

    fn number(&self, name: &str) -> Option<u32> {
        let value = self.property(name)?;
        match self.api.value_type(value).ok()? {
            JsValueType::Number => self.api.number_to_double(value).ok().map(|n| n as u32),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use msie_embedded::EmbeddedChakra;
    use msie_sys::{JsRtVariant, JsRuntimeAttributes, JsSourceContext};

    fn current(api: &EmbeddedChakra) {
        let runtime = api.create_runtime(JsRuntimeAttributes::empty()).unwrap();
        let context = api.create_context(runtime).unwrap();
        api.context_add_ref(context).unwrap();
        api.set_current_context(context).unwrap();
    }

    #[test]
    fn test_thrown_error_details() {
        let api = EmbeddedChakra::new(JsRtVariant::Edge);
        current(&api);
        let status = api.run_script("throw new RangeError('too far')", JsSourceContext::NONE, "");
        let err = check(&api, status).unwrap_err();
        let script = err.as_script_error().unwrap();
        assert_eq!(script.category, ScriptErrorCategory::Runtime);
        assert_eq!(script.message, "too far");
        assert_eq!(script.name.as_deref(), Some("RangeError"));
        assert_eq!(api.has_exception(), Ok(false));
    }

    #[test]
    fn test_thrown_primitive() {
        let api = EmbeddedChakra::new(JsRtVariant::Ie);
        current(&api);
        let status = api.run_script("throw 42", JsSourceContext::NONE, "");
        let err = check(&api, status).unwrap_err();
        assert_eq!(err.as_script_error().unwrap().message, "42");
    }

    #[test]
    fn test_usage_and_fatal_codes() {
        let api = EmbeddedChakra::new(JsRtVariant::Edge);
        assert!(matches!(
            translate(&api, JsErrorCode::NoCurrentContext),
            JsEngineError::Usage(UsageError::NoCurrentContext)
        ));
        assert!(matches!(translate(&api, JsErrorCode::Fatal), JsEngineError::Fault(EngineFault::Fatal)));
        assert!(matches!(
            translate(&api, JsErrorCode::OutOfMemory),
            JsEngineError::Fault(EngineFault::OutOfMemory)
        ));
    }
}
