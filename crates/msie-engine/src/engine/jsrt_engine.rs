//! JsRt backend (IE and Edge)

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;

use msie_sys::{JsRtApi, JsRtVariant, JsRuntimeAttributes, JsSourceContext, JsValueType, RuntimeInterrupt};

use super::host_value::HostValue;
use super::inner::{InnerJsEngine, PrecompiledScript};
use super::mode::JsEngineMode;
use crate::error::{
    EngineResult, JsEngineError, NotSupportedTypeError, ScriptError, ScriptErrorCategory, UsageError,
};
use crate::jsrt::{CurrentContext, JsContext, JsRtFlavor, JsRuntime, JsValue};

/// Facade backend over one JsRt runtime with a single context.
pub(crate) struct ChakraJsRtJsEngine<F: JsRtFlavor> {
    // Released before the runtime is disposed.
    context: JsContext<F>,
    runtime: JsRuntime<F>,
    next_source_context: Cell<usize>,
}

impl<F: JsRtFlavor> ChakraJsRtJsEngine<F> {
    pub(crate) fn new(api: Rc<dyn JsRtApi>, attributes: JsRuntimeAttributes) -> EngineResult<Self> {
        let runtime = JsRuntime::<F>::new(api, attributes)?;
        let context = runtime.create_context()?;
        Ok(Self {
            context,
            runtime,
            next_source_context: Cell::new(0),
        })
    }

    fn source_context(&self) -> JsSourceContext {
        let cookie = self.next_source_context.get();
        self.next_source_context.set(cookie.wrapping_add(1) % JsSourceContext::NONE.0);
        JsSourceContext(cookie)
    }

    /// Run `f` with the engine's context current.
    ///
    /// An interrupt terminates the run it lands in, or the next one when no
    /// script was running. Either way the runtime is re-enabled afterwards.
    fn with_context<T>(&self, f: impl FnOnce(&CurrentContext<'_, F>) -> EngineResult<T>) -> EngineResult<T> {
        let result = {
            let scope = self.context.enter()?;
            f(&scope)
        };
        match result {
            Err(JsEngineError::Usage(UsageError::InDisabledState)) => {
                self.reenable();
                Err(JsEngineError::Terminated(ScriptError::new(
                    ScriptErrorCategory::Terminated,
                    "script execution was interrupted",
                )))
            }
            Err(JsEngineError::Terminated(error)) => {
                self.reenable();
                Err(JsEngineError::Terminated(error))
            }
            other => other,
        }
    }

    fn reenable(&self) {
        if let Err(err) = self.runtime.enable_execution() {
            log::warn!(target: "msie::engine", "failed to re-enable {} runtime: {}", F::VARIANT, err);
        }
    }
}

fn type_name(value_type: JsValueType) -> &'static str {
    match value_type {
        JsValueType::Undefined => "undefined",
        JsValueType::Null => "null",
        JsValueType::Number => "number",
        JsValueType::String => "string",
        JsValueType::Boolean => "boolean",
        JsValueType::Object => "object",
        JsValueType::Function => "function",
        JsValueType::Error => "error",
        JsValueType::Array => "array",
        JsValueType::Symbol => "symbol",
        JsValueType::ArrayBuffer => "ArrayBuffer",
        JsValueType::TypedArray => "typed array",
        JsValueType::DataView => "DataView",
    }
}

fn to_host<F: JsRtFlavor>(scope: &CurrentContext<'_, F>, value: JsValue) -> EngineResult<HostValue> {
    Ok(match scope.value_type(value)? {
        JsValueType::Undefined => HostValue::Undefined,
        JsValueType::Null => HostValue::Null,
        JsValueType::Boolean => HostValue::Bool(scope.to_bool(value)?),
        JsValueType::Number => HostValue::from_number(scope.to_f64(value)?),
        JsValueType::String => HostValue::String(scope.to_string_contents(value)?),
        other => return Err(NotSupportedTypeError::new(type_name(other)).into()),
    })
}

fn from_host<F: JsRtFlavor>(scope: &CurrentContext<'_, F>, value: &HostValue) -> EngineResult<JsValue> {
    match value {
        HostValue::Undefined => scope.undefined(),
        HostValue::Null => scope.null(),
        HostValue::Bool(value) => scope.boolean(*value),
        HostValue::Int(value) => scope.int(*value),
        HostValue::Double(value) => scope.number(*value),
        HostValue::String(value) => scope.string(value),
    }
}

impl<F: JsRtFlavor> InnerJsEngine for ChakraJsRtJsEngine<F> {
    fn mode(&self) -> JsEngineMode {
        match F::VARIANT {
            JsRtVariant::Ie => JsEngineMode::ChakraIeJsRt,
            JsRtVariant::Edge => JsEngineMode::ChakraEdgeJsRt,
        }
    }

    fn evaluate(&self, expression: &str, document_name: &str) -> EngineResult<HostValue> {
        let source_context = self.source_context();
        self.with_context(|scope| {
            let value = scope.run_script(expression, source_context, document_name)?;
            to_host(scope, value)
        })
    }

    fn execute(&self, code: &str, document_name: &str) -> EngineResult<()> {
        let source_context = self.source_context();
        self.with_context(|scope| scope.run_script(code, source_context, document_name).map(|_| ()))
    }

    fn precompile(&self, code: &str, document_name: &str) -> EngineResult<PrecompiledScript> {
        let buffer = self.with_context(|scope| scope.serialize_script(code))?;
        Ok(PrecompiledScript::from_parts(
            self.mode(),
            code.to_string(),
            document_name.to_string(),
            buffer,
        ))
    }

    fn execute_precompiled(&self, script: &PrecompiledScript) -> EngineResult<()> {
        if script.mode() != self.mode() {
            return Err(UsageError::PrecompiledMismatch(script.mode().to_string()).into());
        }
        let source_context = self.source_context();
        self.with_context(|scope| {
            scope
                .run_serialized(script.source(), script.buffer(), source_context, script.document_name())
                .map(|_| ())
        })
    }

    fn call_function(&self, name: &str, args: &[HostValue]) -> EngineResult<HostValue> {
        self.with_context(|scope| {
            let global = scope.global_object()?;
            let id = scope.property_id(name)?;
            let function = scope.get_property(global, &id)?;
            if scope.value_type(function)? != JsValueType::Function {
                let mut error = ScriptError::new(ScriptErrorCategory::Runtime, format!("'{}' is not a function", name));
                error.name = Some("TypeError".to_string());
                return Err(JsEngineError::Script(error));
            }
            let arguments = args
                .iter()
                .map(|arg| from_host(scope, arg))
                .collect::<EngineResult<Vec<_>>>()?;
            let result = scope.call_function(function, global, &arguments)?;
            to_host(scope, result)
        })
    }

    fn has_variable(&self, name: &str) -> EngineResult<bool> {
        self.with_context(|scope| {
            let global = scope.global_object()?;
            let id = scope.property_id(name)?;
            if !scope.has_property(global, &id)? {
                return Ok(false);
            }
            let value = scope.get_property(global, &id)?;
            Ok(scope.value_type(value)? != JsValueType::Undefined)
        })
    }

    fn get_variable_value(&self, name: &str) -> EngineResult<HostValue> {
        self.with_context(|scope| {
            let global = scope.global_object()?;
            let id = scope.property_id(name)?;
            let value = scope.get_property(global, &id)?;
            to_host(scope, value)
        })
    }

    fn set_variable_value(&self, name: &str, value: &HostValue) -> EngineResult<()> {
        self.with_context(|scope| {
            let global = scope.global_object()?;
            let id = scope.property_id(name)?;
            let value = from_host(scope, value)?;
            scope.set_property(global, &id, value)
        })
    }

    fn remove_variable(&self, name: &str) -> EngineResult<()> {
        self.with_context(|scope| {
            let global = scope.global_object()?;
            let id = scope.property_id(name)?;
            if !scope.delete_property(global, &id)? {
                let undefined = scope.undefined()?;
                scope.set_property(global, &id, undefined)?;
            }
            Ok(())
        })
    }

    fn collect_garbage(&self) -> EngineResult<()> {
        self.runtime.collect_garbage()
    }

    fn interrupt_handle(&self) -> EngineResult<Option<Arc<dyn RuntimeInterrupt>>> {
        if !self.runtime.attributes().contains(JsRuntimeAttributes::ALLOW_SCRIPT_INTERRUPT) {
            return Ok(None);
        }
        self.runtime.interrupt_handle().map(Some)
    }
}
