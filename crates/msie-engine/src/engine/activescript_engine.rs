//! ActiveScript backend

use std::rc::Rc;
use std::sync::Arc;

use msie_sys::activescript::{ActiveScript, Variant};
use msie_sys::RuntimeInterrupt;

use super::host_value::HostValue;
use super::inner::{InnerJsEngine, PrecompiledScript};
use super::mode::JsEngineMode;
use crate::activescript::ActiveScriptSession;
use crate::error::{EngineResult, JsEngineError, NotSupportedTypeError, ScriptError, ScriptErrorCategory, UsageError};

pub(crate) struct ChakraActiveScriptJsEngine {
    session: ActiveScriptSession,
}

impl ChakraActiveScriptJsEngine {
    pub(crate) fn new(engine: Rc<dyn ActiveScript>) -> EngineResult<Self> {
        Ok(Self {
            session: ActiveScriptSession::start(engine)?,
        })
    }
}

fn to_host(value: Variant) -> EngineResult<HostValue> {
    Ok(match value {
        Variant::Empty => HostValue::Undefined,
        Variant::Null => HostValue::Null,
        Variant::Bool(value) => HostValue::Bool(value),
        Variant::I4(value) => HostValue::Int(value),
        Variant::R8(value) => HostValue::from_number(value),
        Variant::Bstr(value) => HostValue::String(value),
        Variant::Dispatch(_) => return Err(NotSupportedTypeError::new("object").into()),
    })
}

fn to_variant(value: &HostValue) -> Variant {
    match value {
        HostValue::Undefined => Variant::Empty,
        HostValue::Null => Variant::Null,
        HostValue::Bool(value) => Variant::Bool(*value),
        HostValue::Int(value) => Variant::I4(*value),
        HostValue::Double(value) => Variant::R8(*value),
        HostValue::String(value) => Variant::Bstr(value.clone()),
    }
}

impl InnerJsEngine for ChakraActiveScriptJsEngine {
    fn mode(&self) -> JsEngineMode {
        JsEngineMode::ChakraActiveScript
    }

    fn evaluate(&self, expression: &str, _document_name: &str) -> EngineResult<HostValue> {
        to_host(self.session.evaluate(expression)?)
    }

    fn execute(&self, code: &str, _document_name: &str) -> EngineResult<()> {
        self.session.execute(code)
    }

    fn precompile(&self, _code: &str, _document_name: &str) -> EngineResult<PrecompiledScript> {
        Err(UsageError::NotSupportedByBackend("script precompilation").into())
    }

    fn execute_precompiled(&self, _script: &PrecompiledScript) -> EngineResult<()> {
        Err(UsageError::NotSupportedByBackend("script precompilation").into())
    }

    fn call_function(&self, name: &str, args: &[HostValue]) -> EngineResult<HostValue> {
        let args = args.iter().map(to_variant).collect::<Vec<_>>();
        match self.session.call(name, &args)? {
            Some(result) => to_host(result),
            None => {
                let mut error = ScriptError::new(ScriptErrorCategory::Runtime, format!("'{}' is undefined", name));
                error.name = Some("TypeError".to_string());
                Err(JsEngineError::Script(error))
            }
        }
    }

    fn has_variable(&self, name: &str) -> EngineResult<bool> {
        Ok(!matches!(self.session.get(name)?, None | Some(Variant::Empty)))
    }

    fn get_variable_value(&self, name: &str) -> EngineResult<HostValue> {
        match self.session.get(name)? {
            Some(value) => to_host(value),
            None => Ok(HostValue::Undefined),
        }
    }

    fn set_variable_value(&self, name: &str, value: &HostValue) -> EngineResult<()> {
        self.session.set(name, to_variant(value))
    }

    fn remove_variable(&self, name: &str) -> EngineResult<()> {
        if self.session.dispid(name, false)?.is_none() {
            return Ok(());
        }
        if !self.session.delete(name)? {
            self.session.set(name, Variant::Empty)?;
        }
        Ok(())
    }

    fn collect_garbage(&self) -> EngineResult<()> {
        self.session.collect_garbage()
    }

    fn interrupt_handle(&self) -> EngineResult<Option<Arc<dyn RuntimeInterrupt>>> {
        // The engine is not thread-safe, so it cannot be reached from another thread.
        Ok(None)
    }
}
