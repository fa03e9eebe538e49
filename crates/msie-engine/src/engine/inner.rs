//! Contract shared by the engine backends

use std::sync::Arc;

use msie_sys::RuntimeInterrupt;

use super::host_value::HostValue;
use super::mode::JsEngineMode;
use crate::error::EngineResult;

/// A script compiled ahead of time by one engine mode.
///
/// The source travels with the buffer: JsRt needs it to rebuild the script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PrecompiledScript {
    mode: JsEngineMode,
    source: String,
    document_name: String,
    buffer: Vec<u8>,
}

impl PrecompiledScript {
    pub fn from_parts(mode: JsEngineMode, source: String, document_name: String, buffer: Vec<u8>) -> Self {
        Self {
            mode,
            source,
            document_name,
            buffer,
        }
    }

    pub fn mode(&self) -> JsEngineMode {
        self.mode
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn document_name(&self) -> &str {
        &self.document_name
    }

    pub fn buffer(&self) -> &[u8] {
        &self.buffer
    }
}

/// One backend behind [`MsieJsEngine`](super::MsieJsEngine).
///
/// Names and sources reaching a backend are already validated.
pub(crate) trait InnerJsEngine {
    fn mode(&self) -> JsEngineMode;

    fn evaluate(&self, expression: &str, document_name: &str) -> EngineResult<HostValue>;

    fn execute(&self, code: &str, document_name: &str) -> EngineResult<()>;

    fn precompile(&self, code: &str, document_name: &str) -> EngineResult<PrecompiledScript>;

    fn execute_precompiled(&self, script: &PrecompiledScript) -> EngineResult<()>;

    fn call_function(&self, name: &str, args: &[HostValue]) -> EngineResult<HostValue>;

    fn has_variable(&self, name: &str) -> EngineResult<bool>;

    fn get_variable_value(&self, name: &str) -> EngineResult<HostValue>;

    fn set_variable_value(&self, name: &str, value: &HostValue) -> EngineResult<()>;

    fn remove_variable(&self, name: &str) -> EngineResult<()>;

    fn collect_garbage(&self) -> EngineResult<()>;

    /// `None` when the backend cannot be interrupted from another thread.
    fn interrupt_handle(&self) -> EngineResult<Option<Arc<dyn RuntimeInterrupt>>>;
}
