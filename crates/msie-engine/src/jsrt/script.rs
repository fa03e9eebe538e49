//! Parse / run / serialize pipeline

use msie_sys::JsSourceContext;

use super::context::CurrentContext;
use super::flavor::JsRtFlavor;
use super::translate::check;
use super::value::JsValue;
use crate::error::{EngineResult, UsageError};

impl<F: JsRtFlavor> CurrentContext<'_, F> {
    /// Compile `source` into a callable function without running it.
    pub fn parse_script(&self, source: &str, source_context: JsSourceContext, source_name: &str) -> EngineResult<JsValue> {
        let api = self.api();
        check(api, api.parse_script(source, source_context, source_name)).map(JsValue::from)
    }

    /// Compile and run `source`; the value of its last expression.
    pub fn run_script(&self, source: &str, source_context: JsSourceContext, source_name: &str) -> EngineResult<JsValue> {
        let api = self.api();
        check(api, api.run_script(source, source_context, source_name)).map(JsValue::from)
    }

    /// Bytes `serialize_script` would produce for `source`.
    pub fn serialized_size(&self, source: &str) -> EngineResult<u64> {
        let api = self.api();
        check(api, api.serialize_script(source, &mut []))
    }

    /// Serialize into a caller buffer; the number of bytes written.
    pub fn serialize_into(&self, source: &str, buffer: &mut [u8]) -> EngineResult<usize> {
        let required = self.serialized_size(source)?;
        if (buffer.len() as u64) < required {
            return Err(UsageError::BufferTooSmall {
                required,
                provided: buffer.len(),
            }
            .into());
        }
        let api = self.api();
        let written = check(api, api.serialize_script(source, buffer))?;
        Ok(written as usize)
    }

    /// Serialize `source` into a fresh buffer.
    pub fn serialize_script(&self, source: &str) -> EngineResult<Vec<u8>> {
        let required = self.serialized_size(source)?;
        let mut buffer = vec![0u8; required as usize];
        let written = self.serialize_into(source, &mut buffer)?;
        buffer.truncate(written);
        Ok(buffer)
    }

    /// Rebuild the callable for `source` from a serialized buffer.
    pub fn parse_serialized(
        &self,
        source: &str,
        buffer: &[u8],
        source_context: JsSourceContext,
        source_name: &str,
    ) -> EngineResult<JsValue> {
        let api = self.api();
        check(api, api.parse_serialized_script(source, buffer, source_context, source_name)).map(JsValue::from)
    }

    pub fn run_serialized(
        &self,
        source: &str,
        buffer: &[u8],
        source_context: JsSourceContext,
        source_name: &str,
    ) -> EngineResult<JsValue> {
        let api = self.api();
        check(api, api.run_serialized_script(source, buffer, source_context, source_name)).map(JsValue::from)
    }

    /// `run_script` with no source context or name.
    pub fn evaluate(&self, source: &str) -> EngineResult<JsValue> {
        self.run_script(source, JsSourceContext::NONE, "")
    }
}
