//! HRESULT translation

use msie_sys::activescript::{HResult, ScriptErrorInfo};

use super::site::HostSite;
use crate::error::{EngineFault, JsEngineError, NotSupportedTypeError, ScriptError, ScriptErrorCategory, UsageError};

pub(crate) fn check<T>(site: &HostSite, result: Result<T, HResult>) -> Result<T, JsEngineError> {
    result.map_err(|hr| translate(site, hr))
}

pub(crate) fn translate(site: &HostSite, hr: HResult) -> JsEngineError {
    match hr {
        HResult::SCRIPT_E_REPORTED | HResult::DISP_E_EXCEPTION | HResult::SCRIPT_E_PROPAGATE => {
            let error = match site.take_error() {
                Some(info) => script_error(&info),
                None => ScriptError::new(ScriptErrorCategory::Runtime, format!("script failed with {:?}", hr)),
            };
            JsEngineError::Script(error)
        }
        HResult::E_OUTOFMEMORY | HResult::JSCRIPT_E_OUTOFMEMORY => EngineFault::OutOfMemory.into(),
        HResult::JSCRIPT_E_OUTOFSTACK => EngineFault::StackOverflow.into(),
        HResult::E_ABORT => JsEngineError::Terminated(ScriptError::new(
            ScriptErrorCategory::Terminated,
            "script execution was interrupted",
        )),
        HResult::E_INVALIDARG | HResult::DISP_E_BADPARAMCOUNT | HResult::DISP_E_UNKNOWNNAME | HResult::DISP_E_MEMBERNOTFOUND => {
            UsageError::InvalidArgument.into()
        }
        HResult::E_POINTER => UsageError::NullArgument.into(),
        HResult::E_NOTIMPL => UsageError::NotImplemented.into(),
        HResult::E_UNEXPECTED => UsageError::WrongState.into(),
        HResult::DISP_E_TYPEMISMATCH => NotSupportedTypeError::new("unknown").into(),
        other => EngineFault::Unexpected(other.as_u32()).into(),
    }
}

/// Build the host error from what the engine reported to the site.
pub(crate) fn script_error(info: &ScriptErrorInfo) -> ScriptError {
    let category = if info.source.contains("compilation") {
        ScriptErrorCategory::Compile
    } else {
        ScriptErrorCategory::Runtime
    };
    ScriptError {
        category,
        name: info.name.clone(),
        message: info.description.clone(),
        line: Some(info.line + 1),
        column: Some(info.column + 1),
        source_line: info.source_line.clone(),
        stack: None,
    }
}
