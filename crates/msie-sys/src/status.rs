//! JsRt status codes
//!
//! Every JsRt entry point returns a `JsErrorCode`. Codes are grouped in
//! categories by their high word; the category decides how the binding layer
//! reacts (usage bug, engine fault, pending script exception, fatal).

use std::fmt;

/// Result of a provider call: the value on `JsNoError`, the code otherwise.
pub type Status<T> = Result<T, JsErrorCode>;

/// Status code returned by a JsRt entry point.
#[repr(u32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum JsErrorCode {
    NoError = 0,

    CategoryUsage = 0x10000,
    InvalidArgument = 0x10001,
    NullArgument = 0x10002,
    NoCurrentContext = 0x10003,
    InExceptionState = 0x10004,
    NotImplemented = 0x10005,
    WrongThread = 0x10006,
    RuntimeInUse = 0x10007,
    BadSerializedScript = 0x10008,
    InDisabledState = 0x10009,
    CannotDisableExecution = 0x1000A,
    HeapEnumInProgress = 0x1000B,
    ArgumentNotObject = 0x1000C,
    InProfileCallback = 0x1000D,
    InThreadServiceCallback = 0x1000E,
    CannotSerializeDebugScript = 0x1000F,
    AlreadyDebuggingContext = 0x10010,
    AlreadyProfilingContext = 0x10011,
    IdleNotEnabled = 0x10012,
    CannotSetProjectionEnqueueCallback = 0x10013,
    CannotStartProjection = 0x10014,
    InObjectBeforeCollectCallback = 0x10015,
    ObjectNotInspectable = 0x10016,
    PropertyNotSymbol = 0x10017,
    PropertyNotString = 0x10018,

    CategoryEngine = 0x20000,
    OutOfMemory = 0x20001,

    CategoryScript = 0x30000,
    ScriptException = 0x30001,
    ScriptCompile = 0x30002,
    ScriptTerminated = 0x30003,
    ScriptEvalDisabled = 0x30004,

    CategoryFatal = 0x40000,
    Fatal = 0x40001,
    WrongRuntime = 0x40002,
}

/// Coarse grouping of a status code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// Success
    None,
    /// The host called the API incorrectly
    Usage,
    /// The engine ran out of a resource
    Engine,
    /// A script raised, failed to compile, or was terminated
    Script,
    /// The engine is unusable
    Fatal,
}

const KNOWN: &[JsErrorCode] = &[
    JsErrorCode::NoError,
    JsErrorCode::CategoryUsage,
    JsErrorCode::InvalidArgument,
    JsErrorCode::NullArgument,
    JsErrorCode::NoCurrentContext,
    JsErrorCode::InExceptionState,
    JsErrorCode::NotImplemented,
    JsErrorCode::WrongThread,
    JsErrorCode::RuntimeInUse,
    JsErrorCode::BadSerializedScript,
    JsErrorCode::InDisabledState,
    JsErrorCode::CannotDisableExecution,
    JsErrorCode::HeapEnumInProgress,
    JsErrorCode::ArgumentNotObject,
    JsErrorCode::InProfileCallback,
    JsErrorCode::InThreadServiceCallback,
    JsErrorCode::CannotSerializeDebugScript,
    JsErrorCode::AlreadyDebuggingContext,
    JsErrorCode::AlreadyProfilingContext,
    JsErrorCode::IdleNotEnabled,
    JsErrorCode::CannotSetProjectionEnqueueCallback,
    JsErrorCode::CannotStartProjection,
    JsErrorCode::InObjectBeforeCollectCallback,
    JsErrorCode::ObjectNotInspectable,
    JsErrorCode::PropertyNotSymbol,
    JsErrorCode::PropertyNotString,
    JsErrorCode::CategoryEngine,
    JsErrorCode::OutOfMemory,
    JsErrorCode::CategoryScript,
    JsErrorCode::ScriptException,
    JsErrorCode::ScriptCompile,
    JsErrorCode::ScriptTerminated,
    JsErrorCode::ScriptEvalDisabled,
    JsErrorCode::CategoryFatal,
    JsErrorCode::Fatal,
    JsErrorCode::WrongRuntime,
];

impl JsErrorCode {
    /// Map a raw code returned across the ABI.
    ///
    /// Unknown codes collapse to their category code; codes outside every
    /// category become `Fatal`.
    pub fn from_raw(raw: u32) -> Self {
        if let Some(code) = KNOWN.iter().copied().find(|code| *code as u32 == raw) {
            return code;
        }
        match raw & 0xFFFF_0000 {
            0x10000 => JsErrorCode::CategoryUsage,
            0x20000 => JsErrorCode::CategoryEngine,
            0x30000 => JsErrorCode::CategoryScript,
            _ => JsErrorCode::Fatal,
        }
    }

    /// Numeric value of the code.
    pub fn raw(self) -> u32 {
        self as u32
    }

    /// Category of the code.
    pub fn category(self) -> ErrorCategory {
        match self.raw() & 0xFFFF_0000 {
            0 => ErrorCategory::None,
            0x10000 => ErrorCategory::Usage,
            0x20000 => ErrorCategory::Engine,
            0x30000 => ErrorCategory::Script,
            _ => ErrorCategory::Fatal,
        }
    }

    /// Convert a raw call result into a `Status`.
    pub fn check(raw: u32) -> Status<()> {
        match Self::from_raw(raw) {
            JsErrorCode::NoError => Ok(()),
            code => Err(code),
        }
    }

    /// True for the codes that leave a pending exception in the runtime.
    pub fn carries_exception(self) -> bool {
        matches!(
            self,
            JsErrorCode::ScriptException
                | JsErrorCode::ScriptCompile
                | JsErrorCode::ScriptTerminated
                | JsErrorCode::ScriptEvalDisabled
        )
    }
}

impl fmt::Display for JsErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?} (0x{:05X})", self, self.raw())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_codes_roundtrip() {
        for code in KNOWN {
            assert_eq!(JsErrorCode::from_raw(code.raw()), *code);
        }
    }

    #[test]
    fn test_unknown_codes_collapse_to_category() {
        assert_eq!(JsErrorCode::from_raw(0x100FF), JsErrorCode::CategoryUsage);
        assert_eq!(JsErrorCode::from_raw(0x200FF), JsErrorCode::CategoryEngine);
        assert_eq!(JsErrorCode::from_raw(0x300FF), JsErrorCode::CategoryScript);
        assert_eq!(JsErrorCode::from_raw(0x7777_0000), JsErrorCode::Fatal);
    }

    #[test]
    fn test_categories() {
        assert_eq!(JsErrorCode::NoError.category(), ErrorCategory::None);
        assert_eq!(JsErrorCode::HeapEnumInProgress.category(), ErrorCategory::Usage);
        assert_eq!(JsErrorCode::OutOfMemory.category(), ErrorCategory::Engine);
        assert_eq!(JsErrorCode::ScriptCompile.category(), ErrorCategory::Script);
        assert_eq!(JsErrorCode::WrongRuntime.category(), ErrorCategory::Fatal);
    }

    #[test]
    fn test_check() {
        assert!(JsErrorCode::check(0).is_ok());
        assert_eq!(JsErrorCode::check(0x10003), Err(JsErrorCode::NoCurrentContext));
    }

    #[test]
    fn test_exception_carrying_codes() {
        assert!(JsErrorCode::ScriptException.carries_exception());
        assert!(JsErrorCode::ScriptTerminated.carries_exception());
        assert!(!JsErrorCode::OutOfMemory.carries_exception());
        assert!(!JsErrorCode::InExceptionState.carries_exception());
    }
}
