//! Error types of the binding layer and the engine facade

use std::fmt;
use std::io;

use msie_sys::{JsErrorCode, LoadError};
use thiserror::Error;

/// Result type for binding-layer and facade calls
pub type EngineResult<T> = Result<T, JsEngineError>;

/// Semantic kind of a failure, independent of the backend that raised it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// The host called the engine incorrectly
    Usage,
    /// A script failed to compile, threw, or was terminated
    Script,
    /// The engine itself failed; not recoverable
    Engine,
    /// A script value has no host representation
    NotSupportedType,
}

/// Incorrect use of the engine by the host.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UsageError {
    #[error("invalid argument")]
    InvalidArgument,
    #[error("null argument")]
    NullArgument,
    #[error("no current context")]
    NoCurrentContext,
    #[error("runtime is in an exception state")]
    InExceptionState,
    #[error("operation is not implemented")]
    NotImplemented,
    #[error("handle used on the wrong thread")]
    WrongThread,
    #[error("runtime is still in use")]
    RuntimeInUse,
    #[error("serialized script does not match its source")]
    BadSerializedScript,
    #[error("runtime execution is disabled")]
    InDisabledState,
    #[error("runtime was not created with script interrupts allowed")]
    CannotDisableExecution,
    #[error("heap enumeration is in progress")]
    HeapEnumInProgress,
    #[error("argument is not an object")]
    ArgumentNotObject,
    #[error("call made from inside a profiler callback")]
    InProfileCallback,
    #[error("call made from inside a thread service callback")]
    InThreadServiceCallback,
    #[error("scripts cannot be serialized in a debugged context")]
    CannotSerializeDebugScript,
    #[error("context is already being debugged")]
    AlreadyDebuggingContext,
    #[error("context is already being profiled")]
    AlreadyProfilingContext,
    #[error("runtime was not created with idle processing enabled")]
    IdleNotEnabled,
    #[error("usage error 0x{0:05X}")]
    Other(u32),
    #[error("{requested}-bit debugger requested in a {process}-bit process")]
    WrongBitness { requested: u32, process: u32 },
    #[error("engine is already running script")]
    AlreadyInScript,
    #[error("buffer too small: {required} bytes required, {provided} provided")]
    BufferTooSmall { required: u64, provided: usize },
    #[error("{0} is not supported by this engine")]
    NotSupportedByBackend(&'static str),
    #[error("engine is not in a state that allows this call")]
    WrongState,
    #[error("'{0}' is not a valid name")]
    InvalidName(String),
    #[error("{0} must not be empty")]
    EmptyArgument(&'static str),
    #[error("script was precompiled for {0}")]
    PrecompiledMismatch(String),
}

impl UsageError {
    /// Usage error for a usage-category JsRt code.
    pub fn from_code(code: JsErrorCode) -> Self {
        match code {
            JsErrorCode::InvalidArgument => UsageError::InvalidArgument,
            JsErrorCode::NullArgument => UsageError::NullArgument,
            JsErrorCode::NoCurrentContext => UsageError::NoCurrentContext,
            JsErrorCode::InExceptionState => UsageError::InExceptionState,
            JsErrorCode::NotImplemented => UsageError::NotImplemented,
            JsErrorCode::WrongThread => UsageError::WrongThread,
            JsErrorCode::RuntimeInUse => UsageError::RuntimeInUse,
            JsErrorCode::BadSerializedScript => UsageError::BadSerializedScript,
            JsErrorCode::InDisabledState => UsageError::InDisabledState,
            JsErrorCode::CannotDisableExecution => UsageError::CannotDisableExecution,
            JsErrorCode::HeapEnumInProgress => UsageError::HeapEnumInProgress,
            JsErrorCode::ArgumentNotObject => UsageError::ArgumentNotObject,
            JsErrorCode::InProfileCallback => UsageError::InProfileCallback,
            JsErrorCode::InThreadServiceCallback => UsageError::InThreadServiceCallback,
            JsErrorCode::CannotSerializeDebugScript => UsageError::CannotSerializeDebugScript,
            JsErrorCode::AlreadyDebuggingContext => UsageError::AlreadyDebuggingContext,
            JsErrorCode::AlreadyProfilingContext => UsageError::AlreadyProfilingContext,
            JsErrorCode::IdleNotEnabled => UsageError::IdleNotEnabled,
            other => UsageError::Other(other.raw()),
        }
    }
}

/// Where a script error came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScriptErrorCategory {
    /// The source failed to compile
    Compile,
    /// A value was thrown and not caught
    Runtime,
    /// Execution was disabled or interrupted
    Terminated,
    /// `eval` was called in a runtime that disables it
    EvalDisabled,
}

/// A script failure with the details the engine reported.
///
/// Line and column are one-based.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptError {
    pub category: ScriptErrorCategory,
    pub name: Option<String>,
    pub message: String,
    pub line: Option<u32>,
    pub column: Option<u32>,
    pub source_line: Option<String>,
    pub stack: Option<String>,
}

impl ScriptError {
    pub fn new(category: ScriptErrorCategory, message: impl Into<String>) -> Self {
        Self {
            category,
            name: None,
            message: message.into(),
            line: None,
            column: None,
            source_line: None,
            stack: None,
        }
    }
}

impl fmt::Display for ScriptError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}: {}", name, self.message)?,
            None => write!(f, "{}", self.message)?,
        }
        match (self.line, self.column) {
            (Some(line), Some(column)) => write!(f, " (line {}, column {})", line, column),
            (Some(line), None) => write!(f, " (line {})", line),
            _ => Ok(()),
        }
    }
}

impl std::error::Error for ScriptError {}

/// Unrecoverable engine failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineFault {
    #[error("fatal engine error")]
    Fatal,
    #[error("object used with the wrong runtime")]
    WrongRuntime,
    #[error("out of memory")]
    OutOfMemory,
    #[error("out of stack space")]
    StackOverflow,
    #[error("unexpected engine status 0x{0:08X}")]
    Unexpected(u32),
}

/// A script value with no host form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("values of type {type_name} have no host representation")]
pub struct NotSupportedTypeError {
    pub type_name: String,
}

impl NotSupportedTypeError {
    pub fn new(type_name: impl Into<String>) -> Self {
        Self {
            type_name: type_name.into(),
        }
    }
}

/// Failure to read or parse engine settings.
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("invalid settings: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("cannot serialize settings: {0}")]
    Serialize(#[from] toml::ser::Error),

    #[error("cannot read settings file {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: io::Error,
    },

    #[error("{0}")]
    Invalid(String),
}

/// Any failure of the binding layer or the facade.
#[derive(Debug, Error)]
pub enum JsEngineError {
    #[error("usage error: {0}")]
    Usage(#[from] UsageError),

    #[error("script error: {0}")]
    Script(ScriptError),

    #[error("script terminated: {0}")]
    Terminated(ScriptError),

    #[error("engine fault: {0}")]
    Fault(#[from] EngineFault),

    #[error(transparent)]
    NotSupportedType(#[from] NotSupportedTypeError),

    #[error("cannot load engine: {0}")]
    Load(#[from] LoadError),

    #[error(transparent)]
    Settings(#[from] SettingsError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

impl JsEngineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            JsEngineError::Usage(_) | JsEngineError::Settings(_) | JsEngineError::Io(_) => ErrorKind::Usage,
            JsEngineError::Script(_) => ErrorKind::Script,
            JsEngineError::Terminated(_) | JsEngineError::Fault(_) | JsEngineError::Load(_) => ErrorKind::Engine,
            JsEngineError::NotSupportedType(_) => ErrorKind::NotSupportedType,
        }
    }

    /// False once the engine can no longer be used.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, JsEngineError::Fault(_) | JsEngineError::Load(_))
    }

    pub fn as_script_error(&self) -> Option<&ScriptError> {
        match self {
            JsEngineError::Script(error) | JsEngineError::Terminated(error) => Some(error),
            _ => None,
        }
    }

    pub fn as_usage_error(&self) -> Option<&UsageError> {
        match self {
            JsEngineError::Usage(error) => Some(error),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_usage_codes_map_to_variants() {
        assert_eq!(UsageError::from_code(JsErrorCode::NoCurrentContext), UsageError::NoCurrentContext);
        assert_eq!(UsageError::from_code(JsErrorCode::HeapEnumInProgress), UsageError::HeapEnumInProgress);
        assert_eq!(UsageError::from_code(JsErrorCode::PropertyNotString), UsageError::Other(0x10018));
    }

    #[test]
    fn test_kinds() {
        let usage = JsEngineError::from(UsageError::RuntimeInUse);
        assert_eq!(usage.kind(), ErrorKind::Usage);
        assert!(usage.is_recoverable());

        let fault = JsEngineError::from(EngineFault::StackOverflow);
        assert_eq!(fault.kind(), ErrorKind::Engine);
        assert!(!fault.is_recoverable());

        let terminated = JsEngineError::Terminated(ScriptError::new(ScriptErrorCategory::Terminated, "stop"));
        assert_eq!(terminated.kind(), ErrorKind::Engine);
        assert!(terminated.is_recoverable());
        assert_eq!(terminated.as_script_error().map(|e| e.message.as_str()), Some("stop"));
    }

    #[test]
    fn test_script_error_display() {
        let mut error = ScriptError::new(ScriptErrorCategory::Runtime, "boom");
        assert_eq!(error.to_string(), "boom");
        error.name = Some("Error".to_string());
        error.line = Some(3);
        error.column = Some(9);
        assert_eq!(error.to_string(), "Error: boom (line 3, column 9)");
    }
}
