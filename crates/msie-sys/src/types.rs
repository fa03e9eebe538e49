//! JsRt option sets, value types and diagnostics plumbing

use std::ffi::c_void;
use std::ptr::NonNull;
use std::rc::Rc;

use bitflags::bitflags;

use crate::status::Status;

bitflags! {
    /// Options applied when a runtime is created (`JsRuntimeAttributes`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct JsRuntimeAttributes: u32 {
        /// No background GC or JIT threads
        const DISABLE_BACKGROUND_WORK = 0x0000_0001;
        /// Allow `JsDisableRuntimeExecution` to interrupt running script
        const ALLOW_SCRIPT_INTERRUPT = 0x0000_0002;
        /// Require the host to call `JsIdle` periodically
        const ENABLE_IDLE_PROCESSING = 0x0000_0004;
        /// Interpret only
        const DISABLE_NATIVE_CODE_GENERATION = 0x0000_0008;
        /// `eval` and `Function` raise instead of compiling
        const DISABLE_EVAL = 0x0000_0010;
    }
}

/// Shape of a script value (`JsValueType`).
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[allow(missing_docs)]
pub enum JsValueType {
    Undefined = 0,
    Null = 1,
    Number = 2,
    String = 3,
    Boolean = 4,
    Object = 5,
    Function = 6,
    Error = 7,
    Array = 8,
    /// Edge only
    Symbol = 9,
    /// Edge only
    ArrayBuffer = 10,
    /// Edge only
    TypedArray = 11,
    /// Edge only
    DataView = 12,
}

impl JsValueType {
    /// Map the raw value written by `JsGetValueType`.
    pub fn from_raw(raw: i32) -> Option<Self> {
        Some(match raw {
            0 => JsValueType::Undefined,
            1 => JsValueType::Null,
            2 => JsValueType::Number,
            3 => JsValueType::String,
            4 => JsValueType::Boolean,
            5 => JsValueType::Object,
            6 => JsValueType::Function,
            7 => JsValueType::Error,
            8 => JsValueType::Array,
            9 => JsValueType::Symbol,
            10 => JsValueType::ArrayBuffer,
            11 => JsValueType::TypedArray,
            12 => JsValueType::DataView,
            _ => return None,
        })
    }

    /// Whether the type is backed by an object.
    pub fn is_object(self) -> bool {
        !matches!(
            self,
            JsValueType::Undefined
                | JsValueType::Null
                | JsValueType::Number
                | JsValueType::String
                | JsValueType::Boolean
                | JsValueType::Symbol
        )
    }
}

bitflags! {
    /// Events a profiler callback subscribes to (`PROFILER_EVENT_MASK`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
    pub struct ProfilerEventMask: u32 {
        /// Script function enter/exit
        const TRACE_SCRIPT_FUNCTION_CALL = 0x0000_0001;
        /// Native function enter/exit
        const TRACE_NATIVE_FUNCTION_CALL = 0x0000_0002;
        /// DOM function enter/exit
        const TRACE_DOM_FUNCTION_CALL = 0x0000_0004;
        /// Script and native calls
        const TRACE_ALL = Self::TRACE_SCRIPT_FUNCTION_CALL.bits() | Self::TRACE_NATIVE_FUNCTION_CALL.bits();
        /// Everything
        const TRACE_ALL_WITH_DOM = Self::TRACE_ALL.bits() | Self::TRACE_DOM_FUNCTION_CALL.bits();
    }
}

/// Origin of a compiled script reported to a profiler.
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(missing_docs)]
pub enum ProfilerScriptType {
    User = 0,
    Dynamic = 1,
    Native = 2,
    Dom = 3,
}

/// Host-side profiler (the `IActiveScriptProfilerCallback` contract).
///
/// Every method defaults to doing nothing. Calls back into the engine from a
/// callback fail with `InProfileCallback`.
pub trait ProfilerCallback {
    /// Profiling started with the cookie passed to `start_profiling`.
    fn initialize(&self, _context: u32) {}

    /// Profiling stopped with the given reason.
    fn shutdown(&self, _reason: i32) {}

    /// A script was compiled.
    fn script_compiled(&self, _script_id: u32, _kind: ProfilerScriptType) {}

    /// A function was compiled inside a script.
    fn function_compiled(&self, _function_id: u32, _script_id: u32, _name: &str) {}

    /// A traced function was entered.
    fn on_function_enter(&self, _script_id: u32, _function_id: u32) {}

    /// A traced function returned.
    fn on_function_exit(&self, _script_id: u32, _function_id: u32) {}
}

/// Non-null raw COM interface pointer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ComPtr(NonNull<c_void>);

impl ComPtr {
    /// Wrap a raw interface pointer, `None` if null.
    ///
    /// # Safety
    ///
    /// The pointer must reference a live COM object whose reference the
    /// caller holds for as long as the `ComPtr` is in use.
    pub unsafe fn from_raw(ptr: *mut c_void) -> Option<Self> {
        NonNull::new(ptr).map(ComPtr)
    }

    /// The raw pointer.
    pub fn as_raw(self) -> *mut c_void {
        self.0.as_ptr()
    }
}

/// Receiver of profiling events.
#[derive(Clone)]
pub enum ProfilerSink {
    /// A Rust callback (embedded provider)
    Host(Rc<dyn ProfilerCallback>),
    /// An `IActiveScriptProfilerCallback*` (system provider)
    Com(ComPtr),
}

/// Debug application handed to `JsStartDebugging`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebugApplication {
    /// Edge: the engine talks to the system debugger itself
    Unified,
    /// IE: `IDebugApplication32*`
    Bits32(ComPtr),
    /// IE: `IDebugApplication64*`
    Bits64(ComPtr),
}

/// One object reported by a heap enumerator (`PROFILER_HEAP_OBJECT`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapObjectInfo {
    /// Engine-assigned object identity
    pub object_id: usize,
    /// Size in bytes
    pub size: u32,
    /// Index into the enumerator's name map
    pub type_name_id: u32,
    /// Resolved type name, when the provider knows it
    pub type_name: Option<String>,
    /// `PROFILER_HEAP_OBJECT_FLAGS`
    pub flags: u32,
}

/// Active heap snapshot (`IActiveScriptProfilerHeapEnum`).
///
/// The owning context stays locked against mutation until this is dropped.
pub trait HeapEnumerator {
    /// Up to `max` further objects; empty when the snapshot is exhausted.
    fn next(&mut self, max: usize) -> Status<Vec<HeapObjectInfo>>;
}

/// Cross-thread handle that can stop script running in a runtime.
pub trait RuntimeInterrupt: Send + Sync {
    /// Disable execution (`JsDisableRuntimeExecution`).
    fn disable_execution(&self) -> Status<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_attribute_bits() {
        let attrs = JsRuntimeAttributes::ALLOW_SCRIPT_INTERRUPT | JsRuntimeAttributes::DISABLE_EVAL;
        assert_eq!(attrs.bits(), 0x12);
        assert!(JsRuntimeAttributes::default().is_empty());
    }

    #[test]
    fn test_profiler_masks() {
        assert_eq!(ProfilerEventMask::TRACE_ALL.bits(), 3);
        assert_eq!(ProfilerEventMask::TRACE_ALL_WITH_DOM.bits(), 7);
    }

    #[test]
    fn test_value_type_raw() {
        assert_eq!(JsValueType::from_raw(6), Some(JsValueType::Function));
        assert_eq!(JsValueType::from_raw(12), Some(JsValueType::DataView));
        assert_eq!(JsValueType::from_raw(13), None);
        assert!(JsValueType::Array.is_object());
        assert!(!JsValueType::Symbol.is_object());
    }
}
