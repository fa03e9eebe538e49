//! The JsRt provider trait
//!
//! One method per JsRt entry point. Implementations either forward to a
//! loaded Chakra library or emulate the same contract in process. Methods
//! that act on "the current context" take no context argument, exactly like
//! the flat C surface.

use std::fmt;
use std::sync::Arc;

use crate::handles::{JsContextRef, JsPropertyIdRef, JsRuntimeHandle, JsSourceContext, JsValueRef};
use crate::status::Status;
use crate::types::{
    DebugApplication, HeapEnumerator, JsRuntimeAttributes, JsValueType, ProfilerEventMask,
    ProfilerSink, RuntimeInterrupt,
};

/// Which JsRt flavor a provider speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JsRtVariant {
    /// jscript9.dll, the IE11 engine
    Ie,
    /// chakra.dll, the Edge engine
    Edge,
}

impl JsRtVariant {
    /// File name of the system library for this flavor.
    pub fn library_name(self) -> &'static str {
        match self {
            JsRtVariant::Ie => "jscript9.dll",
            JsRtVariant::Edge => "chakra.dll",
        }
    }
}

impl fmt::Display for JsRtVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JsRtVariant::Ie => write!(f, "IE"),
            JsRtVariant::Edge => write!(f, "Edge"),
        }
    }
}

/// Flat JsRt call surface.
pub trait JsRtApi {
    /// Flavor of the provider.
    fn variant(&self) -> JsRtVariant;

    // ========================================================================
    // Runtime
    // ========================================================================

    /// `JsCreateRuntime`
    fn create_runtime(&self, attributes: JsRuntimeAttributes) -> Status<JsRuntimeHandle>;

    /// `JsDisposeRuntime`
    fn dispose_runtime(&self, runtime: JsRuntimeHandle) -> Status<()>;

    /// `JsCollectGarbage`
    fn collect_garbage(&self, runtime: JsRuntimeHandle) -> Status<()>;

    /// `JsGetRuntimeMemoryUsage`
    fn runtime_memory_usage(&self, runtime: JsRuntimeHandle) -> Status<usize>;

    /// `JsDisableRuntimeExecution`
    fn disable_runtime_execution(&self, runtime: JsRuntimeHandle) -> Status<()>;

    /// `JsEnableRuntimeExecution`
    fn enable_runtime_execution(&self, runtime: JsRuntimeHandle) -> Status<()>;

    /// `JsIsRuntimeExecutionDisabled`
    fn is_runtime_execution_disabled(&self, runtime: JsRuntimeHandle) -> Status<bool>;

    /// Handle that can disable `runtime` from any thread.
    fn interrupt_handle(&self, runtime: JsRuntimeHandle) -> Status<Arc<dyn RuntimeInterrupt>>;

    // ========================================================================
    // Context
    // ========================================================================

    /// `JsCreateContext`
    fn create_context(&self, runtime: JsRuntimeHandle) -> Status<JsContextRef>;

    /// `JsAddRef` on a context; returns the new count.
    fn context_add_ref(&self, context: JsContextRef) -> Status<u32>;

    /// `JsRelease` on a context; returns the new count.
    fn context_release(&self, context: JsContextRef) -> Status<u32>;

    /// `JsAddRef` on a value; the value then outlives the current-context
    /// stretch it was produced in. Returns the new count.
    fn value_add_ref(&self, value: JsValueRef) -> Status<u32>;

    /// `JsRelease` on a value; returns the new count.
    fn value_release(&self, value: JsValueRef) -> Status<u32>;

    /// `JsGetCurrentContext`; the invalid handle when none is set.
    fn current_context(&self) -> Status<JsContextRef>;

    /// `JsSetCurrentContext`; the invalid handle clears the slot.
    fn set_current_context(&self, context: JsContextRef) -> Status<()>;

    /// `JsGetRuntime`
    fn context_runtime(&self, context: JsContextRef) -> Status<JsRuntimeHandle>;

    /// `JsIdle`; returns the next idle tick.
    fn idle(&self) -> Status<u32>;

    // ========================================================================
    // Scripts
    // ========================================================================

    /// `JsParseScript`
    fn parse_script(
        &self,
        script: &str,
        source_context: JsSourceContext,
        source_url: &str,
    ) -> Status<JsValueRef>;

    /// `JsRunScript`
    fn run_script(
        &self,
        script: &str,
        source_context: JsSourceContext,
        source_url: &str,
    ) -> Status<JsValueRef>;

    /// `JsSerializeScript`; returns the required size. Writes only when
    /// `buffer` is large enough.
    fn serialize_script(&self, script: &str, buffer: &mut [u8]) -> Status<u64>;

    /// `JsParseSerializedScript`
    fn parse_serialized_script(
        &self,
        script: &str,
        buffer: &[u8],
        source_context: JsSourceContext,
        source_url: &str,
    ) -> Status<JsValueRef>;

    /// `JsRunSerializedScript`
    fn run_serialized_script(
        &self,
        script: &str,
        buffer: &[u8],
        source_context: JsSourceContext,
        source_url: &str,
    ) -> Status<JsValueRef>;

    // ========================================================================
    // Exceptions
    // ========================================================================

    /// `JsHasException`
    fn has_exception(&self) -> Status<bool>;

    /// `JsGetAndClearException`
    fn get_and_clear_exception(&self) -> Status<JsValueRef>;

    /// `JsSetException`
    fn set_exception(&self, exception: JsValueRef) -> Status<()>;

    // ========================================================================
    // Property ids
    // ========================================================================

    /// `JsGetPropertyIdFromName`
    fn property_id_from_name(&self, name: &str) -> Status<JsPropertyIdRef>;

    /// `JsGetPropertyNameFromId`
    fn property_name_from_id(&self, id: JsPropertyIdRef) -> Status<String>;

    // ========================================================================
    // Values
    // ========================================================================

    /// `JsGetUndefinedValue`
    fn undefined_value(&self) -> Status<JsValueRef>;

    /// `JsGetNullValue`
    fn null_value(&self) -> Status<JsValueRef>;

    /// `JsBoolToBoolean`
    fn bool_to_boolean(&self, value: bool) -> Status<JsValueRef>;

    /// `JsBooleanToBool`
    fn boolean_to_bool(&self, value: JsValueRef) -> Status<bool>;

    /// `JsDoubleToNumber`
    fn double_to_number(&self, value: f64) -> Status<JsValueRef>;

    /// `JsIntToNumber`
    fn int_to_number(&self, value: i32) -> Status<JsValueRef>;

    /// `JsNumberToDouble`
    fn number_to_double(&self, value: JsValueRef) -> Status<f64>;

    /// `JsPointerToString`
    fn pointer_to_string(&self, value: &str) -> Status<JsValueRef>;

    /// `JsStringToPointer`
    fn string_to_pointer(&self, value: JsValueRef) -> Status<String>;

    /// `JsConvertValueToString`
    fn convert_value_to_string(&self, value: JsValueRef) -> Status<JsValueRef>;

    /// `JsConvertValueToNumber`
    fn convert_value_to_number(&self, value: JsValueRef) -> Status<JsValueRef>;

    /// `JsConvertValueToBoolean`
    fn convert_value_to_boolean(&self, value: JsValueRef) -> Status<JsValueRef>;

    /// `JsGetValueType`
    fn value_type(&self, value: JsValueRef) -> Status<JsValueType>;

    /// `JsCreateObject`
    fn create_object(&self) -> Status<JsValueRef>;

    /// `JsCreateError`
    fn create_error(&self, message: JsValueRef) -> Status<JsValueRef>;

    /// `JsGetGlobalObject`
    fn global_object(&self) -> Status<JsValueRef>;

    /// `JsGetProperty`
    fn get_property(&self, object: JsValueRef, id: JsPropertyIdRef) -> Status<JsValueRef>;

    /// `JsSetProperty`
    fn set_property(
        &self,
        object: JsValueRef,
        id: JsPropertyIdRef,
        value: JsValueRef,
        use_strict_rules: bool,
    ) -> Status<()>;

    /// `JsHasProperty`
    fn has_property(&self, object: JsValueRef, id: JsPropertyIdRef) -> Status<bool>;

    /// `JsDeleteProperty`; returns the boolean result value.
    fn delete_property(
        &self,
        object: JsValueRef,
        id: JsPropertyIdRef,
        use_strict_rules: bool,
    ) -> Status<JsValueRef>;

    /// `JsCallFunction`; `arguments[0]` is `this`.
    fn call_function(&self, function: JsValueRef, arguments: &[JsValueRef]) -> Status<JsValueRef>;

    // ========================================================================
    // Diagnostics
    // ========================================================================

    /// `JsStartDebugging`
    fn start_debugging(&self, application: DebugApplication) -> Status<()>;

    /// `JsStartProfiling`
    fn start_profiling(
        &self,
        callback: ProfilerSink,
        event_mask: ProfilerEventMask,
        context: u32,
    ) -> Status<()>;

    /// `JsStopProfiling`
    fn stop_profiling(&self, reason: i32) -> Status<()>;

    /// `JsEnumerateHeap`
    fn enumerate_heap(&self) -> Status<Box<dyn HeapEnumerator>>;

    /// `JsIsEnumeratingHeap`
    fn is_enumerating_heap(&self) -> Status<bool>;
}
