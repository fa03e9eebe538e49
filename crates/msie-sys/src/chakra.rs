//! System JsRt provider
//!
//! Binds the JsRt exports of `jscript9.dll` (IE) or `chakra.dll` (Edge) and
//! forwards every `JsRtApi` call to them. The two libraries share most entry
//! points; `JsCreateRuntime`, `JsCreateContext` and `JsStartDebugging` have
//! variant-specific signatures.

use std::ffi::c_void;
use std::path::Path;
use std::ptr;
use std::sync::Arc;

use crate::api::{JsRtApi, JsRtVariant};
use crate::handles::{JsContextRef, JsPropertyIdRef, JsRuntimeHandle, JsSourceContext, JsValueRef};
use crate::loader::{Library, LoadError};
use crate::status::{JsErrorCode, Status};
use crate::types::{
    DebugApplication, HeapEnumerator, HeapObjectInfo, JsRuntimeAttributes, JsValueType,
    ProfilerEventMask, ProfilerSink, RuntimeInterrupt,
};

type Raw = u32;
type Handle = usize;

/// `JsRuntimeVersion11`
const IE_RUNTIME_VERSION_11: i32 = 1;

type IeCreateRuntimeFn = unsafe extern "system" fn(u32, i32, *mut c_void, *mut Handle) -> Raw;
type EdgeCreateRuntimeFn = unsafe extern "system" fn(u32, *mut c_void, *mut Handle) -> Raw;
type IeCreateContextFn = unsafe extern "system" fn(Handle, *mut c_void, *mut Handle) -> Raw;
type EdgeCreateContextFn = unsafe extern "system" fn(Handle, *mut Handle) -> Raw;
type IeStartDebuggingFn = unsafe extern "system" fn(*mut c_void) -> Raw;
type EdgeStartDebuggingFn = unsafe extern "system" fn() -> Raw;

type HandleFn = unsafe extern "system" fn(Handle) -> Raw;
type HandleOutFn = unsafe extern "system" fn(Handle, *mut Handle) -> Raw;
type OutFn = unsafe extern "system" fn(*mut Handle) -> Raw;
type HandleBoolOutFn = unsafe extern "system" fn(Handle, *mut bool) -> Raw;
type HandleCountFn = unsafe extern "system" fn(Handle, *mut u32) -> Raw;
type BoolOutFn = unsafe extern "system" fn(*mut bool) -> Raw;
type ScriptFn = unsafe extern "system" fn(*const u16, usize, *const u16, *mut Handle) -> Raw;
type SerializeFn = unsafe extern "system" fn(*const u16, *mut u8, *mut u32) -> Raw;
type SerializedFn =
    unsafe extern "system" fn(*const u16, *const u8, usize, *const u16, *mut Handle) -> Raw;
type PropertyIdFromNameFn = unsafe extern "system" fn(*const u16, *mut Handle) -> Raw;
type PropertyNameFromIdFn = unsafe extern "system" fn(Handle, *mut *const u16) -> Raw;
type BoolToBooleanFn = unsafe extern "system" fn(bool, *mut Handle) -> Raw;
type DoubleToNumberFn = unsafe extern "system" fn(f64, *mut Handle) -> Raw;
type IntToNumberFn = unsafe extern "system" fn(i32, *mut Handle) -> Raw;
type NumberToDoubleFn = unsafe extern "system" fn(Handle, *mut f64) -> Raw;
type PointerToStringFn = unsafe extern "system" fn(*const u16, usize, *mut Handle) -> Raw;
type StringToPointerFn = unsafe extern "system" fn(Handle, *mut *const u16, *mut usize) -> Raw;
type ValueTypeFn = unsafe extern "system" fn(Handle, *mut i32) -> Raw;
type GetPropertyFn = unsafe extern "system" fn(Handle, Handle, *mut Handle) -> Raw;
type SetPropertyFn = unsafe extern "system" fn(Handle, Handle, Handle, bool) -> Raw;
type HasPropertyFn = unsafe extern "system" fn(Handle, Handle, *mut bool) -> Raw;
type DeletePropertyFn = unsafe extern "system" fn(Handle, Handle, bool, *mut Handle) -> Raw;
type CallFunctionFn = unsafe extern "system" fn(Handle, *const Handle, u16, *mut Handle) -> Raw;
type StartProfilingFn = unsafe extern "system" fn(*mut c_void, u32, u32) -> Raw;
type StopProfilingFn = unsafe extern "system" fn(i32) -> Raw;
type EnumerateHeapFn = unsafe extern "system" fn(*mut *mut c_void) -> Raw;
type IdleFn = unsafe extern "system" fn(*mut u32) -> Raw;

#[derive(Clone, Copy)]
enum CreateRuntime {
    Ie(IeCreateRuntimeFn),
    Edge(EdgeCreateRuntimeFn),
}

#[derive(Clone, Copy)]
enum CreateContext {
    Ie(IeCreateContextFn),
    Edge(EdgeCreateContextFn),
}

#[derive(Clone, Copy)]
enum StartDebugging {
    Ie(IeStartDebuggingFn),
    Edge(EdgeStartDebuggingFn),
}

/// Resolved entry points.
struct Entries {
    create_runtime: CreateRuntime,
    dispose_runtime: HandleFn,
    collect_garbage: HandleFn,
    runtime_memory_usage: unsafe extern "system" fn(Handle, *mut usize) -> Raw,
    disable_runtime_execution: HandleFn,
    enable_runtime_execution: HandleFn,
    is_runtime_execution_disabled: HandleBoolOutFn,
    create_context: CreateContext,
    add_ref: HandleCountFn,
    release: HandleCountFn,
    get_current_context: OutFn,
    set_current_context: HandleFn,
    get_runtime: HandleOutFn,
    idle: IdleFn,
    parse_script: ScriptFn,
    run_script: ScriptFn,
    serialize_script: SerializeFn,
    parse_serialized_script: SerializedFn,
    run_serialized_script: SerializedFn,
    has_exception: BoolOutFn,
    get_and_clear_exception: OutFn,
    set_exception: HandleFn,
    property_id_from_name: PropertyIdFromNameFn,
    property_name_from_id: PropertyNameFromIdFn,
    undefined_value: OutFn,
    null_value: OutFn,
    bool_to_boolean: BoolToBooleanFn,
    boolean_to_bool: HandleBoolOutFn,
    double_to_number: DoubleToNumberFn,
    int_to_number: IntToNumberFn,
    number_to_double: NumberToDoubleFn,
    pointer_to_string: PointerToStringFn,
    string_to_pointer: StringToPointerFn,
    convert_to_string: HandleOutFn,
    convert_to_number: HandleOutFn,
    convert_to_boolean: HandleOutFn,
    value_type: ValueTypeFn,
    create_object: OutFn,
    create_error: HandleOutFn,
    global_object: OutFn,
    get_property: GetPropertyFn,
    set_property: SetPropertyFn,
    has_property: HasPropertyFn,
    delete_property: DeletePropertyFn,
    call_function: CallFunctionFn,
    start_debugging: StartDebugging,
    start_profiling: StartProfilingFn,
    stop_profiling: StopProfilingFn,
    enumerate_heap: EnumerateHeapFn,
    is_enumerating_heap: BoolOutFn,
}

impl Entries {
    unsafe fn resolve(library: &Library, variant: JsRtVariant) -> Result<Self, LoadError> {
        let (create_runtime, create_context, start_debugging) = match variant {
            JsRtVariant::Ie => (
                CreateRuntime::Ie(library.get("JsCreateRuntime")?),
                CreateContext::Ie(library.get("JsCreateContext")?),
                StartDebugging::Ie(library.get("JsStartDebugging")?),
            ),
            JsRtVariant::Edge => (
                CreateRuntime::Edge(library.get("JsCreateRuntime")?),
                CreateContext::Edge(library.get("JsCreateContext")?),
                StartDebugging::Edge(library.get("JsStartDebugging")?),
            ),
        };

        Ok(Entries {
            create_runtime,
            dispose_runtime: library.get("JsDisposeRuntime")?,
            collect_garbage: library.get("JsCollectGarbage")?,
            runtime_memory_usage: library.get("JsGetRuntimeMemoryUsage")?,
            disable_runtime_execution: library.get("JsDisableRuntimeExecution")?,
            enable_runtime_execution: library.get("JsEnableRuntimeExecution")?,
            is_runtime_execution_disabled: library.get("JsIsRuntimeExecutionDisabled")?,
            create_context,
            add_ref: library.get("JsAddRef")?,
            release: library.get("JsRelease")?,
            get_current_context: library.get("JsGetCurrentContext")?,
            set_current_context: library.get("JsSetCurrentContext")?,
            get_runtime: library.get("JsGetRuntime")?,
            idle: library.get("JsIdle")?,
            parse_script: library.get("JsParseScript")?,
            run_script: library.get("JsRunScript")?,
            serialize_script: library.get("JsSerializeScript")?,
            parse_serialized_script: library.get("JsParseSerializedScript")?,
            run_serialized_script: library.get("JsRunSerializedScript")?,
            has_exception: library.get("JsHasException")?,
            get_and_clear_exception: library.get("JsGetAndClearException")?,
            set_exception: library.get("JsSetException")?,
            property_id_from_name: library.get("JsGetPropertyIdFromName")?,
            property_name_from_id: library.get("JsGetPropertyNameFromId")?,
            undefined_value: library.get("JsGetUndefinedValue")?,
            null_value: library.get("JsGetNullValue")?,
            bool_to_boolean: library.get("JsBoolToBoolean")?,
            boolean_to_bool: library.get("JsBooleanToBool")?,
            double_to_number: library.get("JsDoubleToNumber")?,
            int_to_number: library.get("JsIntToNumber")?,
            number_to_double: library.get("JsNumberToDouble")?,
            pointer_to_string: library.get("JsPointerToString")?,
            string_to_pointer: library.get("JsStringToPointer")?,
            convert_to_string: library.get("JsConvertValueToString")?,
            convert_to_number: library.get("JsConvertValueToNumber")?,
            convert_to_boolean: library.get("JsConvertValueToBoolean")?,
            value_type: library.get("JsGetValueType")?,
            create_object: library.get("JsCreateObject")?,
            create_error: library.get("JsCreateError")?,
            global_object: library.get("JsGetGlobalObject")?,
            get_property: library.get("JsGetProperty")?,
            set_property: library.get("JsSetProperty")?,
            has_property: library.get("JsHasProperty")?,
            delete_property: library.get("JsDeleteProperty")?,
            call_function: library.get("JsCallFunction")?,
            start_debugging,
            start_profiling: library.get("JsStartProfiling")?,
            stop_profiling: library.get("JsStopProfiling")?,
            enumerate_heap: library.get("JsEnumerateHeap")?,
            is_enumerating_heap: library.get("JsIsEnumeratingHeap")?,
        })
    }
}

/// JsRt provider backed by a loaded system library.
pub struct ChakraLibrary {
    variant: JsRtVariant,
    entries: Entries,
    library: Arc<Library>,
}

impl ChakraLibrary {
    /// Load the system library for `variant` through the platform search path.
    pub fn load(variant: JsRtVariant) -> Result<Self, LoadError> {
        Self::load_from(variant, variant.library_name())
    }

    /// Load a JsRt library from an explicit path.
    pub fn load_from<P: AsRef<Path>>(variant: JsRtVariant, path: P) -> Result<Self, LoadError> {
        let library = Library::open(path)?;
        let entries = unsafe { Entries::resolve(&library, variant)? };
        log::debug!(target: "msie::loader", "bound {} JsRt entry points from {}", variant, library.path());
        Ok(ChakraLibrary {
            variant,
            entries,
            library: Arc::new(library),
        })
    }

    /// Path of the bound library.
    pub fn path(&self) -> &str {
        self.library.path()
    }
}

fn check(raw: Raw) -> Status<()> {
    JsErrorCode::check(raw)
}

fn wide(s: &str) -> Vec<u16> {
    s.encode_utf16().chain(std::iter::once(0)).collect()
}

unsafe fn from_wide_nul(ptr: *const u16) -> String {
    if ptr.is_null() {
        return String::new();
    }
    let mut len = 0;
    while *ptr.add(len) != 0 {
        len += 1;
    }
    from_wide_len(ptr, len)
}

unsafe fn from_wide_len(ptr: *const u16, len: usize) -> String {
    if ptr.is_null() {
        return String::new();
    }
    String::from_utf16_lossy(std::slice::from_raw_parts(ptr, len))
}

fn out_handle(f: impl FnOnce(*mut Handle) -> Raw) -> Status<usize> {
    let mut handle: Handle = 0;
    check(f(&mut handle))?;
    Ok(handle)
}

fn value(f: impl FnOnce(*mut Handle) -> Raw) -> Status<JsValueRef> {
    out_handle(f).map(JsValueRef::from_raw)
}

impl JsRtApi for ChakraLibrary {
    fn variant(&self) -> JsRtVariant {
        self.variant
    }

    // ========================================================================
    // Runtime
    // ========================================================================

    fn create_runtime(&self, attributes: JsRuntimeAttributes) -> Status<JsRuntimeHandle> {
        out_handle(|out| unsafe {
            match self.entries.create_runtime {
                CreateRuntime::Ie(f) => f(attributes.bits(), IE_RUNTIME_VERSION_11, ptr::null_mut(), out),
                CreateRuntime::Edge(f) => f(attributes.bits(), ptr::null_mut(), out),
            }
        })
        .map(JsRuntimeHandle::from_raw)
    }

    fn dispose_runtime(&self, runtime: JsRuntimeHandle) -> Status<()> {
        check(unsafe { (self.entries.dispose_runtime)(runtime.as_raw()) })
    }

    fn collect_garbage(&self, runtime: JsRuntimeHandle) -> Status<()> {
        check(unsafe { (self.entries.collect_garbage)(runtime.as_raw()) })
    }

    fn runtime_memory_usage(&self, runtime: JsRuntimeHandle) -> Status<usize> {
        let mut usage = 0usize;
        check(unsafe { (self.entries.runtime_memory_usage)(runtime.as_raw(), &mut usage) })?;
        Ok(usage)
    }

    fn disable_runtime_execution(&self, runtime: JsRuntimeHandle) -> Status<()> {
        check(unsafe { (self.entries.disable_runtime_execution)(runtime.as_raw()) })
    }

    fn enable_runtime_execution(&self, runtime: JsRuntimeHandle) -> Status<()> {
        check(unsafe { (self.entries.enable_runtime_execution)(runtime.as_raw()) })
    }

    fn is_runtime_execution_disabled(&self, runtime: JsRuntimeHandle) -> Status<bool> {
        let mut disabled = false;
        check(unsafe { (self.entries.is_runtime_execution_disabled)(runtime.as_raw(), &mut disabled) })?;
        Ok(disabled)
    }

    fn interrupt_handle(&self, runtime: JsRuntimeHandle) -> Status<Arc<dyn RuntimeInterrupt>> {
        Ok(Arc::new(ChakraInterrupt {
            disable: self.entries.disable_runtime_execution,
            runtime: runtime.as_raw(),
            _library: Arc::clone(&self.library),
        }))
    }

    // ========================================================================
    // Context
    // ========================================================================

    fn create_context(&self, runtime: JsRuntimeHandle) -> Status<JsContextRef> {
        out_handle(|out| unsafe {
            match self.entries.create_context {
                CreateContext::Ie(f) => f(runtime.as_raw(), ptr::null_mut(), out),
                CreateContext::Edge(f) => f(runtime.as_raw(), out),
            }
        })
        .map(JsContextRef::from_raw)
    }

    fn context_add_ref(&self, context: JsContextRef) -> Status<u32> {
        let mut count = 0u32;
        check(unsafe { (self.entries.add_ref)(context.as_raw(), &mut count) })?;
        Ok(count)
    }

    fn context_release(&self, context: JsContextRef) -> Status<u32> {
        let mut count = 0u32;
        check(unsafe { (self.entries.release)(context.as_raw(), &mut count) })?;
        Ok(count)
    }

    fn value_add_ref(&self, value: JsValueRef) -> Status<u32> {
        let mut count = 0u32;
        check(unsafe { (self.entries.add_ref)(value.as_raw(), &mut count) })?;
        Ok(count)
    }

    fn value_release(&self, value: JsValueRef) -> Status<u32> {
        let mut count = 0u32;
        check(unsafe { (self.entries.release)(value.as_raw(), &mut count) })?;
        Ok(count)
    }

    fn current_context(&self) -> Status<JsContextRef> {
        out_handle(|out| unsafe { (self.entries.get_current_context)(out) }).map(JsContextRef::from_raw)
    }

    fn set_current_context(&self, context: JsContextRef) -> Status<()> {
        check(unsafe { (self.entries.set_current_context)(context.as_raw()) })
    }

    fn context_runtime(&self, context: JsContextRef) -> Status<JsRuntimeHandle> {
        out_handle(|out| unsafe { (self.entries.get_runtime)(context.as_raw(), out) })
            .map(JsRuntimeHandle::from_raw)
    }

    fn idle(&self) -> Status<u32> {
        let mut next_tick = 0u32;
        check(unsafe { (self.entries.idle)(&mut next_tick) })?;
        Ok(next_tick)
    }

    // ========================================================================
    // Scripts
    // ========================================================================

    fn parse_script(&self, script: &str, source_context: JsSourceContext, source_url: &str) -> Status<JsValueRef> {
        let (script, url) = (wide(script), wide(source_url));
        value(|out| unsafe { (self.entries.parse_script)(script.as_ptr(), source_context.0, url.as_ptr(), out) })
    }

    fn run_script(&self, script: &str, source_context: JsSourceContext, source_url: &str) -> Status<JsValueRef> {
        let (script, url) = (wide(script), wide(source_url));
        value(|out| unsafe { (self.entries.run_script)(script.as_ptr(), source_context.0, url.as_ptr(), out) })
    }

    fn serialize_script(&self, script: &str, buffer: &mut [u8]) -> Status<u64> {
        let script = wide(script);
        let mut size = u32::try_from(buffer.len()).map_err(|_| JsErrorCode::InvalidArgument)?;
        let target = if buffer.is_empty() {
            ptr::null_mut()
        } else {
            buffer.as_mut_ptr()
        };
        check(unsafe { (self.entries.serialize_script)(script.as_ptr(), target, &mut size) })?;
        Ok(u64::from(size))
    }

    fn parse_serialized_script(
        &self,
        script: &str,
        buffer: &[u8],
        source_context: JsSourceContext,
        source_url: &str,
    ) -> Status<JsValueRef> {
        let (script, url) = (wide(script), wide(source_url));
        value(|out| unsafe {
            (self.entries.parse_serialized_script)(script.as_ptr(), buffer.as_ptr(), source_context.0, url.as_ptr(), out)
        })
    }

    fn run_serialized_script(
        &self,
        script: &str,
        buffer: &[u8],
        source_context: JsSourceContext,
        source_url: &str,
    ) -> Status<JsValueRef> {
        let (script, url) = (wide(script), wide(source_url));
        value(|out| unsafe {
            (self.entries.run_serialized_script)(script.as_ptr(), buffer.as_ptr(), source_context.0, url.as_ptr(), out)
        })
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    fn has_exception(&self) -> Status<bool> {
        let mut has = false;
        check(unsafe { (self.entries.has_exception)(&mut has) })?;
        Ok(has)
    }

    fn get_and_clear_exception(&self) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.get_and_clear_exception)(out) })
    }

    fn set_exception(&self, exception: JsValueRef) -> Status<()> {
        check(unsafe { (self.entries.set_exception)(exception.as_raw()) })
    }

    // ========================================================================
    // Property ids
    // ========================================================================

    fn property_id_from_name(&self, name: &str) -> Status<JsPropertyIdRef> {
        let name = wide(name);
        out_handle(|out| unsafe { (self.entries.property_id_from_name)(name.as_ptr(), out) })
            .map(JsPropertyIdRef::from_raw)
    }

    fn property_name_from_id(&self, id: JsPropertyIdRef) -> Status<String> {
        let mut name: *const u16 = ptr::null();
        check(unsafe { (self.entries.property_name_from_id)(id.as_raw(), &mut name) })?;
        Ok(unsafe { from_wide_nul(name) })
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn undefined_value(&self) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.undefined_value)(out) })
    }

    fn null_value(&self) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.null_value)(out) })
    }

    fn bool_to_boolean(&self, flag: bool) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.bool_to_boolean)(flag, out) })
    }

    fn boolean_to_bool(&self, boolean: JsValueRef) -> Status<bool> {
        let mut flag = false;
        check(unsafe { (self.entries.boolean_to_bool)(boolean.as_raw(), &mut flag) })?;
        Ok(flag)
    }

    fn double_to_number(&self, number: f64) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.double_to_number)(number, out) })
    }

    fn int_to_number(&self, number: i32) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.int_to_number)(number, out) })
    }

    fn number_to_double(&self, number: JsValueRef) -> Status<f64> {
        let mut double = 0.0;
        check(unsafe { (self.entries.number_to_double)(number.as_raw(), &mut double) })?;
        Ok(double)
    }

    fn pointer_to_string(&self, text: &str) -> Status<JsValueRef> {
        let units: Vec<u16> = text.encode_utf16().collect();
        value(|out| unsafe { (self.entries.pointer_to_string)(units.as_ptr(), units.len(), out) })
    }

    fn string_to_pointer(&self, string: JsValueRef) -> Status<String> {
        let mut chars: *const u16 = ptr::null();
        let mut len = 0usize;
        check(unsafe { (self.entries.string_to_pointer)(string.as_raw(), &mut chars, &mut len) })?;
        Ok(unsafe { from_wide_len(chars, len) })
    }

    fn convert_value_to_string(&self, input: JsValueRef) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.convert_to_string)(input.as_raw(), out) })
    }

    fn convert_value_to_number(&self, input: JsValueRef) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.convert_to_number)(input.as_raw(), out) })
    }

    fn convert_value_to_boolean(&self, input: JsValueRef) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.convert_to_boolean)(input.as_raw(), out) })
    }

    fn value_type(&self, input: JsValueRef) -> Status<JsValueType> {
        let mut raw = 0i32;
        check(unsafe { (self.entries.value_type)(input.as_raw(), &mut raw) })?;
        JsValueType::from_raw(raw).ok_or(JsErrorCode::NotImplemented)
    }

    fn create_object(&self) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.create_object)(out) })
    }

    fn create_error(&self, message: JsValueRef) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.create_error)(message.as_raw(), out) })
    }

    fn global_object(&self) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.global_object)(out) })
    }

    fn get_property(&self, object: JsValueRef, id: JsPropertyIdRef) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.get_property)(object.as_raw(), id.as_raw(), out) })
    }

    fn set_property(&self, object: JsValueRef, id: JsPropertyIdRef, input: JsValueRef, use_strict_rules: bool) -> Status<()> {
        check(unsafe { (self.entries.set_property)(object.as_raw(), id.as_raw(), input.as_raw(), use_strict_rules) })
    }

    fn has_property(&self, object: JsValueRef, id: JsPropertyIdRef) -> Status<bool> {
        let mut has = false;
        check(unsafe { (self.entries.has_property)(object.as_raw(), id.as_raw(), &mut has) })?;
        Ok(has)
    }

    fn delete_property(&self, object: JsValueRef, id: JsPropertyIdRef, use_strict_rules: bool) -> Status<JsValueRef> {
        value(|out| unsafe { (self.entries.delete_property)(object.as_raw(), id.as_raw(), use_strict_rules, out) })
    }

    fn call_function(&self, function: JsValueRef, arguments: &[JsValueRef]) -> Status<JsValueRef> {
        let count = u16::try_from(arguments.len()).map_err(|_| JsErrorCode::InvalidArgument)?;
        // JsValueRef is repr(transparent) over the raw handle.
        let args = arguments.as_ptr().cast::<Handle>();
        value(|out| unsafe { (self.entries.call_function)(function.as_raw(), args, count, out) })
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    fn start_debugging(&self, application: DebugApplication) -> Status<()> {
        match (self.entries.start_debugging, application) {
            (StartDebugging::Edge(f), DebugApplication::Unified) => check(unsafe { f() }),
            (StartDebugging::Ie(f), DebugApplication::Bits32(app) | DebugApplication::Bits64(app)) => {
                check(unsafe { f(app.as_raw()) })
            }
            _ => Err(JsErrorCode::InvalidArgument),
        }
    }

    fn start_profiling(&self, callback: ProfilerSink, event_mask: ProfilerEventMask, context: u32) -> Status<()> {
        match callback {
            ProfilerSink::Com(callback) => {
                check(unsafe { (self.entries.start_profiling)(callback.as_raw(), event_mask.bits(), context) })
            }
            ProfilerSink::Host(_) => Err(JsErrorCode::InvalidArgument),
        }
    }

    fn stop_profiling(&self, reason: i32) -> Status<()> {
        check(unsafe { (self.entries.stop_profiling)(reason) })
    }

    fn enumerate_heap(&self) -> Status<Box<dyn HeapEnumerator>> {
        let mut enumerator: *mut c_void = ptr::null_mut();
        check(unsafe { (self.entries.enumerate_heap)(&mut enumerator) })?;
        if enumerator.is_null() {
            return Err(JsErrorCode::NullArgument);
        }
        Ok(Box::new(ComHeapEnumerator { this: enumerator }))
    }

    fn is_enumerating_heap(&self) -> Status<bool> {
        let mut enumerating = false;
        check(unsafe { (self.entries.is_enumerating_heap)(&mut enumerating) })?;
        Ok(enumerating)
    }
}

// ============================================================================
// Interrupt handle
// ============================================================================

struct ChakraInterrupt {
    disable: HandleFn,
    runtime: Handle,
    _library: Arc<Library>,
}

impl RuntimeInterrupt for ChakraInterrupt {
    fn disable_execution(&self) -> Status<()> {
        check(unsafe { (self.disable)(self.runtime) })
    }
}

// ============================================================================
// Heap enumeration (IActiveScriptProfilerHeapEnum)
// ============================================================================

#[repr(C)]
#[allow(dead_code)]
struct ProfilerHeapObject {
    size: u32,
    object_id: usize,
    type_name_id: u32,
    flags: u32,
    unused: u16,
    optional_info_count: u16,
}

#[repr(C)]
#[allow(dead_code)]
struct HeapEnumVtbl {
    query_interface: unsafe extern "system" fn(*mut c_void, *const c_void, *mut *mut c_void) -> i32,
    add_ref: unsafe extern "system" fn(*mut c_void) -> u32,
    release: unsafe extern "system" fn(*mut c_void) -> u32,
    next: unsafe extern "system" fn(*mut c_void, u32, *mut *mut ProfilerHeapObject, *mut u32) -> i32,
    get_optional_info: unsafe extern "system" fn(*mut c_void, *mut ProfilerHeapObject, u32, *mut c_void) -> i32,
    free_object_and_optional_info: unsafe extern "system" fn(*mut c_void, u32, *mut *mut ProfilerHeapObject) -> i32,
    get_name_id_map: unsafe extern "system" fn(*mut c_void, *mut *mut *const u16, *mut u32) -> i32,
}

struct ComHeapEnumerator {
    this: *mut c_void,
}

impl ComHeapEnumerator {
    unsafe fn vtbl(&self) -> &HeapEnumVtbl {
        &**self.this.cast::<*const HeapEnumVtbl>()
    }
}

impl HeapEnumerator for ComHeapEnumerator {
    fn next(&mut self, max: usize) -> Status<Vec<HeapObjectInfo>> {
        let celt = u32::try_from(max).map_err(|_| JsErrorCode::InvalidArgument)?;
        let mut objects: Vec<*mut ProfilerHeapObject> = vec![ptr::null_mut(); max];
        let mut fetched = 0u32;
        let hr = unsafe { (self.vtbl().next)(self.this, celt, objects.as_mut_ptr(), &mut fetched) };
        if hr < 0 {
            return Err(JsErrorCode::Fatal);
        }

        let fetched_objects = &mut objects[..fetched as usize];
        let infos = fetched_objects
            .iter()
            .filter(|object| !object.is_null())
            .map(|&object| unsafe {
                HeapObjectInfo {
                    object_id: (*object).object_id,
                    size: (*object).size,
                    type_name_id: (*object).type_name_id,
                    type_name: None,
                    flags: (*object).flags,
                }
            })
            .collect();
        unsafe {
            (self.vtbl().free_object_and_optional_info)(self.this, fetched, fetched_objects.as_mut_ptr());
        }
        Ok(infos)
    }
}

impl Drop for ComHeapEnumerator {
    fn drop(&mut self) {
        unsafe {
            (self.vtbl().release)(self.this);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_missing_library() {
        let result = ChakraLibrary::load_from(JsRtVariant::Edge, "/nonexistent/chakra.dll");
        assert!(matches!(result, Err(LoadError::NotFound { .. })));
    }

    #[test]
    fn test_wide_strings() {
        let units = wide("ab");
        assert_eq!(units, vec![97, 98, 0]);
        assert_eq!(unsafe { from_wide_nul(units.as_ptr()) }, "ab");
        assert_eq!(unsafe { from_wide_len(units.as_ptr(), 1) }, "a");
        assert_eq!(unsafe { from_wide_nul(ptr::null()) }, "");
    }
}
