//! Embedded JsRt provider
//!
//! Each JsRt context owns one boa `Context`. Handles are process-unique ids
//! resolved against the provider's state; the current context is a single
//! slot per provider, and every context-scoped call runs against it.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, HashSet};
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

use boa_engine::{JsNativeError, JsObject, JsResult, JsValue, Script, Source};
use msie_sys::{
    DebugApplication, HeapEnumerator, HeapObjectInfo, JsContextRef, JsErrorCode, JsPropertyIdRef,
    JsRtApi, JsRtVariant, JsRuntimeAttributes, JsRuntimeHandle, JsSourceContext, JsValueRef,
    JsValueType, ProfilerEventMask, ProfilerSink, RuntimeInterrupt, Status,
};

use crate::convert::{self, Failure};
use crate::envelope;
use crate::heap::SnapshotHeapEnumerator;
use crate::profiler::{EventQueue, ProfilerEvent};
use crate::registry;
use crate::runtime::{ContextState, Profiler, RuntimeShared, RuntimeState, Slot};
use crate::EmbeddedOptions;

/// Result of the current-context checks a call performs before running.
#[derive(Clone, Copy)]
struct Gate {
    /// Fails in exception or disabled state
    latch: bool,
    /// May allocate or run script
    mutates: bool,
}

const QUERY: Gate = Gate {
    latch: true,
    mutates: false,
};
const MUTATE: Gate = Gate {
    latch: true,
    mutates: true,
};
const EXCEPTION: Gate = Gate {
    latch: false,
    mutates: false,
};

#[derive(Default)]
struct ProviderState {
    runtimes: HashMap<JsRuntimeHandle, RuntimeState>,
    owners: HashMap<JsContextRef, JsRuntimeHandle>,
    current: JsContextRef,
    /// Contexts made current since no context was last current.
    touched: HashSet<JsContextRef>,
}

impl ProviderState {
    fn owner(&self, context: JsContextRef) -> Status<JsRuntimeHandle> {
        self.owners
            .get(&context)
            .copied()
            .ok_or_else(|| registry::unknown(context.as_raw()))
    }

    fn context_mut(&mut self, context: JsContextRef) -> Status<&mut ContextState> {
        let runtime = self.owner(context)?;
        self.runtimes
            .get_mut(&runtime)
            .and_then(|runtime| runtime.contexts.get_mut(&context))
            .ok_or(JsErrorCode::InvalidArgument)
    }

    fn free_context(&mut self, context: JsContextRef) {
        if let Some(runtime) = self.owners.remove(&context) {
            if let Some(runtime) = self.runtimes.get_mut(&runtime) {
                runtime.contexts.remove(&context);
            }
            registry::release(context.as_raw());
            log::trace!(target: "msie::embedded", "freed context {:?}", context);
        }
    }

    fn value_owner(&mut self, value: JsValueRef) -> Status<&mut ContextState> {
        if !value.is_valid() {
            return Err(JsErrorCode::NullArgument);
        }
        self.runtimes
            .values_mut()
            .flat_map(|runtime| runtime.contexts.values_mut())
            .find(|context| context.owns(value))
            .ok_or(JsErrorCode::InvalidArgument)
    }

    /// Free the unpinned value handles of every context used since the
    /// last time no context was current.
    fn release_scoped_values(&mut self) {
        for context in std::mem::take(&mut self.touched) {
            if let Ok(state) = self.context_mut(context) {
                let freed = state.release_scoped_values();
                log::trace!(target: "msie::embedded", "released {} values of context {:?}", freed, context);
            }
        }
    }

    /// Free `context` once nothing references it and it is not current.
    fn collect_if_unreferenced(&mut self, context: JsContextRef) {
        if !context.is_valid() || context == self.current {
            return;
        }
        let unreferenced = self
            .context_mut(context)
            .map(|state| state.ref_count == 0)
            .unwrap_or(false);
        if unreferenced {
            self.free_context(context);
        }
    }
}

/// Borrowed view of the current context for one provider call.
struct Scope<'a> {
    variant: JsRtVariant,
    runtime: &'a mut RuntimeShared,
    context: &'a mut ContextState,
    events: EventQueue,
}

impl Scope<'_> {
    fn fail(&mut self, failure: Failure) -> JsErrorCode {
        match failure {
            Failure::Exception(value) => {
                self.runtime.latch(value, false);
                JsErrorCode::ScriptException
            }
            Failure::Compile(value) => {
                self.runtime.latch(value, false);
                JsErrorCode::ScriptCompile
            }
            Failure::EvalDisabled(value) => {
                self.runtime.latch(value, false);
                JsErrorCode::ScriptEvalDisabled
            }
            Failure::Fatal(reason) => {
                log::error!(target: "msie::embedded", "runtime faulted: {}", reason);
                self.runtime.faulted = true;
                JsErrorCode::Fatal
            }
        }
    }

    fn compile(&mut self, code: &str, url: &str) -> Status<Script> {
        let engine = &mut self.context.engine;
        let parsed = if url.is_empty() {
            Script::parse(Source::from_bytes(code), None, engine)
        } else {
            Script::parse(Source::from_bytes(code).with_path(Path::new(url)), None, engine)
        };
        match parsed {
            Ok(script) => Ok(script),
            Err(err) => {
                let failure = convert::compile_failure(err, code, url, &mut self.context.engine);
                Err(self.fail(failure))
            }
        }
    }

    fn parse(&mut self, code: &str, url: &str) -> Status<(Script, u32)> {
        let script = self.compile(code, url)?;
        let script_id = self.runtime.next_script_id();
        self.events.script_compiled(script_id);
        Ok((script, script_id))
    }

    fn parse_serialized(&mut self, code: &str, buffer: &[u8], url: &str) -> Status<(Script, u32)> {
        let digest = envelope::verify(buffer, code).ok_or(JsErrorCode::BadSerializedScript)?;
        let script = match self.context.code_cache.get(&digest) {
            Some(script) => script.clone(),
            None => {
                let script = self.compile(code, url)?;
                self.context.code_cache.insert(digest, script.clone());
                script
            }
        };
        let script_id = self.runtime.next_script_id();
        self.events.script_compiled(script_id);
        Ok((script, script_id))
    }

    /// Register the outcome of running script, honoring a disable request
    /// that arrived while it ran.
    fn finish(&mut self, result: JsResult<JsValue>) -> Status<JsValueRef> {
        if self.runtime.interrupt.is_disabled() {
            let terminated = JsNativeError::error()
                .with_message(convert::TERMINATED_MESSAGE)
                .to_opaque(&mut self.context.engine);
            self.runtime.latch(JsValue::from(terminated), true);
            return Err(JsErrorCode::ScriptTerminated);
        }
        match result {
            Ok(value) => Ok(self.context.register(value)),
            Err(err) => {
                let failure = convert::runtime_failure(err, &mut self.context.engine);
                Err(self.fail(failure))
            }
        }
    }

    fn run(&mut self, script: &Script, script_id: u32) -> Status<JsValueRef> {
        let result = {
            let _trace = self.events.call(script_id, 0);
            script.evaluate(&mut self.context.engine)
        };
        self.finish(result)
    }

    fn object(&self, handle: JsValueRef) -> Status<JsObject> {
        let value = self.context.value(handle)?;
        value
            .as_object()
            .map(|object| object.clone())
            .ok_or(JsErrorCode::ArgumentNotObject)
    }

    fn key(&self, id: JsPropertyIdRef) -> Status<boa_engine::property::PropertyKey> {
        if !id.is_valid() {
            return Err(JsErrorCode::NullArgument);
        }
        self.runtime.property_name(id).map(convert::key)
    }

    fn register_result(&mut self, result: JsResult<JsValue>) -> Status<JsValueRef> {
        match result {
            Ok(value) => Ok(self.context.register(value)),
            Err(err) => {
                let failure = convert::runtime_failure(err, &mut self.context.engine);
                Err(self.fail(failure))
            }
        }
    }
}

enum Callee {
    Script(Script, u32),
    Function(JsObject),
}

/// In-process JsRt provider backed by boa.
pub struct EmbeddedChakra {
    variant: JsRtVariant,
    options: EmbeddedOptions,
    state: RefCell<ProviderState>,
    in_callback: Cell<bool>,
    started: Instant,
}

impl EmbeddedChakra {
    /// Provider for `variant` with default engine limits.
    pub fn new(variant: JsRtVariant) -> Self {
        Self::with_options(variant, EmbeddedOptions::default())
    }

    /// Provider for `variant` with explicit engine limits.
    pub fn with_options(variant: JsRtVariant, options: EmbeddedOptions) -> Self {
        Self {
            variant,
            options,
            state: RefCell::new(ProviderState::default()),
            in_callback: Cell::new(false),
            started: Instant::now(),
        }
    }

    fn guard_callback(&self) -> Status<()> {
        if self.in_callback.get() {
            Err(JsErrorCode::InProfileCallback)
        } else {
            Ok(())
        }
    }

    fn with_runtime<T>(
        &self,
        runtime: JsRuntimeHandle,
        f: impl FnOnce(&mut RuntimeState) -> Status<T>,
    ) -> Status<T> {
        self.guard_callback()?;
        let mut state = self.state.borrow_mut();
        let runtime = state
            .runtimes
            .get_mut(&runtime)
            .ok_or_else(|| registry::unknown(runtime.as_raw()))?;
        f(runtime)
    }

    fn with_context<T>(&self, gate: Gate, f: impl FnOnce(&mut Scope<'_>) -> Status<T>) -> Status<T> {
        self.guard_callback()?;
        let (result, events) = {
            let mut state = self.state.borrow_mut();
            let state = &mut *state;
            let current = state.current;
            if !current.is_valid() {
                return Err(JsErrorCode::NoCurrentContext);
            }
            let runtime_handle = state.owner(current).map_err(|_| JsErrorCode::NoCurrentContext)?;
            let runtime = state
                .runtimes
                .get_mut(&runtime_handle)
                .ok_or(JsErrorCode::NoCurrentContext)?;

            if runtime.shared.faulted {
                return Err(JsErrorCode::Fatal);
            }
            if gate.latch {
                if runtime.shared.interrupt.is_disabled() {
                    return Err(JsErrorCode::InDisabledState);
                }
                if runtime.shared.exception.is_some() {
                    return Err(JsErrorCode::InExceptionState);
                }
            }

            let RuntimeState { shared, contexts, .. } = runtime;
            let context = contexts.get_mut(&current).ok_or(JsErrorCode::NoCurrentContext)?;
            if gate.mutates && context.heap_lock.get() {
                return Err(JsErrorCode::HeapEnumInProgress);
            }

            let events = EventQueue::for_profiler(context.profiler.as_ref());
            let mut scope = Scope {
                variant: self.variant,
                runtime: shared,
                context,
                events,
            };
            let result = f(&mut scope);
            (result, scope.events)
        };
        events.dispatch(&self.in_callback);
        result
    }
}

impl Drop for EmbeddedChakra {
    fn drop(&mut self) {
        let state = self.state.get_mut();
        for context in state.owners.keys() {
            registry::release(context.as_raw());
        }
        for runtime in state.runtimes.keys() {
            registry::release(runtime.as_raw());
        }
    }
}

impl JsRtApi for EmbeddedChakra {
    fn variant(&self) -> JsRtVariant {
        self.variant
    }

    // ========================================================================
    // Runtime
    // ========================================================================

    fn create_runtime(&self, attributes: JsRuntimeAttributes) -> Status<JsRuntimeHandle> {
        self.guard_callback()?;
        let handle = JsRuntimeHandle::from_raw(registry::next_owned_handle());
        self.state
            .borrow_mut()
            .runtimes
            .insert(handle, RuntimeState::new(attributes, self.options.clone()));
        log::trace!(target: "msie::embedded", "created {} runtime {:?} ({:?})", self.variant, handle, attributes);
        Ok(handle)
    }

    fn dispose_runtime(&self, runtime: JsRuntimeHandle) -> Status<()> {
        self.guard_callback()?;
        let mut state = self.state.borrow_mut();
        let current = state.current;
        let entry = state
            .runtimes
            .get(&runtime)
            .ok_or_else(|| registry::unknown(runtime.as_raw()))?;
        let in_use = entry.contexts.contains_key(&current)
            || entry.contexts.values().any(|context| context.ref_count > 0);
        if in_use {
            return Err(JsErrorCode::RuntimeInUse);
        }

        if let Some(removed) = state.runtimes.remove(&runtime) {
            for context in removed.contexts.keys() {
                state.owners.remove(context);
                registry::release(context.as_raw());
            }
        }
        registry::release(runtime.as_raw());
        log::trace!(target: "msie::embedded", "disposed runtime {:?}", runtime);
        Ok(())
    }

    fn collect_garbage(&self, runtime: JsRuntimeHandle) -> Status<()> {
        self.guard_callback()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .runtimes
            .get(&runtime)
            .ok_or_else(|| registry::unknown(runtime.as_raw()))?;
        if entry.heap_locked() {
            return Err(JsErrorCode::HeapEnumInProgress);
        }
        let idle: Vec<JsContextRef> = entry.contexts.keys().copied().collect();
        for context in idle {
            state.collect_if_unreferenced(context);
        }
        boa_gc::force_collect();
        Ok(())
    }

    fn runtime_memory_usage(&self, runtime: JsRuntimeHandle) -> Status<usize> {
        self.with_runtime(runtime, |runtime| Ok(runtime.memory_usage()))
    }

    fn disable_runtime_execution(&self, runtime: JsRuntimeHandle) -> Status<()> {
        self.with_runtime(runtime, |runtime| runtime.shared.interrupt.disable_execution())
    }

    fn enable_runtime_execution(&self, runtime: JsRuntimeHandle) -> Status<()> {
        self.with_runtime(runtime, |runtime| {
            runtime.shared.interrupt.enable();
            if runtime.shared.exception.as_ref().map(|e| e.terminated).unwrap_or(false) {
                runtime.shared.exception = None;
            }
            Ok(())
        })
    }

    fn is_runtime_execution_disabled(&self, runtime: JsRuntimeHandle) -> Status<bool> {
        self.with_runtime(runtime, |runtime| Ok(runtime.shared.interrupt.is_disabled()))
    }

    fn interrupt_handle(&self, runtime: JsRuntimeHandle) -> Status<Arc<dyn RuntimeInterrupt>> {
        self.with_runtime(runtime, |runtime| {
            let handle: Arc<dyn RuntimeInterrupt> = runtime.shared.interrupt.clone();
            Ok(handle)
        })
    }

    // ========================================================================
    // Context
    // ========================================================================

    fn create_context(&self, runtime: JsRuntimeHandle) -> Status<JsContextRef> {
        self.guard_callback()?;
        let mut state = self.state.borrow_mut();
        let entry = state
            .runtimes
            .get_mut(&runtime)
            .ok_or_else(|| registry::unknown(runtime.as_raw()))?;

        let mut engine = entry.options.new_engine();
        if entry.shared.attributes.contains(JsRuntimeAttributes::DISABLE_EVAL) {
            convert::disable_eval(&mut engine);
        }
        let context = JsContextRef::from_raw(registry::next_owned_handle());
        entry.contexts.insert(context, ContextState::new(engine));
        state.owners.insert(context, runtime);
        log::trace!(target: "msie::embedded", "created context {:?} in {:?}", context, runtime);
        Ok(context)
    }

    fn context_add_ref(&self, context: JsContextRef) -> Status<u32> {
        let mut state = self.state.borrow_mut();
        let entry = state.context_mut(context)?;
        entry.ref_count += 1;
        Ok(entry.ref_count)
    }

    fn context_release(&self, context: JsContextRef) -> Status<u32> {
        let mut state = self.state.borrow_mut();
        let entry = state.context_mut(context)?;
        if entry.ref_count == 0 {
            return Err(JsErrorCode::InvalidArgument);
        }
        entry.ref_count -= 1;
        let count = entry.ref_count;
        if count == 0 {
            state.collect_if_unreferenced(context);
        }
        Ok(count)
    }

    fn value_add_ref(&self, value: JsValueRef) -> Status<u32> {
        self.guard_callback()?;
        self.state.borrow_mut().value_owner(value)?.add_ref(value)
    }

    fn value_release(&self, value: JsValueRef) -> Status<u32> {
        self.guard_callback()?;
        let mut state = self.state.borrow_mut();
        let current = state.current;
        let owner = state.value_owner(value)?;
        let count = owner.release(value)?;
        if count == 0 && !current.is_valid() {
            owner.release_scoped_values();
        }
        Ok(count)
    }

    fn current_context(&self) -> Status<JsContextRef> {
        Ok(self.state.borrow().current)
    }

    fn set_current_context(&self, context: JsContextRef) -> Status<()> {
        self.guard_callback()?;
        let mut state = self.state.borrow_mut();
        if context.is_valid() {
            state.owner(context)?;
        }
        let previous = std::mem::replace(&mut state.current, context);
        if context.is_valid() {
            state.touched.insert(context);
        } else {
            state.release_scoped_values();
        }
        if previous != context {
            state.collect_if_unreferenced(previous);
        }
        Ok(())
    }

    fn context_runtime(&self, context: JsContextRef) -> Status<JsRuntimeHandle> {
        self.state.borrow().owner(context)
    }

    fn idle(&self) -> Status<u32> {
        let elapsed = u32::try_from(self.started.elapsed().as_millis()).unwrap_or(u32::MAX);
        self.with_context(QUERY, |scope| {
            if !scope.runtime.attributes.contains(JsRuntimeAttributes::ENABLE_IDLE_PROCESSING) {
                return Err(JsErrorCode::IdleNotEnabled);
            }
            boa_gc::force_collect();
            Ok(elapsed.saturating_add(1000))
        })
    }

    // ========================================================================
    // Scripts
    // ========================================================================

    fn parse_script(&self, script: &str, _source_context: JsSourceContext, source_url: &str) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let (compiled, script_id) = scope.parse(script, source_url)?;
            Ok(scope.context.register_script(compiled, script_id))
        })
    }

    fn run_script(&self, script: &str, _source_context: JsSourceContext, source_url: &str) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let (compiled, script_id) = scope.parse(script, source_url)?;
            scope.run(&compiled, script_id)
        })
    }

    fn serialize_script(&self, script: &str, buffer: &mut [u8]) -> Status<u64> {
        self.with_context(MUTATE, |scope| {
            if scope.context.debugging {
                return Err(JsErrorCode::CannotSerializeDebugScript);
            }
            let compiled = scope.compile(script, "")?;
            let bytes = envelope::encode(script, scope.runtime.attributes.bits());
            if !buffer.is_empty() && buffer.len() >= bytes.len() {
                buffer[..bytes.len()].copy_from_slice(&bytes);
                scope.context.code_cache.insert(envelope::digest(script), compiled);
            }
            Ok(bytes.len() as u64)
        })
    }

    fn parse_serialized_script(
        &self,
        script: &str,
        buffer: &[u8],
        _source_context: JsSourceContext,
        source_url: &str,
    ) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let (compiled, script_id) = scope.parse_serialized(script, buffer, source_url)?;
            Ok(scope.context.register_script(compiled, script_id))
        })
    }

    fn run_serialized_script(
        &self,
        script: &str,
        buffer: &[u8],
        _source_context: JsSourceContext,
        source_url: &str,
    ) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let (compiled, script_id) = scope.parse_serialized(script, buffer, source_url)?;
            scope.run(&compiled, script_id)
        })
    }

    // ========================================================================
    // Exceptions
    // ========================================================================

    fn has_exception(&self) -> Status<bool> {
        self.with_context(EXCEPTION, |scope| Ok(scope.runtime.exception.is_some()))
    }

    fn get_and_clear_exception(&self) -> Status<JsValueRef> {
        self.with_context(EXCEPTION, |scope| {
            let value = if scope.runtime.interrupt.is_disabled() {
                scope.runtime.exception.as_ref().map(|latched| latched.value.clone())
            } else {
                scope.runtime.exception.take().map(|latched| latched.value)
            };
            let value = value.ok_or(JsErrorCode::InvalidArgument)?;
            Ok(scope.context.register(value))
        })
    }

    fn set_exception(&self, exception: JsValueRef) -> Status<()> {
        self.with_context(EXCEPTION, |scope| {
            if scope.runtime.exception.is_some() {
                return Err(JsErrorCode::InExceptionState);
            }
            let value = scope.context.value(exception)?;
            scope.runtime.latch(value, false);
            Ok(())
        })
    }

    // ========================================================================
    // Property ids
    // ========================================================================

    fn property_id_from_name(&self, name: &str) -> Status<JsPropertyIdRef> {
        self.with_context(QUERY, |scope| Ok(scope.runtime.property_id(name)))
    }

    fn property_name_from_id(&self, id: JsPropertyIdRef) -> Status<String> {
        self.with_context(QUERY, |scope| scope.runtime.property_name(id).map(str::to_string))
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn undefined_value(&self) -> Status<JsValueRef> {
        self.with_context(QUERY, |scope| Ok(scope.context.register(JsValue::undefined())))
    }

    fn null_value(&self) -> Status<JsValueRef> {
        self.with_context(QUERY, |scope| Ok(scope.context.register(JsValue::null())))
    }

    fn bool_to_boolean(&self, value: bool) -> Status<JsValueRef> {
        self.with_context(QUERY, |scope| Ok(scope.context.register(JsValue::from(value))))
    }

    fn boolean_to_bool(&self, value: JsValueRef) -> Status<bool> {
        self.with_context(QUERY, |scope| {
            scope.context.value(value)?.as_boolean().ok_or(JsErrorCode::InvalidArgument)
        })
    }

    fn double_to_number(&self, value: f64) -> Status<JsValueRef> {
        self.with_context(QUERY, |scope| Ok(scope.context.register(JsValue::from(value))))
    }

    fn int_to_number(&self, value: i32) -> Status<JsValueRef> {
        self.with_context(QUERY, |scope| Ok(scope.context.register(JsValue::from(value))))
    }

    fn number_to_double(&self, value: JsValueRef) -> Status<f64> {
        self.with_context(QUERY, |scope| {
            scope.context.value(value)?.as_number().ok_or(JsErrorCode::InvalidArgument)
        })
    }

    fn pointer_to_string(&self, value: &str) -> Status<JsValueRef> {
        self.with_context(QUERY, |scope| Ok(scope.context.register(convert::string_value(value))))
    }

    fn string_to_pointer(&self, value: JsValueRef) -> Status<String> {
        self.with_context(QUERY, |scope| {
            scope
                .context
                .value(value)?
                .as_string()
                .map(|text| text.to_std_string_escaped())
                .ok_or(JsErrorCode::InvalidArgument)
        })
    }

    fn convert_value_to_string(&self, value: JsValueRef) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let input = scope.context.value(value)?;
            let result = input.to_string(&mut scope.context.engine).map(JsValue::from);
            scope.register_result(result)
        })
    }

    fn convert_value_to_number(&self, value: JsValueRef) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let input = scope.context.value(value)?;
            let result = input.to_number(&mut scope.context.engine).map(JsValue::from);
            scope.register_result(result)
        })
    }

    fn convert_value_to_boolean(&self, value: JsValueRef) -> Status<JsValueRef> {
        self.with_context(QUERY, |scope| {
            let input = scope.context.value(value)?;
            Ok(scope.context.register(JsValue::from(input.to_boolean())))
        })
    }

    fn value_type(&self, value: JsValueRef) -> Status<JsValueType> {
        self.with_context(QUERY, |scope| {
            let input = match scope.context.slot(value)? {
                Slot::Script { .. } => return Ok(JsValueType::Function),
                Slot::Value(input) => input.clone(),
            };
            Ok(convert::value_type(&input, scope.variant, &mut scope.context.engine))
        })
    }

    fn create_object(&self) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let object = JsObject::with_object_proto(scope.context.engine.intrinsics());
            Ok(scope.context.register(JsValue::from(object)))
        })
    }

    fn create_error(&self, message: JsValueRef) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let message = scope.context.value(message)?;
            let text = match message.to_string(&mut scope.context.engine) {
                Ok(text) => text.to_std_string_escaped(),
                Err(err) => {
                    let failure = convert::runtime_failure(err, &mut scope.context.engine);
                    return Err(scope.fail(failure));
                }
            };
            let error = JsNativeError::error()
                .with_message(text)
                .to_opaque(&mut scope.context.engine);
            Ok(scope.context.register(JsValue::from(error)))
        })
    }

    fn global_object(&self) -> Status<JsValueRef> {
        self.with_context(QUERY, |scope| {
            let global = scope.context.engine.global_object();
            Ok(scope.context.register(JsValue::from(global)))
        })
    }

    fn get_property(&self, object: JsValueRef, id: JsPropertyIdRef) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let target = scope.object(object)?;
            let key = scope.key(id)?;
            let result = target.get(key, &mut scope.context.engine);
            scope.register_result(result)
        })
    }

    fn set_property(&self, object: JsValueRef, id: JsPropertyIdRef, value: JsValueRef, use_strict_rules: bool) -> Status<()> {
        self.with_context(MUTATE, |scope| {
            let target = scope.object(object)?;
            let key = scope.key(id)?;
            let value = scope.context.value(value)?;
            match target.set(key, value, use_strict_rules, &mut scope.context.engine) {
                Ok(_) => Ok(()),
                Err(err) => {
                    let failure = convert::runtime_failure(err, &mut scope.context.engine);
                    Err(scope.fail(failure))
                }
            }
        })
    }

    fn has_property(&self, object: JsValueRef, id: JsPropertyIdRef) -> Status<bool> {
        self.with_context(QUERY, |scope| {
            let target = scope.object(object)?;
            let key = scope.key(id)?;
            match target.has_property(key, &mut scope.context.engine) {
                Ok(has) => Ok(has),
                Err(err) => {
                    let failure = convert::runtime_failure(err, &mut scope.context.engine);
                    Err(scope.fail(failure))
                }
            }
        })
    }

    fn delete_property(&self, object: JsValueRef, id: JsPropertyIdRef, use_strict_rules: bool) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let target = scope.object(object)?;
            let key = scope.key(id)?;
            let result = match target.delete_property_or_throw(key, &mut scope.context.engine) {
                Err(_) if !use_strict_rules => Ok(false),
                other => other,
            };
            scope.register_result(result.map(JsValue::from))
        })
    }

    fn call_function(&self, function: JsValueRef, arguments: &[JsValueRef]) -> Status<JsValueRef> {
        self.with_context(MUTATE, |scope| {
            let (this, rest) = arguments.split_first().ok_or(JsErrorCode::InvalidArgument)?;
            let callee = match scope.context.slot(function)? {
                Slot::Script { script, script_id } => Callee::Script(script.clone(), *script_id),
                Slot::Value(value) => match value.as_object() {
                    Some(object) if object.is_callable() => Callee::Function(object.clone()),
                    _ => return Err(JsErrorCode::InvalidArgument),
                },
            };

            match callee {
                Callee::Script(script, script_id) => scope.run(&script, script_id),
                Callee::Function(callee) => {
                    let this = scope.context.value(*this)?;
                    let args = rest
                        .iter()
                        .map(|arg| scope.context.value(*arg))
                        .collect::<Status<Vec<_>>>()?;
                    let function_id = function.as_raw() as u32;
                    let result = {
                        let _trace = scope.events.call(0, function_id);
                        callee.call(&this, &args, &mut scope.context.engine)
                    };
                    scope.finish(result)
                }
            }
        })
    }

    // ========================================================================
    // Diagnostics
    // ========================================================================

    fn start_debugging(&self, application: DebugApplication) -> Status<()> {
        let accepted = match (self.variant, application) {
            (JsRtVariant::Edge, DebugApplication::Unified) => true,
            (JsRtVariant::Ie, DebugApplication::Bits64(_)) => cfg!(target_pointer_width = "64"),
            (JsRtVariant::Ie, DebugApplication::Bits32(_)) => cfg!(target_pointer_width = "32"),
            _ => false,
        };
        if !accepted {
            return Err(JsErrorCode::InvalidArgument);
        }
        self.with_context(QUERY, |scope| {
            if scope.context.debugging {
                return Err(JsErrorCode::AlreadyDebuggingContext);
            }
            scope.context.debugging = true;
            Ok(())
        })
    }

    fn start_profiling(&self, callback: ProfilerSink, event_mask: ProfilerEventMask, context: u32) -> Status<()> {
        let ProfilerSink::Host(sink) = callback else {
            return Err(JsErrorCode::InvalidArgument);
        };
        self.with_context(QUERY, |scope| {
            if scope.context.profiler.is_some() {
                return Err(JsErrorCode::AlreadyProfilingContext);
            }
            scope.context.profiler = Some(Profiler {
                sink: sink.clone(),
                mask: event_mask,
            });
            scope.events = EventQueue::to_sink(sink, ProfilerEvent::Initialize(context));
            Ok(())
        })
    }

    fn stop_profiling(&self, reason: i32) -> Status<()> {
        self.with_context(EXCEPTION, |scope| {
            if let Some(profiler) = scope.context.profiler.take() {
                scope.events = EventQueue::to_sink(profiler.sink, ProfilerEvent::Shutdown(reason));
            }
            Ok(())
        })
    }

    fn enumerate_heap(&self) -> Status<Box<dyn HeapEnumerator>> {
        self.with_context(QUERY, |scope| {
            if scope.context.heap_lock.get() {
                return Err(JsErrorCode::HeapEnumInProgress);
            }

            let entries: Vec<(usize, Option<JsValue>)> = scope
                .context
                .slots()
                .map(|(handle, slot)| match slot {
                    Slot::Value(value) => (handle.as_raw(), Some(value.clone())),
                    Slot::Script { .. } => (handle.as_raw(), None),
                })
                .collect();

            let mut objects = Vec::new();
            for (object_id, value) in entries {
                let kind = match value {
                    Some(value) => convert::value_type(&value, scope.variant, &mut scope.context.engine),
                    None => JsValueType::Function,
                };
                if kind.is_object() {
                    objects.push(HeapObjectInfo {
                        object_id,
                        size: 64,
                        type_name_id: kind as u32,
                        type_name: Some(format!("{:?}", kind)),
                        flags: 0,
                    });
                }
            }
            objects.sort_by_key(|object| object.object_id);

            let enumerator = SnapshotHeapEnumerator::new(objects, scope.context.heap_lock.clone());
            Ok(Box::new(enumerator) as Box<dyn HeapEnumerator>)
        })
    }

    fn is_enumerating_heap(&self) -> Status<bool> {
        self.with_context(EXCEPTION, |scope| Ok(scope.context.heap_lock.get()))
    }
}
