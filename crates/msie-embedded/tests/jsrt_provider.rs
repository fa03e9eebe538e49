//! Embedded JsRt provider tests
//!
//! These exercise the provider through the raw `JsRtApi` surface only, the
//! same way the binding layer drives it:
//! - exception latch and recovery
//! - context reference counts and the current-context slot
//! - serialization envelopes
//! - heap enumeration lock, profiling, debugging
//! - idle processing, disabled state, eval gating
//! - thread ownership of handles

use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::sync::mpsc;
use std::thread;

use msie_embedded::{EmbeddedChakra, EmbeddedOptions, ENVELOPE_MAGIC};
use msie_sys::{
    DebugApplication, JsContextRef, JsErrorCode, JsRtApi, JsRtVariant, JsRuntimeAttributes, JsRuntimeHandle,
    JsSourceContext, JsValueRef, JsValueType, ProfilerCallback, ProfilerEventMask, ProfilerScriptType, ProfilerSink,
};

fn enter(api: &EmbeddedChakra, attributes: JsRuntimeAttributes) -> (JsRuntimeHandle, JsContextRef) {
    let runtime = api.create_runtime(attributes).unwrap();
    let context = api.create_context(runtime).unwrap();
    api.context_add_ref(context).unwrap();
    api.set_current_context(context).unwrap();
    (runtime, context)
}

fn run(api: &EmbeddedChakra, code: &str) -> Result<JsValueRef, JsErrorCode> {
    api.run_script(code, JsSourceContext::NONE, "")
}

fn number(api: &EmbeddedChakra, code: &str) -> f64 {
    let value = run(api, code).unwrap();
    api.number_to_double(value).unwrap()
}

fn message_of(api: &EmbeddedChakra, error: JsValueRef) -> String {
    let id = api.property_id_from_name("message").unwrap();
    let message = api.get_property(error, id).unwrap();
    api.string_to_pointer(message).unwrap()
}

// ============================================================================
// Running script
// ============================================================================

#[test]
fn test_run_returns_last_expression() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    assert_eq!(number(&api, "7 * 8 - 20"), 36.0);
    let value = run(&api, "var price = 2.20; price -= 0.03; price").unwrap();
    let price = api.number_to_double(value).unwrap();
    assert!((price - 2.17).abs() < 1e-9);
}

#[test]
fn test_no_current_context() {
    let api = EmbeddedChakra::new(JsRtVariant::Ie);
    api.create_runtime(JsRuntimeAttributes::empty()).unwrap();
    assert_eq!(run(&api, "1").unwrap_err(), JsErrorCode::NoCurrentContext);
    assert_eq!(api.create_object().unwrap_err(), JsErrorCode::NoCurrentContext);
    assert_eq!(api.current_context(), Ok(JsContextRef::INVALID));
}

#[test]
fn test_call_function_passes_this_first() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    let add = run(&api, "(function (a, b) { return a + b; })").unwrap();
    let this = api.undefined_value().unwrap();
    let a = api.int_to_number(7).unwrap();
    let b = api.int_to_number(9).unwrap();
    let sum = api.call_function(add, &[this, a, b]).unwrap();
    assert_eq!(api.number_to_double(sum), Ok(16.0));
    assert_eq!(api.call_function(add, &[]), Err(JsErrorCode::InvalidArgument));
}

#[test]
fn test_parsed_script_runs_when_called() {
    let api = EmbeddedChakra::new(JsRtVariant::Ie);
    enter(&api, JsRuntimeAttributes::empty());
    let script = api.parse_script("var counter = (typeof counter === 'number' ? counter : 0) + 1; counter", JsSourceContext(1), "counter.js").unwrap();
    assert_eq!(api.value_type(script), Ok(JsValueType::Function));
    let this = api.undefined_value().unwrap();
    let first = api.call_function(script, &[this]).unwrap();
    let second = api.call_function(script, &[this]).unwrap();
    assert_eq!(api.number_to_double(first), Ok(1.0));
    assert_eq!(api.number_to_double(second), Ok(2.0));
}

// ============================================================================
// Exception latch
// ============================================================================

#[test]
fn test_exception_latch_and_recovery() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());

    assert_eq!(run(&api, "throw new Error('boom')").unwrap_err(), JsErrorCode::ScriptException);
    assert_eq!(api.has_exception(), Ok(true));
    assert_eq!(run(&api, "1").unwrap_err(), JsErrorCode::InExceptionState);
    assert_eq!(api.undefined_value().unwrap_err(), JsErrorCode::InExceptionState);

    let error = api.get_and_clear_exception().unwrap();
    assert_eq!(api.has_exception(), Ok(false));
    assert_eq!(message_of(&api, error), "boom");
    assert_eq!(number(&api, "1 + 1"), 2.0);
    assert_eq!(api.get_and_clear_exception(), Err(JsErrorCode::InvalidArgument));
}

#[test]
fn test_compile_error_is_annotated() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());

    assert_eq!(run(&api, "var = ;").unwrap_err(), JsErrorCode::ScriptCompile);
    let error = api.get_and_clear_exception().unwrap();
    assert_eq!(api.value_type(error), Ok(JsValueType::Error));
    let url = api.property_id_from_name("url").unwrap();
    assert!(api.has_property(error, url).unwrap());
}

#[test]
fn test_set_exception() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    let text = api.pointer_to_string("raised by host").unwrap();
    let error = api.create_error(text).unwrap();
    api.set_exception(error).unwrap();
    assert_eq!(api.set_exception(error), Err(JsErrorCode::InExceptionState));
    let pending = api.get_and_clear_exception().unwrap();
    assert_eq!(message_of(&api, pending), "raised by host");
}

#[test]
fn test_eval_disabled() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::DISABLE_EVAL);
    assert_eq!(run(&api, "eval('1 + 1')").unwrap_err(), JsErrorCode::ScriptEvalDisabled);
    api.get_and_clear_exception().unwrap();
    assert_eq!(number(&api, "2 + 2"), 4.0);
}

// ============================================================================
// Lifecycle
// ============================================================================

#[test]
fn test_context_freed_after_last_release() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    let runtime = api.create_runtime(JsRuntimeAttributes::empty()).unwrap();
    let context = api.create_context(runtime).unwrap();

    assert_eq!(api.context_add_ref(context), Ok(1));
    assert_eq!(api.context_add_ref(context), Ok(2));
    assert_eq!(api.context_release(context), Ok(1));
    assert_eq!(api.context_runtime(context), Ok(runtime));
    assert_eq!(api.context_release(context), Ok(0));
    assert_eq!(api.context_runtime(context), Err(JsErrorCode::InvalidArgument));
    assert_eq!(api.context_release(context), Err(JsErrorCode::InvalidArgument));
}

#[test]
fn test_current_context_survives_release() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    let (runtime, context) = enter(&api, JsRuntimeAttributes::empty());
    assert_eq!(api.context_release(context), Ok(0));
    assert_eq!(number(&api, "40 + 2"), 42.0);

    assert_eq!(api.dispose_runtime(runtime), Err(JsErrorCode::RuntimeInUse));
    api.set_current_context(JsContextRef::INVALID).unwrap();
    assert_eq!(api.context_runtime(context), Err(JsErrorCode::InvalidArgument));
    assert_eq!(api.dispose_runtime(runtime), Ok(()));
}

#[test]
fn test_dispose_with_referenced_context() {
    let api = EmbeddedChakra::new(JsRtVariant::Ie);
    let runtime = api.create_runtime(JsRuntimeAttributes::empty()).unwrap();
    let context = api.create_context(runtime).unwrap();
    api.context_add_ref(context).unwrap();
    assert_eq!(api.dispose_runtime(runtime), Err(JsErrorCode::RuntimeInUse));
    api.context_release(context).unwrap();
    assert_eq!(api.dispose_runtime(runtime), Ok(()));
    assert_eq!(api.collect_garbage(runtime), Err(JsErrorCode::InvalidArgument));
}

#[test]
fn test_contexts_have_independent_globals() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    let (runtime, first) = enter(&api, JsRuntimeAttributes::empty());
    run(&api, "var shared = 1;").unwrap();

    let second = api.create_context(runtime).unwrap();
    api.context_add_ref(second).unwrap();
    api.set_current_context(second).unwrap();
    let kind = run(&api, "typeof shared").unwrap();
    assert_eq!(api.string_to_pointer(kind).unwrap(), "undefined");

    api.set_current_context(first).unwrap();
    assert_eq!(number(&api, "shared"), 1.0);
}

#[test]
fn test_handle_from_other_thread() {
    let (handle_tx, handle_rx) = mpsc::channel();
    let (done_tx, done_rx) = mpsc::channel::<()>();
    let owner = thread::spawn(move || {
        let api = EmbeddedChakra::new(JsRtVariant::Edge);
        let runtime = api.create_runtime(JsRuntimeAttributes::empty()).unwrap();
        handle_tx.send(runtime.as_raw()).unwrap();
        done_rx.recv().unwrap();
    });

    let raw = handle_rx.recv().unwrap();
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    assert_eq!(
        api.create_context(JsRuntimeHandle::from_raw(raw)),
        Err(JsErrorCode::WrongThread)
    );
    done_tx.send(()).unwrap();
    owner.join().unwrap();
}

#[test]
fn test_idle_requires_attribute() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    assert_eq!(api.idle(), Err(JsErrorCode::IdleNotEnabled));

    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::ENABLE_IDLE_PROCESSING);
    assert!(api.idle().unwrap() >= 1000);
}

#[test]
fn test_disable_execution() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    let (runtime, _) = enter(&api, JsRuntimeAttributes::empty());
    assert_eq!(api.disable_runtime_execution(runtime), Err(JsErrorCode::CannotDisableExecution));

    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    let (runtime, _) = enter(&api, JsRuntimeAttributes::ALLOW_SCRIPT_INTERRUPT);
    let interrupt = api.interrupt_handle(runtime).unwrap();
    thread::scope(|scope| {
        scope.spawn(|| interrupt.disable_execution().unwrap());
    });
    assert_eq!(api.is_runtime_execution_disabled(runtime), Ok(true));
    assert_eq!(run(&api, "1").unwrap_err(), JsErrorCode::InDisabledState);

    api.enable_runtime_execution(runtime).unwrap();
    assert_eq!(number(&api, "3 * 3"), 9.0);
}

#[test]
fn test_memory_usage_grows() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    let (runtime, _) = enter(&api, JsRuntimeAttributes::empty());
    let before = api.runtime_memory_usage(runtime).unwrap();
    for index in 0..16 {
        api.property_id_from_name(&format!("name{index}")).unwrap();
        api.create_object().unwrap();
    }
    assert!(api.runtime_memory_usage(runtime).unwrap() > before);
    api.collect_garbage(runtime).unwrap();
}

#[test]
fn test_leaving_all_contexts_frees_unpinned_values() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    let (runtime, context) = enter(&api, JsRuntimeAttributes::empty());
    let baseline = api.runtime_memory_usage(runtime).unwrap();
    let pinned = run(&api, "'pinned'").unwrap();
    let scoped = run(&api, "'scoped'").unwrap();
    assert_eq!(api.value_add_ref(pinned), Ok(1));

    api.set_current_context(JsContextRef::INVALID).unwrap();
    assert_eq!(api.value_add_ref(scoped), Err(JsErrorCode::InvalidArgument));
    assert_eq!(api.value_add_ref(pinned), Ok(2));
    assert_eq!(api.value_release(pinned), Ok(1));

    api.set_current_context(context).unwrap();
    assert_eq!(api.string_to_pointer(pinned).unwrap(), "pinned");
    api.set_current_context(JsContextRef::INVALID).unwrap();

    assert_eq!(api.value_release(pinned), Ok(0));
    assert_eq!(api.value_release(pinned), Err(JsErrorCode::InvalidArgument));
    assert_eq!(api.runtime_memory_usage(runtime).unwrap(), baseline);
}

// ============================================================================
// Properties and values
// ============================================================================

#[test]
fn test_property_ids_are_interned_per_runtime() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    let first = api.property_id_from_name("foo").unwrap();
    let second = api.property_id_from_name("foo").unwrap();
    assert_eq!(first, second);
    assert_eq!(api.property_name_from_id(first).unwrap(), "foo");
    assert_ne!(api.property_id_from_name("bar").unwrap(), first);
}

#[test]
fn test_object_properties() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    let object = api.create_object().unwrap();
    let id = api.property_id_from_name("answer").unwrap();
    let value = api.int_to_number(42).unwrap();

    api.set_property(object, id, value, true).unwrap();
    assert!(api.has_property(object, id).unwrap());
    let read = api.get_property(object, id).unwrap();
    assert_eq!(api.number_to_double(read), Ok(42.0));

    let deleted = api.delete_property(object, id, true).unwrap();
    assert_eq!(api.boolean_to_bool(deleted), Ok(true));
    assert!(!api.has_property(object, id).unwrap());

    assert_eq!(api.get_property(value, id), Err(JsErrorCode::ArgumentNotObject));
    assert_eq!(api.boolean_to_bool(value), Err(JsErrorCode::InvalidArgument));
}

#[test]
fn test_delete_non_configurable() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    let object = run(&api, "var o = {}; Object.defineProperty(o, 'fixed', { value: 1 }); o").unwrap();
    let id = api.property_id_from_name("fixed").unwrap();

    let deleted = api.delete_property(object, id, false).unwrap();
    assert_eq!(api.boolean_to_bool(deleted), Ok(false));
    assert_eq!(api.delete_property(object, id, true), Err(JsErrorCode::ScriptException));
    api.get_and_clear_exception().unwrap();
}

#[test]
fn test_global_object_sees_script_variables() {
    let api = EmbeddedChakra::new(JsRtVariant::Ie);
    enter(&api, JsRuntimeAttributes::empty());
    run(&api, "var greeting = 'hello';").unwrap();
    let global = api.global_object().unwrap();
    let id = api.property_id_from_name("greeting").unwrap();
    let value = api.get_property(global, id).unwrap();
    assert_eq!(api.string_to_pointer(value).unwrap(), "hello");
}

#[test]
fn test_conversions() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    let number = api.double_to_number(2.5).unwrap();
    let text = api.convert_value_to_string(number).unwrap();
    assert_eq!(api.string_to_pointer(text).unwrap(), "2.5");

    let text = api.pointer_to_string("12").unwrap();
    let parsed = api.convert_value_to_number(text).unwrap();
    assert_eq!(api.number_to_double(parsed), Ok(12.0));

    let empty = api.pointer_to_string("").unwrap();
    let truthy = api.convert_value_to_boolean(empty).unwrap();
    assert_eq!(api.boolean_to_bool(truthy), Ok(false));
    let flag = api.bool_to_boolean(true).unwrap();
    assert_eq!(api.value_type(flag), Ok(JsValueType::Boolean));
    assert_eq!(api.value_type(api.null_value().unwrap()), Ok(JsValueType::Null));
}

#[test]
fn test_symbol_type_by_variant() {
    let edge = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&edge, JsRuntimeAttributes::empty());
    let symbol = run(&edge, "Symbol('s')").unwrap();
    assert_eq!(edge.value_type(symbol), Ok(JsValueType::Symbol));

    let ie = EmbeddedChakra::new(JsRtVariant::Ie);
    enter(&ie, JsRuntimeAttributes::empty());
    let symbol = run(&ie, "Symbol('s')").unwrap();
    assert_eq!(ie.value_type(symbol), Ok(JsValueType::Object));
}

// ============================================================================
// Serialization
// ============================================================================

#[test]
fn test_serialize_query_then_fill() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    let source = "function square(x) { return x * x; } square(12)";

    let required = api.serialize_script(source, &mut []).unwrap() as usize;
    let mut small = vec![0u8; required - 1];
    assert_eq!(api.serialize_script(source, &mut small).unwrap() as usize, required);
    assert!(small.iter().all(|byte| *byte == 0));

    let mut buffer = vec![0u8; required];
    api.serialize_script(source, &mut buffer).unwrap();
    assert_eq!(&buffer[..4], &ENVELOPE_MAGIC);

    let value = api.run_serialized_script(source, &buffer, JsSourceContext::NONE, "square.js").unwrap();
    assert_eq!(api.number_to_double(value), Ok(144.0));
    assert_eq!(
        api.run_serialized_script("1 + 1", &buffer, JsSourceContext::NONE, ""),
        Err(JsErrorCode::BadSerializedScript)
    );
}

#[test]
fn test_serialized_buffer_in_fresh_context() {
    let api = EmbeddedChakra::new(JsRtVariant::Ie);
    let (runtime, _) = enter(&api, JsRuntimeAttributes::empty());
    let source = "[1, 2, 3].length";
    let mut buffer = vec![0u8; api.serialize_script(source, &mut []).unwrap() as usize];
    api.serialize_script(source, &mut buffer).unwrap();

    let other = api.create_context(runtime).unwrap();
    api.context_add_ref(other).unwrap();
    api.set_current_context(other).unwrap();
    let script = api.parse_serialized_script(source, &buffer, JsSourceContext::NONE, "").unwrap();
    let this = api.undefined_value().unwrap();
    let value = api.call_function(script, &[this]).unwrap();
    assert_eq!(api.number_to_double(value), Ok(3.0));
}

// ============================================================================
// Debugging, profiling, heap enumeration
// ============================================================================

#[test]
fn test_debugging_rules() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    api.start_debugging(DebugApplication::Unified).unwrap();
    assert_eq!(api.start_debugging(DebugApplication::Unified), Err(JsErrorCode::AlreadyDebuggingContext));
    assert_eq!(api.serialize_script("1", &mut []), Err(JsErrorCode::CannotSerializeDebugScript));

    let ie = EmbeddedChakra::new(JsRtVariant::Ie);
    enter(&ie, JsRuntimeAttributes::empty());
    assert_eq!(ie.start_debugging(DebugApplication::Unified), Err(JsErrorCode::InvalidArgument));
}

#[derive(Default)]
struct Recorder {
    events: RefCell<Vec<String>>,
    reentry: RefCell<Option<Rc<EmbeddedChakra>>>,
    reentry_status: Cell<Option<JsErrorCode>>,
}

impl ProfilerCallback for Recorder {
    fn initialize(&self, context: u32) {
        self.events.borrow_mut().push(format!("initialize {context}"));
        if let Some(api) = self.reentry.borrow().as_ref() {
            self.reentry_status.set(api.create_object().err());
        }
    }

    fn shutdown(&self, reason: i32) {
        self.events.borrow_mut().push(format!("shutdown {reason}"));
    }

    fn script_compiled(&self, _script_id: u32, _kind: ProfilerScriptType) {
        self.events.borrow_mut().push("compiled".to_string());
    }

    fn on_function_enter(&self, _script_id: u32, _function_id: u32) {
        self.events.borrow_mut().push("enter".to_string());
    }

    fn on_function_exit(&self, _script_id: u32, _function_id: u32) {
        self.events.borrow_mut().push("exit".to_string());
    }
}

#[test]
fn test_profiling_events() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    enter(&api, JsRuntimeAttributes::empty());
    let recorder = Rc::new(Recorder::default());

    api.start_profiling(ProfilerSink::Host(recorder.clone()), ProfilerEventMask::TRACE_ALL, 7)
        .unwrap();
    assert_eq!(
        api.start_profiling(ProfilerSink::Host(recorder.clone()), ProfilerEventMask::TRACE_ALL, 7),
        Err(JsErrorCode::AlreadyProfilingContext)
    );
    run(&api, "1 + 1").unwrap();
    api.stop_profiling(0).unwrap();
    api.stop_profiling(0).unwrap();

    assert_eq!(
        *recorder.events.borrow(),
        vec!["initialize 7", "compiled", "enter", "exit", "shutdown 0"]
    );
}

#[test]
fn test_calls_from_profiler_callback() {
    let api = Rc::new(EmbeddedChakra::new(JsRtVariant::Ie));
    enter(&api, JsRuntimeAttributes::empty());
    let recorder = Rc::new(Recorder::default());
    *recorder.reentry.borrow_mut() = Some(api.clone());

    api.start_profiling(ProfilerSink::Host(recorder.clone()), ProfilerEventMask::empty(), 1)
        .unwrap();
    assert_eq!(recorder.reentry_status.get(), Some(JsErrorCode::InProfileCallback));
    api.stop_profiling(0).unwrap();
    recorder.reentry.borrow_mut().take();
    assert!(api.create_object().is_ok());
}

#[test]
fn test_heap_enumeration_lock() {
    let api = EmbeddedChakra::new(JsRtVariant::Edge);
    let (runtime, _) = enter(&api, JsRuntimeAttributes::empty());
    let object = api.create_object().unwrap();
    run(&api, "[1, 2]").unwrap();

    let mut heap = api.enumerate_heap().unwrap();
    assert_eq!(api.is_enumerating_heap(), Ok(true));
    assert_eq!(api.create_object().unwrap_err(), JsErrorCode::HeapEnumInProgress);
    assert_eq!(api.enumerate_heap().err(), Some(JsErrorCode::HeapEnumInProgress));
    assert_eq!(api.collect_garbage(runtime), Err(JsErrorCode::HeapEnumInProgress));

    let objects = heap.next(usize::MAX).unwrap();
    assert!(objects.iter().any(|info| info.object_id == object.as_raw()));
    assert!(objects.iter().any(|info| info.type_name.as_deref() == Some("Array")));
    assert!(heap.next(10).unwrap().is_empty());

    drop(heap);
    assert_eq!(api.is_enumerating_heap(), Ok(false));
    assert!(api.create_object().is_ok());
}

#[test]
fn test_recursion_limit_faults_runtime() {
    let options = EmbeddedOptions::default().with_recursion_limit(64);
    let api = EmbeddedChakra::with_options(JsRtVariant::Edge, options);
    enter(&api, JsRuntimeAttributes::empty());
    let status = run(&api, "function down(n) { return down(n + 1); } down(0)").unwrap_err();
    assert!(matches!(status, JsErrorCode::Fatal | JsErrorCode::ScriptException));
}
