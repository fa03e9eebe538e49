//! Facade scenarios shared by every engine mode
//!
//! Each mode gets its own module generated by `engine_tests!`, so a failure
//! names the mode it happened in.

use std::fs;
use std::thread;
use std::time::Duration;

use msie_engine::{
    ErrorKind, HostValue, JsEngineError, JsEngineMode, JsEngineSettings, MsieJsEngine, ScriptErrorCategory,
    UsageError,
};

fn engine(mode: JsEngineMode) -> MsieJsEngine {
    MsieJsEngine::with_mode(mode).unwrap()
}

fn assert_close(value: HostValue, expected: f64) {
    match value {
        HostValue::Double(actual) => assert!((actual - expected).abs() < 1e-9, "{} != {}", actual, expected),
        other => panic!("expected a double, got {:?}", other),
    }
}

macro_rules! engine_tests {
    ($name:ident, $mode:expr) => {
        mod $name {
            use super::*;

            const MODE: JsEngineMode = $mode;

            // ================================================================
            // Evaluation
            // ================================================================

            #[test]
            fn test_evaluate_integer() {
                let engine = engine(MODE);
                assert_eq!(engine.evaluate("7 * 8 - 20").unwrap(), HostValue::Int(36));
                assert_eq!(engine.evaluate_as::<i32>("7 * 8 - 20").unwrap(), 36);
            }

            #[test]
            fn test_evaluate_primitive_types() {
                let engine = engine(MODE);
                assert_eq!(engine.evaluate("undefined").unwrap(), HostValue::Undefined);
                assert_eq!(engine.evaluate("null").unwrap(), HostValue::Null);
                assert!(engine.evaluate_as::<bool>("5 > 3").unwrap());
                assert_close(engine.evaluate("0.5 + 0.25").unwrap(), 0.75);
                assert_eq!(
                    engine.evaluate_as::<String>("'Hello, ' + 'World!'").unwrap(),
                    "Hello, World!"
                );
                assert_eq!(engine.evaluate_as::<String>("'\\u041f\\u0440\\u0438'").unwrap(), "При");
            }

            #[test]
            fn test_evaluate_object_is_not_supported() {
                let engine = engine(MODE);
                let err = engine.evaluate("({ a: 1 })").unwrap_err();
                assert_eq!(err.kind(), ErrorKind::NotSupportedType);
                assert!(engine.evaluate("[1, 2]").is_err());
                assert!(engine.evaluate("(function () {})").is_err());
            }

            #[test]
            fn test_evaluate_wrong_type() {
                let engine = engine(MODE);
                let err = engine.evaluate_as::<i32>("'text'").unwrap_err();
                assert_eq!(err.kind(), ErrorKind::NotSupportedType);
            }

            #[test]
            fn test_empty_input_rejected() {
                let engine = engine(MODE);
                assert!(matches!(
                    engine.evaluate("   ").unwrap_err(),
                    JsEngineError::Usage(UsageError::EmptyArgument(_))
                ));
                assert!(matches!(
                    engine.execute("").unwrap_err(),
                    JsEngineError::Usage(UsageError::EmptyArgument(_))
                ));
            }

            // ================================================================
            // Execution
            // ================================================================

            #[test]
            fn test_execute_then_read() {
                let engine = engine(MODE);
                engine.set_variable_value("price", 2.20).unwrap();
                engine.execute("price -= 0.03;").unwrap();
                assert_close(engine.get_variable_value("price").unwrap(), 2.17);
            }

            #[test]
            fn test_execute_file() {
                let dir = tempfile::tempdir().unwrap();
                let path = dir.path().join("square.js");
                fs::write(&path, "function square(x) { return x * x; }").unwrap();

                let engine = engine(MODE);
                engine.execute_file(&path).unwrap();
                assert_eq!(engine.call_function_as::<i32>("square", &[HostValue::Int(12)]).unwrap(), 144);
            }

            #[test]
            fn test_missing_file() {
                let engine = engine(MODE);
                let err = engine.execute_file("/nonexistent/script.js").unwrap_err();
                assert!(matches!(err, JsEngineError::Io(_)));
            }

            #[test]
            fn test_compile_error() {
                let engine = engine(MODE);
                let err = engine.execute("var a = ;").unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Script);
                assert_eq!(err.as_script_error().unwrap().category, ScriptErrorCategory::Compile);
            }

            #[test]
            fn test_runtime_error_then_recovery() {
                let engine = engine(MODE);
                let err = engine.execute("throw new Error('broken');").unwrap_err();
                let script = err.as_script_error().unwrap();
                assert_eq!(script.category, ScriptErrorCategory::Runtime);
                assert!(script.message.contains("broken"));
                assert_eq!(engine.evaluate("1 + 1").unwrap(), HostValue::Int(2));
            }

            // ================================================================
            // Functions
            // ================================================================

            #[test]
            fn test_call_function() {
                let engine = engine(MODE);
                engine.execute("function add(a, b) { return a + b; }").unwrap();
                assert_eq!(
                    engine.call_function("add", &[HostValue::Int(7), HostValue::Int(9)]).unwrap(),
                    HostValue::Int(16)
                );
                assert_eq!(
                    engine.call_function_as::<String>("add", &["a".into(), "b".into()]).unwrap(),
                    "ab"
                );
            }

            #[test]
            fn test_call_function_without_arguments() {
                let engine = engine(MODE);
                engine.execute("function hello() { return 'Hello!'; }").unwrap();
                assert_eq!(engine.call_function_as::<String>("hello", &[]).unwrap(), "Hello!");
            }

            #[test]
            fn test_call_missing_function() {
                let engine = engine(MODE);
                let err = engine.call_function("nowhere", &[]).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Script);
            }

            #[test]
            fn test_call_with_invalid_name() {
                let engine = engine(MODE);
                let err = engine.call_function("not-a-name", &[]).unwrap_err();
                assert!(matches!(err, JsEngineError::Usage(UsageError::InvalidName(_))));
            }

            // ================================================================
            // Variables
            // ================================================================

            #[test]
            fn test_set_and_get_variables() {
                let engine = engine(MODE);
                engine.set_variable_value("count", 5).unwrap();
                engine.set_variable_value("ratio", 0.5).unwrap();
                engine.set_variable_value("title", "MSIE").unwrap();
                engine.set_variable_value("enabled", true).unwrap();

                assert_eq!(engine.get_variable_value_as::<i32>("count").unwrap(), 5);
                assert_eq!(engine.get_variable_value_as::<f64>("ratio").unwrap(), 0.5);
                assert_eq!(engine.get_variable_value_as::<String>("title").unwrap(), "MSIE");
                assert!(engine.get_variable_value_as::<bool>("enabled").unwrap());
                assert_eq!(engine.evaluate("count * 2").unwrap(), HostValue::Int(10));
            }

            #[test]
            fn test_has_variable() {
                let engine = engine(MODE);
                assert!(!engine.has_variable("maybe").unwrap());
                engine.execute("var maybe = 1; var nothing = undefined;").unwrap();
                assert!(engine.has_variable("maybe").unwrap());
                assert!(!engine.has_variable("nothing").unwrap());
            }

            #[test]
            fn test_remove_variable() {
                let engine = engine(MODE);
                engine.set_variable_value("loose", 1).unwrap();
                engine.remove_variable("loose").unwrap();
                assert!(!engine.has_variable("loose").unwrap());

                engine.execute("var declared = 2;").unwrap();
                engine.remove_variable("declared").unwrap();
                assert!(!engine.has_variable("declared").unwrap());
                assert_eq!(engine.get_variable_value("declared").unwrap(), HostValue::Undefined);

                engine.remove_variable("never_defined").unwrap();
            }

            #[test]
            fn test_removed_function_cannot_be_called() {
                let engine = engine(MODE);
                engine.execute("helper = function () { return 1; };").unwrap();
                assert_eq!(engine.call_function("helper", &[]).unwrap(), HostValue::Int(1));
                engine.remove_variable("helper").unwrap();
                let err = engine.call_function("helper", &[]).unwrap_err();
                assert_eq!(err.kind(), ErrorKind::Script);
            }

            #[test]
            fn test_undefined_variable_value() {
                let engine = engine(MODE);
                assert_eq!(engine.get_variable_value("absent").unwrap(), HostValue::Undefined);
            }

            // ================================================================
            // Engine
            // ================================================================

            #[test]
            fn test_mode_and_gc() {
                let engine = engine(MODE);
                assert_eq!(engine.mode(), MODE);
                engine.execute("var junk = []; for (var i = 0; i < 50; i++) junk.push({});").unwrap();
                engine.collect_garbage().unwrap();
            }

            #[test]
            fn test_engines_are_isolated() {
                let first = engine(MODE);
                let second = engine(MODE);
                first.set_variable_value("owner", "first").unwrap();
                assert!(!second.has_variable("owner").unwrap());
            }
        }
    };
}

engine_tests!(ie_jsrt, JsEngineMode::ChakraIeJsRt);
engine_tests!(edge_jsrt, JsEngineMode::ChakraEdgeJsRt);
engine_tests!(active_script, JsEngineMode::ChakraActiveScript);

// ============================================================================
// Mode-specific behavior
// ============================================================================

#[test]
fn test_precompiled_script_jsrt() {
    for mode in [JsEngineMode::ChakraIeJsRt, JsEngineMode::ChakraEdgeJsRt] {
        let engine = engine(mode);
        let script = engine.precompile("function twice(x) { return x * 2; }").unwrap();
        assert_eq!(script.mode(), mode);
        assert!(!script.buffer().is_empty());

        let other = self::engine(mode);
        other.execute_precompiled(&script).unwrap();
        assert_eq!(other.call_function_as::<i32>("twice", &[HostValue::Int(21)]).unwrap(), 42);
    }
}

#[test]
fn test_precompiled_script_for_other_mode() {
    let script = engine(JsEngineMode::ChakraIeJsRt).precompile("1").unwrap();
    let err = engine(JsEngineMode::ChakraEdgeJsRt).execute_precompiled(&script).unwrap_err();
    assert!(matches!(err, JsEngineError::Usage(UsageError::PrecompiledMismatch(_))));
}

#[test]
fn test_activescript_cannot_precompile() {
    let err = engine(JsEngineMode::ChakraActiveScript).precompile("1").unwrap_err();
    assert!(matches!(err, JsEngineError::Usage(UsageError::NotSupportedByBackend(_))));
}

#[test]
fn test_interrupt_handle_requires_setting() {
    assert!(engine(JsEngineMode::ChakraEdgeJsRt).interrupt_handle().unwrap().is_none());
    assert!(engine(JsEngineMode::ChakraActiveScript).interrupt_handle().unwrap().is_none());

    let mut settings = JsEngineSettings::with_mode(JsEngineMode::ChakraIeJsRt);
    settings.runtime.allow_script_interrupt = true;
    let engine = MsieJsEngine::new(settings).unwrap();
    assert!(engine.interrupt_handle().unwrap().is_some());
}

#[test]
fn test_interrupt_long_running_script() {
    let mut settings = JsEngineSettings::with_mode(JsEngineMode::ChakraEdgeJsRt);
    settings.runtime.allow_script_interrupt = true;
    let engine = MsieJsEngine::new(settings).unwrap();
    let handle = engine.interrupt_handle().unwrap().unwrap();

    let stopper = thread::spawn(move || {
        thread::sleep(Duration::from_millis(10));
        handle.disable_execution().unwrap();
    });
    let result = engine.execute("var n = 0; for (var i = 0; i < 1000000; i++) { n += i; }");
    stopper.join().unwrap();

    // An interrupt that lands after the loop finished terminates the next run.
    let next = engine.evaluate("1");
    match result {
        Ok(()) => assert!(matches!(next, Err(JsEngineError::Terminated(_)))),
        Err(err) => {
            assert!(matches!(err, JsEngineError::Terminated(_)));
            assert_eq!(next.unwrap(), HostValue::Int(1));
        }
    }
    assert_eq!(engine.evaluate("2").unwrap(), HostValue::Int(2));
}
