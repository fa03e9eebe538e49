//! MSIE JavaScript engine host
//!
//! Two layers over the native hosting surfaces in `msie-sys`:
//! - `jsrt` and `activescript`: the binding layer. Owned runtime and context
//!   handles, the current-context scope guard, property-id interning, the
//!   parse/run/serialize pipeline and translation of status codes and
//!   HRESULTs into [`JsEngineError`].
//! - `engine`: the unified facade. [`MsieJsEngine`] selects a backend from
//!   [`JsEngineSettings`] and marshals values as [`HostValue`].
//!
//! ```ignore
//! use msie_engine::{JsEngineMode, MsieJsEngine};
//!
//! let engine = MsieJsEngine::with_mode(JsEngineMode::ChakraIeJsRt)?;
//! engine.execute("function add(a, b) { return a + b; }")?;
//! let sum: i32 = engine.call_function_as("add", &[7.into(), 9.into()])?;
//! assert_eq!(sum, 16);
//! ```

#![warn(rust_2018_idioms)]

pub mod activescript;
pub mod engine;
pub mod error;
pub mod jsrt;

pub use engine::{
    HostValue, JsEngineMode, JsEngineSettings, MsieJsEngine, PrecompiledScript, ProviderSettings, RuntimeConfig,
};
pub use error::{
    EngineFault, EngineResult, ErrorKind, JsEngineError, NotSupportedTypeError, ScriptError, ScriptErrorCategory,
    SettingsError, UsageError,
};
pub use msie_embedded::EmbeddedOptions;
