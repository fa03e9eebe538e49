//! Unified engine facade
//!
//! `MsieJsEngine` picks one backend from the settings' engine mode and
//! exposes the same evaluate/execute/call/variable surface over all of them.
//! Values cross the boundary as [`HostValue`].

mod activescript_engine;
mod host_value;
mod inner;
mod jsrt_engine;
mod mode;
mod settings;

use std::fmt;
use std::fs;
use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use msie_embedded::{EmbeddedActiveScript, EmbeddedChakra};
use msie_sys::{ChakraLibrary, JsRtApi, JsRtVariant, LoadError, RuntimeInterrupt};

pub use host_value::HostValue;
pub use inner::PrecompiledScript;
pub use mode::JsEngineMode;
pub use settings::{JsEngineSettings, ProviderSettings, RuntimeConfig};

use activescript_engine::ChakraActiveScriptJsEngine;
use inner::InnerJsEngine;
use jsrt_engine::ChakraJsRtJsEngine;

use crate::error::{EngineResult, JsEngineError, UsageError};
use crate::jsrt::{Edge, Ie};

/// Document name used when the caller gives none.
const DEFAULT_DOCUMENT_NAME: &str = "Script Document";

/// A JavaScript engine of one mode.
///
/// Not thread-safe: every call runs on the creating thread. Use
/// [`MsieJsEngine::interrupt_handle`] to stop a running script from elsewhere.
pub struct MsieJsEngine {
    inner: Box<dyn InnerJsEngine>,
}

impl MsieJsEngine {
    /// Create the engine `settings` ask for. `Auto` takes Edge JsRt and
    /// falls back to IE JsRt when the Edge library cannot be loaded.
    pub fn new(settings: JsEngineSettings) -> EngineResult<Self> {
        let (first, rest) = match settings.engine_mode.candidates().split_first() {
            Some(split) => split,
            None => return Err(UsageError::InvalidArgument.into()),
        };
        let mut tried = *first;
        let mut inner = Self::create(&settings, tried);
        for &fallback in rest {
            match inner {
                Err(JsEngineError::Load(err)) => {
                    log::info!(target: "msie::engine", "{} unavailable ({}), trying {}", tried, err, fallback);
                    tried = fallback;
                    inner = Self::create(&settings, tried);
                }
                _ => break,
            }
        }
        let inner = inner?;
        log::info!(target: "msie::engine", "created {} engine ({:?} provider)", inner.mode(), settings.provider);
        Ok(Self { inner })
    }

    fn create(settings: &JsEngineSettings, mode: JsEngineMode) -> EngineResult<Box<dyn InnerJsEngine>> {
        let attributes = settings.runtime.attributes();
        let inner: Box<dyn InnerJsEngine> = match mode {
            JsEngineMode::ChakraIeJsRt => {
                let api = jsrt_provider(settings, JsRtVariant::Ie)?;
                Box::new(ChakraJsRtJsEngine::<Ie>::new(api, attributes)?)
            }
            JsEngineMode::ChakraEdgeJsRt | JsEngineMode::Auto => {
                let api = jsrt_provider(settings, JsRtVariant::Edge)?;
                Box::new(ChakraJsRtJsEngine::<Edge>::new(api, attributes)?)
            }
            JsEngineMode::ChakraActiveScript => match &settings.provider {
                ProviderSettings::Embedded => {
                    let engine = Rc::new(EmbeddedActiveScript::with_options(settings.embedded.clone()));
                    Box::new(ChakraActiveScriptJsEngine::new(engine)?)
                }
                ProviderSettings::System { .. } => {
                    return Err(LoadError::Unsupported("the system ActiveScript engine".to_string()).into())
                }
            },
        };
        Ok(inner)
    }

    /// An engine of `mode` with default settings otherwise.
    pub fn with_mode(mode: JsEngineMode) -> EngineResult<Self> {
        Self::new(JsEngineSettings::with_mode(mode))
    }

    /// The concrete mode; never `Auto`.
    pub fn mode(&self) -> JsEngineMode {
        self.inner.mode()
    }

    // ========================================================================
    // Scripts
    // ========================================================================

    pub fn evaluate(&self, expression: &str) -> EngineResult<HostValue> {
        non_empty(expression, "expression")?;
        self.inner.evaluate(expression, DEFAULT_DOCUMENT_NAME)
    }

    pub fn evaluate_with_name(&self, expression: &str, document_name: &str) -> EngineResult<HostValue> {
        non_empty(expression, "expression")?;
        self.inner.evaluate(expression, document_name)
    }

    pub fn evaluate_as<T>(&self, expression: &str) -> EngineResult<T>
    where
        T: TryFrom<HostValue, Error = JsEngineError>,
    {
        T::try_from(self.evaluate(expression)?)
    }

    pub fn execute(&self, code: &str) -> EngineResult<()> {
        non_empty(code, "code")?;
        self.inner.execute(code, DEFAULT_DOCUMENT_NAME)
    }

    pub fn execute_with_name(&self, code: &str, document_name: &str) -> EngineResult<()> {
        non_empty(code, "code")?;
        self.inner.execute(code, document_name)
    }

    /// Read and execute a script file; the file name is the document name.
    pub fn execute_file<P: AsRef<Path>>(&self, path: P) -> EngineResult<()> {
        let path = path.as_ref();
        let code = fs::read_to_string(path)?;
        self.execute_with_name(&code, &path.display().to_string())
    }

    pub fn precompile(&self, code: &str) -> EngineResult<PrecompiledScript> {
        non_empty(code, "code")?;
        self.inner.precompile(code, DEFAULT_DOCUMENT_NAME)
    }

    pub fn precompile_with_name(&self, code: &str, document_name: &str) -> EngineResult<PrecompiledScript> {
        non_empty(code, "code")?;
        self.inner.precompile(code, document_name)
    }

    pub fn execute_precompiled(&self, script: &PrecompiledScript) -> EngineResult<()> {
        self.inner.execute_precompiled(script)
    }

    // ========================================================================
    // Functions and variables
    // ========================================================================

    pub fn call_function(&self, name: &str, args: &[HostValue]) -> EngineResult<HostValue> {
        valid_name(name)?;
        self.inner.call_function(name, args)
    }

    pub fn call_function_as<T>(&self, name: &str, args: &[HostValue]) -> EngineResult<T>
    where
        T: TryFrom<HostValue, Error = JsEngineError>,
    {
        T::try_from(self.call_function(name, args)?)
    }

    /// True when the global exists and is not `undefined`.
    pub fn has_variable(&self, name: &str) -> EngineResult<bool> {
        valid_name(name)?;
        self.inner.has_variable(name)
    }

    pub fn get_variable_value(&self, name: &str) -> EngineResult<HostValue> {
        valid_name(name)?;
        self.inner.get_variable_value(name)
    }

    pub fn get_variable_value_as<T>(&self, name: &str) -> EngineResult<T>
    where
        T: TryFrom<HostValue, Error = JsEngineError>,
    {
        T::try_from(self.get_variable_value(name)?)
    }

    pub fn set_variable_value(&self, name: &str, value: impl Into<HostValue>) -> EngineResult<()> {
        valid_name(name)?;
        self.inner.set_variable_value(name, &value.into())
    }

    /// Delete the global, or set it to `undefined` when it cannot be deleted.
    pub fn remove_variable(&self, name: &str) -> EngineResult<()> {
        valid_name(name)?;
        self.inner.remove_variable(name)
    }

    // ========================================================================
    // Engine
    // ========================================================================

    pub fn collect_garbage(&self) -> EngineResult<()> {
        self.inner.collect_garbage()
    }

    /// Handle that stops a running script from another thread.
    ///
    /// `None` unless the runtime allows script interrupts.
    pub fn interrupt_handle(&self) -> EngineResult<Option<Arc<dyn RuntimeInterrupt>>> {
        self.inner.interrupt_handle()
    }
}

impl fmt::Debug for MsieJsEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MsieJsEngine").field("mode", &self.mode()).finish()
    }
}

fn jsrt_provider(settings: &JsEngineSettings, variant: JsRtVariant) -> EngineResult<Rc<dyn JsRtApi>> {
    let api: Rc<dyn JsRtApi> = match &settings.provider {
        ProviderSettings::Embedded => Rc::new(EmbeddedChakra::with_options(variant, settings.embedded.clone())),
        ProviderSettings::System { library_path: None } => Rc::new(ChakraLibrary::load(variant)?),
        ProviderSettings::System {
            library_path: Some(path),
        } => Rc::new(ChakraLibrary::load_from(variant, path)?),
    };
    Ok(api)
}

fn non_empty(text: &str, what: &'static str) -> EngineResult<()> {
    if text.trim().is_empty() {
        return Err(UsageError::EmptyArgument(what).into());
    }
    Ok(())
}

/// Identifier rules: a letter, `_` or `$`, then letters, digits, `_` or `$`.
fn valid_name(name: &str) -> EngineResult<()> {
    let mut chars = name.chars();
    let valid = match chars.next() {
        Some(first) => {
            (first.is_alphabetic() || first == '_' || first == '$')
                && chars.all(|c| c.is_alphanumeric() || c == '_' || c == '$')
        }
        None => false,
    };
    if !valid {
        return Err(UsageError::InvalidName(name.to_string()).into());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_name_validation() {
        assert!(valid_name("price").is_ok());
        assert!(valid_name("_x$1").is_ok());
        assert!(matches!(valid_name(""), Err(JsEngineError::Usage(UsageError::InvalidName(_)))));
        assert!(matches!(valid_name("1st"), Err(JsEngineError::Usage(UsageError::InvalidName(_)))));
        assert!(matches!(valid_name("a-b"), Err(JsEngineError::Usage(UsageError::InvalidName(_)))));
    }

    #[test]
    fn test_auto_mode_is_edge() {
        let engine = MsieJsEngine::new(JsEngineSettings::default()).unwrap();
        assert_eq!(engine.mode(), JsEngineMode::ChakraEdgeJsRt);
    }

    #[test]
    fn test_auto_reports_load_error_after_fallback() {
        let mut settings = JsEngineSettings::default();
        settings.provider = ProviderSettings::System {
            library_path: Some("/nonexistent/chakra.dll".into()),
        };
        assert!(matches!(MsieJsEngine::new(settings), Err(JsEngineError::Load(_))));
    }

    #[test]
    fn test_system_activescript_is_unsupported() {
        let mut settings = JsEngineSettings::with_mode(JsEngineMode::ChakraActiveScript);
        settings.provider = ProviderSettings::System { library_path: None };
        assert!(matches!(MsieJsEngine::new(settings), Err(JsEngineError::Load(LoadError::Unsupported(_)))));
    }
}
