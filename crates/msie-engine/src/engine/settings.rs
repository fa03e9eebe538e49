//! Engine settings
//!
//! Loaded from TOML:
//!
//! ```toml
//! engine_mode = "chakra-ie-jsrt"
//!
//! [provider]
//! kind = "system"
//! library_path = "C:\\Windows\\System32\\jscript9.dll"
//!
//! [runtime]
//! allow_script_interrupt = true
//!
//! [embedded]
//! recursion_limit = 256
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use msie_embedded::EmbeddedOptions;
use msie_sys::JsRuntimeAttributes;
use serde::{Deserialize, Serialize};

use super::mode::JsEngineMode;
use crate::error::SettingsError;

/// Where the native engine comes from.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderSettings {
    /// In-process engine
    #[default]
    Embedded,
    /// The system jscript9.dll / chakra.dll
    System {
        /// Overrides the library found on the search path
        #[serde(default)]
        library_path: Option<PathBuf>,
    },
}

/// Runtime creation options.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    pub disable_background_work: bool,
    pub allow_script_interrupt: bool,
    pub enable_idle_processing: bool,
    pub disable_native_code_generation: bool,
    pub disable_eval: bool,
}

impl RuntimeConfig {
    pub fn attributes(&self) -> JsRuntimeAttributes {
        let mut attributes = JsRuntimeAttributes::empty();
        attributes.set(JsRuntimeAttributes::DISABLE_BACKGROUND_WORK, self.disable_background_work);
        attributes.set(JsRuntimeAttributes::ALLOW_SCRIPT_INTERRUPT, self.allow_script_interrupt);
        attributes.set(JsRuntimeAttributes::ENABLE_IDLE_PROCESSING, self.enable_idle_processing);
        attributes.set(
            JsRuntimeAttributes::DISABLE_NATIVE_CODE_GENERATION,
            self.disable_native_code_generation,
        );
        attributes.set(JsRuntimeAttributes::DISABLE_EVAL, self.disable_eval);
        attributes
    }
}

/// Settings of one facade engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct JsEngineSettings {
    /// `auto` with the system provider loads chakra.dll, or jscript9.dll
    /// when chakra.dll is missing.
    pub engine_mode: JsEngineMode,
    pub provider: ProviderSettings,
    pub runtime: RuntimeConfig,
    pub embedded: EmbeddedOptions,
}

impl JsEngineSettings {
    pub fn with_mode(engine_mode: JsEngineMode) -> Self {
        Self {
            engine_mode,
            ..Self::default()
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self, SettingsError> {
        let settings: Self = toml::from_str(text)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, SettingsError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SettingsError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn to_toml_string(&self) -> Result<String, SettingsError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn validate(&self) -> Result<(), SettingsError> {
        if self.embedded.recursion_limit == 0 {
            return Err(SettingsError::Invalid("embedded.recursion_limit must be positive".to_string()));
        }
        if self.embedded.loop_iteration_limit == 0 {
            return Err(SettingsError::Invalid(
                "embedded.loop_iteration_limit must be positive".to_string(),
            ));
        }
        Ok(())
    }
}
