//! Engine mode selection

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Which native engine backs a facade instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum JsEngineMode {
    /// The newest available engine: Edge JsRt, else IE JsRt
    #[default]
    Auto,
    /// jscript9 through JsRt
    ChakraIeJsRt,
    /// chakra through JsRt
    ChakraEdgeJsRt,
    /// jscript9 through the ActiveScript COM interfaces
    ChakraActiveScript,
}

impl JsEngineMode {
    pub const ALL: [JsEngineMode; 3] = [
        JsEngineMode::ChakraIeJsRt,
        JsEngineMode::ChakraEdgeJsRt,
        JsEngineMode::ChakraActiveScript,
    ];

    /// Concrete modes to try, in order. Only `Auto` has more than one; the
    /// later ones are tried when the library for an earlier one fails to load.
    pub fn candidates(self) -> &'static [JsEngineMode] {
        match self {
            JsEngineMode::Auto => &[JsEngineMode::ChakraEdgeJsRt, JsEngineMode::ChakraIeJsRt],
            JsEngineMode::ChakraIeJsRt => &[JsEngineMode::ChakraIeJsRt],
            JsEngineMode::ChakraEdgeJsRt => &[JsEngineMode::ChakraEdgeJsRt],
            JsEngineMode::ChakraActiveScript => &[JsEngineMode::ChakraActiveScript],
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            JsEngineMode::Auto => "auto",
            JsEngineMode::ChakraIeJsRt => "chakra-ie-jsrt",
            JsEngineMode::ChakraEdgeJsRt => "chakra-edge-jsrt",
            JsEngineMode::ChakraActiveScript => "chakra-active-script",
        }
    }
}

impl fmt::Display for JsEngineMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for JsEngineMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(JsEngineMode::Auto),
            "ie" | "chakra-ie-jsrt" => Ok(JsEngineMode::ChakraIeJsRt),
            "edge" | "chakra-edge-jsrt" => Ok(JsEngineMode::ChakraEdgeJsRt),
            "activescript" | "active-script" | "chakra-active-script" => Ok(JsEngineMode::ChakraActiveScript),
            other => Err(format!("unknown engine mode '{}'", other)),
        }
    }
}
