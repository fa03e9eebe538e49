//! MSIE native hosting surface
//!
//! Raw types shared by every script-engine provider:
//! - JsRt status codes, opaque handles and attribute sets (`status`, `handles`, `types`)
//! - The `JsRtApi` provider trait, one method per JsRt entry point (`api`)
//! - The legacy ActiveScript surface: HRESULTs, variants, site and dispatch traits (`activescript`)
//! - Cross-platform dynamic library loading (`loader`)
//! - The system provider that binds jscript9.dll / chakra.dll (`chakra`)

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

pub mod activescript;
pub mod api;
pub mod chakra;
pub mod handles;
pub mod loader;
pub mod status;
pub mod types;

pub use api::{JsRtApi, JsRtVariant};
pub use chakra::ChakraLibrary;
pub use handles::{JsContextRef, JsPropertyIdRef, JsRuntimeHandle, JsSourceContext, JsValueRef};
pub use loader::{Library, LoadError};
pub use status::{ErrorCategory, JsErrorCode, Status};
pub use types::{
    ComPtr, DebugApplication, HeapEnumerator, HeapObjectInfo, JsRuntimeAttributes, JsValueType,
    ProfilerCallback, ProfilerEventMask, ProfilerScriptType, ProfilerSink, RuntimeInterrupt,
};
