//! JsRt binding layer
//!
//! Typed ownership over the flat JsRt surface:
//! - `JsRuntime` and `JsContext` own native handles and release them on drop
//! - `JsContext::enter` makes a context current and restores the previous one
//! - `CurrentContext` carries every context-scoped operation, each one
//!   translated into a `JsEngineError` with the pending exception attached
//! - property ids are interned per runtime

mod context;
mod diagnostics;
mod flavor;
mod operations;
mod property_id;
mod runtime;
mod script;
mod translate;
mod value;

pub use context::{ContextScope, CurrentContext, JsContext};
pub use diagnostics::HeapSnapshot;
pub use flavor::{Edge, Ie, JsRtFlavor};
pub use property_id::{JsPropertyId, PropertyInterner};
pub use runtime::JsRuntime;
pub use value::JsValue;
