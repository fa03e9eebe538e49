//! JsRt flavors
//!
//! IE (jscript9) and Edge (chakra) share the JsRt call surface but differ in
//! debugger attachment and in the value types they report. The flavor is a
//! type parameter so the flavor-specific calls only exist where they apply.

use msie_sys::{JsRtVariant, JsValueType};

/// Compile-time JsRt flavor marker.
pub trait JsRtFlavor: 'static {
    const VARIANT: JsRtVariant;

    /// Whether this flavor can report `value_type`.
    fn supports_value_type(value_type: JsValueType) -> bool;
}

/// jscript9.dll, the IE11 JsRt engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ie;

/// chakra.dll, the Edge JsRt engine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Edge;

impl JsRtFlavor for Ie {
    const VARIANT: JsRtVariant = JsRtVariant::Ie;

    fn supports_value_type(value_type: JsValueType) -> bool {
        !matches!(
            value_type,
            JsValueType::Symbol | JsValueType::ArrayBuffer | JsValueType::TypedArray | JsValueType::DataView
        )
    }
}

impl JsRtFlavor for Edge {
    const VARIANT: JsRtVariant = JsRtVariant::Edge;

    fn supports_value_type(_value_type: JsValueType) -> bool {
        true
    }
}

/// Pointer width of the current process, in bits.
pub(crate) const PROCESS_BITS: u32 = usize::BITS;
