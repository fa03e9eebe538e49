//! Opaque JsRt handles
//!
//! All handles are address-sized and passed by value across the ABI. The zero
//! value is the invalid handle.

use std::fmt;

macro_rules! opaque_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[repr(transparent)]
        #[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
        pub struct $name(usize);

        impl $name {
            /// The invalid handle.
            pub const INVALID: Self = Self(0);

            /// Wrap a raw handle value.
            pub const fn from_raw(raw: usize) -> Self {
                Self(raw)
            }

            /// Raw handle value.
            pub const fn as_raw(self) -> usize {
                self.0
            }

            /// Whether the handle is non-zero.
            pub const fn is_valid(self) -> bool {
                self.0 != 0
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!(stringify!($name), "(0x{:x})"), self.0)
            }
        }
    };
}

opaque_handle!(
    /// Handle to a native runtime (`JsRuntimeHandle`).
    JsRuntimeHandle
);
opaque_handle!(
    /// Handle to a script context (`JsContextRef`).
    JsContextRef
);
opaque_handle!(
    /// Handle to a script value (`JsValueRef`).
    JsValueRef
);
opaque_handle!(
    /// Handle to an interned property name (`JsPropertyIdRef`).
    JsPropertyIdRef
);

/// Cookie identifying a script source to the debugger.
#[repr(transparent)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JsSourceContext(pub usize);

impl JsSourceContext {
    /// No source context (`JS_SOURCE_CONTEXT_NONE`).
    pub const NONE: Self = Self(usize::MAX);

    /// Whether a real cookie was supplied.
    pub fn is_some(self) -> bool {
        self != Self::NONE
    }
}

impl Default for JsSourceContext {
    fn default() -> Self {
        Self::NONE
    }
}
