//! Script value handles

use msie_sys::JsValueRef;

/// Handle to a script value.
///
/// Valid until no context is current any more. A value that has to outlive
/// that is pinned with `CurrentContext::add_ref` and unpinned with `release`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct JsValue(JsValueRef);

impl JsValue {
    pub fn from_raw(raw: JsValueRef) -> Self {
        JsValue(raw)
    }

    pub fn raw(self) -> JsValueRef {
        self.0
    }

    pub fn is_valid(self) -> bool {
        self.0.is_valid()
    }
}

impl From<JsValueRef> for JsValue {
    fn from(raw: JsValueRef) -> Self {
        JsValue(raw)
    }
}
