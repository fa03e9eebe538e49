//! Host script site

use std::cell::RefCell;

use msie_sys::activescript::{ActiveScriptSite, HResult, ScriptErrorInfo, ScriptState};

/// Site handed to the engine. Keeps the last reported error until the
/// binding layer collects it.
#[derive(Debug, Default)]
pub struct HostSite {
    pending: RefCell<Option<ScriptErrorInfo>>,
}

impl HostSite {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn take_error(&self) -> Option<ScriptErrorInfo> {
        self.pending.borrow_mut().take()
    }

    pub fn has_error(&self) -> bool {
        self.pending.borrow().is_some()
    }
}

impl ActiveScriptSite for HostSite {
    fn on_state_change(&self, state: ScriptState) {
        log::debug!(target: "msie::activescript", "script state changed to {:?}", state);
    }

    fn on_script_error(&self, error: &ScriptErrorInfo) -> HResult {
        log::debug!(
            target: "msie::activescript",
            "script error 0x{:08X} at {}:{}: {}",
            error.scode.as_u32(),
            error.line,
            error.column,
            error.description
        );
        *self.pending.borrow_mut() = Some(error.clone());
        HResult::S_OK
    }
}
