//! ActiveScript session
//!
//! Owns one initialized engine and its site. There is no context to make
//! current: the engine's thread state stands in for it, and script may only
//! be parsed while the engine is not already running script.

use std::cell::RefCell;
use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use msie_sys::activescript::{
    ActiveScript, DispId, DispatchFlags, HResult, ScriptDispatch, ScriptState, ScriptTextFlags, ScriptThreadState,
    Variant,
};

use super::hresult::check;
use super::site::HostSite;
use crate::error::{EngineResult, UsageError};

pub struct ActiveScriptSession {
    engine: Rc<dyn ActiveScript>,
    site: Rc<HostSite>,
    global: Rc<dyn ScriptDispatch>,
    dispids: RefCell<HashMap<String, DispId>>,
}

impl fmt::Debug for ActiveScriptSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveScriptSession").finish_non_exhaustive()
    }
}

impl ActiveScriptSession {
    /// Initialize `engine`, attach a fresh site and start it.
    pub fn start(engine: Rc<dyn ActiveScript>) -> EngineResult<Self> {
        let site = Rc::new(HostSite::new());
        check(&site, engine.init_new())?;
        check(&site, engine.set_script_site(site.clone()))?;
        check(&site, engine.set_script_state(ScriptState::Started))?;
        let global = check(&site, engine.get_script_dispatch(None))?;
        log::debug!(target: "msie::activescript", "session started");
        Ok(Self {
            engine,
            site,
            global,
            dispids: RefCell::new(HashMap::new()),
        })
    }

    pub fn engine(&self) -> &Rc<dyn ActiveScript> {
        &self.engine
    }

    pub fn thread_state(&self) -> EngineResult<ScriptThreadState> {
        check(&self.site, self.engine.get_script_thread_state())
    }

    fn parse(&self, code: &str, flags: ScriptTextFlags) -> EngineResult<Variant> {
        if self.thread_state()? != ScriptThreadState::NotInScript {
            return Err(UsageError::AlreadyInScript.into());
        }
        // Drop any error left over from a call that did not fail.
        self.site.take_error();
        check(&self.site, self.engine.parse_script_text(code, None, 0, 0, flags))
    }

    /// Parse and run statements.
    pub fn execute(&self, code: &str) -> EngineResult<()> {
        self.parse(code, ScriptTextFlags::empty()).map(|_| ())
    }

    /// Parse and run an expression; its value.
    pub fn evaluate(&self, expression: &str) -> EngineResult<Variant> {
        self.parse(expression, ScriptTextFlags::IS_EXPRESSION)
    }

    /// The DISPID of a global member, interned per session. `None` when the
    /// member does not exist and `ensure` is false.
    pub fn dispid(&self, name: &str, ensure: bool) -> EngineResult<Option<DispId>> {
        if let Some(id) = self.dispids.borrow().get(name) {
            return Ok(Some(*id));
        }
        match self.global.get_dispid(name, ensure) {
            Ok(id) => {
                self.dispids.borrow_mut().insert(name.to_string(), id);
                Ok(Some(id))
            }
            Err(HResult::DISP_E_UNKNOWNNAME) | Err(HResult::DISP_E_MEMBERNOTFOUND) => Ok(None),
            Err(hr) => Err(super::hresult::translate(&self.site, hr)),
        }
    }

    pub fn get(&self, name: &str) -> EngineResult<Option<Variant>> {
        match self.dispid(name, false)? {
            Some(id) => self.invoke(id, DispatchFlags::PROPERTY_GET, &[]).map(Some),
            None => Ok(None),
        }
    }

    pub fn set(&self, name: &str, value: Variant) -> EngineResult<()> {
        let id = self.dispid(name, true)?.ok_or(UsageError::InvalidArgument)?;
        self.invoke(id, DispatchFlags::PROPERTY_PUT, &[value]).map(|_| ())
    }

    pub fn call(&self, name: &str, args: &[Variant]) -> EngineResult<Option<Variant>> {
        match self.dispid(name, false)? {
            Some(id) => self.invoke(id, DispatchFlags::METHOD, args).map(Some),
            None => Ok(None),
        }
    }

    /// Delete a global member; a deleted member's DISPID is forgotten.
    pub fn delete(&self, name: &str) -> EngineResult<bool> {
        let deleted = check(&self.site, self.global.delete_member_by_name(name))?;
        if deleted {
            self.dispids.borrow_mut().remove(name);
        }
        Ok(deleted)
    }

    fn invoke(&self, id: DispId, flags: DispatchFlags, args: &[Variant]) -> EngineResult<Variant> {
        self.site.take_error();
        check(&self.site, self.global.invoke(id, flags, args))
    }

    pub fn interrupt(&self) -> EngineResult<()> {
        check(&self.site, self.engine.interrupt_script_thread())
    }

    pub fn collect_garbage(&self) -> EngineResult<()> {
        check(&self.site, self.engine.collect_garbage())
    }
}

impl Drop for ActiveScriptSession {
    fn drop(&mut self) {
        if let Err(hr) = self.engine.close() {
            log::warn!(target: "msie::activescript", "failed to close engine: {:?}", hr);
        }
    }
}
