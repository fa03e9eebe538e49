//! Embedded ActiveScript engine
//!
//! Follows the COM state machine of the classic script engines: `init_new`
//! and a site are required before script runs, script runs eagerly while
//! parsing, and every script error is handed to the site's
//! `on_script_error` before the call returns `SCRIPT_E_REPORTED`.

use std::cell::{Cell, RefCell};
use std::collections::HashMap;
use std::rc::{Rc, Weak};

use boa_engine::{Context, JsObject, JsResult, JsValue, Script, Source};
use msie_sys::activescript::{
    ActiveScript, ActiveScriptSite, DispId, DispatchFlags, HResult, ScriptDispatch, ScriptErrorInfo, ScriptState,
    ScriptTextFlags, ScriptThreadState, Variant,
};

use crate::convert::{self, Failure};
use crate::EmbeddedOptions;

/// `JSERR_SyntaxError`-style code reported for compile errors.
const SYNTAX_ERROR: HResult = HResult(0x800A_03EA_u32 as i32);
/// Code reported for uncaught exceptions.
const UNCAUGHT_EXCEPTION: HResult = HResult(0x800A_139E_u32 as i32);

const COMPILE_SOURCE: &str = "Microsoft JScript compilation error";
const RUNTIME_SOURCE: &str = "Microsoft JScript runtime error";

/// DISPID interning table; ids are stable for the engine's lifetime.
#[derive(Default)]
struct Names {
    ids: HashMap<String, DispId>,
    names: Vec<String>,
}

impl Names {
    fn intern(&mut self, name: &str) -> DispId {
        if let Some(id) = self.ids.get(name) {
            return *id;
        }
        self.names.push(name.to_string());
        let id = DispId(self.names.len() as i32);
        self.ids.insert(name.to_string(), id);
        id
    }

    fn name(&self, id: DispId) -> Option<&str> {
        let index = usize::try_from(id.0).ok()?.checked_sub(1)?;
        self.names.get(index).map(String::as_str)
    }
}

/// Outcome of a failed script operation, before it reaches the site.
enum Outcome {
    Report(ScriptErrorInfo),
    Status(HResult),
}

struct Inner {
    options: EmbeddedOptions,
    engine: RefCell<Option<Context>>,
    site: RefCell<Option<Rc<dyn ActiveScriptSite>>>,
    state: Cell<ScriptState>,
    thread_state: Cell<ScriptThreadState>,
    interrupted: Cell<bool>,
    names: RefCell<Names>,
}

impl Inner {
    fn site(&self) -> Option<Rc<dyn ActiveScriptSite>> {
        self.site.borrow().clone()
    }

    fn change_state(&self, state: ScriptState) {
        self.state.set(state);
        log::trace!(target: "msie::embedded", "activescript state -> {:?}", state);
        if let Some(site) = self.site() {
            site.on_state_change(state);
        }
    }

    fn ensure_open(&self) -> Result<(), HResult> {
        match self.state.get() {
            ScriptState::Closed | ScriptState::Uninitialized => Err(HResult::E_UNEXPECTED),
            _ => Ok(()),
        }
    }

    /// Hand `outcome` to the site and produce the status the caller returns.
    fn report(&self, outcome: Outcome, reported: HResult) -> HResult {
        match outcome {
            Outcome::Status(status) => status,
            Outcome::Report(info) => match self.site() {
                Some(site) => {
                    log::debug!(target: "msie::embedded", "reporting script error: {}", info.description);
                    site.on_script_error(&info);
                    reported
                }
                None => info.scode,
            },
        }
    }

    fn failure_outcome(&self, failure: Failure, starting_line: u32, engine: &mut Context) -> Outcome {
        let (scode, source, thrown) = match failure {
            Failure::Compile(value) => (SYNTAX_ERROR, COMPILE_SOURCE, value),
            Failure::Exception(value) | Failure::EvalDisabled(value) => (UNCAUGHT_EXCEPTION, RUNTIME_SOURCE, value),
            Failure::Fatal(reason) => {
                log::warn!(target: "msie::embedded", "activescript engine limit: {}", reason);
                let status = if reason.contains("recursi") {
                    HResult::JSCRIPT_E_OUTOFSTACK
                } else {
                    HResult::E_ABORT
                };
                return Outcome::Status(status);
            }
        };
        let details = convert::error_details(&thrown, engine);
        Outcome::Report(ScriptErrorInfo {
            scode,
            source: source.to_string(),
            description: details.message,
            line: details.line + starting_line,
            column: details.column,
            source_line: details.source_line,
            name: details.name,
        })
    }

    fn to_variant(self: &Rc<Self>, value: JsValue) -> Result<Variant, HResult> {
        if value.is_undefined() {
            Ok(Variant::Empty)
        } else if value.is_null() {
            Ok(Variant::Null)
        } else if let Some(flag) = value.as_boolean() {
            Ok(Variant::Bool(flag))
        } else if let Some(number) = value.as_number() {
            let integral = number.fract() == 0.0
                && number >= f64::from(i32::MIN)
                && number <= f64::from(i32::MAX)
                && !(number == 0.0 && number.is_sign_negative());
            if integral {
                Ok(Variant::I4(number as i32))
            } else {
                Ok(Variant::R8(number))
            }
        } else if let Some(text) = value.as_string() {
            Ok(Variant::Bstr(text.to_std_string_escaped()))
        } else if let Some(object) = value.as_object() {
            let dispatch = EmbeddedDispatch {
                engine: Rc::downgrade(self),
                object: object.clone(),
            };
            Ok(Variant::Dispatch(Rc::new(dispatch)))
        } else {
            Err(HResult::DISP_E_TYPEMISMATCH)
        }
    }
}

fn from_variant(value: &Variant) -> Result<JsValue, HResult> {
    match value {
        Variant::Empty => Ok(JsValue::undefined()),
        Variant::Null => Ok(JsValue::null()),
        Variant::Bool(flag) => Ok(JsValue::from(*flag)),
        Variant::I4(number) => Ok(JsValue::from(*number)),
        Variant::R8(number) => Ok(JsValue::from(*number)),
        Variant::Bstr(text) => Ok(convert::string_value(text)),
        Variant::Dispatch(_) => Err(HResult::DISP_E_TYPEMISMATCH),
    }
}

/// Marks the engine as running script for the guard's lifetime.
struct Running<'a>(&'a Cell<ScriptThreadState>);

impl<'a> Running<'a> {
    fn enter(state: &'a Cell<ScriptThreadState>) -> Result<Self, HResult> {
        if state.get() == ScriptThreadState::Running {
            return Err(HResult::E_UNEXPECTED);
        }
        state.set(ScriptThreadState::Running);
        Ok(Running(state))
    }
}

impl Drop for Running<'_> {
    fn drop(&mut self) {
        self.0.set(ScriptThreadState::NotInScript);
    }
}

/// In-process ActiveScript engine backed by boa.
pub struct EmbeddedActiveScript {
    inner: Rc<Inner>,
}

impl EmbeddedActiveScript {
    /// Engine with default limits, in the uninitialized state.
    pub fn new() -> Self {
        Self::with_options(EmbeddedOptions::default())
    }

    /// Engine with explicit limits, in the uninitialized state.
    pub fn with_options(options: EmbeddedOptions) -> Self {
        Self {
            inner: Rc::new(Inner {
                options,
                engine: RefCell::new(None),
                site: RefCell::new(None),
                state: Cell::new(ScriptState::Uninitialized),
                thread_state: Cell::new(ScriptThreadState::NotInScript),
                interrupted: Cell::new(false),
                names: RefCell::new(Names::default()),
            }),
        }
    }

    fn evaluate(&self, code: &str, starting_line: u32) -> Result<JsValue, Outcome> {
        let mut slot = self.inner.engine.try_borrow_mut().map_err(|_| Outcome::Status(HResult::E_UNEXPECTED))?;
        let engine = slot.as_mut().ok_or(Outcome::Status(HResult::E_UNEXPECTED))?;

        let script = match Script::parse(Source::from_bytes(code), None, engine) {
            Ok(script) => script,
            Err(err) => {
                let failure = convert::compile_failure(err, code, "", engine);
                return Err(self.inner.failure_outcome(failure, starting_line, engine));
            }
        };
        script.evaluate(engine).map_err(|err| {
            let failure = convert::runtime_failure(err, engine);
            self.inner.failure_outcome(failure, starting_line, engine)
        })
    }
}

impl Default for EmbeddedActiveScript {
    fn default() -> Self {
        Self::new()
    }
}

impl ActiveScript for EmbeddedActiveScript {
    fn init_new(&self) -> Result<(), HResult> {
        if self.inner.state.get() != ScriptState::Uninitialized || self.inner.engine.borrow().is_some() {
            return Err(HResult::E_UNEXPECTED);
        }
        *self.inner.engine.borrow_mut() = Some(self.inner.options.new_engine());
        self.inner.change_state(ScriptState::Initialized);
        Ok(())
    }

    fn set_script_site(&self, site: Rc<dyn ActiveScriptSite>) -> Result<(), HResult> {
        if self.inner.state.get() == ScriptState::Closed {
            return Err(HResult::E_UNEXPECTED);
        }
        if self.inner.site.borrow().is_some() {
            return Err(HResult::E_UNEXPECTED);
        }
        *self.inner.site.borrow_mut() = Some(site);
        Ok(())
    }

    fn get_script_state(&self) -> Result<ScriptState, HResult> {
        Ok(self.inner.state.get())
    }

    fn set_script_state(&self, state: ScriptState) -> Result<(), HResult> {
        match state {
            ScriptState::Closed => self.close(),
            ScriptState::Uninitialized | ScriptState::Initialized => Err(HResult::E_NOTIMPL),
            ScriptState::Started | ScriptState::Connected | ScriptState::Disconnected => {
                self.inner.ensure_open()?;
                if self.inner.site.borrow().is_none() {
                    return Err(HResult::E_UNEXPECTED);
                }
                if self.inner.state.get() != state {
                    self.inner.change_state(state);
                }
                Ok(())
            }
        }
    }

    fn get_script_thread_state(&self) -> Result<ScriptThreadState, HResult> {
        Ok(self.inner.thread_state.get())
    }

    fn interrupt_script_thread(&self) -> Result<(), HResult> {
        self.inner.ensure_open()?;
        self.inner.interrupted.set(true);
        Ok(())
    }

    fn get_script_dispatch(&self, item_name: Option<&str>) -> Result<Rc<dyn ScriptDispatch>, HResult> {
        self.inner.ensure_open()?;
        if item_name.is_some() {
            return Err(HResult::E_INVALIDARG);
        }
        let slot = self.inner.engine.try_borrow().map_err(|_| HResult::E_UNEXPECTED)?;
        let engine = slot.as_ref().ok_or(HResult::E_UNEXPECTED)?;
        let dispatch = EmbeddedDispatch {
            engine: Rc::downgrade(&self.inner),
            object: engine.global_object(),
        };
        Ok(Rc::new(dispatch))
    }

    fn parse_script_text(
        &self,
        code: &str,
        item_name: Option<&str>,
        _source_context: usize,
        starting_line: u32,
        flags: ScriptTextFlags,
    ) -> Result<Variant, HResult> {
        self.inner.ensure_open()?;
        if item_name.is_some() {
            return Err(HResult::E_INVALIDARG);
        }
        if !matches!(self.inner.state.get(), ScriptState::Started | ScriptState::Connected) {
            return Err(HResult::E_UNEXPECTED);
        }

        let running = Running::enter(&self.inner.thread_state)?;
        self.inner.interrupted.set(false);
        let site = self.inner.site();
        if let Some(site) = &site {
            site.on_enter_script();
        }
        let result = self.evaluate(code, starting_line);
        drop(running);
        if let Some(site) = &site {
            site.on_leave_script();
        }

        if self.inner.interrupted.replace(false) {
            return Err(HResult::E_ABORT);
        }
        match result {
            Ok(value) if flags.contains(ScriptTextFlags::IS_EXPRESSION) => self.inner.to_variant(value),
            Ok(_) => Ok(Variant::Empty),
            Err(outcome) => Err(self.inner.report(outcome, HResult::SCRIPT_E_REPORTED)),
        }
    }

    fn collect_garbage(&self) -> Result<(), HResult> {
        self.inner.ensure_open()?;
        boa_gc::force_collect();
        Ok(())
    }

    fn close(&self) -> Result<(), HResult> {
        if self.inner.state.get() == ScriptState::Closed {
            return Ok(());
        }
        if self.inner.thread_state.get() == ScriptThreadState::Running {
            return Err(HResult::E_UNEXPECTED);
        }
        self.inner.change_state(ScriptState::Closed);
        self.inner.engine.borrow_mut().take();
        self.inner.site.borrow_mut().take();
        Ok(())
    }
}

impl Drop for EmbeddedActiveScript {
    fn drop(&mut self) {
        self.inner.engine.borrow_mut().take();
        self.inner.site.borrow_mut().take();
    }
}

/// `IDispatchEx` view of one script object.
struct EmbeddedDispatch {
    engine: Weak<Inner>,
    object: JsObject,
}

impl EmbeddedDispatch {
    fn inner(&self) -> Result<Rc<Inner>, HResult> {
        let inner = self.engine.upgrade().ok_or(HResult::E_UNEXPECTED)?;
        inner.ensure_open()?;
        Ok(inner)
    }

    fn with_engine<T>(
        &self,
        inner: &Inner,
        f: impl FnOnce(&JsObject, &mut Context) -> JsResult<T>,
    ) -> Result<Result<T, Outcome>, HResult> {
        let mut slot = inner.engine.try_borrow_mut().map_err(|_| HResult::E_UNEXPECTED)?;
        let engine = slot.as_mut().ok_or(HResult::E_UNEXPECTED)?;
        Ok(f(&self.object, engine).map_err(|err| {
            let failure = convert::runtime_failure(err, engine);
            inner.failure_outcome(failure, 0, engine)
        }))
    }

    fn member(&self, inner: &Inner, id: DispId) -> Result<Option<String>, HResult> {
        if id == DispId::VALUE {
            return Ok(None);
        }
        inner
            .names
            .borrow()
            .name(id)
            .map(|name| Some(name.to_string()))
            .ok_or(HResult::DISP_E_MEMBERNOTFOUND)
    }
}

impl ScriptDispatch for EmbeddedDispatch {
    fn get_dispid(&self, name: &str, ensure: bool) -> Result<DispId, HResult> {
        let inner = self.inner()?;
        if !ensure {
            let exists = self
                .with_engine(&inner, |object, engine| object.has_property(convert::key(name), engine))?
                .unwrap_or(false);
            if !exists {
                return Err(HResult::DISP_E_UNKNOWNNAME);
            }
        }
        let id = inner.names.borrow_mut().intern(name);
        Ok(id)
    }

    fn get_member_name(&self, id: DispId) -> Result<String, HResult> {
        let inner = self.inner()?;
        let name = inner.names.borrow().name(id).map(str::to_string);
        name.ok_or(HResult::DISP_E_MEMBERNOTFOUND)
    }

    fn invoke(&self, id: DispId, flags: DispatchFlags, args: &[Variant]) -> Result<Variant, HResult> {
        let inner = self.inner()?;
        let member = self.member(&inner, id)?;
        let values = args.iter().map(from_variant).collect::<Result<Vec<_>, _>>()?;

        let result = if flags.intersects(DispatchFlags::PROPERTY_PUT | DispatchFlags::PROPERTY_PUT_REF) {
            let name = member.ok_or(HResult::DISP_E_MEMBERNOTFOUND)?;
            let value = values.into_iter().next().ok_or(HResult::DISP_E_BADPARAMCOUNT)?;
            self.with_engine(&inner, |object, engine| {
                object.set(convert::key(&name), value, true, engine)?;
                Ok(JsValue::undefined())
            })?
        } else {
            self.with_engine(&inner, |object, engine| {
                let target = match &member {
                    Some(name) => object.get(convert::key(name), engine)?,
                    None => JsValue::from(object.clone()),
                };
                let callable = target.as_object().filter(|callee| callee.is_callable()).map(|callee| callee.clone());
                match callable {
                    Some(callee) if flags.contains(DispatchFlags::METHOD) => {
                        let this = match &member {
                            Some(_) => JsValue::from(object.clone()),
                            None => JsValue::undefined(),
                        };
                        callee.call(&this, &values, engine)
                    }
                    _ if flags.contains(DispatchFlags::PROPERTY_GET) => Ok(target),
                    _ => Err(boa_engine::JsNativeError::typ()
                        .with_message("object doesn't support this action")
                        .into()),
                }
            })?
        };

        match result {
            Ok(value) => inner.to_variant(value),
            Err(outcome) => Err(inner.report(outcome, HResult::DISP_E_EXCEPTION)),
        }
    }

    fn delete_member_by_name(&self, name: &str) -> Result<bool, HResult> {
        let inner = self.inner()?;
        // S_FALSE for members that cannot be deleted, as sloppy `delete` does.
        let deleted = self.with_engine(&inner, |object, engine| object.delete_property_or_throw(convert::key(name), engine))?;
        Ok(deleted.unwrap_or(false))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Default)]
    struct RecordingSite {
        errors: RefCell<Vec<ScriptErrorInfo>>,
        states: RefCell<Vec<ScriptState>>,
    }

    impl ActiveScriptSite for RecordingSite {
        fn on_state_change(&self, state: ScriptState) {
            self.states.borrow_mut().push(state);
        }

        fn on_script_error(&self, error: &ScriptErrorInfo) -> HResult {
            self.errors.borrow_mut().push(error.clone());
            HResult::S_OK
        }
    }

    fn started() -> (EmbeddedActiveScript, Rc<RecordingSite>) {
        let engine = EmbeddedActiveScript::new();
        let site = Rc::new(RecordingSite::default());
        engine.init_new().unwrap();
        engine.set_script_site(site.clone()).unwrap();
        engine.set_script_state(ScriptState::Started).unwrap();
        (engine, site)
    }

    #[test]
    fn test_names_start_after_dispid_value() {
        let mut names = Names::default();
        let a = names.intern("a");
        assert_eq!(a, DispId(1));
        assert_eq!(names.intern("a"), a);
        assert_eq!(names.name(a), Some("a"));
        assert_eq!(names.name(DispId::VALUE), None);
    }

    #[test]
    fn test_expression_value() {
        let (engine, _site) = started();
        let value = engine
            .parse_script_text("7 * 8 - 20", None, 0, 0, ScriptTextFlags::IS_EXPRESSION)
            .unwrap();
        assert_eq!(value, Variant::I4(36));
        let value = engine
            .parse_script_text("0.5", None, 0, 0, ScriptTextFlags::IS_EXPRESSION)
            .unwrap();
        assert_eq!(value, Variant::R8(0.5));
    }

    #[test]
    fn test_parse_requires_started_state() {
        let engine = EmbeddedActiveScript::new();
        assert_eq!(
            engine.parse_script_text("1", None, 0, 0, ScriptTextFlags::empty()),
            Err(HResult::E_UNEXPECTED)
        );
        engine.init_new().unwrap();
        assert_eq!(
            engine.parse_script_text("1", None, 0, 0, ScriptTextFlags::empty()),
            Err(HResult::E_UNEXPECTED)
        );
    }

    #[test]
    fn test_errors_are_reported_to_site() {
        let (engine, site) = started();
        let status = engine.parse_script_text("throw new TypeError('bad')", None, 0, 0, ScriptTextFlags::empty());
        assert_eq!(status, Err(HResult::SCRIPT_E_REPORTED));
        let errors = site.errors.borrow();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].description, "bad");
        assert_eq!(errors[0].name.as_deref(), Some("TypeError"));
    }

    #[test]
    fn test_close_rejects_further_calls() {
        let (engine, site) = started();
        engine.close().unwrap();
        assert_eq!(engine.get_script_state(), Ok(ScriptState::Closed));
        assert_eq!(engine.collect_garbage(), Err(HResult::E_UNEXPECTED));
        assert_eq!(site.states.borrow().last(), Some(&ScriptState::Closed));
    }
}
