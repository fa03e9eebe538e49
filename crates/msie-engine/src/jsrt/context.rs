//! Context ownership and the current-context scope guard

use std::fmt;
use std::marker::PhantomData;
use std::ops::Deref;
use std::rc::Rc;

use msie_sys::{JsContextRef, JsRtApi, JsRuntimeHandle};

use super::flavor::JsRtFlavor;
use super::property_id::PropertyInterner;
use super::runtime::RuntimeInner;
use super::translate::check;
use crate::error::EngineResult;

/// Reference-counted handle to a JsRt context.
///
/// Construction and every clone take a native reference; dropping releases
/// it. The context keeps its runtime alive.
pub struct JsContext<F: JsRtFlavor> {
    runtime: Rc<RuntimeInner>,
    handle: JsContextRef,
    _flavor: PhantomData<F>,
}

impl<F: JsRtFlavor> JsContext<F> {
    /// Take the creator's reference on a freshly created context.
    pub(crate) fn adopt(runtime: Rc<RuntimeInner>, handle: JsContextRef) -> EngineResult<Self> {
        let api = runtime.api.as_ref();
        check(api, api.context_add_ref(handle))?;
        log::debug!(target: "msie::jsrt", "created context {:?} in {:?}", handle, runtime.handle);
        Ok(Self {
            runtime,
            handle,
            _flavor: PhantomData,
        })
    }

    pub fn handle(&self) -> JsContextRef {
        self.handle
    }

    pub fn runtime_handle(&self) -> JsRuntimeHandle {
        self.runtime.handle
    }

    pub fn api(&self) -> &dyn JsRtApi {
        self.runtime.api.as_ref()
    }

    pub fn is_current(&self) -> bool {
        self.api().current_context() == Ok(self.handle)
    }

    /// Make this context current until the returned scope is dropped, which
    /// restores whatever was current before.
    pub fn enter(&self) -> EngineResult<ContextScope<'_, F>> {
        let api = self.api();
        let previous = check(api, api.current_context())?;
        if previous != self.handle {
            check(api, api.set_current_context(self.handle))?;
        }
        Ok(ContextScope {
            current: CurrentContext::with_interner(api, &self.runtime.interner),
            entered: self.handle,
            previous,
        })
    }
}

impl<F: JsRtFlavor> Clone for JsContext<F> {
    fn clone(&self) -> Self {
        if let Err(code) = self.api().context_add_ref(self.handle) {
            log::warn!(target: "msie::jsrt", "failed to add a reference to {:?}: {}", self.handle, code);
        }
        Self {
            runtime: Rc::clone(&self.runtime),
            handle: self.handle,
            _flavor: PhantomData,
        }
    }
}

impl<F: JsRtFlavor> Drop for JsContext<F> {
    fn drop(&mut self) {
        if let Err(code) = self.api().context_release(self.handle) {
            log::warn!(target: "msie::jsrt", "failed to release {:?}: {}", self.handle, code);
        }
    }
}

impl<F: JsRtFlavor> fmt::Debug for JsContext<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsContext")
            .field("variant", &F::VARIANT)
            .field("handle", &self.handle)
            .field("runtime", &self.runtime.handle)
            .finish()
    }
}

/// Guard returned by [`JsContext::enter`].
pub struct ContextScope<'a, F: JsRtFlavor> {
    current: CurrentContext<'a, F>,
    entered: JsContextRef,
    previous: JsContextRef,
}

impl<'a, F: JsRtFlavor> Deref for ContextScope<'a, F> {
    type Target = CurrentContext<'a, F>;

    fn deref(&self) -> &Self::Target {
        &self.current
    }
}

impl<F: JsRtFlavor> Drop for ContextScope<'_, F> {
    fn drop(&mut self) {
        if self.previous == self.entered {
            return;
        }
        if let Err(code) = self.current.api().set_current_context(self.previous) {
            log::warn!(target: "msie::jsrt", "failed to restore current context {:?}: {}", self.previous, code);
        }
    }
}

/// Operations on whatever context is current on this thread.
///
/// Obtained from a [`ContextScope`], or directly with [`CurrentContext::new`]
/// when the caller manages the current context itself.
pub struct CurrentContext<'a, F: JsRtFlavor> {
    api: &'a dyn JsRtApi,
    interner: Option<&'a PropertyInterner>,
    _flavor: PhantomData<F>,
}

impl<'a, F: JsRtFlavor> CurrentContext<'a, F> {
    /// Operate on the ambient current context.
    ///
    /// Property ids are not cached through this form.
    pub fn new(api: &'a dyn JsRtApi) -> Self {
        Self {
            api,
            interner: None,
            _flavor: PhantomData,
        }
    }

    pub(crate) fn with_interner(api: &'a dyn JsRtApi, interner: &'a PropertyInterner) -> Self {
        Self {
            api,
            interner: Some(interner),
            _flavor: PhantomData,
        }
    }

    pub fn api(&self) -> &'a dyn JsRtApi {
        self.api
    }

    pub(crate) fn interner(&self) -> Option<&'a PropertyInterner> {
        self.interner
    }

    pub fn handle(&self) -> EngineResult<JsContextRef> {
        check(self.api, self.api.current_context())
    }

    /// Idle notification; the tick at which the host should call again.
    pub fn idle(&self) -> EngineResult<u32> {
        check(self.api, self.api.idle())
    }
}
