//! Runtime ownership
//!
//! A runtime is shared between its owner and every context created from it,
//! so it always outlives its contexts. Disposal happens when the last of them
//! goes away, or explicitly once nothing else holds it.

use std::cell::Cell;
use std::fmt;
use std::marker::PhantomData;
use std::rc::Rc;
use std::sync::Arc;

use msie_sys::{JsContextRef, JsRtApi, JsRuntimeAttributes, JsRuntimeHandle, RuntimeInterrupt};

use super::context::JsContext;
use super::flavor::JsRtFlavor;
use super::property_id::PropertyInterner;
use super::translate::check;
use crate::error::{EngineResult, UsageError};

pub(crate) struct RuntimeInner {
    pub(crate) api: Rc<dyn JsRtApi>,
    pub(crate) handle: JsRuntimeHandle,
    pub(crate) attributes: JsRuntimeAttributes,
    pub(crate) interner: PropertyInterner,
    disposed: Cell<bool>,
}

impl RuntimeInner {
    fn dispose(&self) -> EngineResult<()> {
        if self.disposed.get() {
            return Ok(());
        }
        let api = self.api.as_ref();
        if let Ok(current) = api.current_context() {
            if current.is_valid() && api.context_runtime(current) == Ok(self.handle) {
                check(api, api.set_current_context(JsContextRef::INVALID))?;
            }
        }
        check(api, api.dispose_runtime(self.handle))?;
        self.disposed.set(true);
        log::debug!(target: "msie::jsrt", "disposed runtime {:?}", self.handle);
        Ok(())
    }
}

impl Drop for RuntimeInner {
    fn drop(&mut self) {
        if let Err(err) = self.dispose() {
            log::warn!(target: "msie::jsrt", "failed to dispose runtime {:?}: {}", self.handle, err);
        }
    }
}

/// Owning handle to a JsRt runtime of flavor `F`.
pub struct JsRuntime<F: JsRtFlavor> {
    inner: Rc<RuntimeInner>,
    _flavor: PhantomData<F>,
}

impl<F: JsRtFlavor> JsRuntime<F> {
    /// Create a runtime through `api`, which must speak flavor `F`.
    pub fn new(api: Rc<dyn JsRtApi>, attributes: JsRuntimeAttributes) -> EngineResult<Self> {
        if api.variant() != F::VARIANT {
            return Err(UsageError::InvalidArgument.into());
        }
        let handle = check(api.as_ref(), api.create_runtime(attributes))?;
        log::debug!(target: "msie::jsrt", "created {} runtime {:?} ({:?})", F::VARIANT, handle, attributes);
        Ok(Self {
            inner: Rc::new(RuntimeInner {
                api,
                handle,
                attributes,
                interner: PropertyInterner::default(),
                disposed: Cell::new(false),
            }),
            _flavor: PhantomData,
        })
    }

    pub fn handle(&self) -> JsRuntimeHandle {
        self.inner.handle
    }

    pub fn attributes(&self) -> JsRuntimeAttributes {
        self.inner.attributes
    }

    pub fn api(&self) -> &dyn JsRtApi {
        self.inner.api.as_ref()
    }

    /// Property ids interned for this runtime so far.
    pub fn interned_property_ids(&self) -> usize {
        self.inner.interner.len()
    }

    pub fn create_context(&self) -> EngineResult<JsContext<F>> {
        let api = self.api();
        let handle = check(api, api.create_context(self.inner.handle))?;
        JsContext::adopt(Rc::clone(&self.inner), handle)
    }

    pub fn collect_garbage(&self) -> EngineResult<()> {
        check(self.api(), self.api().collect_garbage(self.inner.handle))
    }

    pub fn memory_usage(&self) -> EngineResult<usize> {
        check(self.api(), self.api().runtime_memory_usage(self.inner.handle))
    }

    pub fn disable_execution(&self) -> EngineResult<()> {
        check(self.api(), self.api().disable_runtime_execution(self.inner.handle))
    }

    pub fn enable_execution(&self) -> EngineResult<()> {
        check(self.api(), self.api().enable_runtime_execution(self.inner.handle))
    }

    pub fn is_execution_disabled(&self) -> EngineResult<bool> {
        check(self.api(), self.api().is_runtime_execution_disabled(self.inner.handle))
    }

    /// Thread-safe handle that disables this runtime from another thread.
    pub fn interrupt_handle(&self) -> EngineResult<Arc<dyn RuntimeInterrupt>> {
        check(self.api(), self.api().interrupt_handle(self.inner.handle))
    }

    /// Dispose now. Fails with `RuntimeInUse` while any context is alive.
    pub fn dispose(self) -> EngineResult<()> {
        if Rc::strong_count(&self.inner) > 1 {
            return Err(UsageError::RuntimeInUse.into());
        }
        self.inner.dispose()
    }
}

impl<F: JsRtFlavor> fmt::Debug for JsRuntime<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsRuntime")
            .field("variant", &F::VARIANT)
            .field("handle", &self.inner.handle)
            .finish()
    }
}
