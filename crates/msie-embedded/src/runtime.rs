//! Runtime and context state of the embedded JsRt provider

use std::cell::Cell;
use std::collections::HashMap;
use std::rc::Rc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use boa_engine::{Context, JsValue, Script};
use msie_sys::{
    JsContextRef, JsErrorCode, JsPropertyIdRef, JsRuntimeAttributes, JsRuntimeHandle, JsValueRef,
    ProfilerCallback, ProfilerEventMask, RuntimeInterrupt, Status,
};

use crate::envelope::SourceDigest;
use crate::registry;
use crate::EmbeddedOptions;

/// Disable flag shared with interrupt handles on other threads.
pub(crate) struct InterruptFlag {
    disabled: AtomicBool,
    allowed: bool,
}

impl InterruptFlag {
    pub(crate) fn new(allowed: bool) -> Self {
        Self {
            disabled: AtomicBool::new(false),
            allowed,
        }
    }

    pub(crate) fn is_disabled(&self) -> bool {
        self.disabled.load(Ordering::SeqCst)
    }

    pub(crate) fn enable(&self) {
        self.disabled.store(false, Ordering::SeqCst);
    }
}

impl RuntimeInterrupt for InterruptFlag {
    fn disable_execution(&self) -> Status<()> {
        if !self.allowed {
            return Err(JsErrorCode::CannotDisableExecution);
        }
        self.disabled.store(true, Ordering::SeqCst);
        Ok(())
    }
}

/// Pending exception of a runtime.
pub(crate) struct Latched {
    pub value: JsValue,
    pub terminated: bool,
}

/// Runtime-wide state shared by all of its contexts.
pub(crate) struct RuntimeShared {
    pub attributes: JsRuntimeAttributes,
    pub interrupt: Arc<InterruptFlag>,
    pub exception: Option<Latched>,
    pub faulted: bool,
    names: HashMap<String, JsPropertyIdRef>,
    ids: HashMap<JsPropertyIdRef, String>,
    next_script_id: u32,
}

impl RuntimeShared {
    pub(crate) fn property_id(&mut self, name: &str) -> JsPropertyIdRef {
        if let Some(id) = self.names.get(name) {
            return *id;
        }
        let id = JsPropertyIdRef::from_raw(registry::next_handle());
        self.names.insert(name.to_string(), id);
        self.ids.insert(id, name.to_string());
        id
    }

    pub(crate) fn property_name(&self, id: JsPropertyIdRef) -> Status<&str> {
        self.ids.get(&id).map(String::as_str).ok_or(JsErrorCode::InvalidArgument)
    }

    pub(crate) fn next_script_id(&mut self) -> u32 {
        self.next_script_id += 1;
        self.next_script_id
    }

    pub(crate) fn latch(&mut self, value: JsValue, terminated: bool) {
        self.exception = Some(Latched { value, terminated });
    }
}

/// What a value handle refers to.
pub(crate) enum Slot {
    Value(JsValue),
    Script { script: Script, script_id: u32 },
}

/// Active profiler of a context.
pub(crate) struct Profiler {
    pub sink: Rc<dyn ProfilerCallback>,
    pub mask: ProfilerEventMask,
}

/// One script context: an independent global object and its value handles.
///
/// Value handles live until no context is current any more, unless pinned
/// with `add_ref`. The four constant handles live as long as the context.
pub(crate) struct ContextState {
    pub engine: Context,
    pub ref_count: u32,
    pub debugging: bool,
    pub profiler: Option<Profiler>,
    pub heap_lock: Rc<Cell<bool>>,
    pub code_cache: HashMap<SourceDigest, Script>,
    values: HashMap<JsValueRef, Slot>,
    pins: HashMap<JsValueRef, u32>,
    constants: [JsValueRef; 4],
}

const UNDEFINED: usize = 0;
const NULL: usize = 1;
const FALSE: usize = 2;
const TRUE: usize = 3;

impl ContextState {
    pub(crate) fn new(engine: Context) -> Self {
        let mut context = Self {
            engine,
            ref_count: 0,
            debugging: false,
            profiler: None,
            heap_lock: Rc::new(Cell::new(false)),
            code_cache: HashMap::new(),
            values: HashMap::new(),
            pins: HashMap::new(),
            constants: [JsValueRef::INVALID; 4],
        };
        context.constants = [
            context.insert(JsValue::undefined()),
            context.insert(JsValue::null()),
            context.insert(JsValue::from(false)),
            context.insert(JsValue::from(true)),
        ];
        context
    }

    fn insert(&mut self, value: JsValue) -> JsValueRef {
        let handle = JsValueRef::from_raw(registry::next_handle());
        self.values.insert(handle, Slot::Value(value));
        handle
    }

    /// Hand out a handle for `value`, reusing the constant handles.
    pub(crate) fn register(&mut self, value: JsValue) -> JsValueRef {
        if value.is_undefined() {
            self.constants[UNDEFINED]
        } else if value.is_null() {
            self.constants[NULL]
        } else if let Some(flag) = value.as_boolean() {
            self.constants[if flag { TRUE } else { FALSE }]
        } else {
            self.insert(value)
        }
    }

    pub(crate) fn register_script(&mut self, script: Script, script_id: u32) -> JsValueRef {
        let handle = JsValueRef::from_raw(registry::next_handle());
        self.values.insert(handle, Slot::Script { script, script_id });
        handle
    }

    pub(crate) fn slot(&self, handle: JsValueRef) -> Status<&Slot> {
        if !handle.is_valid() {
            return Err(JsErrorCode::NullArgument);
        }
        self.values.get(&handle).ok_or(JsErrorCode::InvalidArgument)
    }

    /// The value behind `handle`; parsed scripts are not plain values.
    pub(crate) fn value(&self, handle: JsValueRef) -> Status<JsValue> {
        match self.slot(handle)? {
            Slot::Value(value) => Ok(value.clone()),
            Slot::Script { .. } => Err(JsErrorCode::InvalidArgument),
        }
    }

    pub(crate) fn owns(&self, handle: JsValueRef) -> bool {
        self.values.contains_key(&handle)
    }

    pub(crate) fn add_ref(&mut self, handle: JsValueRef) -> Status<u32> {
        self.slot(handle)?;
        let count = self.pins.entry(handle).or_insert(0);
        *count += 1;
        Ok(*count)
    }

    /// Drop one pin; the slot itself goes at the next scope release.
    pub(crate) fn release(&mut self, handle: JsValueRef) -> Status<u32> {
        let count = self.pins.get_mut(&handle).ok_or(JsErrorCode::InvalidArgument)?;
        *count -= 1;
        let count = *count;
        if count == 0 {
            self.pins.remove(&handle);
        }
        Ok(count)
    }

    /// Free every value handle that is neither a constant nor pinned.
    pub(crate) fn release_scoped_values(&mut self) -> usize {
        let before = self.values.len();
        let constants = self.constants;
        let pins = &self.pins;
        self.values
            .retain(|handle, _| constants.contains(handle) || pins.contains_key(handle));
        before - self.values.len()
    }

    pub(crate) fn slots(&self) -> impl Iterator<Item = (&JsValueRef, &Slot)> {
        self.values.iter()
    }

    pub(crate) fn source_bytes(&self) -> usize {
        self.values.len() * std::mem::size_of::<Slot>()
    }
}

/// A runtime and the contexts created from it.
pub(crate) struct RuntimeState {
    pub shared: RuntimeShared,
    pub contexts: HashMap<JsContextRef, ContextState>,
    pub options: EmbeddedOptions,
}

impl RuntimeState {
    pub(crate) fn new(attributes: JsRuntimeAttributes, options: EmbeddedOptions) -> Self {
        let allowed = attributes.contains(JsRuntimeAttributes::ALLOW_SCRIPT_INTERRUPT);
        Self {
            shared: RuntimeShared {
                attributes,
                interrupt: Arc::new(InterruptFlag::new(allowed)),
                exception: None,
                faulted: false,
                names: HashMap::new(),
                ids: HashMap::new(),
                next_script_id: 0,
            },
            contexts: HashMap::new(),
            options,
        }
    }

    pub(crate) fn heap_locked(&self) -> bool {
        self.contexts.values().any(|context| context.heap_lock.get())
    }

    pub(crate) fn memory_usage(&self) -> usize {
        let names: usize = self.shared.names.keys().map(|name| name.len() * 2).sum();
        let contexts: usize = self.contexts.values().map(ContextState::source_bytes).sum();
        std::mem::size_of::<Self>() + names + contexts
    }
}
