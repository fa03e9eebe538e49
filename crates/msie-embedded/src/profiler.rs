//! Profiler event buffering
//!
//! Events are collected while the provider state is borrowed and delivered
//! after it is released, with the provider flagged as "inside a callback".

use std::cell::Cell;
use std::rc::Rc;

use msie_sys::{ProfilerCallback, ProfilerEventMask, ProfilerScriptType};

use crate::runtime::Profiler;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ProfilerEvent {
    Initialize(u32),
    Shutdown(i32),
    ScriptCompiled(u32),
    Enter { script_id: u32, function_id: u32 },
    Exit { script_id: u32, function_id: u32 },
}

/// Events raised by one provider call, bound to the sink that receives them.
#[derive(Default)]
pub(crate) struct EventQueue {
    sink: Option<Rc<dyn ProfilerCallback>>,
    mask: ProfilerEventMask,
    events: Vec<ProfilerEvent>,
}

impl EventQueue {
    pub(crate) fn for_profiler(profiler: Option<&Profiler>) -> Self {
        match profiler {
            Some(profiler) => Self {
                sink: Some(Rc::clone(&profiler.sink)),
                mask: profiler.mask,
                events: Vec::new(),
            },
            None => Self::default(),
        }
    }

    pub(crate) fn to_sink(sink: Rc<dyn ProfilerCallback>, event: ProfilerEvent) -> Self {
        Self {
            sink: Some(sink),
            mask: ProfilerEventMask::empty(),
            events: vec![event],
        }
    }

    pub(crate) fn script_compiled(&mut self, script_id: u32) {
        if self.sink.is_some() {
            self.events.push(ProfilerEvent::ScriptCompiled(script_id));
        }
    }

    pub(crate) fn call(&mut self, script_id: u32, function_id: u32) -> CallTrace<'_> {
        let traced = self.sink.is_some() && self.mask.contains(ProfilerEventMask::TRACE_SCRIPT_FUNCTION_CALL);
        if traced {
            self.events.push(ProfilerEvent::Enter { script_id, function_id });
        }
        CallTrace {
            queue: self,
            traced,
            script_id,
            function_id,
        }
    }

    /// Deliver the queued events; `in_callback` is raised for the duration.
    pub(crate) fn dispatch(self, in_callback: &Cell<bool>) {
        let Some(sink) = self.sink else {
            return;
        };
        if self.events.is_empty() {
            return;
        }

        let _guard = CallbackGuard::enter(in_callback);
        for event in self.events {
            match event {
                ProfilerEvent::Initialize(context) => sink.initialize(context),
                ProfilerEvent::Shutdown(reason) => sink.shutdown(reason),
                ProfilerEvent::ScriptCompiled(script_id) => sink.script_compiled(script_id, ProfilerScriptType::User),
                ProfilerEvent::Enter { script_id, function_id } => sink.on_function_enter(script_id, function_id),
                ProfilerEvent::Exit { script_id, function_id } => sink.on_function_exit(script_id, function_id),
            }
        }
    }
}

/// Records the matching exit event when dropped.
pub(crate) struct CallTrace<'q> {
    queue: &'q mut EventQueue,
    traced: bool,
    script_id: u32,
    function_id: u32,
}

impl Drop for CallTrace<'_> {
    fn drop(&mut self) {
        if self.traced {
            self.queue.events.push(ProfilerEvent::Exit {
                script_id: self.script_id,
                function_id: self.function_id,
            });
        }
    }
}

struct CallbackGuard<'a>(&'a Cell<bool>);

impl<'a> CallbackGuard<'a> {
    fn enter(flag: &'a Cell<bool>) -> Self {
        flag.set(true);
        CallbackGuard(flag)
    }
}

impl Drop for CallbackGuard<'_> {
    fn drop(&mut self) {
        self.0.set(false);
    }
}
