//! Debugging, profiling and heap enumeration

use std::rc::Rc;

use msie_sys::{ComPtr, DebugApplication, HeapEnumerator, HeapObjectInfo, ProfilerCallback, ProfilerEventMask, ProfilerSink};

use super::context::CurrentContext;
use super::flavor::{Edge, Ie, JsRtFlavor, PROCESS_BITS};
use super::translate::check;
use crate::error::{EngineResult, UsageError};

impl CurrentContext<'_, Ie> {
    /// Attach an `IDebugApplication32`. Only valid in a 32-bit process.
    pub fn start_debugging_32(&self, application: ComPtr) -> EngineResult<()> {
        if PROCESS_BITS != 32 {
            return Err(UsageError::WrongBitness {
                requested: 32,
                process: PROCESS_BITS,
            }
            .into());
        }
        check(self.api(), self.api().start_debugging(DebugApplication::Bits32(application)))
    }

    /// Attach an `IDebugApplication64`. Only valid in a 64-bit process.
    pub fn start_debugging_64(&self, application: ComPtr) -> EngineResult<()> {
        if PROCESS_BITS != 64 {
            return Err(UsageError::WrongBitness {
                requested: 64,
                process: PROCESS_BITS,
            }
            .into());
        }
        check(self.api(), self.api().start_debugging(DebugApplication::Bits64(application)))
    }
}

impl CurrentContext<'_, Edge> {
    pub fn start_debugging(&self) -> EngineResult<()> {
        check(self.api(), self.api().start_debugging(DebugApplication::Unified))
    }
}

impl<F: JsRtFlavor> CurrentContext<'_, F> {
    pub fn start_profiling(&self, callback: Rc<dyn ProfilerCallback>, events: ProfilerEventMask, cookie: u32) -> EngineResult<()> {
        check(self.api(), self.api().start_profiling(ProfilerSink::Host(callback), events, cookie))
    }

    /// Hand a native `IActiveScriptProfilerCallback` to the engine.
    pub fn start_profiling_com(&self, callback: ComPtr, events: ProfilerEventMask, cookie: u32) -> EngineResult<()> {
        check(self.api(), self.api().start_profiling(ProfilerSink::Com(callback), events, cookie))
    }

    pub fn stop_profiling(&self, reason: i32) -> EngineResult<()> {
        check(self.api(), self.api().stop_profiling(reason))
    }

    /// Snapshot the heap. The context refuses mutation until the
    /// enumerator is dropped.
    pub fn enumerate_heap(&self) -> EngineResult<HeapSnapshot> {
        let enumerator = check(self.api(), self.api().enumerate_heap())?;
        Ok(HeapSnapshot { enumerator })
    }

    pub fn is_enumerating_heap(&self) -> EngineResult<bool> {
        check(self.api(), self.api().is_enumerating_heap())
    }
}

/// Live heap enumeration.
pub struct HeapSnapshot {
    enumerator: Box<dyn HeapEnumerator>,
}

impl HeapSnapshot {
    const BATCH: usize = 64;

    /// Up to `max` further objects.
    pub fn next_batch(&mut self, max: usize) -> EngineResult<Vec<HeapObjectInfo>> {
        self.enumerator
            .next(max)
            .map_err(|code| UsageError::from_code(code).into())
    }

    /// Drain the remaining objects.
    pub fn collect_all(mut self) -> EngineResult<Vec<HeapObjectInfo>> {
        let mut objects = Vec::new();
        loop {
            let batch = self.next_batch(Self::BATCH)?;
            if batch.is_empty() {
                return Ok(objects);
            }
            objects.extend(batch);
        }
    }
}
