//! Embedded script-engine providers
//!
//! Implements the JsRt call surface (`EmbeddedChakra`) and the ActiveScript
//! COM-shaped surface (`EmbeddedActiveScript`) in process on top of
//! `boa_engine`, so hosts and tests can run without the system libraries.
//!
//! The providers keep the native contracts: status codes, the runtime-wide
//! exception latch, context reference counting, the per-thread current
//! context, heap-enumeration locking, and ActiveScript site callbacks.

#![warn(missing_docs)]
#![warn(rust_2018_idioms)]

mod activescript;
mod convert;
mod envelope;
mod heap;
mod jsrt;
mod profiler;
mod registry;
mod runtime;

use serde::{Deserialize, Serialize};

pub use activescript::EmbeddedActiveScript;
pub use envelope::{ENVELOPE_SIZE, MAGIC as ENVELOPE_MAGIC};
pub use jsrt::EmbeddedChakra;

/// Limits applied to every engine instance an embedded provider creates.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddedOptions {
    /// Maximum call depth before the engine faults
    pub recursion_limit: usize,
    /// Maximum iterations of a single loop before the engine faults
    pub loop_iteration_limit: u64,
}

impl Default for EmbeddedOptions {
    fn default() -> Self {
        Self {
            recursion_limit: 512,
            loop_iteration_limit: u64::MAX,
        }
    }
}

impl EmbeddedOptions {
    /// Set the recursion limit.
    pub fn with_recursion_limit(mut self, limit: usize) -> Self {
        self.recursion_limit = limit;
        self
    }

    /// Set the loop iteration limit.
    pub fn with_loop_iteration_limit(mut self, limit: u64) -> Self {
        self.loop_iteration_limit = limit;
        self
    }

    pub(crate) fn new_engine(&self) -> boa_engine::Context {
        let mut engine = boa_engine::Context::default();
        let limits = engine.runtime_limits_mut();
        limits.set_recursion_limit(self.recursion_limit);
        limits.set_loop_iteration_limit(self.loop_iteration_limit);
        engine
    }
}
