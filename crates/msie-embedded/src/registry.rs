//! Process-wide handle allocation and thread ownership
//!
//! Handles are unique across every provider instance, so a handle presented
//! on the wrong thread can be told apart from a handle that never existed.

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread::{self, ThreadId};

use msie_sys::JsErrorCode;
use once_cell::sync::Lazy;
use parking_lot::Mutex;

static NEXT_HANDLE: AtomicUsize = AtomicUsize::new(0x1000);

static OWNERS: Lazy<Mutex<HashMap<usize, ThreadId>>> = Lazy::new(|| Mutex::new(HashMap::new()));

/// Fresh non-zero handle value.
pub(crate) fn next_handle() -> usize {
    NEXT_HANDLE.fetch_add(1, Ordering::Relaxed)
}

/// Fresh handle owned by the calling thread.
pub(crate) fn next_owned_handle() -> usize {
    let raw = next_handle();
    OWNERS.lock().insert(raw, thread::current().id());
    raw
}

/// Forget a handle when the object it names is destroyed.
pub(crate) fn release(raw: usize) {
    OWNERS.lock().remove(&raw);
}

/// Status for a handle the calling provider does not know.
pub(crate) fn unknown(raw: usize) -> JsErrorCode {
    match OWNERS.lock().get(&raw) {
        Some(owner) if *owner != thread::current().id() => JsErrorCode::WrongThread,
        _ => JsErrorCode::InvalidArgument,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handles_are_unique() {
        let a = next_handle();
        let b = next_handle();
        assert_ne!(a, b);
        assert_ne!(a, 0);
    }

    #[test]
    fn test_unknown_handle_on_other_thread() {
        let raw = thread::spawn(next_owned_handle).join().unwrap();
        assert_eq!(unknown(raw), JsErrorCode::WrongThread);
        release(raw);
        assert_eq!(unknown(raw), JsErrorCode::InvalidArgument);
    }
}
