//! Heap snapshot enumerator

use std::cell::Cell;
use std::collections::VecDeque;
use std::rc::Rc;

use msie_sys::{HeapEnumerator, HeapObjectInfo, Status};

/// Snapshot of a context's object handles. Holds the context's heap lock
/// until dropped.
pub(crate) struct SnapshotHeapEnumerator {
    objects: VecDeque<HeapObjectInfo>,
    lock: Rc<Cell<bool>>,
}

impl SnapshotHeapEnumerator {
    pub(crate) fn new(objects: Vec<HeapObjectInfo>, lock: Rc<Cell<bool>>) -> Self {
        lock.set(true);
        Self {
            objects: objects.into(),
            lock,
        }
    }
}

impl HeapEnumerator for SnapshotHeapEnumerator {
    fn next(&mut self, max: usize) -> Status<Vec<HeapObjectInfo>> {
        let count = max.min(self.objects.len());
        Ok(self.objects.drain(..count).collect())
    }
}

impl Drop for SnapshotHeapEnumerator {
    fn drop(&mut self) {
        self.lock.set(false);
    }
}
