use std::sync::atomic::{AtomicU32, Ordering};

use log::warn;

use crate::{base::atomic::CompareAndSwap, types::ObjectId};

/// Hands out session-unique object ids. Safe to share between threads.
pub struct ObjectIdGenerator {
    next: AtomicU32,
}

impl ObjectIdGenerator {
    pub fn new() -> Self {
        Self::starting_at(ObjectId::FIRST_DYNAMIC)
    }

    pub fn starting_at(first: ObjectId) -> Self {
        Self {
            next: AtomicU32::new(first.value()),
        }
    }

    pub fn generate(&self) -> ObjectId {
        loop {
            let current = self.next.load(Ordering::SeqCst);
            // wrap back into the dynamic range, skipping the well-known ids
            let next = match current.checked_add(1) {
                Some(next) => next,
                None => {
                    warn!("Object id space exhausted, wrapping around");
                    ObjectId::FIRST_DYNAMIC.value()
                }
            };
            if self.next.compare_and_set(current, next) {
                return ObjectId::new(current);
            }
        }
    }
}

impl Default for ObjectIdGenerator {
    fn default() -> Self {
        Self::new()
    }
}
