use std::{
    ops::{AddAssign, SubAssign},
    time::{Duration, Instant},
};

use parking_lot::{Condvar, Mutex};

/// A value guarded by a lock and a condition variable. Every write wakes all
/// waiters, which re-check their condition against the new value.
pub struct Monitor<T> {
    value: Mutex<T>,
    changed: Condvar,
}

impl<T: Clone + PartialEq> Monitor<T> {
    pub fn new(value: T) -> Self {
        Self {
            value: Mutex::new(value),
            changed: Condvar::new(),
        }
    }

    pub fn get(&self) -> T {
        self.value.lock().clone()
    }

    pub fn set(&self, value: T) {
        let mut guard = self.value.lock();
        *guard = value;
        self.changed.notify_all();
    }

    /// Read-modify-write under the lock. Returns the new value.
    pub fn update<F: FnOnce(&mut T)>(&self, f: F) -> T {
        let mut guard = self.value.lock();
        f(&mut guard);
        self.changed.notify_all();
        guard.clone()
    }

    /// Writes `new` only if the current value equals `expected`
    pub fn compare_and_set(&self, expected: &T, new: T) -> bool {
        let mut guard = self.value.lock();
        if *guard != *expected {
            return false;
        }
        *guard = new;
        self.changed.notify_all();
        true
    }

    // Blocking waits

    pub fn wait_eq(&self, value: &T) -> T {
        self.wait_for(|current| current == value)
    }

    pub fn wait_ne(&self, value: &T) -> T {
        self.wait_for(|current| current != value)
    }

    pub fn wait_for<P: FnMut(&T) -> bool>(&self, mut predicate: P) -> T {
        let mut guard = self.value.lock();
        while !predicate(&guard) {
            self.changed.wait(&mut guard);
        }
        guard.clone()
    }

    // Bounded waits. `None` means the condition did not hold before the
    // timeout elapsed.

    pub fn wait_eq_timeout(&self, value: &T, timeout: Duration) -> Option<T> {
        self.wait_for_timeout(|current| current == value, timeout)
    }

    pub fn wait_ne_timeout(&self, value: &T, timeout: Duration) -> Option<T> {
        self.wait_for_timeout(|current| current != value, timeout)
    }

    pub fn wait_for_timeout<P: FnMut(&T) -> bool>(
        &self,
        mut predicate: P,
        timeout: Duration,
    ) -> Option<T> {
        let deadline = Instant::now() + timeout;
        let mut guard = self.value.lock();
        while !predicate(&guard) {
            if self.changed.wait_until(&mut guard, deadline).timed_out() {
                return if predicate(&guard) {
                    Some(guard.clone())
                } else {
                    None
                };
            }
        }
        Some(guard.clone())
    }
}

impl<T> Monitor<T>
where
    T: Clone + PartialEq + AddAssign + SubAssign + From<u8>,
{
    /// Adds one and returns the new value
    pub fn increment(&self) -> T {
        self.update(|value| *value += T::from(1))
    }

    /// Subtracts one and returns the new value
    pub fn decrement(&self) -> T {
        self.update(|value| *value -= T::from(1))
    }
}

impl<T: Clone + PartialEq + Default> Default for Monitor<T> {
    fn default() -> Self {
        Self::new(T::default())
    }
}
