use std::sync::Arc;

use parking_lot::RwLock;

/// A list of registered listeners. Notification works on a snapshot of the
/// list, so listeners may add or remove listeners while being notified.
pub struct ObserverList<L: ?Sized> {
    observers: RwLock<Vec<Arc<L>>>,
}

impl<L: ?Sized> ObserverList<L> {
    pub fn new() -> Self {
        Self {
            observers: RwLock::new(Vec::new()),
        }
    }

    pub fn add(&self, observer: Arc<L>) {
        self.observers.write().push(observer);
    }

    /// Removes the given listener. Returns false if it was not registered.
    pub fn remove(&self, observer: &Arc<L>) -> bool {
        let mut observers = self.observers.write();
        let Some(index) = observers.iter().position(|entry| Arc::ptr_eq(entry, observer)) else {
            return false;
        };
        observers.remove(index);
        true
    }

    pub fn notify<F: FnMut(&L)>(&self, mut f: F) {
        let snapshot = self.observers.read().clone();
        for observer in snapshot.iter() {
            f(observer.as_ref());
        }
    }

    pub fn len(&self) -> usize {
        self.observers.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.read().is_empty()
    }
}

impl<L: ?Sized> Default for ObserverList<L> {
    fn default() -> Self {
        Self::new()
    }
}
