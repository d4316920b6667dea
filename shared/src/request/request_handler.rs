use std::{
    collections::HashMap,
    sync::atomic::{AtomicU64, Ordering},
    time::{Duration, Instant},
};

use log::warn;
use parking_lot::{Condvar, Mutex};

use crate::{request::RequestError, types::RequestId};

/// Handle for a registered request. Carry its id in the outgoing command and
/// pass it to `RequestHandler::wait`.
#[must_use]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingRequest {
    id: RequestId,
}

impl PendingRequest {
    pub fn id(&self) -> RequestId {
        self.id
    }
}

/// Matches replies to outstanding requests.
///
/// Ids are unique for the lifetime of the handler. Registration and
/// fulfilment may happen on different threads; every waiter is woken when
/// any request is fulfilled and re-checks its own slot.
pub struct RequestHandler<T> {
    next_id: AtomicU64,
    pending: Mutex<HashMap<RequestId, Option<T>>>,
    fulfilled: Condvar,
}

impl<T> RequestHandler<T> {
    pub fn new() -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Mutex::new(HashMap::new()),
            fulfilled: Condvar::new(),
        }
    }

    /// Allocates a fresh id and marks it pending
    pub fn register(&self) -> PendingRequest {
        let id = RequestId::new(self.next_id.fetch_add(1, Ordering::SeqCst));
        self.pending.lock().insert(id, None);
        PendingRequest { id }
    }

    /// Whether `id` was handed out by this handler, regardless of whether it
    /// is still pending
    pub fn is_issued(&self, id: RequestId) -> bool {
        id.value() != 0 && id.value() < self.next_id.load(Ordering::SeqCst)
    }

    pub fn is_pending(&self, id: RequestId) -> bool {
        self.pending.lock().contains_key(&id)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Stores the reply for `id` and wakes its waiter.
    ///
    /// Replies for ids that are not pending (never issued, consumed, or
    /// abandoned after a timeout) and second replies are discarded.
    pub fn fulfil(&self, id: RequestId, payload: T) -> Result<(), RequestError> {
        let mut pending = self.pending.lock();
        match pending.get_mut(&id) {
            None => {
                warn!("Discarding reply for {}: not pending", id);
                Err(RequestError::UnknownRequest { id })
            }
            Some(Some(_)) => {
                warn!("Discarding duplicate reply for {}", id);
                Err(RequestError::DuplicateReply { id })
            }
            Some(slot) => {
                *slot = Some(payload);
                self.fulfilled.notify_all();
                Ok(())
            }
        }
    }

    /// Blocks until `id` is fulfilled and returns its payload, consuming the
    /// request. On timeout the request is abandoned.
    pub fn wait(&self, id: RequestId, timeout: Duration) -> Result<T, RequestError> {
        match self.poll(id, timeout)? {
            Some(payload) => Ok(payload),
            None => {
                if let Some(payload) = self.abandon(id) {
                    return Ok(payload);
                }
                warn!("{} abandoned after waiting {:?}", id, timeout);
                Err(RequestError::Timeout {
                    id,
                    waited: timeout,
                })
            }
        }
    }

    /// Blocks up to `timeout` for `id`. Unlike `wait`, the request stays
    /// pending when no reply arrived in time.
    pub fn poll(&self, id: RequestId, timeout: Duration) -> Result<Option<T>, RequestError> {
        let deadline = Instant::now() + timeout;
        let mut pending = self.pending.lock();
        loop {
            match pending.get(&id) {
                None => return Err(RequestError::UnknownRequest { id }),
                Some(Some(_)) => return Ok(pending.remove(&id).flatten()),
                Some(None) => {}
            }
            if self.fulfilled.wait_until(&mut pending, deadline).timed_out() {
                return match pending.get(&id) {
                    None => Err(RequestError::UnknownRequest { id }),
                    Some(None) => Ok(None),
                    Some(Some(_)) => Ok(pending.remove(&id).flatten()),
                };
            }
        }
    }

    /// Non-blocking poll. `Ok(None)` while the reply is outstanding.
    pub fn try_take(&self, id: RequestId) -> Result<Option<T>, RequestError> {
        let mut pending = self.pending.lock();
        match pending.get(&id) {
            None => Err(RequestError::UnknownRequest { id }),
            Some(None) => Ok(None),
            Some(Some(_)) => Ok(pending.remove(&id).flatten()),
        }
    }

    /// Gives up on `id`. Returns the reply if one raced in before the
    /// request was dropped.
    pub fn abandon(&self, id: RequestId) -> Option<T> {
        self.pending.lock().remove(&id).flatten()
    }
}

impl<T> Default for RequestHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}
