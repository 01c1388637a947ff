//! Change Notification
//!
//! Stores never call their listeners directly. A mutation queues the
//! store's [`ChangeEmitter`] on the shared [`ChangeQueue`]; the dispatcher
//! flushes the queue once every handler has seen the action, so listeners
//! run against a settled set of stores and each store notifies at most
//! once per dispatched action.

use parking_lot::Mutex;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Change callback. Listeners take no arguments and re-read store getters.
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Handle returned by [`ChangeEmitter::add_listener`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ListenerId(u64);

/// Listener registry for one store
#[derive(Default)]
pub struct ChangeEmitter {
    listeners: Mutex<Vec<(ListenerId, Listener)>>,
    next_id: AtomicU64,
}

impl ChangeEmitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&self, listener: impl Fn() + Send + Sync + 'static) -> ListenerId {
        let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
        self.listeners.lock().push((id, Arc::new(listener)));
        id
    }

    /// Returns false when the id was not registered
    pub fn remove_listener(&self, id: ListenerId) -> bool {
        let mut listeners = self.listeners.lock();
        let before = listeners.len();
        listeners.retain(|(lid, _)| *lid != id);
        listeners.len() != before
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.lock().len()
    }

    /// Call every listener registered at the time of the call
    pub fn emit(&self) {
        // Snapshot so listeners can (un)subscribe while being notified.
        let listeners: Vec<Listener> = self
            .listeners
            .lock()
            .iter()
            .map(|(_, listener)| listener.clone())
            .collect();

        for listener in listeners {
            listener();
        }
    }
}

impl fmt::Debug for ChangeEmitter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeEmitter")
            .field("listeners", &self.listener_count())
            .finish()
    }
}

/// Deferred emissions waiting for the end of the current dispatch
#[derive(Default)]
pub struct ChangeQueue {
    pending: Mutex<Vec<Arc<ChangeEmitter>>>,
}

impl ChangeQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue an emission. An emitter already queued is not queued twice.
    pub fn defer(&self, emitter: &Arc<ChangeEmitter>) {
        let mut pending = self.pending.lock();
        if !pending.iter().any(|queued| Arc::ptr_eq(queued, emitter)) {
            pending.push(emitter.clone());
        }
    }

    pub fn is_pending(&self) -> bool {
        !self.pending.lock().is_empty()
    }

    /// Emit everything queued so far, in queue order. Returns how many
    /// emitters fired.
    pub fn flush(&self) -> usize {
        let drained: Vec<Arc<ChangeEmitter>> = std::mem::take(&mut *self.pending.lock());
        for emitter in &drained {
            emitter.emit();
        }
        drained.len()
    }
}

impl fmt::Debug for ChangeQueue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChangeQueue")
            .field("pending", &self.pending.lock().len())
            .finish()
    }
}
