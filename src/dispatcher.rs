//! Dispatcher
//!
//! Synchronous callback registry. Every dispatched [`Action`] is handed to
//! each registered handler in registration order before `dispatch`
//! returns; queued change notifications are flushed afterwards.
//!
//! Handlers must not dispatch or change the handler list. A nested
//! `dispatch`, `register` or `unregister` from inside a handler is
//! rejected with a [`DispatchError`] instead of deadlocking or
//! interleaving two actions.
//!
//! Dispatches from different threads are serialized up to and including
//! the flush, so a listener only ever observes fully applied actions.
//! Listeners run after the handlers have returned and may dispatch again
//! on the same thread.

use parking_lot::{Mutex, ReentrantMutex};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, ThreadId};
use thiserror::Error;

use crate::action::Action;
use crate::emitter::ChangeQueue;

type Handler = Box<dyn FnMut(&Action) + Send>;

/// Handle returned by [`Dispatcher::register`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DispatchToken(u64);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DispatchError {
    #[error("cannot dispatch {action} from inside a dispatch handler")]
    Reentrant { action: String },
    #[error("cannot {operation} a handler from inside a dispatch handler")]
    HandlersBusy { operation: &'static str },
}

pub struct Dispatcher {
    /// Held from the first handler until the flush has drained. Re-entrant
    /// so listeners can dispatch on the flushing thread.
    serial: ReentrantMutex<()>,
    handlers: Mutex<Vec<(DispatchToken, Handler)>>,
    /// Thread currently running handlers, if any
    active: Mutex<Option<ThreadId>>,
    next_token: AtomicU64,
    changes: Arc<ChangeQueue>,
}

/// Clears the active marker even if a handler panics
struct ActiveGuard<'a>(&'a Mutex<Option<ThreadId>>);

impl Drop for ActiveGuard<'_> {
    fn drop(&mut self) {
        *self.0.lock() = None;
    }
}

impl Dispatcher {
    pub fn new() -> Self {
        Self {
            serial: ReentrantMutex::new(()),
            handlers: Mutex::new(Vec::new()),
            active: Mutex::new(None),
            next_token: AtomicU64::new(1),
            changes: Arc::new(ChangeQueue::new()),
        }
    }

    /// Queue stores use to defer their change emission
    pub fn changes(&self) -> Arc<ChangeQueue> {
        self.changes.clone()
    }

    /// True while this thread is inside a handler
    fn in_handler(&self) -> bool {
        *self.active.lock() == Some(thread::current().id())
    }

    fn check_handlers(&self, operation: &'static str) -> Result<(), DispatchError> {
        if self.in_handler() {
            tracing::error!("{} called from inside a dispatch handler", operation);
            return Err(DispatchError::HandlersBusy { operation });
        }
        Ok(())
    }

    pub fn register(
        &self,
        handler: impl FnMut(&Action) + Send + 'static,
    ) -> Result<DispatchToken, DispatchError> {
        self.check_handlers("register")?;
        let token = DispatchToken(self.next_token.fetch_add(1, Ordering::Relaxed));
        self.handlers.lock().push((token, Box::new(handler)));
        Ok(token)
    }

    /// Returns `Ok(false)` when the token was not registered
    pub fn unregister(&self, token: DispatchToken) -> Result<bool, DispatchError> {
        self.check_handlers("unregister")?;
        let mut handlers = self.handlers.lock();
        let before = handlers.len();
        handlers.retain(|(t, _)| *t != token);
        Ok(handlers.len() != before)
    }

    /// Number of registered handlers. Must not be called from a handler.
    pub fn handler_count(&self) -> usize {
        self.handlers.lock().len()
    }

    pub fn is_dispatching(&self) -> bool {
        self.active.lock().is_some()
    }

    /// Run every handler on `action`, then flush deferred change
    /// notifications. Dispatches from other threads wait their turn.
    pub fn dispatch(&self, action: Action) -> Result<(), DispatchError> {
        if self.in_handler() {
            tracing::error!("re-entrant dispatch of {}", action.action_type());
            return Err(DispatchError::Reentrant {
                action: action.action_type(),
            });
        }

        let _serial = self.serial.lock();
        tracing::debug!("dispatch {}", action.action_type());

        {
            let mut handlers = self.handlers.lock();
            *self.active.lock() = Some(thread::current().id());
            let _active = ActiveGuard(&self.active);

            for (_, handler) in handlers.iter_mut() {
                handler(&action);
            }
        }

        self.changes.flush();
        Ok(())
    }
}

impl Default for Dispatcher {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Dispatcher")
            .field("handlers", &self.handlers.try_lock().map(|h| h.len()))
            .field("dispatching", &self.is_dispatching())
            .finish()
    }
}
