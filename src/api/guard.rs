//! Stale response guard
//!
//! Every sync request takes a fresh token. When its response arrives the
//! token is compared with the newest one issued; an older request's result
//! is dropped even if it lands last. Requests are never cancelled.

use parking_lot::Mutex;
use uuid::Uuid;

#[derive(Debug, Default)]
pub struct SyncGuard {
    current: Mutex<Option<Uuid>>,
}

impl SyncGuard {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a request, superseding any request still in flight
    pub fn begin(&self) -> Uuid {
        let id = Uuid::new_v4();
        *self.current.lock() = Some(id);
        id
    }

    pub fn is_current(&self, id: &Uuid) -> bool {
        self.current.lock().as_ref() == Some(id)
    }
}
