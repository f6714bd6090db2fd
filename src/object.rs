//! Pooled object wrapper carrying lifecycle state, timestamps and the
//! pending eviction task handle

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU8, Ordering};
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::eviction::EvictionHandle;

/// Lifecycle state of a pooled object
///
/// Transitions are `New -> Borrowed`, `Borrowed -> Returned`,
/// `Returned -> Borrowed` on reuse, and any non-terminal state to
/// `Invalid`, which is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ObjectState {
    New,
    Borrowed,
    Returned,
    Invalid,
}

impl ObjectState {
    fn as_u8(self) -> u8 {
        match self {
            ObjectState::New => 0,
            ObjectState::Borrowed => 1,
            ObjectState::Returned => 2,
            ObjectState::Invalid => 3,
        }
    }

    fn from_u8(raw: u8) -> Self {
        match raw {
            0 => ObjectState::New,
            1 => ObjectState::Borrowed,
            2 => ObjectState::Returned,
            _ => ObjectState::Invalid,
        }
    }
}

pub(crate) fn now_millis() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|elapsed| elapsed.as_millis() as i64)
        .unwrap_or(0)
}

/// A pool-managed wrapper around a user resource
///
/// The pool hands these out on borrow and takes them back on return; the
/// wrapped resource is reachable through [`object`](PooledObject::object).
/// Identity is a stable per-instance id assigned at creation, never derived
/// from the resource's fields.
pub struct PooledObject<T> {
    object: T,
    id: u64,
    state: AtomicU8,
    created_at: i64,
    last_borrowed_at: AtomicI64,
    last_returned_at: AtomicI64,
    scheduled_eviction: Mutex<Option<EvictionHandle>>,
}

impl<T> PooledObject<T> {
    pub(crate) fn new(object: T, id: u64) -> Self {
        Self {
            object,
            id,
            state: AtomicU8::new(ObjectState::New.as_u8()),
            created_at: now_millis(),
            last_borrowed_at: AtomicI64::new(0),
            last_returned_at: AtomicI64::new(0),
            scheduled_eviction: Mutex::new(None),
        }
    }

    /// The wrapped resource
    pub fn object(&self) -> &T {
        &self.object
    }

    /// Stable per-instance identity key
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Current lifecycle state
    pub fn state(&self) -> ObjectState {
        ObjectState::from_u8(self.state.load(Ordering::Acquire))
    }

    /// Whether the object has not been invalidated
    pub fn is_valid(&self) -> bool {
        self.state() != ObjectState::Invalid
    }

    /// Whether the object is currently borrowed
    pub fn is_borrowed(&self) -> bool {
        self.state() == ObjectState::Borrowed
    }

    /// Creation time, epoch milliseconds
    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    /// Last borrow time, epoch milliseconds; zero when never borrowed
    pub fn last_borrowed_at(&self) -> i64 {
        self.last_borrowed_at.load(Ordering::Acquire)
    }

    /// Last return time, epoch milliseconds; zero when never returned
    pub fn last_returned_at(&self) -> i64 {
        self.last_returned_at.load(Ordering::Acquire)
    }

    pub(crate) fn set_borrowed(&self) {
        self.state.store(ObjectState::Borrowed.as_u8(), Ordering::Release);
    }

    pub(crate) fn set_returned(&self) {
        self.state.store(ObjectState::Returned.as_u8(), Ordering::Release);
    }

    pub(crate) fn set_invalid(&self) {
        self.state.store(ObjectState::Invalid.as_u8(), Ordering::Release);
    }

    pub(crate) fn update_last_borrowed_time(&self) {
        self.last_borrowed_at.store(now_millis(), Ordering::Release);
    }

    pub(crate) fn update_last_returned_time(&self) {
        self.last_returned_at.store(now_millis(), Ordering::Release);
    }

    pub(crate) fn set_eviction_task(&self, handle: EvictionHandle) {
        *self.scheduled_eviction.lock().unwrap() = Some(handle);
    }

    pub(crate) fn cancel_eviction_task(&self) {
        if let Some(handle) = self.scheduled_eviction.lock().unwrap().take() {
            handle.cancel();
        }
    }
}

impl<T> fmt::Debug for PooledObject<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PooledObject")
            .field("id", &self.id)
            .field("state", &self.state())
            .field("created_at", &self.created_at)
            .field("last_borrowed_at", &self.last_borrowed_at())
            .field("last_returned_at", &self.last_returned_at())
            .finish()
    }
}
