//! Core object pool: borrow/return state machine, bounded creation,
//! blocking acquire and shutdown drain

use std::ops::Deref;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, RwLock, Weak};
use std::time::Duration;

use crossbeam::channel::{self, Receiver, RecvTimeoutError, Sender};
use dashmap::DashMap;
use tracing::{debug, error, trace, warn};

use crate::config::PoolConfiguration;
use crate::errors::{PoolError, PoolResult};
use crate::eviction::IdleScheduler;
use crate::manager::PooledObjectManager;
use crate::object::{now_millis, PooledObject};
use crate::stats::{PoolStats, StatsTracker};

/// Slack added to the eviction delay so the task observes the idle
/// interval as already elapsed when it runs
const IDLE_SCHEDULE_OFFSET_MILLIS: u64 = 100;

/// Bounded park for the non-blocking acquire mode, releasing the CPU
/// instead of spinning on the queue
const NO_WAIT_PARK: Duration = Duration::from_micros(1);

/// FIFO of returned, available objects with timed blocking pop
struct IdleQueue<T> {
    tx: Sender<Arc<PooledObject<T>>>,
    rx: Receiver<Arc<PooledObject<T>>>,
}

impl<T> IdleQueue<T> {
    fn new() -> Self {
        let (tx, rx) = channel::unbounded();
        Self { tx, rx }
    }

    fn push(&self, object: Arc<PooledObject<T>>) {
        // both ends live as long as the pool, the send cannot fail
        let _ = self.tx.send(object);
    }

    fn try_pop(&self) -> Option<Arc<PooledObject<T>>> {
        self.rx.try_recv().ok()
    }

    fn pop_timeout(&self, timeout: Duration) -> PoolResult<Option<Arc<PooledObject<T>>>> {
        match self.rx.recv_timeout(timeout) {
            Ok(object) => Ok(Some(object)),
            Err(RecvTimeoutError::Timeout) => Ok(None),
            Err(RecvTimeoutError::Disconnected) => Err(PoolError::Interrupted),
        }
    }

    fn pop_blocking(&self) -> PoolResult<Arc<PooledObject<T>>> {
        self.rx.recv().map_err(|_| PoolError::Interrupted)
    }

    fn len(&self) -> usize {
        self.rx.len()
    }
}

struct PoolInner<M: PooledObjectManager> {
    self_weak: Weak<PoolInner<M>>,
    manager: M,
    config: PoolConfiguration,
    idle: IdleQueue<M::Object>,
    all_objects: DashMap<u64, Arc<PooledObject<M::Object>>>,
    create_lock: Mutex<()>,
    pool_lock: RwLock<()>,
    closed: AtomicBool,
    stats: StatsTracker,
    scheduler: Option<IdleScheduler>,
    next_id: AtomicU64,
}

/// Thread-safe object pool with lazy creation, bounded capacity and
/// background idle eviction
///
/// Borrowers receive a shared [`PooledObject`] handle and give it back with
/// [`return_object`](ObjectPool::return_object), or use
/// [`acquire`](ObjectPool::acquire) for a scoped guard that returns the
/// object when dropped. The pool serializes creation so capacity is never
/// overshot and blocks saturated borrowers on the idle queue according to
/// the configured poll timeout.
pub struct ObjectPool<M: PooledObjectManager> {
    inner: Arc<PoolInner<M>>,
}

impl<M: PooledObjectManager> ObjectPool<M> {
    /// Create a pool with the default configuration
    pub fn new(manager: M) -> PoolResult<Self> {
        Self::with_config(manager, PoolConfiguration::default())
    }

    /// Create a pool with an explicit configuration
    pub fn with_config(manager: M, config: PoolConfiguration) -> PoolResult<Self> {
        config.validate()?;
        let scheduler = if config.idle_timeout > 0 {
            let keep_alive = (config.scheduled_thread_life_time > 0)
                .then(|| Duration::from_millis(config.scheduled_thread_life_time as u64));
            Some(IdleScheduler::new(keep_alive))
        } else {
            None
        };
        debug!("setting up object pool with configuration: {config:?}");
        let inner = Arc::new_cyclic(|weak| PoolInner {
            self_weak: weak.clone(),
            manager,
            idle: IdleQueue::new(),
            all_objects: DashMap::with_capacity(config.max_pool_size),
            create_lock: Mutex::new(()),
            pool_lock: RwLock::new(()),
            closed: AtomicBool::new(false),
            stats: StatsTracker::new(),
            scheduler,
            next_id: AtomicU64::new(1),
            config,
        });
        Ok(Self { inner })
    }

    /// Borrow one object, transitioning it to `Borrowed`
    ///
    /// `Ok(None)` is only returned in the non-blocking mode
    /// (`poll_timeout == 0`) when no object is immediately available.
    pub fn borrow(&self) -> PoolResult<Option<Arc<PooledObject<M::Object>>>> {
        let _read = self.inner.pool_lock.read().unwrap();
        let Some(pooled) = self.inner.get_pooled_object()? else {
            return Ok(None);
        };
        pooled.set_borrowed();
        pooled.update_last_borrowed_time();
        self.inner.stats.update_borrow_stats();
        self.inner.stats.update_last_access_time();
        Ok(Some(pooled))
    }

    /// Borrow with scoped release: the returned guard hands the object back
    /// to the pool when dropped
    pub fn acquire(&self) -> PoolResult<Option<PoolGuard<M>>> {
        Ok(self.borrow()?.map(|pooled| PoolGuard {
            object: Some(pooled),
            pool: Arc::clone(&self.inner),
        }))
    }

    /// Return a previously borrowed object
    ///
    /// A closed pool, an `idle_timeout` of zero or a failed return-side
    /// validation invalidate the object instead of re-pooling it; none of
    /// those are errors to the caller.
    pub fn return_object(&self, pooled: &Arc<PooledObject<M::Object>>) -> PoolResult<()> {
        self.inner.return_pooled(pooled)
    }

    /// Close the pool: idempotent, never raises
    ///
    /// Shuts the eviction scheduler down and drains and invalidates every
    /// idle object. Borrowed objects are not reclaimed; they are
    /// invalidated when their holders return them.
    pub fn close(&self) {
        self.inner.close();
    }

    /// Whether the pool has been closed
    pub fn is_closed(&self) -> bool {
        self.inner.is_closed()
    }

    /// Current number of live objects
    pub fn size(&self) -> usize {
        self.inner.stats.pool_size()
    }

    /// Current number of idle objects
    pub fn idle_count(&self) -> usize {
        self.inner.idle.len()
    }

    /// Snapshot of the pool counters
    pub fn stats(&self) -> PoolStats {
        self.inner.stats.snapshot()
    }

    /// Snapshot of pool state, stats, configuration, scheduler state and
    /// idle count
    pub fn debug_info(&self) -> String {
        self.inner.debug_info()
    }
}

impl<M: PooledObjectManager> PoolInner<M> {
    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::Acquire)
    }

    fn get_pooled_object(&self) -> PoolResult<Option<Arc<PooledObject<M::Object>>>> {
        loop {
            if self.is_closed() {
                return Err(PoolError::PoolClosed);
            }
            let mut candidate = self.idle.try_pop();
            if candidate.is_none() && self.stats.pool_size() < self.config.max_pool_size {
                let _create = self.create_lock.lock().unwrap();
                if self.stats.pool_size() < self.config.max_pool_size {
                    let object = self.try_to_create()?;
                    let id = self.next_id.fetch_add(1, Ordering::Relaxed);
                    let pooled = Arc::new(PooledObject::new(object, id));
                    self.all_objects.insert(id, Arc::clone(&pooled));
                    self.stats.update_create_stats();
                    trace!("pooled object created: {pooled:?}");
                    return Ok(Some(pooled));
                }
            }
            if candidate.is_none() {
                if self.config.poll_timeout > 0 {
                    let timeout = Duration::from_millis(self.config.poll_timeout as u64);
                    candidate = self.idle.pop_timeout(timeout)?;
                    if candidate.is_none() {
                        return Err(PoolError::PollTimeout(timeout));
                    }
                } else if self.config.is_poll_no_wait() {
                    candidate = self.idle.pop_timeout(NO_WAIT_PARK)?;
                } else {
                    candidate = Some(self.idle.pop_blocking()?);
                }
            }
            if let Some(pooled) = candidate {
                // the eviction task may have invalidated it while queued
                if !pooled.is_valid() || self.validate_fail_on_borrow(&pooled) {
                    self.invalid_pooled_object(&pooled);
                    continue;
                }
                return Ok(Some(pooled));
            }
            if self.config.is_poll_no_wait() {
                return Ok(None);
            }
            trace!("no idle object obtained, retrying acquire");
        }
    }

    fn try_to_create(&self) -> PoolResult<M::Object> {
        let mut attempts = 0u32;
        loop {
            attempts += 1;
            match self.manager.create() {
                Ok(object) => return Ok(object),
                Err(e) => {
                    if attempts > self.config.create_retry_count {
                        error!("creating pooled object failed after {attempts} attempt(s): {e}");
                        return Err(PoolError::CreateFailed {
                            attempts,
                            source: Box::new(e),
                        });
                    }
                    warn!(
                        "creating pooled object failed: {e}, retrying ({attempts} of {})",
                        self.config.create_retry_count
                    );
                }
            }
        }
    }

    fn validate_fail_on_borrow(&self, pooled: &Arc<PooledObject<M::Object>>) -> bool {
        self.config.validate_on_borrow && !self.validate(pooled)
    }

    fn validate_fail_on_return(&self, pooled: &Arc<PooledObject<M::Object>>) -> bool {
        self.config.validate_on_return && !self.validate(pooled)
    }

    fn validate(&self, pooled: &Arc<PooledObject<M::Object>>) -> bool {
        match self.manager.validate(pooled) {
            Ok(valid) => valid,
            Err(e) => {
                warn!(
                    "validating pooled object {} errored, treating as invalid: {e}",
                    pooled.id()
                );
                false
            }
        }
    }

    /// Removing the map entry is the single guard for `Manager::invalid`,
    /// so each object is destroyed at most once
    fn invalid_pooled_object(&self, pooled: &Arc<PooledObject<M::Object>>) {
        let removed = self
            .all_objects
            .remove_if(&pooled.id(), |_, entry| Arc::ptr_eq(entry, pooled));
        if removed.is_some() {
            if let Err(e) = self.manager.invalid(pooled) {
                warn!("disposing of pooled object {} failed: {e}", pooled.id());
            }
            pooled.set_invalid();
            let _create = self.create_lock.lock().unwrap();
            self.stats.update_remove_stats();
        }
    }

    fn return_pooled(&self, pooled: &Arc<PooledObject<M::Object>>) -> PoolResult<()> {
        let known = self
            .all_objects
            .get(&pooled.id())
            .map(|entry| Arc::ptr_eq(entry.value(), pooled))
            .unwrap_or(false);
        if !known {
            return Err(PoolError::NotInPool);
        }
        if !pooled.is_borrowed() {
            return Err(PoolError::AlreadyReturned);
        }
        self.stats.update_last_access_time();
        let _read = self.pool_lock.read().unwrap();
        if self.is_closed()
            || self.config.is_idle_always_timeout()
            || !pooled.is_valid()
            || self.validate_fail_on_return(pooled)
        {
            self.invalid_pooled_object(pooled);
            pooled.cancel_eviction_task();
            return Ok(());
        }
        pooled.set_returned();
        pooled.update_last_returned_time();
        pooled.cancel_eviction_task();
        self.schedule_idle_eviction(pooled);
        self.idle.push(Arc::clone(pooled));
        self.stats.update_return_stats();
        Ok(())
    }

    fn schedule_idle_eviction(&self, pooled: &Arc<PooledObject<M::Object>>) {
        if let Some(scheduler) = &self.scheduler {
            let delay = Duration::from_millis(
                self.config.idle_timeout as u64 + IDLE_SCHEDULE_OFFSET_MILLIS,
            );
            let pool = self.self_weak.clone();
            let object = Arc::clone(pooled);
            let handle = scheduler.schedule(delay, move || {
                if let Some(pool) = pool.upgrade() {
                    pool.evict_if_idle(&object);
                }
            });
            pooled.set_eviction_task(handle);
        }
    }

    /// Eviction task body, double-checked because a borrow may have raced
    /// the timer
    fn evict_if_idle(&self, pooled: &Arc<PooledObject<M::Object>>) {
        if !self.should_evict(pooled) {
            return;
        }
        let _write = self.pool_lock.write().unwrap();
        if self.should_evict(pooled) {
            self.invalid_pooled_object(pooled);
            debug!("evicted idle pooled object: {pooled:?}");
        }
    }

    fn should_evict(&self, pooled: &Arc<PooledObject<M::Object>>) -> bool {
        pooled.is_valid()
            && !pooled.is_borrowed()
            && !self.is_closed()
            && self.is_idle_timed_out(pooled)
    }

    fn is_idle_timed_out(&self, pooled: &Arc<PooledObject<M::Object>>) -> bool {
        self.config.is_idle_always_timeout()
            || (!self.config.is_idle_never_timeout()
                && pooled.last_returned_at() > 0
                && now_millis() - pooled.last_returned_at() >= self.config.idle_timeout)
    }

    fn close(&self) {
        if self.is_closed() {
            return;
        }
        {
            let _write = self.pool_lock.write().unwrap();
            if self.closed.swap(true, Ordering::AcqRel) {
                return;
            }
            if let Some(scheduler) = &self.scheduler {
                scheduler.shutdown();
            }
            while let Some(pooled) = self.idle.try_pop() {
                self.invalid_pooled_object(&pooled);
            }
        }
        debug!("object pool closed, {}", self.debug_info());
    }

    fn debug_info(&self) -> String {
        format!(
            "pool state: {}, {}, {:?}, idle scheduler: {}, idle object size: {}",
            if self.is_closed() { "CLOSED" } else { "RUNNING" },
            self.stats.snapshot(),
            self.config,
            self.scheduler
                .as_ref()
                .map_or_else(|| "NOT RUNNING".to_string(), IdleScheduler::debug_state),
            self.idle.len(),
        )
    }
}

impl<M: PooledObjectManager> Drop for PoolInner<M> {
    fn drop(&mut self) {
        if !self.is_closed() {
            warn!(
                "object pool dropped without close, invalidating {} remaining object(s)",
                self.all_objects.len()
            );
        }
        if let Some(scheduler) = &self.scheduler {
            scheduler.shutdown();
        }
        let ids: Vec<u64> = self.all_objects.iter().map(|entry| *entry.key()).collect();
        for id in ids {
            if let Some((_, pooled)) = self.all_objects.remove(&id) {
                if let Err(e) = self.manager.invalid(&pooled) {
                    warn!("disposing of pooled object {} failed: {e}", pooled.id());
                }
                pooled.set_invalid();
            }
        }
    }
}

/// Scoped acquisition: dereferences to the pooled resource and returns it
/// to the pool when dropped
pub struct PoolGuard<M: PooledObjectManager> {
    object: Option<Arc<PooledObject<M::Object>>>,
    pool: Arc<PoolInner<M>>,
}

impl<M: PooledObjectManager> PoolGuard<M> {
    /// The pool-side wrapper, for identity and lifecycle inspection
    pub fn pooled(&self) -> &Arc<PooledObject<M::Object>> {
        self.object.as_ref().expect("guard already released")
    }

    /// Return the object now, reporting any pool-side rejection
    pub fn return_now(mut self) -> PoolResult<()> {
        match self.object.take() {
            Some(pooled) => self.pool.return_pooled(&pooled),
            None => Ok(()),
        }
    }
}

impl<M: PooledObjectManager> Deref for PoolGuard<M> {
    type Target = M::Object;

    fn deref(&self) -> &Self::Target {
        self.pooled().object()
    }
}

impl<M: PooledObjectManager> Drop for PoolGuard<M> {
    fn drop(&mut self) {
        if let Some(pooled) = self.object.take() {
            if let Err(e) = self.pool.return_pooled(&pooled) {
                warn!("returning pooled object {} on drop failed: {e}", pooled.id());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::object::ObjectState;
    use std::sync::atomic::AtomicU32;
    use std::thread;
    use std::time::Instant;
    use thiserror::Error;

    #[derive(Debug, Error)]
    #[error("test manager failure")]
    struct TestError;

    struct TestConn {
        serial: u32,
    }

    #[derive(Default)]
    struct ManagerState {
        created: AtomicU32,
        destroyed: AtomicU32,
        fail_creates: AtomicU32,
        reject_validation: AtomicBool,
    }

    #[derive(Clone, Default)]
    struct TestManager {
        state: Arc<ManagerState>,
    }

    impl PooledObjectManager for TestManager {
        type Object = TestConn;
        type Error = TestError;

        fn create(&self) -> Result<TestConn, TestError> {
            if self.state.fail_creates.load(Ordering::SeqCst) > 0 {
                self.state.fail_creates.fetch_sub(1, Ordering::SeqCst);
                return Err(TestError);
            }
            let serial = self.state.created.fetch_add(1, Ordering::SeqCst) + 1;
            Ok(TestConn { serial })
        }

        fn validate(&self, _object: &PooledObject<TestConn>) -> Result<bool, TestError> {
            Ok(!self.state.reject_validation.load(Ordering::SeqCst))
        }

        fn invalid(&self, _object: &PooledObject<TestConn>) -> Result<(), TestError> {
            self.state.destroyed.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    fn pool_with(config: PoolConfiguration) -> (ObjectPool<TestManager>, TestManager) {
        let manager = TestManager::default();
        let pool = ObjectPool::with_config(manager.clone(), config).unwrap();
        (pool, manager)
    }

    #[test]
    fn test_borrow_and_return_reuses_the_same_object() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(2)
                .with_idle_timeout(-1),
        );

        let first = pool.borrow().unwrap().unwrap();
        let first_id = first.id();
        pool.return_object(&first).unwrap();

        let second = pool.borrow().unwrap().unwrap();
        assert_eq!(second.id(), first_id);
        assert!(second.last_returned_at() > 0);
        assert!(second.last_borrowed_at() >= second.last_returned_at());

        let stats = pool.stats();
        assert_eq!(stats.created_cnt, 1);
        assert_eq!(stats.borrowed_cnt, 2);
        assert_eq!(stats.returned_cnt, 1);
        assert_eq!(stats.pool_size, 1);
    }

    #[test]
    fn test_saturated_pool_times_out() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_poll_timeout(100)
                .with_idle_timeout(-1),
        );

        let held = pool.borrow().unwrap().unwrap();
        let started = Instant::now();
        match pool.borrow() {
            Err(PoolError::PollTimeout(_)) => {}
            other => panic!("expected poll timeout, got {other:?}"),
        }
        assert!(started.elapsed() >= Duration::from_millis(100));
        pool.return_object(&held).unwrap();
    }

    #[test]
    fn test_waiting_borrower_receives_returned_object() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_poll_timeout(1_000)
                .with_idle_timeout(-1),
        );
        let pool = Arc::new(pool);

        let held = pool.borrow().unwrap().unwrap();
        let returner = {
            let pool = Arc::clone(&pool);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(50));
                pool.return_object(&held).unwrap();
            })
        };

        let started = Instant::now();
        let reborrowed = pool.borrow().unwrap().expect("blocking borrow yields an object");
        assert!(started.elapsed() < Duration::from_millis(900));
        returner.join().unwrap();

        assert!(reborrowed.is_borrowed());
        assert_eq!(pool.stats().created_cnt, 1);
    }

    #[test]
    fn test_non_blocking_borrow_misses_immediately() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_poll_timeout(0)
                .with_idle_timeout(-1),
        );

        let held = pool.borrow().unwrap().unwrap();
        let started = Instant::now();
        assert!(pool.borrow().unwrap().is_none());
        assert!(started.elapsed() < Duration::from_millis(100));
        pool.return_object(&held).unwrap();
    }

    #[test]
    fn test_idle_object_is_evicted_after_timeout() {
        let (pool, manager) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(2)
                .with_poll_timeout(1_000)
                .with_idle_timeout(200),
        );

        let first = pool.borrow().unwrap().unwrap();
        let first_id = first.id();
        pool.return_object(&first).unwrap();

        thread::sleep(Duration::from_millis(600));
        assert_eq!(pool.size(), 0);
        assert_eq!(pool.stats().invalid_cnt, 1);
        assert_eq!(manager.state.destroyed.load(Ordering::SeqCst), 1);
        assert_eq!(first.state(), ObjectState::Invalid);

        let fresh = pool.borrow().unwrap().unwrap();
        assert_ne!(fresh.id(), first_id);
        assert_eq!(pool.stats().created_cnt, 2);
    }

    #[test]
    fn test_borrowed_object_survives_pending_eviction() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_poll_timeout(1_000)
                .with_idle_timeout(200),
        );

        let pooled = pool.borrow().unwrap().unwrap();
        pool.return_object(&pooled).unwrap();
        thread::sleep(Duration::from_millis(100));

        // re-borrowed before the idle interval elapsed, so the pending
        // task must observe it as borrowed and leave it alone
        let again = pool.borrow().unwrap().unwrap();
        thread::sleep(Duration::from_millis(400));
        assert!(again.is_valid());
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.stats().invalid_cnt, 0);
        pool.return_object(&again).unwrap();
    }

    #[test]
    fn test_failed_borrow_validation_discards_object() {
        let (pool, manager) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(2)
                .with_idle_timeout(-1)
                .with_validate_on_borrow(true),
        );

        let first = pool.borrow().unwrap().unwrap();
        let first_id = first.id();
        pool.return_object(&first).unwrap();

        manager.state.reject_validation.store(true, Ordering::SeqCst);
        let second = pool.borrow().unwrap().unwrap();
        assert_ne!(second.id(), first_id);

        let stats = pool.stats();
        assert_eq!(stats.invalid_cnt, 1);
        assert_eq!(stats.created_cnt, 2);
        assert_eq!(manager.state.destroyed.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_double_return_is_rejected() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(2)
                .with_idle_timeout(-1),
        );

        let pooled = pool.borrow().unwrap().unwrap();
        pool.return_object(&pooled).unwrap();
        assert!(matches!(
            pool.return_object(&pooled),
            Err(PoolError::AlreadyReturned)
        ));
    }

    #[test]
    fn test_foreign_object_is_rejected() {
        let (pool_a, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_idle_timeout(-1),
        );
        let (pool_b, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_idle_timeout(-1),
        );

        let stranger = pool_a.borrow().unwrap().unwrap();
        assert!(matches!(
            pool_b.return_object(&stranger),
            Err(PoolError::NotInPool)
        ));
        pool_a.return_object(&stranger).unwrap();
    }

    #[test]
    fn test_close_drains_idle_and_outstanding_objects_survive() {
        let (pool, manager) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(2)
                .with_poll_timeout(100)
                .with_idle_timeout(-1),
        );

        let a = pool.borrow().unwrap().unwrap();
        let b = pool.borrow().unwrap().unwrap();
        pool.return_object(&a).unwrap();

        pool.close();
        assert!(pool.is_closed());
        assert_eq!(a.state(), ObjectState::Invalid);
        assert_eq!(pool.stats().invalid_cnt, 1);
        assert_eq!(pool.idle_count(), 0);
        assert!(matches!(pool.borrow(), Err(PoolError::PoolClosed)));

        // the outstanding object is still returnable, the return
        // invalidates it
        assert!(b.is_borrowed());
        pool.return_object(&b).unwrap();
        assert_eq!(b.state(), ObjectState::Invalid);
        assert_eq!(pool.size(), 0);
        assert_eq!(manager.state.destroyed.load(Ordering::SeqCst), 2);

        pool.close();
        assert_eq!(pool.stats().invalid_cnt, 2);
    }

    #[test]
    fn test_create_failure_exhausts_retries() {
        let (pool, manager) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_create_retry_count(1)
                .with_idle_timeout(-1),
        );

        manager.state.fail_creates.store(2, Ordering::SeqCst);
        match pool.borrow() {
            Err(PoolError::CreateFailed { attempts, .. }) => assert_eq!(attempts, 2),
            other => panic!("expected create failure, got {other:?}"),
        }
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_create_retry_eventually_succeeds() {
        let (pool, manager) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_create_retry_count(2)
                .with_idle_timeout(-1),
        );

        manager.state.fail_creates.store(2, Ordering::SeqCst);
        let pooled = pool.borrow().unwrap().unwrap();
        assert_eq!(pooled.object().serial, 1);
        assert_eq!(pool.stats().created_cnt, 1);
        pool.return_object(&pooled).unwrap();
    }

    #[test]
    fn test_zero_idle_timeout_invalidates_on_return() {
        let (pool, manager) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_idle_timeout(0),
        );

        let first = pool.borrow().unwrap().unwrap();
        pool.return_object(&first).unwrap();
        assert_eq!(first.state(), ObjectState::Invalid);
        assert_eq!(pool.size(), 0);
        assert_eq!(manager.state.destroyed.load(Ordering::SeqCst), 1);

        let second = pool.borrow().unwrap().unwrap();
        assert_ne!(second.id(), first.id());
        pool.return_object(&second).unwrap();
    }

    #[test]
    fn test_guard_returns_object_on_drop() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_idle_timeout(-1),
        );

        {
            let guard = pool.acquire().unwrap().unwrap();
            assert_eq!(guard.serial, 1);
            assert!(guard.pooled().is_borrowed());
        }

        assert_eq!(pool.idle_count(), 1);
        let stats = pool.stats();
        assert_eq!(stats.borrowed_cnt, 1);
        assert_eq!(stats.returned_cnt, 1);
    }

    #[test]
    fn test_guard_explicit_return() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_idle_timeout(-1),
        );

        let guard = pool.acquire().unwrap().unwrap();
        guard.return_now().unwrap();
        assert_eq!(pool.idle_count(), 1);
        assert_eq!(pool.stats().returned_cnt, 1);
    }

    #[test]
    fn test_concurrent_borrow_return_respects_capacity() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(4)
                .with_poll_timeout(-1)
                .with_idle_timeout(-1),
        );
        let pool = Arc::new(pool);

        let workers: Vec<_> = (0..8)
            .map(|_| {
                let pool = Arc::clone(&pool);
                thread::spawn(move || {
                    for _ in 0..50 {
                        let pooled = pool.borrow().unwrap().unwrap();
                        pool.return_object(&pooled).unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        let stats = pool.stats();
        assert!(stats.created_cnt <= 4);
        assert_eq!(stats.borrowed_cnt, 400);
        assert_eq!(stats.returned_cnt, 400);
        assert_eq!(stats.pool_size, stats.created_cnt as usize);
    }

    #[test]
    fn test_debug_info_reflects_state() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(2)
                .with_idle_timeout(60_000),
        );

        let info = pool.debug_info();
        assert!(info.contains("pool state: RUNNING"));
        assert!(info.contains("PoolStats {"));
        assert!(info.contains("IdleScheduler {"));
        assert!(info.contains("idle object size: 0"));

        pool.close();
        assert!(pool.debug_info().contains("pool state: CLOSED"));
    }

    #[test]
    fn test_no_scheduler_without_positive_idle_timeout() {
        let (pool, _) = pool_with(
            PoolConfiguration::new()
                .with_max_pool_size(1)
                .with_idle_timeout(-1),
        );

        assert!(pool.debug_info().contains("idle scheduler: NOT RUNNING"));
    }
}
