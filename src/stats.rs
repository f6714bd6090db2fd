//! Pool statistics: atomic counters plus a cached rendering of the last
//! access time

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU64, AtomicUsize, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, SecondsFormat, Utc};

use crate::object::now_millis;

/// Point-in-time snapshot of pool counters
///
/// # Examples
///
/// ```
/// use idlepool::{ObjectPool, PoolConfiguration, PooledObject, PooledObjectManager};
///
/// struct UnitManager;
///
/// impl PooledObjectManager for UnitManager {
///     type Object = ();
///     type Error = std::convert::Infallible;
///
///     fn create(&self) -> Result<(), Self::Error> {
///         Ok(())
///     }
///
///     fn validate(&self, _object: &PooledObject<()>) -> Result<bool, Self::Error> {
///         Ok(true)
///     }
///
///     fn invalid(&self, _object: &PooledObject<()>) -> Result<(), Self::Error> {
///         Ok(())
///     }
/// }
///
/// let pool = ObjectPool::new(UnitManager).unwrap();
/// let object = pool.borrow().unwrap().unwrap();
///
/// let stats = pool.stats();
/// assert_eq!(stats.created_cnt, 1);
/// assert_eq!(stats.borrowed_cnt, 1);
/// assert_eq!(stats.pool_size, 1);
/// # pool.return_object(&object).unwrap();
/// # pool.close();
/// ```
#[derive(Debug, Clone)]
pub struct PoolStats {
    /// Current number of live objects
    pub pool_size: usize,

    /// Total objects created
    pub created_cnt: u64,

    /// Total objects invalidated
    pub invalid_cnt: u64,

    /// Total successful borrows
    pub borrowed_cnt: u64,

    /// Total successful returns
    pub returned_cnt: u64,

    /// Last borrow or return, epoch milliseconds
    pub last_access_time: i64,

    /// ISO-8601 rendering of the last access time
    pub formatted_last_access_time: String,
}

impl fmt::Display for PoolStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "PoolStats {{pool_size={}, created_cnt={}, invalid_cnt={}, borrowed_cnt={}, \
             returned_cnt={}, last_access_time={}}}",
            self.pool_size,
            self.created_cnt,
            self.invalid_cnt,
            self.borrowed_cnt,
            self.returned_cnt,
            self.formatted_last_access_time,
        )
    }
}

/// Internal counter block
///
/// Counters are atomics so snapshot readers never tear; the create and
/// remove mutations additionally run under the pool's create lock so the
/// capacity check in the create path observes a consistent size.
pub(crate) struct StatsTracker {
    pool_size: AtomicUsize,
    created_cnt: AtomicU64,
    invalid_cnt: AtomicU64,
    borrowed_cnt: AtomicU64,
    returned_cnt: AtomicU64,
    last_access_time: AtomicI64,
    formatted_last_access_time: Mutex<String>,
}

impl StatsTracker {
    pub(crate) fn new() -> Self {
        let now = now_millis();
        Self {
            pool_size: AtomicUsize::new(0),
            created_cnt: AtomicU64::new(0),
            invalid_cnt: AtomicU64::new(0),
            borrowed_cnt: AtomicU64::new(0),
            returned_cnt: AtomicU64::new(0),
            last_access_time: AtomicI64::new(now),
            formatted_last_access_time: Mutex::new(format_millis(now)),
        }
    }

    pub(crate) fn pool_size(&self) -> usize {
        self.pool_size.load(Ordering::Acquire)
    }

    pub(crate) fn update_create_stats(&self) {
        self.pool_size.fetch_add(1, Ordering::AcqRel);
        self.created_cnt.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn update_remove_stats(&self) {
        self.pool_size.fetch_sub(1, Ordering::AcqRel);
        self.invalid_cnt.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn update_borrow_stats(&self) {
        self.borrowed_cnt.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn update_return_stats(&self) {
        self.returned_cnt.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn update_last_access_time(&self) {
        let now = now_millis();
        self.last_access_time.store(now, Ordering::Release);
        *self.formatted_last_access_time.lock().unwrap() = format_millis(now);
    }

    pub(crate) fn snapshot(&self) -> PoolStats {
        PoolStats {
            pool_size: self.pool_size.load(Ordering::Acquire),
            created_cnt: self.created_cnt.load(Ordering::Relaxed),
            invalid_cnt: self.invalid_cnt.load(Ordering::Relaxed),
            borrowed_cnt: self.borrowed_cnt.load(Ordering::Relaxed),
            returned_cnt: self.returned_cnt.load(Ordering::Relaxed),
            last_access_time: self.last_access_time.load(Ordering::Acquire),
            formatted_last_access_time: self.formatted_last_access_time.lock().unwrap().clone(),
        }
    }
}

fn format_millis(millis: i64) -> String {
    DateTime::<Utc>::from_timestamp_millis(millis)
        .map(|at| at.to_rfc3339_opts(SecondsFormat::Millis, true))
        .unwrap_or_default()
}
