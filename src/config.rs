//! Pool configuration options

use crate::errors::{PoolError, PoolResult};

/// Configuration for object pool behavior
///
/// Timeout options are millisecond values whose sign selects the mode:
/// `poll_timeout` blocks up to the given duration when positive, never
/// blocks when zero and blocks indefinitely when negative; `idle_timeout`
/// evicts after the given idle duration when positive, evicts immediately
/// on return when zero and never evicts when negative.
///
/// # Examples
///
/// ```
/// use idlepool::PoolConfiguration;
///
/// let config = PoolConfiguration::new()
///     .with_max_pool_size(10)
///     .with_poll_timeout(5_000)
///     .with_idle_timeout(60_000)
///     .with_validate_on_borrow(true);
///
/// assert_eq!(config.max_pool_size, 10);
/// assert_eq!(config.poll_timeout, 5_000);
/// assert!(config.validate_on_borrow);
/// ```
#[derive(Debug, Clone)]
pub struct PoolConfiguration {
    /// Hard cap on live objects, must be greater than zero
    pub max_pool_size: usize,

    /// How long a borrower may wait for an idle object, in milliseconds
    pub poll_timeout: i64,

    /// Extra creation attempts after a failed create
    pub create_retry_count: u32,

    /// Idle duration after which a returned object is evicted, in milliseconds
    pub idle_timeout: i64,

    /// Whether to validate objects through the manager on borrow
    pub validate_on_borrow: bool,

    /// Whether to validate objects through the manager on return
    pub validate_on_return: bool,

    /// Idle lifetime of the eviction worker thread, in milliseconds;
    /// when positive the worker expires and is re-spawned on demand
    pub scheduled_thread_life_time: i64,
}

impl Default for PoolConfiguration {
    fn default() -> Self {
        Self {
            max_pool_size: 20,
            poll_timeout: 10_000,
            create_retry_count: 0,
            idle_timeout: 1_800_000,
            validate_on_borrow: false,
            validate_on_return: false,
            scheduled_thread_life_time: 300_000,
        }
    }
}

impl PoolConfiguration {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the maximum pool size
    ///
    /// # Examples
    ///
    /// ```
    /// use idlepool::PoolConfiguration;
    ///
    /// let config = PoolConfiguration::new().with_max_pool_size(50);
    ///
    /// assert_eq!(config.max_pool_size, 50);
    /// ```
    pub fn with_max_pool_size(mut self, size: usize) -> Self {
        self.max_pool_size = size;
        self
    }

    /// Set the borrow poll timeout in milliseconds
    pub fn with_poll_timeout(mut self, millis: i64) -> Self {
        self.poll_timeout = millis;
        self
    }

    /// Set the number of extra creation attempts
    pub fn with_create_retry_count(mut self, count: u32) -> Self {
        self.create_retry_count = count;
        self
    }

    /// Set the idle eviction timeout in milliseconds
    pub fn with_idle_timeout(mut self, millis: i64) -> Self {
        self.idle_timeout = millis;
        self
    }

    /// Enable or disable validation on borrow
    pub fn with_validate_on_borrow(mut self, enabled: bool) -> Self {
        self.validate_on_borrow = enabled;
        self
    }

    /// Enable or disable validation on return
    pub fn with_validate_on_return(mut self, enabled: bool) -> Self {
        self.validate_on_return = enabled;
        self
    }

    /// Set the idle lifetime of the eviction worker thread in milliseconds
    pub fn with_scheduled_thread_life_time(mut self, millis: i64) -> Self {
        self.scheduled_thread_life_time = millis;
        self
    }

    pub(crate) fn validate(&self) -> PoolResult<()> {
        if self.max_pool_size == 0 {
            return Err(PoolError::Configuration(
                "max_pool_size must be greater than zero".into(),
            ));
        }
        Ok(())
    }

    pub(crate) fn is_poll_no_wait(&self) -> bool {
        self.poll_timeout == 0
    }

    pub(crate) fn is_idle_never_timeout(&self) -> bool {
        self.idle_timeout < 0
    }

    pub(crate) fn is_idle_always_timeout(&self) -> bool {
        self.idle_timeout == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_configuration() {
        let config = PoolConfiguration::default();

        assert_eq!(config.max_pool_size, 20);
        assert_eq!(config.poll_timeout, 10_000);
        assert_eq!(config.create_retry_count, 0);
        assert_eq!(config.idle_timeout, 1_800_000);
        assert!(!config.validate_on_borrow);
        assert!(!config.validate_on_return);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_builder_methods() {
        let config = PoolConfiguration::new()
            .with_max_pool_size(3)
            .with_poll_timeout(-1)
            .with_create_retry_count(2)
            .with_idle_timeout(0)
            .with_validate_on_borrow(true)
            .with_validate_on_return(true)
            .with_scheduled_thread_life_time(1_000);

        assert_eq!(config.max_pool_size, 3);
        assert_eq!(config.poll_timeout, -1);
        assert_eq!(config.create_retry_count, 2);
        assert!(config.is_idle_always_timeout());
        assert!(config.validate_on_borrow);
        assert!(config.validate_on_return);
        assert_eq!(config.scheduled_thread_life_time, 1_000);
    }

    #[test]
    fn test_zero_max_pool_size_rejected() {
        let config = PoolConfiguration::new().with_max_pool_size(0);

        assert!(matches!(
            config.validate(),
            Err(PoolError::Configuration(_))
        ));
    }

    #[test]
    fn test_timeout_modes() {
        assert!(PoolConfiguration::new().with_poll_timeout(0).is_poll_no_wait());
        assert!(!PoolConfiguration::new().with_poll_timeout(100).is_poll_no_wait());
        assert!(PoolConfiguration::new().with_idle_timeout(-1).is_idle_never_timeout());
        assert!(PoolConfiguration::new().with_idle_timeout(0).is_idle_always_timeout());
    }
}
