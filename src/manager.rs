//! The external capability that creates, validates and disposes of the
//! underlying resources

use crate::object::PooledObject;

/// Lifecycle operations the pool delegates to its embedder
///
/// The pool never constructs or destroys resources itself: creation runs
/// under the pool's create lock so capacity is never overshot, validation
/// gates borrow and return when enabled in the configuration, and
/// [`invalid`](PooledObjectManager::invalid) is called exactly once per
/// object when it leaves the pool.
///
/// A `validate` error is treated the same as `Ok(false)`.
///
/// # Examples
///
/// ```
/// use idlepool::{PooledObject, PooledObjectManager};
///
/// struct Conn {
///     alive: bool,
/// }
///
/// struct ConnManager;
///
/// impl PooledObjectManager for ConnManager {
///     type Object = Conn;
///     type Error = std::io::Error;
///
///     fn create(&self) -> Result<Conn, Self::Error> {
///         Ok(Conn { alive: true })
///     }
///
///     fn validate(&self, object: &PooledObject<Conn>) -> Result<bool, Self::Error> {
///         Ok(object.object().alive)
///     }
///
///     fn invalid(&self, _object: &PooledObject<Conn>) -> Result<(), Self::Error> {
///         Ok(())
///     }
/// }
/// ```
pub trait PooledObjectManager: Send + Sync + 'static {
    type Object: Send + Sync + 'static;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Build a new underlying resource
    fn create(&self) -> Result<Self::Object, Self::Error>;

    /// Cheap liveness check for a pooled resource
    fn validate(&self, object: &PooledObject<Self::Object>) -> Result<bool, Self::Error>;

    /// Dispose of a resource leaving the pool
    fn invalid(&self, object: &PooledObject<Self::Object>) -> Result<(), Self::Error>;
}
