//! # idlepool
//!
//! Thread-safe generic object pool for expensive resources such as
//! database connections: a bounded set of lazily created objects shared
//! across concurrent borrowers.
//!
//! ## Features
//!
//! - Lazy creation up to a hard capacity, serialized so the cap is never
//!   overshot, with configurable retries on creation failure
//! - Blocking, bounded or non-blocking borrow, selected by the poll
//!   timeout sign
//! - Optional manager-driven validation on borrow and on return
//! - Background idle eviction with a single on-demand worker thread
//! - Scoped acquisition via an RAII guard that returns the object on drop
//! - Atomic pool statistics and a one-line debug snapshot
//!
//! ## Quick Start
//!
//! ```rust
//! use idlepool::{ObjectPool, PooledObject, PooledObjectManager};
//!
//! struct ConnManager;
//!
//! impl PooledObjectManager for ConnManager {
//!     type Object = String;
//!     type Error = std::convert::Infallible;
//!
//!     fn create(&self) -> Result<String, Self::Error> {
//!         Ok(String::from("connection"))
//!     }
//!
//!     fn validate(&self, _object: &PooledObject<String>) -> Result<bool, Self::Error> {
//!         Ok(true)
//!     }
//!
//!     fn invalid(&self, _object: &PooledObject<String>) -> Result<(), Self::Error> {
//!         Ok(())
//!     }
//! }
//!
//! let pool = ObjectPool::new(ConnManager).unwrap();
//! {
//!     let conn = pool.acquire().unwrap().expect("pool has capacity");
//!     assert_eq!(*conn, "connection");
//!     // returned to the pool when `conn` goes out of scope
//! }
//! assert_eq!(pool.idle_count(), 1);
//! pool.close();
//! ```

mod config;
mod errors;
mod eviction;
mod manager;
mod object;
mod pool;
mod stats;

pub use config::PoolConfiguration;
pub use errors::{PoolError, PoolResult};
pub use manager::PooledObjectManager;
pub use object::{ObjectState, PooledObject};
pub use pool::{ObjectPool, PoolGuard};
pub use stats::PoolStats;
