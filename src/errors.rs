//! Error types for the object pool

use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PoolError {
    #[error("invalid pool configuration: {0}")]
    Configuration(String),

    #[error("pool is closed")]
    PoolClosed,

    #[error("failed to create pooled object after {attempts} attempt(s)")]
    CreateFailed {
        attempts: u32,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    #[error("timed out after {0:?} waiting for an idle object")]
    PollTimeout(Duration),

    #[error("interrupted while waiting for an idle object")]
    Interrupted,

    #[error("object does not belong to this pool")]
    NotInPool,

    #[error("object has already been returned")]
    AlreadyReturned,
}

pub type PoolResult<T> = Result<T, PoolError>;
