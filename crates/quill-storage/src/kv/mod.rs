//! Key-value engine used by the interactive shell.
//!
//! This sits beside the page/buffer core, not on top of it: the shell's
//! `set`/`get` surface needs only a trivial mapping.

mod memory;

use thiserror::Error;

pub use memory::InMemoryKv;

/// Result type for key-value operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors from a key-value engine.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum KvError {
    /// The key has never been set.
    #[error("key not found")]
    KeyNotFound,
}

/// A minimal key-value engine.
pub trait KvEngine: Send + Sync {
    /// Stores `value` under `key`, replacing any previous value.
    fn set(&self, key: &[u8], value: &[u8]) -> KvResult<()>;

    /// Returns the value stored under `key`.
    ///
    /// # Errors
    ///
    /// Returns [`KvError::KeyNotFound`] if the key has never been set.
    fn get(&self, key: &[u8]) -> KvResult<Vec<u8>>;
}
