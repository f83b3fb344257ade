//! Durable key-value storage for the relay
//!
//! A file-backed map from string keys to opaque byte payloads with
//! get/set/delete semantics. The whole map lives in one JSON file whose
//! values are base64-encoded, so payloads survive byte-for-byte even when
//! they are not valid UTF-8. All writes use atomic temp-file + rename to
//! prevent corruption on crash; a tokio Mutex serializes concurrent
//! writers within the process.
//!
//! The store file is the single source of truth. `set` is
//! insert-or-replace: at most one value exists per key at any time.

mod error;
mod store;

pub use error::{Error, Result};
pub use store::KvStore;
