//! Fortnox API proxy
//!
//! Fetches resources from the Fortnox REST API on behalf of an
//! identifier, using the token record stored by `fortnox-auth`. Outbound
//! calls pass through a shared throttle so the relay stays under the
//! provider's rate limit.
//!
//! Fetch lifecycle:
//! 1. Load the identifier's token record (fail if absent)
//! 2. Throttled GET with the record's bearer token
//! 3. On 200, dump the payload for diagnostics and return it
//! 4. On any non-200, refresh the token exactly once, retry once, and
//!    return whatever that attempt yields

pub mod client;
pub mod error;
pub mod throttle;

pub use client::ApiClient;
pub use error::{Error, Result};
pub use throttle::Throttle;
