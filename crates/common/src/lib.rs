//! Common types for the Fortnox relay workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
