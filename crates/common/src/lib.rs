//! Shared types for the Nordigen client workspace

mod error;
mod secret;

pub use error::{Error, Result};
pub use secret::Secret;
