//! Core abstractions for passdrv: the secret driver contract hosts program against.
//! This crate is intentionally small to keep dependency surface minimal.

pub mod driver;
pub mod options;

pub use driver::{SecretDriver, SecretError};
pub use options::DriverOptions;
