//! `pass`-compatible secret driver: one gpg-encrypted file per secret under a
//! store root, with the root and recipient found by convention or options.

pub mod config;
pub mod encryptor;
pub mod pass_store;
pub mod path;

pub use config::DriverConfig;
pub use encryptor::{EngineError, Encryptor, GpgEncryptor, MaskingEncryptor};
pub use pass_store::PassDriver;
