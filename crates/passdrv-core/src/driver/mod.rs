mod secret_driver;

pub use secret_driver::{SecretDriver, SecretError};
