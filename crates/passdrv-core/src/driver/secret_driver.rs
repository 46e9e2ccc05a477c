use async_trait::async_trait;
use thiserror::Error;

/// Errors produced by secret driver implementations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SecretError {
    /// Nothing usable is stored under the ID (missing, undecryptable, empty, or not removable).
    #[error("no secret data with ID: {id}")]
    NoSecretData { id: String },
    /// A secret that decrypts successfully already exists under the ID.
    #[error("secret data with ID already exists: {id}")]
    SecretIdExists { id: String },
    /// The ID does not map to a path inside the store root.
    #[error("invalid key: {id}")]
    InvalidKey { id: String },
    /// Underlying storage failure.
    #[error("storage failure: {reason}")]
    Storage { reason: String },
    /// The encryption engine failed while writing a secret.
    #[error("encryption failed for {id}: {reason}")]
    Engine { id: String, reason: String },
}

impl SecretError {
    pub fn no_secret_data(id: &str) -> Self {
        Self::NoSecretData { id: id.to_string() }
    }

    pub fn secret_id_exists(id: &str) -> Self {
        Self::SecretIdExists { id: id.to_string() }
    }

    pub fn invalid_key(id: &str) -> Self {
        Self::InvalidKey { id: id.to_string() }
    }
}

/// Contract every secret backend fulfils for the host framework.
///
/// IDs are opaque strings chosen by the caller. Implementations must not
/// overwrite an existing secret on `store`.
#[async_trait]
pub trait SecretDriver: Send + Sync {
    /// All secret IDs in lexicographic order.
    async fn list(&self) -> Result<Vec<String>, SecretError>;

    /// Retrieve the plaintext for an ID.
    async fn lookup(&self, id: &str) -> Result<Vec<u8>, SecretError>;

    /// Persist a new secret. Fails with `SecretIdExists` if one is already present.
    async fn store(&self, id: &str, data: &[u8]) -> Result<(), SecretError>;

    /// Remove the secret for an ID. Fails with `NoSecretData` if nothing was removed.
    async fn delete(&self, id: &str) -> Result<(), SecretError>;
}
