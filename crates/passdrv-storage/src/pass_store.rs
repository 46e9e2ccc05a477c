use std::{
    collections::BTreeMap,
    fs,
    path::{Path, PathBuf},
};

use async_trait::async_trait;
use passdrv_core::{DriverOptions, SecretDriver, SecretError};
use tracing::{debug, instrument, warn};

use crate::{
    config::DriverConfig,
    encryptor::{Encryptor, GpgEncryptor},
    path::resolve_secret_path,
};

/// Hidden directory under the root where ciphertext is staged before it is renamed into place.
pub const STAGING_DIR: &str = ".passdrv-staging";

/// `pass`-style store: one encrypted file per secret under a root directory,
/// with encryption delegated to an `Encryptor` (gpg in production).
pub struct PassDriver<E: Encryptor> {
    config: DriverConfig,
    encryptor: E,
}

impl PassDriver<GpgEncryptor> {
    /// Host entry point: discovery from the user's home, then `root`/`key` options.
    /// Never fails; a store that could not be located fails on first use instead.
    pub fn from_options(opts: &BTreeMap<String, String>) -> Self {
        Self::with_options(&DriverOptions::from_map(opts), GpgEncryptor::default())
    }
}

impl<E: Encryptor> PassDriver<E> {
    pub fn new(config: DriverConfig, encryptor: E) -> Self {
        Self { config, encryptor }
    }

    /// Resolve typed options against the user's home directory.
    pub fn with_options(options: &DriverOptions, encryptor: E) -> Self {
        let home = dirs::home_dir();
        let config = DriverConfig::resolve(home.as_deref(), options);
        debug!(root = ?config.root(), key_id = config.key_id(), "initializing pass store");
        Self::new(config, encryptor)
    }

    pub fn config(&self) -> &DriverConfig {
        &self.config
    }

    fn path_for(&self, id: &str) -> Result<PathBuf, SecretError> {
        resolve_secret_path(self.config.root(), id)
    }

    /// Encrypt into a private dir under `STAGING_DIR`, then rename into place.
    async fn write_secret(&self, id: &str, data: &[u8], path: &Path) -> Result<(), SecretError> {
        let parent = path.parent().ok_or_else(|| SecretError::Storage {
            reason: "invalid storage path".to_string(),
        })?;
        fs::create_dir_all(parent).map_err(storage_err)?;

        let staging_root = self.config.root().join(STAGING_DIR);
        fs::create_dir_all(&staging_root).map_err(storage_err)?;
        let staging = tempfile::tempdir_in(&staging_root).map_err(storage_err)?;
        let staged = staging.path().join("secret");

        self.encryptor
            .encrypt(data, self.config.key_id(), &staged)
            .await
            .map_err(|e| SecretError::Engine {
                id: id.to_string(),
                reason: e.to_string(),
            })?;

        fs::rename(&staged, path).map_err(storage_err)
    }
}

#[async_trait]
impl<E: Encryptor> SecretDriver for PassDriver<E> {
    /// Direct entries of the root, except the staging directory.
    #[instrument(skip_all)]
    async fn list(&self) -> Result<Vec<String>, SecretError> {
        let entries = fs::read_dir(self.config.root()).map_err(list_err)?;
        let mut ids = Vec::new();
        for entry in entries {
            let entry = entry.map_err(list_err)?;
            let name = entry.file_name().to_string_lossy().into_owned();
            if name != STAGING_DIR {
                ids.push(name);
            }
        }
        ids.sort();
        ids.dedup();
        Ok(ids)
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn lookup(&self, id: &str) -> Result<Vec<u8>, SecretError> {
        let path = self.path_for(id)?;
        let plaintext = self.encryptor.decrypt(&path).await.map_err(|err| {
            debug!(%err, "decrypt failed");
            SecretError::no_secret_data(id)
        })?;
        // An empty plaintext is reported the same as a missing secret.
        if plaintext.is_empty() {
            return Err(SecretError::no_secret_data(id));
        }
        Ok(plaintext)
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn store(&self, id: &str, data: &[u8]) -> Result<(), SecretError> {
        if self.lookup(id).await.is_ok() {
            return Err(SecretError::secret_id_exists(id));
        }

        let path = self.path_for(id)?;
        if path.is_file() {
            warn!(path = %path.display(), "overwriting undecryptable secret file");
        }
        self.write_secret(id, data, &path).await
    }

    #[instrument(skip_all, fields(id = %id))]
    async fn delete(&self, id: &str) -> Result<(), SecretError> {
        let path = self.path_for(id)?;
        fs::remove_file(&path).map_err(|err| {
            debug!(%err, "remove failed");
            SecretError::no_secret_data(id)
        })
    }
}

fn list_err(err: std::io::Error) -> SecretError {
    SecretError::Storage {
        reason: format!("failed to read secret directory: {err}"),
    }
}

fn storage_err<E: ToString>(err: E) -> SecretError {
    SecretError::Storage {
        reason: err.to_string(),
    }
}
