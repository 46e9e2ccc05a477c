use std::{
    fs,
    path::{Path, PathBuf},
};

use passdrv_core::DriverOptions;

/// Marker file holding the recipient key identifier for a store.
pub const GPG_ID_FILE: &str = ".gpg-id";

/// Home-relative store locations tried when no root is given, in order.
const DEFAULT_STORE_DIRS: &[&str] = &[".password-store", ".local/share/gopass/stores/root"];

/// Resolved store location and recipient. Built once, then read-only.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DriverConfig {
    root: PathBuf,
    key_id: String,
}

impl DriverConfig {
    pub fn new(root: impl Into<PathBuf>, key_id: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            key_id: key_id.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Convention-based defaults for a user whose home directory is `home`.
    ///
    /// Each existing default directory becomes the root candidate; the first one
    /// with a readable `.gpg-id` wins. Never fails: an empty config is returned
    /// when nothing is found.
    pub fn discover(home: Option<&Path>) -> Self {
        let mut cfg = Self::default();
        let Some(home) = home else {
            return cfg;
        };

        for dir in DEFAULT_STORE_DIRS {
            let candidate = home.join(dir);
            if !candidate.is_dir() {
                continue;
            }
            cfg.root = candidate;
            if let Some(key_id) = read_gpg_id(&cfg.root) {
                cfg.key_id = key_id;
                break;
            }
        }
        cfg
    }

    /// Defaults for `home`, then explicit options on top.
    pub fn resolve(home: Option<&Path>, options: &DriverOptions) -> Self {
        let mut cfg = Self::discover(home);
        if let Some(root) = &options.root {
            cfg.root = PathBuf::from(root);
            if let Some(key_id) = find_gpg_id(&cfg.root) {
                cfg.key_id = key_id;
            }
        }
        // Applied last so an explicit key beats any marker file.
        if let Some(key) = &options.key {
            cfg.key_id = key.clone();
        }
        cfg
    }
}

/// Nearest readable `.gpg-id` at or above `start`.
pub fn find_gpg_id(start: &Path) -> Option<String> {
    let start = std::path::absolute(start).unwrap_or_else(|_| start.to_path_buf());
    start.ancestors().find_map(read_gpg_id)
}

fn read_gpg_id(dir: &Path) -> Option<String> {
    fs::read_to_string(dir.join(GPG_ID_FILE))
        .ok()
        .map(|contents| contents.trim().to_string())
}
