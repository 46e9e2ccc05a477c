use std::{
    fs,
    path::{Path, PathBuf},
};

use color_eyre::Result;
use dirs::config_dir;
use serde::{Deserialize, Serialize};

/// User-level configuration loaded from `~/.config/passdrv/config.toml` (platform-specific).
///
/// `--root`/`--key` flags win over `root`/`key` here, which in turn win over the
/// `~/.password-store` / gopass discovery done by the driver.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq, Eq)]
pub struct Config {
    /// Store root; when unset the default pass/gopass locations are tried.
    /// Setting it also restarts the `.gpg-id` search from this directory upward.
    pub root: Option<PathBuf>,
    /// Recipient key identifier; when unset the nearest `.gpg-id` is used.
    pub key: Option<String>,
    /// gpg binary to invoke. Defaults to `gpg` on `PATH`; there is no flag for it.
    pub gpg_program: Option<PathBuf>,
    /// Per-invocation timeout for gpg, in seconds (30 when unset).
    pub timeout_secs: Option<u64>,
}

/// Config file to use: the `--config` override, else the platform default.
pub fn config_path(explicit: Option<&Path>) -> Result<PathBuf> {
    match explicit {
        Some(path) => Ok(path.to_path_buf()),
        None => default_path(),
    }
}

/// Load the `--config` file, or the default one; a missing file means defaults.
pub fn load(explicit: Option<&Path>) -> Result<Config> {
    load_from_path(config_path(explicit)?)
}

/// Load config from a given path; if missing or empty, return defaults.
pub fn load_from_path(path: impl AsRef<Path>) -> Result<Config> {
    let path = path.as_ref();
    if !path.exists() {
        return Ok(Config::default());
    }
    let contents = fs::read_to_string(path)?;
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    let cfg: Config = toml::from_str(&contents)?;
    Ok(cfg)
}

/// Resolve the default config path (platform aware).
pub fn default_path() -> Result<PathBuf> {
    let base = config_dir().ok_or_else(|| color_eyre::eyre::eyre!("no config dir available"))?;
    Ok(base.join("passdrv").join("config.toml"))
}

/// `passdrv config init`: write `config` to `path` unless a file is already there.
/// Existing files are left untouched to avoid clobbering user edits.
pub fn write_if_missing(config: &Config, path: &Path) -> Result<PathBuf> {
    if path.exists() {
        return Ok(path.to_path_buf());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    let body = toml::to_string_pretty(config)?;
    fs::write(path, body)?;
    Ok(path.to_path_buf())
}
