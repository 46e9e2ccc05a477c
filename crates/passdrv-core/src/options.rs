use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

/// Construction options handed to a driver by the host framework.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DriverOptions {
    /// Store root directory. Overrides discovery and triggers a `.gpg-id` search.
    pub root: Option<String>,
    /// Recipient key identifier (e.g. `user@example.com`). Wins over any `.gpg-id`.
    pub key: Option<String>,
}

impl DriverOptions {
    pub const ROOT: &'static str = "root";
    pub const KEY: &'static str = "key";

    /// Pick the known keys out of a host-supplied map; anything else is ignored.
    pub fn from_map(opts: &BTreeMap<String, String>) -> Self {
        Self {
            root: opts.get(Self::ROOT).cloned(),
            key: opts.get(Self::KEY).cloned(),
        }
    }
}
