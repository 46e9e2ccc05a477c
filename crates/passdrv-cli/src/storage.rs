use std::time::Duration;

use passdrv_core::DriverOptions;
use passdrv_storage::{GpgEncryptor, PassDriver};

use crate::{cli::Cli, config::Config};

/// Merge flags over config-file values into driver options.
pub fn options_from(cli: &Cli, config: &Config) -> DriverOptions {
    let root = cli.root.as_ref().or(config.root.as_ref());
    DriverOptions {
        root: root.map(|p| p.to_string_lossy().into_owned()),
        key: cli.key.clone().or_else(|| config.key.clone()),
    }
}

/// Build the gpg engine from config overrides.
pub fn encryptor_from_config(config: &Config) -> GpgEncryptor {
    let mut engine = match &config.gpg_program {
        Some(program) => GpgEncryptor::with_program(program.clone()),
        None => GpgEncryptor::default(),
    };
    if let Some(secs) = config.timeout_secs {
        engine = engine.with_timeout(Duration::from_secs(secs));
    }
    engine
}

/// Build a gpg-backed driver, discovering the store from the user's home directory.
pub fn store_from_config(cli: &Cli, config: &Config) -> PassDriver<GpgEncryptor> {
    PassDriver::with_options(&options_from(cli, config), encryptor_from_config(config))
}
