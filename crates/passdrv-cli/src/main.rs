mod cli;
mod config;
mod storage;

use std::io::{Read, Write};

use crate::cli::ConfigCommand;
use clap::Parser;
use color_eyre::Result;
use passdrv_core::SecretDriver;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Entry point wiring the CLI to a gpg-backed pass store.
#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    init_tracing();

    let cli = cli::Cli::parse();
    let config = config::load(cli.config.as_deref())?;

    let store = storage::store_from_config(&cli, &config);
    let mut stdout = std::io::stdout().lock();
    match cli.command.clone() {
        cli::Command::List => run_list(&store, &mut stdout).await?,
        cli::Command::Show { id } => run_show(&store, &id, &mut stdout).await?,
        cli::Command::Insert { id } => {
            let mut data = Vec::new();
            std::io::stdin().read_to_end(&mut data)?;
            run_insert(&store, &id, &data).await?;
        }
        cli::Command::Rm { id } => run_rm(&store, &id).await?,
        cli::Command::Health => {
            let cfg = store.config();
            writeln!(stdout, "Root: {}", cfg.root().display())?;
            writeln!(stdout, "Key: {}", cfg.key_id())?;
            run_health(&store).await?;
            writeln!(stdout, "Store: ok")?;
        }
        cli::Command::Config(ConfigCommand::Init) => init_config(&cli, &config)?,
    }

    Ok(())
}

fn init_tracing() {
    // Respect user-provided filters; logs go to stderr so secrets on stdout stay clean.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let fmt_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr);
    tracing_subscriber::registry()
        .with(env_filter)
        .with(fmt_layer)
        .init();
}

fn report(err: passdrv_core::SecretError) -> color_eyre::Report {
    color_eyre::eyre::eyre!(err.to_string())
}

async fn run_list<S: SecretDriver, W: Write>(store: &S, out: &mut W) -> Result<()> {
    for id in store.list().await.map_err(report)? {
        writeln!(out, "{id}")?;
    }
    Ok(())
}

async fn run_show<S: SecretDriver, W: Write>(store: &S, id: &str, out: &mut W) -> Result<()> {
    let secret = store.lookup(id).await.map_err(report)?;
    out.write_all(&secret)?;
    out.flush()?;
    Ok(())
}

async fn run_insert<S: SecretDriver>(store: &S, id: &str, data: &[u8]) -> Result<()> {
    if data.is_empty() {
        color_eyre::eyre::bail!("refusing to store an empty secret for {id}");
    }
    store.store(id, data).await.map_err(report)?;
    info!(%id, "secret stored");
    Ok(())
}

async fn run_rm<S: SecretDriver>(store: &S, id: &str) -> Result<()> {
    store.delete(id).await.map_err(report)?;
    info!(%id, "secret removed");
    Ok(())
}

/// The store root must be listable for any other command to work.
async fn run_health<S: SecretDriver>(store: &S) -> Result<()> {
    store.list().await.map_err(report)?;
    Ok(())
}

fn init_config(cli: &cli::Cli, config: &config::Config) -> Result<()> {
    let path = config::config_path(cli.config.as_deref())?;
    let path = config::write_if_missing(config, &path)?;
    println!("Config initialized at {}", path.display());
    Ok(())
}
