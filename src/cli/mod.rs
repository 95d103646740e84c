// CLASSIFICATION: COMMUNITY
// Filename: mod.rs v1.2
// Date Modified: 2026-10-19
// Author: Lukas Bower

//! CLI module for the PRM dispatch daemon. Exports argument parser and main entry.

pub mod args;

use std::path::PathBuf;
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use anyhow::{bail, Context};
use clap::ArgMatches;
use log::info;

use crate::cli::args::build_cli;
use crate::config::{BusKind, PrmdConfig};
use crate::efi::EfiResult;
use crate::prmd::{HandlerTable, ListenerHandle, MailboxConsumer, PrmdService, PrmdServiceThunk};
use crate::signal::{SigTermFlag, SigTermHook};

/// Entry point for the CLI. Parses arguments, loads configuration and serves
/// until SIGTERM.
pub fn run() -> anyhow::Result<()> {
    let matches = build_cli().get_matches();
    let cfg = resolve_config(&matches)?;
    init_logging(&cfg.log_level);

    if matches.get_flag("print-config") {
        print!("{}", cfg.to_toml_string()?);
        return Ok(());
    }
    serve(cfg)
}

/// Effective configuration: file (or defaults), then command-line overrides.
pub fn resolve_config(matches: &ArgMatches) -> anyhow::Result<PrmdConfig> {
    let mut cfg = match matches.get_one::<PathBuf>("config") {
        Some(path) => PrmdConfig::load(path).with_context(|| format!("loading {}", path.display()))?,
        None => PrmdConfig::default(),
    };
    if matches.get_flag("session") {
        cfg.bus = BusKind::Session;
    }
    if let Some(level) = matches.get_one::<String>("log-level") {
        cfg.log_level = level.clone();
    }
    cfg.validate()?;
    Ok(cfg)
}

fn init_logging(default_filter: &str) {
    let env = env_logger::Env::default().default_filter_or(default_filter);
    // a logger may already be installed when embedded
    let _ = env_logger::Builder::from_env(env).try_init();
}

fn serve(cfg: PrmdConfig) -> anyhow::Result<()> {
    let shutdown = SigTermFlag::new();
    let _hook = SigTermHook::install(&shutdown).context("hooking SIGTERM")?;

    let thunk = Arc::new(PrmdServiceThunk::new(cfg.mailbox_size).context("allocating mailbox")?);
    let consumer = {
        let thunk = Arc::clone(&thunk);
        let shutdown = shutdown.clone();
        let poll = cfg.wait_timeout();
        thread::Builder::new()
            .name("prmd-firmware".into())
            .spawn(move || MailboxConsumer::new(thunk, HandlerTable::new()).run(&shutdown, poll))
            .context("spawning mailbox consumer")?
    };

    let service = PrmdService::new(thunk, cfg.response_timeout());
    let listener = spawn_bus_listener(&cfg, service, shutdown.clone());
    let listener = match listener {
        Ok(listener) => listener,
        Err(err) => {
            shutdown.set(true);
            let _ = consumer.join();
            return Err(err);
        }
    };
    let (handled, served) = wind_down(listener.join(), &shutdown, consumer)?;
    info!("shutdown complete: {} bus requests, {} mailbox requests", handled, served);
    Ok(())
}

/// Stop the consumer once the listener has exited, however it exited, and
/// report the listener's failure ahead of the consumer's.
fn wind_down(
    listener: EfiResult<u64>,
    shutdown: &SigTermFlag,
    consumer: JoinHandle<EfiResult<u64>>,
) -> anyhow::Result<(u64, u64)> {
    shutdown.set(true);
    let served = consumer.join();
    let handled = listener.context("bus listener")?;
    let served = match served {
        Ok(result) => result.context("mailbox consumer")?,
        Err(_) => bail!("mailbox consumer panicked"),
    };
    Ok((handled, served))
}

#[cfg(feature = "dbus")]
fn spawn_bus_listener(cfg: &PrmdConfig, service: PrmdService, shutdown: SigTermFlag) -> anyhow::Result<ListenerHandle> {
    use crate::prmd::dbus::DbusTransport;
    use crate::prmd::start_listener;

    let bus_cfg = cfg.clone();
    let handle = start_listener(move || DbusTransport::connect(&bus_cfg, service), shutdown, cfg.wait_timeout())?;
    Ok(handle)
}

#[cfg(not(feature = "dbus"))]
fn spawn_bus_listener(_cfg: &PrmdConfig, _service: PrmdService, _shutdown: SigTermFlag) -> anyhow::Result<ListenerHandle> {
    bail!("emu-prmd was built without D-Bus support; rebuild with `--features dbus`")
}
