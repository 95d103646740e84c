// CLASSIFICATION: COMMUNITY
// Filename: args.rs v1.1
// Date Modified: 2026-10-19
// Author: Lukas Bower

use std::path::PathBuf;

use clap::{value_parser, Arg, ArgAction, Command};

/// Builds and returns the CLI argument parser for the PRM dispatch daemon.
pub fn build_cli() -> Command {
    Command::new("emu-prmd")
        .version(env!("CARGO_PKG_VERSION"))
        .about("PRM Dispatch mailbox service for the hosted emulator")
        .arg(
            Arg::new("config")
                .short('c')
                .long("config")
                .value_name("FILE")
                .help("TOML configuration file")
                .value_parser(value_parser!(PathBuf))
                .required(false),
        )
        .arg(
            Arg::new("session")
                .long("session")
                .help("Serve on the session bus instead of the system bus")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("log-level")
                .long("log-level")
                .value_name("FILTER")
                .help("Default log filter when RUST_LOG is unset")
                .required(false),
        )
        .arg(
            Arg::new("print-config")
                .long("print-config")
                .help("Print the effective configuration and exit")
                .action(ArgAction::SetTrue),
        )
}
