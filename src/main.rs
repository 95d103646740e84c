// CLASSIFICATION: COMMUNITY
// Filename: main.rs v1.1
// Date Modified: 2026-10-19
// Author: Lukas Bower

//! Entry point for the `emu-prmd` PRM dispatch daemon.

use emu_host::cli;

fn main() {
    if let Err(err) = cli::run() {
        eprintln!("Error: {:#}", err);
        std::process::exit(1);
    }
}
