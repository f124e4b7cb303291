// SPDX-FileCopyrightText: 2026 Keyhold Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! keyhold - a local secrets agent that mirrors a remote password vault.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod pin;
mod serve;
mod shutdown;
mod startup;
mod status;
mod teardown;

use clap::{Parser, Subcommand};

/// keyhold - a local secrets agent that mirrors a remote password vault.
#[derive(Parser, Debug)]
#[command(name = "keyhold", version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Unlock the store and keep the vault in sync until interrupted.
    Serve,
    /// Set or change the PIN that encrypts the config record.
    ///
    /// Headless runs read the current PIN from KEYHOLD_PIN and the new one
    /// from KEYHOLD_NEW_PIN.
    SetPin,
    /// Check a PIN against the stored key hash without unlocking.
    VerifyPin,
    /// Show record location, lock state and endpoints.
    Status {
        /// Print JSON instead of a table.
        #[arg(long)]
        json: bool,
        /// Disable colors.
        #[arg(long)]
        plain: bool,
    },
    /// Erase every stored secret and the PIN. Irreversible.
    Purge {
        /// Skip the safety check.
        #[arg(long)]
        yes: bool,
    },
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let config = match keyhold_config::load_and_validate() {
        Ok(config) => config,
        Err(errors) => {
            keyhold_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => serve::run_serve(config).await,
        Some(Commands::SetPin) => pin::run_set_pin(&config),
        Some(Commands::VerifyPin) => pin::run_verify_pin(&config),
        Some(Commands::Status { json, plain }) => status::run_status(&config, json, plain),
        Some(Commands::Purge { yes }) => pin::run_purge(&config, yes),
        None => {
            println!("keyhold: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}
