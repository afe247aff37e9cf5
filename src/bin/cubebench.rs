// src/bin/cubebench.rs

use anyhow::{Result, bail};
use clap::Parser;
use colored::Colorize;
use cubebench::{
    CancellationToken,
    cli::{
        args::{Cli, FrontEnd},
        handlers,
    },
    core::workspace::Workspace,
    system::launcher,
};
use std::sync::Arc;
use std::sync::atomic::AtomicBool;

/// The main entry point. Sets up logging, parses arguments, routes to the
/// right handler and performs centralized error handling.
fn main() {
    env_logger::init();

    // The CancellationToken is a simple shared flag; the launcher's wait loop
    // checks it each iteration and kills the harness process when it is set.
    let cancellation_token: CancellationToken = Arc::new(AtomicBool::new(false));

    if let Err(e) = run_cli(Cli::parse(), &cancellation_token) {
        // A cancelled run exits with the conventional interrupt code, keeping
        // a clean shell experience; everything else is a formatted error.
        if let Some(launch_err) = e.downcast_ref::<launcher::LaunchError>()
            && matches!(launch_err, launcher::LaunchError::Cancelled)
        {
            std::process::exit(130);
        }
        eprintln!("\n{}: {e:#}", "Error".red().bold());
        std::process::exit(1);
    }
}

fn run_cli(cli: Cli, cancellation_token: &CancellationToken) -> Result<()> {
    log::debug!("CLI args parsed: {cli:?}");

    if cli.mode == FrontEnd::Gui {
        bail!("the GUI front end is not part of this build; run with --mode cli");
    }

    // The sentinel operations are standalone: no settings, no discovery.
    let workspace = Workspace::default_location();
    if cli.request_stop {
        return handlers::stop::handle_request(&workspace);
    }
    if cli.cancel_stop {
        return handlers::stop::handle_cancel(&workspace);
    }

    handlers::run::handle(&cli, cancellation_token)
}
