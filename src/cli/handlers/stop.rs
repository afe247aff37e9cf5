// src/cli/handlers/stop.rs

use crate::core::workspace::Workspace;
use crate::system::control;
use anyhow::Result;
use colored::Colorize;

/// Writes the cooperative stop sentinel. The harness polls for it; nothing
/// here forces a process down.
pub fn handle_request(workspace: &Workspace) -> Result<()> {
    workspace.ensure()?;
    let path = control::request_graceful_stop(&workspace.control_dir())?;
    println!(
        "{}",
        format!("Stop sentinel written to '{}'.", path.display()).green()
    );
    println!("Running simulations will wind down at their next sentinel poll.");
    Ok(())
}

/// Removes the stop sentinel, if one is present.
pub fn handle_cancel(workspace: &Workspace) -> Result<()> {
    if control::cancel_graceful_stop(&workspace.control_dir())? {
        println!("{}", "Stop sentinel removed.".green());
    } else {
        println!("No stop sentinel was present.");
    }
    Ok(())
}
