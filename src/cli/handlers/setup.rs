// src/cli/handlers/setup.rs

// Environment preparation before a run: the settings document (with an
// interactive first-run editor) and the working-dir layout (directories,
// seeded base query, leftover run logs).

use crate::cli::handlers::commons;
use crate::core::settings::{self, SettingsError};
use crate::core::workspace::Workspace;
use crate::models::Settings;
use anyhow::{Result, bail};
use colored::Colorize;
use dialoguer::{Input, Password, theme::ColorfulTheme};
use std::path::Path;

/// Loads the settings document, offering to create one interactively when it
/// does not exist yet.
pub fn ensure_settings(path: &Path, assume_yes: bool) -> Result<Settings> {
    match settings::load(path) {
        Ok(loaded) => Ok(loaded),
        Err(SettingsError::NotFound(_)) if !assume_yes => {
            println!(
                "{}",
                format!("No settings file found at '{}'.", path.display()).yellow()
            );
            if !commons::confirm("Create one now?", true)? {
                bail!("a settings file is required; see --settings");
            }
            let created = create_settings_interactive()?;
            settings::save(path, &created)?;
            println!(
                "{}",
                format!("Settings written to '{}'.", path.display()).green()
            );
            Ok(created)
        }
        Err(e) => Err(e.into()),
    }
}

fn create_settings_interactive() -> Result<Settings> {
    let theme = ColorfulTheme::default();
    let mut created = settings::template();

    created.host = Input::with_theme(&theme)
        .with_prompt("Server host")
        .interact_text()?;
    created.username = Input::with_theme(&theme)
        .with_prompt("Username")
        .interact_text()?;
    created.password = Password::with_theme(&theme)
        .with_prompt("Password")
        .interact()?;
    created.token = Input::with_theme(&theme)
        .with_prompt("XMLA token")
        .interact_text()?;
    created.postgres_host = Input::with_theme(&theme)
        .with_prompt("Postgres repository host")
        .interact_text()?;

    if commons::confirm("Configure an outbound proxy?", false)? {
        created.proxy = Input::with_theme(&theme)
            .with_prompt("Proxy host")
            .interact_text()?;
        created.proxyport = Input::with_theme(&theme)
            .with_prompt("Proxy port")
            .interact_text()?;
    }

    created.insecure_transport = commons::confirm(
        "Trust self-signed server certificates (disables TLS verification)?",
        false,
    )?;

    println!(
        "Optional AWS and Snowflake archive settings can be added to the file by hand later."
    );
    Ok(created)
}

/// Creates the working-dir layout, seeds the base query, and offers to clean
/// run logs left over from earlier sessions.
pub fn prepare_workspace(workspace: &Workspace, assume_yes: bool) -> Result<()> {
    workspace.ensure()?;
    if workspace.write_base_query_file()? {
        println!("Created {}", workspace.base_query_path().display());
    }

    let leftover = workspace.existing_run_logs()?;
    if !leftover.is_empty() && !assume_yes {
        println!(
            "{}",
            format!(
                "Found {} run log(s) from earlier sessions in {}.",
                leftover.len(),
                workspace.run_logs_dir().display()
            )
            .yellow()
        );
        if commons::confirm("Clean them up before starting?", false)? {
            let removed = workspace.clean_run_logs()?;
            println!("Removed {removed} log file(s).");
        }
    }
    Ok(())
}
