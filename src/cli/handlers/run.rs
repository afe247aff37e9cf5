// src/cli/handlers/run.rs

// The main pipeline: settings -> workspace -> discovery -> selection ->
// properties -> launch -> (optionally) tail.

use crate::CancellationToken;
use crate::cli::args::Cli;
use crate::cli::handlers::{commons, setup};
use crate::core::discovery::DiscoveryClient;
use crate::core::session::RunSession;
use crate::core::workspace::Workspace;
use crate::models::FileAssignments;
use crate::system::control;
use crate::system::launcher::{LaunchError, Launcher};
use anyhow::{Context, Result, anyhow, bail};
use colored::Colorize;
use std::path::Path;

pub fn handle(cli: &Cli, cancel: &CancellationToken) -> Result<()> {
    let settings = setup::ensure_settings(&cli.settings, cli.yes)?;
    let workspace = Workspace::default_location();
    setup::prepare_workspace(&workspace, cli.yes)?;

    // A sentinel left over from an earlier session would stop the new run at
    // its first poll.
    if control::stop_requested(&workspace.control_dir()) {
        println!(
            "{}",
            "A stop sentinel from a previous session is present.".yellow()
        );
        if cli.yes || commons::confirm("Remove it before launching?", true)? {
            control::cancel_graceful_stop(&workspace.control_dir())?;
            println!("Stop sentinel removed.");
        }
    }

    println!("Discovering catalogs and cubes on {}...", settings.host.cyan());
    let client = DiscoveryClient::new(&settings)?;
    let discovered = client.discover_pairs()?;
    if discovered.is_empty() {
        bail!("no catalog/cube pairs discovered on '{}'", settings.host);
    }
    println!(
        "{}",
        format!("Discovered {} catalog/cube pair(s).", discovered.len()).green()
    );

    let selection = commons::select_pairs(cli, &discovered)?;
    println!("Selected {} model(s):", selection.len());
    for pair in &selection {
        println!("  - {pair}");
    }

    let executor = commons::select_executor(cli)?;
    let assignments = cli
        .csv_assignments
        .as_deref()
        .map(load_assignments)
        .transpose()?;
    if let Some(assignments) = &assignments {
        println!(
            "Ingestion mode: {} CSV assignment(s) loaded.",
            assignments.len()
        );
    }

    let mut session = RunSession::new();
    let launcher = Launcher::new(&settings, &workspace, &cli.settings);
    println!(
        "\n{} {} with {} selected model(s)...",
        "Launching".bold(),
        executor.name().cyan(),
        selection.len()
    );

    match launcher.run(
        &mut session,
        executor,
        &selection,
        assignments.as_ref(),
        cli.follow,
        cancel,
    ) {
        Ok(()) => {
            println!(
                "{}",
                format!("{} completed successfully.", executor.name()).green()
            );
            println!("Full log: {}", workspace.run_log_path(executor).display());
            Ok(())
        }
        Err(LaunchError::ExecutionFailed {
            executor,
            code,
            log_path,
            excerpt,
        }) => {
            eprintln!(
                "{}",
                format!("{executor} failed with exit code {code}.").red()
            );
            if !excerpt.is_empty() {
                eprintln!("Last lines of {}:", log_path.display());
                for line in &excerpt {
                    eprintln!("  {line}");
                }
            }
            Err(anyhow!(
                "executor '{executor}' failed with exit code {code} (log: {})",
                log_path.display()
            ))
        }
        Err(e) => Err(e.into()),
    }
}

fn load_assignments(path: &Path) -> Result<FileAssignments> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("could not read CSV assignments file '{}'", path.display()))?;
    let assignments: FileAssignments = serde_json::from_str(&raw)
        .with_context(|| format!("'{}' is not a valid CSV assignment map", path.display()))?;
    Ok(assignments)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn assignments_file_parses_rendered_pair_keys() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(
            file,
            r#"{{
                "Sales :: Revenue Cube": {{
                    "jdbc_file": "working_dir/ingest/sales.csv",
                    "jdbc_has_header": false
                }}
            }}"#
        )
        .expect("fixture write");
        let assignments = load_assignments(file.path()).expect("should parse");
        assert_eq!(assignments.len(), 1);
        let pair = crate::models::CatalogCubePair::new("Sales", "Revenue Cube");
        let assignment = assignments.for_pair(&pair).expect("assignment present");
        assert_eq!(assignment.jdbc_file, "working_dir/ingest/sales.csv");
        assert!(!assignment.jdbc_has_header);
        // Unset flags keep their defaults.
        assert!(assignment.xmla_has_header);
        assert!(assignment.xmla_file.is_empty());
    }

    #[test]
    fn malformed_assignments_file_is_rejected() {
        let mut file = tempfile::NamedTempFile::new().expect("tempfile");
        write!(file, "not json").expect("fixture write");
        assert!(load_assignments(file.path()).is_err());
    }
}
