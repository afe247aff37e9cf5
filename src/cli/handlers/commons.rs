// src/cli/handlers/commons.rs

// Shared selection helpers used by the run handler: resolving the --models
// flag against the discovered pairs, and the interactive fallbacks.

use crate::cli::args::Cli;
use crate::models::{CatalogCubePair, Executor};
use anyhow::{Result, anyhow, bail};
use dialoguer::{Confirm, MultiSelect, Select, theme::ColorfulTheme};

/// Resolves the operator's model selection: `--models`, `--all-models`, or
/// an interactive picker.
pub fn select_pairs(cli: &Cli, discovered: &[CatalogCubePair]) -> Result<Vec<CatalogCubePair>> {
    if let Some(raw) = &cli.models {
        return match_models_flag(raw, discovered);
    }
    if cli.all_models {
        return Ok(discovered.to_vec());
    }
    if cli.yes {
        bail!("--yes requires --models or --all-models");
    }
    select_pairs_interactive(discovered)
}

/// Matches each comma-separated `--models` entry against the discovered
/// pairs. Entries containing the pair separator must match a pair exactly;
/// bare entries match by substring of the rendered pair. Any unmatched entry
/// fails the whole selection.
pub fn match_models_flag(
    raw: &str,
    discovered: &[CatalogCubePair],
) -> Result<Vec<CatalogCubePair>> {
    let mut selection: Vec<CatalogCubePair> = Vec::new();
    for entry in raw.split(',').map(str::trim).filter(|e| !e.is_empty()) {
        let matched = if let Some(wanted) = CatalogCubePair::parse(entry) {
            discovered.iter().find(|pair| **pair == wanted)
        } else {
            discovered.iter().find(|pair| pair.to_string().contains(entry))
        };
        match matched {
            Some(pair) => {
                if !selection.contains(pair) {
                    selection.push(pair.clone());
                }
            }
            None => bail!("model '{entry}' does not match any discovered catalog/cube pair"),
        }
    }
    if selection.is_empty() {
        bail!("--models did not select any catalog/cube pair");
    }
    Ok(selection)
}

fn select_pairs_interactive(discovered: &[CatalogCubePair]) -> Result<Vec<CatalogCubePair>> {
    let items: Vec<String> = discovered.iter().map(ToString::to_string).collect();
    let chosen = MultiSelect::with_theme(&ColorfulTheme::default())
        .with_prompt("Select catalog/cube pairs (space to toggle, enter to confirm)")
        .items(&items)
        .interact()?;
    if chosen.is_empty() {
        bail!("no models selected");
    }
    Ok(chosen.into_iter().map(|i| discovered[i].clone()).collect())
}

/// Resolves the executor: the `--executor` flag, or an interactive picker.
pub fn select_executor(cli: &Cli) -> Result<Executor> {
    if let Some(name) = &cli.executor {
        return name.parse::<Executor>().map_err(|e| anyhow!(e));
    }
    if cli.yes {
        bail!("--yes requires --executor");
    }
    let items: Vec<&str> = Executor::ALL.iter().map(|e| e.name()).collect();
    let index = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Select an executor")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(Executor::ALL[index])
}

/// A themed yes/no prompt.
pub fn confirm(prompt: &str, default: bool) -> Result<bool> {
    Ok(Confirm::with_theme(&ColorfulTheme::default())
        .with_prompt(prompt)
        .default(default)
        .interact()?)
}
