use std::path::Path;

use anyhow::{Result, bail};
use log::info;

use crate::{
    cli::{MappingAction, MappingArgs},
    kpi::PLACEHOLDER,
    loader::{LoadCache, LoadOptions},
    mapping::{ColumnMapping, MappingTable, map_columns},
    table,
};

pub fn execute(args: &MappingArgs) -> Result<()> {
    match &args.action {
        MappingAction::Show { mapping } => show(mapping.as_deref()),
        MappingAction::Init { output, force } => init(output, *force),
        MappingAction::Check { path, input } => check(path, input.as_deref()),
    }
}

fn show(path: Option<&Path>) -> Result<()> {
    let mapping = match path {
        Some(path) => MappingTable::load(path)?,
        None => MappingTable::default(),
    };
    println!("{}", mapping.to_json_string()?);
    Ok(())
}

fn init(output: &Path, force: bool) -> Result<()> {
    if output.exists() && !force {
        bail!("{output:?} already exists; pass --force to overwrite it");
    }
    MappingTable::default().save(output)?;
    info!("Wrote default mapping to {output:?}");
    Ok(())
}

fn check(path: &Path, input: Option<&Path>) -> Result<()> {
    let mapping = MappingTable::load(path)?;
    let rows = mapping
        .iter()
        .map(|(field, synonyms)| vec![field.to_string(), synonyms.join(", ")])
        .collect::<Vec<_>>();
    println!("{} is a valid mapping", path.display());
    table::print_table(&["field".to_string(), "synonyms".to_string()], &rows);

    if let Some(input) = input {
        let mut cache = LoadCache::new();
        let (_, raw) = cache.load_path(input, &LoadOptions::default())?;
        let (_, outcome) = map_columns(raw, &mapping);
        println!();
        print_assignments(&outcome);
    }
    Ok(())
}

/// Prints the field → source column record and any conflicts.
pub fn print_assignments(outcome: &ColumnMapping) {
    let rows = outcome
        .assignments
        .iter()
        .map(|(field, source)| {
            vec![
                field.to_string(),
                source.clone().unwrap_or_else(|| PLACEHOLDER.to_string()),
            ]
        })
        .collect::<Vec<_>>();
    table::print_table(&["field".to_string(), "source column".to_string()], &rows);
    for conflict in &outcome.conflicts {
        println!("conflict: {conflict}");
    }
}
