//! Subcommand implementations. Each returns whether the run succeeded.

use std::fs;

use anyhow::{Context, Result};
use fmr_core::{BatchValidation, ItemOutcome, NewItem, Registry, Transport, ValidationOutcome, WriteOptions};
use serde_json::{json, Value};
use tracing::{error, info, warn};

use crate::cli::{AddItemsArgs, CodelistArgs, ValidateArgs, ValidateBatchArgs};

pub fn run_codelist<T: Transport>(registry: &Registry<T>, args: &CodelistArgs) -> Result<bool> {
    let mapping = match &args.id {
        Some(id) => registry.codelist_mapping(id),
        None => registry.named_codelist(&args.name),
    }
    .context("failed to read codelist")?;
    println!("{}", serde_json::to_string_pretty(&mapping)?);
    Ok(true)
}

pub fn run_add_items<T: Transport>(registry: &Registry<T>, args: &AddItemsArgs) -> Result<bool> {
    let mut items = args.items.clone();
    if let Some(path) = &args.items_file {
        let raw = fs::read_to_string(path).with_context(|| format!("failed to read {}", path.display()))?;
        let from_file: Vec<NewItem> =
            serde_json::from_str(&raw).with_context(|| format!("invalid item list in {}", path.display()))?;
        items.extend(from_file);
    }
    if items.is_empty() {
        warn!("no items given, nothing to do");
        return Ok(true);
    }

    let options = WriteOptions {
        agency: args.agency.clone(),
        action: args.action,
    };
    let report = registry.add_items(&args.codelist, &items, &options);
    for (id, err) in report.failures() {
        error!(item = id, error = %err, "item was not added");
    }
    let summary = json!({
        "added": report.count(ItemOutcome::Added),
        "already_exists": report.count(ItemOutcome::AlreadyExists),
        "failed": report.failures().count(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
    Ok(report.all_succeeded())
}

pub fn run_validate<T: Transport>(registry: &Registry<T>, args: &ValidateArgs) -> Result<bool> {
    let outcome = registry.validate_dataset(&args.file, args.delimiter);
    println!("{}", serde_json::to_string_pretty(&outcome_json(&outcome))?);
    Ok(outcome.passed())
}

pub fn run_validate_batch<T: Transport>(registry: &Registry<T>, args: &ValidateBatchArgs) -> Result<bool> {
    let result = registry.validate_datasets(&args.files, &args.folder, !args.skip, args.delimiter);
    match &result {
        BatchValidation::Skipped => {
            info!("validation skipped");
            println!("{}", json!({ "skipped": true }));
            Ok(true)
        }
        BatchValidation::Ran(outcomes) => {
            let files: Vec<Value> = outcomes
                .iter()
                .map(|(name, outcome)| {
                    let mut entry = outcome_json(outcome);
                    entry["file"] = Value::from(name.as_str());
                    entry
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&json!({ "skipped": false, "files": files }))?);
            Ok(result.all_passed())
        }
    }
}

fn outcome_json(outcome: &ValidationOutcome) -> Value {
    json!({
        "validated": outcome.passed(),
        "kind": outcome.failure_kind(),
        "errors": outcome.error_payload(),
    })
}
