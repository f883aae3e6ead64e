//! CLI argument definitions for the `fmr` tool.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use clap_verbosity_flag::{InfoLevel, Verbosity};
use fmr_core::{Action, Delimiter, NewItem};

#[derive(Parser)]
#[command(
    name = "fmr",
    version,
    about = "Fusion Metadata Registry client - codelists and SDMX-CSV validation",
    long_about = "Read and extend codelists on a Fusion Metadata Registry instance and\n\
                  validate SDMX-CSV datasets against their Data Structure Definition."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Adjust log verbosity (-v for debug, -vv for trace, -q for warnings only).
    #[command(flatten)]
    pub verbosity: Verbosity<InfoLevel>,

    /// Path to the TOML connection settings.
    #[arg(long, short = 'c', value_name = "PATH", default_value = "fmr.toml", global = true)]
    pub config: PathBuf,

    /// Registry user for Basic authentication.
    #[arg(long, env = "FMR_USER", global = true)]
    pub user: Option<String>,

    /// Registry password for Basic authentication.
    #[arg(long, env = "FMR_PASSWORD", hide_env_values = true, global = true)]
    pub password: Option<String>,
}

#[derive(Subcommand)]
pub enum Command {
    /// Print a codelist as a name -> id mapping.
    Codelist(CodelistArgs),

    /// Add items to a codelist, skipping ids that already exist.
    AddItems(AddItemsArgs),

    /// Validate one SDMX-CSV file.
    Validate(ValidateArgs),

    /// Validate several files from `<data_dir>/<folder>/`.
    ValidateBatch(ValidateBatchArgs),
}

#[derive(Args)]
pub struct CodelistArgs {
    /// Codelist name from the `[codelists]` table.
    #[arg(value_name = "NAME", default_value = "ref_area")]
    pub name: String,

    /// Codelist id, bypassing the `[codelists]` table.
    #[arg(long)]
    pub id: Option<String>,
}

#[derive(Args)]
pub struct AddItemsArgs {
    /// Target codelist id.
    #[arg(long)]
    pub codelist: String,

    /// Maintenance agency of the codelist.
    #[arg(long, default_value = "WB")]
    pub agency: String,

    /// MERGE adds to the existing items, REPLACE overwrites them.
    #[arg(long, default_value = "merge")]
    pub action: Action,

    /// Item as ID=DESCRIPTION. Repeatable.
    #[arg(long = "item", value_name = "ID=DESCRIPTION", value_parser = parse_item)]
    pub items: Vec<NewItem>,

    /// JSON file holding an array of {"id", "description"} objects.
    #[arg(long, value_name = "FILE")]
    pub items_file: Option<PathBuf>,
}

#[derive(Args)]
pub struct ValidateArgs {
    /// SDMX-CSV file to upload.
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Column delimiter of the file.
    #[arg(long, default_value = "comma")]
    pub delimiter: Delimiter,
}

#[derive(Args)]
pub struct ValidateBatchArgs {
    /// Folder under the configured data directory.
    #[arg(long)]
    pub folder: String,

    /// Column delimiter of the files.
    #[arg(long, default_value = "comma")]
    pub delimiter: Delimiter,

    /// Report the batch as skipped without contacting the registry.
    #[arg(long)]
    pub skip: bool,

    /// File names inside the folder.
    #[arg(value_name = "FILE", required = true)]
    pub files: Vec<String>,
}

fn parse_item(raw: &str) -> Result<NewItem, String> {
    let (id, description) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected ID=DESCRIPTION, got `{raw}`"))?;
    let id = id.trim();
    if id.is_empty() {
        return Err("item id must not be empty".to_string());
    }
    Ok(NewItem::new(id, description.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parse_item_splits_on_first_equals() {
        assert_eq!(parse_item("LIC=Low income").unwrap(), NewItem::new("LIC", "Low income"));
        assert_eq!(parse_item("X=a=b").unwrap(), NewItem::new("X", "a=b"));
        assert!(parse_item("no-separator").is_err());
        assert!(parse_item("=desc").is_err());
    }

    #[test]
    fn add_items_arguments() {
        let cli = Cli::try_parse_from([
            "fmr",
            "add-items",
            "--codelist",
            "CL_REF_AREA",
            "--action",
            "replace",
            "--item",
            "LIC=Low income",
            "--item",
            "UMC=Upper middle income",
        ])
        .unwrap();
        let Command::AddItems(args) = cli.command else {
            panic!("expected add-items");
        };
        assert_eq!(args.agency, "WB");
        assert_eq!(args.action, Action::Replace);
        assert_eq!(args.items.len(), 2);
        assert_eq!(args.items[1].id, "UMC");
    }

    #[test]
    fn validate_batch_requires_files() {
        assert!(Cli::try_parse_from(["fmr", "validate-batch", "--folder", "wdi"]).is_err());
        let cli = Cli::try_parse_from([
            "fmr",
            "validate-batch",
            "--folder",
            "wdi",
            "--delimiter",
            "semicolon",
            "a.csv",
        ])
        .unwrap();
        let Command::ValidateBatch(args) = cli.command else {
            panic!("expected validate-batch");
        };
        assert_eq!(args.delimiter, Delimiter::Semicolon);
        assert!(!args.skip);
    }

    #[test]
    fn unknown_delimiter_is_rejected() {
        assert!(Cli::try_parse_from(["fmr", "validate", "x.csv", "--delimiter", "pipe"]).is_err());
    }
}
