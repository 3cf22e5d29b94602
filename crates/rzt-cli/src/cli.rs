use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "rzt",
    about = "Razai Tools: full catalog backups with integrity checks",
    version
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Configuration file (defaults to ./rzt.toml when present)
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Catalog file, overriding the configuration
    #[arg(long, global = true)]
    pub catalog: Option<PathBuf>,

    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[arg(long, global = true, default_value = "text")]
    pub format: OutputFormat,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
pub enum Command {
    /// Build a full export of the catalog
    Export(ExportArgs),
    /// Check a backup's integrity stamp
    Verify(VerifyArgs),
    /// Check a backup's shape without importing it
    Validate(ValidateArgs),
    /// Import a backup into the catalog
    Import(ImportArgs),
    /// Export the catalog and publish it to the backup directory
    Publish(PublishArgs),
    /// Restore from the backup directory
    Restore(RestoreArgs),
    /// List backups in the backup directory
    Backups,
}

#[derive(Args)]
pub struct ExportArgs {
    /// Output file; stdout when omitted
    #[arg(short, long)]
    pub out: Option<PathBuf>,
    #[arg(long)]
    pub pretty: bool,
}

#[derive(Args)]
pub struct VerifyArgs {
    pub file: PathBuf,
    /// Cloud manifest to check the stamp against
    #[arg(short, long)]
    pub manifest: Option<PathBuf>,
}

#[derive(Args)]
pub struct ValidateArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ImportArgs {
    pub file: PathBuf,
}

#[derive(Args)]
pub struct PublishArgs {
    /// Stored name; defaults to a timestamped name
    #[arg(short, long)]
    pub name: Option<String>,
}

#[derive(Args)]
pub struct RestoreArgs {
    #[arg(long, value_enum, default_value = "auto")]
    pub mode: RestoreMode,
    /// Backup to restore when mode is `named`
    #[arg(long, required_if_eq("mode", "named"))]
    pub name: Option<String>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub enum RestoreMode {
    /// Only when the manifest is newer than the last import
    Auto,
    /// The latest backup, regardless of timestamps
    Latest,
    /// A specific listed backup
    Named,
    /// The latest backup when the catalog is empty, auto otherwise
    Bootstrap,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn named_restore_requires_a_name() {
        assert!(Cli::try_parse_from(["rzt", "restore", "--mode", "named"]).is_err());
        let cli = Cli::try_parse_from(["rzt", "restore", "--mode", "named", "--name", "a.json"]).unwrap();
        match cli.command {
            Command::Restore(args) => {
                assert_eq!(args.mode, RestoreMode::Named);
                assert_eq!(args.name.as_deref(), Some("a.json"));
            }
            _ => panic!("expected restore"),
        }
    }

    #[test]
    fn global_flags_follow_subcommands() {
        let cli = Cli::try_parse_from(["rzt", "export", "--pretty", "-v", "--format", "json"]).unwrap();
        assert!(cli.verbose);
        assert_eq!(cli.format, OutputFormat::Json);
    }
}
