use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context};
use colored::Colorize;
use serde_json::{json, Value};

use rzt_backup::{validate_payload_shape, CloudManifest, IntegrityVerifier, Verification};
use rzt_store::{CatalogStore, DirImageStore, ImageStore, JsonFileCatalogStore};
use rzt_sync::{
    BackupSource, CloudRestorer, DirBackupSource, JsonFileLedger, RestoreOutcome, SyncConfig,
};
use rzt_worker::{BackupClient, ImportOutput};

use crate::cli::*;
use crate::config::CliConfig;

pub async fn run_command(cli: Cli) -> anyhow::Result<()> {
    let mut config = CliConfig::load(cli.config.as_deref())?;
    if let Some(catalog) = cli.catalog {
        config.catalog_path = catalog;
    }
    let format = cli.format;
    match cli.command {
        Command::Export(args) => cmd_export(&config, args, format).await,
        Command::Verify(args) => cmd_verify(args, format),
        Command::Validate(args) => cmd_validate(args, format),
        Command::Import(args) => cmd_import(&config, args, format).await,
        Command::Publish(args) => cmd_publish(&config, args, format).await,
        Command::Restore(args) => cmd_restore(&config, args, format).await,
        Command::Backups => cmd_backups(&config, format).await,
    }
}

struct Catalog {
    store: Arc<dyn CatalogStore>,
    images: Option<Arc<dyn ImageStore>>,
}

impl Catalog {
    fn open(config: &CliConfig) -> anyhow::Result<Self> {
        let store = JsonFileCatalogStore::open(&config.catalog_path)
            .with_context(|| format!("opening catalog {}", config.catalog_path.display()))?;
        let images = match &config.images_dir {
            Some(dir) => {
                let images = DirImageStore::open(dir)
                    .with_context(|| format!("opening image store {}", dir.display()))?;
                Some(Arc::new(images) as Arc<dyn ImageStore>)
            }
            None => None,
        };
        Ok(Self {
            store: Arc::new(store),
            images,
        })
    }

    fn client(&self) -> anyhow::Result<BackupClient> {
        Ok(BackupClient::spawn(self.store.clone(), self.images.clone())?)
    }
}

fn read_text(path: &Path) -> anyhow::Result<String> {
    std::fs::read_to_string(path).with_context(|| format!("reading {}", path.display()))
}

fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn summary_line(json: &str) -> String {
    let root: Value = serde_json::from_str(json).unwrap_or(Value::Null);
    let counts = &root["counts"];
    let hash = root["integrity"]["hashHex"].as_str().unwrap_or("");
    format!(
        "{} tissues, {} colors, {} patterns, {} links, {} pattern links, {} attachments (hash {})",
        counts["tissues"],
        counts["colors"],
        counts["patterns"],
        counts["links"],
        counts["patternLinks"],
        counts["attachments"],
        hash.get(..12).unwrap_or(hash).cyan(),
    )
}

async fn cmd_export(config: &CliConfig, args: ExportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let catalog = Catalog::open(config)?;
    let mut client = catalog.client()?;
    let built = client.build().await?;
    client.shutdown();

    let text = if args.pretty {
        serde_json::to_string_pretty(&serde_json::from_str::<Value>(&built.json)?)?
    } else {
        built.json.clone()
    };

    match &args.out {
        Some(out) => {
            std::fs::write(out, &text).with_context(|| format!("writing {}", out.display()))?;
            match format {
                OutputFormat::Json => print_json(&json!({
                    "path": out.display().to_string(),
                    "bytes": text.len(),
                    "ms": built.ms,
                }))?,
                OutputFormat::Text => {
                    println!("{} Exported to {}", "✓".green().bold(), out.display().to_string().bold());
                    println!("  {}", summary_line(&built.json));
                    if let Some(ms) = built.ms {
                        println!("  Took {ms:.1} ms");
                    }
                }
            }
        }
        None => println!("{text}"),
    }
    Ok(())
}

fn cmd_verify(args: VerifyArgs, format: OutputFormat) -> anyhow::Result<()> {
    let raw = read_text(&args.file)?;
    let manifest = match &args.manifest {
        Some(path) => {
            let manifest: CloudManifest = serde_json::from_str(&read_text(path)?)
                .with_context(|| format!("parsing manifest {}", path.display()))?;
            Some(manifest)
        }
        None => None,
    };
    let verification = IntegrityVerifier::verify(manifest.as_ref(), &raw);

    match format {
        OutputFormat::Json => print_json(&json!({
            "ok": verification.ok(),
            "reason": verification.reason(),
        }))?,
        OutputFormat::Text => match &verification {
            Verification::Verified { digest } => {
                println!("{} Integrity verified", "✓".green().bold());
                println!("  Hash: {}", digest.to_hex().cyan());
                if manifest.is_some() {
                    println!("  Manifest: {}", "matches".green());
                }
            }
            Verification::LegacyUnverified { version } => {
                println!("{} Legacy version {} payload, nothing to verify", "!".yellow().bold(), version);
            }
            Verification::Failed(failure) => {
                println!("{} {}", "✗".red().bold(), failure.to_string().red());
            }
        },
    }

    if let Some(failure) = verification.failure() {
        bail!("verification failed: {failure}");
    }
    Ok(())
}

fn cmd_validate(args: ValidateArgs, format: OutputFormat) -> anyhow::Result<()> {
    let raw = read_text(&args.file)?;
    let issues = validate_payload_shape(&raw)?;
    match format {
        OutputFormat::Json => print_json(&json!({ "issues": issues }))?,
        OutputFormat::Text if issues.is_empty() => {
            println!("{} Payload shape is valid", "✓".green().bold());
        }
        OutputFormat::Text => {
            println!("{} {} issue(s):", "!".yellow().bold(), issues.len());
            for issue in &issues {
                println!("  {}", issue.to_string().yellow());
            }
        }
    }
    Ok(())
}

fn print_import(output: &ImportOutput, format: OutputFormat) -> anyhow::Result<()> {
    match format {
        OutputFormat::Json => print_json(&json!({
            "inserted": output.inserted,
            "updated": output.updated,
            "issues": output.issues,
            "ms": output.ms,
        })),
        OutputFormat::Text => {
            println!(
                "{} Imported: {} inserted, {} updated",
                "✓".green().bold(),
                output.inserted.total().to_string().bold(),
                output.updated.total().to_string().bold(),
            );
            for issue in &output.issues {
                println!("  {} {}", "warning:".yellow(), issue);
            }
            Ok(())
        }
    }
}

async fn cmd_import(config: &CliConfig, args: ImportArgs, format: OutputFormat) -> anyhow::Result<()> {
    let raw = read_text(&args.file)?;
    let catalog = Catalog::open(config)?;
    let mut client = catalog.client()?;
    let output = client.import(raw).await?;
    client.shutdown();
    print_import(&output, format)
}

async fn cmd_publish(config: &CliConfig, args: PublishArgs, format: OutputFormat) -> anyhow::Result<()> {
    let source = DirBackupSource::new(config.require_backup_dir()?);
    let catalog = Catalog::open(config)?;
    let mut client = catalog.client()?;
    let built = client.build().await?;
    client.shutdown();

    let name = args
        .name
        .unwrap_or_else(|| format!("backup-{}.json", chrono::Utc::now().format("%Y%m%dT%H%M%SZ")));
    let manifest = source.publish(&name, &built.json).await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "name": name, "manifest": manifest }))?,
        OutputFormat::Text => {
            println!("{} Published {}", "✓".green().bold(), name.bold());
            println!("  {}", summary_line(&built.json));
        }
    }
    Ok(())
}

async fn cmd_restore(config: &CliConfig, args: RestoreArgs, format: OutputFormat) -> anyhow::Result<()> {
    let source = Arc::new(DirBackupSource::new(config.require_backup_dir()?));
    let ledger = Arc::new(JsonFileLedger::new(&config.state_path));
    let catalog = Catalog::open(config)?;
    let client = catalog.client()?;
    let mut restorer = CloudRestorer::new(source, ledger, catalog.store.clone(), client)
        .with_config(SyncConfig {
            auto: config.auto_import,
        });

    let outcome = match args.mode {
        RestoreMode::Auto => restorer.auto_import_if_needed().await,
        RestoreMode::Latest => restorer.manual_restore_latest().await,
        RestoreMode::Named => {
            let name = args.name.context("--name is required for a named restore")?;
            restorer.restore_named(&name).await
        }
        RestoreMode::Bootstrap => restorer.bootstrap_if_empty().await,
    };
    restorer.shutdown();
    let outcome = outcome?;

    match (&outcome, format) {
        (RestoreOutcome::Imported(output), _) => print_import(output, format)?,
        (_, OutputFormat::Json) => print_json(&json!({
            "performed": false,
            "reason": outcome.reason(),
        }))?,
        (RestoreOutcome::Skipped(reason), OutputFormat::Text) => {
            println!("{} Nothing restored: {}", "-".dimmed(), reason);
        }
        (RestoreOutcome::Rejected(reason), OutputFormat::Text) => {
            println!("{} Backup rejected: {}", "✗".red().bold(), reason.red());
        }
    }

    if let RestoreOutcome::Rejected(reason) = outcome {
        bail!("restore rejected: {reason}");
    }
    Ok(())
}

async fn cmd_backups(config: &CliConfig, format: OutputFormat) -> anyhow::Result<()> {
    let source = DirBackupSource::new(config.require_backup_dir()?);
    let entries = source.list_backups().await?;
    let manifest = source.fetch_manifest().await?;

    match format {
        OutputFormat::Json => print_json(&json!({ "backups": entries, "manifest": manifest }))?,
        OutputFormat::Text if entries.is_empty() => println!("No backups."),
        OutputFormat::Text => {
            for entry in &entries {
                let size = entry
                    .size_bytes
                    .map(|b| format!("{b} bytes"))
                    .unwrap_or_default();
                println!(
                    "{}  {}  {}",
                    entry.updated_at.format("%Y-%m-%d %H:%M:%S").to_string().dimmed(),
                    entry.name.bold(),
                    size
                );
            }
            if let Some(manifest) = manifest {
                println!(
                    "Latest: {} (version {}, {})",
                    manifest.hash.get(..12).unwrap_or(&manifest.hash).cyan(),
                    manifest.version,
                    manifest.updated_at.format("%Y-%m-%d %H:%M:%S")
                );
            }
        }
    }
    Ok(())
}
