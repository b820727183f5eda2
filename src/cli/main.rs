use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

use sd_params::config::Config;
use sd_params::pipeline::{self, ImageStatus};

#[derive(Parser, Debug)]
#[command(
    name = "sd-params",
    version,
    about = "Read, edit, and batch-rewrite the generation parameters embedded in PNG and JPEG images"
)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to config file (default: config.json next to binary)
    #[arg(short, long, value_name = "FILE", global = true)]
    config: Option<PathBuf>,

    /// Do not create .backup sidecars before writing
    #[arg(long, global = true)]
    no_backup: bool,

    /// Output results as JSON
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Print the parameters of one or more images
    Show {
        #[arg(value_name = "FILE", required = true)]
        files: Vec<PathBuf>,
    },
    /// Replace the parameters of an image
    Write {
        #[arg(value_name = "FILE")]
        file: PathBuf,
        /// New parameters text
        #[arg(long, conflicts_with = "from", required_unless_present = "from")]
        text: Option<String>,
        /// Read the new parameters text from a file
        #[arg(long, value_name = "TEXT_FILE")]
        from: Option<PathBuf>,
    },
    /// Find and replace text in the parameters of every image in a folder
    Replace {
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,
        #[arg(long)]
        find: String,
        #[arg(long)]
        replace: String,
    },
    /// List supported images in a folder with their edit status
    List {
        #[arg(value_name = "FOLDER")]
        folder: PathBuf,
    },
    /// Show whether an image has been edited (has a backup)
    Status {
        #[arg(value_name = "FILE")]
        file: PathBuf,
    },
    /// Write a default config.json and exit
    Init,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Set up logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    if let Command::Init = cli.command {
        let path = Config::default().save(cli.config.as_deref())?;
        println!("Default config written to {}", path.display());
        return Ok(());
    }

    let config = Config::load(cli.config.as_deref())?;
    let make_backup = config.backup.enabled && !cli.no_backup;
    let json = cli.json || config.output.json;

    match cli.command {
        Command::Show { files } => show(&files, json),
        Command::Write { file, text, from } => {
            let text = match (text, from) {
                (Some(t), _) => t,
                (None, Some(p)) => std::fs::read_to_string(&p)
                    .with_context(|| format!("Failed to read {}", p.display()))?,
                (None, None) => anyhow::bail!("Either --text or --from is required"),
            };
            sd_params::write_metadata(&file, &text, make_backup)
                .with_context(|| format!("Failed to write {}", file.display()))?;
            if json {
                print_json(&serde_json::json!({
                    "path": file.display().to_string(),
                    "success": true,
                    "has_backup": sd_params::has_backup(&file),
                }))?;
            } else {
                log::info!("Saved {}", file.display());
            }
            Ok(())
        }
        Command::Replace { folder, find, replace } => {
            let result = sd_params::batch_replace(&folder, &find, &replace, make_backup)
                .with_context(|| format!("Batch replace failed in {}", folder.display()))?;
            if json {
                print_json(&result)?;
            } else {
                for err in &result.errors {
                    log::error!("  {}: {}", err.file, err.message);
                }
                println!(
                    "Modified {} file(s), {} error(s)",
                    result.modified_count,
                    result.errors.len()
                );
            }
            Ok(())
        }
        Command::List { folder } => {
            let images = pipeline::list_images(&folder)
                .with_context(|| format!("Failed to list {}", folder.display()))?;
            if json {
                print_json(&images)?;
            } else {
                for image in &images {
                    println!("{} {}", status_mark(image.status()), image.name);
                }
                log::info!("{} image(s)", images.len());
            }
            Ok(())
        }
        Command::Status { file } => {
            if !file.exists() {
                anyhow::bail!("File not found: {}", file.display());
            }
            let status = ImageStatus::of(&file);
            if json {
                print_json(&serde_json::json!({
                    "path": file.display().to_string(),
                    "has_backup": status == ImageStatus::Edited,
                    "status": status,
                }))?;
            } else {
                println!("{} {}", status_mark(status), file.display());
            }
            Ok(())
        }
        Command::Init => Ok(()),
    }
}

/// Print the parameters of each file; failures are reported per file.
fn show(files: &[PathBuf], json: bool) -> Result<()> {
    let mut results = Vec::new();
    for path in files {
        let read = sd_params::read_metadata(path);
        if json {
            results.push(serde_json::json!({
                "path": path.display().to_string(),
                "metadata": read.as_deref().unwrap_or_default(),
                "has_backup": sd_params::has_backup(path),
                "error": read.as_ref().err().map(|e| e.to_string()),
            }));
            continue;
        }
        print_metadata(path, read);
    }

    if json {
        print_json(&results)?;
    }
    Ok(())
}

// ANSI color codes
const DIM: &str = "\x1b[2m";
const RESET: &str = "\x1b[0m";
const BOLD: &str = "\x1b[1m";

fn print_metadata(path: &Path, read: sd_params::Result<String>) {
    println!();
    println!("{BOLD}File:{RESET} {}", path.display());
    println!("{DIM}{}{RESET}", "─".repeat(72));
    match read {
        Ok(text) if text.is_empty() => println!("{DIM}(no parameters found){RESET}"),
        Ok(text) => println!("{text}"),
        Err(e) => log::error!("Failed to read {}: {e}", path.display()),
    }
}

fn status_mark(status: ImageStatus) -> &'static str {
    match status {
        ImageStatus::Edited => "✓",
        ImageStatus::Pristine => "○",
    }
}

fn print_json<T: serde::Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
