//! OpenAPI Compare CLI
//!
//! Command-line interface for comparing OpenAPI documents.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use oas_compare::{
    compare_with, load_document_auto, ChangeRecord, Document, RuleTable, Severity, Summary,
};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "oas-compare")]
#[command(about = "Report breaking and notable changes between two OpenAPI documents")]
#[command(version)]
struct Cli {
    /// Enable debug logging on stderr
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two documents and print every change
    Compare {
        /// Old document: file path or URL (http:// or https://)
        #[arg(long, short)]
        old: String,

        /// New document: file path or URL (http:// or https://)
        #[arg(long, short)]
        new: String,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,

        /// Output file (stdout if not specified)
        #[arg(long)]
        output: Option<PathBuf>,

        /// Rules file overriding default severities (YAML or JSON)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Exit with status 1 if any change is at least this severe
        #[arg(long, default_value = "error")]
        fail_on: Severity,
    },

    /// Print the effective rule table
    Rules {
        /// Rules file overriding default severities (YAML or JSON)
        #[arg(long)]
        rules: Option<PathBuf>,

        /// Output format: text (default) or json
        #[arg(long, default_value = "text")]
        format: String,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| log_level.to_string()),
        ))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let result = match cli.command {
        Commands::Compare {
            old,
            new,
            format,
            output,
            rules,
            fail_on,
        } => run_compare(CompareArgs {
            old,
            new,
            format,
            output,
            rules,
            fail_on,
        }),
        Commands::Rules { rules, format } => run_rules(rules.as_deref(), &format),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(code) => ExitCode::from(code),
    }
}

struct CompareArgs {
    old: String,
    new: String,
    format: String,
    output: Option<PathBuf>,
    rules: Option<PathBuf>,
    fail_on: Severity,
}

fn run_compare(args: CompareArgs) -> Result<(), u8> {
    check_format(&args.format)?;
    let table = load_rules(args.rules.as_deref())?;
    let old = load(&args.old)?;
    let new = load(&args.new)?;

    let records = compare_with(&old, &new, &table);
    let summary = Summary::of(&records);

    let rendered = if args.format == "json" {
        serde_json::to_string_pretty(&records).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?
    } else {
        render_text(&records, &summary)
    };

    match args.output {
        Some(path) => {
            std::fs::write(&path, format!("{}\n", rendered)).map_err(|e| {
                eprintln!("Error writing to {}: {}", path.display(), e);
                3u8
            })?;
        }
        None => {
            println!("{}", rendered);
        }
    }

    match summary.highest() {
        Some(highest) if highest >= args.fail_on => Err(1),
        _ => Ok(()),
    }
}

fn run_rules(rules: Option<&Path>, format: &str) -> Result<(), u8> {
    check_format(format)?;
    let table = load_rules(rules)?;
    let entries = table.entries();

    if format == "json" {
        let json = serde_json::to_string_pretty(&entries).map_err(|e| {
            eprintln!("Error serializing output: {}", e);
            2u8
        })?;
        println!("{}", json);
    } else {
        let width = entries
            .iter()
            .map(|entry| entry.rule.name().len())
            .max()
            .unwrap_or(0);
        for entry in &entries {
            let policy = if entry.ignored {
                "ignored".to_string()
            } else {
                entry.policy.to_string()
            };
            println!("{:<width$}  {}", entry.rule.name(), policy, width = width);
        }
    }
    Ok(())
}

fn check_format(format: &str) -> Result<(), u8> {
    match format {
        "text" | "json" => Ok(()),
        other => {
            eprintln!("Error: unknown format '{}' (expected text or json)", other);
            Err(2)
        }
    }
}

fn load(source: &str) -> Result<Document, u8> {
    load_document_auto(source).map_err(|e| {
        eprintln!("Error: loading {}: {}", source, e);
        e.exit_code() as u8
    })
}

fn load_rules(path: Option<&Path>) -> Result<RuleTable, u8> {
    match path {
        Some(path) => RuleTable::from_path(path).map_err(|e| {
            eprintln!("Error: {}", e);
            e.exit_code() as u8
        }),
        None => Ok(RuleTable::default()),
    }
}

fn render_text(records: &[ChangeRecord], summary: &Summary) -> String {
    let mut lines: Vec<String> = records.iter().map(ToString::to_string).collect();
    if summary.total() == 0 {
        lines.push("No changes detected".to_string());
    } else {
        lines.push(String::new());
        lines.push(format!(
            "{} changes: {} errors, {} warnings, {} infos",
            summary.total(),
            summary.errors,
            summary.warnings,
            summary.infos
        ));
    }
    lines.join("\n")
}
