use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use docnorm::{parse_params, plan_invocations, RuleEngine, RunStatus};

#[derive(Parser)]
#[command(name = "docnorm")]
#[command(about = "Normalizes fonts, spacing, lists, tables and page layout of documents")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List registered rules with their configuration and schema
    Rules,

    /// Check parameters against a rule's schema without applying them
    Validate {
        /// Rule id, e.g. FontSizeRule
        #[arg(short, long)]
        rule: String,

        /// Parameters as a JSON object
        #[arg(short, long, default_value = "{}")]
        params: String,
    },

    /// Run rules against a document and save it in place
    Run {
        /// Path to the document (JSON document tree)
        #[arg(short, long)]
        input: PathBuf,

        /// Preset file (YAML); the built-in presets are used when omitted
        #[arg(long)]
        preset_file: Option<PathBuf>,

        /// Preset to run
        #[arg(short, long)]
        preset: Option<String>,

        /// Rule to run, optionally with parameters: RuleId or RuleId={"param": value}.
        /// Repeatable; runs after the preset's rules.
        #[arg(short, long = "rule")]
        rules: Vec<String>,
    },
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut engine = RuleEngine::new().context("failed to build the rule registry")?;

    match args.command {
        Command::Rules => print_json(&engine.list_rules()),
        Command::Validate { rule, params } => {
            let params = parse_params(&params)?;
            let errors = engine.validate_config(&rule, &params)?;
            if errors.is_empty() {
                info!(rule_id = %rule, "parameters are valid");
            }
            print_json(&errors)
        }
        Command::Run {
            input,
            preset_file,
            preset,
            rules,
        } => {
            let invocations = plan_invocations(preset_file.as_deref(), preset.as_deref(), &rules)?;
            let report = engine.execute_rules(&input, invocations.as_deref())?;
            print_json(&report)?;
            if report.status == RunStatus::Error {
                error!(
                    error = report.save_error.as_deref().unwrap_or("unknown"),
                    "document was not saved"
                );
                std::process::exit(1);
            }
            Ok(())
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
