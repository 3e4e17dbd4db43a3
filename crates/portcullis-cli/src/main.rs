//! Portcullis CLI - Flat-map and CVE policy tool
//!
//! Converts resource configuration between nested files and flat
//! `key = value` state, validates CVE policy configuration, and renders the
//! JSON document the remote API accepts.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

mod config;
mod error;
mod input;
mod output;

use config::PortcullisConfig;
use error::{CliError, Result};
use portcullis::{
    decode, encode, policy_from_domain, policy_to_domain, CvePolicyResource, MemoryBackend,
};

/// Portcullis CLI - Flat-map and CVE policy tool
#[derive(Parser)]
#[command(name = "portcullis")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Path to portcullis.toml configuration file
    #[arg(short, long, default_value = "portcullis.toml", global = true)]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Print the sorted flat form of a resource file
    Flatten {
        /// Resource file (.json, .toml, .yaml)
        file: PathBuf,

        /// Output as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Rebuild the nested tree from a flat `key = value` file
    Unflatten {
        /// Flat file
        file: PathBuf,
    },

    /// Check a CVE policy resource file
    Validate {
        /// Resource file (.json, .toml, .yaml)
        file: PathBuf,

        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Print the JSON body a CVE policy resource file would write
    Render {
        /// Resource file (.json, .toml, .yaml)
        file: PathBuf,
    },

    /// Print the flat state of a remote-API policy document
    Refresh {
        /// Policy document as returned by the remote API
        document: PathBuf,

        /// Output as a JSON object
        #[arg(long)]
        json: bool,
    },

    /// Apply a CVE policy resource file against a local policy document
    Apply {
        /// Resource file (.json, .toml, .yaml)
        file: PathBuf,

        /// Policy document to read and update in place
        #[arg(short, long)]
        state: Option<PathBuf>,

        /// Output as a JSON object
        #[arg(long)]
        json: bool,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let settings = match PortcullisConfig::from_file(&cli.config) {
        Ok(settings) => settings,
        Err(e) => {
            output::error(&e.to_string());
            return ExitCode::FAILURE;
        }
    };

    if let Err(e) = portcullis::observability::init(&settings.observability(cli.verbose)) {
        output::warning(&e.to_string());
    }
    debug!(config = %cli.config.display(), "Loaded settings");

    let json_default = settings.output.json;
    let result = match cli.command {
        Commands::Flatten { file, json } => cmd_flatten(&file, json || json_default),
        Commands::Unflatten { file } => cmd_unflatten(&file),
        Commands::Validate { file, json } => cmd_validate(&file, json || json_default),
        Commands::Render { file } => cmd_render(&file),
        Commands::Refresh { document, json } => cmd_refresh(&document, json || json_default),
        Commands::Apply { file, state, json } => {
            cmd_apply(&file, state.as_deref(), json || json_default)
        }
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            output::error(&e.to_string());
            ExitCode::FAILURE
        }
    }
}

// =============================================================================
// Command Implementations
// =============================================================================

fn cmd_flatten(file: &Path, json: bool) -> Result<()> {
    let value = input::load_value(file)?;
    let flat = encode(&value)?;
    output::print_flat(&flat, json)?;
    Ok(())
}

fn cmd_unflatten(file: &Path) -> Result<()> {
    let flat = input::load_flat(file)?;
    let value = decode(&flat)?;
    output::print_json(&value.to_json())?;
    Ok(())
}

fn cmd_validate(file: &Path, json: bool) -> Result<()> {
    let value = input::load_value(file)?;
    let policy = policy_to_domain(&value)?;

    if json {
        let report = serde_json::json!({
            "valid": true,
            "rule_count": policy.rules.len(),
            "rules": output::rule_summaries(&policy),
        });
        output::print_json(&report)?;
    } else {
        output::print_policy_summary(&policy);
    }

    Ok(())
}

fn cmd_render(file: &Path) -> Result<()> {
    let value = input::load_value(file)?;
    let policy = policy_to_domain(&value)?;
    println!("{}", policy.to_json()?);
    Ok(())
}

fn cmd_refresh(document: &Path, json: bool) -> Result<()> {
    let policy = input::load_policy_document(document)?;
    let flat = encode(&policy_from_domain(&policy))?;
    output::print_flat(&flat, json)?;
    Ok(())
}

fn cmd_apply(file: &Path, state: Option<&Path>, json: bool) -> Result<()> {
    let value = input::load_value(file)?;

    let backend = match state {
        Some(path) if path.exists() => {
            MemoryBackend::with_policy(input::load_policy_document(path)?)
        }
        _ => MemoryBackend::new(),
    };

    let mut resource = CvePolicyResource::new(backend);
    let applied = resource.apply(&value)?;
    output::print_flat(&applied.flatten()?, json)?;

    if let Some(path) = state {
        let document = resource.into_service().into_policy().to_json()?;
        std::fs::write(path, document).map_err(|e| CliError::FileWrite {
            path: path.to_path_buf(),
            source: e,
        })?;
        if !json {
            output::info(&format!("Wrote {}", path.display()));
        }
    }

    Ok(())
}
