//! Command line front end for the form engine.
//!
//! Builds the registered form for a model read from a JSON file and reports
//! whether it validates.
//!
//! Usage:
//!   form-engine --list
//!   form-engine --mode add Offer offer.json
//!   form-engine --config engine.yaml ServiceCategory category.json

use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::Context;
use clap::Parser;
use serde_json::{json, Value};
use shared::AccessMode;
use tracing::info;
use tracing_subscriber::EnvFilter;

use form_engine::{register_all_forms, EngineConfig, FormFactory, FormOptions, Lifecycle};

#[derive(Parser)]
#[command(name = "form-engine")]
#[command(about = "Build a catalog form for a model and report its validation state")]
struct Args {
    /// YAML engine configuration (defaults to $FORM_ENGINE_CONFIG)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Access mode the form is opened in (view, edit, add, add-like)
    #[arg(short, long, default_value = "edit")]
    mode: AccessMode,

    /// List registered form types and exit
    #[arg(long)]
    list: bool,

    /// Registered type name, e.g. Offer
    #[arg(required_unless_present = "list")]
    type_name: Option<String>,

    /// JSON file holding the model
    #[arg(required_unless_present = "list")]
    model: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<ExitCode> {
    let args = Args::parse();

    let config = EngineConfig::resolve(args.config.as_deref())
        .context("Failed to load engine configuration")?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level)),
        )
        .with_writer(std::io::stderr)
        .init();

    let factory = FormFactory::new();
    register_all_forms(&factory);

    if args.list {
        for type_name in factory.registered_types() {
            println!("{}", type_name);
        }
        return Ok(ExitCode::SUCCESS);
    }

    let (type_name, model_path) = match (args.type_name, args.model) {
        (Some(type_name), Some(model_path)) => (type_name, model_path),
        _ => anyhow::bail!("a type name and a model file are required"),
    };

    let text = std::fs::read_to_string(&model_path)
        .with_context(|| format!("Failed to read {}", model_path.display()))?;
    let model: Value = serde_json::from_str(&text)
        .with_context(|| format!("{} is not valid JSON", model_path.display()))?;

    let lifecycle = Lifecycle::new();
    let options = FormOptions::from_config(args.mode, &config);
    info!("Building {} form in {} mode", type_name, args.mode);
    let form = factory.group_value(&type_name, model, &lifecycle, &options)?;

    let valid = form.valid();
    let report = json!({
        "type": type_name,
        "mode": args.mode,
        "valid": valid,
        "status": form.status(),
        "errors": form.collect_errors(),
    });
    lifecycle.dispose();

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(if valid { ExitCode::SUCCESS } else { ExitCode::FAILURE })
}
