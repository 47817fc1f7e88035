use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use serde::Serialize;
use tracing::{error, info};

use timeline_core::{
    load_batch_config, process_run, report_line, Entity, EntityStore, RunConfig, RunOutcome,
};

#[derive(Parser, Debug)]
#[command(author, version, about = "Batch driver for the combat-log timeline processor", long_about = None)]
struct Args {
    /// Path to the batch configuration file (title line, header line, one
    /// record per run)
    #[arg(long, default_value = "batch_config.csv")]
    config: PathBuf,
}

/// Exported document for one completed run.
#[derive(Serialize)]
struct ExportDocument<'a> {
    serial: &'a str,
    case: &'a str,
    replication: &'a str,
    metadata: &'a [(String, String)],
    entities: &'a [Entity],
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .compact()
        .init();

    let args = Args::parse();
    info!("Batch run started");
    info!("Loading configuration file - {}", args.config.display());

    let configs = load_batch_config(&args.config)
        .with_context(|| "Batch run aborted - configuration file could not be loaded")?;
    info!("{} configurations in file", configs.len());

    for (run_count, config) in configs.iter().enumerate() {
        info!(
            "Configuration {} of {}, Serial {}",
            run_count + 1,
            configs.len(),
            config.serial
        );
        let mut store = EntityStore::new();
        let outcome = if config.process {
            process_run(config, &mut store)
        } else {
            RunOutcome::NotProcessed
        };
        if outcome == RunOutcome::Complete {
            if let Err(err) = export(config, &store) {
                error!("Serial {} - export failed: {err:#}", config.serial);
            }
        }
        info!("{}", report_line(config, &outcome));
    }

    info!("Batch run complete");
    Ok(())
}

/// Write the finalised store as one JSON document in the run's output
/// location.
fn export(config: &RunConfig, store: &EntityStore) -> Result<()> {
    let document = ExportDocument {
        serial: &config.serial,
        case: &config.case,
        replication: &config.replication,
        metadata: store.metadata(),
        entities: store.entities(),
    };
    let path = export_path(&config.output_location, &config.serial);
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create output location {}", parent.display()))?;
    }
    let json = serde_json::to_string_pretty(&document)?;
    fs::write(&path, json)
        .with_context(|| format!("failed to write export to {}", path.display()))?;
    info!("Serial {} - export written to {}", config.serial, path.display());
    Ok(())
}

fn export_path(output_location: &Path, serial: &str) -> PathBuf {
    output_location.join(format!("S{serial}_entities.json"))
}
