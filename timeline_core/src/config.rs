use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use thiserror::Error;

/// Map a loosely-typed configuration value to a strict boolean. Accepts
/// the usual spreadsheet spellings; everything else is false.
pub fn parse_config_bool(raw: &str) -> bool {
    matches!(
        raw.trim().to_ascii_lowercase().as_str(),
        "true" | "t" | "yes" | "y" | "1"
    )
}

/// Loose float parse with a zero fallback (unparseable zero-hour values
/// default rather than fail).
pub fn parse_config_f64(raw: &str) -> f64 {
    raw.trim().parse().unwrap_or(0.0)
}

/// Loose non-negative integer parse; unparseable or negative values
/// disable the option.
pub fn parse_config_interval(raw: &str) -> u32 {
    match raw.trim().parse::<i64>() {
        Ok(value) if value > 0 => value as u32,
        _ => 0,
    }
}

/// One record of the batch configuration source: a single processing run.
#[derive(Debug, Clone, Serialize)]
pub struct RunConfig {
    pub serial: String,
    pub case: String,
    pub replication: String,
    /// When false the run is reported as "not set to process" and skipped.
    pub process: bool,
    pub input_location: PathBuf,
    pub output_location: PathBuf,
    pub unit_pos_file: String,
    pub weapon_fired_file: String,
    pub weapon_endgame_file: String,
    pub unit_destroyed_file: String,
    pub sensor_detection_file: String,
    pub zero_hour: f64,
    pub weapon_entities: bool,
    pub ignore_same_location_updates: bool,
    pub min_location_update_interval: u32,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read batch configuration {path:?}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to parse batch configuration {path:?}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Load the batch configuration file: a title line, a header line, then
/// one record per run. Field values are parsed leniently; anything
/// unparseable falls back to a disabled/zero default.
pub fn load_batch_config(path: &Path) -> Result<Vec<RunConfig>, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    // The first line is a title; headers follow it.
    let body = contents.split_once('\n').map(|(_, rest)| rest).unwrap_or("");

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(body.as_bytes());
    let headers = reader
        .headers()
        .map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?
        .clone();

    let field = |record: &csv::StringRecord, name: &str| -> String {
        headers
            .iter()
            .position(|h| h.trim() == name)
            .and_then(|idx| record.get(idx))
            .unwrap_or("")
            .trim()
            .to_string()
    };

    let mut configs = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        configs.push(RunConfig {
            serial: field(&record, "serial"),
            case: field(&record, "case"),
            replication: field(&record, "replication"),
            process: parse_config_bool(&field(&record, "process")),
            input_location: PathBuf::from(field(&record, "input_location")),
            output_location: PathBuf::from(field(&record, "output_location")),
            unit_pos_file: field(&record, "unit_pos_file"),
            weapon_fired_file: field(&record, "weapon_fired_file"),
            weapon_endgame_file: field(&record, "weapon_endgame_file"),
            unit_destroyed_file: field(&record, "unit_destroyed_file"),
            sensor_detection_file: field(&record, "sensor_detection_file"),
            zero_hour: parse_config_f64(&field(&record, "zero_hour")),
            weapon_entities: parse_config_bool(&field(&record, "weapon_entities")),
            ignore_same_location_updates: parse_config_bool(&field(
                &record,
                "ignore_same_location_updates",
            )),
            min_location_update_interval: parse_config_interval(&field(
                &record,
                "min_location_update_interval",
            )),
        });
    }
    Ok(configs)
}
