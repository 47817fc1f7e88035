use std::collections::HashSet;
use std::fmt;

use crate::classify::classify_weapons;
use crate::config::RunConfig;
use crate::entity::EntityStore;
use crate::event_map::{apply_event_map, EventMap};
use crate::registry::build_entities;
use crate::table::{EventTable, TableError, TableSpec, TIME_COLUMN};
use crate::thin::{thin_locations, ThinningOptions};
use crate::value::Cell;

/// Killer identifier attached to generic destroyed-unit records that have
/// no corresponding kill event.
pub const NO_SECONDARY_ENTITY: &str = "no secondary entity";

/// Result of one processing run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    Complete,
    NotProcessed,
    /// Pre-flight or load issues; no output is produced.
    Failed(Vec<String>),
}

impl fmt::Display for RunOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunOutcome::Complete => f.write_str("complete"),
            RunOutcome::NotProcessed => f.write_str("not set to process"),
            RunOutcome::Failed(issues) => {
                write!(f, "failed - no files generated - {} issues:", issues.len())?;
                for issue in issues {
                    write!(f, " {issue},")?;
                }
                Ok(())
            }
        }
    }
}

/// Per-run result line, as reported by the batch log.
pub fn report_line(config: &RunConfig, outcome: &RunOutcome) -> String {
    format!(
        "Serial {} - case {}, replication {} - {outcome}",
        config.serial, config.case, config.replication
    )
}

/// Availability of the two optional source files, decided at pre-flight.
#[derive(Debug, Clone, Copy)]
struct FileAvailability {
    sensor_file_present: bool,
    wpn_fired_file_present: bool,
}

/// Process one run configuration into `store`. The caller owns the store:
/// a pre-populated store supplies precomputed entities, and on a
/// `Complete` outcome the finalised store is ready for export.
pub fn process_run(config: &RunConfig, store: &mut EntityStore) -> RunOutcome {
    tracing::info!(
        target: "timeline::processor",
        serial = %config.serial,
        input = %config.input_location.display(),
        output = %config.output_location.display(),
        zero_hour = config.zero_hour,
        weapon_entities = config.weapon_entities,
        "processing run"
    );

    let availability = match preflight(config) {
        Ok(availability) => availability,
        Err(issues) => return RunOutcome::Failed(issues),
    };

    store.add_metadata("weapons_as_entities", config.weapon_entities);
    store.add_metadata(
        "ignore_same_location_updates",
        config.ignore_same_location_updates,
    );
    store.add_metadata(
        "min_location_update_interval",
        config.min_location_update_interval,
    );
    if !availability.sensor_file_present {
        tracing::warn!(
            target: "timeline::processor",
            file = %config.sensor_detection_file,
            "sensor detection attempt file not present, no spot/seen events will be generated"
        );
        store.add_metadata("sensor_file_present", false);
    }
    if !availability.wpn_fired_file_present {
        tracing::warn!(
            target: "timeline::processor",
            file = %config.weapon_fired_file,
            "weapon fired file not present, no shot events will be generated and \
             weapon entities may not be identified correctly"
        );
        store.add_metadata("wpn_fired_file_present", false);
    }

    macro_rules! load_or_fail {
        ($spec:expr) => {
            match EventTable::load(&$spec) {
                Ok(table) => table,
                Err(err) => return load_failure(err),
            }
        };
    }

    let unit_data = load_or_fail!(unit_data_spec(config));

    let mut move_table = load_or_fail!(move_spec(config));
    let mut spots = load_or_fail!(spot_spec(config, availability.sensor_file_present));
    let mut shots = load_or_fail!(shot_spec(config, availability.wpn_fired_file_present));
    let mut unit_kills = load_or_fail!(unit_kills_spec(config));
    let mut unit_destroyed = load_or_fail!(unit_destroyed_spec(config));
    for table in [
        &mut move_table,
        &mut spots,
        &mut shots,
        &mut unit_kills,
        &mut unit_destroyed,
    ] {
        table.attach_times(config.zero_hour);
    }

    thin_locations(
        &mut move_table,
        &ThinningOptions {
            ignore_same_location_updates: config.ignore_same_location_updates,
            min_update_interval: config.min_location_update_interval,
        },
    );

    // Only successful detections become spot/seen events.
    spots.filter_equals("result", "SUCCESS");

    unit_kills.filter_equals("result", "KILL");
    unit_kills.set_constant("loss_cause_detail", Cell::Text("engaged by weapon".to_string()));
    unit_kills.copy_column("wpn_instance_detail", "loss_reason_detail");

    let kills = merge_kills(&unit_kills, unit_destroyed);

    build_entities(store, &unit_data);
    classify_weapons(
        store,
        &unit_kills,
        &shots,
        availability.wpn_fired_file_present,
        config.weapon_entities,
    );

    let maps = event_maps();
    let tables = [&move_table, &spots, &spots, &shots, &kills, &kills];
    for (map, table) in maps.iter().zip(tables) {
        apply_event_map(store, table, map);
    }

    if let Err(err) = store.finalise() {
        tracing::error!(
            target: "timeline::processor",
            serial = %config.serial,
            error = %err,
            "finalise failed"
        );
        return RunOutcome::Failed(vec![err.to_string()]);
    }
    RunOutcome::Complete
}

fn load_failure(err: TableError) -> RunOutcome {
    tracing::error!(target: "timeline::processor", error = %err, "source table load failed");
    RunOutcome::Failed(vec![err.to_string()])
}

/// Validate that the configuration can be processed at all: the input
/// directory must exist and every mandatory file must be present. Absent
/// optional files only degrade capability.
fn preflight(config: &RunConfig) -> Result<FileAvailability, Vec<String>> {
    let mut issues = Vec::new();
    let mut availability = FileAvailability {
        sensor_file_present: true,
        wpn_fired_file_present: true,
    };

    if !config.input_location.is_dir() {
        issues.push(format!(
            "input location: {} not found",
            config.input_location.display()
        ));
        return Err(issues);
    }

    let listing: HashSet<String> = std::fs::read_dir(&config.input_location)
        .map(|entries| {
            entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.file_name().to_string_lossy().into_owned())
                .collect()
        })
        .unwrap_or_default();

    for file in [
        &config.unit_pos_file,
        &config.weapon_fired_file,
        &config.weapon_endgame_file,
        &config.unit_destroyed_file,
        &config.sensor_detection_file,
    ] {
        if listing.contains(file.as_str()) {
            continue;
        }
        if file == &config.sensor_detection_file {
            availability.sensor_file_present = false;
        } else if file == &config.weapon_fired_file {
            availability.wpn_fired_file_present = false;
        } else {
            issues.push(format!("{file} missing"));
        }
    }

    if issues.is_empty() {
        Ok(availability)
    } else {
        Err(issues)
    }
}

/// Merge kill events with the generic destroyed-unit records. A kill
/// record takes precedence over a destruction record for the same victim;
/// surviving destruction records are deduplicated to their last occurrence
/// and tagged with the sentinel killer.
fn merge_kills(unit_kills: &EventTable, mut unit_destroyed: EventTable) -> EventTable {
    let killed: HashSet<String> = unit_kills
        .column_cells("victim_id")
        .into_iter()
        .filter(|cell| !cell.is_missing())
        .map(Cell::render)
        .collect();
    let keep: Vec<bool> = unit_destroyed
        .column_cells("victim_id")
        .into_iter()
        .map(|cell| !killed.contains(&cell.render()))
        .collect();
    unit_destroyed.retain_rows(&keep);
    unit_destroyed.dedup_keep_last("victim_id");
    unit_destroyed.set_constant("killer_id", Cell::Text(NO_SECONDARY_ENTITY.to_string()));
    EventTable::concat("kills_table", unit_kills, &unit_destroyed)
}

fn join(config: &RunConfig, file: &str) -> std::path::PathBuf {
    config.input_location.join(file)
}

/// Unit reference table, read from the position file.
fn unit_data_spec(config: &RunConfig) -> TableSpec {
    TableSpec {
        name: "unit_data",
        path: join(config, &config.unit_pos_file),
        available: true,
        columns: vec![
            ("UnitID", "id"),
            ("UnitName", "name"),
            ("UnitClass", "type"),
            ("UnitType", "commander"),
            ("UnitSide", "side"),
        ],
        text_columns: vec![],
    }
}

fn move_spec(config: &RunConfig) -> TableSpec {
    TableSpec {
        name: "move_table",
        path: join(config, &config.unit_pos_file),
        available: true,
        columns: vec![
            ("Time", "time_str"),
            ("UnitID", "id"),
            ("UnitLongitude", "x"),
            ("UnitLatitude", "y"),
            ("UnitSpeed_kts", "spd_detail"),
            ("UnitCourse", "crs_detail"),
            ("UnitAltitude_m", "alt_detail"),
            ("Status", "status_detail"),
            ("DamagePercent", "dmg_detail"),
            ("Fire", "fire_detail"),
            ("Flood", "flood_detail"),
        ],
        text_columns: vec!["Fire", "Flood"],
    }
}

fn spot_spec(config: &RunConfig, available: bool) -> TableSpec {
    TableSpec {
        name: "spot_table",
        path: join(config, &config.sensor_detection_file),
        available,
        columns: vec![
            ("Time", "time_str"),
            ("SensorParentID", "spotter_id"),
            ("TargetID", "spotted_id"),
            ("DetectionResult", "result"),
            ("SensorName", "sensor_name_detail"),
            ("TargetRangeHoriz_nm", "range_detail"),
        ],
        text_columns: vec![],
    }
}

fn shot_spec(config: &RunConfig, available: bool) -> TableSpec {
    TableSpec {
        name: "shot_table",
        path: join(config, &config.weapon_fired_file),
        available,
        columns: vec![
            ("Time", "time_str"),
            ("FiringUnitID", "id"),
            ("WeaponID", "wpn_id"),
            ("WeaponName", "wpn_instance_detail"),
            ("WeaponType", "wpn_type_detail"),
            ("WeaponClass", "wpn_name_detail"),
        ],
        text_columns: vec![],
    }
}

fn unit_kills_spec(config: &RunConfig) -> TableSpec {
    TableSpec {
        name: "unit_kills_table",
        path: join(config, &config.weapon_endgame_file),
        available: true,
        columns: vec![
            ("Time", "time_str"),
            ("ParentFiringUnitID", "killer_id"),
            ("WeaponID", "wpn_id"),
            ("TargetID", "victim_id"),
            ("WeaponName", "wpn_instance_detail"),
            ("DistanceFromFiringUnit_Horiz", "range_detail"),
            ("Result", "result"),
        ],
        text_columns: vec![],
    }
}

fn unit_destroyed_spec(config: &RunConfig) -> TableSpec {
    TableSpec {
        name: "unit_destroyed_table",
        path: join(config, &config.unit_destroyed_file),
        available: true,
        columns: vec![
            ("Time", "time_str"),
            ("UnitID", "victim_id"),
            ("Reason", "loss_reason_detail"),
            ("Cause", "loss_cause_detail"),
        ],
        text_columns: vec![],
    }
}

/// The six declared event categories. Category behavior is entirely
/// data-declared here; extraction is one generic routine.
fn event_maps() -> Vec<EventMap> {
    vec![
        EventMap {
            name: "move_table",
            mask_column: "id",
            series: vec![(TIME_COLUMN, "location_time"), ("x", "location_x"), ("y", "location_y")],
            detail_keys: vec!["status", "course", "speed", "altitude", "damage", "fire", "flood"],
            detail_columns: vec![
                "status_detail",
                "crs_detail",
                "spd_detail",
                "alt_detail",
                "dmg_detail",
                "fire_detail",
                "flood_detail",
            ],
            detail_list: "location_detail",
        },
        EventMap {
            name: "spot_table",
            mask_column: "spotter_id",
            series: vec![(TIME_COLUMN, "spot_time"), ("spotted_id", "spot_entity")],
            detail_keys: vec!["sensor name", "range"],
            detail_columns: vec!["sensor_name_detail", "range_detail"],
            detail_list: "spot_detail",
        },
        EventMap {
            name: "spot_table",
            mask_column: "spotted_id",
            series: vec![(TIME_COLUMN, "seen_time"), ("spotter_id", "seen_entity")],
            detail_keys: vec!["sensor name", "range"],
            detail_columns: vec!["sensor_name_detail", "range_detail"],
            detail_list: "seen_detail",
        },
        EventMap {
            name: "shot_table",
            mask_column: "id",
            series: vec![(TIME_COLUMN, "shots_time")],
            detail_keys: vec!["weapon type", "weapon name", "weapon instance"],
            detail_columns: vec!["wpn_type_detail", "wpn_name_detail", "wpn_instance_detail"],
            detail_list: "shots_detail",
        },
        EventMap {
            name: "kills_table",
            mask_column: "killer_id",
            series: vec![(TIME_COLUMN, "kills_time"), ("victim_id", "kills_victim")],
            detail_keys: vec!["weapon instance", "range"],
            detail_columns: vec!["wpn_instance_detail", "range_detail"],
            detail_list: "kills_detail",
        },
        EventMap {
            name: "kills_table",
            mask_column: "victim_id",
            series: vec![(TIME_COLUMN, "losses_time"), ("killer_id", "losses_killer")],
            detail_keys: vec!["loss cause", "loss reason"],
            detail_columns: vec!["loss_cause_detail", "loss_reason_detail"],
            detail_list: "losses_detail",
        },
    ]
}
