use std::fs;
use std::path::Path;

use tempfile::TempDir;
use timeline_core::RunConfig;

pub const POS_FILE: &str = "unit_pos.csv";
pub const FIRED_FILE: &str = "weapon_fired.csv";
pub const ENDGAME_FILE: &str = "weapon_endgame.csv";
pub const DESTROYED_FILE: &str = "unit_destroyed.csv";
pub const SENSOR_FILE: &str = "sensor_detection.csv";

/// A temp input directory populated with a small but complete scenario:
/// two combat units and one weapon entity, a successful and a failed
/// detection, one fired weapon, one kill, and destroyed-unit records that
/// exercise the kill-precedence and last-occurrence rules.
pub fn write_standard_scenario(dir: &Path) {
    write_position_file(dir);

    fs::write(
        dir.join(SENSOR_FILE),
        "Time,SensorParentID,TargetID,DetectionResult,SensorName,TargetRangeHoriz_nm\n\
         hh:mm:ss,-,-,-,-,nm\n\
         00:00:03.000,U1,U2,SUCCESS,Radar,12.5\n\
         00:00:04.000,U2,U1,FAILURE,Sonar,12.5\n",
    )
    .unwrap();

    fs::write(
        dir.join(FIRED_FILE),
        "Time,FiringUnitID,WeaponID,WeaponName,WeaponType,WeaponClass\n\
         hh:mm:ss,-,-,-,-,-\n\
         00:00:05.000,U1,W1,Harpoon #1,ASM,Harpoon\n",
    )
    .unwrap();

    fs::write(
        dir.join(ENDGAME_FILE),
        "Time,ParentFiringUnitID,WeaponID,TargetID,WeaponName,DistanceFromFiringUnit_Horiz,Result\n\
         hh:mm:ss,-,-,-,-,m,-\n\
         00:00:08.000,U1,W1,U2,Harpoon #1,4000,KILL\n\
         00:00:09.000,U1,W1,U1,Harpoon #1,4000,MISS\n",
    )
    .unwrap();

    // U2 already appears as a kill victim, so its destroyed record must be
    // dropped; U1's two records must dedup to the last one.
    fs::write(
        dir.join(DESTROYED_FILE),
        "Time,UnitID,Reason,Cause\n\
         hh:mm:ss,-,-,-\n\
         00:00:10.000,U2,sunk,weapon\n\
         00:00:20.000,U1,fire,damage\n\
         00:00:25.000,U1,flooding,damage\n",
    )
    .unwrap();
}

pub fn write_position_file(dir: &Path) {
    fs::write(
        dir.join(POS_FILE),
        "Time,UnitID,UnitName,UnitClass,UnitType,UnitSide,UnitLongitude,UnitLatitude,\
         UnitSpeed_kts,UnitCourse,UnitAltitude_m,Status,DamagePercent,Fire,Flood\n\
         hh:mm:ss,-,-,-,-,-,deg,deg,kts,deg,m,-,pct,-,-\n\
         00:00:00.500,U1,Alpha,Frigate,TF1,Blue,1.0,1.0,10,90,0,OK,0,,\n\
         00:00:01.200,U1,Alpha,Frigate,TF1,Blue,1.1,1.0,10,90,0,OK,0,,\n\
         00:00:01.900,U1,Alpha,Frigate,TF1,Blue,1.2,1.0,10,90,0,OK,0,,\n\
         00:00:00.500,U2,Bravo,Destroyer,TF2,Red,5.0,5.0,12,270,0,OK,0,,\n\
         00:00:05.000,W1,Harpoon #1,Missile,TF1,Blue,1.3,1.1,450,90,50,OK,0,,\n",
    )
    .unwrap();
}

/// Run configuration pointing at `input`, with every toggle at the
/// scenario default: process enabled, weapons as entities, no optional
/// thinning, zero hour 0.
pub fn standard_config(input: &TempDir, output: &TempDir) -> RunConfig {
    RunConfig {
        serial: "1".to_string(),
        case: "baseline".to_string(),
        replication: "1".to_string(),
        process: true,
        input_location: input.path().to_path_buf(),
        output_location: output.path().to_path_buf(),
        unit_pos_file: POS_FILE.to_string(),
        weapon_fired_file: FIRED_FILE.to_string(),
        weapon_endgame_file: ENDGAME_FILE.to_string(),
        unit_destroyed_file: DESTROYED_FILE.to_string(),
        sensor_detection_file: SENSOR_FILE.to_string(),
        zero_hour: 0.0,
        weapon_entities: true,
        ignore_same_location_updates: false,
        min_location_update_interval: 0,
    }
}
