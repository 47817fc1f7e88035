mod common;

use std::fs;

use tempfile::tempdir;
use timeline_core::{load_batch_config, process_run, report_line, EntityStore, RunOutcome};

#[test]
fn batch_configurations_run_independently() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    common::write_standard_scenario(input.path());

    let config_path = output.path().join("batch_config.csv");
    fs::write(
        &config_path,
        format!(
            "batch configuration\n\
             serial,case,replication,process,input_location,output_location,\
             unit_pos_file,weapon_fired_file,weapon_endgame_file,unit_destroyed_file,\
             sensor_detection_file,zero_hour,weapon_entities,ignore_same_location_updates,\
             min_location_update_interval\n\
             1,baseline,1,yes,{input},{output},{pos},{fired},{endgame},{destroyed},{sensor},0,true,false,0\n\
             2,baseline,2,no,{input},{output},{pos},{fired},{endgame},{destroyed},{sensor},0,true,false,0\n",
            input = input.path().display(),
            output = output.path().display(),
            pos = common::POS_FILE,
            fired = common::FIRED_FILE,
            endgame = common::ENDGAME_FILE,
            destroyed = common::DESTROYED_FILE,
            sensor = common::SENSOR_FILE,
        ),
    )
    .unwrap();

    let configs = load_batch_config(&config_path).unwrap();
    assert_eq!(configs.len(), 2);

    let mut lines = Vec::new();
    for config in &configs {
        let mut store = EntityStore::new();
        let outcome = if config.process {
            process_run(config, &mut store)
        } else {
            RunOutcome::NotProcessed
        };
        // Runs share no state: each processed run builds its own fresh
        // entity set.
        if config.process {
            assert_eq!(store.len(), 3);
        } else {
            assert!(store.is_empty());
        }
        lines.push(report_line(config, &outcome));
    }

    assert_eq!(lines[0], "Serial 1 - case baseline, replication 1 - complete");
    assert_eq!(
        lines[1],
        "Serial 2 - case baseline, replication 2 - not set to process"
    );
}

#[test]
fn precomputed_entities_bypass_registry_construction() {
    let input = tempdir().unwrap();
    let output = tempdir().unwrap();
    common::write_standard_scenario(input.path());
    let config = common::standard_config(&input, &output);

    let mut store = EntityStore::new();
    store.insert(timeline_core::Entity::new("U1"));
    let outcome = process_run(&config, &mut store);
    assert_eq!(outcome, RunOutcome::Complete);

    // Only the supplied entity exists; its timelines are still populated.
    assert_eq!(store.uids(), vec!["U1"]);
    assert!(!store.get("U1").unwrap().series("location_time").is_empty());
}
