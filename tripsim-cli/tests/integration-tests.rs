use std::path::PathBuf;
use std::process::Command;

use assert_cmd::prelude::{CommandCargoExt, OutputAssertExt};
use predicates::prelude::predicate;

fn resource(rel_path: &str) -> PathBuf {
    let path = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("../resources")
        .join(rel_path)
        .canonicalize()
        .unwrap();
    assert!(path.exists());
    path
}

#[test]
fn test_that_cli_app_produces_result() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tripsim-cli")?;
    cmd.args([
        "--trip-file",
        resource("trips/urban.csv").to_str().unwrap(),
        "--veh-file",
        resource("vehicles/hev.yaml").to_str().unwrap(),
    ]);
    let output = cmd.assert().success().get_output().stdout.clone();
    let res: serde_json::Value = serde_json::from_slice(&output)?;
    assert_eq!(res["battery_kwh"], 0.0);
    assert!(res["mpg"].as_f64().unwrap() > 0.0);
    assert_eq!(res["fuel_unit"], "GGE");
    Ok(())
}

#[test]
fn test_bev_yaml_output() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tripsim-cli")?;
    cmd.args([
        "--trip-file",
        resource("trips/urban.csv").to_str().unwrap(),
        "--veh-file",
        resource("vehicles/bev.yaml").to_str().unwrap(),
        "--res-fmt",
        "yaml",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("kwh_per_mile:"))
        .stdout(predicate::str::contains("mpg: null"));
    Ok(())
}

#[test]
fn test_inline_trip_and_power_manager() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tripsim-cli")?;
    cmd.args([
        "--trip",
        r#"{"time_s": [0.0, 1.0, 2.0, 3.0], "speed_mph": [0.0, 5.0, 10.0, 10.0]}"#,
        "--veh-file",
        resource("vehicles/hev.yaml").to_str().unwrap(),
        "--power-manager-file",
        resource("power_managers/default.yaml").to_str().unwrap(),
        "--rel-soc",
        "0.5",
    ]);
    cmd.assert()
        .success()
        .stdout(predicate::str::contains("\"seconds\":3.0"));
    Ok(())
}

#[test]
fn test_record_file_is_written() -> Result<(), Box<dyn std::error::Error>> {
    let record_file = std::env::temp_dir().join(format!(
        "tripsim-cli-record-{}.csv",
        std::process::id()
    ));
    let mut cmd = Command::cargo_bin("tripsim-cli")?;
    cmd.args([
        "--trip-file",
        resource("trips/urban.csv").to_str().unwrap(),
        "--veh-file",
        resource("vehicles/bev.yaml").to_str().unwrap(),
        "--record-file",
        record_file.to_str().unwrap(),
    ]);
    cmd.assert().success();
    let contents = std::fs::read_to_string(&record_file)?;
    std::fs::remove_file(&record_file)?;
    assert!(contents.starts_with("time_s,speed_mph,miles,rel_soc"));
    assert_eq!(contents.lines().count(), 247);
    Ok(())
}

#[test]
fn test_missing_vehicle_is_rejected() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tripsim-cli")?;
    cmd.args([
        "--trip-file",
        resource("trips/urban.csv").to_str().unwrap(),
    ]);
    cmd.assert().failure();
    Ok(())
}

#[test]
fn test_bad_result_format_fails() -> Result<(), Box<dyn std::error::Error>> {
    let mut cmd = Command::cargo_bin("tripsim-cli")?;
    cmd.args([
        "--trip-file",
        resource("trips/urban.csv").to_str().unwrap(),
        "--veh-file",
        resource("vehicles/bev.yaml").to_str().unwrap(),
        "--res-fmt",
        "xml",
    ]);
    cmd.assert()
        .failure()
        .stderr(predicate::str::contains("Unsupported result format"));
    Ok(())
}
