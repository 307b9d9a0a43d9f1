use anyhow::{bail, Context};
use clap::{ArgGroup, Parser};
use std::ffi::OsStr;
use std::fs::File;
use std::path::Path;

extern crate tripsim_core;
use tripsim_core::prelude::*;

/// Runs one trip for one vehicle and prints the trip summary.
/// After running `cargo build --release`, run with
/// ```bash
/// ./target/release/tripsim-cli --veh-file resources/vehicles/hev.yaml --trip-file resources/trips/urban.csv
/// ```
/// Hybrids are reported at zero net battery use unless `--rel-soc` or
/// `--record-file` is given, in which case the trip is run once.
#[derive(Parser)]
#[clap(author, version, about, long_about = None)]
#[clap(group(
    ArgGroup::new("vehicle")
    .required(true)
    .args(&["veh", "veh-file"])
))]
#[clap(group(
    ArgGroup::new("trip-input")
    .required(true)
    .args(&["trip", "trip-file"])
))]
struct TripSimApi {
    /// Vehicle as json string
    #[clap(long, value_parser)]
    veh: Option<String>,
    /// Path to vehicle file (yaml or json)
    #[clap(long, value_parser)]
    veh_file: Option<String>,
    /// Trip as json string
    #[clap(long, value_parser)]
    trip: Option<String>,
    /// Path to trip file (csv, yaml, or json)
    #[clap(long, value_parser)]
    trip_file: Option<String>,
    /// Path to hybrid power manager file (yaml or json)
    #[clap(long, value_parser)]
    power_manager_file: Option<String>,
    /// Path to custom efficiency curve library (yaml or json), indexed by the
    /// vehicle's curve ids
    #[clap(long, value_parser)]
    curve_library_file: Option<String>,
    /// Starting relative SOC for electrified vehicles
    #[clap(long, value_parser)]
    rel_soc: Option<f64>,
    /// Path at which to write the step-by-step record as csv
    #[clap(long, value_parser)]
    record_file: Option<String>,
    /// How to print results: `json` or `yaml`
    #[clap(long, value_parser, default_value = "json")]
    res_fmt: String,
}

pub fn main() -> anyhow::Result<()> {
    let api = TripSimApi::parse();

    let veh = if let Some(veh_json) = &api.veh {
        VehicleModelParameters::from_json(veh_json)?
    } else if let Some(veh_file) = &api.veh_file {
        VehicleModelParameters::from_file(veh_file)?
    } else {
        bail!("one of `--veh` or `--veh-file` is required")
    };

    let trip = if let Some(trip_json) = &api.trip {
        Trip::from_json(trip_json)?
    } else if let Some(trip_file) = &api.trip_file {
        let path = Path::new(trip_file);
        match path.extension().and_then(OsStr::to_str) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Trip::from_csv_file(path)?,
            _ => Trip::from_file(path)?,
        }
    } else {
        bail!("one of `--trip` or `--trip-file` is required")
    };

    let mut manager = match &api.power_manager_file {
        Some(pm_file) => HybridPowerManager::from_file(pm_file)?,
        None => HybridPowerManager::default(),
    };

    let calibration = match &api.curve_library_file {
        Some(lib_file) => EfficiencyCurveLibrary::from_file(lib_file)?
            .calibration_for(&veh.battery)
            .with_context(|| format!("selecting curves from {lib_file:?}"))?,
        None => CurveCalibration::default(),
    };

    let mut runner = TripRunner::new(VehicleState::new(&veh, &calibration)?);
    let summary = if let Some(record_file) = &api.record_file {
        let (summary, record) = runner.run_with_record(&trip, &mut manager, api.rel_soc)?;
        let file = File::create(record_file)
            .with_context(|| format!("Could not create record file: {record_file:?}"))?;
        record.to_csv_writer(file, &[])?;
        summary
    } else if api.rel_soc.is_some() {
        runner.run_direct(&trip, &mut manager, api.rel_soc)?
    } else {
        runner.run(&trip, &mut manager)?
    };

    let metrics = runner.metrics(&summary);
    match api.res_fmt.to_lowercase().as_str() {
        "json" => println!("{}", metrics.to_json()?),
        "yaml" | "yml" => print!("{}", metrics.to_yaml()?),
        other => bail!("Unsupported result format {other:?}, must be one of [\"json\", \"yaml\"]"),
    }
    Ok(())
}
