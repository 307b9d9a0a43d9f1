use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tripsim_core::params::MPH_PER_MPS;
use tripsim_core::prelude::*;

const URBAN_TRIP: &str = include_str!("../../resources/trips/urban.csv");
const HEV_YAML: &str = include_str!("../../resources/vehicles/hev.yaml");
const BEV_YAML: &str = include_str!("../../resources/vehicles/bev.yaml");
const HOLD_AFTER_2MI: &str = include_str!("../../resources/power_managers/hold_after_2mi.yaml");

fn runner_for(veh: &VehicleModelParameters) -> TripRunner {
    TripRunner::new(VehicleState::new(veh, &CurveCalibration::default()).unwrap())
}

fn urban_trip() -> Trip {
    Trip::from_str(URBAN_TRIP, "csv").unwrap()
}

/// Constant-speed cruise of `secs` seconds with a gentle launch and stop
fn cruise_speeds(mph: f64, secs: usize) -> Vec<f64> {
    let mut speeds = vec![0.0];
    speeds.extend((1..=10).map(|k| mph * k as f64 / 10.0));
    speeds.extend(std::iter::repeat(mph).take(secs));
    speeds.extend((0..10).rev().map(|k| mph * k as f64 / 10.0));
    speeds
}

fn cruise_trip(mph: f64, secs: usize) -> Trip {
    Trip::from_speed_trace(&cruise_speeds(mph, secs)).unwrap()
}

#[test]
fn test_resource_vehicles_match_mocks() {
    let hev = VehicleModelParameters::from_yaml(HEV_YAML).unwrap();
    assert!(hev.approx_eq(&VehicleModelParameters::mock_hev(), 1e-12));
    let bev = VehicleModelParameters::from_yaml(BEV_YAML).unwrap();
    assert!(bev.approx_eq(&VehicleModelParameters::mock_bev(), 1e-12));
}

#[test]
fn test_bev_out_and_back_loses_charge() {
    let veh = VehicleModelParameters::from_yaml(BEV_YAML).unwrap();
    let mut runner = runner_for(&veh);
    let out = cruise_speeds(40.0, 120);
    let half = out.len();
    let speeds: Vec<f64> = out.iter().chain(out.iter().skip(1)).copied().collect();
    let mut trip = Trip::from_speed_trace(&speeds).unwrap();
    // climb on the way out, descend the same road on the way back
    trip.grade = (0..trip.len())
        .map(|i| if i < half { 0.03 } else { -0.03 })
        .collect();

    let summary = runner
        .run(&trip, &mut HybridPowerManager::default())
        .unwrap();
    assert!(summary.final_rel_soc < 1.0);
    assert!(summary.battery_kwh > 0.0);
    assert_eq!(summary.fuel_use, 0.0);
    assert_eq!(summary.fc_starts, 0);
    let metrics = runner.metrics(&summary);
    assert_eq!(metrics.mpg, None);
    assert!(metrics.kwh_per_mile.unwrap() > 0.0);
    assert!(metrics.g_co2_eq > 0.0);
}

#[test]
fn test_hev_equivalent_fuel_is_positive() {
    let veh = VehicleModelParameters::from_yaml(HEV_YAML).unwrap();
    let mut runner = runner_for(&veh);
    let trip = urban_trip();
    let mut pm = HybridPowerManager::default();
    let summary = runner.run(&trip, &mut pm).unwrap();
    assert!(summary.fuel_use > 0.0);
    assert!(summary.miles > 1.0);
    let mpg = summary.mpg().unwrap();
    assert!(mpg > 10.0 && mpg < 200.0, "mpg {mpg}");
    assert!(summary.idle_secs > 0.0);
}

#[test]
fn test_hev_raw_fuel_falls_with_starting_soc() {
    let veh = VehicleModelParameters::mock_hev();
    let trip = urban_trip();
    let mut low = runner_for(&veh);
    let mut high = runner_for(&veh);
    let low = low
        .run_direct(&trip, &mut HybridPowerManager::default(), Some(0.05))
        .unwrap();
    let high = high
        .run_direct(&trip, &mut HybridPowerManager::default(), Some(0.95))
        .unwrap();
    assert!(low.fuel_use > high.fuel_use);
    assert!(low.battery_kwh < high.battery_kwh);
}

#[test]
fn test_phev_charge_hold_segment_spends_fuel_to_keep_soc() {
    let veh = VehicleModelParameters::mock_phev();
    let trip = cruise_trip(40.0, 300);

    let mut deplete = runner_for(&veh);
    let depleting = deplete
        .run_direct(&trip, &mut HybridPowerManager::default(), Some(0.6))
        .unwrap();

    let mut adv = AdvancedPhevPowerManager::default();
    adv.add_segment(ChargeModeSegment::hold(0.0)).unwrap();
    let mut pm = HybridPowerManager::from(adv);
    let mut hold = runner_for(&veh);
    let holding = hold.run_direct(&trip, &mut pm, Some(0.6)).unwrap();

    assert!(holding.fuel_use > depleting.fuel_use);
    assert!(holding.final_rel_soc > depleting.final_rel_soc);
    assert!(pm.is_in_charge_sustain(&hold.state));
}

#[test]
fn test_phev_segments_from_file() {
    let mut pm = HybridPowerManager::from_yaml(HOLD_AFTER_2MI).unwrap();
    match &pm {
        HybridPowerManager::AdvancedPhev(adv) => {
            assert_eq!(adv.segments().map(|s| s.len()), Some(2));
        }
        _ => panic!("expected the advanced policy"),
    }
    let mut runner = runner_for(&VehicleModelParameters::mock_phev());
    let summary = runner
        .run_direct(&cruise_trip(45.0, 300), &mut pm, Some(0.8))
        .unwrap();
    assert!(summary.miles > 2.0);
    match &pm {
        HybridPowerManager::AdvancedPhev(adv) => assert_eq!(adv.trip.segment_idx, 1),
        _ => unreachable!(),
    }
}

#[test]
fn test_reset_is_idempotent_on_stationary_trip() {
    let trip = Trip::from_speed_trace(&[0.0; 30]).unwrap();
    for veh in [
        VehicleModelParameters::mock_conventional(),
        VehicleModelParameters::mock_bev(),
        VehicleModelParameters::mock_phev(),
    ] {
        let mut runner = runner_for(&veh);
        let mut pm = HybridPowerManager::default();
        let rel_soc = veh.pt_type().is_electrified().then_some(0.7);
        let first = runner.run_direct(&trip, &mut pm, rel_soc).unwrap();
        let state_after_first = runner.state.clone();
        let second = runner.run_direct(&trip, &mut pm, rel_soc).unwrap();
        assert_eq!(first, second);
        assert_eq!(runner.state, state_after_first);
        assert_eq!(first.miles, 0.0);
        assert_eq!(first.idle_secs, 29.0);
    }
}

#[test]
fn test_speed_stays_within_bounds() {
    let trip = urban_trip();
    let max_desired = trip.speed_mph.iter().copied().fold(0.0, f64::max);
    for veh in [
        VehicleModelParameters::mock_conventional(),
        VehicleModelParameters::mock_hev(),
        VehicleModelParameters::mock_bev(),
    ] {
        let mut runner = runner_for(&veh);
        let rel_soc = veh.pt_type().is_electrified().then_some(0.5);
        let (_, record) = runner
            .run_with_record(&trip, &mut HybridPowerManager::default(), rel_soc)
            .unwrap();
        let consts = SimConstants::default();
        let max_accel_mph = veh.max_accel_mps2(&consts) * MPH_PER_MPS;
        let max_decel_mph = veh.max_decel_mps2(&consts) * MPH_PER_MPS;
        for i in 1..record.len() {
            let v = record.speed_mph[i];
            assert!(v >= 0.0);
            assert!(v <= max_desired + 1e-9);
            let dt = record.time_s[i] - record.time_s[i - 1];
            assert!((v - record.speed_mph[i - 1]) / dt <= max_accel_mph + 1e-6);
            assert!((record.speed_mph[i - 1] - v) / dt <= max_decel_mph + 1e-6);
        }
    }
}

/// 1 Hz trace that wanders between stops and `max_mph`, changing speed by at
/// most `max_step_mph` per second
fn random_speeds(rng: &mut StdRng, secs: usize, max_mph: f64, max_step_mph: f64) -> Vec<f64> {
    let mut speeds = vec![0.0];
    for _ in 1..secs {
        let prev = speeds[speeds.len() - 1];
        let next = prev + rng.random_range(-max_step_mph..=max_step_mph);
        speeds.push(next.clamp(0.0, max_mph));
    }
    speeds
}

#[test]
fn test_hev_soc_stays_in_window_on_random_trips() {
    let veh = VehicleModelParameters::mock_hev();
    let cc = &veh.charge_control;
    // below the speed that forces the engine on, with modest wheel demand
    let max_mph = (cc.mph_fc_on - 5.0).min(50.0);
    let soc_window = (cc.min_soc - 0.01)..=(cc.max_soc + 0.01);

    let mut rng = StdRng::seed_from_u64(42);
    for _ in 0..20 {
        let speeds = random_speeds(&mut rng, 600, max_mph, 2.0);
        let mut state = VehicleState::new(&veh, &CurveCalibration::default()).unwrap();
        state.set_rel_soc(0.5).unwrap();
        let mut pm = HybridPowerManager::default();
        for (i, mph) in speeds.iter().enumerate().skip(1) {
            let p = state
                .step(i as f64, *mph, 0.0, 0.0, 0.0, &mut pm)
                .unwrap();
            assert!(p.drag_kw + p.accel_kw + p.rr_kw < cc.kw_demand_fc_on);
            assert!(
                soc_window.contains(&state.soc.abs_soc),
                "abs SOC {} left {:?} at {} s",
                state.soc.abs_soc,
                soc_window,
                i
            );
        }
    }
}

#[test]
fn test_record_csv_export() {
    let mut runner = runner_for(&VehicleModelParameters::mock_conventional());
    let (_, record) = runner
        .run_with_record(&urban_trip(), &mut HybridPowerManager::default(), None)
        .unwrap();
    let csv = record
        .to_csv_string(&[RecordColumn::TimeS, RecordColumn::FuelUse])
        .unwrap();
    let mut lines = csv.lines();
    assert_eq!(lines.next(), Some("time_s,fuel_use"));
    assert_eq!(lines.count(), urban_trip().len());
}

#[test]
fn test_tuning_and_payload_raise_fuel_use() {
    let veh = VehicleModelParameters::mock_conventional();
    let trip = urban_trip();
    let base = runner_for(&veh)
        .run(&trip, &mut HybridPowerManager::default())
        .unwrap();

    let mut loaded_trip = trip.clone();
    loaded_trip.payload_kg.fill(300.0);
    let loaded = runner_for(&veh)
        .run(&loaded_trip, &mut HybridPowerManager::default())
        .unwrap();
    assert!(loaded.fuel_use > base.fuel_use);

    let tuned_state = VehicleState::new(&veh, &CurveCalibration::default())
        .unwrap()
        .with_tuning(ThreeParamTuning {
            add_mass_kg: 300.0,
            ..Default::default()
        });
    let tuned = TripRunner::new(tuned_state)
        .run(&trip, &mut HybridPowerManager::default())
        .unwrap();
    assert!(tuned.fuel_use.approx_eq(&loaded.fuel_use, 1e-9));
}

#[test]
fn test_clean_grid_bev_emits_nothing() {
    let veh = VehicleModelParameters::mock_bev();
    let mut runner = runner_for(&veh).with_emissions(EmissionFactors {
        elec_g_per_kwh: 0.0,
        ..Default::default()
    });
    let summary = runner
        .run(&urban_trip(), &mut HybridPowerManager::default())
        .unwrap();
    assert!(summary.battery_kwh > 0.0);
    assert_eq!(runner.metrics(&summary).g_co2_eq, 0.0);
}

#[test]
fn test_thinner_air_saves_fuel_at_cruise() {
    let veh = VehicleModelParameters::mock_conventional();
    let trip = cruise_trip(65.0, 300);
    let sea_level = runner_for(&veh)
        .run(&trip, &mut HybridPowerManager::default())
        .unwrap();
    let thin_air_state = VehicleState::new(&veh, &CurveCalibration::default())
        .unwrap()
        .with_constants(SimConstants {
            air_density_kg_per_m3: 1.0,
            ..Default::default()
        });
    let thin_air = TripRunner::new(thin_air_state)
        .run(&trip, &mut HybridPowerManager::default())
        .unwrap();
    assert!(thin_air.fuel_use < sea_level.fuel_use);
    assert!(thin_air.miles.approx_eq(&sea_level.miles, 1e-6));
}
