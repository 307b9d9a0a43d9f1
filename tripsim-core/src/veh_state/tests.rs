use super::*;
use crate::vehicle::MassProperties;

fn state_for(veh: &VehicleModelParameters) -> VehicleState {
    VehicleState::new(veh, &CurveCalibration::default()).unwrap()
}

/// Drives a constant desired speed on flat ground at 1 s steps
fn hold_speed(state: &mut VehicleState, mph: f64, secs: usize, pm: &mut HybridPowerManager) {
    let t0 = state.time.sec_since_trip_start;
    for i in 1..=secs {
        state
            .step(t0 + i as f64, mph, 0.0, 0.0, 0.0, pm)
            .unwrap();
    }
}

#[test]
fn test_conventional_steady_speed_power_balance() {
    let mut veh = VehicleModelParameters::mock_conventional();
    veh.fuel_converter.max_kw = 100.0;
    let total_kg = MassProperties::new(&veh).total_kg;
    veh.general.glider_kg += 1500.0 - total_kg;
    let mut state = state_for(&veh);
    assert!(state.params.mass.total_kg.approx_eq(&1500.0, 1e-6));

    let mut pm = HybridPowerManager::default();
    hold_speed(&mut state, 60.0, 100, &mut pm);

    assert!(state.motion.ach_mph.approx_eq(&60.0, 1e-3));
    let p = &state.power;
    let mps = state.motion.ach_mps;
    let dyno_kw = (state.params.dyno_coeff_a(&state.consts)
        + state.params.dyno_coeff_c(&state.consts) * mps * mps)
        * mps
        / 1e3;
    assert!(
        ((p.drag_kw + p.rr_kw - dyno_kw) / dyno_kw).abs() < 1e-3,
        "road load {} vs dyno {dyno_kw}",
        p.drag_kw + p.rr_kw
    );
    let road_kw = (p.drag_kw + p.rr_kw) / veh.transmission.trans_eff;
    let fc_net_kw = p.fc_kw_out - p.aux_kw;
    assert!(
        ((fc_net_kw - road_kw) / road_kw).abs() < 0.05,
        "fc net {fc_net_kw} vs road {road_kw}"
    );
    assert!(state.energy.fuel_since_start > 0.0);
    assert!(state.is_fc_on());
    assert_eq!(state.energy.histogram.operating_fraction(), 1.0);
}

#[test]
fn test_conventional_stop_has_no_drag() {
    let mut state = state_for(&VehicleModelParameters::mock_conventional());
    let mut pm = HybridPowerManager::default();
    let p = state.step(1.0, 0.0, 0.0, 0.0, 0.0, &mut pm).unwrap();
    assert_eq!(p.drag_kw, 0.0);
    assert_eq!(state.motion.ach_mps, 0.0);
    // idling still burns fuel for the auxiliary load
    assert!(state.energy.fuel_step > 0.0);
    assert_eq!(state.time.sec_fc_on, 1.0);
}

#[test]
fn test_slip_limits_acceleration() {
    let mut state = state_for(&VehicleModelParameters::mock_conventional());
    let mut pm = HybridPowerManager::default();
    state.step(1.0, 100.0, 0.0, 0.0, 0.0, &mut pm).unwrap();
    let max_accel = state.params.max_accel_mps2(&state.consts);
    assert!(state.motion.ach_mps <= max_accel + 1e-9);
    assert!(state.motion.slip_mph > 0.0);
}

#[test]
fn test_bev_regen_recovers_energy() {
    let mut state = state_for(&VehicleModelParameters::mock_bev());
    let mut pm = HybridPowerManager::default();
    hold_speed(&mut state, 30.0, 20, &mut pm);
    let soc_before_braking = state.soc.rel_soc;
    assert!(soc_before_braking < 1.0);

    let t0 = state.time.sec_since_trip_start;
    let mut regen_seen = false;
    for (i, mph) in [25.0, 20.0, 15.0, 10.0, 5.0, 0.0].iter().enumerate() {
        let p = state
            .step(t0 + 1.0 + i as f64, *mph, 0.0, 0.0, 0.0, &mut pm)
            .unwrap();
        assert!(p.fric_brake_kw >= 0.0);
        if p.regen_kw > 0.0 {
            regen_seen = true;
        }
        if p.regen_kw > p.aux_kw {
            assert!(p.ess_kw < 0.0);
        }
    }
    assert!(regen_seen);
    assert!(state.soc.rel_soc > soc_before_braking);
    assert_eq!(state.energy.fuel_since_start, 0.0);
    assert!(!state.is_fc_on());
}

#[test]
fn test_bev_coasting_draws_aux_only() {
    let mut state = state_for(&VehicleModelParameters::mock_bev());
    let mut pm = HybridPowerManager::default();
    let p = state.step(1.0, 0.0, 0.0, 0.0, 0.0, &mut pm).unwrap();
    let ess_eff = state.params.battery.round_trip_eff.sqrt();
    assert!(p.ess_kw.approx_eq(&(p.aux_kw / ess_eff), 1e-9));
}

#[test]
fn test_bev_tiny_drive_demand_goes_through_motor() {
    let mut state = state_for(&VehicleModelParameters::mock_bev());
    let mut pm = HybridPowerManager::default();
    hold_speed(&mut state, 30.0, 40, &mut pm);
    assert!(state.motion.ach_mph.approx_eq(&30.0, 1e-9));

    // downhill grade that leaves a sliver of positive wheel power at steady speed
    let v = state.motion.ach_mps;
    let mass_kg = state.params.mass.total_kg;
    let g = state.consts.a_grav_mps2;
    let level_kw = (state.params.dyno_coeff_c(&state.consts) * v.powi(3)
        + g * mass_kg * state.params.wheels.rr_coef * v)
        / 1e3;
    let target_wheel_kw = 0.5 * DRIVE_POWER_TOL_KW;
    let sin_theta = -(level_kw - target_wheel_kw) * 1e3 / (mass_kg * g * v);
    let grade = sin_theta.asin().tan();

    let t = state.time.sec_since_trip_start + 1.0;
    let p = state.step(t, 30.0, grade, 0.0, 0.0, &mut pm).unwrap();
    assert!(p.wheel_kw() > 0.0 && p.wheel_kw() < DRIVE_POWER_TOL_KW, "{}", p.wheel_kw());
    assert!(p.mt_kw_out > 0.0);
    let ess_eff = state.params.battery.round_trip_eff.sqrt();
    assert!(p.ess_kw.approx_eq(&((p.mt_kw_in + p.aux_kw) / ess_eff), 1e-12));
}

#[test]
fn test_hev_runs_converter_at_low_soc() {
    let mut state = state_for(&VehicleModelParameters::mock_hev());
    state.set_rel_soc(0.05).unwrap();
    let mut pm = HybridPowerManager::default();
    hold_speed(&mut state, 30.0, 60, &mut pm);
    assert!(state.energy.fuel_since_start > 0.0);
    assert!(state.soc.rel_soc.is_finite());
    assert!(state.motion.ach_mph.approx_eq(&30.0, 1e-3));
    assert!(pm.last_decision().is_some());
}

#[test]
fn test_hev_timer_sentinels() {
    let mut state = state_for(&VehicleModelParameters::mock_hev());
    state.set_rel_soc(1.0).unwrap();
    let mut pm = HybridPowerManager::default();
    // hard launch forces the converter on
    state.step(1.0, 20.0, 0.08, 0.0, 0.0, &mut pm).unwrap();
    hold_speed(&mut state, 20.0, 8, &mut pm);
    state.step(10.0, 20.0, 0.0, 0.0, 0.0, &mut pm).unwrap();
    if state.is_fc_on() {
        assert!(state.time.sec_fc_on >= 0.0);
        assert!(state.time.sec_fc_off < 0.0);
    } else {
        assert!(state.time.sec_fc_on < 0.0);
        assert!(state.time.sec_fc_off >= 0.0);
    }
}

#[test]
fn test_set_rel_soc_clamps() {
    let mut state = state_for(&VehicleModelParameters::mock_phev());
    state.set_rel_soc(1.5).unwrap();
    assert_eq!(state.soc.rel_soc, 1.0);
    assert!(state.soc.abs_soc.approx_eq(&state.params.charge_control.max_soc, 1e-12));
    state.set_rel_soc(-0.2).unwrap();
    assert_eq!(state.soc.rel_soc, 0.0);
    assert!(state.soc.abs_soc.approx_eq(&state.params.charge_control.min_soc, 1e-12));
    assert!(state.set_rel_soc(f64::NAN).is_err());

    let mut cv = state_for(&VehicleModelParameters::mock_conventional());
    assert!(cv.set_rel_soc(0.5).is_err());
}

#[test]
fn test_step_rejects_bad_inputs() {
    let mut state = state_for(&VehicleModelParameters::mock_conventional());
    let mut pm = HybridPowerManager::default();
    assert!(state.step(0.0, 10.0, 0.0, 0.0, 0.0, &mut pm).is_err());
    assert!(state.step(1.0, -1.0, 0.0, 0.0, 0.0, &mut pm).is_err());
    assert!(state.step(1.0, 10.0, f64::NAN, 0.0, 0.0, &mut pm).is_err());
    assert!(state.step(1.0, 10.0, 0.0, 0.0, 0.0, &mut pm).is_ok());
    // time must keep moving forward
    assert!(state.step(1.0, 10.0, 0.0, 0.0, 0.0, &mut pm).is_err());
}

#[test]
fn test_reset_all_but_soc_keeps_soc() {
    let mut state = state_for(&VehicleModelParameters::mock_bev());
    let mut pm = HybridPowerManager::default();
    hold_speed(&mut state, 40.0, 30, &mut pm);
    let soc = state.soc.clone();
    state.reset_all_but_soc();
    assert_eq!(state.soc, soc);
    assert_eq!(state.time, TimeInfo::default());
    assert_eq!(state.motion.miles_since_start, 0.0);
    assert_eq!(state.energy.batt_kwh_since_start, 0.0);
    assert_eq!(state.energy.histogram.total_secs, 0.0);
}

#[test]
fn test_tuning_adds_load() {
    let veh = VehicleModelParameters::mock_conventional();
    let mut base = state_for(&veh);
    let mut tuned = state_for(&veh).with_tuning(ThreeParamTuning {
        add_mass_kg: 200.0,
        add_aux_kw: 1.0,
        drive_energy_mult: 1.1,
    });
    let mut pm = HybridPowerManager::default();
    hold_speed(&mut base, 40.0, 60, &mut pm);
    hold_speed(&mut tuned, 40.0, 60, &mut pm);
    assert!(tuned.energy.fuel_since_start > base.energy.fuel_since_start);
    assert!(tuned.power.aux_kw.approx_eq(&(base.power.aux_kw + 1.0), 1e-9));
}

#[test]
fn test_ramped_limit() {
    assert_eq!(ramped_limit_kw(100.0, 0.0, 1.0, 0.0), 100.0);
    assert_eq!(ramped_limit_kw(100.0, 0.0, 1.0, 4.0), 25.0);
    assert_eq!(ramped_limit_kw(100.0, 90.0, 1.0, 4.0), 100.0);
}
