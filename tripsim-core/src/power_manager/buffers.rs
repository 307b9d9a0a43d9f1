//! SOC buffers and battery power targets used by the converter decision
//! ladder.  Everything here is a pure function of the vehicle parameters and
//! the current operating point.  Buffers are absolute SOC; powers are kW with
//! positive meaning battery discharge.

use crate::components::{FuelConverterModel, MotorModel};
use crate::imports::*;
use crate::vehicle::VehicleModelParameters;

/// Reference speed whose kinetic energy sizes the largest acceleration buffer [m/s]
const ACC_BUFFER_REF_MPS: f64 = 27.0;

/// SOC above which regenerative braking from `mph` could overfill the battery
pub fn regen_soc_buffer(min_soc: f64, max_soc: f64, mph: f64, veh: &VehicleModelParameters) -> f64 {
    let v_mps = mph / MPH_PER_MPS;
    let kinetic_kwh = 0.5
        * veh.mass.total_kg
        * v_mps.powi(2)
        * veh.motor.peak_eff
        * veh.transmission.max_regen
        / J_PER_KWH;
    min_soc.max(max_soc - kinetic_kwh / veh.battery.max_kwh)
}

/// SOC below which the battery may not cover an acceleration from `mph`.
/// Shrinks to `min_soc` at the configured zero-reserve speed.
pub fn acc_soc_buffer(min_soc: f64, max_soc: f64, mph: f64, veh: &VehicleModelParameters) -> f64 {
    let v_mps = mph / MPH_PER_MPS;
    let b_mps = veh.charge_control.mph_ess_acc_rsrv_zero / MPH_PER_MPS;
    if b_mps <= 0.0 {
        return min_soc;
    }
    let reserve = (veh.charge_control.frac_ess_acc_reserve * (max_soc - min_soc)).min(
        0.5 * veh.mass.total_kg * ACC_BUFFER_REF_MPS.powi(2) / (J_PER_KWH * veh.battery.max_kwh),
    );
    max_soc.min(
        min_soc.max(min_soc + ((b_mps.powi(2) - v_mps.powi(2)) / b_mps.powi(2)) * reserve),
    )
}

/// Battery power that moves SOC by `delta_soc` within `dt`
fn soc_delta_kw(delta_soc: f64, dt: f64, veh: &VehicleModelParameters) -> f64 {
    delta_soc * veh.battery.max_kwh * SEC_PER_HR / dt
}

/// Charge power that would fill the battery up to the regen buffer
pub fn max_regen_buffer_chg_kw(regen_buf: f64, soc: f64, dt: f64, veh: &VehicleModelParameters) -> f64 {
    veh.battery
        .max_kw
        .min(soc_delta_kw(regen_buf - soc, dt, veh).max(0.0))
}

/// Discharge power that would drain the battery down to the regen buffer
pub fn regen_buffer_dischg_kw(regen_buf: f64, soc: f64, dt: f64, veh: &VehicleModelParameters) -> f64 {
    veh.battery
        .max_kw
        .min(soc_delta_kw(soc - regen_buf, dt, veh).max(0.0))
}

/// Charge power that would restore the acceleration buffer; not rate limited
pub fn acc_buffer_chg_kw(acc_buf: f64, soc: f64, dt: f64, veh: &VehicleModelParameters) -> f64 {
    soc_delta_kw(acc_buf - soc, dt, veh).max(0.0)
}

/// Discharge power available above the acceleration buffer
pub fn acc_buffer_dischg_kw(acc_buf: f64, soc: f64, dt: f64, veh: &VehicleModelParameters) -> f64 {
    veh.battery
        .max_kw
        .min(soc_delta_kw(soc - acc_buf, dt, veh).max(0.0))
}

/// Battery power when the two buffers overlap or bracket the current SOC
pub fn acc_regen_dischg_kw(
    acc_buf: f64,
    regen_buf: f64,
    soc: f64,
    dt: f64,
    veh: &VehicleModelParameters,
    acc_chg_kw: f64,
    regen_dischg_kw: f64,
) -> f64 {
    if regen_buf < acc_buf {
        soc_delta_kw(soc - 0.5 * (regen_buf + acc_buf), dt, veh)
    } else if soc > regen_buf {
        regen_dischg_kw
    } else if soc < acc_buf {
        -acc_chg_kw
    } else {
        0.0
    }
}

/// Battery power that would move the converter toward its peak-efficiency
/// output for the pre-transmission demand `x_kw`, scaled by the configured
/// charge and discharge efforts
pub fn desired_ess_kw_for_fc_eff(
    fc: &FuelConverterModel,
    mt: &MotorModel,
    x_kw: f64,
    veh: &VehicleModelParameters,
) -> f64 {
    let kw_x = x_kw - fc.power_at_max_eff_kw();
    let cc = &veh.charge_control;
    if kw_x > 0.0 {
        cc.ess_dischg_to_fc_max_eff_perc * mt.input_power_kw(kw_x)
    } else if kw_x < 0.0 {
        -cc.ess_chg_to_fc_max_eff_perc * mt.output_power_kw(-kw_x)
    } else {
        0.0
    }
}

/// Battery power target from the buffer ordering, then the charge need,
/// then the discharge allowance, then the efficiency term alone
pub fn target_ess_kw(
    acc_buf: f64,
    regen_buf: f64,
    acc_regen_dischg_kw: f64,
    acc_chg_kw: f64,
    acc_dischg_kw: f64,
    desired_for_fc_eff_kw: f64,
    max_regen_chg_kw: f64,
) -> f64 {
    if acc_buf > regen_buf {
        acc_regen_dischg_kw
    } else if acc_chg_kw > 0.0 {
        (-max_regen_chg_kw).max(desired_for_fc_eff_kw.min(-acc_chg_kw))
    } else if desired_for_fc_eff_kw > 0.0 {
        desired_for_fc_eff_kw.min(acc_dischg_kw)
    } else {
        desired_for_fc_eff_kw.max(-max_regen_chg_kw)
    }
}
