//! Module containing the mutable vehicle state and the per-step state
//! transition for each powertrain.
//!
//! A step takes the elapsed trip time and the desired speed, grade, auxiliary
//! load, and payload for the new sample.  The achievable speed is searched
//! downward from the slip-limited target until the powertrain can supply the
//! required power, and the resulting power split updates energy use and SOC.

use crate::components::{
    CurveCalibration, FuelConverterLoadHistogram, FuelConverterModel, MotorModel,
};
use crate::imports::*;
use crate::power_manager::HybridPowerManager;
use crate::vehicle::{PowertrainType, VehicleModelParameters};

mod bev;
mod conv;
mod hev;

#[cfg(test)]
mod tests;

/// Calibration adjustments applied on top of the vehicle model parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ApproxEq)]
pub struct ThreeParamTuning {
    /// mass added to every road load term
    pub add_mass_kg: f64,
    /// auxiliary load added to every step
    pub add_aux_kw: f64,
    /// multiplier on wheel power terms
    pub drive_energy_mult: f64,
}

impl Default for ThreeParamTuning {
    fn default() -> Self {
        Self {
            add_mass_kg: 0.0,
            add_aux_kw: 0.0,
            drive_energy_mult: 1.0,
        }
    }
}

impl SerdeAPI for ThreeParamTuning {}

/// Trip time and fuel converter on/off timers.  A negative on-timer means the
/// converter is off; a negative off-timer means it is on.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ApproxEq)]
pub struct TimeInfo {
    pub sec_since_trip_start: f64,
    pub delta_sec: f64,
    pub sec_fc_on: f64,
    pub sec_fc_off: f64,
}

impl Default for TimeInfo {
    fn default() -> Self {
        Self {
            sec_since_trip_start: 0.0,
            delta_sec: 0.0,
            sec_fc_on: -1.0,
            sec_fc_off: 0.0,
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct MotionInfo {
    pub prev_mps: f64,
    pub ach_mps: f64,
    pub ach_mph: f64,
    pub desired_mph: f64,
    /// desired minus achieved speed
    pub slip_mph: f64,
    pub grade: f64,
    pub payload_kg: f64,
    pub step_m: f64,
    pub miles_since_start: f64,
}

/// Battery state of charge.  Relative SOC is measured across the usable
/// swing, absolute SOC across total capacity.  Neither is clamped per step.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct SocInfo {
    pub rel_soc: f64,
    pub abs_soc: f64,
}

/// Energy drawn from the battery and fuel store.  Fuel is in the accounting
/// unit of the fuel converter type.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct EnergyUse {
    pub batt_kwh_step: f64,
    pub batt_kwh_since_start: f64,
    pub fuel_step: f64,
    pub fuel_since_start: f64,
    pub histogram: FuelConverterLoadHistogram,
}

/// Instantaneous power breakdown for the most recent step [kW]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct InstPower {
    pub fc_kw_out: f64,
    pub fc_kw_in: f64,
    pub fc_eff: f64,
    pub mt_kw_out: f64,
    pub mt_kw_in: f64,
    pub mt_eff: f64,
    /// battery output, positive when discharging
    pub ess_kw: f64,
    pub regen_kw: f64,
    pub fric_brake_kw: f64,
    pub aux_kw: f64,
    pub drag_kw: f64,
    pub accel_kw: f64,
    pub ascent_kw: f64,
    pub rr_kw: f64,
}

impl InstPower {
    /// net power demanded at the wheels
    pub fn wheel_kw(&self) -> f64 {
        self.drag_kw + self.accel_kw + self.ascent_kw + self.rr_kw
    }
}

/// Road load terms for one candidate speed
#[derive(Debug, Clone, Copy, Default)]
pub(crate) struct RoadLoads {
    pub drag_kw: f64,
    pub accel_kw: f64,
    pub ascent_kw: f64,
    pub rr_kw: f64,
}

impl RoadLoads {
    pub fn wheel_kw(&self) -> f64 {
        self.drag_kw + self.accel_kw + self.ascent_kw + self.rr_kw
    }
}

/// Per-step quantities shared by every powertrain step
#[derive(Debug, Clone, Copy)]
pub(crate) struct StepInputs {
    pub dt: f64,
    pub payload_kg: f64,
    pub total_aux_kw: f64,
    pub ess_eff: f64,
}

/// Full state of a vehicle during a trip.  Owns its copy of the model
/// parameters and the component models built from them.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VehicleState {
    pub params: VehicleModelParameters,
    pub consts: SimConstants,
    pub tuning: ThreeParamTuning,
    pub fc: FuelConverterModel,
    pub mt: MotorModel,
    pub time: TimeInfo,
    pub motion: MotionInfo,
    pub soc: SocInfo,
    pub energy: EnergyUse,
    pub power: InstPower,
}

impl VehicleState {
    /// Validates `params` and builds the component models, using any custom
    /// curves in `calibration`.  The state starts at rest with a full battery.
    pub fn new(
        params: &VehicleModelParameters,
        calibration: &CurveCalibration,
    ) -> anyhow::Result<Self> {
        let mut params = params.clone();
        params.set_derived().with_context(|| format_dbg!())?;
        let fc = FuelConverterModel::new(&params.fuel_converter, calibration.fuel_converter.as_ref())
            .with_context(|| format_dbg!())?;
        let mt = MotorModel::new(&params.motor, calibration.motor.as_ref())
            .with_context(|| format_dbg!())?;
        let energy = EnergyUse {
            histogram: FuelConverterLoadHistogram::new(params.fuel_converter.max_kw),
            ..Default::default()
        };
        let mut state = Self {
            params,
            consts: SimConstants::default(),
            tuning: ThreeParamTuning::default(),
            fc,
            mt,
            time: Default::default(),
            motion: Default::default(),
            soc: Default::default(),
            energy,
            power: Default::default(),
        };
        state.reset_all();
        Ok(state)
    }

    pub fn with_tuning(mut self, tuning: ThreeParamTuning) -> Self {
        self.tuning = tuning;
        self
    }

    pub fn with_constants(mut self, consts: SimConstants) -> Self {
        self.consts = consts;
        self
    }

    pub fn pt_type(&self) -> PowertrainType {
        self.params.general.pt_type
    }

    /// Resets everything, including SOC, to the start of a trip
    pub fn reset_all(&mut self) {
        self.reset_all_but_soc();
        self.reset_soc();
    }

    /// Resets time, motion, energy use, and power to the start of a trip while
    /// keeping the battery state of charge
    pub fn reset_all_but_soc(&mut self) {
        self.time = TimeInfo::default();
        self.motion = MotionInfo::default();
        self.energy.batt_kwh_step = 0.0;
        self.energy.batt_kwh_since_start = 0.0;
        self.energy.fuel_step = 0.0;
        self.energy.fuel_since_start = 0.0;
        self.energy.histogram.reset();
        self.power = InstPower::default();
    }

    /// Full battery for electrified powertrains, zero otherwise
    pub fn reset_soc(&mut self) {
        self.soc = if self.pt_type().is_electrified() {
            SocInfo {
                rel_soc: 1.0,
                abs_soc: self.params.charge_control.max_soc,
            }
        } else {
            SocInfo::default()
        };
    }

    /// Sets relative SOC and the matching absolute SOC.  Values outside
    /// [0, 1] are clamped.
    pub fn set_rel_soc(&mut self, rel_soc: f64) -> anyhow::Result<()> {
        ensure!(
            self.pt_type().is_electrified(),
            "{:?} has no battery to set SOC on",
            self.pt_type()
        );
        ensure!(rel_soc.is_finite(), "relative SOC must be finite, got {}", rel_soc);
        let clamped = rel_soc.clamp(0.0, 1.0);
        if clamped != rel_soc {
            #[cfg(feature = "logging")]
            log::warn!("relative SOC {} clamped to {}", rel_soc, clamped);
        }
        let cc = &self.params.charge_control;
        self.soc.rel_soc = clamped;
        self.soc.abs_soc = cc.min_soc + (cc.max_soc - cc.min_soc) * clamped;
        Ok(())
    }

    pub fn is_fc_on(&self) -> bool {
        self.time.sec_fc_on >= 0.0
    }

    pub(crate) fn turn_fc_on(&mut self) {
        if self.time.sec_fc_on > 0.0 {
            return;
        }
        self.time.sec_fc_on = 0.0;
        self.time.sec_fc_off = -1.0;
        self.power.fc_kw_out = 0.0;
    }

    pub(crate) fn turn_fc_off(&mut self) {
        if self.time.sec_fc_on < 0.0 {
            return;
        }
        self.time.sec_fc_on = -1.0;
        self.time.sec_fc_off = 0.0;
        self.power.fc_kw_out = 0.0;
        self.power.fc_kw_in = 0.0;
        self.power.fc_eff = 0.0;
    }

    /// Advances the state to `elapsed_s` seconds since trip start.
    ///
    /// # Arguments
    /// * `elapsed_s` - trip time at the new sample, must exceed the current trip time
    /// * `desired_mph` - speed the driver wants to reach by the end of the step
    /// * `grade` - road grade, rise over run
    /// * `aux_kw` - auxiliary load on top of the vehicle's base load
    /// * `payload_kg` - mass carried on top of the vehicle's total mass
    /// * `manager` - energy management policy, consulted by hybrids only
    pub fn step(
        &mut self,
        elapsed_s: f64,
        desired_mph: f64,
        grade: f64,
        aux_kw: f64,
        payload_kg: f64,
        manager: &mut HybridPowerManager,
    ) -> anyhow::Result<InstPower> {
        let dt = elapsed_s - self.time.sec_since_trip_start;
        ensure!(
            dt > 0.0,
            "time step must be positive, got {} s at trip time {} s",
            dt,
            elapsed_s
        );
        ensure!(
            desired_mph.is_finite() && desired_mph >= 0.0,
            "desired speed must be finite and non-negative, got {}",
            desired_mph
        );
        ensure!(
            grade.is_finite() && aux_kw.is_finite() && payload_kg.is_finite(),
            "grade, aux load, and payload must be finite"
        );

        let inputs = StepInputs {
            dt,
            payload_kg,
            total_aux_kw: self.tuning.add_aux_kw + self.params.transmission.aux_kw + aux_kw,
            ess_eff: self.params.battery.round_trip_eff.sqrt(),
        };

        self.time.sec_since_trip_start = elapsed_s;
        self.time.delta_sec = dt;
        self.motion.prev_mps = self.motion.ach_mps;
        self.motion.grade = grade;
        self.motion.desired_mph = desired_mph;
        self.motion.payload_kg = payload_kg;
        self.energy.batt_kwh_step = 0.0;
        self.energy.fuel_step = 0.0;
        self.power.fric_brake_kw = 0.0;
        self.power.regen_kw = 0.0;

        match self.pt_type() {
            PowertrainType::Conventional => self.step_conventional(&inputs),
            PowertrainType::BatteryElectric => self.step_bev(&inputs),
            PowertrainType::Hybrid | PowertrainType::PlugInHybrid => {
                self.step_hev(&inputs, manager)
            }
        }
        .with_context(|| format_dbg!(self.time.sec_since_trip_start))?;

        Ok(self.power.clone())
    }

    /// Desired speed bounded by the tire-slip acceleration and deceleration
    /// limits [m/s]
    pub(crate) fn target_speed_mps(&self, dt: f64) -> f64 {
        let prev = self.motion.prev_mps;
        let max_accel = self.params.max_accel_mps2(&self.consts);
        let max_decel = self.params.max_decel_mps2(&self.consts);
        (self.motion.desired_mph / MPH_PER_MPS).clamp(prev - dt * max_decel, prev + dt * max_accel)
    }

    /// Wheel power terms for accelerating from the previous speed to `ach_mps`
    pub(crate) fn road_loads(&self, ach_mps: f64, inputs: &StepInputs) -> RoadLoads {
        let v0 = self.motion.prev_mps;
        let v = ach_mps;
        let dt = inputs.dt;
        let avg_mps = 0.5 * (v0 + v);
        let mass_kg = self.params.mass.total_kg + self.tuning.add_mass_kg + inputs.payload_kg;
        let g = self.consts.a_grav_mps2;
        let r = self.params.wheels.radius_m;
        let mult = self.tuning.drive_energy_mult;

        let drag_kw = self.params.dyno_coeff_c(&self.consts) * avg_mps.powi(3) / 1e3;
        let accel_kw = 0.5 * self.params.mass.all_wheels_kgm2 * ((v / r).powi(2) - (v0 / r).powi(2))
            / (dt * 1e3)
            + 0.5 * mass_kg * (v.powi(2) - v0.powi(2)) / (dt * 1e3);
        let ascent_kw = mass_kg * g * self.motion.grade.atan().sin() * avg_mps / 1e3;
        let rr_kw = g * mass_kg * self.params.wheels.rr_coef * avg_mps / 1e3;

        RoadLoads {
            drag_kw: drag_kw * mult,
            accel_kw: accel_kw * mult,
            ascent_kw: ascent_kw * mult,
            rr_kw: rr_kw * mult,
        }
    }

    /// Searches downward from the slip-limited target for the highest speed
    /// whose powertrain demand, as computed by `required_kw` from wheel power,
    /// fits under `cap_kw`.  Returns the achieved speed and its road loads.
    pub(crate) fn search_speed<F>(
        &self,
        inputs: &StepInputs,
        cap_kw: f64,
        required_kw: F,
    ) -> (f64, RoadLoads)
    where
        F: Fn(f64) -> f64,
    {
        let mut ach_mps = self.target_speed_mps(inputs.dt);
        let mut loads = self.road_loads(ach_mps, inputs);
        while required_kw(loads.wheel_kw()) > cap_kw {
            ach_mps -= SPEED_SEARCH_STEP_MPS;
            if ach_mps < 0.0 {
                ach_mps = 0.0;
                break;
            }
            loads = self.road_loads(ach_mps, inputs);
        }
        if ach_mps < ZERO_SPEED_TOL_MPS {
            ach_mps = 0.0;
            loads = self.road_loads(ach_mps, inputs);
            loads.drag_kw = 0.0;
        }
        (ach_mps, loads)
    }

    /// Books the achieved speed, distance, and road loads for the step
    pub(crate) fn record_motion(&mut self, ach_mps: f64, loads: &RoadLoads, inputs: &StepInputs) {
        let prev_mps = self.motion.prev_mps;
        self.motion.ach_mps = ach_mps;
        self.motion.ach_mph = ach_mps * MPH_PER_MPS;
        self.motion.slip_mph = self.motion.desired_mph - self.motion.ach_mph;
        self.motion.step_m = 0.5 * (prev_mps + ach_mps) * inputs.dt;
        self.motion.miles_since_start += self.motion.step_m / M_PER_MI;

        self.power.drag_kw = loads.drag_kw;
        self.power.accel_kw = loads.accel_kw;
        self.power.ascent_kw = loads.ascent_kw;
        self.power.rr_kw = loads.rr_kw;
        self.power.aux_kw = inputs.total_aux_kw;
    }

    /// [`search_speed`](Self::search_speed) followed by
    /// [`record_motion`](Self::record_motion)
    pub(crate) fn solve_achieved_speed<F>(
        &mut self,
        inputs: &StepInputs,
        cap_kw: f64,
        required_kw: F,
    ) -> RoadLoads
    where
        F: Fn(f64) -> f64,
    {
        let (ach_mps, loads) = self.search_speed(inputs, cap_kw, required_kw);
        self.record_motion(ach_mps, &loads, inputs);
        loads
    }

    /// Fraction of braking power recoverable at the current speed; saturates
    /// smoothly toward zero at low speed
    pub(crate) fn regen_fraction(&self) -> f64 {
        let avg_mph = 0.5 * (self.motion.prev_mps * MPH_PER_MPS + self.motion.ach_mph);
        self.params.transmission.max_regen / (1.0 + 500.0 * (-0.99 * (1.0 + avg_mph)).exp())
    }

    /// Battery charge power that would bring absolute SOC to max SOC within
    /// the step, limited by rated battery power [kW]
    pub(crate) fn max_ess_charge_kw(&self, inputs: &StepInputs) -> f64 {
        let batt = &self.params.battery;
        (1.0 / inputs.ess_eff)
            * batt.max_kw.min(
                (self.params.charge_control.max_soc - self.soc.abs_soc) * batt.max_kwh
                    * SEC_PER_HR
                    / inputs.dt,
            )
    }

    /// Shared braking split for electrified powertrains: returns the
    /// mechanical power routed to the motor and books friction braking
    pub(crate) fn split_braking(&mut self, braking_kw: f64, inputs: &StepInputs) -> f64 {
        let trans_eff = self.params.transmission.trans_eff;
        let max_mech_regen_kw = self
            .mt
            .input_power_kw(self.max_ess_charge_kw(inputs).min(self.params.motor.max_kw));
        let mech_regen_kw = (self.regen_fraction() * braking_kw * trans_eff).min(max_mech_regen_kw);
        self.power.fric_brake_kw = braking_kw - mech_regen_kw / trans_eff;
        mech_regen_kw
    }

    /// Integrates battery power over the step into energy use and SOC
    pub(crate) fn update_soc(&mut self, ess_kw: f64, dt: f64) {
        let batt_kwh = ess_kw * dt / SEC_PER_HR;
        self.power.ess_kw = ess_kw;
        self.energy.batt_kwh_step = batt_kwh;
        self.energy.batt_kwh_since_start += batt_kwh;
        let capacity_kwh = self.params.battery.max_kwh;
        let swing_kwh = self.params.swing_kwh();
        if capacity_kwh > 0.0 {
            self.soc.abs_soc -= batt_kwh / capacity_kwh;
        }
        if swing_kwh > 0.0 {
            self.soc.rel_soc -= batt_kwh / swing_kwh;
        }
    }

    /// Books fuel for converter input power over the step
    pub(crate) fn burn_fuel(&mut self, fc_kw_in: f64, dt: f64) {
        let kwh_per_unit = self
            .params
            .fuel_converter
            .fc_type
            .kwh_per_fuel_unit(&self.consts);
        let fuel = fc_kw_in * dt / (SEC_PER_HR * kwh_per_unit);
        self.energy.fuel_step = fuel;
        self.energy.fuel_since_start += fuel;
    }

    pub(crate) fn set_motor_power(&mut self, kw_out: f64, kw_in: f64) {
        self.power.mt_kw_out = kw_out;
        self.power.mt_kw_in = kw_in;
        self.power.mt_eff = if kw_in > 0.0 { kw_out / kw_in } else { 0.0 };
    }

    pub(crate) fn set_fc_power(&mut self, kw_out: f64, kw_in: f64) {
        self.power.fc_kw_out = kw_out;
        self.power.fc_kw_in = kw_in;
        self.power.fc_eff = if kw_in > 0.0 { kw_out / kw_in } else { 0.0 };
    }
}

impl SerdeAPI for VehicleState {}

/// Power available after ramping from `current_kw` toward `max_kw` over `dt`
/// at the component's rate of `max_kw / secs_to_peak` per second
pub(crate) fn ramped_limit_kw(max_kw: f64, current_kw: f64, dt: f64, secs_to_peak: f64) -> f64 {
    if secs_to_peak > 0.0 {
        max_kw.min(current_kw + dt * max_kw / secs_to_peak)
    } else {
        max_kw
    }
}
