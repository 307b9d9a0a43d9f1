use super::*;
use crate::vehicle::{FuelConverterType, HybridDriveType};

/// Trip fuel use above which the vehicle is no longer in pure charge depletion
const FUEL_USED_TOL: f64 = 1e-6;
/// Converter power modifier handed to the power manager
const FC_MOD: f64 = 1.0;

impl VehicleState {
    /// Maximum power deliverable ahead of the transmission, which depends on
    /// the converter type and hybrid architecture
    fn hybrid_drive_cap_kw(&self, inputs: &StepInputs) -> f64 {
        let dt = inputs.dt;
        let ess_eff = inputs.ess_eff;
        let aux_draw_kw = inputs.total_aux_kw / ess_eff;
        let batt = &self.params.battery;
        let mut max_motor_kw = ramped_limit_kw(
            self.params.motor.max_kw,
            self.power.mt_kw_out.max(0.0),
            dt,
            self.params.motor.secs_to_peak_pwr,
        );
        let max_fc_kw = FC_MOD
            * ramped_limit_kw(
                self.params.fuel_converter.max_kw,
                self.power.fc_kw_out,
                dt,
                self.params.fuel_converter.secs_to_peak_pwr,
            );
        let max_from_ess_kw = batt.max_kw * ess_eff;
        let fuel_used = self.energy.fuel_since_start > FUEL_USED_TOL;

        match (
            self.params.fuel_converter.fc_type,
            self.params.general.hybrid_drive,
        ) {
            (FuelConverterType::FuelCell, drive) => {
                // the fuel cell feeds the motor electrically
                let fc_assist_kw = if drive == HybridDriveType::ParallelWithAccelAssist || fuel_used {
                    max_fc_kw
                } else {
                    0.0
                };
                max_motor_kw = max_motor_kw
                    .min(self.mt.output_power_kw(max_from_ess_kw + fc_assist_kw - aux_draw_kw));
                max_motor_kw
            }
            (_, HybridDriveType::ParallelWithAccelAssist) => {
                if !batt.override_max_kw {
                    max_motor_kw =
                        max_motor_kw.min(self.mt.output_power_kw(max_from_ess_kw - aux_draw_kw));
                }
                max_motor_kw + max_fc_kw
            }
            (_, HybridDriveType::ParallelNoAccelAssist) => {
                if !batt.override_max_kw {
                    max_motor_kw =
                        max_motor_kw.min(self.mt.output_power_kw(max_from_ess_kw - aux_draw_kw));
                }
                if fuel_used {
                    max_motor_kw + max_fc_kw
                } else {
                    max_motor_kw
                }
            }
            (_, HybridDriveType::Serial) => {
                if !batt.override_max_kw {
                    let fc_assist_kw = if fuel_used { max_fc_kw } else { 0.0 };
                    max_motor_kw = max_motor_kw
                        .min(self.mt.output_power_kw(max_from_ess_kw + fc_assist_kw - aux_draw_kw));
                }
                max_motor_kw
            }
        }
    }

    /// Hybrid and plug-in hybrid step.  The power manager picks the converter
    /// output; the motor and battery cover the remainder.
    pub(super) fn step_hev(
        &mut self,
        inputs: &StepInputs,
        manager: &mut HybridPowerManager,
    ) -> anyhow::Result<()> {
        let dt = inputs.dt;
        let ess_eff = inputs.ess_eff;
        let aux_kw = inputs.total_aux_kw;
        let trans_eff = self.params.transmission.trans_eff;
        let is_fuel_cell = self.params.fuel_converter.fc_type == FuelConverterType::FuelCell;

        if self.is_fc_on() {
            self.time.sec_fc_on += dt;
        } else {
            self.time.sec_fc_off += dt;
        }

        let cap_kw = self.hybrid_drive_cap_kw(inputs);
        let (ach_mps, loads) = self.search_speed(inputs, cap_kw, |wheel_kw| wheel_kw / trans_eff);
        let wheel_kw = loads.wheel_kw();

        // the manager sees distance as of the previous step
        let fc_kw_out = manager.decide(
            &*self,
            ach_mps * MPH_PER_MPS,
            wheel_kw,
            FC_MOD,
            ess_eff,
            aux_kw,
        );
        let fc_on = fc_kw_out > FC_POWER_TOL_KW;
        if fc_on {
            self.turn_fc_on();
        } else {
            self.turn_fc_off();
        }
        self.record_motion(ach_mps, &loads, inputs);

        let (mt_kw_out, mt_kw_in, ess_kw) = if wheel_kw > 0.0 {
            let drive_kw = wheel_kw / trans_eff;
            if is_fuel_cell {
                let mt_kw_in = self.mt.input_power_kw(drive_kw);
                // positive surplus charges the battery
                let surplus_kw = fc_kw_out - (mt_kw_in + aux_kw);
                let ess_kw = if surplus_kw > 0.0 {
                    -surplus_kw * ess_eff
                } else {
                    -surplus_kw / ess_eff
                };
                (drive_kw, mt_kw_in, ess_kw)
            } else {
                let surplus_kw = fc_kw_out - drive_kw;
                if surplus_kw > 0.0 {
                    // motor runs as a generator
                    let max_gen_in_kw = self.mt.input_power_kw(
                        self.max_ess_charge_kw(inputs).min(self.params.motor.max_kw),
                    );
                    let mt_kw_in = surplus_kw.min(max_gen_in_kw);
                    let mt_kw_out = self.mt.output_power_kw(mt_kw_in);
                    let ess_kw = if mt_kw_out * ess_eff > aux_kw {
                        -mt_kw_out * ess_eff + aux_kw
                    } else {
                        ((aux_kw - mt_kw_out) / ess_eff).max(0.0)
                    };
                    (mt_kw_out, mt_kw_in, ess_kw)
                } else {
                    let mt_kw_out = -surplus_kw;
                    let mt_kw_in = self.mt.input_power_kw(mt_kw_out);
                    (mt_kw_out, mt_kw_in, (mt_kw_in + aux_kw) / ess_eff)
                }
            }
        } else if wheel_kw < -DRIVE_POWER_TOL_KW {
            let mech_regen_kw = self.split_braking(-wheel_kw, inputs);
            if is_fuel_cell {
                let mt_kw_out = self.mt.output_power_kw(mech_regen_kw);
                self.power.regen_kw = mt_kw_out;
                (
                    mt_kw_out,
                    mech_regen_kw,
                    -(mt_kw_out + fc_kw_out - aux_kw) * ess_eff,
                )
            } else {
                // converter output is routed through the generator too
                let mt_kw_in = mech_regen_kw + fc_kw_out;
                let mt_kw_out = self.mt.output_power_kw(mt_kw_in);
                self.power.regen_kw = if mt_kw_in > 0.0 {
                    mt_kw_out * mech_regen_kw / mt_kw_in
                } else {
                    0.0
                };
                (mt_kw_out, mt_kw_in, -(mt_kw_out - aux_kw) * ess_eff)
            }
        } else if fc_on {
            if is_fuel_cell {
                (0.0, 0.0, -(fc_kw_out - aux_kw) * ess_eff)
            } else {
                let mt_kw_out = self.mt.output_power_kw(fc_kw_out);
                (mt_kw_out, fc_kw_out, -(mt_kw_out - aux_kw) * ess_eff)
            }
        } else {
            (0.0, 0.0, aux_kw / ess_eff)
        };

        self.set_motor_power(mt_kw_out, mt_kw_in);
        self.update_soc(ess_kw, dt);

        if fc_on {
            let fc_kw_in = self.fc.input_power_kw(fc_kw_out / FC_MOD);
            self.set_fc_power(fc_kw_out, fc_kw_in);
            self.burn_fuel(fc_kw_in, dt);
            self.energy.histogram.add_operating_time(dt, fc_kw_out);
        } else {
            self.set_fc_power(0.0, 0.0);
            self.energy.histogram.add_idle_time(dt);
        }
        Ok(())
    }
}
