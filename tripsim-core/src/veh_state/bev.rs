use super::*;

impl VehicleState {
    /// Battery-electric step.  The converter never runs; the motor is limited
    /// by its ramp rate and, unless overridden, by rated battery power net of
    /// the auxiliary load.
    pub(super) fn step_bev(&mut self, inputs: &StepInputs) -> anyhow::Result<()> {
        let dt = inputs.dt;
        let ess_eff = inputs.ess_eff;
        let aux_kw = inputs.total_aux_kw;
        let trans_eff = self.params.transmission.trans_eff;
        self.time.sec_fc_off += dt;

        let mut max_motor_kw = ramped_limit_kw(
            self.params.motor.max_kw,
            self.power.mt_kw_out.max(0.0),
            dt,
            self.params.motor.secs_to_peak_pwr,
        );
        if !self.params.battery.override_max_kw {
            max_motor_kw = max_motor_kw
                .min(self.mt.output_power_kw(self.params.battery.max_kw * ess_eff - aux_kw));
        }

        let loads = self.solve_achieved_speed(inputs, max_motor_kw, |wheel_kw| wheel_kw / trans_eff);
        let wheel_kw = loads.wheel_kw();

        let ess_kw = if wheel_kw > 0.0 {
            let mt_kw_out = wheel_kw / trans_eff;
            let mt_kw_in = self.mt.input_power_kw(mt_kw_out);
            // motor efficiency is recorded as out/in regardless of direction
            self.set_motor_power(mt_kw_out, mt_kw_in);
            (mt_kw_in + aux_kw) / ess_eff
        } else if wheel_kw < -DRIVE_POWER_TOL_KW {
            let mech_regen_kw = self.split_braking(-wheel_kw, inputs);
            let regen_kw = self.mt.output_power_kw(mech_regen_kw);
            self.set_motor_power(regen_kw, mech_regen_kw);
            self.power.regen_kw = regen_kw;
            -(regen_kw - aux_kw) * ess_eff
        } else {
            self.set_motor_power(0.0, 0.0);
            aux_kw / ess_eff
        };

        self.set_fc_power(0.0, 0.0);
        self.update_soc(ess_kw, dt);
        self.energy.histogram.add_idle_time(dt);
        Ok(())
    }
}
