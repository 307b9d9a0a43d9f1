use super::*;

impl VehicleState {
    /// Conventional step.  The fuel converter is always on and carries the
    /// auxiliary load; braking power goes entirely to friction brakes.
    pub(super) fn step_conventional(&mut self, inputs: &StepInputs) -> anyhow::Result<()> {
        let dt = inputs.dt;
        self.turn_fc_on();
        self.time.sec_fc_on += dt;

        let max_fc_kw = ramped_limit_kw(
            self.params.fuel_converter.max_kw,
            self.power.fc_kw_out,
            dt,
            self.params.fuel_converter.secs_to_peak_pwr,
        );
        let trans_eff = self.params.transmission.trans_eff;
        let aux_kw = inputs.total_aux_kw;
        let loads =
            self.solve_achieved_speed(inputs, max_fc_kw, |wheel_kw| aux_kw + wheel_kw / trans_eff);

        let wheel_kw = loads.wheel_kw();
        let fc_kw_out = if wheel_kw < 0.0 {
            self.power.fric_brake_kw = -wheel_kw;
            aux_kw
        } else {
            aux_kw + wheel_kw / trans_eff
        };
        let fc_kw_in = self.fc.input_power_kw(fc_kw_out);
        self.set_fc_power(fc_kw_out, fc_kw_in);
        self.set_motor_power(0.0, 0.0);
        self.power.ess_kw = 0.0;
        self.burn_fuel(fc_kw_in, dt);
        self.energy.histogram.add_operating_time(dt, fc_kw_out);
        Ok(())
    }
}
