use super::buffers::*;
use super::*;
use crate::vehicle::FuelConverterType;

/// Operating point handed to the decision ladder
#[derive(Debug, Clone, Copy)]
pub(super) struct Demand {
    pub mph: f64,
    pub wheel_kw: f64,
    pub fc_mod: f64,
    pub ess_eff: f64,
    pub total_aux_kw: f64,
}

/// Rule-based converter policy for hybrids.  The converter output is picked
/// by the first of six ordered conditions that holds.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct DefaultPowerManager {
    /// minimum time the converter stays on once started [s]
    #[serde(default = "DefaultPowerManager::default_hold_sec")]
    pub engine_on_stays_on_sec: f64,
    #[serde(skip)]
    pub last_decision: Option<DecisionCondition>,
}

impl Default for DefaultPowerManager {
    fn default() -> Self {
        Self {
            engine_on_stays_on_sec: Self::default_hold_sec(),
            last_decision: None,
        }
    }
}

impl SerdeAPI for DefaultPowerManager {
    fn init(&mut self) -> anyhow::Result<()> {
        ensure!(
            self.engine_on_stays_on_sec >= 0.0,
            "{}\nconverter hold time must be non-negative",
            format_dbg!(self.engine_on_stays_on_sec)
        );
        Ok(())
    }
}

impl DefaultPowerManager {
    fn default_hold_sec() -> f64 {
        4.0
    }

    pub fn decide(
        &mut self,
        state: &VehicleState,
        mph: f64,
        wheel_kw: f64,
        fc_mod: f64,
        ess_eff: f64,
        total_aux_kw: f64,
    ) -> f64 {
        let demand = Demand {
            mph,
            wheel_kw,
            fc_mod,
            ess_eff,
            total_aux_kw,
        };
        let (fc_kw_out, condition) =
            self.ladder(state, &demand, state.params.charge_control.min_soc);
        self.last_decision = Some(condition);
        fc_kw_out
    }

    /// Converter output for `demand`, with `min_soc` as the floor the SOC
    /// buffers are built on
    pub(super) fn ladder(
        &self,
        state: &VehicleState,
        demand: &Demand,
        min_soc: f64,
    ) -> (f64, DecisionCondition) {
        let veh = &state.params;
        let dt = state.time.delta_sec;
        let max_soc = veh.charge_control.max_soc;
        let batt = &veh.battery;
        let mph = demand.mph;
        let aux_kw = demand.total_aux_kw;

        let max_motor_kw = ramped_limit_kw(
            veh.motor.max_kw,
            state.power.mt_kw_out.max(0.0),
            dt,
            veh.motor.secs_to_peak_pwr,
        );
        let max_fc_kw = demand.fc_mod
            * ramped_limit_kw(
                veh.fuel_converter.max_kw,
                state.power.fc_kw_out,
                dt,
                veh.fuel_converter.secs_to_peak_pwr,
            );
        let fc_kw_at_max_eff = demand.fc_mod * state.fc.power_at_max_eff_kw();

        // demand ahead of the transmission
        let trans_eff = veh.transmission.trans_eff;
        let x_kw = if demand.wheel_kw > 0.0 {
            demand.wheel_kw / trans_eff
        } else {
            demand.wheel_kw * trans_eff
        };

        let soc = state.soc.abs_soc;
        let acc_buf = acc_soc_buffer(min_soc, max_soc, mph, veh);
        if soc < acc_buf {
            let regen_buf = regen_soc_buffer(min_soc, max_soc, mph, veh);
            let max_regen_chg_kw = max_regen_buffer_chg_kw(regen_buf, soc, dt, veh);
            let regen_dischg_kw = regen_buffer_dischg_kw(regen_buf, soc, dt, veh);
            let acc_chg_kw = acc_buffer_chg_kw(acc_buf, soc, dt, veh);
            let acc_dischg_kw = acc_buffer_dischg_kw(acc_buf, soc, dt, veh);
            let acc_regen_kw = (-batt.max_kw).max(acc_regen_dischg_kw(
                acc_buf,
                regen_buf,
                soc,
                dt,
                veh,
                acc_chg_kw,
                regen_dischg_kw,
            ));
            let for_fc_eff_kw = desired_ess_kw_for_fc_eff(&state.fc, &state.mt, x_kw, veh);
            let target_kw = (-batt.max_kw).max(target_ess_kw(
                acc_buf,
                regen_buf,
                acc_regen_kw,
                acc_chg_kw,
                acc_dischg_kw,
                for_fc_eff_kw,
                max_regen_chg_kw,
            ));
            let motor_mech_in_kw = state
                .mt
                .input_power_kw(-target_kw + aux_kw)
                .min(veh.motor.max_kw);
            return (
                max_fc_kw.min(x_kw.max(0.0) + motor_mech_in_kw),
                DecisionCondition::LowSocRecovery,
            );
        }

        if x_kw > max_motor_kw {
            return (
                max_fc_kw.min((x_kw - max_motor_kw).max(fc_kw_at_max_eff)),
                DecisionCondition::PowerAssist,
            );
        }

        let motor_in_kw = if x_kw > 0.0 {
            state.mt.input_power_kw(x_kw)
        } else {
            0.0
        };
        let batt_draw_kw = (motor_in_kw + aux_kw) / demand.ess_eff;
        if !batt.override_max_kw && batt_draw_kw > batt.max_kw {
            let assist_kw = match veh.fuel_converter.fc_type {
                FuelConverterType::FuelCell => batt_draw_kw - batt.max_kw,
                _ => {
                    x_kw - max_motor_kw.min(state.mt.output_power_kw(batt.max_kw - aux_kw))
                }
            };
            return (
                max_fc_kw.min(assist_kw.max(fc_kw_at_max_eff)),
                DecisionCondition::BatteryLimit,
            );
        }

        if state.is_fc_on() && state.time.sec_fc_on < self.engine_on_stays_on_sec {
            return (
                max_fc_kw.min(fc_kw_at_max_eff),
                DecisionCondition::MinimumOnTime,
            );
        }

        let cc = &veh.charge_control;
        if (mph > cc.mph_fc_on || batt_draw_kw > cc.kw_demand_fc_on)
            && soc < regen_soc_buffer(min_soc, max_soc, mph, veh)
        {
            return (
                max_fc_kw.min(fc_kw_at_max_eff),
                DecisionCondition::HighDemandOrSpeed,
            );
        }

        (0.0, DecisionCondition::Off)
    }
}
