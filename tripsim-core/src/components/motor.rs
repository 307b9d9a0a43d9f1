use super::EfficiencyCurve;
use crate::imports::*;
use crate::vehicle::MotorParams;

/// Electric motor performance on a uniform output power grid, invertible so
/// regenerative braking can map mechanical input to electrical output
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct MotorModel {
    pub max_kw: f64,
    pub delta_kw: f64,
    pub kw_out: Vec<f64>,
    pub kw_in: Vec<f64>,
    pub max_kw_in: f64,
    /// lowest efficiency on the adjusted curve, never above peak efficiency
    pub min_eff: f64,
    pub power_at_max_eff_kw: f64,
}

impl MotorModel {
    /// Builds the performance grid.  Without a custom `curve`, the large-motor
    /// baseline is shifted to the rated peak efficiency and blended with the
    /// small-motor baseline according to rated power.  A custom curve is only
    /// shifted.
    pub fn new(params: &MotorParams, curve: Option<&EfficiencyCurve>) -> anyhow::Result<Self> {
        let max_kw = params.max_kw;
        let peak_eff = params.peak_eff;

        let (fracs, effs): (Vec<f64>, Vec<f64>) = match curve {
            Some(curve) => {
                curve.check().with_context(|| format_dbg!())?;
                let adj = peak_eff - curve.peak_eff();
                (
                    curve.frac_pwr_out.clone(),
                    curve.eff.iter().map(|e| e + adj).collect(),
                )
            }
            None => {
                let adj = peak_eff - arrmax(&LARGE_BASELINE_EFF);
                let zeta = ((max_kw - SMALL_MOTOR_POWER_KW)
                    / (LARGE_MOTOR_POWER_KW - SMALL_MOTOR_POWER_KW))
                    .clamp(0.0, 1.0);
                (
                    MC_PERC_OUT_ARRAY.to_vec(),
                    LARGE_BASELINE_EFF
                        .iter()
                        .zip(SMALL_BASELINE_EFF.iter())
                        .map(|(large, small)| zeta * (large + adj) + (1.0 - zeta) * small)
                        .collect(),
                )
            }
        };
        let min_eff = effs.iter().copied().fold(peak_eff, f64::min);

        let mut xs = vec![0.0];
        let mut ys = vec![0.0];
        let mut best_eff = 0.0;
        let mut power_at_max_eff_kw = 0.0;
        for (frac, eff) in fracs.iter().zip(&effs).skip(1) {
            let kw_out = frac * max_kw;
            xs.push(kw_out);
            ys.push(if *eff > 0.0 { kw_out / eff } else { 0.0 });
            if *eff > best_eff {
                best_eff = *eff;
                power_at_max_eff_kw = kw_out;
            }
        }

        let delta_kw = max_kw / PERF_GRID_INTERVALS as f64;
        let kw_out = (0..=PERF_GRID_INTERVALS)
            .map(|i| i as f64 * delta_kw)
            .collect::<Vec<f64>>();
        let kw_in = kw_out
            .iter()
            .enumerate()
            .map(|(i, out)| {
                if i == 0 {
                    0.0
                } else {
                    interp_saturating(*out, &xs, &ys)
                }
            })
            .collect::<Vec<f64>>();
        ensure!(
            is_sorted(&kw_in),
            "motor efficiency curve yields input power that decreases with output power"
        );
        let max_kw_in = kw_in.iter().copied().fold(0.0, f64::max);

        Ok(Self {
            max_kw,
            delta_kw,
            kw_out,
            kw_in,
            max_kw_in,
            min_eff,
            power_at_max_eff_kw,
        })
    }

    /// Electrical input power for mechanical output `kw_out`
    pub fn input_power_kw(&self, kw_out: f64) -> f64 {
        if kw_out <= 0.0 {
            0.0
        } else if kw_out >= self.max_kw {
            self.max_kw_in
        } else {
            interp_saturating(kw_out, &self.kw_out, &self.kw_in)
        }
    }

    /// Output power for input `kw_in`; the inverse of
    /// [`input_power_kw`](MotorModel::input_power_kw)
    pub fn output_power_kw(&self, kw_in: f64) -> f64 {
        if kw_in <= 0.0 {
            0.0
        } else if kw_in >= self.max_kw_in {
            self.max_kw
        } else {
            interp_saturating(kw_in, &self.kw_in, &self.kw_out)
        }
    }

    pub fn max_output_kw(&self) -> f64 {
        self.max_kw
    }

    pub fn power_at_max_eff_kw(&self) -> f64 {
        self.power_at_max_eff_kw
    }
}
