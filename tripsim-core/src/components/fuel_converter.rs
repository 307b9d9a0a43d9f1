use super::EfficiencyCurve;
use crate::imports::*;
use crate::vehicle::FuelConverterParams;

/// Engine or fuel cell performance: a uniform output power grid with the
/// input (fuel) power needed for each grid point
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct FuelConverterModel {
    pub max_kw: f64,
    /// grid spacing [kW]
    pub delta_kw: f64,
    /// input power at each of the grid points `i * delta_kw`
    pub kw_in: Vec<f64>,
    pub power_at_max_eff_kw: f64,
    pub max_eff: f64,
}

impl FuelConverterModel {
    /// Builds the performance grid from the rated power and either the custom
    /// `curve` or the default curve for the converter type.
    pub fn new(params: &FuelConverterParams, curve: Option<&EfficiencyCurve>) -> anyhow::Result<Self> {
        let curve = match curve {
            Some(curve) => {
                curve.check().with_context(|| format_dbg!())?;
                curve
            }
            None => EfficiencyCurve::default_fuel_converter(params.fc_type),
        };
        let max_kw = params.max_kw;
        let delta_kw = max_kw / PERF_GRID_INTERVALS as f64;

        let mut xs = vec![0.0];
        let mut ys = vec![0.0];
        let mut max_eff = 0.0;
        let mut power_at_max_eff_kw = 0.0;
        for (frac, eff) in curve.frac_pwr_out.iter().zip(&curve.eff).skip(1) {
            let kw_out = frac * max_kw;
            xs.push(kw_out);
            ys.push(if *eff > 0.0 { kw_out / eff } else { 0.0 });
            if *eff > max_eff {
                max_eff = *eff;
                power_at_max_eff_kw = kw_out;
            }
        }

        let kw_in = (0..=PERF_GRID_INTERVALS)
            .map(|i| {
                if i == 0 {
                    0.0
                } else {
                    interp_saturating(i as f64 * delta_kw, &xs, &ys)
                }
            })
            .collect::<Vec<f64>>();

        Ok(Self {
            max_kw,
            delta_kw,
            kw_in,
            power_at_max_eff_kw,
            max_eff,
        })
    }

    /// Input (fuel) power required to deliver `kw_out`.  Outputs beyond the
    /// grid saturate at the end values.
    pub fn input_power_kw(&self, kw_out: f64) -> f64 {
        if self.delta_kw <= 0.0 || self.kw_in.is_empty() {
            return 0.0;
        }
        let cell = (kw_out / self.delta_kw).floor();
        if cell < 0.0 {
            return self.kw_in[0];
        }
        let cell = cell as usize;
        if cell >= PERF_GRID_INTERVALS {
            return self.kw_in[PERF_GRID_INTERVALS];
        }
        let frac = (kw_out - cell as f64 * self.delta_kw) / self.delta_kw;
        self.kw_in[cell] + frac * (self.kw_in[cell + 1] - self.kw_in[cell])
    }

    pub fn max_output_kw(&self) -> f64 {
        self.max_kw
    }

    pub fn power_at_max_eff_kw(&self) -> f64 {
        self.power_at_max_eff_kw
    }
}
