//! Equivalent fuel economy for charge-sustaining hybrids.
//!
//! A hybrid rarely ends a trip at the SOC it started with, so its raw fuel
//! use depends on the starting SOC.  The trip is repeated from evenly spaced
//! starting SOCs and fuel use is regressed on net battery energy; the
//! intercept is the fuel the trip would take with zero net battery use.

use super::*;
use rayon::prelude::*;

/// Fewest starting SOCs tried in one regression
pub const MIN_FIT_RUNS: usize = 5;
/// Most starting SOCs tried before falling back to a single run
pub const MAX_FIT_RUNS: usize = 20;
const FIT_TOL: f64 = 1e-6;
/// Starting relative SOC of the fallback run
const FALLBACK_REL_SOC: f64 = 0.5;

/// Least-squares intercept of fuel use (`y`) on battery energy (`x`) for
/// `(x, y)` pairs.  `None` when the points are degenerate or the intercept is
/// not positive.
pub fn fit_zero_battery_fuel(points: &[(f64, f64)]) -> Option<f64> {
    let n = points.len() as f64;
    let (sum_x, sum_y, sum_x2, sum_xy) = points.iter().fold(
        (0.0, 0.0, 0.0, 0.0),
        |(sx, sy, sx2, sxy), (x, y)| (sx + x, sy + y, sx2 + x * x, sxy + x * y),
    );
    let delta = n * sum_x2 - sum_x * sum_x;
    if delta < FIT_TOL {
        return None;
    }
    let fuel0 = (sum_y * sum_x2 - sum_x * sum_xy) / delta;
    (fuel0 >= FIT_TOL).then_some(fuel0)
}

/// One trip of a SOC sweep, with its own copy of the vehicle and policy
#[derive(Debug, Clone)]
struct SweepRun {
    runner: TripRunner,
    manager: HybridPowerManager,
    rel_soc: f64,
    summary: TripSummary,
}

impl TripRunner {
    /// Summary of `trip` at zero net battery use.  Fuel use is the regression
    /// intercept and battery use is zero; everything else comes from the run
    /// with the highest starting SOC.  When no regression of 5 to 20 runs
    /// succeeds, the trip is run once from a half-full battery instead.
    pub fn run_equivalent(
        &mut self,
        trip: &Trip,
        manager: &mut HybridPowerManager,
    ) -> anyhow::Result<TripSummary> {
        ensure!(
            self.state.pt_type() == PowertrainType::Hybrid,
            "equivalent fuel economy applies to charge-sustaining hybrids only, got {:?}",
            self.state.pt_type()
        );
        trip.init_checks().with_context(|| format_dbg!(trip.name))?;

        for n_runs in MIN_FIT_RUNS..=MAX_FIT_RUNS {
            let mut runs = self.soc_sweep(trip, manager, n_runs)?;
            let points: Vec<(f64, f64)> = runs
                .iter()
                .map(|run| (run.summary.battery_kwh, run.summary.fuel_use))
                .collect();
            match fit_zero_battery_fuel(&points) {
                Some(fuel0) => {
                    let last = runs.pop().with_context(|| format_dbg!(n_runs))?;
                    self.state = last.runner.state;
                    *manager = last.manager;
                    let mut summary = last.summary;
                    summary.fuel_use = fuel0;
                    summary.battery_kwh = 0.0;
                    return Ok(summary);
                }
                None => {
                    #[cfg(feature = "logging")]
                    log::debug!(
                        "trip {:?}: regression over {} starting SOCs is degenerate",
                        trip.name,
                        n_runs
                    );
                }
            }
        }

        #[cfg(feature = "logging")]
        log::warn!(
            "trip {:?}: no equivalent fuel fit found, reporting a single run from relative SOC {}",
            trip.name,
            FALLBACK_REL_SOC
        );
        self.run_direct(trip, manager, Some(FALLBACK_REL_SOC))
    }

    /// Runs `trip` from relative SOCs `(i + 0.5) / n_runs` in parallel
    fn soc_sweep(
        &self,
        trip: &Trip,
        manager: &HybridPowerManager,
        n_runs: usize,
    ) -> anyhow::Result<Vec<SweepRun>> {
        let mut runs: Vec<SweepRun> = (0..n_runs)
            .map(|i| SweepRun {
                runner: self.clone(),
                manager: manager.clone(),
                rel_soc: (i as f64 + 0.5) / n_runs as f64,
                summary: TripSummary::default(),
            })
            .collect();
        runs.par_iter_mut().enumerate().try_for_each(|(i, run)| {
            run.runner
                .run_direct(trip, &mut run.manager, Some(run.rel_soc))
                .map(|summary| run.summary = summary)
                .with_context(|| format!("sweep run idx: {}, rel SOC: {}", i, run.rel_soc))
        })?;
        Ok(runs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::CurveCalibration;
    use crate::vehicle::VehicleModelParameters;

    #[test]
    fn test_fit_recovers_intercept() {
        // fuel = 0.2 - 0.05 * kWh
        let points: Vec<(f64, f64)> = [-1.0, -0.5, 0.0, 0.5, 1.0]
            .iter()
            .map(|x| (*x, 0.2 - 0.05 * x))
            .collect();
        let fuel0 = fit_zero_battery_fuel(&points).unwrap();
        assert!(fuel0.approx_eq(&0.2, 1e-9));
    }

    #[test]
    fn test_fit_below_mean_when_fuel_rises_with_battery_use() {
        // fuel = 0.1 + 0.05 * kWh, every run drawing on the battery
        let points: Vec<(f64, f64)> = [0.2, 0.4, 0.6, 0.8, 1.0]
            .iter()
            .map(|x| (*x, 0.1 + 0.05 * x))
            .collect();
        let mean_fuel = points.iter().map(|(_, y)| y).sum::<f64>() / points.len() as f64;
        let fuel0 = fit_zero_battery_fuel(&points).unwrap();
        assert!(fuel0 > 0.0 && fuel0 < mean_fuel, "{fuel0} vs mean {mean_fuel}");
        assert!(fuel0.approx_eq(&0.1, 1e-9));
    }

    #[test]
    fn test_fit_rejects_degenerate_points() {
        // identical battery use for every run
        assert_eq!(fit_zero_battery_fuel(&[(0.1, 0.2); 5]), None);
        // intercept at or below zero
        assert_eq!(
            fit_zero_battery_fuel(&[(0.0, 0.0), (1.0, 1.0), (2.0, 2.0)]),
            None
        );
        assert_eq!(fit_zero_battery_fuel(&[]), None);
    }

    #[test]
    fn test_only_hybrids_use_the_fit() {
        let state = VehicleState::new(
            &VehicleModelParameters::mock_phev(),
            &CurveCalibration::default(),
        )
        .unwrap();
        let trip = Trip::from_speed_trace(&[0.0, 10.0, 20.0]).unwrap();
        assert!(TripRunner::new(state)
            .run_equivalent(&trip, &mut HybridPowerManager::default())
            .is_err());
    }

    #[test]
    fn test_stationary_hybrid_summary() {
        let state = VehicleState::new(
            &VehicleModelParameters::mock_hev(),
            &CurveCalibration::default(),
        )
        .unwrap();
        let mut runner = TripRunner::new(state);
        let trip = Trip::from_speed_trace(&[0.0; 4]).unwrap();
        let summary = runner
            .run(&trip, &mut HybridPowerManager::default())
            .unwrap();
        assert_eq!(summary.miles, 0.0);
        assert_eq!(summary.seconds, 3.0);
        assert_eq!(summary.idle_secs, 3.0);
        assert!(summary.fuel_use >= 0.0);
    }
}
