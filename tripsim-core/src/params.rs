//! Module containing tripsim parameters.

use crate::imports::*;

/// Unit conversions that should NEVER change
pub const MPH_PER_MPS: f64 = 2.2369;
pub const M_PER_MI: f64 = 1609.00;
pub const L_PER_GAL: f64 = 3.78541;
pub const SEC_PER_HR: f64 = 3600.0;
pub const J_PER_KWH: f64 = 3.6e6;

/// Speed search decrement [m/s]
pub const SPEED_SEARCH_STEP_MPS: f64 = 0.01;
/// Achieved speeds below this are treated as a stop [m/s]
pub const ZERO_SPEED_TOL_MPS: f64 = 0.001;
/// Drive power magnitude below which the vehicle is coasting [kW]
pub const DRIVE_POWER_TOL_KW: f64 = 1e-5;
/// Fuel converter output below which it is considered off [kW]
pub const FC_POWER_TOL_KW: f64 = 1e-6;
/// Desired speed below which a step counts as idling [mph]
pub const IDLE_SPEED_TOL_MPH: f64 = 0.001;

/// Number of intervals in the resampled component performance grid
pub const PERF_GRID_INTERVALS: usize = 100;
/// Number of bins in the fuel converter load histogram
pub const HISTOGRAM_BINS: usize = 20;

pub const SMALL_MOTOR_POWER_KW: f64 = 7.5;
pub const LARGE_MOTOR_POWER_KW: f64 = 75.0;

/// Fractions of rated power at which default motor efficiencies are given
pub const MC_PERC_OUT_ARRAY: [f64; 11] = [
    0.00, 0.02, 0.04, 0.06, 0.08, 0.10, 0.20, 0.40, 0.60, 0.80, 1.00,
];

pub const LARGE_BASELINE_EFF: [f64; 11] = [
    0.83, 0.85, 0.87, 0.89, 0.90, 0.91, 0.93, 0.94, 0.94, 0.93, 0.92,
];

pub const SMALL_BASELINE_EFF: [f64; 11] = [
    0.12, 0.16, 0.21, 0.29, 0.35, 0.42, 0.75, 0.92, 0.93, 0.93, 0.92,
];

/// Fractions of rated power at which default fuel converter efficiencies are given
pub const FC_PERC_OUT_ARRAY: [f64; 12] = [
    0.00, 0.005, 0.015, 0.04, 0.06, 0.10, 0.14, 0.20, 0.40, 0.60, 0.80, 1.00,
];

pub const SI_EFF: [f64; 12] = [
    0.00, 0.12, 0.16, 0.22, 0.28, 0.33, 0.35, 0.36, 0.35, 0.34, 0.32, 0.30,
];

pub const ATKINSON_EFF: [f64; 12] = [
    0.00, 0.12, 0.28, 0.35, 0.38, 0.39, 0.40, 0.40, 0.38, 0.37, 0.36, 0.35,
];

pub const DIESEL_EFF: [f64; 12] = [
    0.00, 0.14, 0.20, 0.26, 0.32, 0.39, 0.41, 0.42, 0.41, 0.38, 0.36, 0.34,
];

pub const FUEL_CELL_EFF: [f64; 12] = [
    0.00, 0.20, 0.28, 0.38, 0.45, 0.52, 0.55, 0.57, 0.56, 0.54, 0.52, 0.49,
];

/// Physical constants and fuel energy densities used throughout a simulation
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ApproxEq)]
pub struct SimConstants {
    /// sea level air density at approximately 20C
    pub air_density_kg_per_m3: f64,
    pub a_grav_mps2: f64,
    pub h2_kwh_per_kg: f64,
    /// kWh per gallon of gasoline equivalent
    pub kwh_per_gge: f64,
    pub diesel_kwh_per_gal: f64,
    pub cng_kwh_per_m3: f64,
    pub gasoline_kwh_per_kg: f64,
    pub diesel_kwh_per_kg: f64,
    pub ref_temp_deg_c: f64,
    pub ref_pressure_bar: f64,
}

impl Default for SimConstants {
    fn default() -> Self {
        Self {
            air_density_kg_per_m3: 1.2,
            a_grav_mps2: 9.81,
            h2_kwh_per_kg: 32.72,
            kwh_per_gge: 33.7,
            diesel_kwh_per_gal: 37.9527,
            cng_kwh_per_m3: 10.395,
            gasoline_kwh_per_kg: 13.1,
            diesel_kwh_per_kg: 12.61,
            ref_temp_deg_c: 20.0,
            ref_pressure_bar: 1.0098,
        }
    }
}

impl SerdeAPI for SimConstants {}

/// CO2-equivalent emission factors for each energy carrier
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, ApproxEq)]
pub struct EmissionFactors {
    pub gasoline_g_per_gal: f64,
    pub diesel_g_per_gal: f64,
    pub h2_g_per_kg: f64,
    pub cng_g_per_m3: f64,
    /// grid electricity
    pub elec_g_per_kwh: f64,
}

impl Default for EmissionFactors {
    fn default() -> Self {
        Self {
            gasoline_g_per_gal: 10_778.0,
            diesel_g_per_gal: 11_981.0,
            h2_g_per_kg: 8_500.0,
            cng_g_per_m3: 2_486.0,
            elec_g_per_kwh: 310.0,
        }
    }
}

impl SerdeAPI for EmissionFactors {}

/// Converts fuel economy in miles per gallon to litres per 100 km
pub fn litres_per_100km(mpg: f64) -> f64 {
    (1.0 / mpg) * L_PER_GAL * 100_000.0 / M_PER_MI
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_litres_per_100km() {
        // 30 mpg is roughly 7.84 L/100km
        assert!(litres_per_100km(30.0).approx_eq(&7.842, 1e-3));
    }

    #[test]
    fn test_sim_constants_yaml_defaults() {
        let consts = SimConstants::from_yaml(SimConstants::default().to_yaml().unwrap()).unwrap();
        assert_eq!(consts, SimConstants::default());
        assert_eq!(consts.kwh_per_gge, 33.7);
    }
}
