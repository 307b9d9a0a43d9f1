use crate::components::FuelConverterLoadHistogram;
use crate::imports::*;
use crate::vehicle::{PowertrainType, VehicleModelParameters};

/// Compact result of one trip
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct TripSummary {
    pub miles: f64,
    /// fuel used, in the accounting unit of the fuel converter type
    pub fuel_use: f64,
    /// net battery energy drawn [kWh]
    pub battery_kwh: f64,
    pub max_slip_mph: f64,
    pub final_rel_soc: f64,
    pub seconds: f64,
    pub idle_secs: f64,
    pub fc_on_secs: f64,
    pub fc_starts: u32,
    pub histogram: FuelConverterLoadHistogram,
}

impl SerdeAPI for TripSummary {}

impl TripSummary {
    /// Miles per fuel unit
    pub fn mpg(&self) -> Option<f64> {
        (self.fuel_use > 0.0 && self.miles > 0.0).then(|| self.miles / self.fuel_use)
    }

    /// Fuel units per mile
    pub fn fuel_per_mile(&self) -> Option<f64> {
        (self.fuel_use > 0.0 && self.miles > 0.0).then(|| self.fuel_use / self.miles)
    }

    pub fn litres_per_100km(&self) -> Option<f64> {
        self.mpg().map(litres_per_100km)
    }

    pub fn kwh_per_mile(&self) -> Option<f64> {
        (self.miles > 0.0).then(|| self.battery_kwh / self.miles)
    }

    pub fn idle_fraction(&self) -> Option<f64> {
        (self.seconds > 0.0).then(|| self.idle_secs / self.seconds)
    }

    pub fn fc_on_fraction(&self) -> Option<f64> {
        (self.seconds > 0.0).then(|| self.fc_on_secs / self.seconds)
    }

    /// CO2-equivalent emitted over the trip [g].  Battery-electric vehicles
    /// count grid electricity only, conventional vehicles and hybrids count
    /// fuel only, and plug-in hybrids count both.  Negative net use counts as
    /// zero.
    pub fn g_co2_eq(&self, params: &VehicleModelParameters, factors: &EmissionFactors) -> f64 {
        let fuel_g = self.fuel_use.max(0.0)
            * params
                .fuel_converter
                .fc_type
                .g_co2_per_fuel_unit(factors);
        let elec_g = self.battery_kwh.max(0.0) * factors.elec_g_per_kwh;
        match params.pt_type() {
            PowertrainType::BatteryElectric => elec_g,
            PowertrainType::Conventional | PowertrainType::Hybrid => fuel_g,
            PowertrainType::PlugInHybrid => fuel_g + elec_g,
        }
    }

    pub fn g_co2_eq_per_mile(
        &self,
        params: &VehicleModelParameters,
        factors: &EmissionFactors,
    ) -> Option<f64> {
        (self.miles > 0.0).then(|| self.g_co2_eq(params, factors) / self.miles)
    }

    /// Summary together with every derived value
    pub fn metrics(&self, params: &VehicleModelParameters, factors: &EmissionFactors) -> TripMetrics {
        TripMetrics {
            summary: self.clone(),
            fuel_unit: params.fuel_converter.fc_type.fuel_unit().to_string(),
            mpg: self.mpg(),
            fuel_per_mile: self.fuel_per_mile(),
            litres_per_100km: self.litres_per_100km(),
            kwh_per_mile: self.kwh_per_mile(),
            idle_fraction: self.idle_fraction(),
            fc_on_fraction: self.fc_on_fraction(),
            g_co2_eq: self.g_co2_eq(params, factors),
            g_co2_eq_per_mile: self.g_co2_eq_per_mile(params, factors),
        }
    }
}

/// [`TripSummary`] with its derived values, as reported to users
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TripMetrics {
    #[serde(flatten)]
    pub summary: TripSummary,
    pub fuel_unit: String,
    pub mpg: Option<f64>,
    pub fuel_per_mile: Option<f64>,
    pub litres_per_100km: Option<f64>,
    pub kwh_per_mile: Option<f64>,
    pub idle_fraction: Option<f64>,
    pub fc_on_fraction: Option<f64>,
    pub g_co2_eq: f64,
    pub g_co2_eq_per_mile: Option<f64>,
}

impl SerdeAPI for TripMetrics {}
