//! Module containing the vehicle model parameters: the immutable description
//! of a vehicle's body, powertrain components, and charge control settings.

use crate::imports::*;
use crate::traits::impl_approx_eq_for_strict_eq_types;

mod mass;
pub use mass::MassProperties;


/// Powertrain architecture
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum PowertrainType {
    #[default]
    #[serde(alias = "Conv", alias = "CV")]
    Conventional,
    #[serde(alias = "HEV")]
    Hybrid,
    #[serde(alias = "PHEV")]
    PlugInHybrid,
    #[serde(alias = "BEV", alias = "EV")]
    BatteryElectric,
}

impl PowertrainType {
    /// true for every powertrain that carries a traction battery
    pub fn is_electrified(&self) -> bool {
        !matches!(self, Self::Conventional)
    }

    /// true for every powertrain that carries a fuel converter
    pub fn has_fuel_converter(&self) -> bool {
        !matches!(self, Self::BatteryElectric)
    }
}

/// How the fuel converter and motor are coupled in a hybrid
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum HybridDriveType {
    Serial,
    ParallelNoAccelAssist,
    #[default]
    ParallelWithAccelAssist,
}

/// Fuel converter technology; selects the default efficiency curve and the
/// fuel accounting unit
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FuelConverterType {
    #[default]
    #[serde(alias = "SI")]
    SparkIgnition,
    Atkinson,
    Diesel,
    FuelCell,
    HybridDiesel,
    #[serde(alias = "CNG")]
    Cng,
}

impl FuelConverterType {
    /// Energy content of one fuel accounting unit [kWh/unit]
    pub fn kwh_per_fuel_unit(&self, consts: &SimConstants) -> f64 {
        match self {
            Self::FuelCell => consts.h2_kwh_per_kg,
            Self::Diesel | Self::HybridDiesel => consts.diesel_kwh_per_gal,
            Self::Cng => consts.cng_kwh_per_m3,
            Self::SparkIgnition | Self::Atkinson => consts.kwh_per_gge,
        }
    }

    /// CO2-equivalent emitted per fuel accounting unit [g/unit]
    pub fn g_co2_per_fuel_unit(&self, factors: &EmissionFactors) -> f64 {
        match self {
            Self::FuelCell => factors.h2_g_per_kg,
            Self::Diesel | Self::HybridDiesel => factors.diesel_g_per_gal,
            Self::Cng => factors.cng_g_per_m3,
            Self::SparkIgnition | Self::Atkinson => factors.gasoline_g_per_gal,
        }
    }

    /// Name of the fuel accounting unit
    pub fn fuel_unit(&self) -> &'static str {
        match self {
            Self::FuelCell => "kg H2",
            Self::Diesel | Self::HybridDiesel => "gal diesel",
            Self::Cng => "m^3 CNG",
            Self::SparkIgnition | Self::Atkinson => "GGE",
        }
    }
}

impl_approx_eq_for_strict_eq_types!(PowertrainType, HybridDriveType, FuelConverterType);

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq, Validate)]
pub struct GeneralParams {
    pub name: String,
    pub pt_type: PowertrainType,
    #[validate(range(min = 0))]
    pub drag_coef: f64,
    #[validate(range(min = 0))]
    pub frontal_area_m2: f64,
    #[validate(range(min = 0))]
    pub glider_kg: f64,
    #[validate(range(min = 0))]
    pub veh_cg_m: f64,
    #[validate(range(min = 0, max = 1))]
    pub drive_axle_weight_frac: f64,
    #[validate(range(min = 0))]
    pub wheel_base_m: f64,
    #[validate(range(min = 0))]
    pub cargo_kg: f64,
    #[serde(default)]
    pub hybrid_drive: HybridDriveType,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq, Validate)]
pub struct FuelStoreParams {
    #[validate(range(min = 0))]
    pub kwh: f64,
    #[validate(range(min = 0))]
    pub kwh_per_kg: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq, Validate)]
pub struct FuelConverterParams {
    #[validate(range(min = 0))]
    pub max_kw: f64,
    pub fc_type: FuelConverterType,
    #[validate(range(min = 0))]
    pub secs_to_peak_pwr: f64,
    #[validate(range(min = 0))]
    pub base_kg: f64,
    #[validate(range(min = 0))]
    pub kw_per_kg: f64,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq, Validate)]
pub struct MotorParams {
    #[validate(range(min = 0))]
    pub max_kw: f64,
    #[validate(range(min = 0, max = 1))]
    pub peak_eff: f64,
    #[validate(range(min = 0))]
    pub secs_to_peak_pwr: f64,
    #[validate(range(min = 0))]
    pub kg_per_kw: f64,
    #[validate(range(min = 0))]
    pub base_kg: f64,
}

/// Traction battery ("energy storage system") parameters
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq, Validate)]
pub struct BatteryParams {
    #[validate(range(min = 0))]
    pub max_kw: f64,
    #[validate(range(min = 0))]
    pub max_kwh: f64,
    #[validate(range(min = 0))]
    pub kg_per_kwh: f64,
    #[validate(range(min = 0))]
    pub base_kg: f64,
    #[validate(range(min = 0, max = 1))]
    pub round_trip_eff: f64,
    #[serde(default)]
    pub life_coef_a: f64,
    #[serde(default)]
    pub life_coef_b: f64,
    /// if true, the battery power limit does not cap motor output
    #[serde(default)]
    pub override_max_kw: bool,
    /// index into the fuel converter curve library
    #[serde(default)]
    pub fc_curve_id: Option<usize>,
    /// index into the motor curve library
    #[serde(default)]
    pub mt_curve_id: Option<usize>,
}

impl BatteryParams {
    /// Decodes the legacy integer flag that packs the power override and the
    /// custom curve selections.  A positive code enables the override; a
    /// negative code `-(1000 * (mt + 1) + (fc + 1))` selects curves, where a
    /// resulting id below zero means no curve.
    pub fn apply_special_flag(&mut self, code: i32) {
        self.override_max_kw = code > 0;
        if code < 0 {
            let code = code.unsigned_abs();
            let fc_id = (code % 1000) as i64 - 1;
            let mt_id = (code / 1000) as i64 - 1;
            self.fc_curve_id = usize::try_from(fc_id).ok();
            self.mt_curve_id = usize::try_from(mt_id).ok();
        }
    }
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq, Validate)]
pub struct WheelParams {
    #[validate(range(min = 0))]
    pub inertia_kgm2: f64,
    pub num_wheels: u32,
    #[validate(range(min = 0))]
    pub rr_coef: f64,
    #[validate(range(min = 0))]
    pub radius_m: f64,
    #[validate(range(min = 0))]
    pub coef_of_fric: f64,
}

/// Battery state of charge management settings
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq, Validate)]
pub struct ChargeControlParams {
    #[validate(range(min = 0, max = 1))]
    pub min_soc: f64,
    #[validate(range(min = 0, max = 1))]
    pub max_soc: f64,
    /// effort to discharge the battery toward fuel converter peak efficiency
    #[validate(range(min = 0, max = 1))]
    pub ess_dischg_to_fc_max_eff_perc: f64,
    /// effort to charge the battery toward fuel converter peak efficiency
    #[validate(range(min = 0, max = 1))]
    pub ess_chg_to_fc_max_eff_perc: f64,
    /// speed at which the acceleration reserve reaches zero
    #[validate(range(min = 0))]
    pub mph_ess_acc_rsrv_zero: f64,
    /// fraction of usable swing reserved for acceleration at standstill
    #[validate(range(min = 0, max = 1))]
    pub frac_ess_acc_reserve: f64,
    #[serde(default)]
    pub perc_high_acc_buf: f64,
    /// speed above which the fuel converter is forced on
    #[validate(range(min = 0))]
    pub mph_fc_on: f64,
    /// battery power demand above which the fuel converter is forced on
    #[validate(range(min = 0))]
    pub kw_demand_fc_on: f64,
    #[serde(default)]
    pub force_aux_on_fc: bool,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq, Validate)]
pub struct TransmissionParams {
    #[validate(range(min = 0, max = 1))]
    pub alt_eff: f64,
    #[validate(range(min = 0, max = 1))]
    pub chg_eff: f64,
    #[validate(range(min = 0))]
    pub aux_kw: f64,
    #[validate(range(min = 0, max = 1))]
    pub max_regen: f64,
    #[validate(range(min = 0))]
    pub trans_kg: f64,
    #[validate(range(min = 0, max = 1))]
    pub trans_eff: f64,
}

/// Vehicle model parameters.  These never change during a simulation;
/// [`MassProperties`] is derived from the rest in
/// [`set_derived`](VehicleModelParameters::set_derived).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq, Validate)]
pub struct VehicleModelParameters {
    #[validate]
    pub general: GeneralParams,
    #[validate]
    pub fuel_store: FuelStoreParams,
    #[validate]
    pub fuel_converter: FuelConverterParams,
    #[validate]
    pub motor: MotorParams,
    #[validate]
    pub battery: BatteryParams,
    #[validate]
    pub wheels: WheelParams,
    #[validate]
    pub charge_control: ChargeControlParams,
    #[validate]
    pub transmission: TransmissionParams,
    #[validate(range(min = 0))]
    pub comp_mass_multiplier: f64,
    #[serde(skip)]
    pub mass: MassProperties,
}

impl SerdeAPI for VehicleModelParameters {
    fn init(&mut self) -> anyhow::Result<()> {
        self.set_derived()
    }
}

impl VehicleModelParameters {
    /// Validates every parameter record and computes derived mass properties
    pub fn set_derived(&mut self) -> anyhow::Result<()> {
        self.validate_all()?;
        self.mass = MassProperties::new(self);
        Ok(())
    }

    /// Range checks on each record followed by the cross-field checks a
    /// simulation depends on
    pub fn validate_all(&self) -> anyhow::Result<()> {
        match self.validate() {
            Ok(_) => (),
            Err(e) => bail!(e),
        };
        let pt = self.general.pt_type;
        let cc = &self.charge_control;
        ensure!(
            cc.min_soc <= cc.max_soc,
            "min_soc ({}) must not exceed max_soc ({})",
            cc.min_soc,
            cc.max_soc
        );
        ensure!(
            self.transmission.trans_eff > 0.0,
            "transmission efficiency must be positive"
        );
        ensure!(
            self.wheels.num_wheels > 0 && self.wheels.radius_m > 0.0,
            "vehicle needs wheels with a positive radius"
        );
        if pt.is_electrified() {
            ensure!(
                self.battery.max_kwh > 0.0,
                "{:?} requires a positive battery capacity",
                pt
            );
            ensure!(
                cc.max_soc > cc.min_soc,
                "{:?} requires a positive SOC swing, got min_soc {} and max_soc {}",
                pt,
                cc.min_soc,
                cc.max_soc
            );
            ensure!(
                self.battery.round_trip_eff > 0.0,
                "{:?} requires a positive battery round trip efficiency",
                pt
            );
            ensure!(
                self.motor.max_kw > 0.0 && self.motor.peak_eff > 0.0,
                "{:?} requires a motor with positive power and peak efficiency",
                pt
            );
        }
        if pt.has_fuel_converter() {
            ensure!(
                self.fuel_converter.max_kw > 0.0,
                "{:?} requires a fuel converter with positive power",
                pt
            );
        }
        Ok(())
    }

    pub fn pt_type(&self) -> PowertrainType {
        self.general.pt_type
    }

    pub fn is_plugin(&self) -> bool {
        self.general.pt_type == PowertrainType::PlugInHybrid
    }

    /// Usable battery energy between min and max SOC [kWh]
    pub fn swing_kwh(&self) -> f64 {
        if self.general.pt_type.is_electrified() {
            self.battery.max_kwh * (self.charge_control.max_soc - self.charge_control.min_soc)
        } else {
            0.0
        }
    }

    /// Tire-slip limited acceleration [m/s^2]
    pub fn max_accel_mps2(&self, consts: &SimConstants) -> f64 {
        let mu = self.wheels.coef_of_fric;
        let g = &self.general;
        let denom = if g.wheel_base_m > 0.0 {
            1.0 + g.veh_cg_m * mu / g.wheel_base_m
        } else {
            1.0
        };
        mu * g.drive_axle_weight_frac * consts.a_grav_mps2 / denom
    }

    /// Tire-slip limited deceleration [m/s^2]
    pub fn max_decel_mps2(&self, consts: &SimConstants) -> f64 {
        self.wheels.coef_of_fric * consts.a_grav_mps2
    }

    /// Constant road load coefficient [N]
    pub fn dyno_coeff_a(&self, consts: &SimConstants) -> f64 {
        self.mass.total_kg * consts.a_grav_mps2 * self.wheels.rr_coef
    }

    /// Quadratic road load coefficient [N/(m/s)^2]
    pub fn dyno_coeff_c(&self, consts: &SimConstants) -> f64 {
        0.5 * consts.air_density_kg_per_m3 * self.general.frontal_area_m2 * self.general.drag_coef
    }

    /// Changes the component mass multiplier while holding total vehicle mass
    /// constant; the difference is taken up by the glider.
    pub fn readjust_comp_mass(&mut self, comp_mass_multiplier: f64) -> anyhow::Result<()> {
        ensure!(
            comp_mass_multiplier >= 0.0,
            "component mass multiplier must be non-negative, got {}",
            comp_mass_multiplier
        );
        let old_total_kg = MassProperties::new(self).total_kg;
        self.comp_mass_multiplier = comp_mass_multiplier;
        let new_total_kg = MassProperties::new(self).total_kg;
        self.general.glider_kg += old_total_kg - new_total_kg;
        self.set_derived()
            .with_context(|| format_dbg!(self.general.glider_kg))
    }

    /// Template conventional vehicle, a mid-size gasoline sedan
    pub fn mock_conventional() -> Self {
        let mut veh = Self {
            general: GeneralParams {
                name: String::from("Mid-size gasoline sedan"),
                pt_type: PowertrainType::Conventional,
                drag_coef: 0.30,
                frontal_area_m2: 2.2,
                glider_kg: 950.0,
                veh_cg_m: 0.53,
                drive_axle_weight_frac: 0.61,
                wheel_base_m: 2.7,
                cargo_kg: 136.0,
                hybrid_drive: HybridDriveType::ParallelWithAccelAssist,
            },
            fuel_store: FuelStoreParams {
                kwh: 400.0,
                kwh_per_kg: 9.89,
            },
            fuel_converter: FuelConverterParams {
                max_kw: 120.0,
                fc_type: FuelConverterType::SparkIgnition,
                secs_to_peak_pwr: 6.0,
                base_kg: 61.0,
                kw_per_kg: 2.13,
            },
            motor: MotorParams {
                max_kw: 0.0,
                peak_eff: 0.95,
                secs_to_peak_pwr: 4.0,
                kg_per_kw: 0.833,
                base_kg: 21.6,
            },
            battery: BatteryParams {
                max_kw: 0.0,
                max_kwh: 0.0,
                kg_per_kwh: 8.0,
                base_kg: 75.0,
                round_trip_eff: 0.97,
                life_coef_a: 110.0,
                life_coef_b: -0.6811,
                override_max_kw: false,
                fc_curve_id: None,
                mt_curve_id: None,
            },
            wheels: WheelParams {
                inertia_kgm2: 0.815,
                num_wheels: 4,
                rr_coef: 0.007,
                radius_m: 0.336,
                coef_of_fric: 0.7,
            },
            charge_control: ChargeControlParams {
                min_soc: 0.4,
                max_soc: 0.8,
                ess_dischg_to_fc_max_eff_perc: 0.0,
                ess_chg_to_fc_max_eff_perc: 0.0,
                mph_ess_acc_rsrv_zero: 60.0,
                frac_ess_acc_reserve: 0.2,
                perc_high_acc_buf: 0.0,
                mph_fc_on: 30.0,
                kw_demand_fc_on: 100.0,
                force_aux_on_fc: false,
            },
            transmission: TransmissionParams {
                alt_eff: 1.0,
                chg_eff: 0.86,
                aux_kw: 0.7,
                max_regen: 0.98,
                trans_kg: 114.0,
                trans_eff: 0.92,
            },
            comp_mass_multiplier: 1.4,
            mass: MassProperties::default(),
        };
        veh.mass = MassProperties::new(&veh);
        veh
    }

    /// Template charge-sustaining parallel hybrid
    pub fn mock_hev() -> Self {
        let mut veh = Self::mock_conventional();
        veh.general.name = String::from("Mid-size parallel hybrid sedan");
        veh.general.pt_type = PowertrainType::Hybrid;
        veh.general.hybrid_drive = HybridDriveType::ParallelWithAccelAssist;
        veh.fuel_converter.max_kw = 72.0;
        veh.fuel_converter.fc_type = FuelConverterType::Atkinson;
        veh.motor.max_kw = 50.0;
        veh.battery.max_kw = 45.0;
        veh.battery.max_kwh = 1.6;
        veh.charge_control.min_soc = 0.4;
        veh.charge_control.max_soc = 0.8;
        veh.charge_control.mph_fc_on = 55.0;
        veh.charge_control.kw_demand_fc_on = 100.0;
        veh.mass = MassProperties::new(&veh);
        veh
    }

    /// Template plug-in hybrid with a charge-depleting range of roughly 30 mi
    pub fn mock_phev() -> Self {
        let mut veh = Self::mock_hev();
        veh.general.name = String::from("Mid-size plug-in hybrid sedan");
        veh.general.pt_type = PowertrainType::PlugInHybrid;
        veh.motor.max_kw = 80.0;
        veh.battery.max_kw = 80.0;
        veh.battery.max_kwh = 12.0;
        veh.charge_control.min_soc = 0.15;
        veh.charge_control.max_soc = 0.95;
        veh.charge_control.mph_fc_on = 85.0;
        veh.charge_control.kw_demand_fc_on = 120.0;
        veh.mass = MassProperties::new(&veh);
        veh
    }

    /// Template battery electric vehicle
    pub fn mock_bev() -> Self {
        let mut veh = Self::mock_conventional();
        veh.general.name = String::from("Mid-size battery electric sedan");
        veh.general.pt_type = PowertrainType::BatteryElectric;
        veh.fuel_converter.max_kw = 0.0;
        veh.fuel_store.kwh = 0.0;
        veh.motor.max_kw = 110.0;
        veh.battery.max_kw = 120.0;
        veh.battery.max_kwh = 60.0;
        veh.charge_control.min_soc = 0.05;
        veh.charge_control.max_soc = 0.95;
        veh.mass = MassProperties::new(&veh);
        veh
    }
}
