use super::VehicleModelParameters;
use crate::imports::*;

/// Component and total masses derived from [`VehicleModelParameters`]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct MassProperties {
    /// rotational inertia of all wheels combined
    pub all_wheels_kgm2: f64,
    pub glider_kg: f64,
    pub cargo_kg: f64,
    pub fuel_store_kg: f64,
    pub fuel_converter_kg: f64,
    pub motor_kg: f64,
    pub battery_kg: f64,
    pub transmission_kg: f64,
    pub total_kg: f64,
    /// motor power to total mass ratio, zero for conventional vehicles
    pub motor_kw_per_total_kg: f64,
}

impl MassProperties {
    pub fn new(veh: &VehicleModelParameters) -> Self {
        let mult = veh.comp_mass_multiplier;
        let pt = veh.general.pt_type;

        let (fuel_store_kg, fuel_converter_kg) = if pt.has_fuel_converter() {
            let fs = if veh.fuel_store.kwh_per_kg > 0.0 {
                mult * veh.fuel_store.kwh / veh.fuel_store.kwh_per_kg
            } else {
                0.0
            };
            let fc = if veh.fuel_converter.kw_per_kg > 0.0 {
                mult * (veh.fuel_converter.base_kg
                    + veh.fuel_converter.max_kw / veh.fuel_converter.kw_per_kg)
            } else {
                mult * veh.fuel_converter.base_kg
            };
            (fs, fc)
        } else {
            (0.0, 0.0)
        };

        let (motor_kg, battery_kg) = if pt.is_electrified() {
            (
                mult * (veh.motor.base_kg + veh.motor.kg_per_kw * veh.motor.max_kw),
                mult * (veh.battery.base_kg + veh.battery.kg_per_kwh * veh.battery.max_kwh),
            )
        } else {
            (0.0, 0.0)
        };

        let transmission_kg = mult * veh.transmission.trans_kg;
        let total_kg = veh.general.glider_kg
            + veh.general.cargo_kg
            + transmission_kg
            + fuel_store_kg
            + fuel_converter_kg
            + motor_kg
            + battery_kg;

        let motor_kw_per_total_kg = if pt.is_electrified() && total_kg > 0.0 {
            veh.motor.max_kw / total_kg
        } else {
            0.0
        };

        Self {
            all_wheels_kgm2: veh.wheels.num_wheels as f64 * veh.wheels.inertia_kgm2,
            glider_kg: veh.general.glider_kg,
            cargo_kg: veh.general.cargo_kg,
            fuel_store_kg,
            fuel_converter_kg,
            motor_kg,
            battery_kg,
            transmission_kg,
            total_kg,
            motor_kw_per_total_kg,
        }
    }
}
