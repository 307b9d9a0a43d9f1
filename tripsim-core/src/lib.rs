#![allow(clippy::field_reassign_with_default)]

//! Crate containing models for second-by-second simulation of vehicle
//! powertrain energy use over a trip.
//!
//! A trip is a sampled desired-speed trace with grade, auxiliary load, and
//! payload.  For each sample the [`veh_state::VehicleState`] is stepped
//! forward: the achievable speed is found, motive power is split between the
//! fuel converter, motor, battery, and friction brakes, and fuel and battery
//! energy are accumulated.  Hybrids consult a
//! [`power_manager::HybridPowerManager`] for the fuel converter output.
//!
//! # Features:
//! - logging: emit diagnostics through the `log` facade (default)
//! - bincode: enable binary (de)serialization of model objects

#[macro_use]
pub mod macros;

pub mod components;
pub mod imports;
pub mod params;
pub mod power_manager;
pub mod prelude;
pub mod traits;
pub mod trip;
pub mod utils;
pub mod veh_state;
pub mod vehicle;

pub extern crate tripsim_proc_macros as proc_macros;
