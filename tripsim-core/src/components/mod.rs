//! Component performance models.  Each model is built once from rated power
//! and an efficiency curve, then answers input/output power queries that
//! saturate outside the rated range.

pub mod efficiency_curve;
pub mod fuel_converter;
pub mod histogram;
pub mod motor;

pub use efficiency_curve::{CurveCalibration, EfficiencyCurve, EfficiencyCurveLibrary};
pub use fuel_converter::FuelConverterModel;
pub use histogram::FuelConverterLoadHistogram;
pub use motor::MotorModel;
