//! Convenience re-exports of the types most users need to build a vehicle,
//! load a trip, and run it.

pub use crate::components::{
    CurveCalibration, EfficiencyCurve, EfficiencyCurveLibrary, FuelConverterLoadHistogram,
    FuelConverterModel, MotorModel,
};
pub use crate::params::{EmissionFactors, SimConstants};
pub use crate::power_manager::{
    AdvancedPhevPowerManager, ChargeMode, ChargeModeSegment, DecisionCondition,
    DefaultPowerManager, HybridPowerManager,
};
pub use crate::traits::{ApproxEq, SerdeAPI};
pub use crate::trip::{
    RecordColumn, StepRecord, StepRecordHistoryVec, Trip, TripRunner, TripSummary,
};
pub use crate::veh_state::{InstPower, ThreeParamTuning, VehicleState};
pub use crate::vehicle::{
    FuelConverterType, HybridDriveType, PowertrainType, VehicleModelParameters,
};
