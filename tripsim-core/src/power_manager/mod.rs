//! Module containing the hybrid energy management policies, which choose the
//! fuel converter output for each step of a hybrid or plug-in hybrid.

use crate::imports::*;
use crate::vehicle::PowertrainType;
use crate::veh_state::{ramped_limit_kw, VehicleState};

pub mod adv_phev;
pub mod buffers;
pub mod default;

pub use adv_phev::{AdvancedPhevPowerManager, ChargeMode, ChargeModeSegment, PhevTripState};
pub use default::DefaultPowerManager;

/// Which rung of the decision ladder set the converter output
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecisionCondition {
    /// SOC below the acceleration buffer; converter recharges the battery
    LowSocRecovery,
    /// demand exceeds what the motor can deliver
    PowerAssist,
    /// battery cannot supply the motor and auxiliary load
    BatteryLimit,
    /// converter recently started and must stay on
    MinimumOnTime,
    /// speed or electrical demand above threshold with room to charge
    HighDemandOrSpeed,
    Off,
}

/// Energy management policy consulted by hybrid steps
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub enum HybridPowerManager {
    Default(DefaultPowerManager),
    AdvancedPhev(AdvancedPhevPowerManager),
}

impl Default for HybridPowerManager {
    fn default() -> Self {
        Self::Default(Default::default())
    }
}

impl SerdeAPI for HybridPowerManager {
    fn init(&mut self) -> anyhow::Result<()> {
        match self {
            Self::Default(pm) => pm.init()?,
            Self::AdvancedPhev(pm) => pm.init()?,
        }
        Ok(())
    }
}

impl From<DefaultPowerManager> for HybridPowerManager {
    fn from(pm: DefaultPowerManager) -> Self {
        Self::Default(pm)
    }
}

impl From<AdvancedPhevPowerManager> for HybridPowerManager {
    fn from(pm: AdvancedPhevPowerManager) -> Self {
        Self::AdvancedPhev(pm)
    }
}

impl HybridPowerManager {
    /// Fuel converter output for the current step; zero means off.
    ///
    /// # Arguments
    /// * `state` - vehicle state as of the previous step, with this step's timers
    /// * `mph` - achieved speed for this step
    /// * `wheel_kw` - power demanded at the wheels
    /// * `fc_mod` - multiplier on converter power
    /// * `ess_eff` - one-way battery efficiency
    /// * `total_aux_kw` - auxiliary load for this step
    pub fn decide(
        &mut self,
        state: &VehicleState,
        mph: f64,
        wheel_kw: f64,
        fc_mod: f64,
        ess_eff: f64,
        total_aux_kw: f64,
    ) -> f64 {
        match self {
            Self::Default(pm) => pm.decide(state, mph, wheel_kw, fc_mod, ess_eff, total_aux_kw),
            Self::AdvancedPhev(pm) => {
                pm.decide(state, mph, wheel_kw, fc_mod, ess_eff, total_aux_kw)
            }
        }
    }

    /// Clears per-trip tracking.  Segments, if any, are kept.
    pub fn reset_trip(&mut self) {
        match self {
            Self::Default(pm) => pm.last_decision = None,
            Self::AdvancedPhev(pm) => {
                pm.reset_trip();
                pm.base.last_decision = None;
            }
        }
    }

    /// Whether the vehicle is operating like a charge-sustaining hybrid
    pub fn is_in_charge_sustain(&self, state: &VehicleState) -> bool {
        match self {
            Self::Default(_) => default_is_in_charge_sustain(state),
            Self::AdvancedPhev(pm) => pm.is_in_charge_sustain(state),
        }
    }

    pub fn last_decision(&self) -> Option<DecisionCondition> {
        match self {
            Self::Default(pm) => pm.last_decision,
            Self::AdvancedPhev(pm) => pm.base.last_decision,
        }
    }
}

/// Hybrids always sustain charge; plug-ins do once the battery is nearly
/// depleted; nothing else does
pub fn default_is_in_charge_sustain(state: &VehicleState) -> bool {
    match state.pt_type() {
        PowertrainType::Hybrid => true,
        PowertrainType::PlugInHybrid => {
            state.soc.rel_soc <= adv_phev::CHG_DEPLETE_BUFFER_REL_SOC
        }
        PowertrainType::Conventional | PowertrainType::BatteryElectric => false,
    }
}
