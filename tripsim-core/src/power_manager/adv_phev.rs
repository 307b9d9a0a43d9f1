use super::buffers::regen_soc_buffer;
use super::default::Demand;
use super::*;

/// Elapsed trip time at or below which an active later segment signals a
/// restarted trip [s]
pub const MIN_SECS_BEFORE_MODE_CHANGE: f64 = 5.0;
/// Segments starting closer than this to one another are merged [mi]
pub const MIN_MILES_BETWEEN_SEGMENTS: f64 = 0.15;
/// Speed whose regen buffer caps the dynamic SOC floor [mph]
pub const HIGH_SPEED_BUFFER_MPH: f64 = 80.0;
/// Relative SOC at or below which charge depletion counts as charge sustaining
pub const CHG_DEPLETE_BUFFER_REL_SOC: f64 = 0.04;

/// Charge management behavior over a stretch of a trip
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub enum ChargeMode {
    /// let the battery drain toward min SOC
    ChargeDeplete,
    /// hold the SOC observed when the segment began
    ChargeHold,
    /// ramp linearly from the SOC at segment start to `target_rel_soc`
    /// over `miles_to_target`, then hold
    ChargeUp {
        target_rel_soc: f64,
        miles_to_target: f64,
    },
}

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq)]
pub struct ChargeModeSegment {
    pub mode: ChargeMode,
    /// trip distance at which this mode engages
    pub start_miles: f64,
}

impl ChargeModeSegment {
    pub fn deplete(start_miles: f64) -> Self {
        Self {
            mode: ChargeMode::ChargeDeplete,
            start_miles,
        }
    }

    pub fn hold(start_miles: f64) -> Self {
        Self {
            mode: ChargeMode::ChargeHold,
            start_miles,
        }
    }

    pub fn charge_up(start_miles: f64, miles_to_target: f64, target_rel_soc: f64) -> Self {
        Self {
            mode: ChargeMode::ChargeUp {
                target_rel_soc,
                miles_to_target,
            },
            start_miles,
        }
    }

    /// Checks the start distance and, for `ChargeUp`, the target
    pub fn check(&self) -> anyhow::Result<()> {
        ensure!(
            self.start_miles.is_finite() && self.start_miles >= 0.0,
            "segment start must be a non-negative distance, got {}",
            self.start_miles
        );
        if let ChargeMode::ChargeUp {
            target_rel_soc,
            miles_to_target,
        } = self.mode
        {
            ensure!(
                (0.0..=1.0).contains(&target_rel_soc),
                "charge-up target must be a relative SOC in [0, 1], got {}",
                target_rel_soc
            );
            ensure!(
                miles_to_target.is_finite() && miles_to_target >= 0.0,
                "charge-up distance must be non-negative, got {}",
                miles_to_target
            );
        }
        Ok(())
    }
}

/// Per-trip tracking state; negative SOC values mean "not yet initialized"
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PhevTripState {
    pub segment_idx: usize,
    pub prev_rel_soc: f64,
    pub dynamic_target_rel_soc: f64,
    pub segment_start_rel_soc: f64,
}

impl Default for PhevTripState {
    fn default() -> Self {
        Self::new(-1.0)
    }
}

impl PhevTripState {
    fn new(initial_rel_soc: f64) -> Self {
        Self {
            segment_idx: 0,
            prev_rel_soc: initial_rel_soc,
            dynamic_target_rel_soc: initial_rel_soc,
            segment_start_rel_soc: initial_rel_soc,
        }
    }
}

/// Plug-in hybrid policy that follows a distance-ordered list of charge
/// management segments.  Each segment resolves a dynamic SOC floor that
/// replaces min SOC in the default decision ladder.  Without segments, or for
/// any other powertrain, this behaves exactly like [`DefaultPowerManager`].
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default)]
pub struct AdvancedPhevPowerManager {
    #[serde(default)]
    pub base: DefaultPowerManager,
    #[serde(default)]
    segments: Option<Vec<ChargeModeSegment>>,
    #[serde(skip)]
    pub trip: PhevTripState,
}

impl SerdeAPI for AdvancedPhevPowerManager {
    fn init(&mut self) -> anyhow::Result<()> {
        self.base.init()?;
        if let Some(segments) = &self.segments {
            ensure!(!segments.is_empty(), "segment list must not be empty when given");
            ensure!(
                segments[0].start_miles == 0.0,
                "first charge mode segment must start at 0 mi, got {}",
                segments[0].start_miles
            );
            for (i, seg) in segments.iter().enumerate() {
                seg.check().with_context(|| format_dbg!(i))?;
            }
            ensure!(
                segments
                    .iter()
                    .map(|seg| seg.start_miles)
                    .tuple_windows()
                    .all(|(a, b)| b - a > MIN_MILES_BETWEEN_SEGMENTS),
                "charge mode segments must be in increasing start distance, more than {} mi apart",
                MIN_MILES_BETWEEN_SEGMENTS
            );
        }
        self.trip = PhevTripState::default();
        Ok(())
    }
}

impl AdvancedPhevPowerManager {
    pub fn segments(&self) -> Option<&[ChargeModeSegment]> {
        self.segments.as_deref()
    }

    /// Adds a charge management segment.  Only allowed between trips.
    pub fn add_segment(&mut self, segment: ChargeModeSegment) -> anyhow::Result<()> {
        ensure!(
            self.trip.dynamic_target_rel_soc < 0.0,
            "charge mode segments cannot change mid-trip; reset the trip first"
        );
        segment.check()?;

        match self.segments.as_mut() {
            None => {
                self.segments = Some(if segment.start_miles > MIN_MILES_BETWEEN_SEGMENTS {
                    vec![ChargeModeSegment::deplete(0.0), segment]
                } else {
                    vec![ChargeModeSegment {
                        start_miles: 0.0,
                        ..segment
                    }]
                });
            }
            Some(segments) => merge_segment(segments, segment),
        }
        Ok(())
    }

    /// Drops all segments and resets trip tracking
    pub fn reset_mode_intervals(&mut self) {
        self.segments = None;
        self.reset_trip();
    }

    pub fn reset_trip(&mut self) {
        self.trip = PhevTripState::default();
    }

    fn uses_segments(&self, state: &VehicleState) -> bool {
        state.params.is_plugin() && self.segments.is_some()
    }

    pub fn decide(
        &mut self,
        state: &VehicleState,
        mph: f64,
        wheel_kw: f64,
        fc_mod: f64,
        ess_eff: f64,
        total_aux_kw: f64,
    ) -> f64 {
        let segments = match &self.segments {
            Some(segments) if state.params.is_plugin() && !segments.is_empty() => segments,
            _ => {
                return self
                    .base
                    .decide(state, mph, wheel_kw, fc_mod, ess_eff, total_aux_kw)
            }
        };

        let rel_soc = state.soc.rel_soc;
        if self.trip.prev_rel_soc < 0.0
            || (self.trip.segment_idx > 0
                && state.time.sec_since_trip_start <= MIN_SECS_BEFORE_MODE_CHANGE)
        {
            self.trip = PhevTripState::new(rel_soc);
        }
        self.trip.prev_rel_soc = rel_soc;

        let miles = state.motion.miles_since_start;
        if segments
            .iter()
            .skip(self.trip.segment_idx + 1)
            .any(|seg| miles >= seg.start_miles)
        {
            self.trip.segment_idx += 1;
            self.trip.dynamic_target_rel_soc = rel_soc;
            self.trip.segment_start_rel_soc = rel_soc;
            #[cfg(feature = "logging")]
            log::debug!(
                "charge mode segment {} engaged at {:.3} mi",
                self.trip.segment_idx,
                miles
            );
        }

        let segment = segments[self.trip.segment_idx];
        match segment.mode {
            ChargeMode::ChargeDeplete => self.trip.dynamic_target_rel_soc = 0.0,
            ChargeMode::ChargeHold => {}
            ChargeMode::ChargeUp {
                target_rel_soc,
                miles_to_target,
            } => {
                let target_miles = segment.start_miles + miles_to_target;
                self.trip.dynamic_target_rel_soc = if miles >= target_miles || miles_to_target <= 0.0
                {
                    target_rel_soc
                } else {
                    let c1 = (target_miles - miles) / miles_to_target;
                    c1 * self.trip.segment_start_rel_soc + (1.0 - c1) * target_rel_soc
                };
            }
        }

        let cc = &state.params.charge_control;
        let adjusted_min_soc = regen_soc_buffer(
            cc.min_soc,
            cc.max_soc,
            HIGH_SPEED_BUFFER_MPH,
            &state.params,
        )
        .min(cc.min_soc + self.trip.dynamic_target_rel_soc * (cc.max_soc - cc.min_soc));

        let demand = Demand {
            mph,
            wheel_kw,
            fc_mod,
            ess_eff,
            total_aux_kw,
        };
        let (fc_kw_out, condition) = self.base.ladder(state, &demand, adjusted_min_soc);
        self.base.last_decision = Some(condition);
        fc_kw_out
    }

    pub fn is_in_charge_sustain(&self, state: &VehicleState) -> bool {
        match &self.segments {
            Some(segments) if self.uses_segments(state) => {
                match segments.get(self.trip.segment_idx).map(|seg| seg.mode) {
                    Some(ChargeMode::ChargeDeplete) => {
                        self.trip.prev_rel_soc <= CHG_DEPLETE_BUFFER_REL_SOC
                    }
                    Some(_) => true,
                    None => default_is_in_charge_sustain(state),
                }
            }
            _ => default_is_in_charge_sustain(state),
        }
    }
}

/// Places `segment` into a non-empty list whose first segment starts at 0
fn merge_segment(segments: &mut Vec<ChargeModeSegment>, segment: ChargeModeSegment) {
    if segment.start_miles <= MIN_MILES_BETWEEN_SEGMENTS {
        segments[0] = ChargeModeSegment {
            start_miles: 0.0,
            ..segment
        };
        return;
    }
    if let Some(existing) = segments
        .iter_mut()
        .skip(1)
        .find(|seg| (seg.start_miles - segment.start_miles).abs() <= MIN_MILES_BETWEEN_SEGMENTS)
    {
        *existing = segment;
        return;
    }
    let insert_at = 1 + segments
        .iter()
        .skip(1)
        .take_while(|seg| seg.start_miles <= segment.start_miles)
        .count();
    segments.insert(insert_at, segment);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::components::CurveCalibration;
    use crate::vehicle::VehicleModelParameters;

    fn starts(pm: &AdvancedPhevPowerManager) -> Vec<f64> {
        pm.segments()
            .unwrap()
            .iter()
            .map(|seg| seg.start_miles)
            .collect()
    }

    #[test]
    fn test_late_first_segment_gets_leading_deplete() {
        let mut pm = AdvancedPhevPowerManager::default();
        pm.add_segment(ChargeModeSegment::hold(5.0)).unwrap();
        let segs = pm.segments().unwrap();
        assert_eq!(segs.len(), 2);
        assert_eq!(segs[0], ChargeModeSegment::deplete(0.0));
        assert_eq!(segs[1], ChargeModeSegment::hold(5.0));
    }

    #[test]
    fn test_early_first_segment_is_pinned_to_zero() {
        let mut pm = AdvancedPhevPowerManager::default();
        pm.add_segment(ChargeModeSegment::hold(0.1)).unwrap();
        assert_eq!(pm.segments().unwrap(), &[ChargeModeSegment::hold(0.0)]);
    }

    #[test]
    fn test_segments_merge_and_insert_in_order() {
        let mut pm = AdvancedPhevPowerManager::default();
        pm.add_segment(ChargeModeSegment::hold(5.0)).unwrap();
        pm.add_segment(ChargeModeSegment::charge_up(10.0, 2.0, 0.8))
            .unwrap();
        pm.add_segment(ChargeModeSegment::deplete(2.0)).unwrap();
        assert_eq!(starts(&pm), vec![0.0, 2.0, 5.0, 10.0]);

        // within 0.15 mi of an existing segment replaces it
        pm.add_segment(ChargeModeSegment::deplete(5.1)).unwrap();
        assert_eq!(starts(&pm), vec![0.0, 2.0, 5.1, 10.0]);
        assert_eq!(pm.segments().unwrap()[2].mode, ChargeMode::ChargeDeplete);

        // near the trip start replaces segment 0
        pm.add_segment(ChargeModeSegment::hold(0.05)).unwrap();
        assert_eq!(pm.segments().unwrap()[0], ChargeModeSegment::hold(0.0));
        assert_eq!(pm.segments().unwrap().len(), 4);
    }

    #[test]
    fn test_add_segment_rejected_mid_trip() {
        let mut pm = AdvancedPhevPowerManager::default();
        pm.add_segment(ChargeModeSegment::hold(0.0)).unwrap();
        pm.trip = PhevTripState::new(0.7);
        assert!(pm.add_segment(ChargeModeSegment::deplete(3.0)).is_err());
        pm.reset_trip();
        assert!(pm.add_segment(ChargeModeSegment::deplete(3.0)).is_ok());
    }

    #[test]
    fn test_charge_up_target_validated() {
        let mut pm = AdvancedPhevPowerManager::default();
        assert!(pm
            .add_segment(ChargeModeSegment::charge_up(1.0, 2.0, 1.5))
            .is_err());
    }

    #[test]
    fn test_reset_mode_intervals_clears_segments() {
        let mut pm = AdvancedPhevPowerManager::default();
        pm.add_segment(ChargeModeSegment::hold(3.0)).unwrap();
        pm.reset_mode_intervals();
        assert!(pm.segments().is_none());
        assert_eq!(pm.trip, PhevTripState::default());
    }

    fn phev_state(rel_soc: f64) -> VehicleState {
        let mut state =
            VehicleState::new(&VehicleModelParameters::mock_phev(), &CurveCalibration::default())
                .unwrap();
        state.set_rel_soc(rel_soc).unwrap();
        state.time.delta_sec = 1.0;
        state.time.sec_since_trip_start = 100.0;
        state
    }

    #[test]
    fn test_segment_advance_and_charge_up_ramp() {
        let mut pm = AdvancedPhevPowerManager::default();
        pm.add_segment(ChargeModeSegment::charge_up(1.0, 2.0, 0.9))
            .unwrap();
        let mut state = phev_state(0.5);
        let eff = state.params.battery.round_trip_eff.sqrt();

        state.motion.miles_since_start = 0.5;
        pm.decide(&state, 30.0, 5.0, 1.0, eff, 0.7);
        assert_eq!(pm.trip.segment_idx, 0);
        assert_eq!(pm.trip.dynamic_target_rel_soc, 0.0);

        // entering the charge-up segment records the starting SOC
        state.motion.miles_since_start = 1.0;
        pm.decide(&state, 30.0, 5.0, 1.0, eff, 0.7);
        assert_eq!(pm.trip.segment_idx, 1);
        assert!(pm.trip.dynamic_target_rel_soc.approx_eq(&0.5, 1e-9));

        // halfway along the ramp
        state.motion.miles_since_start = 2.0;
        pm.decide(&state, 30.0, 5.0, 1.0, eff, 0.7);
        assert!(pm.trip.dynamic_target_rel_soc.approx_eq(&0.7, 1e-9));

        // past the target distance
        state.motion.miles_since_start = 4.0;
        pm.decide(&state, 30.0, 5.0, 1.0, eff, 0.7);
        assert!(pm.trip.dynamic_target_rel_soc.approx_eq(&0.9, 1e-9));
        assert!(pm.base.last_decision.is_some());
    }

    #[test]
    fn test_trip_restart_is_detected() {
        let mut pm = AdvancedPhevPowerManager::default();
        pm.add_segment(ChargeModeSegment::hold(1.0)).unwrap();
        let mut state = phev_state(0.6);
        state.motion.miles_since_start = 2.0;
        pm.decide(&state, 30.0, 5.0, 1.0, 0.98, 0.7);
        assert_eq!(pm.trip.segment_idx, 1);

        state.time.sec_since_trip_start = 2.0;
        state.motion.miles_since_start = 0.0;
        pm.decide(&state, 30.0, 5.0, 1.0, 0.98, 0.7);
        assert_eq!(pm.trip.segment_idx, 0);
    }

    #[test]
    fn test_charge_sustain_by_mode() {
        let mut pm = AdvancedPhevPowerManager::default();
        pm.add_segment(ChargeModeSegment::hold(1.0)).unwrap();
        let mut state = phev_state(0.6);
        pm.decide(&state, 30.0, 5.0, 1.0, 0.98, 0.7);
        assert!(!pm.is_in_charge_sustain(&state));
        state.motion.miles_since_start = 1.5;
        pm.decide(&state, 30.0, 5.0, 1.0, 0.98, 0.7);
        assert!(pm.is_in_charge_sustain(&state));
    }

    #[test]
    fn test_non_phev_uses_default_ladder() {
        let mut pm = AdvancedPhevPowerManager::default();
        pm.add_segment(ChargeModeSegment::hold(1.0)).unwrap();
        let mut state =
            VehicleState::new(&VehicleModelParameters::mock_hev(), &CurveCalibration::default())
                .unwrap();
        state.time.delta_sec = 1.0;
        pm.decide(&state, 30.0, 5.0, 1.0, 0.98, 0.7);
        assert_eq!(pm.trip, PhevTripState::default());
        assert!(pm.is_in_charge_sustain(&state));
    }
}
