use crate::imports::*;
use crate::vehicle::{BatteryParams, FuelConverterType};

/// Sparse efficiency curve: efficiency at fractions of rated output power
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct EfficiencyCurve {
    #[serde(default)]
    pub name: String,
    /// fraction of rated output power, non-decreasing within [0, 1]
    pub frac_pwr_out: Vec<f64>,
    /// efficiency at each fraction, within [0, 1]
    pub eff: Vec<f64>,
}

impl SerdeAPI for EfficiencyCurve {
    fn init(&mut self) -> anyhow::Result<()> {
        self.check()
    }
}

lazy_static! {
    static ref DEFAULT_SI_CURVE: EfficiencyCurve =
        EfficiencyCurve::from_arrays("spark ignition", &FC_PERC_OUT_ARRAY, &SI_EFF);
    static ref DEFAULT_ATKINSON_CURVE: EfficiencyCurve =
        EfficiencyCurve::from_arrays("atkinson", &FC_PERC_OUT_ARRAY, &ATKINSON_EFF);
    static ref DEFAULT_DIESEL_CURVE: EfficiencyCurve =
        EfficiencyCurve::from_arrays("diesel", &FC_PERC_OUT_ARRAY, &DIESEL_EFF);
    static ref DEFAULT_FUEL_CELL_CURVE: EfficiencyCurve =
        EfficiencyCurve::from_arrays("fuel cell", &FC_PERC_OUT_ARRAY, &FUEL_CELL_EFF);
}

impl EfficiencyCurve {
    pub fn new(frac_pwr_out: Vec<f64>, eff: Vec<f64>) -> anyhow::Result<Self> {
        let curve = Self {
            name: String::new(),
            frac_pwr_out,
            eff,
        };
        curve.check()?;
        Ok(curve)
    }

    fn from_arrays(name: &str, frac_pwr_out: &[f64], eff: &[f64]) -> Self {
        Self {
            name: name.to_string(),
            frac_pwr_out: frac_pwr_out.to_vec(),
            eff: eff.to_vec(),
        }
    }

    /// Default fuel converter curve for the converter technology
    pub fn default_fuel_converter(fc_type: FuelConverterType) -> &'static Self {
        match fc_type {
            FuelConverterType::SparkIgnition | FuelConverterType::Cng => &DEFAULT_SI_CURVE,
            FuelConverterType::Atkinson => &DEFAULT_ATKINSON_CURVE,
            FuelConverterType::Diesel | FuelConverterType::HybridDiesel => &DEFAULT_DIESEL_CURVE,
            FuelConverterType::FuelCell => &DEFAULT_FUEL_CELL_CURVE,
        }
    }

    /// Rejects malformed curves
    pub fn check(&self) -> anyhow::Result<()> {
        ensure!(
            self.frac_pwr_out.len() == self.eff.len(),
            "efficiency curve {:?} has {} power fractions but {} efficiencies",
            self.name,
            self.frac_pwr_out.len(),
            self.eff.len()
        );
        ensure!(
            self.frac_pwr_out.len() >= 2,
            "efficiency curve {:?} needs at least 2 points",
            self.name
        );
        ensure!(
            is_sorted(&self.frac_pwr_out),
            "efficiency curve {:?} power fractions must be non-decreasing",
            self.name
        );
        ensure!(
            self.frac_pwr_out.iter().all(|f| (0.0..=1.0).contains(f)),
            "efficiency curve {:?} power fractions must lie within [0, 1]",
            self.name
        );
        ensure!(
            self.eff.iter().all(|e| (0.0..=1.0).contains(e)),
            "efficiency curve {:?} efficiencies must lie within [0, 1]",
            self.name
        );
        ensure!(
            self.peak_eff() > 0.0,
            "efficiency curve {:?} has no positive efficiency",
            self.name
        );
        Ok(())
    }

    pub fn peak_eff(&self) -> f64 {
        arrmax(&self.eff)
    }

    pub fn len(&self) -> usize {
        self.eff.len()
    }

    pub fn is_empty(&self) -> bool {
        self.eff.is_empty()
    }
}

/// Optional custom curves replacing the built-in defaults
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct CurveCalibration {
    #[serde(default)]
    pub fuel_converter: Option<EfficiencyCurve>,
    #[serde(default)]
    pub motor: Option<EfficiencyCurve>,
}

impl SerdeAPI for CurveCalibration {
    fn init(&mut self) -> anyhow::Result<()> {
        if let Some(curve) = self.fuel_converter.as_ref() {
            curve.check().with_context(|| format_dbg!())?;
        }
        if let Some(curve) = self.motor.as_ref() {
            curve.check().with_context(|| format_dbg!())?;
        }
        Ok(())
    }
}

/// Indexed collection of custom curves, selected per vehicle through
/// [`BatteryParams::fc_curve_id`] and [`BatteryParams::mt_curve_id`]
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct EfficiencyCurveLibrary {
    #[serde(default)]
    pub fuel_converter_curves: Vec<EfficiencyCurve>,
    #[serde(default)]
    pub motor_curves: Vec<EfficiencyCurve>,
}

impl SerdeAPI for EfficiencyCurveLibrary {
    fn init(&mut self) -> anyhow::Result<()> {
        self.fuel_converter_curves
            .iter()
            .chain(self.motor_curves.iter())
            .enumerate()
            .try_for_each(|(i, curve)| curve.check().with_context(|| format!("curve idx: {}", i)))
    }
}

impl EfficiencyCurveLibrary {
    /// Curves selected by the battery's curve ids; an id past the end of the
    /// library is an error
    pub fn calibration_for(&self, battery: &BatteryParams) -> anyhow::Result<CurveCalibration> {
        let pick = |curves: &[EfficiencyCurve], id: Option<usize>, kind: &str| match id {
            Some(i) => curves.get(i).cloned().map(Some).with_context(|| {
                format!(
                    "{} curve id {} out of range for library of {} curves",
                    kind,
                    i,
                    curves.len()
                )
            }),
            None => Ok(None),
        };
        Ok(CurveCalibration {
            fuel_converter: pick(
                &self.fuel_converter_curves,
                battery.fc_curve_id,
                "fuel converter",
            )?,
            motor: pick(&self.motor_curves, battery.mt_curve_id, "motor")?,
        })
    }
}
