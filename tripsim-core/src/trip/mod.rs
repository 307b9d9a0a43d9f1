//! Module containing the trip input trace and the runner that steps a
//! [`VehicleState`] through it.

use crate::imports::*;
use crate::power_manager::HybridPowerManager;
use crate::veh_state::VehicleState;
use crate::vehicle::PowertrainType;

mod equivalent;
mod record;
mod summary;

pub use equivalent::{fit_zero_battery_fuel, MAX_FIT_RUNS, MIN_FIT_RUNS};
pub use record::{RecordColumn, StepRecord, StepRecordHistoryVec};
pub use summary::{TripMetrics, TripSummary};

/// One CSV row of a [`Trip`].  Optional columns default to zero.
#[derive(Default, PartialEq, Clone, Debug, Deserialize, Serialize)]
pub struct TripElement {
    /// time [s]
    #[serde(alias = "timeSec", alias = "time")]
    pub time_s: f64,
    /// desired speed [mph]
    #[serde(alias = "speedMPH", alias = "mph")]
    pub speed_mph: f64,
    /// grade [rise/run]
    #[serde(default, alias = "roadGrade")]
    pub grade: f64,
    /// auxiliary load on top of the vehicle's base load [kW]
    #[serde(default, alias = "otherAuxKW")]
    pub aux_kw: f64,
    /// payload on top of the vehicle's mass [kg]
    #[serde(default, alias = "payloadKg")]
    pub payload_kg: f64,
}

/// Desired-speed trace with per-sample grade, auxiliary load, and payload.
/// Optional columns that are left empty are filled with zeros on load.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct Trip {
    #[serde(default)]
    pub name: String,
    /// time [s]
    #[serde(deserialize_with = "deserialize_array1")]
    pub time_s: Array1<f64>,
    /// desired speed [mph]
    #[serde(deserialize_with = "deserialize_array1")]
    pub speed_mph: Array1<f64>,
    /// grade [rise/run]
    #[serde(default, deserialize_with = "deserialize_array1")]
    pub grade: Array1<f64>,
    /// extra auxiliary load [kW]
    #[serde(default, deserialize_with = "deserialize_array1")]
    pub aux_kw: Array1<f64>,
    /// payload [kg]
    #[serde(default, deserialize_with = "deserialize_array1")]
    pub payload_kg: Array1<f64>,
}

impl SerdeAPI for Trip {
    #[cfg(feature = "bincode")]
    const ACCEPTED_BYTE_FORMATS: &'static [&'static str] = &["yaml", "json", "bin", "csv"];
    #[cfg(not(feature = "bincode"))]
    const ACCEPTED_BYTE_FORMATS: &'static [&'static str] = &["yaml", "json", "csv"];
    const ACCEPTED_STR_FORMATS: &'static [&'static str] = &["yaml", "json", "csv"];

    fn init(&mut self) -> anyhow::Result<()> {
        let n = self.len();
        for col in [&mut self.grade, &mut self.aux_kw, &mut self.payload_kg] {
            if col.is_empty() {
                *col = Array1::zeros(n);
            }
        }
        self.init_checks()
    }

    fn to_writer<W: std::io::Write>(&self, wtr: W, format: &str) -> anyhow::Result<()> {
        match format_key(format).as_str() {
            "yaml" | "yml" => serde_yaml::to_writer(wtr, self)?,
            "json" => serde_json::to_writer(wtr, self)?,
            #[cfg(feature = "bincode")]
            "bin" => bincode::serialize_into(wtr, self)?,
            "csv" => {
                let mut wtr = csv::Writer::from_writer(wtr);
                for elem in self.elements() {
                    wtr.serialize(elem)?;
                }
                wtr.flush()?
            }
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_BYTE_FORMATS
            ),
        }
        Ok(())
    }

    fn to_str(&self, format: &str) -> anyhow::Result<String> {
        match format_key(format).as_str() {
            "yaml" | "yml" => self.to_yaml(),
            "json" => self.to_json(),
            "csv" => self.to_csv(),
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_STR_FORMATS
            ),
        }
    }

    fn from_str<S: AsRef<str>>(contents: S, format: &str) -> anyhow::Result<Self> {
        match format_key(format).as_str() {
            "yaml" | "yml" => Self::from_yaml(contents),
            "json" => Self::from_json(contents),
            "csv" => Self::from_reader(contents.as_ref().as_bytes(), "csv"),
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_STR_FORMATS
            ),
        }
    }

    fn from_reader<R: std::io::Read>(rdr: R, format: &str) -> anyhow::Result<Self> {
        let mut deserialized: Self = match format_key(format).as_str() {
            "yaml" | "yml" => serde_yaml::from_reader(rdr)?,
            "json" => serde_json::from_reader(rdr)?,
            #[cfg(feature = "bincode")]
            "bin" => bincode::deserialize_from(rdr)?,
            "csv" => {
                let mut rdr = csv::Reader::from_reader(rdr);
                let elements = rdr
                    .deserialize()
                    .collect::<Result<Vec<TripElement>, _>>()
                    .with_context(|| format_dbg!())?;
                Self::from_elements(&elements)
            }
            _ => bail!(
                "Unsupported format {format:?}, must be one of {:?}",
                Self::ACCEPTED_BYTE_FORMATS
            ),
        };
        deserialized.init()?;
        Ok(deserialized)
    }
}

impl Trip {
    /// Builds a 1 Hz trip on flat ground with no extra load
    pub fn from_speed_trace(speed_mph: &[f64]) -> anyhow::Result<Self> {
        let n = speed_mph.len();
        let mut trip = Self {
            name: String::new(),
            time_s: Array1::range(0.0, n as f64, 1.0),
            speed_mph: Array1::from_vec(speed_mph.to_vec()),
            grade: Array1::zeros(n),
            aux_kw: Array1::zeros(n),
            payload_kg: Array1::zeros(n),
        };
        trip.init()?;
        Ok(trip)
    }

    fn from_elements(elements: &[TripElement]) -> Self {
        Self {
            name: String::new(),
            time_s: elements.iter().map(|e| e.time_s).collect(),
            speed_mph: elements.iter().map(|e| e.speed_mph).collect(),
            grade: elements.iter().map(|e| e.grade).collect(),
            aux_kw: elements.iter().map(|e| e.aux_kw).collect(),
            payload_kg: elements.iter().map(|e| e.payload_kg).collect(),
        }
    }

    /// Rows of the trip as CSV elements
    pub fn elements(&self) -> impl Iterator<Item = TripElement> + '_ {
        izip!(
            self.time_s.iter(),
            self.speed_mph.iter(),
            self.grade.iter(),
            self.aux_kw.iter(),
            self.payload_kg.iter()
        )
        .map(|(t, v, g, a, p)| TripElement {
            time_s: *t,
            speed_mph: *v,
            grade: *g,
            aux_kw: *a,
            payload_kg: *p,
        })
    }

    pub(crate) fn init_checks(&self) -> anyhow::Result<()> {
        ensure!(
            self.len() >= 2,
            "trip needs at least 2 samples, got {}",
            self.len()
        );
        ensure!(
            self.are_fields_equal_length(),
            "trip has unequal column lengths\ntime_s: {}\nspeed_mph: {}\ngrade: {}\naux_kw: {}\npayload_kg: {}",
            self.time_s.len(),
            self.speed_mph.len(),
            self.grade.len(),
            self.aux_kw.len(),
            self.payload_kg.len(),
        );
        ensure!(self.is_sorted(), "trip is not sorted in time");
        ensure!(
            self.speed_mph.iter().all(|v| v.is_finite() && *v >= 0.0),
            "trip speeds must be finite and non-negative"
        );
        Ok(())
    }

    /// Load trip from CSV file, parsing name from filepath
    pub fn from_csv_file<P: AsRef<Path>>(filepath: P) -> anyhow::Result<Self> {
        let filepath = filepath.as_ref();
        let name = filepath
            .file_stem()
            .and_then(OsStr::to_str)
            .with_context(|| format!("Could not parse trip name from filepath: {filepath:?}"))?
            .to_string();
        let mut trip = Self::from_file(filepath)?;
        trip.name = name;
        Ok(trip)
    }

    /// Write (serialize) trip to a CSV string
    pub fn to_csv(&self) -> anyhow::Result<String> {
        let mut buf = Vec::with_capacity(self.len());
        self.to_writer(&mut buf, "csv")?;
        Ok(String::from_utf8(buf)?)
    }

    pub fn len(&self) -> usize {
        self.time_s.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// true if time strictly increases
    pub fn is_sorted(&self) -> bool {
        self.time_s
            .iter()
            .tuple_windows()
            .all(|(t0, t1)| t0 < t1)
    }

    pub fn are_fields_equal_length(&self) -> bool {
        let n = self.len();
        [
            self.speed_mph.len(),
            self.grade.len(),
            self.aux_kw.len(),
            self.payload_kg.len(),
        ]
        .iter()
        .all(|len| *len == n)
    }

    /// Time step ending at each sample [s], zero for the first
    pub fn dt_s(&self) -> Array1<f64> {
        diff(&self.time_s)
    }

    /// Distance covered at desired speed, by trapezoidal integration [mi]
    pub fn desired_miles(&self) -> Array1<f64> {
        let step_mi: Array1<f64> = izip!(
            self.dt_s().iter(),
            std::iter::once(&0.0).chain(self.speed_mph.iter()),
            self.speed_mph.iter()
        )
        .map(|(dt, v0, v1)| 0.5 * (v0 + v1) * dt / SEC_PER_HR)
        .collect();
        ndarrcumsum(&step_mi)
    }

    /// Duration of the trip [s]
    pub fn duration_s(&self) -> f64 {
        match (self.time_s.first(), self.time_s.last()) {
            (Some(t0), Some(t1)) => t1 - t0,
            _ => 0.0,
        }
    }
}

/// Steps a vehicle through trips and summarizes each one
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct TripRunner {
    pub state: VehicleState,
    #[serde(default)]
    pub emissions: EmissionFactors,
}

impl SerdeAPI for TripRunner {}

impl TripRunner {
    pub fn new(state: VehicleState) -> Self {
        Self {
            state,
            emissions: EmissionFactors::default(),
        }
    }

    pub fn with_emissions(mut self, emissions: EmissionFactors) -> Self {
        self.emissions = emissions;
        self
    }

    /// Runs `trip` and summarizes it.  Charge-sustaining hybrids are reported
    /// at their equivalent zero-battery-use fuel; every other powertrain is
    /// run once starting from its current SOC.
    pub fn run(
        &mut self,
        trip: &Trip,
        manager: &mut HybridPowerManager,
    ) -> anyhow::Result<TripSummary> {
        match self.state.pt_type() {
            PowertrainType::Hybrid => self.run_equivalent(trip, manager),
            _ => self.run_direct(trip, manager, None),
        }
    }

    /// Runs `trip` once, after setting relative SOC to `rel_soc` if given
    pub fn run_direct(
        &mut self,
        trip: &Trip,
        manager: &mut HybridPowerManager,
        rel_soc: Option<f64>,
    ) -> anyhow::Result<TripSummary> {
        self.walk(trip, manager, rel_soc, None)
    }

    /// [`run_direct`](Self::run_direct), also returning the state at every
    /// sample, starting with the state at the first
    pub fn run_with_record(
        &mut self,
        trip: &Trip,
        manager: &mut HybridPowerManager,
        rel_soc: Option<f64>,
    ) -> anyhow::Result<(TripSummary, StepRecordHistoryVec)> {
        let mut record = StepRecordHistoryVec::new();
        let summary = self.walk(trip, manager, rel_soc, Some(&mut record))?;
        Ok((summary, record))
    }

    /// Summary extended with the derived per-mile, per-second, and emission
    /// values for this runner's vehicle
    pub fn metrics(&self, summary: &TripSummary) -> TripMetrics {
        summary.metrics(&self.state.params, &self.emissions)
    }

    fn walk(
        &mut self,
        trip: &Trip,
        manager: &mut HybridPowerManager,
        rel_soc: Option<f64>,
        mut record: Option<&mut StepRecordHistoryVec>,
    ) -> anyhow::Result<TripSummary> {
        trip.init_checks().with_context(|| format_dbg!(trip.name))?;
        self.state.reset_all_but_soc();
        if let Some(rel_soc) = rel_soc {
            self.state.set_rel_soc(rel_soc)?;
        }
        manager.reset_trip();

        let t0 = trip.time_s[0];
        if let Some(record) = record.as_deref_mut() {
            record.push(StepRecord::from_state(&self.state, t0));
        }

        let mut summary = TripSummary::default();
        for i in 1..trip.len() {
            let fc_was_on = self.state.is_fc_on();
            self.state
                .step(
                    trip.time_s[i] - t0,
                    trip.speed_mph[i],
                    trip.grade[i],
                    trip.aux_kw[i],
                    trip.payload_kg[i],
                    manager,
                )
                .with_context(|| format_dbg!(i))?;

            let dt = self.state.time.delta_sec;
            summary.max_slip_mph = summary.max_slip_mph.max(self.state.motion.slip_mph);
            if self.state.is_fc_on() {
                summary.fc_on_secs += dt;
                if !fc_was_on {
                    summary.fc_starts += 1;
                }
            }
            if trip.speed_mph[i] < IDLE_SPEED_TOL_MPH {
                summary.idle_secs += dt;
            }
            if let Some(record) = record.as_deref_mut() {
                record.push(StepRecord::from_state(&self.state, trip.time_s[i]));
            }
        }

        if summary.max_slip_mph > 1.0 {
            #[cfg(feature = "logging")]
            log::warn!(
                "trip {:?}: vehicle fell {:.2} mph short of the desired speed",
                trip.name,
                summary.max_slip_mph
            );
        }

        summary.miles = self.state.motion.miles_since_start;
        summary.fuel_use = self.state.energy.fuel_since_start;
        summary.battery_kwh = self.state.energy.batt_kwh_since_start;
        summary.final_rel_soc = self.state.soc.rel_soc;
        summary.seconds = self.state.time.sec_since_trip_start;
        summary.histogram = self.state.energy.histogram.clone();
        Ok(summary)
    }
}
