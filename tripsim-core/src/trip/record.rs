use crate::imports::*;
use crate::veh_state::VehicleState;

/// Snapshot of the quantities most often plotted over a trip
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, HistoryVec)]
pub struct StepRecord {
    pub time_s: f64,
    pub speed_mph: f64,
    pub miles: f64,
    pub rel_soc: f64,
    /// cumulative fuel, in the converter's fuel unit
    pub fuel_use: f64,
    pub fc_kw_out: f64,
    pub mt_kw_out: f64,
    /// positive when discharging
    pub ess_kw: f64,
}

impl StepRecord {
    pub fn from_state(state: &VehicleState, time_s: f64) -> Self {
        Self {
            time_s,
            speed_mph: state.motion.ach_mph,
            miles: state.motion.miles_since_start,
            rel_soc: state.soc.rel_soc,
            fuel_use: state.energy.fuel_since_start,
            fc_kw_out: state.power.fc_kw_out,
            mt_kw_out: state.power.mt_kw_out,
            ess_kw: state.power.ess_kw,
        }
    }
}

/// Selectable column of a step record export
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RecordColumn {
    #[serde(alias = "time")]
    TimeS,
    #[serde(alias = "speed")]
    SpeedMph,
    Miles,
    RelSoc,
    FuelUse,
    FcKwOut,
    MtKwOut,
    EssKw,
}

impl RecordColumn {
    pub const ALL: [RecordColumn; 8] = [
        Self::TimeS,
        Self::SpeedMph,
        Self::Miles,
        Self::RelSoc,
        Self::FuelUse,
        Self::FcKwOut,
        Self::MtKwOut,
        Self::EssKw,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Self::TimeS => "time_s",
            Self::SpeedMph => "speed_mph",
            Self::Miles => "miles",
            Self::RelSoc => "rel_soc",
            Self::FuelUse => "fuel_use",
            Self::FcKwOut => "fc_kw_out",
            Self::MtKwOut => "mt_kw_out",
            Self::EssKw => "ess_kw",
        }
    }

    fn values<'a>(&self, record: &'a StepRecordHistoryVec) -> &'a [f64] {
        match self {
            Self::TimeS => &record.time_s,
            Self::SpeedMph => &record.speed_mph,
            Self::Miles => &record.miles,
            Self::RelSoc => &record.rel_soc,
            Self::FuelUse => &record.fuel_use,
            Self::FcKwOut => &record.fc_kw_out,
            Self::MtKwOut => &record.mt_kw_out,
            Self::EssKw => &record.ess_kw,
        }
    }
}

impl StepRecordHistoryVec {
    /// Writes `columns`, in order, as CSV with a header row.  An empty
    /// selection writes every column.
    pub fn to_csv_writer<W: std::io::Write>(
        &self,
        wtr: W,
        columns: &[RecordColumn],
    ) -> anyhow::Result<()> {
        let columns = if columns.is_empty() {
            &RecordColumn::ALL[..]
        } else {
            columns
        };
        let mut wtr = csv::Writer::from_writer(wtr);
        wtr.write_record(columns.iter().map(|c| c.header()))?;
        for i in 0..self.len() {
            wtr.write_record(columns.iter().map(|c| c.values(self)[i].to_string()))?;
        }
        wtr.flush()?;
        Ok(())
    }

    pub fn to_csv_string(&self, columns: &[RecordColumn]) -> anyhow::Result<String> {
        let mut buf = Vec::new();
        self.to_csv_writer(&mut buf, columns)?;
        Ok(String::from_utf8(buf)?)
    }
}
