use crate::imports::*;

/// Time spent by the fuel converter in each of
/// [`HISTOGRAM_BINS`](crate::params::HISTOGRAM_BINS) equal-width output
/// power bins spanning zero to rated power
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Default, ApproxEq)]
pub struct FuelConverterLoadHistogram {
    pub max_kw: f64,
    pub bin_width_kw: f64,
    pub total_secs: f64,
    pub operating_secs: f64,
    pub bin_secs: Vec<f64>,
}

impl FuelConverterLoadHistogram {
    pub fn new(max_kw: f64) -> Self {
        Self {
            max_kw,
            bin_width_kw: max_kw / HISTOGRAM_BINS as f64,
            total_secs: 0.0,
            operating_secs: 0.0,
            bin_secs: vec![0.0; HISTOGRAM_BINS],
        }
    }

    /// Clears accumulated time, keeping the bin layout
    pub fn reset(&mut self) {
        self.total_secs = 0.0;
        self.operating_secs = 0.0;
        self.bin_secs = vec![0.0; HISTOGRAM_BINS];
    }

    pub fn add_operating_time(&mut self, dt_s: f64, kw_out: f64) {
        self.total_secs += dt_s;
        self.operating_secs += dt_s;
        let bin = if self.bin_width_kw > 0.0 {
            (kw_out / self.bin_width_kw)
                .floor()
                .clamp(0.0, (HISTOGRAM_BINS - 1) as f64) as usize
        } else {
            0
        };
        self.bin_secs[bin] += dt_s;
    }

    pub fn add_idle_time(&mut self, dt_s: f64) {
        self.total_secs += dt_s;
    }

    /// Fraction of total time spent operating, zero before any time is added
    pub fn operating_fraction(&self) -> f64 {
        if self.total_secs > 0.0 {
            self.operating_secs / self.total_secs
        } else {
            0.0
        }
    }

    /// Fraction of operating time spent in each bin
    pub fn bin_fractions(&self) -> Vec<f64> {
        if self.operating_secs > 0.0 {
            self.bin_secs
                .iter()
                .map(|s| s / self.operating_secs)
                .collect()
        } else {
            vec![0.0; self.bin_secs.len()]
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binning_and_fractions() {
        let mut hist = FuelConverterLoadHistogram::new(100.0);
        hist.add_operating_time(1.0, 2.0);
        hist.add_operating_time(1.0, 52.0);
        hist.add_operating_time(2.0, 150.0);
        hist.add_operating_time(1.0, -3.0);
        hist.add_idle_time(5.0);
        assert_eq!(hist.total_secs, 10.0);
        assert_eq!(hist.operating_secs, 5.0);
        assert_eq!(hist.operating_fraction(), 0.5);
        let fracs = hist.bin_fractions();
        assert_eq!(fracs[0], 0.4);
        assert_eq!(fracs[10], 0.2);
        assert_eq!(fracs[HISTOGRAM_BINS - 1], 0.4);
        assert!((fracs.iter().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_empty_histogram_reports_zeros() {
        let hist = FuelConverterLoadHistogram::new(0.0);
        assert_eq!(hist.operating_fraction(), 0.0);
        assert!(hist.bin_fractions().iter().all(|f| *f == 0.0));
    }

    #[test]
    fn test_zero_width_bins_accumulate_in_first_bin() {
        let mut hist = FuelConverterLoadHistogram::new(0.0);
        hist.add_operating_time(1.0, 10.0);
        assert_eq!(hist.bin_secs[0], 1.0);
        hist.reset();
        assert_eq!(hist.total_secs, 0.0);
        assert_eq!(hist.bin_secs.len(), HISTOGRAM_BINS);
    }
}
