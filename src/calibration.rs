//! Calibration state and the statistics used to derive it.

use libm::{floor, sqrt};

use crate::units::{MAX_DISTANCE_CM, MIN_DISTANCE_CM, US_PER_CM_NOMINAL};

/// Measurement dispersion assumed before any calibration run.
const DISPERSION_CM_DEFAULT: f64 = 10.0;

/// Welford-style online mean: `avg += (sample - avg) / n`.
///
/// Avoids accumulating a large sum and tolerates arbitrarily long sample
/// streams without overflow.
#[derive(Debug, Clone, Copy, Default)]
pub struct RunningMean {
    avg: f64,
    count: u32,
}

impl RunningMean {
    pub const fn new() -> Self {
        Self { avg: 0.0, count: 0 }
    }

    pub fn push(&mut self, sample: f64) {
        self.count += 1;
        self.avg += (sample - self.avg) / self.count as f64;
    }

    pub fn value(&self) -> f64 {
        self.avg
    }

    pub fn count(&self) -> u32 {
        self.count
    }
}

/// Pulse-time-to-distance calibration.
///
/// Holds the microseconds-per-centimeter ratio together with the plausible
/// echo duration window derived from it. `min_pulse_us < max_pulse_us`
/// holds at all times; both are recomputed whenever the ratio changes.
#[derive(Debug, Clone, Copy, PartialEq, defmt::Format)]
pub struct Calibration {
    us_per_cm: f64,
    dispersion_cm: f64,
    min_pulse_us: f64,
    max_pulse_us: f64,
}

impl Default for Calibration {
    fn default() -> Self {
        Self::with_ratio(US_PER_CM_NOMINAL, DISPERSION_CM_DEFAULT)
    }
}

impl Calibration {
    fn with_ratio(us_per_cm: f64, dispersion_cm: f64) -> Self {
        Self {
            us_per_cm,
            dispersion_cm,
            min_pulse_us: us_per_cm * MIN_DISTANCE_CM,
            max_pulse_us: us_per_cm * MAX_DISTANCE_CM,
        }
    }

    /// Derive a calibration from raw pulse timings taken at a known
    /// reference distance.
    ///
    /// Two passes over the samples: an online mean, floored to the sensor's
    /// discrete timing resolution, gives the ratio; an online mean of
    /// squared deviations from that floored average, square-rooted and
    /// floored, gives the dispersion in microseconds, which is reported in
    /// centimeters through the newly derived ratio.
    pub fn from_samples(times: &[u64], reference_cm: f64) -> Self {
        let mut mean = RunningMean::new();
        for &t in times {
            mean.push(t as f64);
        }
        let avg = floor(mean.value());
        let us_per_cm = avg / reference_cm;

        let mut squared = RunningMean::new();
        for &t in times {
            let dev = t as f64 - avg;
            squared.push(dev * dev);
        }
        let dispersion_cm = floor(sqrt(squared.value())) / us_per_cm;

        Self::with_ratio(us_per_cm, dispersion_cm)
    }

    /// Active microseconds-per-centimeter ratio.
    pub fn us_per_cm(&self) -> f64 {
        self.us_per_cm
    }

    /// Measurement dispersion observed during calibration, in centimeters.
    pub fn dispersion_cm(&self) -> f64 {
        self.dispersion_cm
    }

    /// Shortest plausible echo duration.
    pub fn min_pulse_us(&self) -> f64 {
        self.min_pulse_us
    }

    /// Longest plausible echo duration; also the measurement timeout.
    pub fn max_pulse_us(&self) -> f64 {
        self.max_pulse_us
    }

    /// Whether a raw timing falls inside the plausible window.
    pub fn plausible(&self, micros: u64) -> bool {
        let t = micros as f64;
        t >= self.min_pulse_us && t <= self.max_pulse_us
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn running_mean_matches_arithmetic_mean() {
        let mut mean = RunningMean::new();
        for &x in &[2.0, 4.0, 6.0, 8.0] {
            mean.push(x);
        }
        assert_eq!(mean.value(), 5.0);
        assert_eq!(mean.count(), 4);
    }

    #[test]
    fn defaults_use_the_nominal_ratio() {
        let cal = Calibration::default();
        assert_eq!(cal.us_per_cm(), 58.0);
        assert_eq!(cal.dispersion_cm(), 10.0);
        assert_eq!(cal.min_pulse_us(), 116.0);
        assert_eq!(cal.max_pulse_us(), 29000.0);
    }

    #[test]
    fn uniform_samples_give_exact_ratio_and_zero_dispersion() {
        let times = [580u64; 100];
        let cal = Calibration::from_samples(&times, 10.0);
        assert_eq!(cal.us_per_cm(), 58.0);
        assert_eq!(cal.dispersion_cm(), 0.0);
        assert_eq!(cal.min_pulse_us(), 116.0);
        assert_eq!(cal.max_pulse_us(), 29000.0);
    }

    #[test]
    fn fractional_average_is_floored_before_division() {
        // 50 samples of 580 and 50 of 581: mean 580.5, floored to 580.
        let mut times = [580u64; 100];
        for t in times.iter_mut().skip(50) {
            *t = 581;
        }
        let cal = Calibration::from_samples(&times, 10.0);
        assert_eq!(cal.us_per_cm(), 58.0);
    }

    #[test]
    fn dispersion_is_floored_stddev_over_ratio() {
        // One 570/590 pair: the incremental mean is exactly 580 (570,
        // then 570 + 20/2), every deviation is 10, the mean of squared
        // deviations is exactly 100, so the floored stddev is 10 us and
        // dispersion = 10 / 58. Longer runs accumulate rounding in the
        // incremental mean and may floor one below the arithmetic mean.
        let times = [570u64, 590];
        let cal = Calibration::from_samples(&times, 10.0);
        assert_eq!(cal.us_per_cm(), 58.0);
        assert_eq!(cal.dispersion_cm(), 10.0 / 58.0);
    }

    #[test]
    fn bounds_follow_the_derived_ratio() {
        let times = [1160u64; 100];
        let cal = Calibration::from_samples(&times, 10.0);
        assert_eq!(cal.us_per_cm(), 116.0);
        assert_eq!(cal.min_pulse_us(), 232.0);
        assert_eq!(cal.max_pulse_us(), 58000.0);
        assert!(cal.min_pulse_us() < cal.max_pulse_us());
    }

    #[test]
    fn plausible_window_is_inclusive() {
        let cal = Calibration::default();
        assert!(cal.plausible(116));
        assert!(cal.plausible(29000));
        assert!(!cal.plausible(115));
        assert!(!cal.plausible(29001));
    }
}
