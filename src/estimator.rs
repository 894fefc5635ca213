//! Recursive smoothing of accepted distance readings.

/// Exponential moving average over accepted distance readings: a
/// single-pole low-pass filter, `est = (1 - gain) * est + gain * raw`.
///
/// `gain` in `(0, 1]` sets responsiveness: 1 trusts each new reading
/// fully, values near 0 smooth heavily. A rejected reading leaves the
/// state untouched, so the last estimate stands in until a plausible
/// reading arrives. There is no debounce counter; a single in-range
/// reading updates the estimate immediately.
#[derive(Debug, Clone, Copy, Default, defmt::Format)]
pub struct Estimator {
    estimated_cm: f64,
    raw_cm: u64,
}

impl Estimator {
    pub const fn new() -> Self {
        Self {
            estimated_cm: 0.0,
            raw_cm: 0,
        }
    }

    /// Fold an accepted raw reading into the running estimate and return
    /// the updated estimate.
    pub fn accept(&mut self, raw_cm: u64, gain: f64) -> f64 {
        self.raw_cm = raw_cm;
        self.estimated_cm = (1.0 - gain) * self.estimated_cm + gain * raw_cm as f64;
        self.estimated_cm
    }

    /// The current estimate, unchanged. Used when a reading is rejected.
    pub fn hold(&self) -> f64 {
        self.estimated_cm
    }

    /// Current smoothed estimate; 0 before the first accepted reading.
    pub fn estimated_cm(&self) -> f64 {
        self.estimated_cm
    }

    /// Last accepted unfiltered reading; 0 before the first acceptance.
    pub fn raw_cm(&self) -> u64 {
        self.raw_cm
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unit_gain_passes_readings_through() {
        let mut est = Estimator::new();
        assert_eq!(est.accept(10, 1.0), 10.0);
        assert_eq!(est.accept(25, 1.0), 25.0);
        assert_eq!(est.raw_cm(), 25);
    }

    #[test]
    fn small_gain_moves_the_estimate_slowly() {
        let mut est = Estimator::new();
        est.accept(100, 1.0);
        let updated = est.accept(200, 0.001);
        assert!((updated - 100.1).abs() < 1e-9);
    }

    #[test]
    fn recursion_matches_the_closed_form() {
        let mut est = Estimator::new();
        est.accept(10, 0.5);
        est.accept(20, 0.5);
        // 0 -> 5 -> 12.5
        assert_eq!(est.estimated_cm(), 12.5);
    }

    #[test]
    fn hold_leaves_state_untouched() {
        let mut est = Estimator::new();
        est.accept(42, 1.0);
        assert_eq!(est.hold(), 42.0);
        assert_eq!(est.hold(), 42.0);
        assert_eq!(est.raw_cm(), 42);
        assert_eq!(est.estimated_cm(), 42.0);
    }

    #[test]
    fn starts_at_zero() {
        let est = Estimator::new();
        assert_eq!(est.estimated_cm(), 0.0);
        assert_eq!(est.raw_cm(), 0);
    }
}
