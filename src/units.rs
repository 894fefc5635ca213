//! Unit conversion for raw echo timings, plus the protocol constants
//! fixed by the sensor family.
//!
//! All conversions are floor integer division; this path never produces
//! fractional centimeters or inches. Only the smoothing filter in
//! [`crate::Estimator`] works in fractional units.

use libm::floor;

/// Nominal round-trip echo time per centimeter of distance, derived from
/// the speed of sound. Used until a calibration run replaces it.
pub const US_PER_CM_NOMINAL: f64 = 58.0;

/// Round-trip echo time per inch. Inches conversion always uses this
/// constant; calibration only refines the centimeter ratio.
pub const US_PER_INCH: f64 = 148.0;

/// Closest distance the sensor can resolve.
pub const MIN_DISTANCE_CM: f64 = 2.0;

/// Farthest distance the sensor can resolve.
pub const MAX_DISTANCE_CM: f64 = 500.0;

/// Number of pulses taken during one calibration run.
pub const CALIBRATION_SAMPLES: usize = 100;

/// Width of the trigger pulse.
pub const TRIGGER_PULSE_US: u32 = 10;

/// Time the trigger line is held low before the pulse.
pub const TRIGGER_SETTLE_US: u32 = 1000;

/// The unit a measurement is reported in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, defmt::Format)]
pub enum DistanceUnit {
    /// Raw echo time in microseconds, no conversion applied.
    Microseconds,
    Centimeters,
    Inches,
}

/// Convert a raw echo timing to `unit`.
///
/// `us_per_cm` is the active centimeter ratio, calibrated or nominal. It
/// is ignored for [`DistanceUnit::Inches`], which is always converted
/// through [`US_PER_INCH`].
pub fn convert(micros: u64, unit: DistanceUnit, us_per_cm: f64) -> u64 {
    match unit {
        DistanceUnit::Microseconds => micros,
        DistanceUnit::Centimeters => floor(micros as f64 / us_per_cm) as u64,
        DistanceUnit::Inches => floor(micros as f64 / US_PER_INCH) as u64,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn microseconds_is_identity() {
        assert_eq!(convert(174, DistanceUnit::Microseconds, US_PER_CM_NOMINAL), 174);
        assert_eq!(convert(0, DistanceUnit::Microseconds, US_PER_CM_NOMINAL), 0);
    }

    #[test]
    fn centimeters_floor_divides_by_ratio() {
        assert_eq!(convert(580, DistanceUnit::Centimeters, 58.0), 10);
        assert_eq!(convert(174, DistanceUnit::Centimeters, 58.0), 3);
        // 130 / 58 = 2.24..., floored
        assert_eq!(convert(130, DistanceUnit::Centimeters, 58.0), 2);
        // 579 / 58 = 9.98..., floored
        assert_eq!(convert(579, DistanceUnit::Centimeters, 58.0), 9);
    }

    #[test]
    fn centimeters_uses_the_supplied_ratio() {
        assert_eq!(convert(580, DistanceUnit::Centimeters, 57.3), 10);
        assert_eq!(convert(580, DistanceUnit::Centimeters, 60.0), 9);
    }

    #[test]
    fn inches_ignore_the_calibrated_ratio() {
        assert_eq!(convert(174, DistanceUnit::Inches, 58.0), 1);
        assert_eq!(convert(174, DistanceUnit::Inches, 40.0), 1);
        assert_eq!(convert(296, DistanceUnit::Inches, 58.0), 2);
    }
}
