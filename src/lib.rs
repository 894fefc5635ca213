//! # calibrated-sonar
//!
//! This crate provides a blocking driver for HC-SR04 style ultrasonic
//! distance sensors, with optional self-calibration against a known
//! reference distance and recursive smoothing of the readings.
//!
//! The driver owns a trigger pin and an echo pin. Each measurement pulses
//! the trigger and times how long the echo pin stays high, bounded by a
//! timeout derived from the sensor's maximum range. Raw timings are
//! converted to distance through a microseconds-per-centimeter ratio: the
//! nominal speed-of-sound constant by default, or a device-specific ratio
//! derived by [`Sonar::calibrate`] from repeated pulses at a known
//! distance. [`Sonar::sample`] additionally gates readings against a
//! plausibility window and folds accepted readings into an exponential
//! moving average, so one glitched echo never jolts the reported distance.
//!
//! "No echo within the timeout" is an expected outcome, not an error: the
//! measurement operations report it as `Ok(None)` and the sampler holds
//! the last good estimate.
//!
//! # Example
//!
//! ```rust, ignore
//! use calibrated_sonar::{DistanceUnit, Now, Sonar};
//! use rppal::gpio::Gpio;
//! use rppal::hal::Delay;
//! use std::time::Instant;
//!
//! struct MonotonicClock {
//!     start: Instant,
//! }
//!
//! impl Now for MonotonicClock {
//!     fn now_micros(&self) -> u64 {
//!         self.start.elapsed().as_micros() as u64
//!     }
//! }
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let gpio = Gpio::new()?;
//!     let mut trigger = gpio.get(23)?.into_output();
//!     trigger.set_low();
//!     // The echo pin must be configured with its pull resistor disabled.
//!     let echo = gpio.get(24)?.into_input();
//!
//!     let clock = MonotonicClock { start: Instant::now() };
//!     let mut sensor = Sonar::new(trigger, echo, clock, Delay::new());
//!
//!     // Calibrate against an object placed 20 cm from the sensor.
//!     let calibration = sensor.calibrate(20.0)?;
//!     println!("ratio: {} us/cm", calibration.us_per_cm());
//!
//!     loop {
//!         let estimate = sensor.sample(0.2)?;
//!         println!("distance: {:.1} cm (raw {})", estimate, sensor.raw_distance());
//!     }
//! }
//! ```

#![no_std]

mod calibration;
mod estimator;
pub mod units;

pub use calibration::{Calibration, RunningMean};
pub use estimator::Estimator;
pub use units::{convert, DistanceUnit};

use embedded_hal::{
    delay::DelayNs,
    digital::{Error as DigitalError, ErrorKind, InputPin, OutputPin},
};

use units::{CALIBRATION_SAMPLES, TRIGGER_PULSE_US, TRIGGER_SETTLE_US};

/// Monotonic microsecond clock, used to time the echo pulse.
pub trait Now {
    /// The time elapsed since startup in microseconds.
    fn now_micros(&self) -> u64;
}

/// Driver error. Only pin I/O faults surface here; a missing echo is
/// reported as `Ok(None)` by the measurement operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// The echo pin was already high when a measurement started.
    EchoAlreadyHigh,
    /// Driving the trigger pin failed.
    Trigger(ErrorKind),
    /// Reading the echo pin failed.
    Echo(ErrorKind),
}

impl core::fmt::Display for Error {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Error::EchoAlreadyHigh => write!(f, "echo pin is already high"),
            Error::Trigger(kind) => write!(f, "trigger pin error: {kind:?}"),
            Error::Echo(kind) => write!(f, "echo pin error: {kind:?}"),
        }
    }
}

impl core::error::Error for Error {}

/// Ultrasonic ranging driver for one trigger/echo pin pair.
///
/// Requires a trigger output pin, an echo input pin, a clock providing
/// microseconds via the [`Now`] trait, and a blocking delay implementing
/// [`DelayNs`]. Pins must be pre-configured by the caller, with any pull
/// resistor on the trigger line disabled.
///
/// The driver is single-threaded and synchronous: every measurement
/// blocks the caller for up to the active timeout (the echo time of the
/// maximum supported range, tens of milliseconds worst case). Callers
/// serialize [`Sonar::sample`] and [`Sonar::calibrate`] themselves, one
/// ranging cycle per control loop tick.
pub struct Sonar<TRIG, ECHO, CLOCK, DELAY> {
    trigger: TRIG,
    echo: ECHO,
    clock: CLOCK,
    delay: DELAY,
    calibration: Calibration,
    estimator: Estimator,
}

impl<TRIG, ECHO, CLOCK, DELAY> Sonar<TRIG, ECHO, CLOCK, DELAY>
where
    TRIG: OutputPin,
    ECHO: InputPin,
    CLOCK: Now,
    DELAY: DelayNs,
{
    /// Initialize a new driver with the nominal calibration and a zeroed
    /// estimate. Run [`Sonar::calibrate`] afterwards to derive a
    /// device-specific ratio.
    pub fn new(trigger: TRIG, echo: ECHO, clock: CLOCK, delay: DELAY) -> Self {
        Self {
            trigger,
            echo,
            clock,
            delay,
            calibration: Calibration::default(),
            estimator: Estimator::new(),
        }
    }

    /// Self-calibrate against an object at a known distance.
    ///
    /// Takes 100 pulses at the current timeout and derives the
    /// microseconds-per-centimeter ratio and its dispersion from them,
    /// replacing the active calibration and its plausibility window.
    /// Samples that time out enter the average at the timeout bound, so a
    /// run with no echo at all still installs a (degenerate) ratio; a
    /// warning is logged but calibration never blocks indefinitely.
    ///
    /// A non-positive `reference_cm` skips calibration entirely and
    /// returns the active calibration unchanged.
    pub fn calibrate(&mut self, reference_cm: f64) -> Result<Calibration, Error> {
        self.calibrate_with_progress(reference_cm, |_, _| {})
    }

    /// [`Sonar::calibrate`] with a per-sample progress hook, called as
    /// `progress(taken, total)` after each pulse. The hook is the seam
    /// for on-device feedback such as a progress bar.
    pub fn calibrate_with_progress(
        &mut self,
        reference_cm: f64,
        mut progress: impl FnMut(usize, usize),
    ) -> Result<Calibration, Error> {
        if reference_cm <= 0.0 {
            defmt::warn!(
                "calibration skipped: reference distance {} cm is not positive",
                reference_cm
            );
            return Ok(self.calibration);
        }

        // Sample at the pre-calibration timeout.
        let timeout_us = self.calibration.max_pulse_us() as u64;
        let mut times = [0u64; CALIBRATION_SAMPLES];
        let mut timeouts = 0usize;
        for (i, slot) in times.iter_mut().enumerate() {
            *slot = match self.measure_pulse(timeout_us)? {
                Some(t) => t,
                None => {
                    timeouts += 1;
                    timeout_us
                }
            };
            progress(i + 1, CALIBRATION_SAMPLES);
        }
        if timeouts == CALIBRATION_SAMPLES {
            defmt::warn!(
                "degenerate calibration: all {} samples timed out",
                CALIBRATION_SAMPLES
            );
        }

        self.calibration = Calibration::from_samples(&times, reference_cm);
        defmt::debug!(
            "calibrated: {} us/cm, dispersion {} cm",
            self.calibration.us_per_cm(),
            self.calibration.dispersion_cm()
        );
        Ok(self.calibration)
    }

    /// Raw echo duration in microseconds for a single pulse, bypassing
    /// conversion and the smoothing filter. `None` when no echo arrives
    /// within the timeout.
    pub fn ping(&mut self) -> Result<Option<u64>, Error> {
        let timeout_us = self.calibration.max_pulse_us() as u64;
        self.measure_pulse(timeout_us)
    }

    /// Single-shot measurement converted to `unit`, independent of the
    /// smoothing estimator. Centimeters use the active (possibly
    /// calibrated) ratio; inches always use the nominal inch constant.
    pub fn distance(&mut self, unit: DistanceUnit) -> Result<Option<u64>, Error> {
        let measured = self.ping()?;
        Ok(measured.map(|t| convert(t, unit, self.calibration.us_per_cm())))
    }

    /// One ranging cycle: measure, gate, smooth.
    ///
    /// A reading outside the plausible echo window (including a timeout)
    /// is dropped and the previous estimate is returned unchanged; the
    /// driver degrades to the last known good value rather than reporting
    /// "no reading". An accepted reading is converted to whole
    /// centimeters and folded into the exponential moving average with
    /// the given `gain` in `(0, 1]`.
    ///
    /// Rejected readings are not retried; the caller's next scheduled
    /// cycle is the retry mechanism.
    pub fn sample(&mut self, gain: f64) -> Result<f64, Error> {
        debug_assert!(gain > 0.0 && gain <= 1.0);
        let estimate = match self.ping()? {
            Some(t) if self.calibration.plausible(t) => {
                let raw_cm = convert(t, DistanceUnit::Centimeters, self.calibration.us_per_cm());
                self.estimator.accept(raw_cm, gain)
            }
            _ => {
                defmt::trace!("sample rejected, holding estimate");
                self.estimator.hold()
            }
        };
        Ok(estimate)
    }

    /// Last accepted unfiltered reading in whole centimeters, without
    /// taking a new measurement. 0 until a sample has been accepted.
    pub fn raw_distance(&self) -> u64 {
        self.estimator.raw_cm()
    }

    /// Current smoothed estimate without taking a new measurement.
    pub fn estimated_distance(&self) -> f64 {
        self.estimator.estimated_cm()
    }

    /// The active calibration.
    pub fn calibration(&self) -> &Calibration {
        &self.calibration
    }

    /// Pulse the trigger and time the echo pin's high phase. One
    /// `timeout_us` deadline covers the whole measurement: waiting for
    /// the rising edge eats into the budget left for the high phase.
    ///
    /// Blocks the caller; performs no retries. Returns `Ok(None)` when
    /// the echo never rises or never falls within the deadline.
    fn measure_pulse(&mut self, timeout_us: u64) -> Result<Option<u64>, Error> {
        match self.echo.is_high() {
            Ok(true) => return Err(Error::EchoAlreadyHigh),
            Ok(false) => (),
            Err(e) => return Err(Error::Echo(e.kind())),
        }

        // Trigger waveform: settle low, then a fixed-width high pulse.
        self.trigger.set_low().map_err(|e| Error::Trigger(e.kind()))?;
        self.delay.delay_us(TRIGGER_SETTLE_US);
        self.trigger.set_high().map_err(|e| Error::Trigger(e.kind()))?;
        self.delay.delay_us(TRIGGER_PULSE_US);
        self.trigger.set_low().map_err(|e| Error::Trigger(e.kind()))?;

        let deadline = self.clock.now_micros() + timeout_us;
        loop {
            match self.echo.is_high() {
                Ok(true) => break,
                Ok(false) => (),
                Err(e) => return Err(Error::Echo(e.kind())),
            }
            if self.clock.now_micros() > deadline {
                return Ok(None);
            }
        }
        let start = self.clock.now_micros();

        loop {
            match self.echo.is_high() {
                Ok(false) => break,
                Ok(true) => (),
                Err(e) => return Err(Error::Echo(e.kind())),
            }
            if self.clock.now_micros() > deadline {
                return Ok(None);
            }
        }
        let end = self.clock.now_micros();

        Ok(Some(end - start))
    }
}
