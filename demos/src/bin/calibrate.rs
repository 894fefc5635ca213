//! # Calibration Run
//!
//! Derive a device-specific pulse-time ratio. Place a flat object at a
//! known distance from the sensor, then run with that distance in
//! centimeters as the only argument:
//!
//! ```text
//! calibrate 20
//! ```
//!
//! Prints a progress bar while the 100 samples are taken, then the derived
//! ratio and its dispersion, and finally starts smoothed ranging with the
//! new calibration.

use calibrated_sonar::{Now, Sonar};
use rppal::gpio::Gpio;
use rppal::hal::Delay;
use std::io::Write;
use std::thread;
use std::time::{Duration, Instant};

const TRIGGER_PIN: u8 = 23;
const ECHO_PIN: u8 = 24;
const GAIN: f64 = 0.2;

struct MonotonicClock {
    start: Instant,
}

impl Now for MonotonicClock {
    fn now_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let reference_cm: f64 = std::env::args()
        .nth(1)
        .ok_or("usage: calibrate <reference-distance-cm>")?
        .parse()?;

    let gpio = Gpio::new()?;
    let mut trigger = gpio.get(TRIGGER_PIN)?.into_output();
    trigger.set_low();
    let echo = gpio.get(ECHO_PIN)?.into_input();

    let clock = MonotonicClock {
        start: Instant::now(),
    };
    let mut sensor = Sonar::new(trigger, echo, clock, Delay::new());

    println!("calibrating against {reference_cm} cm, hold the target still...");
    let calibration = sensor.calibrate_with_progress(reference_cm, |taken, total| {
        print!("\r[{:<50}] {taken}/{total}", "#".repeat(taken * 50 / total));
        let _ = std::io::stdout().flush();
    })?;
    println!();
    println!(
        "ratio: {:.2} us/cm, dispersion: {:.2} cm",
        calibration.us_per_cm(),
        calibration.dispersion_cm()
    );

    loop {
        match sensor.sample(GAIN) {
            Ok(estimate) => println!("{estimate:6.1} cm (raw {})", sensor.raw_distance()),
            Err(e) => eprintln!("measurement failed: {e:?}"),
        }
        thread::sleep(Duration::from_millis(200));
    }
}
