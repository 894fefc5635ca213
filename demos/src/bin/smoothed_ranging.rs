//! # Smoothed Ranging
//!
//! Continuous ranging through the driver's recursive smoothing filter.
//! Out-of-range and implausible readings are dropped by the driver and the
//! last good estimate carries over, so the printed value stays steady even
//! when individual echoes glitch. Lower the gain for a calmer signal,
//! raise it towards 1.0 to track fast-moving targets.

use calibrated_sonar::{Now, Sonar};
use rppal::gpio::Gpio;
use rppal::hal::Delay;
use std::thread;
use std::time::{Duration, Instant};

const TRIGGER_PIN: u8 = 23;
const ECHO_PIN: u8 = 24;
const GAIN: f64 = 0.2;
const MEASUREMENT_INTERVAL: Duration = Duration::from_millis(200);

struct MonotonicClock {
    start: Instant,
}

impl Now for MonotonicClock {
    fn now_micros(&self) -> u64 {
        self.start.elapsed().as_micros() as u64
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let gpio = Gpio::new()?;
    let mut trigger = gpio.get(TRIGGER_PIN)?.into_output();
    trigger.set_low();
    let echo = gpio.get(ECHO_PIN)?.into_input();

    let clock = MonotonicClock {
        start: Instant::now(),
    };
    let mut sensor = Sonar::new(trigger, echo, clock, Delay::new());

    loop {
        match sensor.sample(GAIN) {
            Ok(estimate) => {
                println!("{estimate:6.1} cm (raw {})", sensor.raw_distance());
            }
            Err(e) => eprintln!("measurement failed: {e:?}"),
        }
        thread::sleep(MEASUREMENT_INTERVAL);
    }
}
