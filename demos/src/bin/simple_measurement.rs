//! # Simple Measurement
//!
//! Single-shot ranging on a Raspberry Pi: one uncalibrated measurement per
//! second, printed in centimeters, inches and raw microseconds.
//!
//! ## Note
//!
//! Most hc-sr04 sensors are rated for 5V. The Raspberry Pi GPIO is 3.3V:
//! the trigger pin can be driven directly, but the echo pin must come back
//! through a voltage divider or it will damage the controller.

use calibrated_sonar::{DistanceUnit, Now, Sonar};
use rppal::gpio::Gpio;
use rppal::hal::Delay;
use std::thread;
use std::time::{Duration, Instant};

const TRIGGER_PIN: u8 = 23;
const ECHO_PIN: u8 = 24;

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
        match sensor.distance(DistanceUnit::Centimeters) {
            Ok(Some(cm)) => {
                let inches = sensor.distance(DistanceUnit::Inches)?.unwrap_or(0);
                let micros = sensor.distance(DistanceUnit::Microseconds)?.unwrap_or(0);
                println!("{cm} cm / {inches} in ({micros} us)");
            }
            Ok(None) => println!("no echo (nothing in range)"),
            Err(e) => eprintln!("measurement failed: {e:?}"),
        }
        thread::sleep(Duration::from_secs(1));
    }
}
