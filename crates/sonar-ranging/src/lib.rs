#![warn(missing_docs)]
#![doc = "Ultrasonic time-of-flight ranging for HC-SR04-class sensors."]
#![doc = ""]
#![doc = "This crate drives one trigger/echo pin pair through the"]
#![doc = "`sonar_hal::GpioController` seam: it fires the trigger pulse, times"]
#![doc = "the echo pulse with bounded polling, converts pulse width to"]
#![doc = "centimeters, and runs the whole cycle on a periodic sampling loop."]

pub mod distance;
pub mod error;
pub mod sampler;
pub mod sensor;

pub use distance::{EchoPulse, Reading, SPEED_OF_SOUND_CM_PER_US, SPEED_OF_SOUND_M_S};
pub use error::RangingError;
pub use sampler::{PeriodicSampler, SamplerConfig, SamplerHandle};
pub use sensor::{RangerConfig, UltrasonicRanger, DEFAULT_TIMEOUT_US};
