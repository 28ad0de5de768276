//! Hardware abstraction layer for the ultrasonic ranging rig.
//!
//! The central seam is the [`GpioController`] trait: two digital pins plus a
//! monotonic microsecond clock, which is everything the ranging core needs
//! from a platform. Two implementations ship with the crate:
//!
//! - [`embedded::EmbeddedPinPair`] wraps a pair of `embedded-hal` digital
//!   pins together with the host monotonic clock, for boards with a real
//!   sensor attached.
//! - [`sim::SimulatedHcSr04`] is a behavioral model of an HC-SR04 running on
//!   a virtual clock, used by the test suite and by hosts with no hardware.

pub mod embedded;
mod error;
mod gpio;
pub mod sim;

pub use error::HalError;
pub use gpio::{GpioController, Level, PinAssignment, PinDirection, PinId};
