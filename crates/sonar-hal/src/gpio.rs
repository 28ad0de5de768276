use std::fmt;

use serde::{Deserialize, Serialize};

use crate::HalError;

/// A digital pin identifier in the host platform's numbering scheme.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PinId(pub u8);

impl fmt::Display for PinId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u8> for PinId {
    fn from(raw: u8) -> Self {
        PinId(raw)
    }
}

/// Logic level of a digital pin.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    /// Logic low.
    Low,
    /// Logic high.
    High,
}

impl Level {
    /// Returns `true` for [`Level::High`].
    pub fn is_high(self) -> bool {
        matches!(self, Level::High)
    }
}

/// Direction a pin is configured for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinDirection {
    /// Pin is read by the controller.
    Input,
    /// Pin is driven by the controller.
    Output,
}

impl fmt::Display for PinDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PinDirection::Input => write!(f, "input"),
            PinDirection::Output => write!(f, "output"),
        }
    }
}

/// The trigger/echo pin pair of one ultrasonic sensor.
///
/// Built once at initialization and immutable for the life of the sensor
/// instance. Deserializing (e.g. from a TOML config) goes through the same
/// validation as [`PinAssignment::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "RawPinAssignment")]
pub struct PinAssignment {
    /// Output pin that fires the trigger pulse.
    pub trigger: PinId,
    /// Input pin that carries the echo pulse.
    pub echo: PinId,
}

impl PinAssignment {
    /// Construct a pin assignment.
    ///
    /// # Errors
    ///
    /// Returns `Err(HalError::PinConflict)` if both roles name the same pin.
    pub const fn new(trigger: PinId, echo: PinId) -> Result<Self, HalError> {
        if trigger.0 == echo.0 {
            return Err(HalError::PinConflict(trigger));
        }
        Ok(PinAssignment { trigger, echo })
    }
}

#[derive(Deserialize)]
struct RawPinAssignment {
    trigger: PinId,
    echo: PinId,
}

impl TryFrom<RawPinAssignment> for PinAssignment {
    type Error = HalError;

    fn try_from(raw: RawPinAssignment) -> Result<Self, Self::Error> {
        PinAssignment::new(raw.trigger, raw.echo)
    }
}

impl fmt::Display for PinAssignment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "(trig: {}, echo: {})", self.trigger, self.echo)
    }
}

/// Capability set required to drive one ultrasonic sensor: two digital pins
/// and a monotonic microsecond clock.
///
/// Methods take `&mut self` throughout, matching `embedded-hal` 1.0 digital
/// pins; a controller is exclusively owned by the sensor instance driving
/// it, so shared access never arises.
pub trait GpioController {
    /// Configure a pin's direction. Must be called exactly once per pin
    /// before the pin is used; reconfiguring is an error.
    fn configure(&mut self, pin: PinId, direction: PinDirection) -> Result<(), HalError>;

    /// Drive an output pin to `level`.
    fn set_level(&mut self, pin: PinId, level: Level) -> Result<(), HalError>;

    /// Read the instantaneous level of an input pin. Non-blocking.
    fn read_level(&mut self, pin: PinId) -> Result<Level, HalError>;

    /// Monotonically non-decreasing timestamp in microseconds since an
    /// arbitrary epoch. Only ever used for duration deltas.
    fn now_micros(&mut self) -> u64;
}
