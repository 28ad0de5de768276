//! Pulse-width to distance conversion.
//!
//! A measured echo pulse covers the round trip to the target and back, so
//! the one-way distance is half the pulse width times the speed of sound.

use core::fmt;

/// Speed of sound in dry air at 20 °C, in meters per second.
pub const SPEED_OF_SOUND_M_S: f64 = 343.0;

/// Speed of sound in the centimeters-per-microsecond the pulse arithmetic
/// wants (0.0343).
pub const SPEED_OF_SOUND_CM_PER_US: f64 = SPEED_OF_SOUND_M_S * 100.0 / 1_000_000.0;

/// One measured echo-high duration, in microseconds.
///
/// A timed-out cycle is never represented as an `EchoPulse`; it is a
/// [`RangingError`](crate::RangingError) variant instead, so a zero pulse
/// unambiguously means "echo observed, zero width".
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EchoPulse {
    duration_us: u64,
}

impl EchoPulse {
    /// Wrap a raw echo-high duration.
    pub const fn new(duration_us: u64) -> Self {
        EchoPulse { duration_us }
    }

    /// The raw duration in microseconds.
    pub const fn duration_us(self) -> u64 {
        self.duration_us
    }

    /// Convert the round-trip pulse width to a one-way distance in
    /// centimeters.
    pub fn distance_cm(self) -> f64 {
        (self.duration_us as f64 / 2.0) * SPEED_OF_SOUND_CM_PER_US
    }
}

impl fmt::Display for EchoPulse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} us", self.duration_us)
    }
}

/// Outcome of one completed measurement cycle, as reported to consumers.
///
/// Carries exactly one of: a distance in centimeters, or the explicit
/// absence of one. No timestamps, no raw durations; consumers decide how to
/// log or transmit it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Reading {
    /// Distance to the target in centimeters.
    Distance(f64),
    /// No echo was observed this cycle; nothing can be said about distance.
    NoEcho,
}

impl Reading {
    /// `true` if this reading carries no distance.
    pub fn is_no_echo(self) -> bool {
        matches!(self, Reading::NoEcho)
    }
}

impl From<EchoPulse> for Reading {
    fn from(pulse: EchoPulse) -> Self {
        Reading::Distance(pulse.distance_cm())
    }
}

impl fmt::Display for Reading {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Reading::Distance(cm) => write!(f, "{:.2} cm", cm),
            Reading::NoEcho => write!(f, "no echo"),
        }
    }
}
