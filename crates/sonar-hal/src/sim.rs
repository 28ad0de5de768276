//! Behavioral HC-SR04 model on a virtual clock.
//!
//! Every [`GpioController`] operation advances the virtual clock by one
//! microsecond, which stands in for the bus/polling granularity of a real
//! platform. A valid trigger pulse (held high for at least 10 µs) schedules
//! an echo window according to the configured [`EchoBehavior`]; the echo pin
//! then reads high exactly inside that window. Tests and the host demo get
//! deterministic, instant "hardware" out of this, including the failure
//! shapes a real sensor produces (no echo at all, echo stuck high).

use std::sync::Arc;

use parking_lot::Mutex;
use tracing::trace;

use crate::{GpioController, HalError, Level, PinAssignment, PinDirection, PinId};

/// Virtual time consumed by each controller operation, in microseconds.
pub const POLL_COST_US: u64 = 1;

/// Delay between the end of the trigger pulse and the start of the echo
/// pulse, covering the sensor's 8-cycle sonic burst.
pub const BURST_DELAY_US: u64 = 200;

/// Minimum trigger-high duration the sensor responds to.
pub const MIN_TRIGGER_PULSE_US: u64 = 10;

// Same constant the ranging core uses; the model needs the inverse mapping
// (centimeters back to an echo-high duration).
const SPEED_OF_SOUND_CM_PER_US: f64 = 0.0343;

/// What the simulated sensor does after a valid trigger pulse.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EchoBehavior {
    /// An object sits `distance_cm` away; the echo pulse width is the
    /// round-trip time of sound over that distance.
    Reflect {
        /// Simulated target distance in centimeters.
        distance_cm: f64,
    },
    /// The echo line never rises (sensor disconnected or target out of
    /// range).
    Silent,
    /// The echo line rises and never falls (faulty sensor).
    StuckHigh,
}

struct SimState {
    now_us: u64,
    behavior: EchoBehavior,
    pins: PinAssignment,
    trigger_configured: bool,
    echo_configured: bool,
    trigger_high_at: Option<u64>,
    /// Half-open `[rise, fall)` window during which the echo pin reads high.
    echo_window: Option<(u64, u64)>,
}

impl SimState {
    fn tick(&mut self) {
        self.now_us += POLL_COST_US;
    }

    fn echo_level(&self) -> Level {
        match self.echo_window {
            Some((rise, fall)) if self.now_us >= rise && self.now_us < fall => Level::High,
            _ => Level::Low,
        }
    }

    fn finish_trigger_pulse(&mut self) {
        let Some(high_at) = self.trigger_high_at.take() else {
            return;
        };
        let held_us = self.now_us - high_at;
        if held_us < MIN_TRIGGER_PULSE_US {
            trace!(held_us, "runt trigger pulse ignored");
            return;
        }
        self.echo_window = match self.behavior {
            EchoBehavior::Reflect { distance_cm } => {
                let pulse_us = ((2.0 * distance_cm) / SPEED_OF_SOUND_CM_PER_US).round() as u64;
                let rise = self.now_us + BURST_DELAY_US;
                Some((rise, rise + pulse_us))
            }
            EchoBehavior::Silent => None,
            EchoBehavior::StuckHigh => Some((self.now_us + BURST_DELAY_US, u64::MAX)),
        };
        trace!(held_us, window = ?self.echo_window, "trigger pulse accepted");
    }
}

/// Handle to one simulated sensor. Cloning shares the underlying state, so
/// a test or demo can keep a handle and retune the behavior while a sensor
/// instance owns another clone.
#[derive(Clone)]
pub struct SimulatedHcSr04 {
    inner: Arc<Mutex<SimState>>,
}

impl SimulatedHcSr04 {
    /// Create a simulated sensor on the given pin pair.
    pub fn new(pins: PinAssignment, behavior: EchoBehavior) -> Self {
        SimulatedHcSr04 {
            inner: Arc::new(Mutex::new(SimState {
                now_us: 0,
                behavior,
                pins,
                trigger_configured: false,
                echo_configured: false,
                trigger_high_at: None,
                echo_window: None,
            })),
        }
    }

    /// Replace the echo behavior. Takes effect from the next trigger pulse;
    /// a window already scheduled for the cycle in flight is untouched.
    pub fn set_behavior(&self, behavior: EchoBehavior) {
        self.inner.lock().behavior = behavior;
    }

    /// Shorthand for [`EchoBehavior::Reflect`] at the given distance.
    pub fn set_target_distance_cm(&self, distance_cm: f64) {
        self.set_behavior(EchoBehavior::Reflect { distance_cm });
    }

    /// Current virtual time, without advancing it. Test introspection only.
    pub fn virtual_now_us(&self) -> u64 {
        self.inner.lock().now_us
    }
}

impl GpioController for SimulatedHcSr04 {
    fn configure(&mut self, pin: PinId, direction: PinDirection) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        state.tick();
        if pin == state.pins.trigger {
            if direction != PinDirection::Output {
                return Err(HalError::WrongDirection { pin, wanted: direction });
            }
            if state.trigger_configured {
                return Err(HalError::AlreadyConfigured(pin));
            }
            state.trigger_configured = true;
        } else if pin == state.pins.echo {
            if direction != PinDirection::Input {
                return Err(HalError::WrongDirection { pin, wanted: direction });
            }
            if state.echo_configured {
                return Err(HalError::AlreadyConfigured(pin));
            }
            state.echo_configured = true;
        } else {
            return Err(HalError::UnknownPin(pin));
        }
        Ok(())
    }

    fn set_level(&mut self, pin: PinId, level: Level) -> Result<(), HalError> {
        let mut state = self.inner.lock();
        state.tick();
        if pin == state.pins.echo {
            return Err(HalError::WrongDirection { pin, wanted: PinDirection::Output });
        }
        if pin != state.pins.trigger {
            return Err(HalError::UnknownPin(pin));
        }
        if !state.trigger_configured {
            return Err(HalError::Unconfigured(pin));
        }
        match level {
            Level::High => {
                // A fresh trigger pulse starts a fresh cycle; whatever the
                // previous cycle scheduled is stale now.
                state.echo_window = None;
                state.trigger_high_at = Some(state.now_us);
            }
            Level::Low => state.finish_trigger_pulse(),
        }
        Ok(())
    }

    fn read_level(&mut self, pin: PinId) -> Result<Level, HalError> {
        let mut state = self.inner.lock();
        state.tick();
        if pin == state.pins.trigger {
            return Err(HalError::WrongDirection { pin, wanted: PinDirection::Input });
        }
        if pin != state.pins.echo {
            return Err(HalError::UnknownPin(pin));
        }
        if !state.echo_configured {
            return Err(HalError::Unconfigured(pin));
        }
        Ok(state.echo_level())
    }

    fn now_micros(&mut self) -> u64 {
        let mut state = self.inner.lock();
        state.tick();
        state.now_us
    }
}
