//! One-shot trigger/echo measurement cycles.

use sonar_hal::{GpioController, Level, PinAssignment, PinDirection};
use tracing::{debug, trace};

use crate::distance::{EchoPulse, Reading};
use crate::error::RangingError;

/// How long the trigger line is held low before a pulse, to give the sensor
/// a clean edge.
const TRIGGER_SETTLE_US: u64 = 4;

/// Trigger pulse width required by HC-SR04-class sensors.
const TRIGGER_PULSE_US: u64 = 10;

/// Default bound on each echo polling loop. 30 ms comfortably covers the
/// sensor's maximum unambiguous round trip (4 m is about 23.3 ms).
pub const DEFAULT_TIMEOUT_US: u64 = 30_000;

/// Tuning knobs for an [`UltrasonicRanger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RangerConfig {
    /// Bound on each echo polling loop, in microseconds.
    pub timeout_us: u64,
}

impl Default for RangerConfig {
    fn default() -> Self {
        RangerConfig {
            timeout_us: DEFAULT_TIMEOUT_US,
        }
    }
}

/// Drives one HC-SR04-class sensor through a [`GpioController`].
///
/// The ranger exclusively owns its controller for its whole life, which is
/// what makes the blocking poll loops in [`measure_pulse`] safe: nothing
/// else can touch the pins while a cycle is in flight.
///
/// [`measure_pulse`]: UltrasonicRanger::measure_pulse
pub struct UltrasonicRanger<G: GpioController> {
    gpio: G,
    pins: PinAssignment,
    timeout_us: u64,
}

impl<G: GpioController> UltrasonicRanger<G> {
    /// Take ownership of `gpio`, configure the trigger as a low output and
    /// the echo as an input, and return the ready sensor instance.
    ///
    /// # Errors
    ///
    /// Configuration failures are setup-class and fatal: the caller must
    /// not proceed to sampling. Also rejects a zero `timeout_us`.
    pub fn new(
        mut gpio: G,
        pins: PinAssignment,
        config: RangerConfig,
    ) -> Result<Self, RangingError> {
        if config.timeout_us == 0 {
            return Err(RangingError::InvalidTimeout("must be positive"));
        }
        gpio.configure(pins.trigger, PinDirection::Output)?;
        gpio.configure(pins.echo, PinDirection::Input)?;
        gpio.set_level(pins.trigger, Level::Low)?;
        debug!(%pins, timeout_us = config.timeout_us, "ultrasonic ranger ready");
        Ok(UltrasonicRanger {
            gpio,
            pins,
            timeout_us: config.timeout_us,
        })
    }

    /// The pin pair this ranger drives.
    pub fn pins(&self) -> PinAssignment {
        self.pins
    }

    /// Run one trigger-measure cycle and return the echo pulse width.
    ///
    /// Fires the 10 µs trigger pulse, then polls the echo pin for the
    /// low→high and high→low transitions. Each polling loop is bounded by
    /// the configured timeout, so a disconnected or faulty sensor costs at
    /// most two timeout windows, never an indefinite hang.
    ///
    /// # Errors
    ///
    /// [`RangingError::EchoStartTimeout`] / [`RangingError::EchoEndTimeout`]
    /// when the respective transition is not observed in time;
    /// [`RangingError::Gpio`] on controller faults.
    pub fn measure_pulse(&mut self) -> Result<EchoPulse, RangingError> {
        self.send_trigger()?;
        let t_start = self.wait_for_edge(Level::High)?;
        let t_end = self.wait_for_edge(Level::Low)?;
        let pulse = EchoPulse::new(t_end - t_start);
        trace!(%pulse, "echo pulse measured");
        Ok(pulse)
    }

    /// Run one cycle and fold the timeout outcomes into [`Reading::NoEcho`].
    ///
    /// This is the sampler-facing entry point: a cycle either yields a
    /// distance, or the explicit absence of one, or a fatal controller
    /// fault. Partial values do not exist.
    pub fn read(&mut self) -> Result<Reading, RangingError> {
        match self.measure_pulse() {
            Ok(pulse) => Ok(Reading::from(pulse)),
            Err(e) if e.is_timeout() => {
                debug!(error = %e, "cycle yielded no echo");
                Ok(Reading::NoEcho)
            }
            Err(e) => Err(e),
        }
    }

    fn send_trigger(&mut self) -> Result<(), RangingError> {
        self.gpio.set_level(self.pins.trigger, Level::Low)?;
        self.spin_for(TRIGGER_SETTLE_US);
        self.gpio.set_level(self.pins.trigger, Level::High)?;
        self.spin_for(TRIGGER_PULSE_US);
        self.gpio.set_level(self.pins.trigger, Level::Low)?;
        Ok(())
    }

    /// Busy-wait on the controller clock. The windows involved are a few
    /// microseconds, far below what a scheduler sleep can hold.
    fn spin_for(&mut self, us: u64) {
        let until = self.gpio.now_micros().saturating_add(us);
        while self.gpio.now_micros() < until {}
    }

    /// Poll the echo pin until it reads `want`, returning the timestamp
    /// captured at the observed transition. The polling granularity is the
    /// accuracy bound; the timestamp is taken once, not rewritten while
    /// waiting.
    fn wait_for_edge(&mut self, want: Level) -> Result<u64, RangingError> {
        let started = self.gpio.now_micros();
        let deadline = started.saturating_add(self.timeout_us);
        loop {
            let now = self.gpio.now_micros();
            if self.gpio.read_level(self.pins.echo)? == want {
                return Ok(now);
            }
            if now >= deadline {
                return Err(match want {
                    Level::High => RangingError::EchoStartTimeout(now - started),
                    Level::Low => RangingError::EchoEndTimeout(now - started),
                });
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use sonar_hal::sim::{EchoBehavior, SimulatedHcSr04};
    use sonar_hal::{HalError, PinAssignment, PinId};

    use super::*;

    fn ranger_with(
        behavior: EchoBehavior,
    ) -> (SimulatedHcSr04, UltrasonicRanger<SimulatedHcSr04>) {
        let pins = PinAssignment::new(PinId(4), PinId(5)).unwrap();
        let sim = SimulatedHcSr04::new(pins, behavior);
        let ranger = UltrasonicRanger::new(sim.clone(), pins, RangerConfig::default()).unwrap();
        (sim, ranger)
    }

    #[test]
    fn zero_timeout_is_rejected() {
        let pins = PinAssignment::new(PinId(4), PinId(5)).unwrap();
        let sim = SimulatedHcSr04::new(pins, EchoBehavior::Silent);
        let result = UltrasonicRanger::new(sim, pins, RangerConfig { timeout_us: 0 });
        assert!(matches!(result, Err(RangingError::InvalidTimeout(_))));
    }

    #[test]
    fn configuration_faults_are_fatal_at_construction() {
        let pins = PinAssignment::new(PinId(4), PinId(5)).unwrap();
        let sim = SimulatedHcSr04::new(pins, EchoBehavior::Silent);
        let _first = UltrasonicRanger::new(sim.clone(), pins, RangerConfig::default()).unwrap();
        // The pins are already owned; a second instance must refuse to start.
        let second = UltrasonicRanger::new(sim, pins, RangerConfig::default());
        assert_eq!(
            second.err(),
            Some(RangingError::Gpio(HalError::AlreadyConfigured(PinId(4))))
        );
    }

    #[test]
    fn measures_the_scheduled_pulse_width() {
        // 100 cm round trip: 200 / 0.0343 = 5831 µs (rounded).
        let (_sim, mut ranger) = ranger_with(EchoBehavior::Reflect { distance_cm: 100.0 });
        let pulse = ranger.measure_pulse().unwrap();
        let deviation = (pulse.duration_us() as i64 - 5_831).unsigned_abs();
        assert!(deviation <= 4, "pulse off by {} us", deviation);
    }

    #[test]
    fn read_reports_the_distance() {
        let (_sim, mut ranger) = ranger_with(EchoBehavior::Reflect { distance_cm: 100.0 });
        match ranger.read().unwrap() {
            Reading::Distance(cm) => assert!((cm - 100.0).abs() < 0.2, "got {} cm", cm),
            Reading::NoEcho => panic!("expected a distance"),
        }
    }

    #[test]
    fn silent_sensor_times_out_within_the_bound() {
        let (sim, mut ranger) = ranger_with(EchoBehavior::Silent);
        let before = sim.virtual_now_us();
        let result = ranger.measure_pulse();
        let elapsed = sim.virtual_now_us() - before;

        assert!(matches!(
            result,
            Err(RangingError::EchoStartTimeout(waited)) if waited >= DEFAULT_TIMEOUT_US
        ));
        // Trigger sequence plus one bounded poll loop, nothing more.
        assert!(
            elapsed <= DEFAULT_TIMEOUT_US + 64,
            "spent {} us waiting",
            elapsed
        );
    }

    #[test]
    fn stuck_high_echo_times_out_without_a_partial_value() {
        let (_sim, mut ranger) = ranger_with(EchoBehavior::StuckHigh);
        assert!(matches!(
            ranger.measure_pulse(),
            Err(RangingError::EchoEndTimeout(waited)) if waited >= DEFAULT_TIMEOUT_US
        ));
    }

    #[test]
    fn read_folds_timeouts_into_no_echo() {
        let (_sim, mut ranger) = ranger_with(EchoBehavior::Silent);
        assert_eq!(ranger.read().unwrap(), Reading::NoEcho);
    }

    #[test]
    fn cycles_are_independent() {
        let (sim, mut ranger) = ranger_with(EchoBehavior::Silent);
        assert_eq!(ranger.read().unwrap(), Reading::NoEcho);

        // A timeout in one cycle leaves no residue: the next cycle measures
        // a fresh target cleanly.
        sim.set_target_distance_cm(50.0);
        match ranger.read().unwrap() {
            Reading::Distance(cm) => assert!((cm - 50.0).abs() < 0.2, "got {} cm", cm),
            Reading::NoEcho => panic!("expected a distance after recovery"),
        }

        sim.set_behavior(EchoBehavior::Silent);
        assert_eq!(ranger.read().unwrap(), Reading::NoEcho);
    }
}
