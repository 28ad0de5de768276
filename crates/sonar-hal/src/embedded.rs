//! [`GpioController`] backed by a pair of `embedded-hal` digital pins.

use std::time::Instant;

use embedded_hal::digital::{InputPin, OutputPin};
use tracing::debug;

use crate::{GpioController, HalError, Level, PinAssignment, PinDirection, PinId};

/// Trigger/echo pin pair over `embedded-hal` 1.0 digital pins, with the
/// host's monotonic clock supplying `now_micros`.
///
/// The pin types are whatever the platform HAL provides (`rppal`,
/// `linux-embedded-hal`, a board support crate); this adapter only adds the
/// id-based bookkeeping the ranging core expects.
pub struct EmbeddedPinPair<O, I> {
    pins: PinAssignment,
    trigger: O,
    echo: I,
    trigger_configured: bool,
    echo_configured: bool,
    epoch: Instant,
}

impl<O, I> EmbeddedPinPair<O, I> {
    /// Wrap a concrete output/input pin pair under the given ids.
    pub fn new(pins: PinAssignment, trigger: O, echo: I) -> Self {
        EmbeddedPinPair {
            pins,
            trigger,
            echo,
            trigger_configured: false,
            echo_configured: false,
            epoch: Instant::now(),
        }
    }
}

impl<O: OutputPin, I: InputPin> GpioController for EmbeddedPinPair<O, I> {
    fn configure(&mut self, pin: PinId, direction: PinDirection) -> Result<(), HalError> {
        if pin == self.pins.trigger {
            if direction != PinDirection::Output {
                return Err(HalError::WrongDirection { pin, wanted: direction });
            }
            if self.trigger_configured {
                return Err(HalError::AlreadyConfigured(pin));
            }
            // Start from a defined idle state.
            self.trigger
                .set_low()
                .map_err(|_| HalError::Backend("set_low"))?;
            self.trigger_configured = true;
        } else if pin == self.pins.echo {
            if direction != PinDirection::Input {
                return Err(HalError::WrongDirection { pin, wanted: direction });
            }
            if self.echo_configured {
                return Err(HalError::AlreadyConfigured(pin));
            }
            self.echo_configured = true;
        } else {
            return Err(HalError::UnknownPin(pin));
        }
        debug!(%pin, %direction, "pin configured");
        Ok(())
    }

    fn set_level(&mut self, pin: PinId, level: Level) -> Result<(), HalError> {
        if pin == self.pins.echo {
            return Err(HalError::WrongDirection { pin, wanted: PinDirection::Output });
        }
        if pin != self.pins.trigger {
            return Err(HalError::UnknownPin(pin));
        }
        if !self.trigger_configured {
            return Err(HalError::Unconfigured(pin));
        }
        match level {
            Level::High => self.trigger.set_high().map_err(|_| HalError::Backend("set_high")),
            Level::Low => self.trigger.set_low().map_err(|_| HalError::Backend("set_low")),
        }
    }

    fn read_level(&mut self, pin: PinId) -> Result<Level, HalError> {
        if pin == self.pins.trigger {
            return Err(HalError::WrongDirection { pin, wanted: PinDirection::Input });
        }
        if pin != self.pins.echo {
            return Err(HalError::UnknownPin(pin));
        }
        if !self.echo_configured {
            return Err(HalError::Unconfigured(pin));
        }
        let high = self
            .echo
            .is_high()
            .map_err(|_| HalError::Backend("is_high"))?;
        Ok(if high { Level::High } else { Level::Low })
    }

    fn now_micros(&mut self) -> u64 {
        self.epoch.elapsed().as_micros() as u64
    }
}

#[cfg(test)]
mod tests {
    use std::convert::Infallible;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    use super::*;

    /// Pin level shared between a fake pin and the test body.
    #[derive(Clone, Default)]
    struct SharedLevel(Arc<AtomicBool>);

    impl SharedLevel {
        fn is_high(&self) -> bool {
            self.0.load(Ordering::SeqCst)
        }

        fn set(&self, high: bool) {
            self.0.store(high, Ordering::SeqCst);
        }
    }

    struct FakeOutput(SharedLevel);

    impl embedded_hal::digital::ErrorType for FakeOutput {
        type Error = Infallible;
    }

    impl OutputPin for FakeOutput {
        fn set_low(&mut self) -> Result<(), Self::Error> {
            self.0.set(false);
            Ok(())
        }

        fn set_high(&mut self) -> Result<(), Self::Error> {
            self.0.set(true);
            Ok(())
        }
    }

    struct FakeInput(SharedLevel);

    impl embedded_hal::digital::ErrorType for FakeInput {
        type Error = Infallible;
    }

    impl InputPin for FakeInput {
        fn is_high(&mut self) -> Result<bool, Self::Error> {
            Ok(self.0.is_high())
        }

        fn is_low(&mut self) -> Result<bool, Self::Error> {
            Ok(!self.0.is_high())
        }
    }

    fn pair() -> (EmbeddedPinPair<FakeOutput, FakeInput>, SharedLevel, SharedLevel) {
        let pins = PinAssignment::new(PinId(4), PinId(5)).unwrap();
        let trigger_level = SharedLevel::default();
        let echo_level = SharedLevel::default();
        let pair = EmbeddedPinPair::new(
            pins,
            FakeOutput(trigger_level.clone()),
            FakeInput(echo_level.clone()),
        );
        (pair, trigger_level, echo_level)
    }

    #[test]
    fn configure_routes_by_role() {
        let (mut gpio, _, _) = pair();
        assert!(gpio.configure(PinId(4), PinDirection::Output).is_ok());
        assert!(gpio.configure(PinId(5), PinDirection::Input).is_ok());
        assert_eq!(
            gpio.configure(PinId(4), PinDirection::Output),
            Err(HalError::AlreadyConfigured(PinId(4)))
        );
        assert_eq!(
            gpio.configure(PinId(9), PinDirection::Input),
            Err(HalError::UnknownPin(PinId(9)))
        );
    }

    #[test]
    fn configure_rejects_wrong_direction() {
        let (mut gpio, _, _) = pair();
        assert!(matches!(
            gpio.configure(PinId(4), PinDirection::Input),
            Err(HalError::WrongDirection { .. })
        ));
        assert!(matches!(
            gpio.configure(PinId(5), PinDirection::Output),
            Err(HalError::WrongDirection { .. })
        ));
    }

    #[test]
    fn set_level_drives_the_trigger_pin() {
        let (mut gpio, trigger_level, _) = pair();
        gpio.configure(PinId(4), PinDirection::Output).unwrap();
        gpio.set_level(PinId(4), Level::High).unwrap();
        assert!(trigger_level.is_high());
        gpio.set_level(PinId(4), Level::Low).unwrap();
        assert!(!trigger_level.is_high());
    }

    #[test]
    fn set_level_guards_misuse() {
        let (mut gpio, _, _) = pair();
        assert_eq!(
            gpio.set_level(PinId(4), Level::High),
            Err(HalError::Unconfigured(PinId(4)))
        );
        assert!(matches!(
            gpio.set_level(PinId(5), Level::High),
            Err(HalError::WrongDirection { .. })
        ));
    }

    #[test]
    fn read_level_follows_the_echo_pin() {
        let (mut gpio, _, echo_level) = pair();
        gpio.configure(PinId(5), PinDirection::Input).unwrap();
        assert_eq!(gpio.read_level(PinId(5)), Ok(Level::Low));
        echo_level.set(true);
        assert_eq!(gpio.read_level(PinId(5)), Ok(Level::High));
    }

    #[test]
    fn clock_is_monotonic() {
        let (mut gpio, _, _) = pair();
        let a = gpio.now_micros();
        let b = gpio.now_micros();
        assert!(b >= a);
    }
}
