use thiserror::Error;

use crate::gpio::{PinDirection, PinId};

/// Errors raised by a [`GpioController`](crate::GpioController) implementation.
///
/// Every variant is a setup-class fault: pin bookkeeping that went wrong
/// before or during a measurement. Callers treat these as fatal and refuse
/// to start (or continue) sampling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum HalError {
    /// The pin id is not one this controller was built around.
    #[error("pin {0} is not known to this controller")]
    UnknownPin(PinId),
    /// `configure` was called a second time for the same pin.
    #[error("pin {0} is already configured")]
    AlreadyConfigured(PinId),
    /// The pin was used before `configure`.
    #[error("pin {0} has not been configured")]
    Unconfigured(PinId),
    /// The operation does not match the pin's configured direction.
    #[error("pin {pin} is not usable as {wanted}")]
    WrongDirection {
        /// Pin the operation targeted.
        pin: PinId,
        /// Direction the operation required.
        wanted: PinDirection,
    },
    /// Trigger and echo were assigned the same pin.
    #[error("trigger and echo cannot share pin {0}")]
    PinConflict(PinId),
    /// The underlying platform pin rejected the operation.
    #[error("backend refused a {0} operation")]
    Backend(&'static str),
}
