#![warn(missing_docs)]

//! Error types for the ranging core.
//!
//! Two classes exist, matching how callers must react: GPIO/setup faults are
//! fatal and stop sampling, timeouts are per-cycle outcomes that the next
//! cycle retries naturally.

use core::fmt;

use sonar_hal::HalError;

/// Errors that can occur while driving a measurement cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RangingError {
    /// The GPIO controller refused an operation.
    /// Setup-class fault; sampling cannot continue.
    Gpio(HalError),
    /// The polling timeout is zero or otherwise unusable.
    InvalidTimeout(&'static str),
    /// The echo pin never rose within the bounded window.
    /// The payload is the number of microseconds actually waited.
    EchoStartTimeout(u64),
    /// The echo pin rose but never fell within the bounded window.
    /// The payload is the number of microseconds actually waited.
    EchoEndTimeout(u64),
}

impl RangingError {
    /// `true` for the per-cycle timeout outcomes, `false` for the fatal
    /// setup-class faults.
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            RangingError::EchoStartTimeout(_) | RangingError::EchoEndTimeout(_)
        )
    }
}

impl fmt::Display for RangingError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RangingError::Gpio(e) => write!(f, "gpio controller fault: {}", e),
            RangingError::InvalidTimeout(msg) => write!(f, "invalid timeout: {}", msg),
            RangingError::EchoStartTimeout(us) => {
                write!(f, "echo pulse did not start within {} us", us)
            }
            RangingError::EchoEndTimeout(us) => {
                write!(f, "echo pulse did not end within {} us", us)
            }
        }
    }
}

impl std::error::Error for RangingError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RangingError::Gpio(e) => Some(e),
            _ => None,
        }
    }
}

impl From<HalError> for RangingError {
    fn from(e: HalError) -> Self {
        RangingError::Gpio(e)
    }
}
