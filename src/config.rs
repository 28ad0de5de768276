use config::{Config, ConfigError, File, FileFormat};
use serde::Deserialize;
use sonar_hal::{PinAssignment, PinId};
use tracing::{error, info};

const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

// GPIO 4 / GPIO 5, the wiring the rig was originally built with.
const DEFAULT_PINS: PinAssignment = match PinAssignment::new(PinId(4), PinId(5)) {
    Ok(pins) => pins,
    Err(_) => panic!("default pin assignment is invalid"),
};

/// Everything the rig needs to start, with defaults for every field so a
/// missing config file still yields a runnable setup.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct RigConfig {
    pub sensor: SensorSettings,
    pub sampler: SamplerSettings,
    pub sim: SimSettings,
}

impl Default for RigConfig {
    fn default() -> Self {
        RigConfig {
            sensor: SensorSettings::default(),
            sampler: SamplerSettings::default(),
            sim: SimSettings::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SensorSettings {
    /// Trigger/echo pin pair; validated on deserialization.
    pub pins: PinAssignment,
    /// Echo polling bound in microseconds.
    pub timeout_us: u64,
}

impl Default for SensorSettings {
    fn default() -> Self {
        SensorSettings {
            pins: DEFAULT_PINS,
            timeout_us: sonar_ranging::DEFAULT_TIMEOUT_US,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SamplerSettings {
    /// Delay between measurement cycles, in milliseconds.
    pub interval_ms: u64,
}

impl Default for SamplerSettings {
    fn default() -> Self {
        SamplerSettings { interval_ms: 1000 }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct SimSettings {
    /// Where the simulated target starts, in centimeters.
    pub target_distance_cm: f64,
}

impl Default for SimSettings {
    fn default() -> Self {
        SimSettings {
            target_distance_cm: 100.0,
        }
    }
}

pub fn load() -> Result<RigConfig, ConfigError> {
    info!("Attempting to load configuration from {}", DEFAULT_CONFIG_PATH);

    let settings = Config::builder()
        .add_source(File::new(DEFAULT_CONFIG_PATH, FileFormat::Toml).required(false))
        .build()?;

    match settings.try_deserialize::<RigConfig>() {
        Ok(cfg) => {
            info!("Successfully loaded configuration: {:?}", cfg);
            Ok(cfg)
        }
        Err(e) => {
            error!("Failed to load configuration: {}", e);
            Err(e)
        }
    }
}
