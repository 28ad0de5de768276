mod config;

use std::time::Duration;

use anyhow::Result;
use sonar_hal::sim::{EchoBehavior, SimulatedHcSr04};
use sonar_ranging::{PeriodicSampler, RangerConfig, Reading, SamplerConfig, UltrasonicRanger};
use tokio::sync::broadcast::error::RecvError;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .init();

    let cfg = config::load()?;
    let pins = cfg.sensor.pins;

    // No sensor is wired to this host, so the rig runs against the
    // behavioral model; swap in an `EmbeddedPinPair` over the platform's
    // embedded-hal pins to drive real hardware.
    let sim = SimulatedHcSr04::new(
        pins,
        EchoBehavior::Reflect {
            distance_cm: cfg.sim.target_distance_cm,
        },
    );

    let ranger = UltrasonicRanger::new(
        sim.clone(),
        pins,
        RangerConfig {
            timeout_us: cfg.sensor.timeout_us,
        },
    )?;
    let sampler = PeriodicSampler::new(
        ranger,
        SamplerConfig {
            interval: Duration::from_millis(cfg.sampler.interval_ms),
            ..SamplerConfig::default()
        },
    );

    let mut rx = sampler.subscribe();
    let handle = sampler.start()?;
    info!(%pins, "sampling started");

    let mut cycle: u64 = 0;
    loop {
        match rx.recv().await {
            Ok(Reading::Distance(cm)) => info!("distance: {:.2} cm", cm),
            Ok(Reading::NoEcho) => warn!("no reading this cycle"),
            Err(RecvError::Lagged(n)) => {
                warn!("reading receiver lagged by {} messages", n);
                continue;
            }
            Err(RecvError::Closed) => {
                error!("reading channel closed, sampling thread is gone");
                break;
            }
        }

        // Drift the simulated target back and forth so the log shows the
        // rig tracking something.
        cycle += 1;
        let swing = 25.0 * ((cycle % 20) as f64 / 10.0 - 1.0).abs();
        sim.set_target_distance_cm(cfg.sim.target_distance_cm + swing);
    }

    handle.stop();
    Ok(())
}
