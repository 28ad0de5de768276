//! Periodic sampling loop.
//!
//! One sensor instance, one dedicated thread: the loop runs a measurement
//! cycle, publishes the outcome on a broadcast topic, then sleeps for the
//! configured interval. The sleep starts after the cycle ends, so the
//! period jitters with measurement latency; that is intentional, the
//! interval is a spacing, not a schedule.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use sonar_hal::GpioController;
use spin_sleep::SpinSleeper;
use tokio::sync::broadcast;
use tracing::{debug, error, info, warn};

use crate::distance::Reading;
use crate::sensor::UltrasonicRanger;

/// Default spacing between the end of one cycle and the start of the next.
pub const DEFAULT_INTERVAL: Duration = Duration::from_millis(1000);

/// Default broadcast channel capacity for published readings.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 16;

/// Tuning knobs for a [`PeriodicSampler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplerConfig {
    /// Spacing between cycles.
    pub interval: Duration,
    /// Capacity of the broadcast channel readings are published on.
    pub channel_capacity: usize,
}

impl Default for SamplerConfig {
    fn default() -> Self {
        SamplerConfig {
            interval: DEFAULT_INTERVAL,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// A sensor wired up for periodic sampling, not yet running.
///
/// This is the idle state: subscribers can attach, nothing measures yet.
/// [`start`](PeriodicSampler::start) consumes the sampler, so the
/// transition into the running state is one-way for the life of the
/// instance, and no handle remains through which a second loop could be
/// started on the same pins.
pub struct PeriodicSampler<G: GpioController> {
    ranger: UltrasonicRanger<G>,
    interval: Duration,
    tx: broadcast::Sender<Reading>,
}

impl<G: GpioController + Send + 'static> PeriodicSampler<G> {
    /// Wrap a ready sensor instance in a sampling loop.
    pub fn new(ranger: UltrasonicRanger<G>, config: SamplerConfig) -> Self {
        let (tx, _) = broadcast::channel(config.channel_capacity);
        PeriodicSampler {
            ranger,
            interval: config.interval,
            tx,
        }
    }

    /// A receiver for every published [`Reading`].
    pub fn subscribe(&self) -> broadcast::Receiver<Reading> {
        self.tx.subscribe()
    }

    /// Start the sampling thread.
    ///
    /// Timeouts are per-cycle outcomes: the cycle publishes
    /// [`Reading::NoEcho`] and the loop carries on, the interval itself
    /// being the retry mechanism. A GPIO fault stops the loop; there is no
    /// meaningful way to keep driving a broken controller.
    ///
    /// # Errors
    ///
    /// Propagates the OS error if the thread cannot be spawned.
    pub fn start(self) -> std::io::Result<SamplerHandle> {
        let stop = Arc::new(AtomicBool::new(false));
        let thread = std::thread::Builder::new().name("sampler".into()).spawn({
            let stop = Arc::clone(&stop);
            let mut ranger = self.ranger;
            let tx = self.tx;
            let interval = self.interval;
            move || {
                info!(
                    interval_ms = interval.as_millis() as u64,
                    pins = %ranger.pins(),
                    "sampler thread started"
                );
                let sleeper = SpinSleeper::new(100_000);
                while !stop.load(Ordering::Relaxed) {
                    match ranger.read() {
                        Ok(reading) => {
                            match reading {
                                Reading::Distance(cm) => debug!(distance_cm = cm, "measured"),
                                Reading::NoEcho => warn!("no echo this cycle"),
                            }
                            // No receivers just means nobody is listening
                            // right now; the loop keeps its own pace.
                            let _ = tx.send(reading);
                        }
                        Err(e) => {
                            error!(error = %e, "gpio fault, sampling stopped");
                            break;
                        }
                    }
                    sleeper.sleep(interval);
                }
                info!("sampler thread stopped");
            }
        })?;
        Ok(SamplerHandle {
            stop,
            thread: Some(thread),
        })
    }
}

/// Running sampler. Dropping the handle detaches the thread; [`stop`]
/// terminates it.
///
/// [`stop`]: SamplerHandle::stop
pub struct SamplerHandle {
    stop: Arc<AtomicBool>,
    thread: Option<JoinHandle<()>>,
}

impl SamplerHandle {
    /// Ask the loop to finish its current cycle and exit, then join the
    /// thread. A cycle in flight is never aborted; worst case this waits
    /// one cycle plus one interval.
    pub fn stop(mut self) {
        self.stop.store(true, Ordering::Relaxed);
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
    }
}

#[cfg(test)]
mod tests {
    use sonar_hal::sim::{EchoBehavior, SimulatedHcSr04};
    use sonar_hal::{PinAssignment, PinId};

    use super::*;
    use crate::sensor::RangerConfig;

    fn sampler_with(
        behavior: EchoBehavior,
    ) -> (SimulatedHcSr04, PeriodicSampler<SimulatedHcSr04>) {
        let pins = PinAssignment::new(PinId(4), PinId(5)).unwrap();
        let sim = SimulatedHcSr04::new(pins, behavior);
        let ranger = UltrasonicRanger::new(sim.clone(), pins, RangerConfig::default()).unwrap();
        let sampler = PeriodicSampler::new(
            ranger,
            SamplerConfig {
                interval: Duration::from_millis(1),
                channel_capacity: 32,
            },
        );
        (sim, sampler)
    }

    /// Receive until `pred` matches, with a bounded number of attempts.
    fn recv_until(
        rx: &mut broadcast::Receiver<Reading>,
        pred: impl Fn(&Reading) -> bool,
    ) -> Reading {
        for _ in 0..200 {
            if let Ok(reading) = rx.blocking_recv() {
                if pred(&reading) {
                    return reading;
                }
            }
        }
        panic!("expected reading never arrived");
    }

    #[test]
    fn publishes_distance_readings() {
        let (_sim, sampler) = sampler_with(EchoBehavior::Reflect { distance_cm: 75.0 });
        let mut rx = sampler.subscribe();
        let handle = sampler.start().unwrap();

        match recv_until(&mut rx, |r| !r.is_no_echo()) {
            Reading::Distance(cm) => assert!((cm - 75.0).abs() < 0.2, "got {} cm", cm),
            Reading::NoEcho => unreachable!(),
        }
        handle.stop();
    }

    #[test]
    fn no_echo_cycles_do_not_stop_sampling() {
        let (sim, sampler) = sampler_with(EchoBehavior::Silent);
        let mut rx = sampler.subscribe();
        let handle = sampler.start().unwrap();

        assert!(recv_until(&mut rx, |r| r.is_no_echo()).is_no_echo());

        // Retune the target; the loop must pick it up on a later cycle with
        // no state carried over from the timed-out ones.
        sim.set_target_distance_cm(40.0);
        match recv_until(&mut rx, |r| !r.is_no_echo()) {
            Reading::Distance(cm) => assert!((cm - 40.0).abs() < 0.2, "got {} cm", cm),
            Reading::NoEcho => unreachable!(),
        }
        handle.stop();
    }

    #[test]
    fn stop_joins_the_thread() {
        let (_sim, sampler) = sampler_with(EchoBehavior::Reflect { distance_cm: 10.0 });
        let handle = sampler.start().unwrap();
        handle.stop();
    }
}
