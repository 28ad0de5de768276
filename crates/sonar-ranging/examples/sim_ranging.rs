use sonar_hal::sim::{EchoBehavior, SimulatedHcSr04};
use sonar_hal::{PinAssignment, PinId};
use sonar_ranging::{RangerConfig, UltrasonicRanger};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Trigger on pin 4, echo on pin 5, no real hardware: the simulated
    // sensor reflects off a virtual target.
    let pins = PinAssignment::new(PinId(4), PinId(5))?;
    let sim = SimulatedHcSr04::new(pins, EchoBehavior::Reflect { distance_cm: 30.0 });
    let mut ranger = UltrasonicRanger::new(sim.clone(), pins, RangerConfig::default())?;

    // Walk the target away from the sensor, one cycle per position.
    for step in 0..8 {
        sim.set_target_distance_cm(30.0 + 25.0 * step as f64);
        let reading = ranger.read()?;
        println!("cycle {}: {}", step, reading);
    }

    // Unplug the target; the cycle reports the absence explicitly instead
    // of a bogus distance.
    sim.set_behavior(EchoBehavior::Silent);
    let reading = ranger.read()?;
    println!("no target: {}", reading);

    Ok(())
}
