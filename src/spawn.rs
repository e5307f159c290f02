//! Periodic vehicle spawning.
//!
//! The spawn controller sits outside the simulation core: it is driven by whoever
//! owns the simulation clock and only ever adds vehicles through [Simulation::add_vehicle].

use crate::vehicle::{Behavior, SmartParams, VehicleAttributes};
use crate::{Result, SimError, Simulation, VehicleId};
use log::{debug, warn};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};

/// The spawning policy.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpawnPolicy {
    /// The number of ticks between spawns.
    pub interval: usize,
    /// The probability that a spawned vehicle is smart rather than reactive.
    pub smart_ratio: f64,
    /// The longitudinal position new vehicles start at.
    pub position: f64,
    /// The maximum deviation of a new vehicle's initial velocity from the nominal speed.
    pub vel_spread: i32,
}

impl Default for SpawnPolicy {
    fn default() -> Self {
        Self {
            interval: 24,
            smart_ratio: 0.4,
            position: 0.0,
            vel_spread: 2,
        }
    }
}

/// Adds vehicles to a simulation at a fixed cadence.
pub struct SpawnController {
    policy: SpawnPolicy,
    /// Ticks remaining until the next spawn.
    countdown: usize,
    rng: StdRng,
}

impl SpawnController {
    /// Creates a spawn controller. The first vehicle is spawned after one full interval.
    pub fn new(policy: SpawnPolicy, seed: Option<u64>) -> Result<Self> {
        if policy.interval == 0 {
            return Err(SimError::InvalidConfig("spawn interval must be at least 1".into()));
        }
        if !(0.0..=1.0).contains(&policy.smart_ratio) {
            return Err(SimError::InvalidConfig(format!(
                "smart ratio must be a probability, got {}",
                policy.smart_ratio
            )));
        }
        if policy.vel_spread < 0 || !policy.position.is_finite() {
            return Err(SimError::InvalidConfig(
                "spawn position must be finite and velocity spread non-negative".into(),
            ));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        Ok(Self {
            policy,
            countdown: policy.interval,
            rng,
        })
    }

    pub fn policy(&self) -> &SpawnPolicy {
        &self.policy
    }

    /// Advances the spawn clock by one tick, spawning a vehicle if one is due.
    pub fn tick(&mut self, sim: &mut Simulation) -> Option<VehicleId> {
        self.countdown -= 1;
        if self.countdown > 0 {
            return None;
        }
        self.countdown = self.policy.interval;
        self.spawn(sim)
    }

    /// Spawns one vehicle in a random lane.
    ///
    /// Nothing is spawned if another vehicle is within a vehicle length plus the safe
    /// distance of the entry point in the chosen lane.
    pub fn spawn(&mut self, sim: &mut Simulation) -> Option<VehicleId> {
        let attributes = self.next_attributes(sim);
        if is_entry_blocked(sim, attributes.lane, attributes.pos) {
            debug!("skipped spawn: lane {} is blocked", attributes.lane);
            return None;
        }
        match sim.add_vehicle(&attributes) {
            Ok(id) => Some(id),
            Err(err) => {
                warn!("refused to spawn vehicle: {}", err);
                None
            }
        }
    }

    /// Chooses the lane, behaviour and velocity of the next vehicle.
    fn next_attributes(&mut self, sim: &Simulation) -> VehicleAttributes {
        let config = sim.config();
        let lane = self.rng.gen_range(0..config.num_lanes);
        let behavior = if self.rng.gen_bool(self.policy.smart_ratio) {
            Behavior::Smart(SmartParams::from(config))
        } else {
            Behavior::Reactive
        };
        let spread = self.policy.vel_spread;
        let offset = self.rng.gen_range(-spread..=spread);
        VehicleAttributes {
            lane,
            pos: self.policy.position,
            vel: f64::max(config.nominal_speed + offset as f64, 0.0),
            behavior,
        }
    }
}

fn is_entry_blocked(sim: &Simulation, lane: usize, pos: f64) -> bool {
    let config = sim.config();
    let clearance = config.vehicle_length + config.safe_distance;
    sim.iter_vehicles()
        .any(|veh| veh.lane() == lane && (veh.pos() - pos).abs() < clearance)
}
