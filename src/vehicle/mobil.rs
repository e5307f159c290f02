use super::idm::IdmParams;
use crate::world::{VehicleView, World};
use crate::{Result, SimConfig, SimError};
use rand::Rng;
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

/// The parameters of the MOBIL lane changing model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MobilParams {
    /// The acceleration gain a lane change must exceed to be taken.
    pub incentive_threshold: f64,
    /// The probability of taking the best lane change even when its gain
    /// does not exceed the threshold.
    pub random_acceptance: f64,
    /// Whether the random acceptance clause is applied at all.
    pub random_acceptance_enabled: bool,
}

impl Default for MobilParams {
    fn default() -> Self {
        Self {
            incentive_threshold: 0.005,
            random_acceptance: 0.6,
            random_acceptance_enabled: true,
        }
    }
}

/// A lane a vehicle could move into, with the acceleration it would have there.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LaneCandidate {
    pub lane: usize,
    /// The acceleration gain over staying in the current lane.
    pub incentive: f64,
}

impl MobilParams {
    pub fn validate(&self) -> Result<()> {
        if !self.incentive_threshold.is_finite() {
            return Err(SimError::InvalidMobilParams(format!(
                "incentive threshold must be finite, got {}",
                self.incentive_threshold
            )));
        }
        if !(0.0..=1.0).contains(&self.random_acceptance) {
            return Err(SimError::InvalidMobilParams(format!(
                "random acceptance must be a probability, got {}",
                self.random_acceptance
            )));
        }
        Ok(())
    }

    /// Decides which lane the vehicle should occupy after this tick.
    ///
    /// # Parameters
    /// * `vehicle` - The deciding vehicle.
    /// * `current_acc` - The vehicle's IDM acceleration in its current lane.
    /// * `idm` - The vehicle's IDM parameters.
    pub fn choose_lane<R: Rng>(
        &self,
        vehicle: &VehicleView,
        current_acc: f64,
        idm: &IdmParams,
        world: &World,
        config: &SimConfig,
        rng: &mut R,
    ) -> usize {
        let Some(best) = best_candidate(vehicle, current_acc, idm, world, config) else {
            return vehicle.lane;
        };
        if best.incentive > self.incentive_threshold {
            return best.lane;
        }
        if self.random_acceptance_enabled && rng.gen::<f64>() < self.random_acceptance {
            return best.lane;
        }
        vehicle.lane
    }
}

/// Finds the adjacent lane with the greatest positive incentive, among those the vehicle can
/// safely move into. Ties are resolved in favour of the lower lane index.
pub fn best_candidate(
    vehicle: &VehicleView,
    current_acc: f64,
    idm: &IdmParams,
    world: &World,
    config: &SimConfig,
) -> Option<LaneCandidate> {
    adjacent_lanes(vehicle.lane, config.num_lanes)
        .into_iter()
        .filter(|lane| is_safe(vehicle, *lane, world, config))
        .map(|lane| LaneCandidate {
            lane,
            incentive: super::lane_acceleration(vehicle, lane, idm, world, config) - current_acc,
        })
        .fold(None, |best: Option<LaneCandidate>, candidate| {
            let current_best = best.map_or(0.0, |best| best.incentive);
            if candidate.incentive > current_best {
                Some(candidate)
            } else {
                best
            }
        })
}

/// The lanes either side of `lane`.
fn adjacent_lanes(lane: usize, num_lanes: usize) -> SmallVec<[usize; 2]> {
    let mut lanes = SmallVec::new();
    if let Some(left) = lane.checked_sub(1) {
        lanes.push(left);
    }
    if lane + 1 < num_lanes {
        lanes.push(lane + 1);
    }
    lanes
}

/// Whether the vehicle can move into `lane`: every vehicle behind or level with it there
/// must be at least the safe distance back, and no vehicle ahead may overlap it.
pub fn is_safe(vehicle: &VehicleView, lane: usize, world: &World, config: &SimConfig) -> bool {
    world
        .lane(lane)
        .iter()
        .all(|other| clears(vehicle.pos, other.pos, config))
}

/// Whether a vehicle at `pos` can share a lane with another vehicle at `other_pos`.
pub fn clears(pos: f64, other_pos: f64, config: &SimConfig) -> bool {
    if other_pos <= pos {
        pos - other_pos - config.vehicle_length >= config.safe_distance
    } else {
        other_pos - pos > config.vehicle_length
    }
}
