use crate::vehicle::BehaviorTag;
use crate::{VehicleId, VehicleSet};
use serde::Serialize;

/// A frozen view of the vehicles at the start of a tick,
/// used to answer neighbour queries while the vehicles are being updated.
#[derive(Clone, Debug, Default)]
pub struct World {
    /// The vehicles in each lane, ordered by increasing position.
    lanes: Vec<Vec<VehicleView>>,
}

/// The kinematic state of a vehicle as seen by other vehicles.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleView {
    pub id: VehicleId,
    pub lane: usize,
    /// The longitudinal position.
    pub pos: f64,
    /// The velocity.
    pub vel: f64,
}

/// The state of a vehicle as exposed to renderers and other observers.
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct VehicleSnapshot {
    pub id: VehicleId,
    pub lane: usize,
    /// The longitudinal position.
    pub x: f64,
    /// The lateral coordinate of the centre line of the vehicle's lane.
    pub y: f64,
    pub speed: f64,
    pub behavior: BehaviorTag,
}

impl World {
    /// Takes a snapshot of the given vehicles.
    pub(crate) fn new(num_lanes: usize, vehicles: &VehicleSet) -> Self {
        let mut lanes = vec![Vec::new(); num_lanes];
        for vehicle in vehicles.values() {
            lanes[vehicle.lane()].push(vehicle.view());
        }
        for lane in &mut lanes {
            lane.sort_by(|a, b| a.pos.total_cmp(&b.pos));
        }
        Self { lanes }
    }

    /// The number of lanes in the world.
    pub fn num_lanes(&self) -> usize {
        self.lanes.len()
    }

    /// The vehicles in a lane, ordered by increasing position.
    pub fn lane(&self, lane: usize) -> &[VehicleView] {
        self.lanes.get(lane).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Finds the closest vehicle in `lane` strictly ahead of `pos`.
    pub fn leader_of(&self, lane: usize, pos: f64) -> Option<&VehicleView> {
        let vehicles = self.lane(lane);
        let idx = vehicles.partition_point(|veh| veh.pos <= pos);
        vehicles.get(idx)
    }

    /// Finds the closest vehicle in `lane` strictly behind `pos`.
    pub fn follower_of(&self, lane: usize, pos: f64) -> Option<&VehicleView> {
        let vehicles = self.lane(lane);
        let idx = vehicles.partition_point(|veh| veh.pos < pos);
        idx.checked_sub(1).map(|idx| &vehicles[idx])
    }
}
