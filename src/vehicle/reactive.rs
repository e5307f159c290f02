use crate::world::VehicleView;
use crate::SimConfig;

/// Velocities this close below the nominal speed snap to it,
/// absorbing rounding error from repeated increments.
const SNAP_EPSILON: f64 = 1e-9;

/// Computes the next velocity of a vehicle using the reactive follow model.
///
/// A vehicle closer than the safe distance to its leader drops to just below
/// the leader's speed, otherwise it accelerates towards the nominal speed.
pub fn follow(
    vehicle: &VehicleView,
    leader: Option<&VehicleView>,
    config: &SimConfig,
    dt: f64,
) -> f64 {
    if let Some(leader) = leader {
        let net_dist = leader.pos - vehicle.pos - config.vehicle_length;
        if net_dist < config.safe_distance {
            return f64::max(leader.vel - 1.0, 0.0);
        }
    }
    accelerate(vehicle.vel, config.nominal_speed, config.speed_increment * dt)
}

/// Increases `vel` by `step` without exceeding `max_vel`.
/// A vehicle already above `max_vel` keeps its velocity.
fn accelerate(vel: f64, max_vel: f64, step: f64) -> f64 {
    if vel >= max_vel {
        return vel;
    }
    let vel = vel + step;
    if vel >= max_vel - SNAP_EPSILON {
        max_vel
    } else {
        vel
    }
}
