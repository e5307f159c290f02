use crate::{Result, SimError};
use serde::{Deserialize, Serialize};

/// The parameters of the intelligent driver model.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IdmParams {
    /// The desired velocity `v0`.
    pub desired_speed: f64,
    /// The maximum acceleration `a0`.
    pub max_acceleration: f64,
    /// The comfortable deceleration `b`, a positive number.
    pub comfortable_deceleration: f64,
    /// The desired time headway `T`.
    pub time_headway: f64,
    /// The minimum jam distance `s0`.
    pub min_gap: f64,
}

impl Default for IdmParams {
    fn default() -> Self {
        Self {
            desired_speed: 20.0,
            max_acceleration: 0.5,
            comfortable_deceleration: 3.0,
            time_headway: 1.5,
            min_gap: 60.0,
        }
    }
}

impl IdmParams {
    /// Checks the parameters, so that the model is never evaluated with an undefined square root.
    pub fn validate(&self) -> Result<()> {
        let finite = [
            self.desired_speed,
            self.max_acceleration,
            self.comfortable_deceleration,
            self.time_headway,
            self.min_gap,
        ]
        .iter()
        .all(|value| value.is_finite());
        if !finite {
            return Err(SimError::InvalidIdmParams("parameters must be finite".into()));
        }
        if self.max_acceleration <= 0.0 {
            return Err(SimError::InvalidIdmParams(format!(
                "maximum acceleration must be positive, got {}",
                self.max_acceleration
            )));
        }
        if self.comfortable_deceleration <= 0.0 {
            return Err(SimError::InvalidIdmParams(format!(
                "comfortable deceleration must be positive, got {}",
                self.comfortable_deceleration
            )));
        }
        if self.desired_speed <= 0.0 {
            return Err(SimError::InvalidIdmParams(format!(
                "desired speed must be positive, got {}",
                self.desired_speed
            )));
        }
        if self.time_headway < 0.0 || self.min_gap < 0.0 {
            return Err(SimError::InvalidIdmParams(
                "time headway and minimum gap must not be negative".into(),
            ));
        }
        Ok(())
    }

    /// The desired dynamic gap `s*` for a vehicle at `vel` closing in at `appr`.
    pub fn desired_gap(&self, vel: f64, appr: f64) -> f64 {
        let factor = 1. / (2. * (self.max_acceleration * self.comfortable_deceleration).sqrt());
        self.min_gap + vel * self.time_headway + vel * appr * factor
    }

    /// Computes an acceleration using the intelligent driver model.
    ///
    /// # Arguments
    /// * `vel` - The velocity of the simulated vehicle.
    /// * `net_dist` - The gap to the vehicle ahead, net of vehicle length.
    /// * `appr` - The approach rate, own velocity minus the leader's.
    pub fn acceleration(&self, vel: f64, net_dist: f64, appr: f64) -> f64 {
        if net_dist <= 0.0 {
            return -self.comfortable_deceleration;
        }
        let term = self.desired_gap(vel, appr) / net_dist;
        self.max_acceleration * (1. - (vel / self.desired_speed).powi(4) - term * term)
    }

    /// The acceleration on a free road, used when there is no vehicle ahead.
    pub fn free_road_acceleration(&self, vel: f64) -> f64 {
        if vel < self.desired_speed {
            self.max_acceleration
        } else {
            0.0
        }
    }
}
