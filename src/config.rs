use crate::vehicle::{IdmParams, MobilParams};
use crate::{Result, SimError};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// The configuration of a simulation.
///
/// Distances are in track units and speeds in track units per tick,
/// so a `dt` of 1 advances the simulation by exactly one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    /// The number of lanes on the track.
    pub num_lanes: usize,
    /// The height of a single lane. Only used for rendering.
    pub lane_height: f64,
    /// The position past which vehicles leave the simulation.
    pub track_length: f64,
    /// The minimum gap used for reactive following and lane change safety.
    pub safe_distance: f64,
    /// The length of every vehicle.
    pub vehicle_length: f64,
    /// The cruising speed of reactive vehicles.
    pub nominal_speed: f64,
    /// The speed a reactive vehicle gains per tick when below its nominal speed.
    pub speed_increment: f64,
    /// The default time step passed to [crate::Simulation::step_default].
    pub dt: f64,
    /// Seed for the random number generator, or `None` to seed from entropy.
    pub seed: Option<u64>,
    /// The default IDM parameters of smart vehicles.
    pub idm: IdmParams,
    /// The default MOBIL parameters of smart vehicles.
    pub mobil: MobilParams,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            num_lanes: 3,
            lane_height: 40.0,
            track_length: 1400.0,
            safe_distance: 50.0,
            vehicle_length: 50.0,
            nominal_speed: 5.0,
            speed_increment: 0.1,
            dt: 1.0,
            seed: None,
            idm: IdmParams::default(),
            mobil: MobilParams::default(),
        }
    }
}

impl SimConfig {
    /// Parses a configuration from a JSON string. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: SimConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Reads and validates a JSON configuration file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json_str(&content)
    }

    /// Checks that the configuration describes a well-formed simulation.
    pub fn validate(&self) -> Result<()> {
        if self.num_lanes == 0 {
            return Err(SimError::InvalidConfig("num_lanes must be at least 1".into()));
        }
        let positive = [
            ("lane_height", self.lane_height),
            ("track_length", self.track_length),
            ("safe_distance", self.safe_distance),
            ("vehicle_length", self.vehicle_length),
            ("speed_increment", self.speed_increment),
            ("dt", self.dt),
        ];
        if let Some((name, value)) = positive
            .iter()
            .find(|(_, value)| !(value.is_finite() && *value > 0.0))
        {
            return Err(SimError::InvalidConfig(format!(
                "{name} must be positive, got {value}"
            )));
        }
        if !(self.nominal_speed.is_finite() && self.nominal_speed >= 0.0) {
            return Err(SimError::InvalidConfig(format!(
                "nominal_speed must be non-negative, got {}",
                self.nominal_speed
            )));
        }
        self.idm.validate()?;
        self.mobil.validate()?;
        Ok(())
    }

    /// Checks that `lane` is a valid lane index.
    pub fn check_lane(&self, lane: usize) -> Result<()> {
        if lane < self.num_lanes {
            Ok(())
        } else {
            Err(SimError::InvalidLane {
                lane,
                num_lanes: self.num_lanes,
            })
        }
    }

    /// The lateral coordinate of the centre line of a lane.
    pub fn lane_centre(&self, lane: usize) -> f64 {
        self.lane_height * lane as f64 + 0.5 * self.lane_height
    }
}
