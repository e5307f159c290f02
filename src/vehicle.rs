pub use self::idm::IdmParams;
pub use self::mobil::MobilParams;
pub(crate) use self::mobil::clears;
use crate::world::{VehicleSnapshot, VehicleView, World};
use crate::{Result, SimConfig, VehicleId};
use rand::Rng;
use serde::{Deserialize, Serialize};

mod idm;
mod mobil;
mod reactive;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    id: VehicleId,
    /// The index of the lane the vehicle is in.
    lane: usize,
    /// The longitudinal position along the track.
    pos: f64,
    /// The velocity, never negative.
    vel: f64,
    /// How the vehicle decides its velocity and lane.
    behavior: Behavior,
}

/// The driving behaviour of a vehicle, chosen when it is created.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Behavior {
    /// Follows the vehicle ahead using a simple safe distance rule and never changes lanes.
    Reactive,
    /// Accelerates using the IDM and changes lanes using MOBIL.
    Smart(SmartParams),
}

/// The parameters of a smart vehicle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SmartParams {
    pub idm: IdmParams,
    pub mobil: MobilParams,
}

/// Identifies a vehicle's [Behavior] without its parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BehaviorTag {
    Reactive,
    Smart,
}

/// The attributes of a vehicle to be added to a simulation.
#[derive(Clone, Copy, Debug)]
pub struct VehicleAttributes {
    /// The lane the vehicle starts in.
    pub lane: usize,
    /// The initial longitudinal position.
    pub pos: f64,
    /// The initial velocity. Negative values are treated as zero.
    pub vel: f64,
    pub behavior: Behavior,
}

/// What a vehicle will do at the end of the current tick.
#[derive(Clone, Copy, Debug, PartialEq)]
pub(crate) struct Decision {
    pub vel: f64,
    pub lane: usize,
}

impl Behavior {
    /// A smart behaviour using the default parameters of the given configuration.
    pub fn smart(config: &SimConfig) -> Self {
        Behavior::Smart(SmartParams::from(config))
    }

    pub fn tag(&self) -> BehaviorTag {
        match self {
            Behavior::Reactive => BehaviorTag::Reactive,
            Behavior::Smart(_) => BehaviorTag::Smart,
        }
    }

    /// Checks the model parameters of the behaviour.
    pub fn validate(&self) -> Result<()> {
        match self {
            Behavior::Reactive => Ok(()),
            Behavior::Smart(params) => {
                params.idm.validate()?;
                params.mobil.validate()
            }
        }
    }
}

impl From<&SimConfig> for SmartParams {
    fn from(config: &SimConfig) -> Self {
        Self {
            idm: config.idm,
            mobil: config.mobil,
        }
    }
}

impl VehicleAttributes {
    /// A stationary reactive vehicle.
    pub fn reactive(lane: usize, pos: f64) -> Self {
        Self {
            lane,
            pos,
            vel: 0.0,
            behavior: Behavior::Reactive,
        }
    }

    /// A stationary smart vehicle.
    pub fn smart(lane: usize, pos: f64, params: SmartParams) -> Self {
        Self {
            lane,
            pos,
            vel: 0.0,
            behavior: Behavior::Smart(params),
        }
    }

    /// Sets the initial velocity.
    pub fn with_vel(self, vel: f64) -> Self {
        Self { vel, ..self }
    }
}

impl Vehicle {
    /// Creates a new vehicle. The caller must have validated the attributes.
    pub(crate) fn new(id: VehicleId, attributes: &VehicleAttributes) -> Self {
        Self {
            id,
            lane: attributes.lane,
            pos: attributes.pos,
            vel: f64::max(attributes.vel, 0.0),
            behavior: attributes.behavior,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The index of the lane the vehicle is in.
    pub fn lane(&self) -> usize {
        self.lane
    }

    /// The longitudinal position of the vehicle.
    pub fn pos(&self) -> f64 {
        self.pos
    }

    /// The vehicle's velocity.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    pub fn behavior(&self) -> &Behavior {
        &self.behavior
    }

    /// Whether the vehicle has driven past the end of the track.
    pub fn has_exited(&self, track_length: f64) -> bool {
        self.pos > track_length
    }

    /// The vehicle as seen by its neighbours.
    pub(crate) fn view(&self) -> VehicleView {
        VehicleView {
            id: self.id,
            lane: self.lane,
            pos: self.pos,
            vel: self.vel,
        }
    }

    pub(crate) fn snapshot(&self, config: &SimConfig) -> VehicleSnapshot {
        VehicleSnapshot {
            id: self.id,
            lane: self.lane,
            x: self.pos,
            y: config.lane_centre(self.lane),
            speed: self.vel,
            behavior: self.behavior.tag(),
        }
    }

    /// Scales the desired velocity of a smart vehicle. Has no effect on reactive vehicles.
    pub(crate) fn scale_desired_speed(&mut self, factor: f64) {
        if let Behavior::Smart(params) = &mut self.behavior {
            params.idm.desired_speed *= factor;
        }
    }

    /// Decides the vehicle's velocity and lane for the end of this tick.
    /// Only the frozen `world` is consulted, never the live vehicles.
    pub(crate) fn decide<R: Rng>(
        &self,
        world: &World,
        config: &SimConfig,
        dt: f64,
        rng: &mut R,
    ) -> Decision {
        let view = self.view();
        match &self.behavior {
            Behavior::Reactive => {
                let leader = world.leader_of(self.lane, self.pos);
                Decision {
                    vel: reactive::follow(&view, leader, config, dt),
                    lane: self.lane,
                }
            }
            Behavior::Smart(params) => {
                let idm = &params.idm;
                let acc = lane_acceleration(&view, self.lane, idm, world, config);
                let vel = if world.leader_of(self.lane, self.pos).is_some() {
                    self.vel + acc * dt
                } else {
                    // Free road: approach the desired speed without overshooting it
                    f64::min(self.vel + acc * dt, f64::max(idm.desired_speed, self.vel))
                };
                let lane = params
                    .mobil
                    .choose_lane(&view, acc, idm, world, config, rng);
                Decision {
                    vel: f64::max(vel, 0.0),
                    lane,
                }
            }
        }
    }

    /// Applies a decision and integrates the vehicle's position.
    pub(crate) fn apply(&mut self, decision: Decision, dt: f64) {
        self.vel = f64::max(decision.vel, 0.0);
        self.lane = decision.lane;
        self.pos += self.vel * dt;
    }
}

/// The IDM acceleration the vehicle would have in `lane`,
/// following the closest vehicle ahead of it there.
fn lane_acceleration(
    vehicle: &VehicleView,
    lane: usize,
    idm: &IdmParams,
    world: &World,
    config: &SimConfig,
) -> f64 {
    match world.leader_of(lane, vehicle.pos) {
        Some(leader) => {
            let net_dist = leader.pos - vehicle.pos - config.vehicle_length;
            idm.acceleration(vehicle.vel, net_dist, vehicle.vel - leader.vel)
        }
        None => idm.free_road_acceleration(vehicle.vel),
    }
}
