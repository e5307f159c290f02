pub use config::SimConfig;
pub use error::{Result, SimError};
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use spawn::{SpawnController, SpawnPolicy};
pub use vehicle::{
    Behavior, BehaviorTag, IdmParams, MobilParams, SmartParams, Vehicle, VehicleAttributes,
};
pub use world::{VehicleSnapshot, VehicleView, World};

mod config;
mod error;
mod simulation;
mod spawn;
mod vehicle;
mod world;

new_key_type! {
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
}

type VehicleSet = SlotMap<VehicleId, Vehicle>;
