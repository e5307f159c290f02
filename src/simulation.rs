use crate::vehicle::{clears, Decision, Vehicle, VehicleAttributes};
use crate::world::{VehicleSnapshot, World};
use crate::{Result, SimConfig, SimError, VehicleId, VehicleSet};
use log::{debug, info, trace};
use rand::rngs::StdRng;
use rand::SeedableRng;
use rand_distr::Distribution;

/// A multi-lane traffic simulation.
///
/// The simulation is the sole owner of its vehicles. Every tick, each vehicle decides
/// its velocity and lane against a snapshot of the world taken before any vehicle moves,
/// and then all decisions are applied together, so the result of a tick does not depend
/// on the order in which vehicles are visited.
pub struct Simulation {
    /// The simulation parameters.
    config: SimConfig,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The random number generator used by lane changing decisions.
    rng: StdRng,
    /// The current frame of simulation.
    frame: usize,
}

impl Simulation {
    /// Creates a new, empty simulation after validating its configuration.
    pub fn new(config: SimConfig) -> Result<Self> {
        config.validate()?;
        let rng = match config.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_entropy(),
        };
        info!(
            "created simulation with {} lanes over a track of length {}",
            config.num_lanes, config.track_length
        );
        Ok(Self {
            config,
            vehicles: VehicleSet::default(),
            rng,
            frame: 0,
        })
    }

    /// The simulation's configuration.
    pub fn config(&self) -> &SimConfig {
        &self.config
    }

    /// Adds a vehicle to the simulation.
    ///
    /// Fails if the lane does not exist or the vehicle's model parameters are invalid.
    pub fn add_vehicle(&mut self, attributes: &VehicleAttributes) -> Result<VehicleId> {
        self.config.check_lane(attributes.lane)?;
        attributes.behavior.validate()?;
        let id = self
            .vehicles
            .insert_with_key(|id| Vehicle::new(id, attributes));
        trace!("added vehicle {:?} in lane {}", id, attributes.lane);
        Ok(id)
    }

    /// Removes a vehicle from the simulation.
    /// Returns `false` if there was no such vehicle.
    pub fn remove_vehicle(&mut self, id: VehicleId) -> bool {
        self.vehicles.remove(id).is_some()
    }

    /// Multiplies the desired velocity of each smart vehicle by a factor sampled from
    /// a normal distribution with a mean of 1 (no adjustment) and standard deviation of `stddev`.
    pub fn randomise_desired_speeds(&mut self, stddev: f64) -> Result<()> {
        let distr = rand_distr::Normal::new(1.0, stddev)
            .map_err(|err| SimError::InvalidConfig(format!("invalid standard deviation: {err}")))?;
        for vehicle in self.vehicles.values_mut() {
            let factor = distr.sample(&mut self.rng).clamp(0.75, 1.25);
            vehicle.scale_desired_speed(factor);
        }
        Ok(())
    }

    /// Advances the simulation by the configured time step.
    pub fn step_default(&mut self) -> Vec<VehicleId> {
        self.step(self.config.dt)
    }

    /// Advances the simulation by `dt` ticks.
    /// Returns the IDs of the vehicles which drove off the end of the track.
    pub fn step(&mut self, dt: f64) -> Vec<VehicleId> {
        let dt = f64::max(dt, 0.0);
        let world = self.world();

        let mut decisions = Vec::with_capacity(self.vehicles.len());
        for (vehicle_id, vehicle) in &self.vehicles {
            let decision = vehicle.decide(&world, &self.config, dt, &mut self.rng);
            decisions.push((vehicle_id, decision));
        }
        self.resolve_lane_changes(&mut decisions, dt);

        for (vehicle_id, decision) in decisions {
            let vehicle = &mut self.vehicles[vehicle_id];
            if vehicle.lane() != decision.lane {
                debug!(
                    "vehicle {:?} changed lane {} -> {} at {:.1}",
                    vehicle_id,
                    vehicle.lane(),
                    decision.lane,
                    vehicle.pos()
                );
            }
            vehicle.apply(decision, dt);
        }

        let exited = self.remove_exited_vehicles();
        self.frame += 1;
        trace!(
            "frame {}: {} vehicles, {} exited",
            self.frame,
            self.vehicles.len(),
            exited.len()
        );
        exited
    }

    /// Cancels lane changes that would conflict with each other or with vehicles already
    /// in the target lane, judged at both the tick-start and the end-of-tick positions.
    ///
    /// Vehicles further ahead get priority, then lower IDs. A vehicle leaving a lane still
    /// counts as occupying it, since its own lane change may be cancelled.
    fn resolve_lane_changes(&self, decisions: &mut [(VehicleId, Decision)], dt: f64) {
        let next_pos = |vehicle: &Vehicle, decision: &Decision| vehicle.pos() + decision.vel * dt;

        let mut changes = decisions
            .iter()
            .enumerate()
            .filter(|(_, (vehicle_id, decision))| self.vehicles[*vehicle_id].lane() != decision.lane)
            .map(|(idx, _)| idx)
            .collect::<Vec<_>>();
        changes.sort_by(|a, b| {
            let (a_id, b_id) = (decisions[*a].0, decisions[*b].0);
            let (a_pos, b_pos) = (self.vehicles[a_id].pos(), self.vehicles[b_id].pos());
            b_pos.total_cmp(&a_pos).then(a_id.cmp(&b_id))
        });

        // Accepted lane changes as (lane, tick-start position, end-of-tick position)
        let mut accepted: Vec<(usize, f64, f64)> = vec![];
        for idx in changes {
            let (vehicle_id, decision) = decisions[idx];
            let vehicle = &self.vehicles[vehicle_id];
            let (pos, next) = (vehicle.pos(), next_pos(vehicle, &decision));

            let is_clear = decisions
                .iter()
                .filter(|(other_id, _)| self.vehicles[*other_id].lane() == decision.lane)
                .map(|(other_id, other)| {
                    let other_vehicle = &self.vehicles[*other_id];
                    (other_vehicle.pos(), next_pos(other_vehicle, other))
                })
                .chain(
                    accepted
                        .iter()
                        .filter(|(lane, _, _)| *lane == decision.lane)
                        .map(|(_, pos, next)| (*pos, *next)),
                )
                .all(|(other_pos, other_next)| {
                    clears(pos, other_pos, &self.config) && clears(next, other_next, &self.config)
                });

            if is_clear {
                accepted.push((decision.lane, pos, next));
            } else {
                debug!(
                    "vehicle {:?} cancelled lane change {} -> {} at {:.1}",
                    vehicle_id,
                    vehicle.lane(),
                    decision.lane,
                    pos
                );
                decisions[idx].1.lane = vehicle.lane();
            }
        }
    }

    /// Removes the vehicles past the end of the track.
    fn remove_exited_vehicles(&mut self) -> Vec<VehicleId> {
        let track_length = self.config.track_length;
        let exited = self
            .vehicles
            .iter()
            .filter(|(_, vehicle)| vehicle.has_exited(track_length))
            .map(|(vehicle_id, _)| vehicle_id)
            .collect::<Vec<_>>();
        for vehicle_id in &exited {
            self.vehicles.remove(*vehicle_id);
            debug!("vehicle {:?} exited the track", vehicle_id);
        }
        exited
    }

    /// Takes a read-only snapshot of the vehicles for neighbour queries.
    pub fn world(&self) -> World {
        World::new(self.config.num_lanes, &self.vehicles)
    }

    /// The state of every vehicle, for rendering.
    pub fn snapshot(&self) -> Vec<VehicleSnapshot> {
        self.vehicles
            .values()
            .map(|vehicle| vehicle.snapshot(&self.config))
            .collect()
    }

    /// Gets the current simulation frame index.
    pub fn frame(&self) -> usize {
        self.frame
    }

    /// The number of vehicles in the simulation.
    pub fn vehicle_count(&self) -> usize {
        self.vehicles.len()
    }

    /// Returns an iterator over all the vehicles in the simulation.
    pub fn iter_vehicles(&self) -> impl Iterator<Item = &Vehicle> {
        self.vehicles.values()
    }

    /// Gets a reference to the vehicle with the given ID, if it is still in the simulation.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::vehicle::Behavior;

    fn config() -> SimConfig {
        SimConfig {
            seed: Some(7),
            ..Default::default()
        }
    }

    #[test]
    fn rejects_invalid_lane() {
        let mut sim = Simulation::new(config()).unwrap();
        let err = sim.add_vehicle(&VehicleAttributes::reactive(3, 0.0)).unwrap_err();
        assert!(matches!(err, SimError::InvalidLane { lane: 3, num_lanes: 3 }));
        assert_eq!(sim.vehicle_count(), 0);
    }

    #[test]
    fn rejects_invalid_idm_params() {
        let mut sim = Simulation::new(config()).unwrap();
        let mut attributes = VehicleAttributes::smart(0, 0.0, Default::default());
        if let Behavior::Smart(params) = &mut attributes.behavior {
            params.idm.max_acceleration = -0.5;
        }
        assert!(matches!(
            sim.add_vehicle(&attributes),
            Err(SimError::InvalidIdmParams(_))
        ));
    }

    #[test]
    fn rejects_invalid_config() {
        let config = SimConfig {
            track_length: -1.0,
            ..config()
        };
        assert!(Simulation::new(config).is_err());
    }

    #[test]
    fn removal_is_idempotent() {
        let mut sim = Simulation::new(config()).unwrap();
        let id = sim.add_vehicle(&VehicleAttributes::reactive(0, 0.0)).unwrap();
        assert!(sim.remove_vehicle(id));
        assert!(!sim.remove_vehicle(id));
        assert!(sim.get_vehicle(id).is_none());
    }

    #[test]
    fn snapshot_reports_lane_centres() {
        let mut sim = Simulation::new(config()).unwrap();
        let id = sim
            .add_vehicle(&VehicleAttributes::reactive(2, 10.0).with_vel(3.0))
            .unwrap();
        let snapshot = sim.snapshot();
        assert_eq!(snapshot.len(), 1);
        assert_eq!(snapshot[0].id, id);
        assert_eq!(snapshot[0].y, 100.0);
        assert_eq!(snapshot[0].speed, 3.0);
    }

    #[test]
    fn step_is_independent_of_insertion_order() {
        // A platoon in one lane, inserted front-to-back and back-to-front
        let positions = [0.0, 60.0, 120.0, 180.0];
        let run = |order: &[f64]| {
            let mut sim = Simulation::new(config()).unwrap();
            for pos in order {
                sim.add_vehicle(&VehicleAttributes::reactive(0, *pos).with_vel(5.0))
                    .unwrap();
            }
            for _ in 0..20 {
                sim.step(1.0);
            }
            let mut state = sim
                .iter_vehicles()
                .map(|veh| (veh.pos(), veh.vel()))
                .collect::<Vec<_>>();
            state.sort_by(|a, b| a.0.total_cmp(&b.0));
            state
        };
        let forward = run(&positions);
        let reversed = run(&[180.0, 120.0, 60.0, 0.0]);
        assert_eq!(forward, reversed);
    }

    #[test]
    fn randomised_speeds_are_bounded() {
        let mut sim = Simulation::new(config()).unwrap();
        let params = crate::SmartParams::default();
        for lane in 0..3 {
            sim.add_vehicle(&VehicleAttributes::smart(lane, 0.0, params))
                .unwrap();
        }
        sim.randomise_desired_speeds(0.5).unwrap();
        for vehicle in sim.iter_vehicles() {
            let Behavior::Smart(params) = vehicle.behavior() else {
                panic!("expected a smart vehicle");
            };
            assert!(params.idm.desired_speed >= 15.0 && params.idm.desired_speed <= 25.0);
        }
        assert!(sim.randomise_desired_speeds(-1.0).is_err());
    }
}
