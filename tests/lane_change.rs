//! Tests of the MOBIL lane changing behaviour of smart vehicles.

use lanesim::{
    MobilParams, SimConfig, Simulation, SmartParams, SpawnController, SpawnPolicy,
    VehicleAttributes,
};

/// A configuration whose smart vehicles never change lanes at random.
fn config() -> SimConfig {
    SimConfig {
        seed: Some(5),
        mobil: MobilParams {
            random_acceptance_enabled: false,
            ..Default::default()
        },
        ..Default::default()
    }
}

/// Asserts that no two vehicles in the same lane overlap.
fn assert_no_overlaps(sim: &Simulation) {
    let config = sim.config();
    for lane in 0..config.num_lanes {
        let mut positions = sim
            .iter_vehicles()
            .filter(|veh| veh.lane() == lane)
            .map(|veh| veh.pos())
            .collect::<Vec<_>>();
        positions.sort_by(|a, b| a.total_cmp(b));
        for pair in positions.windows(2) {
            assert!(
                pair[1] - pair[0] > config.vehicle_length,
                "vehicles at {} and {} overlap in lane {}",
                pair[0],
                pair[1],
                lane
            );
        }
    }
}

/// Test that a smart vehicle stuck behind a slow leader moves into a clear adjacent lane,
/// avoiding the lane where it would cut in front of the vehicle behind.
#[test]
fn overtakes_slow_leader() {
    let config = config();
    let params = SmartParams::from(&config);
    let mut sim = Simulation::new(config).unwrap();
    let veh = sim
        .add_vehicle(&VehicleAttributes::smart(1, 300.0, params).with_vel(5.0))
        .unwrap();
    let other = sim
        .add_vehicle(&VehicleAttributes::smart(2, 190.0, params).with_vel(5.0))
        .unwrap();
    sim.add_vehicle(&VehicleAttributes::reactive(1, 400.0).with_vel(1.0))
        .unwrap();
    sim.add_vehicle(&VehicleAttributes::reactive(0, 280.0).with_vel(5.0))
        .unwrap();

    sim.step(1.0);
    assert_eq!(sim.get_vehicle(veh).unwrap().lane(), 2);
    assert_eq!(sim.get_vehicle(other).unwrap().lane(), 2);
}

/// Test that a smart vehicle stays in its lane when both adjacent lanes are unsafe.
#[test]
fn stays_when_adjacent_lanes_are_unsafe() {
    let config = config();
    let params = SmartParams::from(&config);
    let mut sim = Simulation::new(config).unwrap();
    let veh = sim
        .add_vehicle(&VehicleAttributes::smart(1, 300.0, params).with_vel(5.0))
        .unwrap();
    sim.add_vehicle(&VehicleAttributes::smart(2, 260.0, params).with_vel(5.0))
        .unwrap();
    sim.add_vehicle(&VehicleAttributes::reactive(1, 400.0).with_vel(1.0))
        .unwrap();
    sim.add_vehicle(&VehicleAttributes::reactive(0, 280.0).with_vel(5.0))
        .unwrap();

    sim.step(1.0);
    assert_eq!(sim.get_vehicle(veh).unwrap().lane(), 1);
}

/// Test that a vehicle on a free road with nothing to gain never changes lanes,
/// even when random acceptance is certain.
#[test]
fn no_change_without_incentive() {
    let mut config = config();
    config.mobil = MobilParams {
        incentive_threshold: 0.005,
        random_acceptance: 1.0,
        random_acceptance_enabled: true,
    };
    let params = SmartParams::from(&config);
    let mut sim = Simulation::new(config).unwrap();
    let veh = sim
        .add_vehicle(&VehicleAttributes::smart(1, 0.0, params).with_vel(5.0))
        .unwrap();
    for _ in 0..50 {
        sim.step(1.0);
        assert_eq!(sim.get_vehicle(veh).unwrap().lane(), 1);
    }
}

/// Test that the random acceptance clause takes a lane change whose gain is below the
/// threshold, and that disabling it suppresses the change.
#[test]
fn random_acceptance_is_toggleable() {
    let run = |enabled: bool| {
        let mut config = config();
        config.num_lanes = 2;
        config.mobil = MobilParams {
            incentive_threshold: 1e9,
            random_acceptance: 1.0,
            random_acceptance_enabled: enabled,
        };
        let params = SmartParams::from(&config);
        let mut sim = Simulation::new(config).unwrap();
        let veh = sim
            .add_vehicle(&VehicleAttributes::smart(0, 0.0, params).with_vel(5.0))
            .unwrap();
        sim.add_vehicle(&VehicleAttributes::reactive(0, 400.0).with_vel(5.0))
            .unwrap();
        sim.step(1.0);
        sim.get_vehicle(veh).unwrap().lane()
    };
    assert_eq!(run(true), 1);
    assert_eq!(run(false), 0);
}

/// Test that no vehicle ever moves into a lane where the closest vehicle behind it
/// is nearer than the safe distance.
#[test]
fn lane_changes_are_always_safe() {
    let config = SimConfig {
        seed: Some(11),
        ..Default::default()
    };
    let mut sim = Simulation::new(config.clone()).unwrap();
    let mut spawner = SpawnController::new(
        SpawnPolicy {
            interval: 4,
            smart_ratio: 0.6,
            ..Default::default()
        },
        Some(12),
    )
    .unwrap();

    let mut lane_changes = 0;
    for _ in 0..3000 {
        spawner.tick(&mut sim);
        let world = sim.world();
        let before = sim
            .iter_vehicles()
            .map(|veh| (veh.id(), veh.lane(), veh.pos()))
            .collect::<Vec<_>>();
        sim.step(1.0);
        for (id, lane, pos) in before {
            let Some(vehicle) = sim.get_vehicle(id) else {
                continue;
            };
            if vehicle.lane() == lane {
                continue;
            }
            lane_changes += 1;
            assert_eq!(vehicle.lane().abs_diff(lane), 1);
            if let Some(follower) = world.follower_of(vehicle.lane(), pos) {
                assert!(pos - follower.pos - config.vehicle_length >= config.safe_distance);
            }
        }
        assert_no_overlaps(&sim);
    }
    assert!(lane_changes > 0);
}

/// Test that two vehicles level with each other either side of an empty lane
/// cannot both move into it in the same tick.
#[test]
fn simultaneous_merges_do_not_collide() {
    let config = config();
    let params = SmartParams::from(&config);
    let mut sim = Simulation::new(config).unwrap();
    let left = sim
        .add_vehicle(&VehicleAttributes::smart(0, 300.0, params).with_vel(5.0))
        .unwrap();
    let right = sim
        .add_vehicle(&VehicleAttributes::smart(2, 300.0, params).with_vel(5.0))
        .unwrap();
    sim.add_vehicle(&VehicleAttributes::reactive(0, 400.0).with_vel(1.0))
        .unwrap();
    sim.add_vehicle(&VehicleAttributes::reactive(2, 400.0).with_vel(1.0))
        .unwrap();

    sim.step(1.0);
    let lanes = [left, right].map(|id| sim.get_vehicle(id).unwrap().lane());
    assert_eq!(lanes.iter().filter(|lane| **lane == 1).count(), 1);
    assert_no_overlaps(&sim);

    for _ in 0..20 {
        sim.step(1.0);
        assert_no_overlaps(&sim);
    }
}

/// Test that a vehicle level with a smart vehicle in the adjacent lane blocks its lane change.
#[test]
fn level_vehicle_blocks_lane_change() {
    let config = config();
    let params = SmartParams::from(&config);
    let mut sim = Simulation::new(config).unwrap();
    let veh = sim
        .add_vehicle(&VehicleAttributes::smart(0, 300.0, params).with_vel(5.0))
        .unwrap();
    sim.add_vehicle(&VehicleAttributes::reactive(0, 400.0).with_vel(1.0))
        .unwrap();
    sim.add_vehicle(&VehicleAttributes::reactive(1, 300.0).with_vel(5.0))
        .unwrap();

    sim.step(1.0);
    assert_eq!(sim.get_vehicle(veh).unwrap().lane(), 0);
    assert_no_overlaps(&sim);
}
