//! Tests that involve the simulation of a single link.

use assert_approx_eq::assert_approx_eq;
use traffic_zipper::{LinkAttributes, Simulation, VehicleAttributes};

const CAR: VehicleAttributes = VehicleAttributes {
    length: 5.0,
    max_acc: 2.0,
    comf_dec: 2.0,
};

/// Test that a vehicle's position increases monotonically.
#[test]
fn vehicle_drives_forward() {
    let mut sim = Simulation::new();
    let link = sim.add_link(&LinkAttributes {
        length: 1000.0,
        speed_limit: 16.66,
    });
    let veh = sim.add_vehicle(&CAR, link);

    let mut pos = sim.get_vehicle(veh).unwrap().pos_mid();
    for _ in 0..100 {
        sim.step(0.1);
        let next_pos = sim.get_vehicle(veh).unwrap().pos_mid();
        assert!(next_pos > pos);
        pos = next_pos;
    }
}

/// Test that a vehicle leaves the simulation at the end of its route.
#[test]
fn vehicle_exits_at_end_of_route() {
    let mut sim = Simulation::new();
    let attribs = LinkAttributes {
        length: 50.0,
        speed_limit: 10.0,
    };
    let a = sim.add_link(&attribs);
    let b = sim.add_link(&attribs);
    sim.add_link_connection(a, b);
    let veh = sim.add_vehicle_at(&CAR, a, 2.5, 10.0);
    assert!(sim.set_vehicle_destination(veh, b));

    let mut seen_on_b = false;
    for _ in 0..200 {
        sim.step(0.1);
        match sim.get_vehicle(veh) {
            Some(vehicle) => seen_on_b |= vehicle.link_id() == Some(b),
            None => break,
        }
    }
    assert!(seen_on_b);
    assert!(sim.get_vehicle(veh).is_none());
    assert_eq!(sim.exited(), 1);
}

/// Test that a follower never runs into a slower leader.
#[test]
fn follower_keeps_distance() {
    let mut sim = Simulation::new();
    let link = sim.add_link(&LinkAttributes {
        length: 2000.0,
        speed_limit: 20.0,
    });
    let leader = sim.add_vehicle_at(&CAR, link, 60.0, 5.0);
    let follower = sim.add_vehicle_at(&CAR, link, 2.5, 20.0);

    for _ in 0..300 {
        sim.step(0.1);
        let lead = sim.get_vehicle(leader).unwrap();
        let follow = sim.get_vehicle(follower).unwrap();
        assert!(follow.pos_front() < lead.pos_rear());
    }
}

/// Test that routing fails for unreachable links.
#[test]
fn unreachable_destination() {
    let mut sim = Simulation::new();
    let attribs = LinkAttributes {
        length: 50.0,
        speed_limit: 10.0,
    };
    let a = sim.add_link(&attribs);
    let b = sim.add_link(&attribs);
    let veh = sim.add_vehicle(&CAR, a);
    assert!(!sim.set_vehicle_destination(veh, b));
}

/// Test that randomised velocity adjustments spread the free-flow speeds
/// within a quarter of the speed limit.
#[test]
fn velocity_adjusts_spread_free_flow_speeds() {
    let mut sim = Simulation::new();
    let attribs = LinkAttributes {
        length: 2000.0,
        speed_limit: 16.0,
    };
    // One vehicle per link so nobody follows anybody
    let vehicles = (0..8)
        .map(|_| {
            let link = sim.add_link(&attribs);
            sim.add_vehicle_at(&CAR, link, 2.5, 16.0)
        })
        .collect::<Vec<_>>();
    sim.randomise_velocity_adjusts(0.1).unwrap();
    assert!(sim.randomise_velocity_adjusts(f64::NAN).is_err());

    for _ in 0..600 {
        sim.step(0.1);
    }
    let speeds = vehicles
        .iter()
        .map(|id| sim.get_vehicle(*id).unwrap().vel())
        .collect::<Vec<_>>();
    for speed in &speeds {
        assert!(*speed > 0.75 * 16.0 - 0.01, "speed {}", speed);
        assert!(*speed < 1.25 * 16.0 + 0.01, "speed {}", speed);
    }
    let min = speeds.iter().copied().fold(f64::INFINITY, f64::min);
    let max = speeds.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    assert!(max - min > 0.01);
}

/// Test that velocity adjustments are clamped.
#[test]
fn velocity_adjust_is_clamped() {
    let mut sim = Simulation::new();
    let attribs = LinkAttributes {
        length: 2000.0,
        speed_limit: 16.0,
    };
    let (a, b) = (sim.add_link(&attribs), sim.add_link(&attribs));
    let slow = sim.add_vehicle_at(&CAR, a, 2.5, 16.0);
    let fast = sim.add_vehicle_at(&CAR, b, 2.5, 16.0);
    assert!(sim.set_velocity_adjust(slow, 0.1));
    assert!(sim.set_velocity_adjust(fast, 3.0));

    for _ in 0..600 {
        sim.step(0.1);
    }
    assert_approx_eq!(sim.get_vehicle(slow).unwrap().vel(), 12.0, 0.01);
    assert_approx_eq!(sim.get_vehicle(fast).unwrap().vel(), 20.0, 0.01);

    sim.remove_vehicle(slow);
    assert!(!sim.set_velocity_adjust(slow, 1.0));
}
