//! Tests that run merge control on a simulated merge.

use traffic_zipper::{
    LinkAttributes, LinkId, MergeController, MergeStatus, SchedulerParams, SimClock, Simulation,
    TrafficEnv, VehicleAttributes, VehicleId,
};

const TIME_STEP: f64 = 0.1;

fn params() -> SchedulerParams {
    SchedulerParams {
        stopline_offset: 0.0,
        ..Default::default()
    }
}

fn car(params: &SchedulerParams) -> VehicleAttributes {
    VehicleAttributes {
        length: params.vehicle_length,
        max_acc: params.max_accel,
        comf_dec: 2.5,
    }
}

/// Two 300 m approaches merging into a 300 m outgoing link.
fn merge(sim: &mut Simulation, params: &SchedulerParams) -> (LinkId, LinkId, LinkId) {
    let attribs = LinkAttributes {
        length: 300.0,
        speed_limit: params.vmax,
    };
    let west = sim.add_link(&attribs);
    let south = sim.add_link(&attribs);
    let east = sim.add_link(&attribs);
    sim.add_junction(&[(west, east), (south, east)]);
    (west, south, east)
}

fn spawn(
    sim: &mut Simulation,
    params: &SchedulerParams,
    link: LinkId,
    pos: f64,
    dst: LinkId,
) -> VehicleId {
    let id = sim.add_vehicle_at(&car(params), link, pos, params.vmax);
    assert!(sim.set_vehicle_destination(id, dst));
    id
}

#[test]
fn controller_covers_every_junction() {
    let params = params();
    let mut sim = Simulation::new();
    merge(&mut sim, &params);
    merge(&mut sim, &params);

    let controller = MergeController::new(&sim, params).unwrap();
    assert_eq!(controller.schedulers().len(), 2);
    for id in sim.intersection_ids() {
        let scheduler = controller.scheduler(id).unwrap();
        assert_eq!(scheduler.incoming().len(), 2);
        assert_eq!(scheduler.outgoing().len(), 1);
        assert_eq!(scheduler.approach_range(), 200.0);
    }
}

#[test]
fn short_approach_limits_range() {
    let params = params();
    let mut sim = Simulation::new();
    let short = sim.add_link(&LinkAttributes {
        length: 80.5,
        speed_limit: params.vmax,
    });
    let (west, _, east) = merge(&mut sim, &params);
    let junction = sim.add_junction(&[(short, east), (west, east)]);

    let controller = MergeController::new(&sim, params).unwrap();
    assert_eq!(controller.scheduler(junction).unwrap().approach_range(), 80.0);
}

#[test]
fn simultaneous_arrivals_cross_a_headway_apart() {
    let params = params();
    let mut sim = Simulation::new();
    let (west, south, east) = merge(&mut sim, &params);
    let mut controller = MergeController::new(&sim, params).unwrap();

    // Both vehicles are 150 m from the merge point
    let first = spawn(&mut sim, &params, west, 147.5, east);
    let second = spawn(&mut sim, &params, south, 147.5, east);

    let mut crossed = [None, None];
    let mut released = [false, false];
    for step in 0..600 {
        let reports = controller.tick(&mut sim, SimClock::from_step(step, TIME_STEP));
        if step == 0 {
            let admitted = &reports[0].admitted;
            assert_eq!(admitted.len(), 2);
            assert_eq!(admitted[0].vehicle, first);
            assert_eq!(admitted[0].grant.status, MergeStatus::OnSchedule);
            assert_eq!(admitted[1].vehicle, second);
            assert_eq!(admitted[1].grant.status, MergeStatus::Slowed);
            assert!(admitted[1].grant.speed < params.vmax);
            assert!(!sim.get_vehicle(second).unwrap().is_governed());
        }
        sim.step(TIME_STEP);

        for (idx, id) in [first, second].into_iter().enumerate() {
            if let Some(vehicle) = sim.get_vehicle(id) {
                if vehicle.link_id() == Some(east) && crossed[idx].is_none() {
                    crossed[idx] = Some(sim.time());
                }
                if vehicle.merge_status() == Some(MergeStatus::Released) {
                    assert!(vehicle.is_governed());
                    assert_eq!(vehicle.target_speed(), Some(params.vmax));
                    released[idx] = true;
                }
            }
        }
    }

    let gap = crossed[1].unwrap() - crossed[0].unwrap();
    assert!(gap >= params.headway() - TIME_STEP, "crossing gap {} s", gap);
    assert_eq!(released, [true, true]);
    assert_eq!(sim.exited(), 2);

    let stats = controller.stats();
    assert_eq!(stats.admitted, 2);
    assert_eq!(stats.slowed, 1);
    assert_eq!(stats.released, 2);
    assert_eq!(stats.expired, 0);
    assert_eq!(controller.schedulers()[0].tracked_count(), 0);
}

#[test]
fn reservations_stay_consistent_under_load() {
    let params = params();
    let mut sim = Simulation::new();
    let (west, south, east) = merge(&mut sim, &params);
    let mut controller = MergeController::new(&sim, params).unwrap();

    // A platoon on each approach, offset from each other
    for i in 0..8 {
        let pos = 2.5 + 15.0 * i as f64;
        spawn(&mut sim, &params, west, pos, east);
        spawn(&mut sim, &params, south, pos + 5.0, east);
    }

    for step in 0..2000 {
        let clock = SimClock::from_step(step, TIME_STEP);
        controller.tick(&mut sim, clock);
        sim.step(TIME_STEP);

        let scheduler = &controller.schedulers()[0];
        assert!(scheduler.is_consistent());
        if let Some(gap) = scheduler.timeline().min_gap() {
            assert!(gap >= clock.to_ticks(params.headway()) - 1e-9);
        }
    }

    let stats = controller.stats();
    assert_eq!(stats.admitted, 16);
    assert_eq!(stats.released, 16);
    assert_eq!(sim.exited(), 16);
}

#[test]
fn vehicle_removed_before_crossing_is_not_released() {
    let params = params();
    let mut sim = Simulation::new();
    let (west, _, east) = merge(&mut sim, &params);
    let mut controller = MergeController::new(&sim, params).unwrap();

    let lost = spawn(&mut sim, &params, west, 147.5, east);
    controller.tick(&mut sim, SimClock::from_step(0, TIME_STEP));
    sim.remove_vehicle(lost);

    for step in 1..100 {
        controller.tick(&mut sim, SimClock::from_step(step, TIME_STEP));
        sim.step(TIME_STEP);
    }

    let scheduler = &controller.schedulers()[0];
    assert!(scheduler.reservation(lost).is_some());
    assert!(scheduler.is_consistent());
    assert_eq!(controller.stats().released, 0);
}
