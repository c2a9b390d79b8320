use crate::env::{ControlledLink, EnvError, EnvResult, MergeStatus, TrafficEnv};
use crate::junction::Junction;
use crate::link::{Link, LinkAttributes};
use crate::vehicle::{find_route, Vehicle, VehicleAttributes};
use crate::{JunctionId, LinkId, LinkSet, VehicleId, VehicleSet};
use rand_distr::{Distribution, NormalError};
use slotmap::SlotMap;

/// Update vehicle accelerations at least once per this interval.
const ACCELERATION_UPDATE_SEC: f64 = 0.1; // s

/// A traffic simulation.
#[derive(Default)]
pub struct Simulation {
    /// The links in the network.
    links: LinkSet,
    /// The merge junctions.
    junctions: SlotMap<JunctionId, Junction>,
    /// The vehicles being simulated.
    vehicles: VehicleSet,
    /// The simulated time in s.
    time: f64,
    /// The number of vehicles that have reached the end of their route.
    exited: usize,
    /// The time since the last accelerations update in s.
    acc_update: f64,
}

impl Simulation {
    /// Creates a new simulation.
    pub fn new() -> Self {
        Default::default()
    }

    /// Adds a link to the network.
    pub fn add_link(&mut self, attributes: &LinkAttributes) -> LinkId {
        self.links.insert(Link::new(attributes))
    }

    /// Specifies that the end of the `from` link connects to the start of the `to` link.
    pub fn add_link_connection(&mut self, from: LinkId, to: LinkId) {
        self.links[from].add_link_out(to);
    }

    /// Adds a merge junction made up of the given (incoming, outgoing) link pairs.
    /// The links are connected if they aren't already.
    pub fn add_junction(&mut self, movements: &[(LinkId, LinkId)]) -> JunctionId {
        for (from, to) in movements {
            if !self.links[*from].links_out().contains(to) {
                self.add_link_connection(*from, *to);
            }
        }
        self.junctions.insert(Junction::new(movements))
    }

    /// Adds a stationary vehicle at the start of a link.
    pub fn add_vehicle(&mut self, attributes: &VehicleAttributes, link: LinkId) -> VehicleId {
        self.add_vehicle_at(attributes, link, 0.0, 0.0)
    }

    /// Adds a vehicle to the simulation.
    ///
    /// # Parameters
    /// * `attributes` - The vehicle's attributes
    /// * `link` - The link to place the vehicle on
    /// * `pos` - The position of the centre of the vehicle along the link, in m
    /// * `vel` - The initial velocity in m/s
    pub fn add_vehicle_at(
        &mut self,
        attributes: &VehicleAttributes,
        link: LinkId,
        pos: f64,
        vel: f64,
    ) -> VehicleId {
        let vehicle_id = self.vehicles.insert_with_key(|id| {
            let mut vehicle = Vehicle::new(id, attributes);
            vehicle.set_location(link, pos, vel);
            vehicle
        });
        self.links[link].insert_vehicle(&self.vehicles, vehicle_id);
        vehicle_id
    }

    /// Removes a vehicle from the simulation.
    pub fn remove_vehicle(&mut self, id: VehicleId) {
        let vehicle = self.vehicles.remove(id);
        if let Some(vehicle) = vehicle {
            if let Some(link_id) = vehicle.link_id() {
                self.links[link_id].remove_vehicle(vehicle.id());
            }
        }
    }

    /// Sets the vehicle's destination link, routing it along the shortest path.
    /// Returns `false` if the destination can't be reached.
    pub fn set_vehicle_destination(&mut self, vehicle_id: VehicleId, dst: LinkId) -> bool {
        let Some(vehicle) = self.vehicles.get_mut(vehicle_id) else {
            return false;
        };
        let Some(src) = vehicle.link_id() else {
            return false;
        };
        match find_route(src, dst, &self.links) {
            Some(route) => {
                vehicle.set_route(&route);
                true
            }
            None => false,
        }
    }

    /// Sets a vehicle's desired velocity adjustment factor, which is multiplied
    /// with the speed limit. The factor is clamped to `[0.75, 1.25]`.
    /// Returns `false` if the vehicle isn't in the simulation.
    pub fn set_velocity_adjust(&mut self, vehicle_id: VehicleId, factor: f64) -> bool {
        match self.vehicles.get_mut(vehicle_id) {
            Some(vehicle) => {
                vehicle.set_velocity_adjust(factor);
                true
            }
            None => false,
        }
    }

    /// Randomly assigns a desired velocity adjustment factor to each vehicle,
    /// which is sampled from a normal distribution with a mean of 1 (no adjustment)
    /// and standard deviation of `stddev`.
    pub fn randomise_velocity_adjusts(&mut self, stddev: f64) -> Result<(), NormalError> {
        let mut rand = rand::thread_rng();
        let distr = rand_distr::Normal::new(1.0, stddev)?;
        for (_, vehicle) in &mut self.vehicles {
            vehicle.set_velocity_adjust(distr.sample(&mut rand));
        }
        Ok(())
    }

    /// Advances the simulation by `dt` seconds.
    ///
    /// For a realistic simulation, do not use a time step greater than around 0.2.
    pub fn step(&mut self, dt: f64) {
        self.acc_update += dt;
        self.apply_accelerations();
        self.integrate(dt);
        self.advance_vehicles();
        self.time += dt;
    }

    /// Gets the simulated time in s.
    pub fn time(&self) -> f64 {
        self.time
    }

    /// The number of vehicles that have reached the end of their route.
    pub fn exited(&self) -> usize {
        self.exited
    }

    /// Gets a reference to the vehicle with the given ID, if it is still in the simulation.
    pub fn get_vehicle(&self, vehicle_id: VehicleId) -> Option<&Vehicle> {
        self.vehicles.get(vehicle_id)
    }

    /// Gets a reference to the link with the given ID.
    pub fn get_link(&self, link_id: LinkId) -> &Link {
        &self.links[link_id]
    }

    /// Calculates the accelerations of the vehicles.
    fn apply_accelerations(&mut self) {
        if self.acc_update < ACCELERATION_UPDATE_SEC {
            return;
        } else {
            self.acc_update = 0.0;
        }

        for (_, vehicle) in &mut self.vehicles {
            vehicle.reset();
        }
        for (_, link) in &self.links {
            link.apply_accelerations(&self.links, &self.vehicles);
        }
    }

    /// Integrates the velocities and positions of all vehicles.
    fn integrate(&mut self, dt: f64) {
        for (_, vehicle) in &mut self.vehicles {
            vehicle.integrate(dt);
        }
    }

    /// Find vehicles that have advanced their link and either move them
    /// to their new link or remove them from the simulation.
    fn advance_vehicles(&mut self) {
        let mut advanced = vec![];
        let mut exited = vec![];

        for (vehicle_id, vehicle) in &mut self.vehicles {
            let Some(link_id) = vehicle.link_id() else {
                continue;
            };
            // A vehicle can pass several short links in one step
            let mut did_advance = false;
            while vehicle.advance(&self.links) {
                did_advance = true;
            }

            if did_advance {
                self.links[link_id].remove_vehicle(vehicle_id);
                if let Some(link_id) = vehicle.link_id() {
                    // Vehicle is now on a new link
                    advanced.push((vehicle_id, link_id));
                } else {
                    // Vehicle has exited the simulation
                    exited.push(vehicle_id);
                }
            }
        }

        for (vehicle_id, link_id) in advanced {
            self.links[link_id].insert_vehicle(&self.vehicles, vehicle_id);
        }

        self.exited += exited.len();
        for vehicle_id in exited {
            self.vehicles.remove(vehicle_id);
        }
    }

    fn vehicle(&self, vehicle_id: VehicleId) -> EnvResult<&Vehicle> {
        self.vehicles
            .get(vehicle_id)
            .ok_or_else(|| EnvError::unknown_vehicle(vehicle_id))
    }

    fn vehicle_mut(&mut self, vehicle_id: VehicleId) -> EnvResult<&mut Vehicle> {
        self.vehicles
            .get_mut(vehicle_id)
            .ok_or_else(|| EnvError::unknown_vehicle(vehicle_id))
    }

    fn link(&self, link_id: LinkId) -> EnvResult<&Link> {
        self.links
            .get(link_id)
            .ok_or_else(|| EnvError::unknown_approach(link_id))
    }
}

impl TrafficEnv for Simulation {
    type VehicleId = VehicleId;
    type ApproachId = LinkId;
    type IntersectionId = JunctionId;

    fn intersection_ids(&self) -> Vec<JunctionId> {
        self.junctions.keys().collect()
    }

    fn controlled_links(&self, junction: JunctionId) -> EnvResult<Vec<ControlledLink<LinkId>>> {
        self.junctions
            .get(junction)
            .map(Junction::controlled_links)
            .ok_or_else(|| EnvError::unknown_intersection(junction))
    }

    fn approach_length(&self, approach: LinkId) -> EnvResult<f64> {
        self.link(approach).map(Link::length)
    }

    fn approach_vehicles(&self, approach: LinkId) -> EnvResult<Vec<VehicleId>> {
        self.link(approach).map(|link| link.vehicle_ids().to_vec())
    }

    fn vehicle_speed(&self, vehicle: VehicleId) -> EnvResult<f64> {
        self.vehicle(vehicle).map(Vehicle::vel)
    }

    fn distance_to_end(&self, vehicle: VehicleId, approach: LinkId) -> EnvResult<f64> {
        self.link(approach)?;
        self.vehicle(vehicle)?
            .distance_to_end(approach, &self.links)
            .ok_or_else(|| EnvError::not_on_route(vehicle, approach))
    }

    fn set_vehicle_speed(&mut self, vehicle: VehicleId, speed: f64) -> EnvResult<()> {
        self.vehicle_mut(vehicle)?.set_target_speed(speed);
        Ok(())
    }

    fn set_speed_governor(&mut self, vehicle: VehicleId, enabled: bool) -> EnvResult<()> {
        self.vehicle_mut(vehicle)?.set_governed(enabled);
        Ok(())
    }

    fn mark_vehicle(&mut self, vehicle: VehicleId, status: MergeStatus) -> EnvResult<()> {
        self.vehicle_mut(vehicle)?.set_merge_status(status);
        Ok(())
    }
}
