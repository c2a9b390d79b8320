use crate::{LinkId, LinkSet, VehicleId, VehicleSet};

/// The maximum lookahead for the car following model, in s.
const MAX_LOOKAHEAD: f64 = 10.0;

/// A link represents a single lane of traffic.
#[derive(Clone, Debug)]
pub struct Link {
    /// The length of the link in m.
    length: f64,
    /// The links that succeed this one.
    links_out: Vec<LinkId>,
    /// Speed limit in m/s.
    speed_limit: f64,
    /// The vehicles on the link, ordered from the start of the link to the end.
    vehicles: Vec<VehicleId>,
}

/// The attributes of a link.
#[derive(Clone, Copy, Debug)]
pub struct LinkAttributes {
    /// The length of the link in m.
    pub length: f64,
    /// The speed limit in m/s.
    pub speed_limit: f64,
}

impl Link {
    /// Creates a new link.
    pub(crate) fn new(attribs: &LinkAttributes) -> Self {
        Self {
            length: attribs.length,
            links_out: vec![],
            speed_limit: attribs.speed_limit,
            vehicles: vec![],
        }
    }

    /// Gets the length of the link in m.
    pub fn length(&self) -> f64 {
        self.length
    }

    /// The links that succeed this one.
    pub fn links_out(&self) -> &[LinkId] {
        &self.links_out
    }

    /// The vehicles on the link, ordered from the start of the link to the end.
    pub fn vehicle_ids(&self) -> &[VehicleId] {
        &self.vehicles
    }

    /// Adds a successor link.
    pub(crate) fn add_link_out(&mut self, link_id: LinkId) {
        self.links_out.push(link_id);
    }

    /// Inserts the vehicle with the given ID into the link.
    pub(crate) fn insert_vehicle(&mut self, vehicles: &VehicleSet, id: VehicleId) {
        let veh_pos = vehicles[id].pos_mid();
        let idx = self
            .vehicles
            .iter()
            .map(|id| vehicles[*id].pos_mid())
            .position(|pos| pos > veh_pos)
            .unwrap_or(self.vehicles.len());
        self.vehicles.insert(idx, id);
    }

    /// Removes the vehicle with the given ID from the link.
    pub(crate) fn remove_vehicle(&mut self, id: VehicleId) {
        if let Some(idx) = self.vehicles.iter().rposition(|v| *v == id) {
            self.vehicles.remove(idx);
        }
    }

    /// Applies the speed limit and the car following model to all vehicles on this link.
    pub(crate) fn apply_accelerations(&self, links: &LinkSet, vehicles: &VehicleSet) {
        for (idx, veh_id) in self.vehicles.iter().enumerate() {
            let vehicle = &vehicles[*veh_id];
            vehicle.apply_speed_limit(self.speed_limit);

            match self.vehicles.get(idx + 1) {
                Some(leader_id) => {
                    let leader = &vehicles[*leader_id];
                    vehicle.follow_vehicle(leader.pos_rear(), leader.vel());
                }
                None => {
                    let max_dist = MAX_LOOKAHEAD * self.speed_limit;
                    if let Some((rear_pos, vel)) =
                        self.leader_downstream(links, vehicles, vehicle.route(), max_dist)
                    {
                        vehicle.follow_vehicle(rear_pos, vel);
                    }
                }
            }
        }
    }

    /// Finds the last vehicle on the links following this one along `route`,
    /// searching at most `max_dist` metres past the end of this link.
    /// Returns its rear position relative to the start of this link and its velocity.
    fn leader_downstream(
        &self,
        links: &LinkSet,
        vehicles: &VehicleSet,
        route: &[LinkId],
        max_dist: f64,
    ) -> Option<(f64, f64)> {
        let mut offset = self.length;
        for link_id in route.iter().skip(1) {
            if offset - self.length > max_dist {
                break;
            }
            let link = &links[*link_id];
            if let Some(leader_id) = link.vehicles.first() {
                let leader = &vehicles[*leader_id];
                return Some((offset + leader.pos_rear(), leader.vel()));
            }
            offset += link.length;
        }
        None
    }
}
