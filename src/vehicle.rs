use self::acceleration::AccelerationModel;
use crate::env::MergeStatus;
use crate::{LinkId, LinkSet, VehicleId};
use smallvec::SmallVec;

mod acceleration;
mod pathfinding;

pub(crate) use self::pathfinding::find_route;

/// The time gap vehicles keep to the vehicle ahead, in s.
const TIME_HEADWAY: f64 = 1.5; // s

/// The range of desired velocity adjustment factors.
const MIN_VELOCITY_ADJUST: f64 = 0.75;
const MAX_VELOCITY_ADJUST: f64 = 1.25;

/// A simulated vehicle.
#[derive(Clone, Debug)]
pub struct Vehicle {
    /// The vehicle's ID
    pub(crate) id: VehicleId,
    /// Half the vehicle's length in m.
    half_len: f64,
    /// The acceleration model
    acc: AccelerationModel,
    /// The longitudinal position of the centre of the vehicle along the current link, in m.
    pos: f64,
    /// The velocity in m/s.
    vel: f64,
    /// The vehicle's route, including the link it's currently on.
    route: SmallVec<[LinkId; 8]>,
    /// The speed the vehicle has been told to drive at, in m/s.
    target_speed: Option<f64>,
    /// Whether the vehicle's own speed safety logic is active.
    governed: bool,
    /// The merge status last reported for this vehicle.
    merge_status: Option<MergeStatus>,
}

/// The attributes of a simulated vehicle.
#[derive(Clone, Copy)]
pub struct VehicleAttributes {
    /// The vehicle length in m.
    pub length: f64,
    /// The maximum acceleration of the vehicle, in m/s^2.
    pub max_acc: f64,
    /// The comfortable deceleration of the vehicle, a positive number in m/s^2.
    pub comf_dec: f64,
}

impl Vehicle {
    /// Creates a new vehicle.
    pub(crate) fn new(id: VehicleId, attributes: &VehicleAttributes) -> Self {
        Self {
            id,
            half_len: 0.5 * attributes.length,
            acc: AccelerationModel::new(&acceleration::ModelParams {
                time_headway: TIME_HEADWAY,
                max_acceleration: attributes.max_acc,
                comf_deceleration: attributes.comf_dec,
            }),
            pos: 0.0,
            vel: 0.0,
            route: SmallVec::new(),
            target_speed: None,
            governed: true,
            merge_status: None,
        }
    }

    /// Gets the vehicle's ID.
    pub fn id(&self) -> VehicleId {
        self.id
    }

    /// The ID of the link the vehicle is currently travelling on.
    pub fn link_id(&self) -> Option<LinkId> {
        self.route.first().copied()
    }

    /// The links the vehicle will travel on, starting with the current one.
    pub fn route(&self) -> &[LinkId] {
        &self.route
    }

    /// The longitudinal position of the centre of the vehicle in m.
    pub fn pos_mid(&self) -> f64 {
        self.pos
    }

    /// The longitudinal position of the rear of the vehicle in m.
    pub fn pos_rear(&self) -> f64 {
        self.pos - self.half_len
    }

    /// The longitudinal position of the front of the vehicle in m.
    pub fn pos_front(&self) -> f64 {
        self.pos + self.half_len
    }

    /// The vehicle's velocity in m/s.
    pub fn vel(&self) -> f64 {
        self.vel
    }

    /// The speed the vehicle has been told to drive at, in m/s.
    pub fn target_speed(&self) -> Option<f64> {
        self.target_speed
    }

    /// Whether the vehicle's own speed safety logic is active.
    pub fn is_governed(&self) -> bool {
        self.governed
    }

    /// The merge status last reported for this vehicle.
    pub fn merge_status(&self) -> Option<MergeStatus> {
        self.merge_status
    }

    /// Set the desired velocity adjustment factor for the vehicle, a scalar which is
    /// multiplied with the speed limit prior to calculating the speed limit
    /// acceleration of the vehicle each step. Clamped to `[0.75, 1.25]`.
    pub(crate) fn set_velocity_adjust(&mut self, factor: f64) {
        self.acc
            .set_velocity_adjust(factor.clamp(MIN_VELOCITY_ADJUST, MAX_VELOCITY_ADJUST));
    }

    /// Sets the speed the vehicle should drive at.
    pub(crate) fn set_target_speed(&mut self, speed: f64) {
        self.target_speed = Some(speed);
    }

    /// Enables or disables the vehicle's own speed safety logic.
    pub(crate) fn set_governed(&mut self, governed: bool) {
        self.governed = governed;
    }

    pub(crate) fn set_merge_status(&mut self, status: MergeStatus) {
        self.merge_status = Some(status);
    }

    /// Resets internal model states in preparation for a new step of the simulation.
    pub(crate) fn reset(&self) {
        self.acc.reset()
    }

    /// Applies the speed limit of the current link and any commanded speed.
    /// An ungoverned vehicle drives at exactly the commanded speed.
    pub(crate) fn apply_speed_limit(&self, speed_limit: f64) {
        match (self.governed, self.target_speed) {
            (false, Some(target)) => self.acc.track_speed(self.vel, target),
            (_, target) => {
                let limit = target.map_or(speed_limit, |t| f64::min(t, speed_limit));
                self.acc.apply_current_speed_limit(self.vel, limit);
            }
        }
    }

    /// Applies an acceleration to the vehicle so it follows the vehicle ahead.
    ///
    /// # Parameters
    /// * `rear_pos` - The position of the leader's rear, relative to this vehicle's link
    /// * `vel` - The leader's velocity
    pub(crate) fn follow_vehicle(&self, rear_pos: f64, vel: f64) {
        if !self.governed {
            return;
        }
        let net_dist = rear_pos - self.pos_front();
        self.acc.follow_vehicle(net_dist, self.vel, vel);
    }

    /// Integrates the vehicle's velocity and position
    ///
    /// # Parameters
    /// * `dt` - The time step in seconds
    pub(crate) fn integrate(&mut self, dt: f64) {
        let vel = f64::max(self.vel + dt * self.acc.acc(), 0.0);
        let pos = self.pos + 0.5 * (self.vel + vel) * dt;
        self.vel = vel;
        self.pos = pos;
    }

    /// Checks whether the vehicle has travelled past the end of its current link,
    /// and if so, advances it to the next link on its route if there is one.
    /// Returns `true` iff the vehicle was advanced.
    ///
    /// # Parameters
    /// * `links` - The links in the network
    pub(crate) fn advance(&mut self, links: &LinkSet) -> bool {
        if let Some(link_id) = self.route.first() {
            let length = links[*link_id].length();
            if length < self.pos {
                self.route.remove(0);
                self.pos -= length;
                return true;
            }
        }
        false
    }

    /// Sets the vehicle's position in the network.
    /// This also clears the vehicle's route.
    pub(crate) fn set_location(&mut self, link: LinkId, pos: f64, vel: f64) {
        self.route.clear();
        self.route.push(link);
        self.pos = pos;
        self.vel = vel;
    }

    /// Sets the links the vehicle will follow after its current link.
    pub(crate) fn set_route(&mut self, route: &[LinkId]) {
        self.route.truncate(1);
        self.route.extend_from_slice(route);
    }

    /// Calculates the distance the vehicle's front has to travel to reach
    /// the end of the given link, if the link is on its route.
    pub(crate) fn distance_to_end(&self, link_id: LinkId, links: &LinkSet) -> Option<f64> {
        let idx = self.route.iter().position(|id| *id == link_id)?;
        let ahead = self.route[..=idx]
            .iter()
            .map(|id| links[*id].length())
            .sum::<f64>();
        Some(ahead - self.pos_front())
    }
}
