//! The boundary between a merge scheduler and the traffic simulation it controls.

use std::fmt::Debug;
use std::hash::Hash;
use thiserror::Error;

/// An error returned by a [TrafficEnv] query or command.
#[derive(Clone, Debug, PartialEq, Eq, Error)]
pub enum EnvError {
    #[error("vehicle {0} is not in the simulation")]
    UnknownVehicle(String),

    #[error("approach {0} does not exist")]
    UnknownApproach(String),

    #[error("intersection {0} does not exist")]
    UnknownIntersection(String),

    #[error("approach {approach} is not on the route of vehicle {vehicle}")]
    NotOnRoute { vehicle: String, approach: String },
}

pub type EnvResult<T> = Result<T, EnvError>;

impl EnvError {
    pub fn unknown_vehicle(id: impl Debug) -> Self {
        Self::UnknownVehicle(format!("{:?}", id))
    }

    pub fn unknown_approach(id: impl Debug) -> Self {
        Self::UnknownApproach(format!("{:?}", id))
    }

    pub fn unknown_intersection(id: impl Debug) -> Self {
        Self::UnknownIntersection(format!("{:?}", id))
    }

    pub fn not_on_route(vehicle: impl Debug, approach: impl Debug) -> Self {
        Self::NotOnRoute {
            vehicle: format!("{:?}", vehicle),
            approach: format!("{:?}", approach),
        }
    }
}

/// A single lane of an approach.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Lane<A> {
    /// The approach the lane belongs to.
    pub approach: A,
    /// The index of the lane within the approach, counted from the right.
    pub index: u8,
}

impl<A> Lane<A> {
    /// Creates a new lane reference.
    pub fn new(approach: A, index: u8) -> Self {
        Self { approach, index }
    }
}

/// A movement through an intersection, from an incoming lane to an outgoing lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ControlledLink<A> {
    pub from: Lane<A>,
    pub to: Lane<A>,
}

/// The merge status of a vehicle, reported to the environment for observability.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum MergeStatus {
    /// Crossing at its earliest feasible time at full speed.
    OnSchedule,
    /// Slowed down to fit into a later slot.
    Slowed,
    /// The assigned slot needs a speed below the configured floor.
    Infeasible,
    /// Left the controlled zone.
    Released,
}

/// The simulation clock as seen by a scheduler.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SimClock {
    /// The current simulation time in ticks.
    pub now: f64,
    /// The number of ticks per second.
    pub scale: f64,
}

impl SimClock {
    /// Creates a clock for the given step index and step length in seconds.
    pub fn from_step(step: u64, time_step: f64) -> Self {
        Self {
            now: step as f64,
            scale: 1.0 / time_step,
        }
    }

    /// Converts a duration in seconds to ticks.
    pub fn to_ticks(&self, secs: f64) -> f64 {
        secs * self.scale
    }

    /// Converts a duration in ticks to seconds.
    pub fn to_secs(&self, ticks: f64) -> f64 {
        ticks / self.scale
    }
}

/// The capabilities a merge scheduler needs from the simulation it controls.
pub trait TrafficEnv {
    type VehicleId: Copy + Eq + Hash + Debug;
    type ApproachId: Copy + Eq + Hash + Debug;
    type IntersectionId: Copy + Eq + Debug;

    /// The intersections operated as merge points.
    fn intersection_ids(&self) -> Vec<Self::IntersectionId>;

    /// The controlled-link table of an intersection.
    fn controlled_links(
        &self,
        intersection: Self::IntersectionId,
    ) -> EnvResult<Vec<ControlledLink<Self::ApproachId>>>;

    /// The physical length of an approach in m.
    fn approach_length(&self, approach: Self::ApproachId) -> EnvResult<f64>;

    /// The vehicles currently on an approach.
    fn approach_vehicles(&self, approach: Self::ApproachId) -> EnvResult<Vec<Self::VehicleId>>;

    /// The vehicle's speed in m/s.
    fn vehicle_speed(&self, vehicle: Self::VehicleId) -> EnvResult<f64>;

    /// The distance the vehicle has to drive along its route to reach
    /// the end of the given approach, in m.
    fn distance_to_end(
        &self,
        vehicle: Self::VehicleId,
        approach: Self::ApproachId,
    ) -> EnvResult<f64>;

    /// Sets the speed the vehicle should drive at, in m/s.
    fn set_vehicle_speed(&mut self, vehicle: Self::VehicleId, speed: f64) -> EnvResult<()>;

    /// Enables or disables the vehicle's own speed safety logic.
    /// While disabled, the commanded speed is obeyed exactly.
    fn set_speed_governor(&mut self, vehicle: Self::VehicleId, enabled: bool) -> EnvResult<()>;

    /// Marks the vehicle with its merge status.
    fn mark_vehicle(&mut self, _vehicle: Self::VehicleId, _status: MergeStatus) -> EnvResult<()> {
        Ok(())
    }
}
