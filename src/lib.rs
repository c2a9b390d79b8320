//! Slot-reservation merging control for intersections ("zippers").
//!
//! An [IntersectionScheduler] assigns every vehicle approaching a merge point a crossing
//! time and a speed, so that consecutive crossings are at least one headway apart.
//! It talks to the simulation through the [TrafficEnv] trait; [Simulation] is a simple
//! in-memory implementation of it.

pub use controller::{MergeController, MergeStats};
pub use env::{
    ControlledLink, EnvError, EnvResult, Lane, MergeStatus, SimClock, TrafficEnv,
};
pub use junction::Junction;
pub use link::{Link, LinkAttributes};
pub use params::{ParamsError, SchedulerParams};
pub use scheduler::eta::compute_eta;
pub use scheduler::{
    Admission, IntersectionScheduler, Reservation, SchedulerError, SlotGrant, TickReport,
    VehicleObservation,
};
pub use simulation::Simulation;
use slotmap::{new_key_type, SlotMap};
pub use slotmap::{Key, KeyData};
pub use vehicle::{Vehicle, VehicleAttributes};

mod controller;
pub mod env;
mod junction;
mod link;
mod params;
pub mod scheduler;
mod simulation;
mod vehicle;

new_key_type! {
    /// Unique ID of a [Link].
    pub struct LinkId;
    /// Unique ID of a [Vehicle].
    pub struct VehicleId;
    /// Unique ID of a [Junction].
    pub struct JunctionId;
}

type LinkSet = SlotMap<LinkId, Link>;
type VehicleSet = SlotMap<VehicleId, Vehicle>;
