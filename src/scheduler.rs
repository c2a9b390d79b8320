use self::eta::compute_eta;
use self::timeline::ReservationTimeline;
use self::topology::Topology;
use crate::env::{EnvError, EnvResult, MergeStatus, SimClock, TrafficEnv};
use crate::params::{ParamsError, SchedulerParams};
use log::{debug, info, warn};
use rustc_hash::FxHashMap;
use thiserror::Error;

pub mod eta;
pub mod timeline;
pub mod topology;

/// Reservations further ahead than this many headways times `vmax` are considered leaked.
const STALE_HORIZON_FACTOR: f64 = 20.0;

/// An error constructing an [IntersectionScheduler].
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("invalid scheduler parameters: {0}")]
    Params(#[from] ParamsError),

    #[error("environment query failed: {0}")]
    Env(#[from] EnvError),

    #[error("intersection {0} controls no links")]
    NoControlledLinks(String),
}

/// The crossing reserved for a tracked vehicle.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Reservation {
    /// The committed crossing time in ticks.
    pub slot: f64,
    /// The commanded speed in m/s.
    pub speed: f64,
    /// The merge status assigned on admission.
    pub status: MergeStatus,
}

/// A vehicle seen inside the detection range for the first time.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct VehicleObservation<V, A> {
    pub vehicle: V,
    /// The approach the vehicle was seen on.
    pub approach: A,
    /// The vehicle's speed in m/s.
    pub speed: f64,
    /// The distance to the crossing point in m.
    pub distance: f64,
}

/// The outcome of resolving a vehicle's crossing against the reservation timeline.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SlotGrant {
    /// The earliest feasible crossing time in ticks.
    pub desired: f64,
    /// The granted crossing time in ticks.
    pub slot: f64,
    /// The speed needed to cross exactly at `slot`, in m/s.
    pub required_speed: f64,
    /// The speed to command, in m/s.
    pub speed: f64,
    pub status: MergeStatus,
}

/// A vehicle admitted to the intersection.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Admission<V> {
    pub vehicle: V,
    pub grant: SlotGrant,
}

/// Everything that happened at an intersection during one tick.
#[derive(Clone, Debug)]
pub struct TickReport<V> {
    /// The number of vehicles newly detected.
    pub detected: usize,
    /// The vehicles given a slot.
    pub admitted: Vec<Admission<V>>,
    /// The vehicles that left the controlled zone.
    pub released: Vec<V>,
    /// The vehicles whose reservations were garbage collected.
    pub expired: Vec<V>,
}

impl<V> Default for TickReport<V> {
    fn default() -> Self {
        Self {
            detected: 0,
            admitted: vec![],
            released: vec![],
            expired: vec![],
        }
    }
}

/// Assigns crossing slots to the vehicles approaching a merge intersection,
/// first come first served.
pub struct IntersectionScheduler<E: TrafficEnv> {
    /// The intersection controlled by this scheduler.
    id: E::IntersectionId,
    /// The vehicle and spacing parameters.
    params: SchedulerParams,
    /// The detection range in m, no longer than the shortest incoming approach.
    approach_range: f64,
    /// The approaches feeding the intersection.
    incoming: Vec<E::ApproachId>,
    /// The approaches leaving the intersection.
    outgoing: Vec<E::ApproachId>,
    /// The reserved crossing slots.
    timeline: ReservationTimeline<E::VehicleId>,
    /// The vehicles holding a slot.
    tracked: FxHashMap<E::VehicleId, Reservation>,
}

impl<E: TrafficEnv> IntersectionScheduler<E> {
    /// Creates a scheduler for the given intersection.
    pub fn new(
        env: &E,
        id: E::IntersectionId,
        params: SchedulerParams,
    ) -> Result<Self, SchedulerError> {
        params.validate()?;

        let links = env.controlled_links(id)?;
        if links.is_empty() {
            return Err(SchedulerError::NoControlledLinks(format!("{:?}", id)));
        }
        let topology = Topology::resolve(&links, params.approach_range, |approach| {
            env.approach_length(approach)
        })?;

        info!(
            "merge control at {:?}: {} incoming, {} outgoing, range {} m",
            id,
            topology.incoming.len(),
            topology.outgoing.len(),
            topology.approach_range
        );

        Ok(Self {
            id,
            params,
            approach_range: topology.approach_range,
            incoming: topology.incoming,
            outgoing: topology.outgoing,
            timeline: ReservationTimeline::new(),
            tracked: Default::default(),
        })
    }

    /// The intersection controlled by this scheduler.
    pub fn id(&self) -> E::IntersectionId {
        self.id
    }

    pub fn params(&self) -> &SchedulerParams {
        &self.params
    }

    /// The detection range in m.
    pub fn approach_range(&self) -> f64 {
        self.approach_range
    }

    pub fn incoming(&self) -> &[E::ApproachId] {
        &self.incoming
    }

    pub fn outgoing(&self) -> &[E::ApproachId] {
        &self.outgoing
    }

    /// The reserved crossing slots.
    pub fn timeline(&self) -> &ReservationTimeline<E::VehicleId> {
        &self.timeline
    }

    /// Gets the reservation of a tracked vehicle.
    pub fn reservation(&self, vehicle: E::VehicleId) -> Option<&Reservation> {
        self.tracked.get(&vehicle)
    }

    /// The number of vehicles holding a slot.
    pub fn tracked_count(&self) -> usize {
        self.tracked.len()
    }

    /// Checks that every tracked vehicle owns exactly one slot at its reserved time,
    /// and every slot belongs to a tracked vehicle.
    pub fn is_consistent(&self) -> bool {
        self.timeline.len() == self.tracked.len()
            && self.timeline.iter().all(|slot| {
                self.tracked
                    .get(&slot.vehicle)
                    .map_or(false, |res| res.slot == slot.time)
            })
    }

    /// Runs one tick of merge control.
    pub fn execution_step(&mut self, env: &mut E, clock: SimClock) -> TickReport<E::VehicleId> {
        let arrivals = self.detect_arrivals(env);
        // Departures go first so their slots are free for this tick's arrivals
        let released = self.detect_departures(env);
        let admitted = self.assign_slots(env, clock, &arrivals);
        let expired = self.collect_garbage(env, clock);

        TickReport {
            detected: arrivals.len(),
            admitted,
            released,
            expired,
        }
    }

    /// Finds the untracked vehicles within range on the incoming approaches,
    /// in approach order then the order reported by the environment.
    pub fn detect_arrivals(&self, env: &E) -> Vec<VehicleObservation<E::VehicleId, E::ApproachId>> {
        let mut arrivals: Vec<VehicleObservation<_, _>> = vec![];

        for &approach in &self.incoming {
            let vehicles = match env.approach_vehicles(approach) {
                Ok(vehicles) => vehicles,
                Err(err) => {
                    warn!("{:?}: cannot scan approach {:?}: {}", self.id, approach, err);
                    continue;
                }
            };

            for vehicle in vehicles {
                if self.tracked.contains_key(&vehicle)
                    || arrivals.iter().any(|obs| obs.vehicle == vehicle)
                {
                    continue;
                }
                match self.observe(env, vehicle, approach) {
                    Ok(Some(obs)) => arrivals.push(obs),
                    Ok(None) => {}
                    Err(err) => debug!("{:?}: skipping {:?}: {}", self.id, vehicle, err),
                }
            }
        }

        arrivals
    }

    /// Observes a vehicle on an incoming approach, if it is within range.
    fn observe(
        &self,
        env: &E,
        vehicle: E::VehicleId,
        approach: E::ApproachId,
    ) -> EnvResult<Option<VehicleObservation<E::VehicleId, E::ApproachId>>> {
        let distance = env.distance_to_end(vehicle, approach)? - self.params.stopline_offset;
        if distance >= self.approach_range {
            return Ok(None);
        }
        let speed = env.vehicle_speed(vehicle)?;
        Ok(Some(VehicleObservation {
            vehicle,
            approach,
            speed,
            distance,
        }))
    }

    /// Releases the tracked vehicles found on the outgoing approaches.
    pub fn detect_departures(&mut self, env: &mut E) -> Vec<E::VehicleId> {
        let mut departed = vec![];
        for &approach in &self.outgoing {
            match env.approach_vehicles(approach) {
                Ok(vehicles) => departed.extend(
                    vehicles
                        .into_iter()
                        .filter(|vehicle| self.tracked.contains_key(vehicle)),
                ),
                Err(err) => warn!("{:?}: cannot scan approach {:?}: {}", self.id, approach, err),
            }
        }

        departed.retain(|vehicle| self.release(env, *vehicle));
        departed
    }

    /// Releases a vehicle's reservation and hands speed control back to the vehicle.
    /// Returns `false` if the vehicle was not tracked.
    pub fn release(&mut self, env: &mut E, vehicle: E::VehicleId) -> bool {
        let reservation = match self.tracked.remove(&vehicle) {
            Some(reservation) => reservation,
            None => return false,
        };
        self.timeline.release(vehicle);

        match self.hand_back(env, vehicle) {
            Ok(()) => debug!(
                "{:?}: released {:?} (slot {:.2})",
                self.id, vehicle, reservation.slot
            ),
            Err(err) => debug!("{:?}: releasing {:?}: {}", self.id, vehicle, err),
        }
        true
    }

    /// Hands speed control back to a vehicle that is no longer tracked.
    fn hand_back(&self, env: &mut E, vehicle: E::VehicleId) -> EnvResult<()> {
        env.set_vehicle_speed(vehicle, self.params.vmax)?;
        env.set_speed_governor(vehicle, true)?;
        env.mark_vehicle(vehicle, MergeStatus::Released)
    }

    /// Admits the given vehicles in order.
    /// Vehicles that disappear while being admitted are skipped.
    pub fn assign_slots(
        &mut self,
        env: &mut E,
        clock: SimClock,
        arrivals: &[VehicleObservation<E::VehicleId, E::ApproachId>],
    ) -> Vec<Admission<E::VehicleId>> {
        let mut admitted = vec![];
        for obs in arrivals {
            if self.tracked.contains_key(&obs.vehicle) {
                continue;
            }
            match self.admit(env, clock, obs) {
                Ok(admission) => admitted.push(admission),
                Err(err) => debug!("{:?}: skipping {:?}: {}", self.id, obs.vehicle, err),
            }
        }
        admitted
    }

    /// Reserves a slot for a vehicle and commands its speed.
    fn admit(
        &mut self,
        env: &mut E,
        clock: SimClock,
        obs: &VehicleObservation<E::VehicleId, E::ApproachId>,
    ) -> EnvResult<Admission<E::VehicleId>> {
        let grant = self.resolve_slot(clock, obs.speed, obs.distance);

        env.set_speed_governor(obs.vehicle, false)?;
        let commanded = env
            .set_vehicle_speed(obs.vehicle, grant.speed)
            .and_then(|_| env.mark_vehicle(obs.vehicle, grant.status));
        if let Err(err) = commanded {
            // An untracked vehicle keeps its own speed control
            if let Err(err) = env.set_speed_governor(obs.vehicle, true) {
                debug!("{:?}: restoring {:?}: {}", self.id, obs.vehicle, err);
            }
            return Err(err);
        }

        if grant.status == MergeStatus::Infeasible {
            warn!(
                "{:?}: {:?} needs {:.2} m/s to reach slot {:.2}, commanding {:.2} m/s",
                self.id, obs.vehicle, grant.required_speed, grant.slot, grant.speed
            );
        }

        self.timeline.commit(grant.slot, obs.vehicle);
        self.tracked.insert(
            obs.vehicle,
            Reservation {
                slot: grant.slot,
                speed: grant.speed,
                status: grant.status,
            },
        );

        Ok(Admission {
            vehicle: obs.vehicle,
            grant,
        })
    }

    /// Finds the crossing slot and speed for a vehicle, given the slots already reserved.
    ///
    /// # Parameters
    /// * `clock` - The simulation clock
    /// * `speed` - The vehicle's speed in m/s
    /// * `distance` - The vehicle's distance to the crossing point in m
    pub fn resolve_slot(&self, clock: SimClock, speed: f64, distance: f64) -> SlotGrant {
        let p = &self.params;
        let eta = compute_eta(speed, p.vmax, distance, p.max_accel, p.max_decel);
        let desired = clock.now + clock.to_ticks(eta);

        let on_schedule = SlotGrant {
            desired,
            slot: desired,
            required_speed: p.vmax,
            speed: p.vmax,
            status: MergeStatus::OnSchedule,
        };

        let possible = match self.timeline.last_time() {
            Some(last) => last + clock.to_ticks(p.headway()),
            None => return on_schedule,
        };
        if possible < desired {
            return on_schedule;
        }

        // Drive at constant speed so as to arrive exactly at the forced slot
        let time_left = clock.to_secs(possible - clock.now);
        let required_speed = if time_left > 0.0 {
            f64::min(distance / time_left, p.vmax)
        } else {
            p.vmax
        };
        let (speed, status) = if required_speed < p.min_speed {
            (p.min_speed, MergeStatus::Infeasible)
        } else if required_speed < p.vmax {
            (required_speed, MergeStatus::Slowed)
        } else {
            (p.vmax, MergeStatus::OnSchedule)
        };

        SlotGrant {
            desired,
            slot: possible,
            required_speed,
            speed,
            status,
        }
    }

    /// The time, in ticks, beyond which reservations are dropped as leaked.
    pub fn stale_horizon(&self, clock: SimClock) -> f64 {
        clock.now * clock.scale + self.params.vmax * STALE_HORIZON_FACTOR * self.params.time_gap
    }

    /// Drops reservations beyond the staleness horizon along with their vehicles.
    pub fn collect_garbage(&mut self, env: &mut E, clock: SimClock) -> Vec<E::VehicleId> {
        let expired = self.timeline.expire_from(self.stale_horizon(clock));

        let mut vehicles = Vec::with_capacity(expired.len());
        for slot in expired {
            self.tracked.remove(&slot.vehicle);
            warn!(
                "{:?}: dropping stale reservation of {:?} at {:.2}",
                self.id, slot.vehicle, slot.time
            );
            // The vehicle is most likely gone already
            if let Err(err) = self.hand_back(env, slot.vehicle) {
                debug!("{:?}: restoring {:?}: {}", self.id, slot.vehicle, err);
            }
            vehicles.push(slot.vehicle);
        }
        vehicles
    }
}
