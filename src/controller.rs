use crate::env::{MergeStatus, SimClock, TrafficEnv};
use crate::params::SchedulerParams;
use crate::scheduler::{IntersectionScheduler, SchedulerError, TickReport};

/// Runs merge control at every merge intersection of a simulation.
pub struct MergeController<E: TrafficEnv> {
    schedulers: Vec<IntersectionScheduler<E>>,
    stats: MergeStats,
}

/// Running totals over all intersections.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct MergeStats {
    /// The number of ticks run.
    pub ticks: u64,
    pub admitted: usize,
    /// Admissions that had to slow down for an earlier vehicle.
    pub slowed: usize,
    /// Admissions whose slot needed a speed below the floor.
    pub infeasible: usize,
    pub released: usize,
    /// Reservations dropped by garbage collection.
    pub expired: usize,
}

impl MergeStats {
    fn record<V>(&mut self, report: &TickReport<V>) {
        self.admitted += report.admitted.len();
        for admission in &report.admitted {
            match admission.grant.status {
                MergeStatus::Slowed => self.slowed += 1,
                MergeStatus::Infeasible => self.infeasible += 1,
                _ => {}
            }
        }
        self.released += report.released.len();
        self.expired += report.expired.len();
    }
}

impl<E: TrafficEnv> MergeController<E> {
    /// Creates a scheduler for every merge intersection the environment reports.
    pub fn new(env: &E, params: SchedulerParams) -> Result<Self, SchedulerError> {
        let schedulers = env
            .intersection_ids()
            .into_iter()
            .map(|id| IntersectionScheduler::new(env, id, params))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self::with_schedulers(schedulers))
    }

    /// Creates a controller from existing schedulers.
    pub fn with_schedulers(schedulers: Vec<IntersectionScheduler<E>>) -> Self {
        Self {
            schedulers,
            stats: Default::default(),
        }
    }

    /// The schedulers, one per intersection.
    pub fn schedulers(&self) -> &[IntersectionScheduler<E>] {
        &self.schedulers
    }

    /// Gets the scheduler of an intersection.
    pub fn scheduler(&self, id: E::IntersectionId) -> Option<&IntersectionScheduler<E>> {
        self.schedulers.iter().find(|s| s.id() == id)
    }

    /// The totals accumulated so far.
    pub fn stats(&self) -> MergeStats {
        self.stats
    }

    /// Runs one tick of merge control at every intersection, in turn.
    pub fn tick(&mut self, env: &mut E, clock: SimClock) -> Vec<TickReport<E::VehicleId>> {
        let reports = self
            .schedulers
            .iter_mut()
            .map(|scheduler| scheduler.execution_step(env, clock))
            .collect::<Vec<_>>();
        self.stats.ticks += 1;
        for report in &reports {
            self.stats.record(report);
        }
        reports
    }
}
