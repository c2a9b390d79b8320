use thiserror::Error;

/// An invalid set of [SchedulerParams].
#[derive(Clone, Debug, PartialEq, Error)]
pub enum ParamsError {
    #[error("{name} must be positive, got {value}")]
    NotPositive { name: &'static str, value: f64 },

    #[error("{name} must not be negative, got {value}")]
    Negative { name: &'static str, value: f64 },

    #[error("minimum speed {min_speed} must lie in [0, {vmax})")]
    MinSpeedOutOfRange { min_speed: f64, vmax: f64 },
}

/// The parameters of a merge scheduler.
/// All vehicles crossing the intersection are assumed to share them.
#[derive(Clone, Copy, Debug, PartialEq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(default)
)]
pub struct SchedulerParams {
    /// The detection range, measured back from the crossing point, in m.
    pub approach_range: f64,
    /// The position of the crossing point relative to the end of the incoming approach,
    /// in m. A negative value places it beyond the end.
    pub stopline_offset: f64,
    /// The speed at which vehicles cross, in m/s.
    pub vmax: f64,
    /// The maximum acceleration in m/s<sup>2</sup>.
    pub max_accel: f64,
    /// The maximum deceleration, a positive number in m/s<sup>2</sup>.
    pub max_decel: f64,
    /// The vehicle length in m.
    pub vehicle_length: f64,
    /// The desired time gap between consecutive crossings in s.
    pub time_gap: f64,
    /// The lowest speed a delayed vehicle may be commanded to drive at, in m/s.
    pub min_speed: f64,
}

impl Default for SchedulerParams {
    fn default() -> Self {
        Self {
            approach_range: 200.0,
            stopline_offset: -15.0,
            vmax: 13.89,
            max_accel: 2.6,
            max_decel: 4.5,
            vehicle_length: 5.0,
            time_gap: 1.0,
            min_speed: 1.0,
        }
    }
}

impl SchedulerParams {
    /// Checks that the parameters describe a usable scheduler.
    pub fn validate(&self) -> Result<(), ParamsError> {
        let positive = [
            ("approach_range", self.approach_range),
            ("vmax", self.vmax),
            ("max_accel", self.max_accel),
            ("max_decel", self.max_decel),
        ];
        for (name, value) in positive {
            if !(value > 0.0) {
                return Err(ParamsError::NotPositive { name, value });
            }
        }
        let non_negative = [
            ("vehicle_length", self.vehicle_length),
            ("time_gap", self.time_gap),
        ];
        for (name, value) in non_negative {
            if !(value >= 0.0) {
                return Err(ParamsError::Negative { name, value });
            }
        }
        if !(0.0..self.vmax).contains(&self.min_speed) {
            return Err(ParamsError::MinSpeedOutOfRange {
                min_speed: self.min_speed,
                vmax: self.vmax,
            });
        }
        Ok(())
    }

    /// The minimum separation between two crossings in s.
    pub fn headway(&self) -> f64 {
        self.time_gap + self.vehicle_length / self.vmax
    }
}
