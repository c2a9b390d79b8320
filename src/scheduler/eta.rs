/// Calculates the earliest time, in s, at which a vehicle can reach a point `dist` metres ahead
/// and be travelling at `target_vel` when it gets there.
///
/// The vehicle first accelerates at `max_acc` (or decelerates at `max_dec`) until it reaches
/// `target_vel`, covering `0.5 * rate * t^2` metres, then travels the rest at constant speed.
/// If the point is reached before the transition is over, the transition is cut short there.
///
/// # Parameters
/// * `vel` - The current velocity in m/s
/// * `target_vel` - The velocity to cross at in m/s, must be positive
/// * `dist` - The distance to the crossing point in m
/// * `max_acc` - The maximum acceleration in m/s<sup>2</sup>
/// * `max_dec` - The maximum deceleration, a positive number in m/s<sup>2</sup>
pub fn compute_eta(vel: f64, target_vel: f64, dist: f64, max_acc: f64, max_dec: f64) -> f64 {
    if dist <= 0.0 {
        return 0.0;
    }

    let rate = if vel <= target_vel { max_acc } else { max_dec };
    let t_trans = (target_vel - vel).abs() / rate;
    let d_trans = 0.5 * rate * t_trans.powi(2);

    if dist < d_trans {
        (2.0 * dist / rate).sqrt()
    } else {
        t_trans + (dist - d_trans) / target_vel
    }
}

#[cfg(test)]
mod test {
    use super::compute_eta;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn accelerating() {
        // 2.5 s to reach 15 m/s over 6.25 m, then 193.75 m at 15 m/s
        assert_approx_eq!(compute_eta(10.0, 15.0, 200.0, 2.0, 3.0), 15.416666666666);
        assert_approx_eq!(compute_eta(0.0, 10.0, 100.0, 2.0, 3.0), 12.5);
    }

    #[test]
    fn decelerating() {
        assert_approx_eq!(compute_eta(20.0, 15.0, 200.0, 2.0, 2.5), 15.0);
    }

    #[test]
    fn at_target_speed() {
        assert_approx_eq!(compute_eta(15.0, 15.0, 150.0, 2.0, 3.0), 10.0);
    }

    #[test]
    fn short_distance() {
        // The crossing point lies within the acceleration phase
        assert_approx_eq!(compute_eta(0.0, 15.0, 10.0, 2.0, 3.0), 10f64.sqrt());

        // Continuous at the end of the acceleration phase
        let d_trans = 0.5 * 2.0 * 7.5f64.powi(2);
        assert_approx_eq!(compute_eta(0.0, 15.0, d_trans - 1e-9, 2.0, 3.0), 7.5);
        assert_approx_eq!(compute_eta(0.0, 15.0, d_trans + 1e-9, 2.0, 3.0), 7.5);
    }

    #[test]
    fn never_negative() {
        assert_eq!(compute_eta(10.0, 15.0, 0.0, 2.0, 3.0), 0.0);
        assert_eq!(compute_eta(10.0, 15.0, -5.0, 2.0, 3.0), 0.0);
        assert!(compute_eta(30.0, 15.0, 1.0, 2.0, 3.0) > 0.0);
    }
}
