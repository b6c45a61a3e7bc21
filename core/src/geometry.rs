//! Vector and angle helpers shared by scripted bullets and volley spawning.
//!
//! Angles are degrees, counter-clockwise from +x. Degrees convert to radians
//! as `deg * (PI / 180)`, which is also how authored formulas spell it, so
//! scripted and compiled bullets agree bit for bit.

use std::f64::consts::PI;

pub const DEG_TO_RAD: f64 = PI / 180.0;

pub fn radians(deg: f64) -> f64 {
    deg * DEG_TO_RAD
}

pub fn degrees(rad: f64) -> f64 {
    rad * (180.0 / PI)
}

/// Velocity of length `speed` pointing at `deg`.
pub fn from_angle(speed: f64, deg: f64) -> (f64, f64) {
    let rad = radians(deg);
    (speed * rad.cos(), speed * rad.sin())
}

/// Bearing in degrees from `from` to `to`, in `(-180, 180]`.
pub fn angle_to(from: (f64, f64), to: (f64, f64)) -> f64 {
    degrees((to.1 - from.1).atan2(to.0 - from.0))
}

/// Wraps into `(-180, 180]`.
pub fn normalize_deg(deg: f64) -> f64 {
    let mut wrapped = deg.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped -= 360.0;
    }
    wrapped
}

/// Rotates `current` toward `target` by at most `max_step` degrees, taking the
/// short way round.
pub fn turn_towards(current: f64, target: f64, max_step: f64) -> f64 {
    let diff = normalize_deg(target - current);
    let step = max_step.abs();
    if diff.abs() <= step {
        target
    } else {
        current + step * diff.signum()
    }
}

/// `count` evenly spaced bearings around a full circle starting at `offset`.
pub fn ring(count: usize, offset: f64) -> Vec<f64> {
    if count == 0 {
        return Vec::new();
    }
    let step = 360.0 / count as f64;
    (0..count).map(|i| offset + step * i as f64).collect()
}

/// `count` bearings spread across `spread` degrees centred on `center`.
pub fn fan(count: usize, center: f64, spread: f64) -> Vec<f64> {
    match count {
        0 => Vec::new(),
        1 => vec![center],
        _ => {
            let step = spread / (count - 1) as f64;
            let start = center - spread / 2.0;
            (0..count).map(|i| start + step * i as f64).collect()
        }
    }
}

/// `count` bearings starting at `start`, each `step` degrees further round.
pub fn spiral(count: usize, start: f64, step: f64) -> Vec<f64> {
    (0..count).map(|i| start + step * i as f64).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn from_angle_points_the_right_way() {
        let (vx, vy) = from_angle(2.0, 90.0);
        assert!(close(vx, 0.0));
        assert!(close(vy, 2.0));
    }

    #[test]
    fn angle_to_is_degrees() {
        assert!(close(angle_to((0.0, 0.0), (0.0, 5.0)), 90.0));
        assert!(close(angle_to((1.0, 1.0), (0.0, 1.0)), 180.0));
    }

    #[test]
    fn turn_towards_takes_short_way() {
        assert!(close(turn_towards(170.0, -170.0, 5.0), 175.0));
        assert!(close(turn_towards(0.0, 3.0, 5.0), 3.0));
        assert!(close(turn_towards(10.0, 0.0, 4.0), 6.0));
    }

    #[test]
    fn generators_lay_out_bearings() {
        assert_eq!(ring(4, 0.0), vec![0.0, 90.0, 180.0, 270.0]);
        assert_eq!(fan(3, 90.0, 40.0), vec![70.0, 90.0, 110.0]);
        assert_eq!(fan(1, 45.0, 30.0), vec![45.0]);
        assert_eq!(spiral(3, 10.0, 15.0), vec![10.0, 25.0, 40.0]);
        assert!(ring(0, 0.0).is_empty());
    }
}
