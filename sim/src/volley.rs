//! Batches of one pattern laid out by an angle generator.

use danmaku_core::{geometry, Value, ValueType};
use danmaku_lang::Pattern;

#[derive(Debug, Clone, PartialEq)]
pub enum VolleyShape {
    /// `count` bearings evenly round the circle from `offset`.
    Ring { count: usize, offset: f64 },
    /// `count` bearings over `spread` degrees centred on `center`.
    Fan { count: usize, center: f64, spread: f64 },
    /// `count` bearings `step` degrees apart from `start`.
    Spiral { count: usize, start: f64, step: f64 },
}

impl VolleyShape {
    pub fn angles(&self) -> Vec<f64> {
        match *self {
            VolleyShape::Ring { count, offset } => geometry::ring(count, offset),
            VolleyShape::Fan {
                count,
                center,
                spread,
            } => geometry::fan(count, center, spread),
            VolleyShape::Spiral { count, start, step } => geometry::spiral(count, start, step),
        }
    }
}

/// Per-bullet overrides: `x`, `y` and `angle`, each only when the pattern
/// declares it as a number.
pub fn volley_overrides(
    pattern: &Pattern,
    origin: (f64, f64),
    shape: &VolleyShape,
) -> Vec<Vec<(&'static str, Value)>> {
    let declares = |name: &str| pattern.frame().type_of(name) == Some(ValueType::Number);
    let (has_x, has_y, has_angle) = (declares("x"), declares("y"), declares("angle"));
    shape
        .angles()
        .into_iter()
        .map(|angle| {
            let mut overrides = Vec::with_capacity(3);
            if has_x {
                overrides.push(("x", Value::Number(origin.0)));
            }
            if has_y {
                overrides.push(("y", Value::Number(origin.1)));
            }
            if has_angle {
                overrides.push(("angle", Value::Number(angle)));
            }
            overrides
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    const STRAIGHT: &str = r#"{
        "name": "straight",
        "frame": { "x": 0, "y": 0, "angle": 0, "texture": "t.png" },
        "update": [["x", "x + cos(angle * (pi / 180))"]],
        "delete": "0"
    }"#;

    #[test]
    fn shapes_produce_expected_bearings() {
        assert_eq!(
            VolleyShape::Ring { count: 4, offset: 10.0 }.angles(),
            vec![10.0, 100.0, 190.0, 280.0]
        );
        assert_eq!(
            VolleyShape::Fan { count: 3, center: -90.0, spread: 60.0 }.angles(),
            vec![-120.0, -90.0, -60.0]
        );
        assert_eq!(
            VolleyShape::Spiral { count: 3, start: 0.0, step: 7.5 }.angles(),
            vec![0.0, 7.5, 15.0]
        );
    }

    #[test]
    fn overrides_skip_undeclared_fields() {
        let pattern = Pattern::from_json_str(STRAIGHT).unwrap().remove(0);
        let sets = volley_overrides(&pattern, (5.0, 6.0), &VolleyShape::Ring { count: 2, offset: 0.0 });
        assert_eq!(sets.len(), 2);
        assert_eq!(
            sets[1],
            vec![
                ("x", Value::Number(5.0)),
                ("y", Value::Number(6.0)),
                ("angle", Value::Number(180.0))
            ]
        );

        let no_angle = STRAIGHT.replace("\"angle\": 0, ", "").replace("angle * (pi / 180)", "0");
        let pattern = Pattern::from_json_str(&no_angle).unwrap().remove(0);
        let sets = volley_overrides(&pattern, (1.0, 1.0), &VolleyShape::Spiral { count: 1, start: 0.0, step: 0.0 });
        assert_eq!(sets[0].len(), 2);
    }
}
