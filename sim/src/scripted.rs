use danmaku_core::{geometry, DetRng, PlayerPosition, TickContext, Value, ValueType, VariableFrame};
use danmaku_lang::{EvalError, ValidationError};

/// Frame fields every scripted bullet carries, and their types.
pub const SCRIPTED_FIELDS: &[(&str, ValueType)] = &[
    ("x", ValueType::Number),
    ("y", ValueType::Number),
    ("vx", ValueType::Number),
    ("vy", ValueType::Number),
    ("texture", ValueType::Text),
];

pub fn check_scripted_frame(frame: &VariableFrame) -> Result<(), ValidationError> {
    for (name, expected) in SCRIPTED_FIELDS {
        if frame.type_of(name) != Some(*expected) {
            return Err(ValidationError::MissingField {
                name: name.to_string(),
                expected: *expected,
            });
        }
    }
    Ok(())
}

/// Imperative per-instance hook. The driver integrates `x += vx * dt`,
/// `y += vy * dt` after every `update`, then asks `expired`.
pub trait ScriptedBehavior: Send {
    fn init(&mut self, _body: &mut BulletBody<'_>) -> Result<(), EvalError> {
        Ok(())
    }

    fn update(&mut self, body: &mut BulletBody<'_>, dt: f64) -> Result<(), EvalError>;

    fn expired(&self, _body: &BulletBody<'_>) -> bool {
        false
    }
}

/// A hook's view of its own bullet for one call. Position, velocity and
/// texture are cached and written back to the frame on commit.
pub struct BulletBody<'a> {
    pub x: f64,
    pub y: f64,
    pub vx: f64,
    pub vy: f64,
    texture: String,
    frame: &'a mut VariableFrame,
    tick: &'a TickContext,
    rng: DetRng,
    deleted: bool,
}

impl<'a> BulletBody<'a> {
    pub(crate) fn load(frame: &'a mut VariableFrame, tick: &'a TickContext, rng: DetRng) -> Result<Self, EvalError> {
        let number = |name: &str| -> Result<f64, EvalError> {
            match frame.get(name) {
                Some(Value::Number(n)) => Ok(*n),
                Some(Value::Text(_)) => Err(EvalError::type_mismatch(name, ValueType::Number, ValueType::Text)),
                None => Err(EvalError::unknown_variable(name)),
            }
        };
        let (x, y, vx, vy) = (number("x")?, number("y")?, number("vx")?, number("vy")?);
        let texture = match frame.get("texture") {
            Some(Value::Text(t)) => t.to_string(),
            Some(Value::Number(_)) => {
                return Err(EvalError::type_mismatch("texture", ValueType::Text, ValueType::Number))
            }
            None => return Err(EvalError::unknown_variable("texture")),
        };
        Ok(Self {
            x,
            y,
            vx,
            vy,
            texture,
            frame,
            tick,
            rng,
            deleted: false,
        })
    }

    pub fn dt(&self) -> f64 {
        self.tick.dt
    }

    pub fn tick(&self) -> &TickContext {
        self.tick
    }

    pub fn player(&self) -> PlayerPosition {
        self.tick.player
    }

    pub fn set_pos(&mut self, x: f64, y: f64) {
        self.x = x;
        self.y = y;
    }

    /// Velocity of length `speed` along `deg` degrees.
    pub fn set_speed(&mut self, speed: f64, deg: f64) {
        let (vx, vy) = geometry::from_angle(speed, deg);
        self.vx = vx;
        self.vy = vy;
    }

    pub fn add_velocity(&mut self, dvx: f64, dvy: f64) {
        self.vx += dvx;
        self.vy += dvy;
    }

    pub fn speed(&self) -> f64 {
        (self.vx * self.vx + self.vy * self.vy).sqrt()
    }

    /// Current heading in degrees.
    pub fn heading(&self) -> f64 {
        geometry::degrees(self.vy.atan2(self.vx))
    }

    /// Bearing to the player, `None` while no position is known.
    pub fn angle_to_player(&self) -> Option<f64> {
        let player = self.tick.player;
        player
            .valid
            .then(|| geometry::angle_to((self.x, self.y), (player.x, player.y)))
    }

    pub fn texture(&self) -> &str {
        &self.texture
    }

    pub fn set_texture(&mut self, path: &str) {
        self.texture = path.to_string();
    }

    pub fn delete(&mut self) {
        self.deleted = true;
    }

    pub fn is_deleted(&self) -> bool {
        self.deleted
    }

    /// `uniform(0, max)` on the instance's stream.
    pub fn random(&mut self, max: f64) -> f64 {
        self.rng.uniform(0.0, max)
    }

    pub fn uniform(&mut self, min: f64, max: f64) -> f64 {
        self.rng.uniform(min, max)
    }

    pub fn choice<'t, T>(&mut self, items: &'t [T]) -> Option<&'t T> {
        self.rng.choice(items)
    }

    /// Any other frame variable. Cached fields read through the cache.
    pub fn get(&self, name: &str) -> Option<Value> {
        match name {
            "x" => Some(Value::Number(self.x)),
            "y" => Some(Value::Number(self.y)),
            "vx" => Some(Value::Number(self.vx)),
            "vy" => Some(Value::Number(self.vy)),
            "texture" => Some(Value::text(&self.texture)),
            _ => self.frame.get(name).cloned(),
        }
    }

    pub fn set(&mut self, name: &str, value: Value) -> Result<(), EvalError> {
        let cached = match name {
            "x" => Some(&mut self.x),
            "y" => Some(&mut self.y),
            "vx" => Some(&mut self.vx),
            "vy" => Some(&mut self.vy),
            _ => None,
        };
        match (cached, value) {
            (Some(slot), Value::Number(n)) => {
                *slot = n;
                Ok(())
            }
            (Some(_), Value::Text(_)) => Err(EvalError::type_mismatch(name, ValueType::Number, ValueType::Text)),
            (None, Value::Text(t)) if name == "texture" => {
                self.texture = t.to_string();
                Ok(())
            }
            (None, value) => Ok(self.frame.assign(name, value)?),
        }
    }

    pub(crate) fn integrate(&mut self) {
        let dt = self.tick.dt;
        self.x += self.vx * dt;
        self.y += self.vy * dt;
    }

    /// Writes the cache back. Returns the delete flag.
    pub(crate) fn commit(self) -> Result<bool, EvalError> {
        self.frame.assign("x", Value::Number(self.x))?;
        self.frame.assign("y", Value::Number(self.y))?;
        self.frame.assign("vx", Value::Number(self.vx))?;
        self.frame.assign("vy", Value::Number(self.vy))?;
        self.frame.assign("texture", Value::text(&self.texture))?;
        Ok(self.deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame() -> VariableFrame {
        VariableFrame::new()
            .with("x", 1.0)
            .with("y", 2.0)
            .with("vx", 10.0)
            .with("vy", -20.0)
            .with("texture", "a.png")
            .with("age", 0.0)
    }

    #[test]
    fn required_fields_are_checked() {
        assert!(check_scripted_frame(&frame()).is_ok());
        let missing = VariableFrame::new().with("x", 0.0);
        assert_eq!(
            check_scripted_frame(&missing).unwrap_err(),
            ValidationError::MissingField {
                name: "y".to_string(),
                expected: ValueType::Number
            }
        );
        let wrong = frame().with("texture", 3.0);
        assert_eq!(check_scripted_frame(&wrong).unwrap_err().code(), "E_VALIDATION_MISSING_FIELD");
    }

    #[test]
    fn body_caches_and_commits() {
        let mut frame = frame();
        let tick = TickContext::new(1, 0.5);
        let mut body = BulletBody::load(&mut frame, &tick, DetRng::new(1)).unwrap();
        body.set_texture("b.png");
        body.set("age", Value::Number(3.0)).unwrap();
        body.set("x", Value::Number(5.0)).unwrap();
        assert!(body.set("age", Value::text("old")).is_err());
        assert!(body.set("missing", Value::Number(1.0)).is_err());
        body.integrate();
        assert_eq!(body.commit(), Ok(false));

        assert_eq!(frame.number("x"), Some(10.0));
        assert_eq!(frame.number("y"), Some(-8.0));
        assert_eq!(frame.number("age"), Some(3.0));
        assert_eq!(frame.text("texture"), Some("b.png"));
    }

    #[test]
    fn player_bearing_needs_a_valid_position() {
        let mut frame = frame();
        let tick = TickContext::new(1, 0.5);
        let body = BulletBody::load(&mut frame, &tick, DetRng::new(1)).unwrap();
        assert_eq!(body.angle_to_player(), None);

        let mut frame = self::frame();
        let tick = TickContext::new(1, 0.5).with_player(PlayerPosition::at(1.0, 12.0));
        let body = BulletBody::load(&mut frame, &tick, DetRng::new(1)).unwrap();
        let bearing = body.angle_to_player().unwrap();
        assert!((bearing - 90.0).abs() < 1e-9, "{bearing}");
    }
}
