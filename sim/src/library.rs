use std::collections::BTreeMap;
use std::fmt;

use danmaku_core::{geometry, FrameError, Signal, SignalSink, Value, VariableFrame};
use danmaku_lang::{EvalError, Pattern, PatternError, ValidationError};

use crate::bullet::BulletInstance;
use crate::scripted::{BulletBody, ScriptedBehavior};

const FROG_JUMP_JSON: &str = include_str!("../../patterns/frog_jump.json");
const BASIC_JSON: &str = include_str!("../../patterns/basic.json");

pub const FROG_STOP_TEXTURE: &str = "texture/enemy/spr_frogbullet_stop.png";
pub const FROG_GO_TEXTURE: &str = "texture/enemy/spr_frogbullet_go.png";

/// Builds a fresh hook plus its starting frame and damage.
pub type ScriptedFactory = fn() -> (VariableFrame, i64, Box<dyn ScriptedBehavior>);

/// Name to constructor registry for compiled patterns and scripted hooks.
#[derive(Default)]
pub struct PatternLibrary {
    compiled: BTreeMap<String, Pattern>,
    scripted: BTreeMap<String, ScriptedFactory>,
    /// Names whose latest definition failed to load, with the error code.
    rejected: BTreeMap<String, &'static str>,
}

impl PatternLibrary {
    pub fn new() -> Self {
        Self::default()
    }

    /// The bundled patterns: frog jump in both forms, straight, aimed,
    /// wave and a scripted homing shot.
    pub fn builtin() -> Result<Self, PatternError> {
        let mut library = Self::new();
        for text in [FROG_JUMP_JSON, BASIC_JSON] {
            for pattern in Pattern::from_json_str(text)? {
                library.register(pattern);
            }
        }
        library.register_scripted("frog_jump_scripted", frog_jump_scripted);
        library.register_scripted("homing_scripted", homing_scripted);
        Ok(library)
    }

    /// Registers every good pattern in `text` and returns their names. Each
    /// rejected definition goes to `sink` as a load fault and is remembered,
    /// so spawning it later reports why. Only unreadable JSON fails here.
    pub fn load_json_str(&mut self, text: &str, sink: &mut dyn SignalSink) -> Result<Vec<String>, PatternError> {
        let batch = Pattern::load_json_str(text)?;
        for err in &batch.rejected {
            if let Some(name) = err.pattern.as_deref() {
                if !self.compiled.contains_key(name) {
                    self.rejected.insert(name.to_string(), err.code());
                }
            }
            sink.emit(Signal::Fault(err.fault_record()));
        }
        let names = batch.loaded.iter().map(|p| p.name().to_string()).collect();
        for pattern in batch.loaded {
            self.register(pattern);
        }
        Ok(names)
    }

    /// Replaces any earlier pattern of the same name.
    pub fn register(&mut self, pattern: Pattern) -> Option<Pattern> {
        self.rejected.remove(pattern.name());
        self.compiled.insert(pattern.name().to_string(), pattern)
    }

    pub fn register_scripted(&mut self, name: &str, factory: ScriptedFactory) {
        self.rejected.remove(name);
        self.scripted.insert(name.to_string(), factory);
    }

    pub fn get(&self, name: &str) -> Option<&Pattern> {
        self.compiled.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.compiled.contains_key(name) || self.scripted.contains_key(name)
    }

    /// Error code of a pattern that failed to load and was never replaced.
    pub fn rejection(&self, name: &str) -> Option<&'static str> {
        self.rejected.get(name).copied()
    }

    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .compiled
            .keys()
            .chain(self.scripted.keys())
            .map(String::as_str)
            .collect();
        names.sort_unstable();
        names
    }

    /// A ready-to-queue bullet of `name`, compiled or scripted.
    pub fn instantiate(&self, name: &str, overrides: &[(&str, Value)]) -> Result<BulletInstance, LibraryError> {
        if let Some(pattern) = self.compiled.get(name) {
            return BulletInstance::from_pattern(pattern, overrides).map_err(LibraryError::Validation);
        }
        let factory = self
            .scripted
            .get(name)
            .ok_or_else(|| self.missing(name))?;
        let (mut frame, damage, hook) = factory();
        for (field, value) in overrides {
            frame.assign(field, value.clone()).map_err(|err| {
                LibraryError::Validation(match err {
                    FrameError::Undeclared { name } => ValidationError::UndeclaredWrite { name },
                    FrameError::TypeChanged {
                        name,
                        declared,
                        found,
                    } => ValidationError::TypeClash {
                        name,
                        declared,
                        found,
                    },
                })
            })?;
        }
        BulletInstance::scripted(name, damage, frame, hook).map_err(LibraryError::Validation)
    }

    /// Error for a name that is neither compiled nor scripted.
    pub fn missing(&self, name: &str) -> LibraryError {
        match self.rejection(name) {
            Some(code) => LibraryError::RejectedPattern {
                name: name.to_string(),
                code,
            },
            None => LibraryError::UnknownPattern(name.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LibraryError {
    UnknownPattern(String),
    /// The pattern exists in a loaded file but failed with `code`.
    RejectedPattern { name: String, code: &'static str },
    Validation(ValidationError),
}

impl LibraryError {
    pub fn code(&self) -> &'static str {
        match self {
            LibraryError::UnknownPattern(_) => "E_LIBRARY_UNKNOWN_PATTERN",
            LibraryError::RejectedPattern { .. } => "E_LIBRARY_REJECTED_PATTERN",
            LibraryError::Validation(err) => err.code(),
        }
    }
}

impl fmt::Display for LibraryError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            LibraryError::UnknownPattern(name) => write!(f, "{} `{}`", self.code(), name),
            LibraryError::RejectedPattern { name, code } => {
                write!(f, "{} `{}` failed to load with {}", self.code(), name, code)
            }
            LibraryError::Validation(err) => write!(f, "{}", err),
        }
    }
}

impl std::error::Error for LibraryError {}

fn body_frame(texture: &str) -> VariableFrame {
    VariableFrame::new()
        .with("x", 0.0)
        .with("y", 0.0)
        .with("vx", 0.0)
        .with("vy", 0.0)
        .with("texture", texture)
}

/// Sits for half a second or so, then leaps up and left and falls under a
/// slanted gravity.
#[derive(Debug, Default)]
pub struct FrogJump {
    timer: f64,
    jumping: bool,
    gravity: (f64, f64),
}

fn frog_jump_scripted() -> (VariableFrame, i64, Box<dyn ScriptedBehavior>) {
    (body_frame(FROG_STOP_TEXTURE), 4, Box::new(FrogJump::default()))
}

impl ScriptedBehavior for FrogJump {
    fn init(&mut self, body: &mut BulletBody<'_>) -> Result<(), EvalError> {
        self.timer = 0.5 + body.random(0.5);
        self.gravity = geometry::from_angle(0.4 * 30.0 * 30.0, 280.0);
        Ok(())
    }

    fn update(&mut self, body: &mut BulletBody<'_>, dt: f64) -> Result<(), EvalError> {
        if self.jumping {
            body.add_velocity(self.gravity.0 * dt, self.gravity.1 * dt);
            return Ok(());
        }
        self.timer -= dt;
        if self.timer <= 0.0 {
            let angle = 145.0 - body.random(20.0);
            let speed = (7.0 + body.random(3.0)) * 30.0;
            body.set_speed(speed, angle);
            body.set_texture(FROG_GO_TEXTURE);
            self.jumping = true;
        }
        Ok(())
    }

    fn expired(&self, body: &BulletBody<'_>) -> bool {
        body.y < -300.0
    }
}

/// Steers toward the player at a bounded turn rate for a few seconds.
#[derive(Debug)]
pub struct Homing {
    heading: f64,
    speed: f64,
    turn_rate: f64,
    life: f64,
}

fn homing_scripted() -> (VariableFrame, i64, Box<dyn ScriptedBehavior>) {
    let hook = Homing {
        heading: -90.0,
        speed: 140.0,
        turn_rate: 120.0,
        life: 4.0,
    };
    (
        body_frame("texture/bullet/spr_homing_purple.png").with("angle", -90.0),
        3,
        Box::new(hook),
    )
}

impl ScriptedBehavior for Homing {
    fn init(&mut self, body: &mut BulletBody<'_>) -> Result<(), EvalError> {
        if let Some(Value::Number(angle)) = body.get("angle") {
            self.heading = angle;
        }
        body.set_speed(self.speed, self.heading);
        Ok(())
    }

    fn update(&mut self, body: &mut BulletBody<'_>, dt: f64) -> Result<(), EvalError> {
        if let Some(target) = body.angle_to_player() {
            self.heading = geometry::turn_towards(self.heading, target, self.turn_rate * dt);
        }
        body.set_speed(self.speed, self.heading);
        body.set("angle", Value::Number(self.heading))?;
        self.life -= dt;
        if self.life <= 0.0 {
            body.delete();
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use danmaku_core::{FaultStage, VecSignalSink};

    #[test]
    fn builtin_registers_both_paths() {
        let library = PatternLibrary::builtin().unwrap();
        assert_eq!(
            library.names(),
            vec!["aimed", "frog_jump", "frog_jump_scripted", "homing_scripted", "straight", "wave"]
        );
        let compiled = library.instantiate("frog_jump", &[]).unwrap();
        let scripted = library.instantiate("frog_jump_scripted", &[]).unwrap();
        assert!(!compiled.is_scripted());
        assert!(scripted.is_scripted());
        assert_eq!(compiled.damage(), scripted.damage());
        assert_eq!(compiled.texture(), scripted.texture());
    }

    #[test]
    fn instantiate_reports_bad_requests() {
        let library = PatternLibrary::builtin().unwrap();
        assert_eq!(
            library.instantiate("nope", &[]).unwrap_err().code(),
            "E_LIBRARY_UNKNOWN_PATTERN"
        );
        assert_eq!(
            library
                .instantiate("homing_scripted", &[("texture", Value::Number(1.0))])
                .unwrap_err()
                .code(),
            "E_VALIDATION_TYPE_CLASH"
        );
        assert_eq!(
            library
                .instantiate("frog_jump_scripted", &[("spin", Value::Number(1.0))])
                .unwrap_err()
                .code(),
            "E_VALIDATION_UNDECLARED_WRITE"
        );
    }

    #[test]
    fn rejected_patterns_are_reported_and_siblings_kept() {
        let mut library = PatternLibrary::new();
        let mut sink = VecSignalSink::default();
        let text = r#"[
            { "name": "good", "frame": { "y": 0 }, "update": [["y", "y - 1"]], "delete": "y < -3" },
            { "name": "bad", "frame": { "y": 0 }, "update": [["y", "y-(1"]], "delete": "0" }
        ]"#;
        let names = library.load_json_str(text, &mut sink).unwrap();
        assert_eq!(names, vec!["good"]);
        assert!(library.contains("good"));
        assert!(!library.contains("bad"));

        assert_eq!(sink.faults.len(), 1);
        let fault = &sink.faults[0];
        assert_eq!(fault.stage, FaultStage::Load);
        assert_eq!(fault.pattern, "bad");
        assert_eq!(fault.instance, None);
        assert_eq!(fault.code, "E_EXPR_SYNTAX");

        assert!(library.instantiate("good", &[]).is_ok());
        let err = library.instantiate("bad", &[]).unwrap_err();
        assert_eq!(err.code(), "E_LIBRARY_REJECTED_PATTERN");
        assert_eq!(library.instantiate("ghost", &[]).unwrap_err().code(), "E_LIBRARY_UNKNOWN_PATTERN");

        library
            .load_json_str(r#"{ "name": "bad", "frame": {}, "delete": "1" }"#, &mut sink)
            .unwrap();
        assert_eq!(library.rejection("bad"), None);
        assert!(library.instantiate("bad", &[]).is_ok());
    }
}
