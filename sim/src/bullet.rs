use std::fmt;
use std::sync::Arc;

use danmaku_core::{BulletId, DetRng, TextureHandle, TickContext, Value, VariableFrame};
use danmaku_lang::{EvalContext, EvalError, Pattern, UpdateProgram, ValidationError};

use crate::scripted::{check_scripted_frame, BulletBody, ScriptedBehavior};

pub enum BulletKind {
    Compiled(Arc<UpdateProgram>),
    Scripted(Box<dyn ScriptedBehavior>),
}

impl fmt::Debug for BulletKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BulletKind::Compiled(program) => write!(f, "Compiled({})", program.fingerprint()),
            BulletKind::Scripted(_) => f.write_str("Scripted"),
        }
    }
}

/// One bullet. Built only through the validating constructors, so the
/// frame always satisfies its program or hook.
#[derive(Debug)]
pub struct BulletInstance {
    frame: VariableFrame,
    kind: BulletKind,
    damage: i64,
    pattern: Arc<str>,
}

impl BulletInstance {
    pub fn from_pattern(pattern: &Pattern, overrides: &[(&str, Value)]) -> Result<Self, ValidationError> {
        let frame = pattern.instantiate(overrides)?;
        Ok(Self {
            frame,
            kind: BulletKind::Compiled(pattern.program().clone()),
            damage: pattern.damage(),
            pattern: Arc::from(pattern.name()),
        })
    }

    pub fn compiled(
        pattern: &str,
        damage: i64,
        frame: VariableFrame,
        program: Arc<UpdateProgram>,
    ) -> Result<Self, ValidationError> {
        program.validate(&frame)?;
        Ok(Self {
            frame,
            kind: BulletKind::Compiled(program),
            damage,
            pattern: Arc::from(pattern),
        })
    }

    pub fn scripted(
        pattern: &str,
        damage: i64,
        frame: VariableFrame,
        hook: Box<dyn ScriptedBehavior>,
    ) -> Result<Self, ValidationError> {
        check_scripted_frame(&frame)?;
        Ok(Self {
            frame,
            kind: BulletKind::Scripted(hook),
            damage,
            pattern: Arc::from(pattern),
        })
    }

    pub fn frame(&self) -> &VariableFrame {
        &self.frame
    }

    pub fn kind(&self) -> &BulletKind {
        &self.kind
    }

    pub fn damage(&self) -> i64 {
        self.damage
    }

    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    pub fn is_scripted(&self) -> bool {
        matches!(self.kind, BulletKind::Scripted(_))
    }

    pub fn x(&self) -> f64 {
        self.frame.number("x").unwrap_or(0.0)
    }

    pub fn y(&self) -> f64 {
        self.frame.number("y").unwrap_or(0.0)
    }

    pub fn texture(&self) -> Option<&str> {
        self.frame.text("texture")
    }

    /// Spawn hook: `on_spawn` assignments or the hook's `init`.
    pub(crate) fn spawn_hook(&mut self, tick: &TickContext, rng: DetRng) -> Result<(), EvalError> {
        match &mut self.kind {
            BulletKind::Compiled(program) => {
                let mut ctx = EvalContext::new(tick, rng);
                program.run_on_spawn(&mut self.frame, &mut ctx)
            }
            BulletKind::Scripted(hook) => {
                let mut body = BulletBody::load(&mut self.frame, tick, rng)?;
                hook.init(&mut body)?;
                body.commit().map(|_| ())
            }
        }
    }

    /// One tick of behavior. Returns true when the bullet should go.
    pub(crate) fn step(&mut self, tick: &TickContext, rng: DetRng) -> Result<bool, EvalError> {
        match &mut self.kind {
            BulletKind::Compiled(program) => {
                let mut ctx = EvalContext::new(tick, rng);
                program.step(&mut self.frame, &mut ctx)
            }
            BulletKind::Scripted(hook) => {
                let mut body = BulletBody::load(&mut self.frame, tick, rng)?;
                hook.update(&mut body, tick.dt)?;
                body.integrate();
                let expired = hook.expired(&body);
                let deleted = body.commit()?;
                Ok(deleted || expired)
            }
        }
    }

    pub(crate) fn view(&self, id: BulletId) -> BulletView {
        let texture = self.texture().unwrap_or_default().to_string();
        BulletView {
            id,
            x: self.x(),
            y: self.y(),
            texture_handle: TextureHandle::from_path(&texture),
            texture,
            damage: self.damage,
            pattern: self.pattern.clone(),
        }
    }
}

/// What the host reads back after a tick.
#[derive(Debug, Clone, PartialEq)]
pub struct BulletView {
    pub id: BulletId,
    pub x: f64,
    pub y: f64,
    pub texture: String,
    pub texture_handle: TextureHandle,
    pub damage: i64,
    pub pattern: Arc<str>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use danmaku_lang::{parse, Assignment};

    #[test]
    fn constructors_validate_the_frame() {
        let program = Arc::new(UpdateProgram::new(
            vec![Assignment::parse("y", "y - speed").unwrap()],
            parse("0").unwrap(),
        ));
        let frame = VariableFrame::new().with("y", 0.0);
        let err = BulletInstance::compiled("drop", 1, frame, program.clone()).unwrap_err();
        assert_eq!(err.code(), "E_VALIDATION_UNDECLARED_READ");

        let frame = VariableFrame::new().with("y", 0.0).with("speed", 2.0);
        let bullet = BulletInstance::compiled("drop", 1, frame, program).unwrap();
        assert!(!bullet.is_scripted());
        assert_eq!(bullet.texture(), None);
        assert_eq!(bullet.pattern(), "drop");
    }
}
