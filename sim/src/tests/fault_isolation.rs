use std::sync::Arc;

use danmaku_core::{BulletId, FaultStage, TickContext, Value, VariableFrame, VecSignalSink};
use danmaku_lang::{parse, Assignment, EvalError, UpdateProgram};

use crate::{BulletBody, BulletInstance, ScriptedBehavior, SimulationDriver};

fn counter(start: f64, step: &str) -> BulletInstance {
    let program = Arc::new(UpdateProgram::new(
        vec![Assignment::parse("x", step).unwrap()],
        parse("0").unwrap(),
    ));
    BulletInstance::compiled("counter", 1, VariableFrame::new().with("x", start), program).unwrap()
}

struct BrokenInit;

impl ScriptedBehavior for BrokenInit {
    fn init(&mut self, body: &mut BulletBody<'_>) -> Result<(), EvalError> {
        body.set("charge", Value::Number(1.0))
    }

    fn update(&mut self, _body: &mut BulletBody<'_>, _dt: f64) -> Result<(), EvalError> {
        Ok(())
    }
}

#[test]
fn failing_update_retires_only_that_bullet() {
    let mut driver = SimulationDriver::sequential();
    let mut sink = VecSignalSink::default();
    driver.spawn(counter(0.0, "x + 1"));
    // turns to text once x passes 2, which the frame cannot hold
    driver.spawn(counter(0.0, "if(x > 2, \"boom\", x + 1)"));
    driver.spawn(counter(10.0, "x + 1"));

    for n in 1..=3 {
        let report = driver.tick(&TickContext::new(n, 0.1), &mut sink);
        assert!(report.faults.is_empty());
    }
    let report = driver.tick(&TickContext::new(4, 0.1), &mut sink);
    assert_eq!(report.faults.len(), 1);
    let fault = &report.faults[0];
    assert_eq!(fault.stage, FaultStage::Update);
    assert_eq!(fault.instance, Some(BulletId(2)));
    assert_eq!(fault.code, "E_EVAL_TYPE_MISMATCH");
    assert_eq!(fault.pattern, "counter");
    assert_eq!(report.deleted, vec![BulletId(2)]);
    assert_eq!(sink.faults, report.faults);

    let report = driver.tick(&TickContext::new(5, 0.1), &mut sink);
    assert!(report.faults.is_empty());
    assert_eq!(driver.get(BulletId(1)).unwrap().x(), 5.0);
    assert_eq!(driver.get(BulletId(3)).unwrap().x(), 15.0);
    assert!(driver.get(BulletId(2)).is_none());
}

#[test]
fn failing_spawn_hook_never_updates() {
    let frame = VariableFrame::new()
        .with("x", 0.0)
        .with("y", 0.0)
        .with("vx", 1.0)
        .with("vy", 0.0)
        .with("texture", "t.png");
    let mut driver = SimulationDriver::sequential();
    let mut sink = VecSignalSink::default();
    driver.spawn(BulletInstance::scripted("broken", 1, frame, Box::new(BrokenInit)).unwrap());
    driver.spawn(counter(0.0, "x + 1"));

    let report = driver.tick(&TickContext::new(1, 1.0), &mut sink);
    assert_eq!(report.realized.len(), 2);
    assert_eq!(report.faults.len(), 1);
    assert_eq!(report.faults[0].stage, FaultStage::Spawn);
    assert_eq!(report.faults[0].code, "E_EVAL_UNKNOWN_VARIABLE");
    assert_eq!(report.deleted, vec![BulletId(1)]);
    assert_eq!(driver.get(BulletId(2)).unwrap().x(), 1.0);
}
