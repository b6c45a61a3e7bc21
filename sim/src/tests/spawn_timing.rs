use std::sync::Arc;

use danmaku_core::{BulletId, PoolError, SpawnHandle, TickContext, VariableFrame, VecSignalSink};
use danmaku_lang::{parse, Assignment, EvalError, UpdateProgram};

use crate::{BulletBody, BulletInstance, ScriptedBehavior, SimulationDriver};

fn falling(y: f64) -> BulletInstance {
    let program = Arc::new(UpdateProgram::new(
        vec![Assignment::parse("y", "y - 10").unwrap()],
        parse("y < -300").unwrap(),
    ));
    BulletInstance::compiled("falling", 1, VariableFrame::new().with("y", y), program).unwrap()
}

fn scripted_frame() -> VariableFrame {
    VariableFrame::new()
        .with("x", 0.0)
        .with("y", 0.0)
        .with("vx", 0.0)
        .with("vy", 0.0)
        .with("texture", "t.png")
}

/// Queues its child from inside its first update.
struct Spawner {
    handle: SpawnHandle<BulletInstance>,
    child: Option<BulletInstance>,
}

impl ScriptedBehavior for Spawner {
    fn update(&mut self, _body: &mut BulletBody<'_>, _dt: f64) -> Result<(), EvalError> {
        if let Some(child) = self.child.take() {
            self.handle.enqueue(child);
        }
        Ok(())
    }
}

fn tick(driver: &mut SimulationDriver, n: u64, sink: &mut VecSignalSink) -> crate::TickReport {
    driver.tick(&TickContext::new(n, 1.0 / 60.0), sink)
}

#[test]
fn spawns_queued_between_ticks_update_on_the_next_tick() {
    let mut driver = SimulationDriver::sequential();
    let mut sink = VecSignalSink::default();
    let ticket = driver.spawn(falling(0.0));
    assert_eq!(driver.pending_len(), 1);

    let report = tick(&mut driver, 1, &mut sink);
    assert_eq!(report.realized.len(), 1);
    assert_eq!(report.realized[0].ticket, ticket.ticket);
    let id = report.realized[0].id;
    assert_eq!(id, BulletId(1));
    assert_eq!(driver.get(id).unwrap().y(), -10.0);
}

#[test]
fn spawns_queued_mid_tick_wait_for_the_next_tick() {
    let mut driver = SimulationDriver::sequential();
    let mut sink = VecSignalSink::default();
    let spawner = Spawner {
        handle: driver.spawn_handle(),
        child: Some(falling(50.0)),
    };
    driver.spawn(BulletInstance::scripted("spawner", 0, scripted_frame(), Box::new(spawner)).unwrap());

    let first = tick(&mut driver, 1, &mut sink);
    assert_eq!(first.realized.len(), 1);
    assert_eq!(first.live_count, 1);
    assert_eq!(driver.pending_len(), 1);

    let second = tick(&mut driver, 2, &mut sink);
    assert_eq!(second.realized.len(), 1);
    let child = second.realized[0].id;
    assert_eq!(child, BulletId(2));
    // updated exactly once, on tick 2
    assert_eq!(driver.get(child).unwrap().y(), 40.0);
    assert_eq!(second.live_count, 2);
}

#[test]
fn host_delete_hides_the_id_and_compacts_next_tick() {
    let mut driver = SimulationDriver::sequential();
    let mut sink = VecSignalSink::default();
    driver.spawn(falling(0.0));
    driver.spawn(falling(0.0));
    tick(&mut driver, 1, &mut sink);

    let gone = BulletId(1);
    driver.delete(gone).unwrap();
    assert!(driver.get(gone).is_none());
    assert_eq!(driver.delete(gone), Err(PoolError::NotLive(gone)));
    assert_eq!(driver.delete(BulletId(99)), Err(PoolError::NotLive(BulletId(99))));

    let report = tick(&mut driver, 2, &mut sink);
    assert_eq!(report.deleted, vec![gone]);
    assert_eq!(report.live_count, 1);
    // the survivor kept moving, the deleted one did not
    assert_eq!(driver.get(BulletId(2)).unwrap().y(), -20.0);
    assert!(driver.get(gone).is_none());
}

#[test]
fn predicate_deletion_is_reported_on_the_crossing_tick() {
    let mut driver = SimulationDriver::sequential();
    let mut sink = VecSignalSink::default();
    driver.spawn(falling(-285.0));

    let first = tick(&mut driver, 1, &mut sink);
    assert!(first.deleted.is_empty());
    assert_eq!(first.live_count, 1);

    let second = tick(&mut driver, 2, &mut sink);
    assert_eq!(second.deleted, vec![BulletId(1)]);
    assert_eq!(second.live_count, 0);
    assert!(driver.views().is_empty());
}

#[test]
fn retired_bullets_keep_their_final_position() {
    let mut driver = SimulationDriver::sequential();
    let mut sink = VecSignalSink::default();
    driver.spawn(falling(-295.0));
    driver.spawn(falling(0.0));

    let report = tick(&mut driver, 1, &mut sink);
    assert_eq!(report.deleted, vec![BulletId(1)]);
    assert_eq!(report.retired.len(), 1);
    let last = &report.retired[0];
    assert_eq!(last.id, BulletId(1));
    assert_eq!(last.y, -305.0);
    assert!(driver.get(BulletId(1)).is_none());
    assert_eq!(driver.views().len(), 1);
}
