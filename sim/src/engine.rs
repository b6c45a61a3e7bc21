use danmaku_core::{
    BulletId, FaultRecord, FaultStage, InstancePool, PendingSpawn, PoolError, Realized, Signal,
    SignalSink, Slot, SpawnHandle, StateHash, ThreadMode, TickContext, TickId, Value,
};
use danmaku_lang::{EvalError, Pattern, ValidationError};

use crate::bullet::{BulletInstance, BulletView};
use crate::hash::pool_state_hash;
use crate::volley::{volley_overrides, VolleyShape};

/// Outcome of one `tick`.
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    pub tick: TickId,
    pub realized: Vec<Realized>,
    /// Compacted this tick, in id order.
    pub deleted: Vec<BulletId>,
    /// Last state of each bullet in `deleted`, same order, so the host can
    /// still resolve hits on the tick a bullet leaves.
    pub retired: Vec<BulletView>,
    pub faults: Vec<FaultRecord>,
    pub live_count: usize,
    pub state_hash: StateHash,
}

/// Runs every live bullet once per tick, compiled programs and scripted hooks
/// alike.
pub struct SimulationDriver {
    pool: InstancePool<BulletInstance>,
    thread_mode: ThreadMode,
    workers: Option<rayon::ThreadPool>,
}

impl SimulationDriver {
    pub fn new(thread_mode: ThreadMode) -> Result<Self, String> {
        let workers = thread_mode.build_pool()?;
        Ok(Self {
            pool: InstancePool::new(),
            thread_mode: thread_mode.resolve(),
            workers,
        })
    }

    pub fn sequential() -> Self {
        Self {
            pool: InstancePool::new(),
            thread_mode: ThreadMode::Seq,
            workers: None,
        }
    }

    pub fn thread_mode(&self) -> ThreadMode {
        self.thread_mode.clone()
    }

    /// Producer for spawns from outside the driver, mid-tick included.
    pub fn spawn_handle(&self) -> SpawnHandle<BulletInstance> {
        self.pool.spawn_handle()
    }

    pub fn spawn(&self, bullet: BulletInstance) -> PendingSpawn {
        self.pool.enqueue(bullet)
    }

    pub fn spawn_pattern(&self, pattern: &Pattern, overrides: &[(&str, Value)]) -> Result<PendingSpawn, ValidationError> {
        Ok(self.spawn(BulletInstance::from_pattern(pattern, overrides)?))
    }

    /// Queues one bullet per angle of `shape`, all centred on `origin`.
    pub fn spawn_volley(
        &self,
        pattern: &Pattern,
        origin: (f64, f64),
        shape: &VolleyShape,
    ) -> Result<Vec<PendingSpawn>, ValidationError> {
        let bullets = volley_overrides(pattern, origin, shape)
            .iter()
            .map(|overrides| BulletInstance::from_pattern(pattern, overrides))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(bullets.into_iter().map(|bullet| self.spawn(bullet)).collect())
    }

    pub fn pending_len(&self) -> usize {
        self.pool.pending_len()
    }

    pub fn get(&self, id: BulletId) -> Option<&BulletInstance> {
        self.pool.get(id)
    }

    /// Host-side removal, e.g. a bullet that hit the player.
    pub fn delete(&mut self, id: BulletId) -> Result<(), PoolError> {
        self.pool.delete(id)
    }

    pub fn live_count(&self) -> usize {
        self.pool.live_count()
    }

    pub fn views(&self) -> Vec<BulletView> {
        self.pool
            .iter_alive()
            .map(|slot| slot.value.view(slot.id()))
            .collect()
    }

    pub fn state_hash(&self) -> StateHash {
        pool_state_hash(&self.pool)
    }

    pub fn tick(&mut self, ctx: &TickContext, sink: &mut dyn SignalSink) -> TickReport {
        let mut faults = Vec::new();

        // 1) realize queued spawns, run their spawn hooks
        let realized = self.pool.realize_pending();
        for spawn in &realized {
            let Some(bullet) = self.pool.get_mut(spawn.id) else {
                continue;
            };
            if let Err(err) = bullet.spawn_hook(ctx, ctx.spawn_stream(spawn.id)) {
                let record = fault_record(ctx.tick, FaultStage::Spawn, bullet, spawn.id, &err);
                self.retire(spawn.id, ctx.tick, sink);
                faults.push(record);
            }
        }
        if !realized.is_empty() {
            sink.emit(Signal::Diag {
                tick_id: ctx.tick,
                name: "realized",
                detail: format!("count={}", realized.len()),
            });
        }

        // 2) updates, data independent per bullet
        let outcomes = self.run_updates(ctx);

        // 3) verdicts and faults in id order
        for (id, outcome) in outcomes {
            match outcome {
                Ok(false) => {}
                Ok(true) => self.retire(id, ctx.tick, sink),
                Err(err) => {
                    if let Some(slot) = self.pool.slot(id) {
                        faults.push(fault_record(ctx.tick, FaultStage::Update, &slot.value, id, &err));
                    }
                    self.retire(id, ctx.tick, sink);
                }
            }
        }
        for record in &faults {
            sink.emit(Signal::Fault(record.clone()));
        }

        // 4) compact
        let retired: Vec<BulletView> = self
            .pool
            .iter()
            .filter(|slot| !slot.is_alive())
            .map(|slot| slot.value.view(slot.id()))
            .collect();
        let deleted = self.pool.compact();
        TickReport {
            tick: ctx.tick,
            realized,
            deleted,
            retired,
            faults,
            live_count: self.pool.live_count(),
            state_hash: pool_state_hash(&self.pool),
        }
    }

    fn run_updates(&mut self, ctx: &TickContext) -> Vec<(BulletId, Result<bool, EvalError>)> {
        let slots = self.pool.slots_mut();
        match &self.workers {
            Some(workers) => {
                use rayon::prelude::*;
                workers.install(|| {
                    slots
                        .par_iter_mut()
                        .filter_map(|slot| update_slot(slot, ctx))
                        .collect()
                })
            }
            None => slots
                .iter_mut()
                .filter_map(|slot| update_slot(slot, ctx))
                .collect(),
        }
    }

    fn retire(&mut self, id: BulletId, tick_id: TickId, sink: &mut dyn SignalSink) {
        if self.pool.delete(id).is_err() {
            sink.emit(Signal::PoolMiss { tick_id, id });
        }
    }
}

fn update_slot(slot: &mut Slot<BulletInstance>, ctx: &TickContext) -> Option<(BulletId, Result<bool, EvalError>)> {
    if !slot.is_alive() {
        return None;
    }
    let id = slot.id();
    Some((id, slot.value.step(ctx, ctx.update_stream(id))))
}

fn fault_record(
    tick_id: TickId,
    stage: FaultStage,
    bullet: &BulletInstance,
    id: BulletId,
    err: &EvalError,
) -> FaultRecord {
    FaultRecord {
        tick_id,
        stage,
        pattern: bullet.pattern().to_string(),
        instance: Some(id),
        code: err.code(),
        message: err.to_string(),
    }
}
