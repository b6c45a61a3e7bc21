use crate::pool::BulletId;

pub type TickId = u64;

/// Where in the pipeline a fault surfaced.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FaultStage {
    Load,
    Spawn,
    Update,
}

impl FaultStage {
    pub fn name(self) -> &'static str {
        match self {
            FaultStage::Load => "load",
            FaultStage::Spawn => "spawn",
            FaultStage::Update => "update",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FaultRecord {
    pub tick_id: TickId,
    pub stage: FaultStage,
    pub pattern: String,
    pub instance: Option<BulletId>,
    /// Stable `E_...` code of the underlying error.
    pub code: &'static str,
    pub message: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Signal {
    /// An instance (or a pattern, before any instance existed) failed.
    Fault(FaultRecord),
    /// A pool operation named an id that is no longer live.
    PoolMiss { tick_id: TickId, id: BulletId },
    /// Free-form host event, e.g. "pattern loaded".
    Diag { tick_id: TickId, name: &'static str, detail: String },
}

impl Signal {
    pub fn name(&self) -> &'static str {
        match self {
            Signal::Fault(_) => "fault",
            Signal::PoolMiss { .. } => "pool_miss",
            Signal::Diag { name, .. } => name,
        }
    }

    pub fn tick_id(&self) -> TickId {
        match self {
            Signal::Fault(record) => record.tick_id,
            Signal::PoolMiss { tick_id, .. } => *tick_id,
            Signal::Diag { tick_id, .. } => *tick_id,
        }
    }
}

pub trait SignalSink {
    fn emit(&mut self, signal: Signal);
}

#[derive(Default)]
pub struct VecSignalSink {
    pub signals: Vec<Signal>,
    pub faults: Vec<FaultRecord>,
}

impl VecSignalSink {
    pub fn is_empty(&self) -> bool {
        self.signals.is_empty() && self.faults.is_empty()
    }
}

impl SignalSink for VecSignalSink {
    fn emit(&mut self, signal: Signal) {
        match signal {
            Signal::Fault(record) => self.faults.push(record),
            other => self.signals.push(other),
        }
    }
}

/// Drops everything. Handy for hosts that only read the tick report.
pub struct NullSignalSink;

impl SignalSink for NullSignalSink {
    fn emit(&mut self, _signal: Signal) {}
}
