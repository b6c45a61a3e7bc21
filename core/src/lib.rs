pub mod context;
pub mod geometry;
pub mod hash;
pub mod pool;
pub mod resource;
pub mod rng;
pub mod signals;
pub mod threads;
pub mod value;

pub use context::{PlayerPosition, TickContext};
pub use hash::{StateHash, StateHasher};
pub use pool::{BulletId, InstancePool, PendingSpawn, PoolError, Realized, Slot, SpawnHandle};
pub use resource::TextureHandle;
pub use rng::{mix64, splitmix64, DetRng};
pub use signals::{
    FaultRecord, FaultStage, NullSignalSink, Signal, SignalSink, TickId, VecSignalSink,
};
pub use threads::ThreadMode;
pub use value::{FrameError, Value, ValueType, VariableFrame};

#[cfg(test)]
mod tests;
