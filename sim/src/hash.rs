use danmaku_core::{InstancePool, StateHash, StateHasher, Value};

use crate::bullet::{BulletInstance, BulletKind};

/// blake3 over every live bullet in id order: identity, pattern, kind,
/// damage and the full frame.
pub fn pool_state_hash(pool: &InstancePool<BulletInstance>) -> StateHash {
    let mut hasher = StateHasher::new();
    hasher.write_u64(pool.live_count() as u64);
    for slot in pool.iter_alive() {
        let bullet = &slot.value;
        hasher.write_u64(slot.id().raw());
        hasher.write_str(bullet.pattern());
        hasher.write_bool(matches!(bullet.kind(), BulletKind::Scripted(_)));
        hasher.write_i64(bullet.damage());
        hasher.write_u64(bullet.frame().len() as u64);
        for (name, value) in bullet.frame().iter() {
            hasher.write_str(name);
            match value {
                Value::Number(n) => {
                    hasher.write_u64(0);
                    hasher.write_f64(*n);
                }
                Value::Text(t) => {
                    hasher.write_u64(1);
                    hasher.write_str(t);
                }
            }
        }
    }
    hasher.finish()
}
