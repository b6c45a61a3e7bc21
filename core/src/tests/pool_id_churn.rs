use std::collections::BTreeSet;

use crate::{BulletId, DetRng, InstancePool};

#[test]
fn live_ids_stay_unique_under_random_churn() {
    let mut rng = DetRng::new(0xfeed);
    let mut pool: InstancePool<u32> = InstancePool::new();
    let mut ever_deleted: BTreeSet<BulletId> = BTreeSet::new();

    for round in 0..200u32 {
        for _ in 0..rng.below(4) {
            pool.enqueue(round);
        }
        pool.realize_pending();

        let live: Vec<BulletId> = pool.iter_alive().map(|slot| slot.id()).collect();
        let unique: BTreeSet<BulletId> = live.iter().copied().collect();
        assert_eq!(unique.len(), live.len());
        assert!(live.windows(2).all(|w| w[0] < w[1]));

        if let Some(victim) = rng.choice(&live).copied() {
            pool.delete(victim).unwrap();
            ever_deleted.insert(victim);
        }
        if rng.below(3) == 0 {
            pool.compact();
        }

        for id in &ever_deleted {
            assert!(pool.get(*id).is_none(), "deleted id {} came back", id);
        }
    }
}
